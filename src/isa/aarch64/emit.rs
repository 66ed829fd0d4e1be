//! AArch64 ISA: binary code emission.

use smallvec::SmallVec;

use crate::condcodes::IntCC;
use crate::error::{CodegenError, CodegenResult};
use crate::isa::aarch64::args::AMode;
use crate::isa::aarch64::imms::{Imm12, ImmLogic, MoveWideConst, SImm9, UImm12Scaled};
use crate::isa::aarch64::regs::zero_reg;
use crate::isa::{EmitState, ScratchRegs};
use crate::machinst::{
    AccessWidth, AluOp, CodeBuffer, LabelUse, LaneSize, MInst, MemArg, OperandSize, Reg, RegClass,
    RoundingMode, VecAluOp, VectorWidth, Writable, ZeroCond,
};

/// A short sequence of staging words, emitted ahead of a main instruction
/// word.
pub type StagingWords = SmallVec<[u32; 4]>;

//=============================================================================
// Instructions and subcomponents: emission

fn machreg_to_gpr(m: Reg) -> CodegenResult<u32> {
    if m.class() != RegClass::Int {
        return Err(CodegenError::OperandClass(format!(
            "{} used where a general-purpose register is required",
            m
        )));
    }
    if m.hw_enc() >= 32 {
        return Err(CodegenError::OperandClass(format!(
            "register index {} exceeds the aarch64 register file",
            m.hw_enc()
        )));
    }
    Ok(u32::from(m.hw_enc()))
}

fn machreg_to_vec(m: Reg) -> CodegenResult<u32> {
    if m.class() != RegClass::Vector {
        return Err(CodegenError::OperandClass(format!(
            "{} used where a vector register is required",
            m
        )));
    }
    if m.hw_enc() >= 32 {
        return Err(CodegenError::OperandClass(format!(
            "register index {} exceeds the aarch64 vector file",
            m.hw_enc()
        )));
    }
    Ok(u32::from(m.hw_enc()))
}

/// AArch64 condition codes, as encoded in `b.cond` and friends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Hs,
    Lo,
    Hi,
    Ls,
    Ge,
    Lt,
    Gt,
    Le,
}

impl Cond {
    /// The 4-bit machine encoding of this condition.
    pub fn bits(self) -> u32 {
        match self {
            Cond::Eq => 0,
            Cond::Ne => 1,
            Cond::Hs => 2,
            Cond::Lo => 3,
            Cond::Hi => 8,
            Cond::Ls => 9,
            Cond::Ge => 10,
            Cond::Lt => 11,
            Cond::Gt => 12,
            Cond::Le => 13,
        }
    }

    /// Map a portable condition code onto the flags produced by `subs`.
    pub fn from_intcc(cc: IntCC) -> Cond {
        match cc {
            IntCC::Equal => Cond::Eq,
            IntCC::NotEqual => Cond::Ne,
            IntCC::SignedLessThan => Cond::Lt,
            IntCC::SignedGreaterThanOrEqual => Cond::Ge,
            IntCC::SignedGreaterThan => Cond::Gt,
            IntCC::SignedLessThanOrEqual => Cond::Le,
            IntCC::UnsignedLessThan => Cond::Lo,
            IntCC::UnsignedGreaterThanOrEqual => Cond::Hs,
            IntCC::UnsignedGreaterThan => Cond::Hi,
            IntCC::UnsignedLessThanOrEqual => Cond::Ls,
        }
    }
}

fn enc_arith_rrr(base: u32, size: OperandSize, rd: u32, rn: u32, rm: u32) -> u32 {
    base | (size.sf_bit() << 31) | ((rm & 31) << 16) | ((rn & 31) << 5) | (rd & 31)
}

fn enc_arith_rr_imm12(base: u32, size: OperandSize, imm: Imm12, rn: u32, rd: u32) -> u32 {
    base
        | (size.sf_bit() << 31)
        | ((imm.shift_bits() & 3) << 22)
        | ((imm.imm_bits() & 0xfff) << 10)
        | ((rn & 31) << 5)
        | (rd & 31)
}

fn enc_arith_rr_imml(base: u32, size: OperandSize, imml: ImmLogic, rn: u32, rd: u32) -> u32 {
    base | (size.sf_bit() << 31) | ((imml.enc_bits() & 0x1fff) << 10) | ((rn & 31) << 5) | (rd & 31)
}

fn enc_bfm(opc: u32, size: OperandSize, immr: u32, imms: u32, rn: u32, rd: u32) -> u32 {
    0b0_00_100110_0_000000_000000_00000_00000
        | (size.sf_bit() << 31)
        | ((opc & 3) << 29)
        | (size.sf_bit() << 22)
        | ((immr & 0x3f) << 16)
        | ((imms & 0x3f) << 10)
        | ((rn & 31) << 5)
        | (rd & 31)
}

fn enc_move_wide(base: u32, size: OperandSize, imm: MoveWideConst, rd: u32) -> u32 {
    debug_assert!(imm.shift <= 0b11);
    base
        | (size.sf_bit() << 31)
        | (u32::from(imm.shift) << 21)
        | (u32::from(imm.bits) << 5)
        | (rd & 31)
}

fn enc_ldst_uimm12(op_31_22: u32, uimm12: UImm12Scaled, rn: u32, rt: u32) -> u32 {
    ((op_31_22 & 0x3ff) << 22)
        | (0b1 << 24)
        | ((uimm12.bits() & 0xfff) << 10)
        | ((rn & 31) << 5)
        | (rt & 31)
}

fn enc_ldst_simm9(op_31_22: u32, simm9: SImm9, rn: u32, rt: u32) -> u32 {
    ((op_31_22 & 0x3ff) << 22) | ((simm9.bits() & 0x1ff) << 12) | ((rn & 31) << 5) | (rt & 31)
}

fn enc_ldst_reg(op_31_22: u32, rm: u32, rn: u32, rt: u32) -> u32 {
    // Register offset with extend field LSL #0.
    ((op_31_22 & 0x3ff) << 22)
        | (1 << 21)
        | ((rm & 31) << 16)
        | (0b011 << 13)
        | (0b10 << 10)
        | ((rn & 31) << 5)
        | (rt & 31)
}

fn enc_cmpbr(op_31_24: u32, size: OperandSize, reg: u32) -> u32 {
    // Offset field is zero; the label fixup patches it.
    ((op_31_24 & 0x7f) << 24) | (size.sf_bit() << 31) | (reg & 31)
}

fn enc_cbr(cond: Cond) -> u32 {
    0b01010100 << 24 | (cond.bits() & 0xf)
}

fn enc_jump26() -> u32 {
    0b000101 << 26
}

fn enc_vec_rrr(base: u32, rm: u32, rn: u32, rd: u32) -> u32 {
    base | ((rm & 31) << 16) | ((rn & 31) << 5) | (rd & 31)
}

fn enc_movi_byte(imm8: u8, rd: u32) -> u32 {
    let imm = u32::from(imm8);
    0x4f00_e400 | ((imm >> 5) << 16) | ((imm & 0x1f) << 5) | (rd & 31)
}

fn enc_dup_gpr(lane: LaneSize, rn: u32, rd: u32) -> u32 {
    let imm5 = 1u32 << lane.log2_bytes();
    0x4e00_0c00 | ((imm5 & 0x1f) << 16) | ((rn & 31) << 5) | (rd & 31)
}

const MRS_FPCR: u32 = 0xd53b_4400;
const MSR_FPCR: u32 = 0xd51b_4400;
const NOP: u32 = 0xd503_201f;

/// The two-bit FPCR.RMode value for a rounding mode.
fn fpcr_rmode(mode: RoundingMode) -> u64 {
    match mode {
        RoundingMode::Nearest => 0b00,
        RoundingMode::TowardPositive => 0b01,
        RoundingMode::TowardNegative => 0b10,
        RoundingMode::TowardZero => 0b11,
    }
}

/// Materialize `value` into `rd` in as few move-wide words as possible.
///
/// Single `movz`, single `movn` and logical-immediate `orr` forms are tried
/// before falling back to a `movz`+`movk` chain.
pub fn load_constant(rd: u32, value: u64, size: OperandSize) -> StagingWords {
    let mut insts = SmallVec::new();
    let value = match size {
        OperandSize::Size32 => u64::from(value as u32),
        OperandSize::Size64 => value,
    };
    let inverted = match size {
        OperandSize::Size32 => u64::from(!(value as u32)),
        OperandSize::Size64 => !value,
    };

    if let Some(imm) = MoveWideConst::maybe_from_u64(value) {
        insts.push(enc_move_wide(0x5280_0000, size, imm, rd));
    } else if let Some(imm) = MoveWideConst::maybe_from_u64(inverted) {
        insts.push(enc_move_wide(0x1280_0000, size, imm, rd));
    } else if let Some(imml) = ImmLogic::maybe_from_u64(value, size) {
        // orr rd, xzr, #imm
        insts.push(enc_arith_rr_imml(0x3200_0000, size, imml, 31, rd));
    } else {
        let mut first = true;
        for shift in 0..4 {
            let halfword = ((value >> (16 * shift)) & 0xffff) as u16;
            if halfword == 0 {
                continue;
            }
            let imm = MoveWideConst::from_halfword(halfword, shift as u8);
            if first {
                insts.push(enc_move_wide(0x5280_0000, size, imm, rd));
                first = false;
            } else {
                insts.push(enc_move_wide(0x7280_0000, size, imm, rd));
            }
        }
    }
    insts
}

/// Memory addressing mode finalization: pick a single-instruction form if
/// the displacement fits the class for this access size, otherwise compute
/// the address into the address scratch register and return a
/// zero-displacement form referencing it.
pub fn mem_finalize(
    mem: &MemArg,
    access_bytes: u32,
    scratch: &ScratchRegs,
) -> CodegenResult<(StagingWords, AMode)> {
    let base = mem.base();
    let off = mem.disp();

    if let Some(index) = mem.index() {
        if off == 0 {
            return Ok((SmallVec::new(), AMode::RegReg(base, index)));
        }
        // No base+index+displacement form: stage base+disp first.
        if base == scratch.addr_tmp || index == scratch.addr_tmp {
            return Err(CodegenError::ScratchConflict(format!(
                "memory operand {} aliases the address scratch register",
                mem
            )));
        }
        let tmp = machreg_to_gpr(scratch.addr_tmp)?;
        let mut insts = load_constant(tmp, off as u64, OperandSize::Size64);
        insts.push(enc_arith_rrr(
            0x0b00_0000,
            OperandSize::Size64,
            tmp,
            machreg_to_gpr(base)?,
            tmp,
        ));
        return Ok((insts, AMode::RegReg(scratch.addr_tmp, index)));
    }

    if let Some(uimm12) = UImm12Scaled::maybe_from_i64(off, access_bytes) {
        return Ok((SmallVec::new(), AMode::UnsignedOffset(base, uimm12)));
    }
    if let Some(simm9) = SImm9::maybe_from_i64(off) {
        return Ok((SmallVec::new(), AMode::Unscaled(base, simm9)));
    }

    log::trace!("mem_finalize: staging displacement {} via scratch", off);
    if base == scratch.addr_tmp {
        return Err(CodegenError::ScratchConflict(format!(
            "memory operand {} aliases the address scratch register",
            mem
        )));
    }
    let tmp = machreg_to_gpr(scratch.addr_tmp)?;
    let mut insts = load_constant(tmp, off as u64, OperandSize::Size64);
    insts.push(enc_arith_rrr(
        0x0b00_0000,
        OperandSize::Size64,
        tmp,
        machreg_to_gpr(base)?,
        tmp,
    ));
    Ok((insts, AMode::reg(scratch.addr_tmp, access_bytes)))
}

/// The 10-bit `op` field (instruction bits 31..22, with bits 25:24 zero) of
/// a load/store, for the given access shape.
fn ldst_op_bits(ty: AccessWidth, sign_extend: bool, is_load: bool) -> u32 {
    let size = ty.log2_bytes();
    let opc = match (is_load, sign_extend, ty) {
        (false, _, _) => 0b00,
        (true, false, _) => 0b01,
        // Sign-extending to the full 64-bit register.
        (true, true, AccessWidth::D) => 0b01,
        (true, true, _) => 0b10,
    };
    (size << 8) | 0b111 << 5 | opc
}

const LDST_VEC_Q_LOAD: u32 = 0b00_111_1_00_11;
const LDST_VEC_Q_STORE: u32 = 0b00_111_1_00_10;

fn emit_ldst(
    sink: &mut CodeBuffer,
    op_31_22: u32,
    mem: &AMode,
    rt: u32,
) -> CodegenResult<()> {
    let word = match mem {
        AMode::UnsignedOffset(rn, uimm12) => {
            enc_ldst_uimm12(op_31_22, *uimm12, machreg_to_gpr(*rn)?, rt)
        }
        AMode::Unscaled(rn, simm9) => enc_ldst_simm9(op_31_22, *simm9, machreg_to_gpr(*rn)?, rt),
        AMode::RegReg(rn, rm) => {
            enc_ldst_reg(op_31_22, machreg_to_gpr(*rm)?, machreg_to_gpr(*rn)?, rt)
        }
    };
    sink.put4(word);
    Ok(())
}

fn alu_rrr_base(op: AluOp, set_flags: bool) -> CodegenResult<u32> {
    let base = match (op, set_flags) {
        (AluOp::Add, false) => 0x0b00_0000,
        (AluOp::Add, true) => 0x2b00_0000,
        (AluOp::Sub, false) => 0x4b00_0000,
        (AluOp::Sub, true) => 0x6b00_0000,
        (AluOp::And, false) => 0x0a00_0000,
        (AluOp::And, true) => 0x6a00_0000,
        (AluOp::Or, false) => 0x2a00_0000,
        (AluOp::Xor, false) => 0x4a00_0000,
        (AluOp::Mul, false) => 0x1b00_7c00,
        (AluOp::Lsl, false) => 0x1ac0_2000,
        (AluOp::Lsr, false) => 0x1ac0_2400,
        (AluOp::Asr, false) => 0x1ac0_2800,
        (op, true) => {
            return Err(CodegenError::Unsupported(format!(
                "aarch64 has no flag-setting form of {}",
                op.name()
            )))
        }
    };
    Ok(base)
}

fn emit_alu_rrr(
    sink: &mut CodeBuffer,
    op: AluOp,
    size: OperandSize,
    set_flags: bool,
    rd: Writable<Reg>,
    rn: Reg,
    rm: Reg,
) -> CodegenResult<()> {
    let base = alu_rrr_base(op, set_flags)?;
    sink.put4(enc_arith_rrr(
        base,
        size,
        machreg_to_gpr(rd.to_reg())?,
        machreg_to_gpr(rn)?,
        machreg_to_gpr(rm)?,
    ));
    Ok(())
}

fn emit_alu_rr_imm(
    sink: &mut CodeBuffer,
    op: AluOp,
    size: OperandSize,
    set_flags: bool,
    rd: Writable<Reg>,
    rn: Reg,
    imm: i64,
    scratch: &ScratchRegs,
) -> CodegenResult<()> {
    let rd_num = machreg_to_gpr(rd.to_reg())?;
    let rn_num = machreg_to_gpr(rn)?;
    let size_bits = u32::from(size.bits());

    match op {
        AluOp::Add | AluOp::Sub => {
            // Flip add/sub for negative immediates: the imm12 field is
            // unsigned.
            let (op, magnitude) = if imm < 0 {
                let flipped = match op {
                    AluOp::Add => AluOp::Sub,
                    _ => AluOp::Add,
                };
                (flipped, imm.unsigned_abs())
            } else {
                (op, imm as u64)
            };
            if let Some(imm12) = Imm12::maybe_from_u64(magnitude) {
                let base = match (op, set_flags) {
                    (AluOp::Add, false) => 0x1100_0000,
                    (AluOp::Add, true) => 0x3100_0000,
                    (AluOp::Sub, false) => 0x5100_0000,
                    (AluOp::Sub, true) => 0x7100_0000,
                    _ => unreachable!(),
                };
                sink.put4(enc_arith_rr_imm12(base, size, imm12, rn_num, rd_num));
                return Ok(());
            }
        }
        AluOp::And | AluOp::Or | AluOp::Xor => {
            if let Some(imml) = ImmLogic::maybe_from_u64(imm as u64, size) {
                let base = match (op, set_flags) {
                    (AluOp::And, false) => 0x1200_0000,
                    (AluOp::And, true) => 0x7200_0000,
                    (AluOp::Or, false) => 0x3200_0000,
                    (AluOp::Xor, false) => 0x5200_0000,
                    (op, true) => {
                        return Err(CodegenError::Unsupported(format!(
                            "aarch64 has no flag-setting form of {} with immediate",
                            op.name()
                        )))
                    }
                    _ => unreachable!(),
                };
                sink.put4(enc_arith_rr_imml(base, size, imml, rn_num, rd_num));
                return Ok(());
            }
        }
        AluOp::Lsl | AluOp::Lsr | AluOp::Asr => {
            let shift = imm as u64;
            if shift >= u64::from(size_bits) {
                return Err(CodegenError::OutOfRange(format!(
                    "shift amount {} out of range for {}-bit operation",
                    imm, size_bits
                )));
            }
            let shift = shift as u32;
            let word = match op {
                AluOp::Lsl => enc_bfm(
                    0b10,
                    size,
                    (size_bits - shift) & (size_bits - 1),
                    size_bits - 1 - shift,
                    rn_num,
                    rd_num,
                ),
                AluOp::Lsr => enc_bfm(0b10, size, shift, size_bits - 1, rn_num, rd_num),
                AluOp::Asr => enc_bfm(0b00, size, shift, size_bits - 1, rn_num, rd_num),
                _ => unreachable!(),
            };
            sink.put4(word);
            return Ok(());
        }
        AluOp::Mul => {}
    }

    // No inline encoding class fits: materialize the immediate into the
    // immediate scratch register and use the register-register form.
    if rn == scratch.imm_tmp {
        return Err(CodegenError::ScratchConflict(format!(
            "operand {} aliases the immediate scratch register",
            rn
        )));
    }
    log::trace!("alu imm {} staged through scratch for {}", imm, op.name());
    let tmp = machreg_to_gpr(scratch.imm_tmp)?;
    for word in load_constant(tmp, imm as u64, size) {
        sink.put4(word);
    }
    emit_alu_rrr(sink, op, size, set_flags, rd, rn, scratch.imm_tmp)
}

fn vec_alu_base(op: VecAluOp, lane: LaneSize) -> u32 {
    let size = lane.log2_bytes();
    match op {
        VecAluOp::And => 0x4e20_1c00,
        VecAluOp::Or => 0x4ea0_1c00,
        VecAluOp::Xor => 0x6e20_1c00,
        VecAluOp::Add => 0x4e20_8400 | (size << 22),
        VecAluOp::Sub => 0x6e20_8400 | (size << 22),
    }
}

fn lane_mask(lane: LaneSize) -> u64 {
    match lane {
        LaneSize::S8 => 0xff,
        LaneSize::S16 => 0xffff,
        LaneSize::S32 => 0xffff_ffff,
        LaneSize::S64 => u64::MAX,
    }
}

/// Whether a lane-sized value replicates a single byte, and that byte.
fn byte_splattable(value: u64, lane: LaneSize) -> Option<u8> {
    let b = (value & 0xff) as u8;
    let bytes = lane.bytes();
    for i in 1..bytes {
        if ((value >> (8 * i)) & 0xff) as u8 != b {
            return None;
        }
    }
    Some(b)
}

fn expect_v128(width: VectorWidth) -> CodegenResult<()> {
    if width != VectorWidth::V128 {
        return Err(CodegenError::OperandClass(format!(
            "{}-bit vector operand reached the aarch64 backend unpaired",
            width.bytes() * 8
        )));
    }
    Ok(())
}

/// Encode one logical instruction into the sink.
pub fn emit(inst: &MInst, sink: &mut CodeBuffer, state: &mut EmitState) -> CodegenResult<()> {
    let scratch = state.scratch;
    match inst {
        MInst::Nop => {
            sink.put4(NOP);
        }

        MInst::AluRRR {
            op,
            size,
            rd,
            rn,
            rm,
            set_flags,
        } => {
            emit_alu_rrr(sink, *op, *size, *set_flags, *rd, *rn, *rm)?;
        }

        MInst::AluRRImm {
            op,
            size,
            rd,
            rn,
            imm,
            set_flags,
        } => {
            emit_alu_rr_imm(sink, *op, *size, *set_flags, *rd, *rn, *imm, &scratch)?;
        }

        MInst::MovImm { size, rd, imm } => {
            let rd = machreg_to_gpr(rd.to_reg())?;
            for word in load_constant(rd, *imm, *size) {
                sink.put4(word);
            }
        }

        MInst::Load {
            ty,
            sign_extend,
            rd,
            mem,
        } => {
            let (staging, amode) = mem_finalize(mem, ty.bytes(), &scratch)?;
            for word in staging {
                sink.put4(word);
            }
            let rt = machreg_to_gpr(rd.to_reg())?;
            emit_ldst(sink, ldst_op_bits(*ty, *sign_extend, true), &amode, rt)?;
        }

        MInst::Store { ty, rs, mem } => {
            let (staging, amode) = mem_finalize(mem, ty.bytes(), &scratch)?;
            for word in staging {
                sink.put4(word);
            }
            let rt = machreg_to_gpr(*rs)?;
            emit_ldst(sink, ldst_op_bits(*ty, false, false), &amode, rt)?;
        }

        MInst::LoadAddr { rd, mem } => {
            let rd_num = machreg_to_gpr(rd.to_reg())?;
            let base = machreg_to_gpr(mem.base())?;
            let off = mem.disp();
            match (mem.index(), Imm12::maybe_from_u64(off.unsigned_abs())) {
                (None, Some(imm12)) => {
                    let op = if off < 0 { 0x5100_0000 } else { 0x1100_0000 };
                    sink.put4(enc_arith_rr_imm12(op, OperandSize::Size64, imm12, base, rd_num));
                }
                (Some(index), _) if off == 0 => {
                    sink.put4(enc_arith_rrr(
                        0x0b00_0000,
                        OperandSize::Size64,
                        rd_num,
                        base,
                        machreg_to_gpr(index)?,
                    ));
                }
                _ => {
                    if mem.base() == scratch.addr_tmp
                        || mem.index() == Some(scratch.addr_tmp)
                    {
                        return Err(CodegenError::ScratchConflict(format!(
                            "memory operand {} aliases the address scratch register",
                            mem
                        )));
                    }
                    let tmp = machreg_to_gpr(scratch.addr_tmp)?;
                    for word in load_constant(tmp, off as u64, OperandSize::Size64) {
                        sink.put4(word);
                    }
                    sink.put4(enc_arith_rrr(0x0b00_0000, OperandSize::Size64, tmp, base, tmp));
                    match mem.index() {
                        Some(index) => sink.put4(enc_arith_rrr(
                            0x0b00_0000,
                            OperandSize::Size64,
                            rd_num,
                            tmp,
                            machreg_to_gpr(index)?,
                        )),
                        // mov rd, tmp (add rd, tmp, xzr).
                        None => sink.put4(enc_arith_rrr(
                            0x0b00_0000,
                            OperandSize::Size64,
                            rd_num,
                            tmp,
                            31,
                        )),
                    }
                }
            }
        }

        MInst::Jump { target } => {
            sink.use_label_at_offset(sink.cur_offset(), *target, LabelUse::A64Branch26);
            sink.put4(enc_jump26());
        }

        MInst::CmpBr {
            cc,
            size,
            rn,
            rm,
            target,
        } => {
            // Dedicated compare-against-zero forms.
            if *rm == zero_reg() && (*cc == IntCC::Equal || *cc == IntCC::NotEqual) {
                let op_31_24 = match cc {
                    IntCC::Equal => 0b0_011010_0,
                    _ => 0b0_011010_1,
                };
                let reg = machreg_to_gpr(*rn)?;
                sink.use_label_at_offset(sink.cur_offset(), *target, LabelUse::A64Branch19);
                sink.put4(enc_cmpbr(op_31_24, *size, reg));
                return Ok(());
            }
            // cmp rn, rm is subs xzr, rn, rm.
            emit_alu_rrr(
                sink,
                AluOp::Sub,
                *size,
                true,
                Writable::from_reg(zero_reg()),
                *rn,
                *rm,
            )?;
            sink.use_label_at_offset(sink.cur_offset(), *target, LabelUse::A64Branch19);
            sink.put4(enc_cbr(Cond::from_intcc(*cc)));
        }

        MInst::OpBr {
            op,
            size,
            rd,
            rn,
            rm,
            cond,
            target,
        } => {
            // add/sub/and have flag-setting forms; everything else needs an
            // explicit zero test, for which cbz/cbnz serves directly.
            let has_flags = matches!(op, AluOp::Add | AluOp::Sub | AluOp::And);
            if has_flags {
                emit_alu_rrr(sink, *op, *size, true, *rd, *rn, *rm)?;
                let cc = match cond {
                    ZeroCond::Zero => Cond::Eq,
                    ZeroCond::NotZero => Cond::Ne,
                };
                sink.use_label_at_offset(sink.cur_offset(), *target, LabelUse::A64Branch19);
                sink.put4(enc_cbr(cc));
            } else {
                emit_alu_rrr(sink, *op, *size, false, *rd, *rn, *rm)?;
                let op_31_24 = match cond {
                    ZeroCond::Zero => 0b0_011010_0,
                    ZeroCond::NotZero => 0b0_011010_1,
                };
                let reg = machreg_to_gpr(rd.to_reg())?;
                sink.use_label_at_offset(sink.cur_offset(), *target, LabelUse::A64Branch19);
                sink.put4(enc_cmpbr(op_31_24, *size, reg));
            }
        }

        MInst::VecAluRRR {
            op,
            width,
            lane,
            vd,
            vn,
            vm,
        } => {
            expect_v128(*width)?;
            sink.put4(enc_vec_rrr(
                vec_alu_base(*op, *lane),
                machreg_to_vec(*vm)?,
                machreg_to_vec(*vn)?,
                machreg_to_vec(vd.to_reg())?,
            ));
        }

        MInst::VecLoad { width, vd, mem } => {
            expect_v128(*width)?;
            let (staging, amode) = mem_finalize(mem, 16, &scratch)?;
            for word in staging {
                sink.put4(word);
            }
            emit_ldst(sink, LDST_VEC_Q_LOAD, &amode, machreg_to_vec(vd.to_reg())?)?;
        }

        MInst::VecStore { width, vs, mem } => {
            expect_v128(*width)?;
            let (staging, amode) = mem_finalize(mem, 16, &scratch)?;
            for word in staging {
                sink.put4(word);
            }
            emit_ldst(sink, LDST_VEC_Q_STORE, &amode, machreg_to_vec(*vs)?)?;
        }

        MInst::VecSplatImm {
            width,
            lane,
            vd,
            imm,
        } => {
            expect_v128(*width)?;
            let value = (*imm as u64) & lane_mask(*lane);
            let rd = machreg_to_vec(vd.to_reg())?;
            if let Some(byte) = byte_splattable(value, *lane) {
                // Zero, all-ones and any other replicated byte have the
                // one-word movi form.
                sink.put4(enc_movi_byte(byte, rd));
            } else {
                let size = match lane {
                    LaneSize::S64 => OperandSize::Size64,
                    _ => OperandSize::Size32,
                };
                let tmp = machreg_to_gpr(scratch.imm_tmp)?;
                for word in load_constant(tmp, value, size) {
                    sink.put4(word);
                }
                sink.put4(enc_dup_gpr(*lane, tmp, rd));
            }
        }

        MInst::VecDup {
            width,
            lane,
            vd,
            rn,
        } => {
            expect_v128(*width)?;
            sink.put4(enc_dup_gpr(
                *lane,
                machreg_to_gpr(*rn)?,
                machreg_to_vec(vd.to_reg())?,
            ));
        }

        MInst::SetFpRoundingMode { mode } => {
            let save = machreg_to_gpr(scratch.fctrl_save)?;
            let tmp = machreg_to_gpr(scratch.imm_tmp)?;
            sink.put4(MRS_FPCR | save);
            // Clear FPCR.RMode, then set the requested mode.
            let clear = ImmLogic::maybe_from_u64(!(0b11u64 << 22), OperandSize::Size64)
                .expect("rmode clear mask is a valid logical immediate");
            sink.put4(enc_arith_rr_imml(0x1200_0000, OperandSize::Size64, clear, save, tmp));
            let mode_bits = fpcr_rmode(*mode) << 22;
            if mode_bits != 0 {
                let set = ImmLogic::maybe_from_u64(mode_bits, OperandSize::Size64)
                    .expect("rmode set mask is a valid logical immediate");
                sink.put4(enc_arith_rr_imml(0x3200_0000, OperandSize::Size64, set, tmp, tmp));
            }
            sink.put4(MSR_FPCR | tmp);
        }

        MInst::RestoreFpRoundingMode => {
            let save = machreg_to_gpr(scratch.fctrl_save)?;
            sink.put4(MSR_FPCR | save);
        }
    }
    Ok(())
}
