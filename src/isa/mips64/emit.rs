//! MIPS64 ISA: binary code emission.

use smallvec::SmallVec;

use crate::condcodes::IntCC;
use crate::error::{CodegenError, CodegenResult};
use crate::isa::mips64::args::{AMode, MsaAMode};
use crate::isa::mips64::imms::{Imm16, SImm10, UImm16};
use crate::isa::mips64::Revision;
use crate::isa::{EmitState, ScratchRegs};
use crate::machinst::{
    AccessWidth, AluOp, CodeBuffer, LabelUse, LaneSize, MInst, MachLabel, MemArg, OperandSize,
    Reg, RegClass, RoundingMode, VecAluOp, VectorWidth, Writable, ZeroCond,
};

/// A short sequence of staging words, emitted ahead of a main instruction
/// word.
pub type StagingWords = SmallVec<[u32; 4]>;

fn machreg_to_gpr(m: Reg) -> CodegenResult<u32> {
    if m.class() != RegClass::Int {
        return Err(CodegenError::OperandClass(format!(
            "{} used where a general-purpose register is required",
            m
        )));
    }
    if m.hw_enc() >= 32 {
        return Err(CodegenError::OperandClass(format!(
            "register index {} exceeds the mips64 register file",
            m.hw_enc()
        )));
    }
    Ok(u32::from(m.hw_enc()))
}

fn machreg_to_wreg(m: Reg) -> CodegenResult<u32> {
    if m.class() != RegClass::Vector {
        return Err(CodegenError::OperandClass(format!(
            "{} used where an MSA register is required",
            m
        )));
    }
    if m.hw_enc() >= 32 {
        return Err(CodegenError::OperandClass(format!(
            "register index {} exceeds the MSA register file",
            m.hw_enc()
        )));
    }
    Ok(u32::from(m.hw_enc()))
}

// I-type opcodes (bits 31..26).
const OP_ADDIU: u32 = 0x09;
const OP_DADDIU: u32 = 0x19;
const OP_ANDI: u32 = 0x0c;
const OP_ORI: u32 = 0x0d;
const OP_XORI: u32 = 0x0e;
const OP_LUI: u32 = 0x0f;
const OP_BEQ: u32 = 0x04;
const OP_BNE: u32 = 0x05;
const OP_BC_R6: u32 = 0x32;
const OP_LB: u32 = 0x20;
const OP_LH: u32 = 0x21;
const OP_LW: u32 = 0x23;
const OP_LBU: u32 = 0x24;
const OP_LHU: u32 = 0x25;
const OP_LWU: u32 = 0x27;
const OP_LD: u32 = 0x37;
const OP_SB: u32 = 0x28;
const OP_SH: u32 = 0x29;
const OP_SW: u32 = 0x2b;
const OP_SD: u32 = 0x3f;

// SPECIAL (opcode 0) function codes.
const F_SLL: u32 = 0x00;
const F_SRL: u32 = 0x02;
const F_SRA: u32 = 0x03;
const F_SLLV: u32 = 0x04;
const F_SRLV: u32 = 0x06;
const F_SRAV: u32 = 0x07;
const F_MFLO: u32 = 0x12;
const F_DSLLV: u32 = 0x14;
const F_DSRLV: u32 = 0x16;
const F_DSRAV: u32 = 0x17;
const F_MULT: u32 = 0x18;
const F_DMULT: u32 = 0x1c;
const F_ADDU: u32 = 0x21;
const F_SUBU: u32 = 0x23;
const F_AND: u32 = 0x24;
const F_OR: u32 = 0x25;
const F_XOR: u32 = 0x26;
const F_SLT: u32 = 0x2a;
const F_SLTU: u32 = 0x2b;
const F_DADDU: u32 = 0x2d;
const F_DSUBU: u32 = 0x2f;
const F_DSLL: u32 = 0x38;
const F_DSRL: u32 = 0x3a;
const F_DSRA: u32 = 0x3b;
const F_DSLL32: u32 = 0x3c;
const F_DSRL32: u32 = 0x3e;
const F_DSRA32: u32 = 0x3f;

const NOP: u32 = 0x0000_0000;

fn enc_r(rs: u32, rt: u32, rd: u32, sa: u32, funct: u32) -> u32 {
    ((rs & 31) << 21) | ((rt & 31) << 16) | ((rd & 31) << 11) | ((sa & 31) << 6) | (funct & 0x3f)
}

fn enc_i(op: u32, rs: u32, rt: u32, imm16: u32) -> u32 {
    ((op & 0x3f) << 26) | ((rs & 31) << 21) | ((rt & 31) << 16) | (imm16 & 0xffff)
}

// MSA encodings (major opcode 0b011110).
const OP_MSA: u32 = 0x1e << 26;

fn enc_msa_vec(op: u32, wt: u32, ws: u32, wd: u32) -> u32 {
    OP_MSA | ((op & 31) << 21) | ((wt & 31) << 16) | ((ws & 31) << 11) | ((wd & 31) << 6) | 0x1e
}

fn enc_msa_3r(op: u32, df: u32, wt: u32, ws: u32, wd: u32) -> u32 {
    OP_MSA
        | ((op & 7) << 23)
        | ((df & 3) << 21)
        | ((wt & 31) << 16)
        | ((ws & 31) << 11)
        | ((wd & 31) << 6)
        | 0x0e
}

fn enc_msa_mi10(minor: u32, s10: SImm10, rs: u32, wd: u32) -> u32 {
    OP_MSA | (s10.bits() << 16) | ((rs & 31) << 11) | ((wd & 31) << 6) | (minor & 0x3f)
}

fn enc_msa_ldi(df: u32, s10: u32, wd: u32) -> u32 {
    OP_MSA | (0b110 << 23) | ((df & 3) << 21) | ((s10 & 0x3ff) << 11) | ((wd & 31) << 6) | 0b000111
}

fn enc_msa_fill(df: u32, rs: u32, wd: u32) -> u32 {
    OP_MSA | (0b11000000 << 18) | ((df & 3) << 16) | ((rs & 31) << 11) | ((wd & 31) << 6) | 0x1e
}

// Floating-point control transfers (COP1).
fn enc_cfc1(rt: u32) -> u32 {
    0x4440_0000 | ((rt & 31) << 16) | (31 << 11)
}

fn enc_ctc1(rt: u32) -> u32 {
    0x44c0_0000 | ((rt & 31) << 16) | (31 << 11)
}

/// The FCSR.RM field value for a rounding mode.
fn fcsr_rm(mode: RoundingMode) -> u32 {
    match mode {
        RoundingMode::Nearest => 0,
        RoundingMode::TowardZero => 1,
        RoundingMode::TowardPositive => 2,
        RoundingMode::TowardNegative => 3,
    }
}

/// Materialize `value` into `rd`.
///
/// One word for 16-bit shapes, `lui`(+`ori`) for 32-bit values, and the
/// full `lui`/`ori`/`dsll` chain for anything wider.
pub fn load_constant(rd: u32, value: u64, size: OperandSize) -> StagingWords {
    let value = match size {
        OperandSize::Size32 => i64::from(value as u32 as i32),
        OperandSize::Size64 => value as i64,
    };
    let mut insts = SmallVec::new();
    if let Some(imm) = Imm16::maybe_from_i64(value) {
        insts.push(enc_i(OP_DADDIU, 0, rd, imm.bits()));
    } else if value >= 0 && value <= 0xffff {
        insts.push(enc_i(OP_ORI, 0, rd, value as u32));
    } else if value == i64::from(value as i32) {
        insts.push(enc_i(OP_LUI, 0, rd, ((value as u64) >> 16) as u32 & 0xffff));
        if value & 0xffff != 0 {
            insts.push(enc_i(OP_ORI, rd, rd, value as u32 & 0xffff));
        }
    } else {
        let v = value as u64;
        insts.push(enc_i(OP_LUI, 0, rd, ((v >> 48) & 0xffff) as u32));
        insts.push(enc_i(OP_ORI, rd, rd, ((v >> 32) & 0xffff) as u32));
        insts.push(enc_r(0, rd, rd, 16, F_DSLL));
        insts.push(enc_i(OP_ORI, rd, rd, ((v >> 16) & 0xffff) as u32));
        insts.push(enc_r(0, rd, rd, 16, F_DSLL));
        insts.push(enc_i(OP_ORI, rd, rd, (v & 0xffff) as u32));
    }
    insts
}

/// Scalar addressing resolution. MIPS has a single base+offset16 shape, so
/// an index register is always folded into the address scratch register, and
/// a wide displacement is staged through the immediate scratch register.
pub fn mem_finalize(
    mem: &MemArg,
    scratch: &ScratchRegs,
) -> CodegenResult<(StagingWords, AMode)> {
    let mut words = SmallVec::new();
    let mut base = mem.base();
    let tmp = machreg_to_gpr(scratch.addr_tmp)?;

    if let Some(index) = mem.index() {
        if base == scratch.addr_tmp || index == scratch.addr_tmp {
            return Err(CodegenError::ScratchConflict(format!(
                "memory operand {} aliases the address scratch register",
                mem
            )));
        }
        words.push(enc_r(
            machreg_to_gpr(base)?,
            machreg_to_gpr(index)?,
            tmp,
            0,
            F_DADDU,
        ));
        base = scratch.addr_tmp;
    }

    if let Some(offset) = Imm16::maybe_from_i64(mem.disp()) {
        return Ok((words, AMode { base, offset }));
    }

    log::trace!("mem_finalize: staging displacement {} via scratch", mem.disp());
    // An index-folded base is the scratch itself; only a caller-supplied
    // base is a conflict.
    if mem.base() == scratch.addr_tmp {
        return Err(CodegenError::ScratchConflict(format!(
            "memory operand {} aliases the address scratch register",
            mem
        )));
    }
    if base == scratch.imm_tmp {
        return Err(CodegenError::ScratchConflict(format!(
            "memory operand {} aliases the immediate scratch register",
            mem
        )));
    }
    let imm = machreg_to_gpr(scratch.imm_tmp)?;
    words.extend(load_constant(imm, mem.disp() as u64, OperandSize::Size64));
    words.push(enc_r(machreg_to_gpr(base)?, imm, tmp, 0, F_DADDU));
    Ok((
        words,
        AMode {
            base: scratch.addr_tmp,
            offset: Imm16 { value: 0 },
        },
    ))
}

/// MSA addressing resolution: `ld.d`/`st.d` when the displacement is
/// 8-aligned and in reach, byte-format `ld.b`/`st.b` for small unaligned
/// displacements, staged address otherwise.
fn msa_mem_finalize(
    mem: &MemArg,
    scratch: &ScratchRegs,
) -> CodegenResult<(StagingWords, MsaAMode)> {
    let mut words = SmallVec::new();
    let mut base = mem.base();
    let disp = mem.disp();
    let tmp = machreg_to_gpr(scratch.addr_tmp)?;

    if let Some(index) = mem.index() {
        if base == scratch.addr_tmp || index == scratch.addr_tmp {
            return Err(CodegenError::ScratchConflict(format!(
                "memory operand {} aliases the address scratch register",
                mem
            )));
        }
        words.push(enc_r(
            machreg_to_gpr(base)?,
            machreg_to_gpr(index)?,
            tmp,
            0,
            F_DADDU,
        ));
        base = scratch.addr_tmp;
    }

    if disp % 8 == 0 {
        if let Some(s10) = SImm10::maybe_from_i64(disp / 8) {
            return Ok((words, MsaAMode { base, s10, df: 3 }));
        }
    }
    if let Some(s10) = SImm10::maybe_from_i64(disp) {
        return Ok((words, MsaAMode { base, s10, df: 0 }));
    }

    if mem.base() == scratch.addr_tmp {
        return Err(CodegenError::ScratchConflict(format!(
            "memory operand {} aliases the address scratch register",
            mem
        )));
    }
    if base == scratch.imm_tmp {
        return Err(CodegenError::ScratchConflict(format!(
            "memory operand {} aliases the immediate scratch register",
            mem
        )));
    }
    let imm = machreg_to_gpr(scratch.imm_tmp)?;
    words.extend(load_constant(imm, disp as u64, OperandSize::Size64));
    words.push(enc_r(machreg_to_gpr(base)?, imm, tmp, 0, F_DADDU));
    Ok((
        words,
        MsaAMode {
            base: scratch.addr_tmp,
            s10: SImm10 { value: 0 },
            df: 3,
        },
    ))
}

/// The word(s) of a three-register ALU operation. Multiplication is two
/// words before R6 (`dmult`/`mult` plus `mflo`) and one word on R6.
fn alu_rrr_words(
    op: AluOp,
    size: OperandSize,
    set_flags: bool,
    rd: Writable<Reg>,
    rn: Reg,
    rm: Reg,
    rev: Revision,
) -> CodegenResult<StagingWords> {
    if set_flags {
        return Err(CodegenError::Unsupported(
            "mips64 has no condition flags".to_string(),
        ));
    }
    let rd = machreg_to_gpr(rd.to_reg())?;
    let rn = machreg_to_gpr(rn)?;
    let rm = machreg_to_gpr(rm)?;
    let wide = size == OperandSize::Size64;
    let mut words = SmallVec::new();
    match op {
        AluOp::Add => words.push(enc_r(rn, rm, rd, 0, if wide { F_DADDU } else { F_ADDU })),
        AluOp::Sub => words.push(enc_r(rn, rm, rd, 0, if wide { F_DSUBU } else { F_SUBU })),
        AluOp::And => words.push(enc_r(rn, rm, rd, 0, F_AND)),
        AluOp::Or => words.push(enc_r(rn, rm, rd, 0, F_OR)),
        AluOp::Xor => words.push(enc_r(rn, rm, rd, 0, F_XOR)),
        AluOp::Mul => {
            let funct = if wide { F_DMULT } else { F_MULT };
            match rev {
                Revision::PreR6 => {
                    words.push(enc_r(rn, rm, 0, 0, funct));
                    words.push(enc_r(0, 0, rd, 0, F_MFLO));
                }
                // R6 repurposes the old hi/lo multiply encodings: same
                // function code, sa field 0b00010 selects the low half.
                Revision::R6 => words.push(enc_r(rn, rm, rd, 0b00010, funct)),
            }
        }
        // Variable shifts take the amount in the rs field.
        AluOp::Lsl => words.push(enc_r(rm, rn, rd, 0, if wide { F_DSLLV } else { F_SLLV })),
        AluOp::Lsr => words.push(enc_r(rm, rn, rd, 0, if wide { F_DSRLV } else { F_SRLV })),
        AluOp::Asr => words.push(enc_r(rm, rn, rd, 0, if wide { F_DSRAV } else { F_SRAV })),
    }
    Ok(words)
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
    rev: Revision,
) -> CodegenResult<()> {
    if set_flags {
        return Err(CodegenError::Unsupported(
            "mips64 has no condition flags".to_string(),
        ));
    }
    let rd_num = machreg_to_gpr(rd.to_reg())?;
    let rn_num = machreg_to_gpr(rn)?;
    let wide = size == OperandSize::Size64;

    match op {
        AluOp::Add | AluOp::Sub => {
            let addend = if op == AluOp::Sub {
                imm.checked_neg()
            } else {
                Some(imm)
            };
            if let Some(imm16) = addend.and_then(Imm16::maybe_from_i64) {
                let opc = if wide { OP_DADDIU } else { OP_ADDIU };
                sink.put4(enc_i(opc, rn_num, rd_num, imm16.bits()));
                return Ok(());
            }
        }
        AluOp::And | AluOp::Or | AluOp::Xor => {
            // andi/ori/xori zero-extend their immediate.
            if imm >= 0 {
                if let Some(imm16) = UImm16::maybe_from_u64(imm as u64) {
                    let opc = match op {
                        AluOp::And => OP_ANDI,
                        AluOp::Or => OP_ORI,
                        _ => OP_XORI,
                    };
                    sink.put4(enc_i(opc, rn_num, rd_num, imm16.bits()));
                    return Ok(());
                }
            }
        }
        AluOp::Lsl | AluOp::Lsr | AluOp::Asr => {
            let bits = u64::from(size.bits());
            let shift = imm as u64;
            if shift >= bits {
                return Err(CodegenError::OutOfRange(format!(
                    "shift amount {} out of range for {}-bit operation",
                    imm, bits
                )));
            }
            let shift = shift as u32;
            let funct = match (op, wide, shift >= 32) {
                (AluOp::Lsl, false, _) => F_SLL,
                (AluOp::Lsr, false, _) => F_SRL,
                (AluOp::Asr, false, _) => F_SRA,
                (AluOp::Lsl, true, false) => F_DSLL,
                (AluOp::Lsr, true, false) => F_DSRL,
                (AluOp::Asr, true, false) => F_DSRA,
                (AluOp::Lsl, true, true) => F_DSLL32,
                (AluOp::Lsr, true, true) => F_DSRL32,
                (AluOp::Asr, true, true) => F_DSRA32,
                _ => unreachable!(),
            };
            sink.put4(enc_r(0, rn_num, rd_num, shift & 31, funct));
            return Ok(());
        }
        AluOp::Mul => {}
    }

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
    for word in alu_rrr_words(op, size, false, rd, rn, scratch.imm_tmp, rev)? {
        sink.put4(word);
    }
    Ok(())
}

fn ldst_opcode(ty: AccessWidth, sign_extend: bool, is_load: bool) -> u32 {
    match (is_load, ty, sign_extend) {
        (true, AccessWidth::B, true) => OP_LB,
        (true, AccessWidth::B, false) => OP_LBU,
        (true, AccessWidth::H, true) => OP_LH,
        (true, AccessWidth::H, false) => OP_LHU,
        (true, AccessWidth::W, true) => OP_LW,
        (true, AccessWidth::W, false) => OP_LWU,
        (true, AccessWidth::D, _) => OP_LD,
        (false, AccessWidth::B, _) => OP_SB,
        (false, AccessWidth::H, _) => OP_SH,
        (false, AccessWidth::W, _) => OP_SW,
        (false, AccessWidth::D, _) => OP_SD,
    }
}

/// Emit a branch word plus, for delay-slot forms, the mandatory slot `nop`.
/// `beq`/`bne` keep their delay slot on R6; only the compact `bc` is free
/// of one.
fn emit_branch(
    sink: &mut CodeBuffer,
    word: u32,
    target: MachLabel,
    kind: LabelUse,
    has_delay_slot: bool,
) {
    sink.use_label_at_offset(sink.cur_offset(), target, kind);
    sink.put4(word);
    if has_delay_slot {
        sink.put4(NOP);
    }
}

/// Lower a fused compare into `beq`/`bne`, synthesizing other conditions
/// through `slt`/`sltu` into the comparison scratch register.
fn emit_cmp_br(
    sink: &mut CodeBuffer,
    cc: IntCC,
    rn: Reg,
    rm: Reg,
    target: MachLabel,
    scratch: &ScratchRegs,
) -> CodegenResult<()> {
    let rn_num = machreg_to_gpr(rn)?;
    let rm_num = machreg_to_gpr(rm)?;
    match cc {
        IntCC::Equal => {
            emit_branch(sink, enc_i(OP_BEQ, rn_num, rm_num, 0), target, LabelUse::MipsBranch16, true);
            return Ok(());
        }
        IntCC::NotEqual => {
            emit_branch(sink, enc_i(OP_BNE, rn_num, rm_num, 0), target, LabelUse::MipsBranch16, true);
            return Ok(());
        }
        _ => {}
    }

    // slt t, a, b leaves 1 when a < b; pick operand order and branch sense
    // so every remaining condition reduces to it.
    let funct = if cc.is_signed() { F_SLT } else { F_SLTU };
    let (lhs, rhs, branch_if_set) = match cc {
        IntCC::SignedLessThan | IntCC::UnsignedLessThan => (rn_num, rm_num, true),
        IntCC::SignedGreaterThanOrEqual | IntCC::UnsignedGreaterThanOrEqual => {
            (rn_num, rm_num, false)
        }
        IntCC::SignedGreaterThan | IntCC::UnsignedGreaterThan => (rm_num, rn_num, true),
        IntCC::SignedLessThanOrEqual | IntCC::UnsignedLessThanOrEqual => (rm_num, rn_num, false),
        IntCC::Equal | IntCC::NotEqual => unreachable!(),
    };
    let t = machreg_to_gpr(scratch.cmp_lhs)?;
    sink.put4(enc_r(lhs, rhs, t, 0, funct));
    let opc = if branch_if_set { OP_BNE } else { OP_BEQ };
    emit_branch(sink, enc_i(opc, t, 0, 0), target, LabelUse::MipsBranch16, true);
    Ok(())
}

fn lane_mask(lane: LaneSize) -> u64 {
    match lane {
        LaneSize::S8 => 0xff,
        LaneSize::S16 => 0xffff,
        LaneSize::S32 => 0xffff_ffff,
        LaneSize::S64 => u64::MAX,
    }
}

/// Sign-extend `imm` from the lane width.
fn lane_signed(imm: i64, lane: LaneSize) -> i64 {
    let bits = lane.bytes() * 8;
    if bits == 64 {
        imm
    } else {
        let shift = 64 - bits;
        (imm << shift) >> shift
    }
}

fn expect_v128(width: VectorWidth) -> CodegenResult<()> {
    if width != VectorWidth::V128 {
        return Err(CodegenError::OperandClass(format!(
            "{}-bit vector operand reached the mips64 backend unpaired",
            width.bytes() * 8
        )));
    }
    Ok(())
}

/// Encode one logical instruction into the sink.
pub fn emit(
    inst: &MInst,
    sink: &mut CodeBuffer,
    state: &mut EmitState,
    rev: Revision,
) -> CodegenResult<()> {
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
            for word in alu_rrr_words(*op, *size, *set_flags, *rd, *rn, *rm, rev)? {
                sink.put4(word);
            }
        }

        MInst::AluRRImm {
            op,
            size,
            rd,
            rn,
            imm,
            set_flags,
        } => {
            emit_alu_rr_imm(sink, *op, *size, *set_flags, *rd, *rn, *imm, &scratch, rev)?;
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
            let (staging, amode) = mem_finalize(mem, &scratch)?;
            for word in staging {
                sink.put4(word);
            }
            let opc = ldst_opcode(*ty, *sign_extend, true);
            sink.put4(enc_i(
                opc,
                machreg_to_gpr(amode.base)?,
                machreg_to_gpr(rd.to_reg())?,
                amode.offset.bits(),
            ));
        }

        MInst::Store { ty, rs, mem } => {
            let (staging, amode) = mem_finalize(mem, &scratch)?;
            for word in staging {
                sink.put4(word);
            }
            let opc = ldst_opcode(*ty, false, false);
            sink.put4(enc_i(
                opc,
                machreg_to_gpr(amode.base)?,
                machreg_to_gpr(*rs)?,
                amode.offset.bits(),
            ));
        }

        MInst::LoadAddr { rd, mem } => {
            let rd_num = machreg_to_gpr(rd.to_reg())?;
            match (mem.index(), Imm16::maybe_from_i64(mem.disp())) {
                (None, Some(offset)) => {
                    sink.put4(enc_i(OP_DADDIU, machreg_to_gpr(mem.base())?, rd_num, offset.bits()));
                }
                (Some(index), _) if mem.disp() == 0 => {
                    sink.put4(enc_r(
                        machreg_to_gpr(mem.base())?,
                        machreg_to_gpr(index)?,
                        rd_num,
                        0,
                        F_DADDU,
                    ));
                }
                _ => {
                    let (staging, amode) = mem_finalize(mem, &scratch)?;
                    for word in staging {
                        sink.put4(word);
                    }
                    // The resolved offset is zero here; just move the base.
                    sink.put4(enc_i(OP_DADDIU, machreg_to_gpr(amode.base)?, rd_num, 0));
                }
            }
        }

        MInst::Jump { target } => match rev {
            Revision::PreR6 => {
                // b: beq $zero, $zero.
                emit_branch(sink, enc_i(OP_BEQ, 0, 0, 0), *target, LabelUse::MipsBranch16, true);
            }
            Revision::R6 => {
                emit_branch(
                    sink,
                    (OP_BC_R6 & 0x3f) << 26,
                    *target,
                    LabelUse::MipsBranch26,
                    false,
                );
            }
        },

        MInst::CmpBr {
            cc,
            size: _,
            rn,
            rm,
            target,
        } => {
            emit_cmp_br(sink, *cc, *rn, *rm, *target, &scratch)?;
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
            for word in alu_rrr_words(*op, *size, false, *rd, *rn, *rm, rev)? {
                sink.put4(word);
            }
            let result = machreg_to_gpr(rd.to_reg())?;
            let opc = match cond {
                ZeroCond::Zero => OP_BEQ,
                ZeroCond::NotZero => OP_BNE,
            };
            emit_branch(sink, enc_i(opc, result, 0, 0), *target, LabelUse::MipsBranch16, true);
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
            let wd = machreg_to_wreg(vd.to_reg())?;
            let ws = machreg_to_wreg(*vn)?;
            let wt = machreg_to_wreg(*vm)?;
            let word = match op {
                VecAluOp::And => enc_msa_vec(0b00000, wt, ws, wd),
                VecAluOp::Or => enc_msa_vec(0b00001, wt, ws, wd),
                VecAluOp::Xor => enc_msa_vec(0b00011, wt, ws, wd),
                VecAluOp::Add => enc_msa_3r(0b000, lane.log2_bytes(), wt, ws, wd),
                VecAluOp::Sub => enc_msa_3r(0b001, lane.log2_bytes(), wt, ws, wd),
            };
            sink.put4(word);
        }

        MInst::VecLoad { width, vd, mem } => {
            expect_v128(*width)?;
            let (staging, amode) = msa_mem_finalize(mem, &scratch)?;
            for word in staging {
                sink.put4(word);
            }
            sink.put4(enc_msa_mi10(
                0x20 | amode.df,
                amode.s10,
                machreg_to_gpr(amode.base)?,
                machreg_to_wreg(vd.to_reg())?,
            ));
        }

        MInst::VecStore { width, vs, mem } => {
            expect_v128(*width)?;
            let (staging, amode) = msa_mem_finalize(mem, &scratch)?;
            for word in staging {
                sink.put4(word);
            }
            sink.put4(enc_msa_mi10(
                0x24 | amode.df,
                amode.s10,
                machreg_to_gpr(amode.base)?,
                machreg_to_wreg(*vs)?,
            ));
        }

        MInst::VecSplatImm {
            width,
            lane,
            vd,
            imm,
        } => {
            expect_v128(*width)?;
            let wd = machreg_to_wreg(vd.to_reg())?;
            let value = lane_signed(*imm, *lane);
            if value >= -512 && value <= 511 {
                sink.put4(enc_msa_ldi(lane.log2_bytes(), (value as u32) & 0x3ff, wd));
            } else {
                let tmp = machreg_to_gpr(scratch.imm_tmp)?;
                for word in load_constant(tmp, (*imm as u64) & lane_mask(*lane), OperandSize::Size64)
                {
                    sink.put4(word);
                }
                sink.put4(enc_msa_fill(lane.log2_bytes(), tmp, wd));
            }
        }

        MInst::VecDup {
            width,
            lane,
            vd,
            rn,
        } => {
            expect_v128(*width)?;
            sink.put4(enc_msa_fill(
                lane.log2_bytes(),
                machreg_to_gpr(*rn)?,
                machreg_to_wreg(vd.to_reg())?,
            ));
        }

        MInst::SetFpRoundingMode { mode } => {
            let save = machreg_to_gpr(scratch.fctrl_save)?;
            let tmp = machreg_to_gpr(scratch.imm_tmp)?;
            sink.put4(enc_cfc1(save));
            // Force RM to 0b11, then xor down to the requested mode.
            sink.put4(enc_i(OP_ORI, save, tmp, 3));
            let flip = 3 ^ fcsr_rm(*mode);
            if flip != 0 {
                sink.put4(enc_i(OP_XORI, tmp, tmp, flip));
            }
            sink.put4(enc_ctc1(tmp));
        }

        MInst::RestoreFpRoundingMode => {
            let save = machreg_to_gpr(scratch.fctrl_save)?;
            sink.put4(enc_ctc1(save));
        }
    }
    Ok(())
}
