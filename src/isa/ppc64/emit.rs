//! PowerPC64 ISA: binary code emission.

use smallvec::SmallVec;

use crate::condcodes::IntCC;
use crate::error::{CodegenError, CodegenResult};
use crate::isa::ppc64::args::{AMode, VecAMode};
use crate::isa::ppc64::imms::{DqOffset, SImm16, UImm16};
use crate::isa::ppc64::Revision;
use crate::isa::{EmitState, ScratchRegs};
use crate::machinst::{
    AccessWidth, AluOp, CodeBuffer, LabelUse, LaneSize, MInst, MemArg, OperandSize, Reg,
    RegClass, RoundingMode, VecAluOp, VectorWidth, Writable, ZeroCond,
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
            "register index {} exceeds the ppc64 register file",
            m.hw_enc()
        )));
    }
    Ok(u32::from(m.hw_enc()))
}

fn machreg_to_vr(m: Reg) -> CodegenResult<u32> {
    if m.class() != RegClass::Vector {
        return Err(CodegenError::OperandClass(format!(
            "{} used where a vector register is required",
            m
        )));
    }
    if m.hw_enc() >= 32 {
        return Err(CodegenError::OperandClass(format!(
            "register index {} exceeds the ppc64 vector file",
            m.hw_enc()
        )));
    }
    Ok(u32::from(m.hw_enc()))
}

// XO-form arithmetic: rt, ra, rb.
const XO_ADD: u32 = 0x7c00_0214;
const XO_SUBF: u32 = 0x7c00_0050;
const XO_MULLD: u32 = 0x7c00_01d2;
const XO_MULLW: u32 = 0x7c00_01d6;

// X-form logicals and shifts: rs, ra, rb (destination in ra).
const X_AND: u32 = 0x7c00_0038;
const X_OR: u32 = 0x7c00_0378;
const X_XOR: u32 = 0x7c00_0278;
const X_SLD: u32 = 0x7c00_0036;
const X_SLW: u32 = 0x7c00_0030;
const X_SRD: u32 = 0x7c00_0436;
const X_SRW: u32 = 0x7c00_0430;
const X_SRAD: u32 = 0x7c00_0634;
const X_SRAW: u32 = 0x7c00_0630;
const X_EXTSB: u32 = 0x7c00_0774;
const X_EXTSW: u32 = 0x7c00_07b4;

// D-form immediates.
const D_ADDI: u32 = 0x3800_0000;
const D_ADDIS: u32 = 0x3c00_0000;
const D_ORI: u32 = 0x6000_0000;
const D_ORIS: u32 = 0x6400_0000;
const D_XORI: u32 = 0x6800_0000;
const D_ANDI_RC: u32 = 0x7000_0000;

// D-form memory accesses.
const D_LBZ: u32 = 0x8800_0000;
const D_LHZ: u32 = 0xa000_0000;
const D_LHA: u32 = 0xa800_0000;
const D_LWZ: u32 = 0x8000_0000;
const DS_LWA: u32 = 0xe800_0002;
const DS_LD: u32 = 0xe800_0000;
const D_STB: u32 = 0x9800_0000;
const D_STH: u32 = 0xb000_0000;
const D_STW: u32 = 0x9000_0000;
const DS_STD: u32 = 0xf800_0000;

// X-form memory accesses.
const X_LBZX: u32 = 0x7c00_00ae;
const X_LHZX: u32 = 0x7c00_022e;
const X_LHAX: u32 = 0x7c00_02ae;
const X_LWZX: u32 = 0x7c00_002e;
const X_LWAX: u32 = 0x7c00_02aa;
const X_LDX: u32 = 0x7c00_002a;
const X_STBX: u32 = 0x7c00_01ae;
const X_STHX: u32 = 0x7c00_032e;
const X_STWX: u32 = 0x7c00_012e;
const X_STDX: u32 = 0x7c00_012a;

// VSX and VMX vector operations.
const XX3_XXLAND: u32 = 0xf000_0410;
const XX3_XXLOR: u32 = 0xf000_0490;
const XX3_XXLXOR: u32 = 0xf000_04d0;
const XX3_XXLEQV: u32 = 0xf000_05d0;
const XX3_XXPERMDI: u32 = 0xf000_0050;
const XX2_XXSPLTW: u32 = 0xf000_0290;
const X_XXSPLTIB: u32 = 0xf000_02d0;
const X_MTVSRD: u32 = 0x7c00_0166;
const X_MTVSRWS: u32 = 0x7c00_0326;
const X_LXVD2X: u32 = 0x7c00_0698;
const X_STXVD2X: u32 = 0x7c00_0798;
const DQ_LXV: u32 = 0xf400_0001;
const DQ_STXV: u32 = 0xf400_0005;

// Floating-point status and control.
const X_MFFS: u32 = 0xfc00_048e;
const X_MTFSF: u32 = 0xfc00_058e;
const X_MTFSFI: u32 = 0xfc00_010c;

const NOP: u32 = 0x6000_0000; // ori r0, r0, 0

fn enc_rrr(base: u32, rt: u32, ra: u32, rb: u32) -> u32 {
    base | ((rt & 31) << 21) | ((ra & 31) << 16) | ((rb & 31) << 11)
}

fn enc_d(base: u32, rt: u32, ra: u32, imm16: u32) -> u32 {
    base | ((rt & 31) << 21) | ((ra & 31) << 16) | (imm16 & 0xffff)
}

/// MD-form rotates (`rldicl`/`rldicr`): 6-bit shift and mask fields split
/// across the word.
fn enc_rldic(rs: u32, ra: u32, sh: u32, mask: u32, is_icr: bool) -> u32 {
    let xo = if is_icr { 1 << 2 } else { 0 };
    0x7800_0000
        | ((rs & 31) << 21)
        | ((ra & 31) << 16)
        | ((sh & 31) << 11)
        | ((mask & 31) << 6)
        | ((mask >> 5) << 5)
        | xo
        | ((sh >> 5) << 1)
}

fn enc_rlwinm(rs: u32, ra: u32, sh: u32, mb: u32, me: u32) -> u32 {
    0x5400_0000 | ((rs & 31) << 21) | ((ra & 31) << 16) | ((sh & 31) << 11) | ((mb & 31) << 6)
        | ((me & 31) << 1)
}

/// XX3-form with all three operands in the VMX half of the VSX file: the
/// TX/AX/BX extension bits are all set.
fn enc_xx3(base: u32, t: u32, a: u32, b: u32) -> u32 {
    base | ((t & 31) << 21) | ((a & 31) << 16) | ((b & 31) << 11) | 0b111
}

fn enc_vmx(xo: u32, vd: u32, va: u32, vb: u32) -> u32 {
    0x1000_0000 | ((vd & 31) << 21) | ((va & 31) << 16) | ((vb & 31) << 11) | (xo & 0x7ff)
}

/// The FPSCR.RN field value for a rounding mode.
fn fpscr_rn(mode: RoundingMode) -> u32 {
    match mode {
        RoundingMode::Nearest => 0,
        RoundingMode::TowardZero => 1,
        RoundingMode::TowardPositive => 2,
        RoundingMode::TowardNegative => 3,
    }
}

/// Materialize `value` into `rd`: `li`, `lis`(+`ori`), or the full
/// five-word 64-bit sequence.
pub fn load_constant(rd: u32, value: u64, size: OperandSize) -> StagingWords {
    let value = match size {
        OperandSize::Size32 => i64::from(value as u32 as i32),
        OperandSize::Size64 => value as i64,
    };
    let mut insts = SmallVec::new();
    if let Some(imm) = SImm16::maybe_from_i64(value) {
        insts.push(enc_d(D_ADDI, rd, 0, imm.bits()));
    } else if value == i64::from(value as i32) {
        insts.push(enc_d(D_ADDIS, rd, 0, ((value as u64) >> 16) as u32 & 0xffff));
        if value & 0xffff != 0 {
            insts.push(enc_d(D_ORI, rd, rd, value as u32 & 0xffff));
        }
    } else {
        let v = value as u64;
        insts.push(enc_d(D_ADDIS, rd, 0, ((v >> 48) & 0xffff) as u32));
        insts.push(enc_d(D_ORI, rd, rd, ((v >> 32) & 0xffff) as u32));
        // sldi rd, rd, 32
        insts.push(enc_rldic(rd, rd, 32, 31, true));
        insts.push(enc_d(D_ORIS, rd, rd, ((v >> 16) & 0xffff) as u32));
        insts.push(enc_d(D_ORI, rd, rd, (v & 0xffff) as u32));
    }
    insts
}

/// Scalar addressing resolution.
///
/// `align` is the displacement alignment the chosen mnemonic requires: 4
/// for the DS-form `ld`/`std`/`lwa`, 1 otherwise. r0 reads as literal zero
/// in the D-form base slot, so a r0 base is routed to register forms.
pub fn mem_finalize(
    mem: &MemArg,
    align: i64,
    scratch: &ScratchRegs,
) -> CodegenResult<(StagingWords, AMode)> {
    let mut words = SmallVec::new();
    let base = mem.base();
    let tmp = machreg_to_gpr(scratch.addr_tmp)?;

    if let Some(index) = mem.index() {
        // X-form reads RA=0 as literal zero, so a r0 base goes in the
        // index slot instead.
        let (mut ra, mut rb) = (base, index);
        if ra.hw_enc() == 0 {
            core::mem::swap(&mut ra, &mut rb);
        }
        if ra.hw_enc() == 0 {
            return Err(CodegenError::OperandClass(format!(
                "memory operand {} uses r0 as both base and index",
                mem
            )));
        }
        if mem.disp() == 0 {
            return Ok((words, AMode::X(ra, rb)));
        }
        if base == scratch.addr_tmp || index == scratch.addr_tmp {
            return Err(CodegenError::ScratchConflict(format!(
                "memory operand {} aliases the address scratch register",
                mem
            )));
        }
        if mem.disp() % align == 0 {
            if let Some(offset) = SImm16::maybe_from_i64(mem.disp()) {
                words.push(enc_rrr(
                    XO_ADD,
                    tmp,
                    machreg_to_gpr(base)?,
                    machreg_to_gpr(index)?,
                ));
                return Ok((words, AMode::D(scratch.addr_tmp, offset)));
            }
        }
        // The displacement goes into scratch first so the sum never
        // clobbers a live operand.
        words.extend(load_constant(tmp, mem.disp() as u64, OperandSize::Size64));
        words.push(enc_rrr(XO_ADD, tmp, machreg_to_gpr(base)?, tmp));
        words.push(enc_rrr(XO_ADD, tmp, tmp, machreg_to_gpr(index)?));
        return Ok((words, AMode::D(scratch.addr_tmp, SImm16 { value: 0 })));
    }

    if base.hw_enc() != 0 && mem.disp() % align == 0 {
        if let Some(offset) = SImm16::maybe_from_i64(mem.disp()) {
            return Ok((words, AMode::D(base, offset)));
        }
    }

    if base == scratch.addr_tmp {
        return Err(CodegenError::ScratchConflict(format!(
            "memory operand {} aliases the address scratch register",
            mem
        )));
    }
    log::trace!("mem_finalize: staging displacement {} via scratch", mem.disp());
    words.extend(load_constant(tmp, mem.disp() as u64, OperandSize::Size64));
    words.push(enc_rrr(XO_ADD, tmp, machreg_to_gpr(base)?, tmp));
    Ok((words, AMode::D(scratch.addr_tmp, SImm16 { value: 0 })))
}

/// Vector addressing resolution: `lxv`/`stxv` DQ-form on ISA 3.0 when the
/// displacement fits, indexed `lxvd2x`/`stxvd2x` otherwise, staging the
/// displacement (or a whole base+displacement address) through scratch.
fn vec_mem_finalize(
    mem: &MemArg,
    rev: Revision,
    scratch: &ScratchRegs,
) -> CodegenResult<(StagingWords, VecAMode)> {
    let mut words = SmallVec::new();
    let base = mem.base();
    let tmp = machreg_to_gpr(scratch.addr_tmp)?;

    if let Some(index) = mem.index() {
        if mem.disp() == 0 {
            // Indexed RA reads r0 as literal zero, so a r0 base swaps into
            // the RB slot.
            let (mut ra, mut rb) = (base, index);
            if ra.hw_enc() == 0 {
                core::mem::swap(&mut ra, &mut rb);
            }
            if ra.hw_enc() == 0 {
                return Err(CodegenError::OperandClass(format!(
                    "memory operand {} uses r0 as both base and index",
                    mem
                )));
            }
            return Ok((words, VecAMode::Indexed(Some(ra), rb)));
        }
        if base == scratch.addr_tmp || index == scratch.addr_tmp {
            return Err(CodegenError::ScratchConflict(format!(
                "memory operand {} aliases the address scratch register",
                mem
            )));
        }
        if rev == Revision::Vsx3 {
            if let Some(offset) = DqOffset::maybe_from_i64(mem.disp()) {
                words.push(enc_rrr(
                    XO_ADD,
                    tmp,
                    machreg_to_gpr(base)?,
                    machreg_to_gpr(index)?,
                ));
                return Ok((words, VecAMode::Dq(scratch.addr_tmp, offset)));
            }
        }
        words.extend(load_constant(tmp, mem.disp() as u64, OperandSize::Size64));
        words.push(enc_rrr(XO_ADD, tmp, machreg_to_gpr(base)?, tmp));
        words.push(enc_rrr(XO_ADD, tmp, tmp, machreg_to_gpr(index)?));
        return Ok((words, VecAMode::Indexed(None, scratch.addr_tmp)));
    }

    if rev == Revision::Vsx3 && base.hw_enc() != 0 {
        if let Some(offset) = DqOffset::maybe_from_i64(mem.disp()) {
            return Ok((words, VecAMode::Dq(base, offset)));
        }
    }
    if mem.disp() == 0 {
        // Indexed with RA=0: the effective address is the register alone,
        // which holds even for r0 in the RB slot.
        return Ok((words, VecAMode::Indexed(None, base)));
    }

    if base == scratch.addr_tmp {
        return Err(CodegenError::ScratchConflict(format!(
            "memory operand {} aliases the address scratch register",
            mem
        )));
    }
    words.extend(load_constant(tmp, mem.disp() as u64, OperandSize::Size64));
    words.push(enc_rrr(XO_ADD, tmp, machreg_to_gpr(base)?, tmp));
    Ok((words, VecAMode::Indexed(None, scratch.addr_tmp)))
}

/// The word(s) of a three-register ALU operation.
///
/// With `set_flags`, 64-bit operations use the record (`.`) form directly;
/// 32-bit operations append `extsw.` so that cr0 reflects the 32-bit
/// result.
fn alu_rrr_words(
    op: AluOp,
    size: OperandSize,
    set_flags: bool,
    rd: Writable<Reg>,
    rn: Reg,
    rm: Reg,
) -> CodegenResult<StagingWords> {
    let rd = machreg_to_gpr(rd.to_reg())?;
    let rn = machreg_to_gpr(rn)?;
    let rm = machreg_to_gpr(rm)?;
    let wide = size == OperandSize::Size64;
    let rc = if set_flags && wide { 1 } else { 0 };
    let mut words: StagingWords = SmallVec::new();
    match op {
        AluOp::Add => words.push(enc_rrr(XO_ADD | rc, rd, rn, rm)),
        // subf rt, ra, rb computes rb - ra.
        AluOp::Sub => words.push(enc_rrr(XO_SUBF | rc, rd, rm, rn)),
        AluOp::Mul => words.push(enc_rrr(if wide { XO_MULLD } else { XO_MULLW } | rc, rd, rn, rm)),
        // X-form logicals put the destination in the ra slot.
        AluOp::And => words.push(enc_rrr(X_AND | rc, rn, rd, rm)),
        AluOp::Or => words.push(enc_rrr(X_OR | rc, rn, rd, rm)),
        AluOp::Xor => words.push(enc_rrr(X_XOR | rc, rn, rd, rm)),
        AluOp::Lsl => words.push(enc_rrr(if wide { X_SLD } else { X_SLW } | rc, rn, rd, rm)),
        AluOp::Lsr => words.push(enc_rrr(if wide { X_SRD } else { X_SRW } | rc, rn, rd, rm)),
        AluOp::Asr => words.push(enc_rrr(if wide { X_SRAD } else { X_SRAW } | rc, rn, rd, rm)),
    }
    if set_flags && !wide {
        words.push(enc_rrr(X_EXTSW | 1, rd, rd, 0));
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
) -> CodegenResult<()> {
    let rd_num = machreg_to_gpr(rd.to_reg())?;
    let rn_num = machreg_to_gpr(rn)?;
    let wide = size == OperandSize::Size64;

    // andi. always records, and the 16-bit mask clears every higher bit of
    // the result, so cr0 is exact for either operand size. Use it whether or
    // not flags were asked for.
    if op == AluOp::And && imm >= 0 {
        if let Some(imm16) = UImm16::maybe_from_u64(imm as u64) {
            sink.put4(enc_d(D_ANDI_RC, rn_num, rd_num, imm16.bits()));
            return Ok(());
        }
    }

    if !set_flags {
        match op {
            // addi reads ra=0 as literal zero, so r0 sources are staged.
            AluOp::Add | AluOp::Sub if rn_num != 0 => {
                let addend = if op == AluOp::Sub {
                    imm.checked_neg()
                } else {
                    Some(imm)
                };
                if let Some(imm16) = addend.and_then(SImm16::maybe_from_i64) {
                    sink.put4(enc_d(D_ADDI, rd_num, rn_num, imm16.bits()));
                    return Ok(());
                }
            }
            AluOp::Or | AluOp::Xor if imm >= 0 => {
                if let Some(imm16) = UImm16::maybe_from_u64(imm as u64) {
                    let base = if op == AluOp::Or { D_ORI } else { D_XORI };
                    sink.put4(enc_d(base, rn_num, rd_num, imm16.bits()));
                    return Ok(());
                }
            }
            AluOp::Lsl | AluOp::Lsr | AluOp::Asr => {
                let bits = i64::from(size.bits());
                if imm < 0 || imm >= bits {
                    return Err(CodegenError::OutOfRange(format!(
                        "shift amount {} out of range for {}-bit operation",
                        imm, bits
                    )));
                }
                let sh = imm as u32;
                let word = match (op, wide) {
                    (AluOp::Lsl, true) => enc_rldic(rn_num, rd_num, sh, 63 - sh, true),
                    (AluOp::Lsr, true) => enc_rldic(rn_num, rd_num, (64 - sh) % 64, sh, false),
                    (AluOp::Asr, true) => {
                        0x7c00_0674
                            | (rn_num << 21)
                            | (rd_num << 16)
                            | ((sh & 31) << 11)
                            | ((sh >> 5) << 1)
                    }
                    (AluOp::Lsl, false) => enc_rlwinm(rn_num, rd_num, sh, 0, 31 - sh),
                    (AluOp::Lsr, false) => enc_rlwinm(rn_num, rd_num, (32 - sh) % 32, sh, 31),
                    (AluOp::Asr, false) => {
                        0x7c00_0670 | (rn_num << 21) | (rd_num << 16) | (sh << 11)
                    }
                    _ => unreachable!(),
                };
                sink.put4(word);
                return Ok(());
            }
            _ => {}
        }
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
    for word in alu_rrr_words(op, size, set_flags, rd, rn, scratch.imm_tmp)? {
        sink.put4(word);
    }
    Ok(())
}

/// Emit a load or store through a resolved addressing mode. The D-form and
/// X-form opcode pair differ, so both are passed.
fn emit_ldst(sink: &mut CodeBuffer, d_base: u32, x_base: u32, amode: &AMode, rt: u32) -> CodegenResult<()> {
    match amode {
        AMode::D(base, offset) => {
            sink.put4(enc_d(d_base, rt, machreg_to_gpr(*base)?, offset.bits()));
        }
        AMode::X(base, index) => {
            sink.put4(enc_rrr(x_base, rt, machreg_to_gpr(*base)?, machreg_to_gpr(*index)?));
        }
    }
    Ok(())
}

/// The `bc` BO/BI pair for a condition on cr0: BI picks the lt/gt/eq bit,
/// BO 12 branches if set, BO 4 branches if clear.
fn cond_bo_bi(cc: IntCC) -> (u32, u32) {
    match cc {
        IntCC::Equal => (12, 2),
        IntCC::NotEqual => (4, 2),
        IntCC::SignedLessThan | IntCC::UnsignedLessThan => (12, 0),
        IntCC::SignedGreaterThanOrEqual | IntCC::UnsignedGreaterThanOrEqual => (4, 0),
        IntCC::SignedGreaterThan | IntCC::UnsignedGreaterThan => (12, 1),
        IntCC::SignedLessThanOrEqual | IntCC::UnsignedLessThanOrEqual => (4, 1),
    }
}

fn enc_bc(bo: u32, bi: u32) -> u32 {
    0x4000_0000 | ((bo & 31) << 21) | ((bi & 31) << 16)
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
    for i in 1..lane.bytes() {
        if ((value >> (8 * i)) & 0xff) as u8 != b {
            return None;
        }
    }
    Some(b)
}

/// Replicate a lane-sized value across 64 bits.
fn replicate_to_u64(value: u64, lane: LaneSize) -> u64 {
    let mut v = value & lane_mask(lane);
    let mut bits = lane.bytes() * 8;
    while bits < 64 {
        v |= v << bits;
        bits *= 2;
    }
    v
}

fn expect_v128(width: VectorWidth) -> CodegenResult<()> {
    if width != VectorWidth::V128 {
        return Err(CodegenError::OperandClass(format!(
            "{}-bit vector operand reached the ppc64 backend unpaired",
            width.bytes() * 8
        )));
    }
    Ok(())
}

/// Broadcast the low 64 bits of a GPR into both doublewords of `vd`:
/// `mtvsrd` then `xxpermdi` with both sources the same.
fn emit_dup_doubleword(sink: &mut CodeBuffer, vd: u32, gpr: u32) {
    sink.put4(X_MTVSRD | (vd << 21) | (gpr << 16) | 1);
    sink.put4(enc_xx3(XX3_XXPERMDI, vd, vd, vd));
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
            for word in alu_rrr_words(*op, *size, *set_flags, *rd, *rn, *rm)? {
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
            let is_ds = *ty == AccessWidth::D || (*ty == AccessWidth::W && *sign_extend);
            let align = if is_ds { 4 } else { 1 };
            let (staging, amode) = mem_finalize(mem, align, &scratch)?;
            for word in staging {
                sink.put4(word);
            }
            let rt = machreg_to_gpr(rd.to_reg())?;
            let (d_base, x_base) = match (*ty, *sign_extend) {
                (AccessWidth::B, _) => (D_LBZ, X_LBZX),
                (AccessWidth::H, false) => (D_LHZ, X_LHZX),
                (AccessWidth::H, true) => (D_LHA, X_LHAX),
                (AccessWidth::W, false) => (D_LWZ, X_LWZX),
                (AccessWidth::W, true) => (DS_LWA, X_LWAX),
                (AccessWidth::D, _) => (DS_LD, X_LDX),
            };
            emit_ldst(sink, d_base, x_base, &amode, rt)?;
            // No sign-extending byte load: widen afterwards.
            if *ty == AccessWidth::B && *sign_extend {
                sink.put4(enc_rrr(X_EXTSB, rt, rt, 0));
            }
        }

        MInst::Store { ty, rs, mem } => {
            let align = if *ty == AccessWidth::D { 4 } else { 1 };
            let (staging, amode) = mem_finalize(mem, align, &scratch)?;
            for word in staging {
                sink.put4(word);
            }
            let rt = machreg_to_gpr(*rs)?;
            let (d_base, x_base) = match ty {
                AccessWidth::B => (D_STB, X_STBX),
                AccessWidth::H => (D_STH, X_STHX),
                AccessWidth::W => (D_STW, X_STWX),
                AccessWidth::D => (DS_STD, X_STDX),
            };
            emit_ldst(sink, d_base, x_base, &amode, rt)?;
        }

        MInst::LoadAddr { rd, mem } => {
            let rd_num = machreg_to_gpr(rd.to_reg())?;
            let base_num = machreg_to_gpr(mem.base())?;
            match (mem.index(), SImm16::maybe_from_i64(mem.disp())) {
                (None, Some(offset)) if base_num != 0 => {
                    sink.put4(enc_d(D_ADDI, rd_num, base_num, offset.bits()));
                }
                (Some(index), _) if mem.disp() == 0 => {
                    sink.put4(enc_rrr(XO_ADD, rd_num, base_num, machreg_to_gpr(index)?));
                }
                _ => {
                    let (staging, amode) = mem_finalize(mem, 1, &scratch)?;
                    for word in staging {
                        sink.put4(word);
                    }
                    match amode {
                        AMode::D(base, offset) => {
                            sink.put4(enc_d(D_ADDI, rd_num, machreg_to_gpr(base)?, offset.bits()));
                        }
                        AMode::X(base, index) => {
                            sink.put4(enc_rrr(
                                XO_ADD,
                                rd_num,
                                machreg_to_gpr(base)?,
                                machreg_to_gpr(index)?,
                            ));
                        }
                    }
                }
            }
        }

        MInst::Jump { target } => {
            sink.use_label_at_offset(sink.cur_offset(), *target, LabelUse::PpcBranch24);
            sink.put4(0x4800_0000);
        }

        MInst::CmpBr {
            cc,
            size,
            rn,
            rm,
            target,
        } => {
            let l = if *size == OperandSize::Size64 { 1 << 21 } else { 0 };
            let unsigned_bit = if cc.is_signed() { 0 } else { 0x40 };
            sink.put4(
                0x7c00_0000
                    | l
                    | unsigned_bit
                    | (machreg_to_gpr(*rn)? << 16)
                    | (machreg_to_gpr(*rm)? << 11),
            );
            let (bo, bi) = cond_bo_bi(*cc);
            sink.use_label_at_offset(sink.cur_offset(), *target, LabelUse::PpcBranch14);
            sink.put4(enc_bc(bo, bi));
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
            for word in alu_rrr_words(*op, *size, true, *rd, *rn, *rm)? {
                sink.put4(word);
            }
            let bo = match cond {
                ZeroCond::Zero => 12,
                ZeroCond::NotZero => 4,
            };
            sink.use_label_at_offset(sink.cur_offset(), *target, LabelUse::PpcBranch14);
            sink.put4(enc_bc(bo, 2));
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
            let vd = machreg_to_vr(vd.to_reg())?;
            let vn = machreg_to_vr(*vn)?;
            let vm = machreg_to_vr(*vm)?;
            let word = match op {
                VecAluOp::And => enc_xx3(XX3_XXLAND, vd, vn, vm),
                VecAluOp::Or => enc_xx3(XX3_XXLOR, vd, vn, vm),
                VecAluOp::Xor => enc_xx3(XX3_XXLXOR, vd, vn, vm),
                VecAluOp::Add => {
                    let xo = match lane {
                        LaneSize::S8 => 0x000,
                        LaneSize::S16 => 0x040,
                        LaneSize::S32 => 0x080,
                        LaneSize::S64 => 0x0c0,
                    };
                    enc_vmx(xo, vd, vn, vm)
                }
                VecAluOp::Sub => {
                    let xo = match lane {
                        LaneSize::S8 => 0x400,
                        LaneSize::S16 => 0x440,
                        LaneSize::S32 => 0x480,
                        LaneSize::S64 => 0x4c0,
                    };
                    enc_vmx(xo, vd, vn, vm)
                }
            };
            sink.put4(word);
        }

        MInst::VecLoad { width, vd, mem } => {
            expect_v128(*width)?;
            let (staging, amode) = vec_mem_finalize(mem, rev, &scratch)?;
            for word in staging {
                sink.put4(word);
            }
            let t = machreg_to_vr(vd.to_reg())?;
            match amode {
                VecAMode::Dq(base, offset) => {
                    sink.put4(
                        DQ_LXV | (t << 21) | (machreg_to_gpr(base)? << 16) | offset.bits() | (1 << 3),
                    );
                }
                VecAMode::Indexed(base, index) => {
                    let ra = match base {
                        Some(r) => machreg_to_gpr(r)?,
                        None => 0,
                    };
                    sink.put4(X_LXVD2X | (t << 21) | (ra << 16) | (machreg_to_gpr(index)? << 11) | 1);
                }
            }
        }

        MInst::VecStore { width, vs, mem } => {
            expect_v128(*width)?;
            let (staging, amode) = vec_mem_finalize(mem, rev, &scratch)?;
            for word in staging {
                sink.put4(word);
            }
            let t = machreg_to_vr(*vs)?;
            match amode {
                VecAMode::Dq(base, offset) => {
                    sink.put4(
                        DQ_STXV | (t << 21) | (machreg_to_gpr(base)? << 16) | offset.bits() | (1 << 3),
                    );
                }
                VecAMode::Indexed(base, index) => {
                    let ra = match base {
                        Some(r) => machreg_to_gpr(r)?,
                        None => 0,
                    };
                    sink.put4(
                        X_STXVD2X | (t << 21) | (ra << 16) | (machreg_to_gpr(index)? << 11) | 1,
                    );
                }
            }
        }

        MInst::VecSplatImm {
            width,
            lane,
            vd,
            imm,
        } => {
            expect_v128(*width)?;
            let t = machreg_to_vr(vd.to_reg())?;
            let value = (*imm as u64) & lane_mask(*lane);
            if let Some(byte) = byte_splattable(value, *lane) {
                match rev {
                    Revision::Vsx3 => {
                        sink.put4(X_XXSPLTIB | (t << 21) | (u32::from(byte) << 11) | 1);
                        return Ok(());
                    }
                    Revision::Vsx2 => {
                        if byte == 0 {
                            sink.put4(enc_xx3(XX3_XXLXOR, t, t, t));
                            return Ok(());
                        }
                        if byte == 0xff {
                            sink.put4(enc_xx3(XX3_XXLEQV, t, t, t));
                            return Ok(());
                        }
                    }
                }
            }
            // Replicate at translation time and broadcast the doubleword.
            let tmp = machreg_to_gpr(scratch.imm_tmp)?;
            for word in load_constant(tmp, replicate_to_u64(value, *lane), OperandSize::Size64) {
                sink.put4(word);
            }
            emit_dup_doubleword(sink, t, tmp);
        }

        MInst::VecDup {
            width,
            lane,
            vd,
            rn,
        } => {
            expect_v128(*width)?;
            let t = machreg_to_vr(vd.to_reg())?;
            let r = machreg_to_gpr(*rn)?;
            match lane {
                LaneSize::S64 => emit_dup_doubleword(sink, t, r),
                LaneSize::S32 => match rev {
                    Revision::Vsx3 => sink.put4(X_MTVSRWS | (t << 21) | (r << 16) | 1),
                    Revision::Vsx2 => {
                        sink.put4(X_MTVSRD | (t << 21) | (r << 16) | 1);
                        // The word sits in the low half of doubleword 0:
                        // big-endian element 1.
                        sink.put4(XX2_XXSPLTW | (t << 21) | (1 << 16) | (t << 11) | 0b11);
                    }
                },
                LaneSize::S8 | LaneSize::S16 => {
                    return Err(CodegenError::Unsupported(format!(
                        "ppc64 has no register broadcast for {}-bit lanes",
                        lane.bytes() * 8
                    )));
                }
            }
        }

        MInst::SetFpRoundingMode { mode } => {
            let save = machreg_to_vr(scratch.fctrl_save)?;
            sink.put4(X_MFFS | (save << 21));
            sink.put4(X_MTFSFI | (7 << 23) | (fpscr_rn(*mode) << 12));
        }

        MInst::RestoreFpRoundingMode => {
            let save = machreg_to_vr(scratch.fctrl_save)?;
            sink.put4(X_MTFSF | (0xff << 17) | (save << 11));
        }
    }
    Ok(())
}
