use crate::condcodes::IntCC;
use crate::error::CodegenError;
use crate::isa::ppc64::regs::*;
use crate::isa::ppc64::{Ppc64Backend, Revision};
use crate::isa::{EmitState, TargetIsa};
use crate::machinst::{
    AccessWidth, AluOp, CodeBuffer, Endianness, LaneSize, MInst, MemArg, OperandSize,
    RoundingMode, TranslationSession, VecAluOp, VectorWidth, ZeroCond,
};

fn emit_words_rev(insn: &MInst, rev: Revision) -> Vec<u32> {
    let isa = Ppc64Backend::new(rev, Endianness::Little);
    let mut buf = CodeBuffer::new(isa.endianness());
    let mut state = EmitState::new(&isa);
    isa.emit(insn, &mut buf, &mut state).unwrap();
    (0..buf.cur_offset()).step_by(4).map(|o| buf.get4(o)).collect()
}

fn emit_words(insn: &MInst) -> Vec<u32> {
    emit_words_rev(insn, Revision::Vsx3)
}

fn emit_err(insn: &MInst) -> CodegenError {
    let isa = Ppc64Backend::new(Revision::Vsx3, Endianness::Little);
    let mut buf = CodeBuffer::new(isa.endianness());
    let mut state = EmitState::new(&isa);
    isa.emit(insn, &mut buf, &mut state).unwrap_err()
}

#[test]
fn test_ppc64_binemit() {
    let mut insns: Vec<(MInst, Vec<u32>)> = Vec::new();

    insns.push((MInst::Nop, vec![0x60000000]));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Add,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: false,
        },
        vec![0x7c642a14], // add r3, r4, r5
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Add,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: true,
        },
        vec![0x7c642a15], // add. r3, r4, r5
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Add,
            size: OperandSize::Size32,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: true,
        },
        // 32-bit record form: plain add, then extsw. so cr0 reflects the
        // truncated result.
        vec![0x7c642a14, 0x7c6307b5],
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Sub,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: false,
        },
        vec![0x7c652050], // subf r3, r5, r4
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Mul,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: false,
        },
        vec![0x7c6429d2], // mulld
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Mul,
            size: OperandSize::Size32,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: false,
        },
        vec![0x7c6429d6], // mullw
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::And,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: false,
        },
        vec![0x7c832838], // and r3, r4, r5
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Or,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: false,
        },
        vec![0x7c832b78], // or
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Xor,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: false,
        },
        vec![0x7c832a78], // xor
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Lsl,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: false,
        },
        vec![0x7c832836], // sld
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Lsr,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: false,
        },
        vec![0x7c832c36], // srd
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Asr,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: false,
        },
        vec![0x7c832e34], // srad
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Lsl,
            size: OperandSize::Size32,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: false,
        },
        vec![0x7c832830], // slw
    ));

    insns.push((
        MInst::AluRRImm {
            op: AluOp::Add,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 42,
            set_flags: false,
        },
        vec![0x3864002a], // addi r3, r4, 42
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Sub,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 42,
            set_flags: false,
        },
        vec![0x3864ffd6], // addi r3, r4, -42
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Or,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 255,
            set_flags: false,
        },
        vec![0x608300ff], // ori r3, r4, 255
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Xor,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 255,
            set_flags: false,
        },
        vec![0x688300ff], // xori
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::And,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 255,
            set_flags: false,
        },
        vec![0x708300ff], // andi.
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::And,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 255,
            set_flags: true,
        },
        vec![0x708300ff], // andi. already records
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::And,
            size: OperandSize::Size32,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 255,
            set_flags: true,
        },
        vec![0x708300ff], // high bits cleared, no extsw. needed
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Lsl,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 3,
            set_flags: false,
        },
        vec![0x78831f24], // rldicr r3, r4, 3, 60 (sldi)
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Lsr,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 3,
            set_flags: false,
        },
        vec![0x7883e8c2], // rldicl r3, r4, 61, 3 (srdi)
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Asr,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 3,
            set_flags: false,
        },
        vec![0x7c831e74], // sradi r3, r4, 3
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Lsl,
            size: OperandSize::Size32,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 3,
            set_flags: false,
        },
        vec![0x54831838], // rlwinm r3, r4, 3, 0, 28 (slwi)
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Lsr,
            size: OperandSize::Size32,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 3,
            set_flags: false,
        },
        vec![0x5483e8fe], // rlwinm r3, r4, 29, 3, 31 (srwi)
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Asr,
            size: OperandSize::Size32,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 3,
            set_flags: false,
        },
        vec![0x7c831e70], // srawi r3, r4, 3
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Xor,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 0x12345,
            set_flags: false,
        },
        // lis r31, 1; ori r31, r31, 0x2345; xor r3, r4, r31
        vec![0x3fe00001, 0x63ff2345, 0x7c83fa78],
    ));

    insns.push((
        MInst::MovImm {
            size: OperandSize::Size64,
            rd: writable_gpr(5),
            imm: (-7i64) as u64,
        },
        vec![0x38a0fff9], // li r5, -7
    ));
    insns.push((
        MInst::MovImm {
            size: OperandSize::Size64,
            rd: writable_gpr(5),
            imm: 0x12345678,
        },
        vec![0x3ca01234, 0x60a55678], // lis; ori
    ));
    insns.push((
        MInst::MovImm {
            size: OperandSize::Size64,
            rd: writable_gpr(5),
            imm: 0x1234_5678_9abc_def0,
        },
        // lis; ori; sldi 32; oris; ori
        vec![0x3ca01234, 0x60a55678, 0x78a507c6, 0x64a59abc, 0x60a5def0],
    ));
    insns.push((
        MInst::MovImm {
            size: OperandSize::Size32,
            rd: writable_gpr(5),
            imm: 0xffff_ffff,
        },
        vec![0x38a0ffff], // li r5, -1
    ));

    insns.push((
        MInst::Load {
            ty: AccessWidth::W,
            sign_extend: false,
            rd: writable_gpr(3),
            mem: MemArg::reg_offset(gpr(4), 8),
        },
        vec![0x80640008], // lwz r3, 8(r4)
    ));
    insns.push((
        MInst::Load {
            ty: AccessWidth::W,
            sign_extend: true,
            rd: writable_gpr(3),
            mem: MemArg::reg_offset(gpr(4), 8),
        },
        vec![0xe864000a], // lwa r3, 8(r4)
    ));
    insns.push((
        MInst::Load {
            ty: AccessWidth::D,
            sign_extend: false,
            rd: writable_gpr(3),
            mem: MemArg::reg_offset(gpr(4), 8),
        },
        vec![0xe8640008], // ld r3, 8(r4)
    ));
    insns.push((
        MInst::Load {
            ty: AccessWidth::B,
            sign_extend: true,
            rd: writable_gpr(3),
            mem: MemArg::reg_offset(gpr(4), 0),
        },
        vec![0x88640000, 0x7c630774], // lbz; extsb
    ));
    insns.push((
        MInst::Load {
            ty: AccessWidth::H,
            sign_extend: true,
            rd: writable_gpr(3),
            mem: MemArg::reg_offset(gpr(4), 2),
        },
        vec![0xa8640002], // lha r3, 2(r4)
    ));
    insns.push((
        MInst::Load {
            ty: AccessWidth::D,
            sign_extend: false,
            rd: writable_gpr(3),
            mem: MemArg::reg_reg(gpr(4), gpr(5)),
        },
        vec![0x7c64282a], // ldx r3, r4, r5
    ));
    insns.push((
        MInst::Load {
            ty: AccessWidth::D,
            sign_extend: false,
            rd: writable_gpr(3),
            mem: MemArg::reg_reg_offset(gpr(4), gpr(5), 8),
        },
        vec![0x7d642a14, 0xe86b0008], // add r11, r4, r5; ld r3, 8(r11)
    ));
    insns.push((
        MInst::Load {
            ty: AccessWidth::D,
            sign_extend: false,
            rd: writable_gpr(3),
            mem: MemArg::reg_offset(gpr(4), 6),
        },
        // The DS form needs a 4-aligned offset: stage the address.
        vec![0x39600006, 0x7d645a14, 0xe86b0000],
    ));

    insns.push((
        MInst::Store {
            ty: AccessWidth::D,
            rs: gpr(3),
            mem: MemArg::reg_offset(gpr(4), -16),
        },
        vec![0xf864fff0], // std r3, -16(r4)
    ));
    insns.push((
        MInst::Store {
            ty: AccessWidth::W,
            rs: gpr(3),
            mem: MemArg::reg_offset(gpr(4), 4),
        },
        vec![0x90640004], // stw r3, 4(r4)
    ));
    insns.push((
        MInst::Store {
            ty: AccessWidth::H,
            rs: gpr(3),
            mem: MemArg::reg_reg(gpr(4), gpr(5)),
        },
        vec![0x7c642b2e], // sthx r3, r4, r5
    ));
    insns.push((
        MInst::Store {
            ty: AccessWidth::D,
            rs: gpr(3),
            mem: MemArg::reg_offset(gpr(4), 0x10000),
        },
        // lis r11, 1; add r11, r4, r11; std r3, 0(r11)
        vec![0x3d600001, 0x7d645a14, 0xf86b0000],
    ));

    insns.push((
        MInst::LoadAddr {
            rd: writable_gpr(3),
            mem: MemArg::reg_offset(gpr(4), 64),
        },
        vec![0x38640040], // addi r3, r4, 64
    ));
    insns.push((
        MInst::LoadAddr {
            rd: writable_gpr(3),
            mem: MemArg::reg_reg(gpr(4), gpr(5)),
        },
        vec![0x7c642a14], // add r3, r4, r5
    ));
    insns.push((
        MInst::LoadAddr {
            rd: writable_gpr(3),
            mem: MemArg::reg_offset(gpr(4), 0x12345),
        },
        // lis r11, 1; ori r11, r11, 0x2345; add r11, r4, r11; addi r3, r11, 0
        vec![0x3d600001, 0x616b2345, 0x7d645a14, 0x386b0000],
    ));

    insns.push((
        MInst::VecAluRRR {
            op: VecAluOp::And,
            width: VectorWidth::V128,
            lane: LaneSize::S8,
            vd: writable_vreg(1),
            vn: vreg(2),
            vm: vreg(3),
        },
        vec![0xf0221c17], // xxland vs33, vs34, vs35
    ));
    insns.push((
        MInst::VecAluRRR {
            op: VecAluOp::Or,
            width: VectorWidth::V128,
            lane: LaneSize::S8,
            vd: writable_vreg(1),
            vn: vreg(2),
            vm: vreg(3),
        },
        vec![0xf0221c97], // xxlor
    ));
    insns.push((
        MInst::VecAluRRR {
            op: VecAluOp::Xor,
            width: VectorWidth::V128,
            lane: LaneSize::S8,
            vd: writable_vreg(1),
            vn: vreg(2),
            vm: vreg(3),
        },
        vec![0xf0221cd7], // xxlxor
    ));
    insns.push((
        MInst::VecAluRRR {
            op: VecAluOp::Add,
            width: VectorWidth::V128,
            lane: LaneSize::S8,
            vd: writable_vreg(1),
            vn: vreg(2),
            vm: vreg(3),
        },
        vec![0x10221800], // vaddubm v1, v2, v3
    ));
    insns.push((
        MInst::VecAluRRR {
            op: VecAluOp::Add,
            width: VectorWidth::V128,
            lane: LaneSize::S32,
            vd: writable_vreg(1),
            vn: vreg(2),
            vm: vreg(3),
        },
        vec![0x10221880], // vadduwm
    ));
    insns.push((
        MInst::VecAluRRR {
            op: VecAluOp::Sub,
            width: VectorWidth::V128,
            lane: LaneSize::S64,
            vd: writable_vreg(1),
            vn: vreg(2),
            vm: vreg(3),
        },
        vec![0x10221cc0], // vsubudm
    ));

    insns.push((
        MInst::VecLoad {
            width: VectorWidth::V128,
            vd: writable_vreg(1),
            mem: MemArg::reg_offset(gpr(4), 32),
        },
        vec![0xf4240029], // lxv vs33, 32(r4)
    ));
    insns.push((
        MInst::VecLoad {
            width: VectorWidth::V128,
            vd: writable_vreg(1),
            mem: MemArg::reg_offset(gpr(4), 0),
        },
        vec![0xf4240009], // lxv vs33, 0(r4)
    ));
    insns.push((
        MInst::VecStore {
            width: VectorWidth::V128,
            vs: vreg(1),
            mem: MemArg::reg_offset(gpr(4), 16),
        },
        vec![0xf424001d], // stxv vs33, 16(r4)
    ));

    insns.push((
        MInst::VecSplatImm {
            width: VectorWidth::V128,
            lane: LaneSize::S8,
            vd: writable_vreg(1),
            imm: 0x55,
        },
        vec![0xf022aad1], // xxspltib vs33, 0x55
    ));
    insns.push((
        MInst::VecSplatImm {
            width: VectorWidth::V128,
            lane: LaneSize::S64,
            vd: writable_vreg(1),
            imm: -2,
        },
        // li r31, -2; mtvsrd vs33, r31; xxpermdi vs33, vs33, vs33, 0
        vec![0x3be0fffe, 0x7c3f0167, 0xf0210857],
    ));

    insns.push((
        MInst::VecDup {
            width: VectorWidth::V128,
            lane: LaneSize::S64,
            vd: writable_vreg(1),
            rn: gpr(3),
        },
        vec![0x7c230167, 0xf0210857], // mtvsrd; xxpermdi
    ));
    insns.push((
        MInst::VecDup {
            width: VectorWidth::V128,
            lane: LaneSize::S32,
            vd: writable_vreg(1),
            rn: gpr(3),
        },
        vec![0x7c230327], // mtvsrws vs33, r3
    ));

    insns.push((
        MInst::SetFpRoundingMode {
            mode: RoundingMode::TowardZero,
        },
        vec![0xffe0048e, 0xff80110c], // mffs f31; mtfsfi 7, 1
    ));
    insns.push((
        MInst::SetFpRoundingMode {
            mode: RoundingMode::Nearest,
        },
        vec![0xffe0048e, 0xff80010c],
    ));
    insns.push((
        MInst::RestoreFpRoundingMode,
        vec![0xfdfefd8e], // mtfsf 0xff, f31
    ));

    for (insn, expected) in insns {
        let words = emit_words(&insn);
        assert_eq!(words, expected, "encoding mismatch for {}", insn);
    }
}

#[test]
fn test_ppc64_vsx2_fallbacks() {
    // Pre-3.0 VSX: no DQ-form accesses, no xxspltib, no mtvsrws.
    let mut insns: Vec<(MInst, Vec<u32>)> = Vec::new();

    insns.push((
        MInst::VecLoad {
            width: VectorWidth::V128,
            vd: writable_vreg(1),
            mem: MemArg::reg_offset(gpr(4), 0),
        },
        vec![0x7c202699], // lxvd2x vs33, 0, r4
    ));
    insns.push((
        MInst::VecLoad {
            width: VectorWidth::V128,
            vd: writable_vreg(1),
            mem: MemArg::reg_offset(gpr(4), 32),
        },
        // li r11, 32; add r11, r4, r11; lxvd2x vs33, 0, r11
        vec![0x39600020, 0x7d645a14, 0x7c205e99],
    ));
    insns.push((
        MInst::VecStore {
            width: VectorWidth::V128,
            vs: vreg(1),
            mem: MemArg::reg_reg(gpr(4), gpr(5)),
        },
        vec![0x7c242f99], // stxvd2x vs33, r4, r5
    ));
    insns.push((
        MInst::VecSplatImm {
            width: VectorWidth::V128,
            lane: LaneSize::S32,
            vd: writable_vreg(1),
            imm: 0,
        },
        vec![0xf0210cd7], // xxlxor vs33, vs33, vs33
    ));
    insns.push((
        MInst::VecSplatImm {
            width: VectorWidth::V128,
            lane: LaneSize::S16,
            vd: writable_vreg(1),
            imm: -1,
        },
        vec![0xf0210dd7], // xxleqv vs33, vs33, vs33
    ));
    insns.push((
        MInst::VecDup {
            width: VectorWidth::V128,
            lane: LaneSize::S32,
            vd: writable_vreg(1),
            rn: gpr(3),
        },
        vec![0x7c230167, 0xf0210a93], // mtvsrd; xxspltw vs33, vs33, 1
    ));

    for (insn, expected) in insns {
        let words = emit_words_rev(&insn, Revision::Vsx2);
        assert_eq!(words, expected, "encoding mismatch for {}", insn);
    }
}

#[test]
fn test_ppc64_branches() {
    let isa = Ppc64Backend::new(Revision::Vsx3, Endianness::Little);
    let mut sess = TranslationSession::new(&isa);

    let back = sess.create_label();
    sess.bind_label(back);
    sess.emit(&MInst::Nop).unwrap();
    sess.emit(&MInst::CmpBr {
        cc: IntCC::SignedLessThan,
        size: OperandSize::Size64,
        rn: gpr(3),
        rm: gpr(4),
        target: back,
    })
    .unwrap();
    let code = sess.finalize().unwrap();
    let words: Vec<u32> = code
        .chunks(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    // cmpd r3, r4; blt back
    assert_eq!(words, vec![0x60000000, 0x7c232000, 0x4180fff8]);
}

#[test]
fn test_ppc64_unsigned_compare_and_jump() {
    let isa = Ppc64Backend::new(Revision::Vsx3, Endianness::Little);
    let mut sess = TranslationSession::new(&isa);

    let out = sess.create_label();
    sess.emit(&MInst::CmpBr {
        cc: IntCC::UnsignedGreaterThan,
        size: OperandSize::Size32,
        rn: gpr(3),
        rm: gpr(4),
        target: out,
    })
    .unwrap();
    let back = sess.create_label();
    sess.bind_label(back);
    sess.emit(&MInst::Jump { target: back }).unwrap();
    sess.bind_label(out);
    let code = sess.finalize().unwrap();
    let words: Vec<u32> = code
        .chunks(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    // cmplw r3, r4; bgt out; b back (a self-branch: the label binds at the
    // branch word)
    assert_eq!(words, vec![0x7c032040, 0x41810008, 0x48000000]);
}

#[test]
fn test_ppc64_op_br() {
    let isa = Ppc64Backend::new(Revision::Vsx3, Endianness::Little);
    let mut sess = TranslationSession::new(&isa);
    let out = sess.create_label();
    sess.emit(&MInst::OpBr {
        op: AluOp::And,
        size: OperandSize::Size64,
        rd: writable_gpr(5),
        rn: gpr(3),
        rm: gpr(4),
        cond: ZeroCond::NotZero,
        target: out,
    })
    .unwrap();
    sess.bind_label(out);
    let code = sess.finalize().unwrap();
    let words: Vec<u32> = code
        .chunks(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    // and. r5, r3, r4; bne out
    assert_eq!(words, vec![0x7c652039, 0x40820004]);
}

#[test]
fn test_ppc64_op_br_32_bit_records_truncated_result() {
    let isa = Ppc64Backend::new(Revision::Vsx3, Endianness::Little);
    let mut sess = TranslationSession::new(&isa);
    let out = sess.create_label();
    sess.emit(&MInst::OpBr {
        op: AluOp::Add,
        size: OperandSize::Size32,
        rd: writable_gpr(5),
        rn: gpr(3),
        rm: gpr(4),
        cond: ZeroCond::Zero,
        target: out,
    })
    .unwrap();
    sess.bind_label(out);
    let code = sess.finalize().unwrap();
    let words: Vec<u32> = code
        .chunks(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    // add r5, r3, r4; extsw. r5, r5; beq out
    assert_eq!(words, vec![0x7ca32214, 0x7ca507b5, 0x41820004]);
}

#[test]
fn test_ppc64_big_endian_words() {
    let isa = Ppc64Backend::new(Revision::Vsx3, Endianness::Big);
    let mut buf = CodeBuffer::new(isa.endianness());
    let mut state = EmitState::new(&isa);
    isa.emit(
        &MInst::AluRRR {
            op: AluOp::Add,
            size: OperandSize::Size64,
            rd: writable_gpr(3),
            rn: gpr(4),
            rm: gpr(5),
            set_flags: false,
        },
        &mut buf,
        &mut state,
    )
    .unwrap();
    assert_eq!(buf.data(), &[0x7c, 0x64, 0x2a, 0x14]);
}

#[test]
fn test_ppc64_emit_errors() {
    assert!(matches!(
        emit_err(&MInst::AluRRR {
            op: AluOp::Add,
            size: OperandSize::Size64,
            rd: crate::machinst::Writable::from_reg(vreg(1)),
            rn: gpr(3),
            rm: gpr(4),
            set_flags: false,
        }),
        CodegenError::OperandClass(_)
    ));

    assert!(matches!(
        emit_err(&MInst::AluRRImm {
            op: AluOp::Lsl,
            size: OperandSize::Size32,
            rd: writable_gpr(3),
            rn: gpr(4),
            imm: 32,
            set_flags: false,
        }),
        CodegenError::OutOfRange(_)
    ));

    // A staged displacement may not use the address scratch as its base.
    assert!(matches!(
        emit_err(&MInst::Load {
            ty: AccessWidth::D,
            sign_extend: false,
            rd: writable_gpr(3),
            mem: MemArg::reg_offset(gpr(11), 0x12345),
        }),
        CodegenError::ScratchConflict(_)
    ));

    assert!(matches!(
        emit_err(&MInst::VecDup {
            width: VectorWidth::V128,
            lane: LaneSize::S8,
            vd: writable_vreg(1),
            rn: gpr(3),
        }),
        CodegenError::Unsupported(_)
    ));

    assert!(matches!(
        emit_err(&MInst::VecAluRRR {
            op: VecAluOp::And,
            width: VectorWidth::V256,
            lane: LaneSize::S8,
            vd: writable_vreg(0),
            vn: vreg(2),
            vm: vreg(4),
        }),
        CodegenError::OperandClass(_)
    ));
}
