use crate::condcodes::IntCC;
use crate::error::CodegenError;
use crate::isa::aarch64::regs::*;
use crate::isa::aarch64::Aarch64Backend;
use crate::isa::{EmitState, TargetIsa};
use crate::machinst::{
    AccessWidth, AluOp, CodeBuffer, LaneSize, MInst, MemArg, OperandSize, TranslationSession,
    VecAluOp, VectorWidth, ZeroCond,
};

fn emit_words(insn: &MInst) -> Vec<u32> {
    let isa = Aarch64Backend::new();
    let mut buf = CodeBuffer::new(isa.endianness());
    let mut state = EmitState::new(&isa);
    isa.emit(insn, &mut buf, &mut state).unwrap();
    (0..buf.cur_offset()).step_by(4).map(|o| buf.get4(o)).collect()
}

fn emit_err(insn: &MInst) -> CodegenError {
    let isa = Aarch64Backend::new();
    let mut buf = CodeBuffer::new(isa.endianness());
    let mut state = EmitState::new(&isa);
    isa.emit(insn, &mut buf, &mut state).unwrap_err()
}

#[test]
fn test_aarch64_binemit() {
    let mut insns: Vec<(MInst, Vec<u32>, &str)> = Vec::new();

    insns.push((MInst::Nop, vec![0xd503201f], "nop"));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Add,
            size: OperandSize::Size64,
            rd: writable_xreg(0),
            rn: xreg(1),
            rm: xreg(2),
            set_flags: false,
        },
        vec![0x8b020020],
        "add.64 x0, x1, x2",
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Add,
            size: OperandSize::Size32,
            rd: writable_xreg(3),
            rn: xreg(4),
            rm: xreg(5),
            set_flags: true,
        },
        vec![0x2b050083],
        "adds.32 x3, x4, x5",
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Sub,
            size: OperandSize::Size64,
            rd: writable_xreg(0),
            rn: xreg(1),
            rm: xreg(2),
            set_flags: false,
        },
        vec![0xcb020020],
        "sub.64 x0, x1, x2",
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::And,
            size: OperandSize::Size64,
            rd: writable_xreg(1),
            rn: xreg(2),
            rm: xreg(3),
            set_flags: false,
        },
        vec![0x8a030041],
        "and.64 x1, x2, x3",
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Or,
            size: OperandSize::Size64,
            rd: writable_xreg(1),
            rn: xreg(2),
            rm: xreg(3),
            set_flags: false,
        },
        vec![0xaa030041],
        "or.64 x1, x2, x3",
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Xor,
            size: OperandSize::Size64,
            rd: writable_xreg(1),
            rn: xreg(2),
            rm: xreg(3),
            set_flags: false,
        },
        vec![0xca030041],
        "xor.64 x1, x2, x3",
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Mul,
            size: OperandSize::Size64,
            rd: writable_xreg(5),
            rn: xreg(6),
            rm: xreg(7),
            set_flags: false,
        },
        vec![0x9b077cc5],
        "mul.64 x5, x6, x7",
    ));
    insns.push((
        MInst::AluRRR {
            op: AluOp::Lsl,
            size: OperandSize::Size64,
            rd: writable_xreg(1),
            rn: xreg(2),
            rm: xreg(3),
            set_flags: false,
        },
        vec![0x9ac32041],
        "lsl.64 x1, x2, x3",
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Add,
            size: OperandSize::Size64,
            rd: writable_xreg(0),
            rn: xreg(1),
            imm: 42,
            set_flags: false,
        },
        vec![0x9100a820],
        "add.64 x0, x1, #42",
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Add,
            size: OperandSize::Size64,
            rd: writable_xreg(0),
            rn: xreg(1),
            imm: 4096,
            set_flags: false,
        },
        vec![0x91400420],
        "add.64 x0, x1, #4096",
    ));
    // Negative addend flips to the sub form.
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Add,
            size: OperandSize::Size64,
            rd: writable_xreg(0),
            rn: xreg(1),
            imm: -42,
            set_flags: false,
        },
        vec![0xd100a820],
        "add.64 x0, x1, #-42",
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::And,
            size: OperandSize::Size64,
            rd: writable_xreg(0),
            rn: xreg(1),
            imm: 0xff,
            set_flags: false,
        },
        vec![0x92401c20],
        "and.64 x0, x1, #255",
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::And,
            size: OperandSize::Size64,
            rd: writable_xreg(0),
            rn: xreg(1),
            imm: 0xff,
            set_flags: true,
        },
        vec![0xf2401c20],
        "ands.64 x0, x1, #255",
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Lsl,
            size: OperandSize::Size64,
            rd: writable_xreg(4),
            rn: xreg(5),
            imm: 3,
            set_flags: false,
        },
        vec![0xd37df0a4],
        "lsl.64 x4, x5, #3",
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Lsr,
            size: OperandSize::Size64,
            rd: writable_xreg(4),
            rn: xreg(5),
            imm: 3,
            set_flags: false,
        },
        vec![0xd343fca4],
        "lsr.64 x4, x5, #3",
    ));
    insns.push((
        MInst::AluRRImm {
            op: AluOp::Asr,
            size: OperandSize::Size64,
            rd: writable_xreg(4),
            rn: xreg(5),
            imm: 3,
            set_flags: false,
        },
        vec![0x9343fca4],
        "asr.64 x4, x5, #3",
    ));
    insns.push((
        MInst::MovImm {
            size: OperandSize::Size64,
            rd: writable_xreg(0),
            imm: 17,
        },
        vec![0xd2800220],
        "mov.64 x0, #0x11",
    ));
    // movn shape: bitwise-inverse is one half-word.
    insns.push((
        MInst::MovImm {
            size: OperandSize::Size64,
            rd: writable_xreg(0),
            imm: 17u64.wrapping_neg(),
        },
        vec![0x92800200],
        "mov.64 x0, #0xffffffffffffffef",
    ));
    // Logical-immediate shape.
    insns.push((
        MInst::MovImm {
            size: OperandSize::Size64,
            rd: writable_xreg(0),
            imm: 0x5555_5555_5555_5555,
        },
        vec![0xb200f3e0],
        "mov.64 x0, #0x5555555555555555",
    ));
    // General shape: movz plus movk per half-word.
    insns.push((
        MInst::MovImm {
            size: OperandSize::Size64,
            rd: writable_xreg(0),
            imm: 0x1234_5678,
        },
        vec![0xd28acf00, 0xf2a24680],
        "mov.64 x0, #0x12345678",
    ));
    insns.push((
        MInst::MovImm {
            size: OperandSize::Size32,
            rd: writable_xreg(0),
            imm: 0xffff_fffe,
        },
        vec![0x12800020],
        "mov.32 x0, #0xfffffffe",
    ));
    insns.push((
        MInst::Load {
            ty: AccessWidth::D,
            sign_extend: false,
            rd: writable_xreg(1),
            mem: MemArg::reg_offset(xreg(2), 8),
        },
        vec![0xf9400441],
        "loadu.64 x1, [x2, #8]",
    ));
    insns.push((
        MInst::Load {
            ty: AccessWidth::B,
            sign_extend: false,
            rd: writable_xreg(0),
            mem: MemArg::reg_offset(xreg(1), 0),
        },
        vec![0x39400020],
        "loadu.8 x0, [x1, #0]",
    ));
    insns.push((
        MInst::Load {
            ty: AccessWidth::B,
            sign_extend: true,
            rd: writable_xreg(0),
            mem: MemArg::reg_offset(xreg(1), 0),
        },
        vec![0x39800020],
        "loads.8 x0, [x1, #0]",
    ));
    insns.push((
        MInst::Load {
            ty: AccessWidth::H,
            sign_extend: true,
            rd: writable_xreg(9),
            mem: MemArg::reg_offset(xreg(10), 4),
        },
        vec![0x79800949],
        "loads.16 x9, [x10, #4]",
    ));
    insns.push((
        MInst::Load {
            ty: AccessWidth::W,
            sign_extend: false,
            rd: writable_xreg(1),
            mem: MemArg::reg_reg(xreg(2), xreg(3)),
        },
        vec![0xb8636841],
        "loadu.32 x1, [x2, x3, #0]",
    ));
    // Unscaled (ldur/stur) form for small negative displacements.
    insns.push((
        MInst::Store {
            ty: AccessWidth::D,
            rs: xreg(3),
            mem: MemArg::reg_offset(xreg(4), -8),
        },
        vec![0xf81f8083],
        "store.64 x3, [x4, #-8]",
    ));
    insns.push((
        MInst::Store {
            ty: AccessWidth::B,
            rs: xreg(0),
            mem: MemArg::reg_offset(xreg(1), 1),
        },
        vec![0x39000420],
        "store.8 x0, [x1, #1]",
    ));
    // Out-of-class displacement: staged through x16.
    insns.push((
        MInst::Store {
            ty: AccessWidth::D,
            rs: xreg(1),
            mem: MemArg::reg_offset(xreg(2), 1 << 20),
        },
        vec![0xd2a00210, 0x8b100050, 0xf9000201],
        "store.64 x1, [x2, #1048576]",
    ));
    insns.push((
        MInst::LoadAddr {
            rd: writable_xreg(0),
            mem: MemArg::reg_offset(xreg(1), 42),
        },
        vec![0x9100a820],
        "lea x0, [x1, #42]",
    ));
    insns.push((
        MInst::LoadAddr {
            rd: writable_xreg(0),
            mem: MemArg::reg_reg(xreg(1), xreg(2)),
        },
        vec![0x8b020020],
        "lea x0, [x1, x2, #0]",
    ));
    insns.push((
        MInst::VecAluRRR {
            op: VecAluOp::And,
            width: VectorWidth::V128,
            lane: LaneSize::S8,
            vd: writable_vreg(0),
            vn: vreg(1),
            vm: vreg(2),
        },
        vec![0x4e221c20],
        "vand.128x8 v0, v1, v2",
    ));
    insns.push((
        MInst::VecAluRRR {
            op: VecAluOp::Add,
            width: VectorWidth::V128,
            lane: LaneSize::S32,
            vd: writable_vreg(3),
            vn: vreg(4),
            vm: vreg(5),
        },
        vec![0x4ea58483],
        "vadd.128x32 v3, v4, v5",
    ));
    insns.push((
        MInst::VecAluRRR {
            op: VecAluOp::Sub,
            width: VectorWidth::V128,
            lane: LaneSize::S64,
            vd: writable_vreg(3),
            vn: vreg(4),
            vm: vreg(5),
        },
        vec![0x6ee58483],
        "vsub.128x64 v3, v4, v5",
    ));
    insns.push((
        MInst::VecLoad {
            width: VectorWidth::V128,
            vd: writable_vreg(0),
            mem: MemArg::reg_offset(xreg(1), 0),
        },
        vec![0x3dc00020],
        "vload.128 v0, [x1, #0]",
    ));
    insns.push((
        MInst::VecStore {
            width: VectorWidth::V128,
            vs: vreg(7),
            mem: MemArg::reg_reg(xreg(2), xreg(3)),
        },
        vec![0x3ca36847],
        "vstore.128 v7, [x2, x3, #0]",
    ));
    insns.push((
        MInst::VecSplatImm {
            width: VectorWidth::V128,
            lane: LaneSize::S32,
            vd: writable_vreg(2),
            imm: 0,
        },
        vec![0x4f00e402],
        "vsplat.128x32 v2, #0",
    ));
    insns.push((
        MInst::VecSplatImm {
            width: VectorWidth::V128,
            lane: LaneSize::S16,
            vd: writable_vreg(0),
            imm: -1,
        },
        vec![0x4f07e7e0],
        "vsplat.128x16 v0, #-1",
    ));
    // Non-replicating splat value: staged through x18 and broadcast.
    insns.push((
        MInst::VecSplatImm {
            width: VectorWidth::V128,
            lane: LaneSize::S32,
            vd: writable_vreg(1),
            imm: 0x1234_5678,
        },
        vec![0x528acf12, 0x72a24692, 0x4e040e41],
        "vsplat.128x32 v1, #305419896",
    ));
    insns.push((
        MInst::VecDup {
            width: VectorWidth::V128,
            lane: LaneSize::S64,
            vd: writable_vreg(0),
            rn: xreg(3),
        },
        vec![0x4e080c60],
        "vdup.128x64 v0, x3",
    ));

    for (insn, expected, asm) in insns {
        assert_eq!(format!("{}", insn), asm);
        assert_eq!(emit_words(&insn), expected, "encoding of {}", insn);
    }
}

#[test]
fn test_aarch64_branches() {
    let isa = Aarch64Backend::new();
    let mut sess = TranslationSession::new(&isa);

    // Backward cbz to offset 0.
    let back = sess.create_label();
    sess.bind_label(back);
    sess.emit(&MInst::Nop).unwrap();
    sess.emit(&MInst::CmpBr {
        cc: IntCC::Equal,
        size: OperandSize::Size64,
        rn: xreg(5),
        rm: zero_reg(),
        target: back,
    })
    .unwrap();

    // Forward signed compare: subs then b.lt over one word.
    let fwd = sess.create_label();
    sess.emit(&MInst::CmpBr {
        cc: IntCC::SignedLessThan,
        size: OperandSize::Size64,
        rn: xreg(1),
        rm: xreg(2),
        target: fwd,
    })
    .unwrap();
    sess.emit(&MInst::Nop).unwrap();
    sess.bind_label(fwd);

    let end = sess.create_label();
    sess.emit(&MInst::Jump { target: end }).unwrap();
    sess.emit(&MInst::Nop).unwrap();
    sess.bind_label(end);

    let code = sess.finalize().unwrap();
    let words: Vec<u32> = code
        .chunks(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(
        words,
        vec![
            0xd503201f, // nop
            0xb4ffffe5, // cbz x5, #-4
            0xeb02003f, // subs xzr, x1, x2
            0x5400004b, // b.lt #+8
            0xd503201f, // nop
            0x14000002, // b #+8
            0xd503201f, // nop
        ]
    );
}

#[test]
fn test_aarch64_op_br() {
    let isa = Aarch64Backend::new();

    // and has a flag-setting form: ands + b.ne.
    let mut sess = TranslationSession::new(&isa);
    let l = sess.create_label();
    sess.emit(&MInst::OpBr {
        op: AluOp::And,
        size: OperandSize::Size64,
        rd: writable_xreg(1),
        rn: xreg(2),
        rm: xreg(3),
        cond: ZeroCond::NotZero,
        target: l,
    })
    .unwrap();
    sess.bind_label(l);
    let code = sess.finalize().unwrap();
    let words: Vec<u32> = code
        .chunks(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(words, vec![0xea030041, 0x54000021]);

    // xor has none: plain eor then cbz on the result.
    let mut sess = TranslationSession::new(&isa);
    let l = sess.create_label();
    sess.emit(&MInst::OpBr {
        op: AluOp::Xor,
        size: OperandSize::Size64,
        rd: writable_xreg(1),
        rn: xreg(2),
        rm: xreg(3),
        cond: ZeroCond::Zero,
        target: l,
    })
    .unwrap();
    sess.bind_label(l);
    let code = sess.finalize().unwrap();
    let words: Vec<u32> = code
        .chunks(4)
        .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(words, vec![0xca030041, 0xb4000021]);
}

#[test]
fn test_aarch64_rounding_scope() {
    // TowardZero: mrs, clear RMode, set 0b11, msr.
    let insn = MInst::SetFpRoundingMode {
        mode: crate::machinst::RoundingMode::TowardZero,
    };
    assert_eq!(
        emit_words(&insn),
        vec![0xd53b4413, 0x9268f672, 0xb26a0652, 0xd51b4412]
    );

    // Nearest is RMode 0b00: no set step.
    let insn = MInst::SetFpRoundingMode {
        mode: crate::machinst::RoundingMode::Nearest,
    };
    assert_eq!(emit_words(&insn), vec![0xd53b4413, 0x9268f672, 0xd51b4412]);

    assert_eq!(emit_words(&MInst::RestoreFpRoundingMode), vec![0xd51b4413]);
}

#[test]
fn test_aarch64_emit_errors() {
    // Vector register in a scalar position.
    let err = emit_err(&MInst::AluRRR {
        op: AluOp::Add,
        size: OperandSize::Size64,
        rd: writable_xreg(0),
        rn: vreg(1),
        rm: xreg(2),
        set_flags: false,
    });
    assert!(matches!(err, CodegenError::OperandClass(_)));

    // No flag-setting multiply.
    let err = emit_err(&MInst::AluRRR {
        op: AluOp::Mul,
        size: OperandSize::Size64,
        rd: writable_xreg(0),
        rn: xreg(1),
        rm: xreg(2),
        set_flags: true,
    });
    assert!(matches!(err, CodegenError::Unsupported(_)));

    // Shift amount beyond the operand size.
    let err = emit_err(&MInst::AluRRImm {
        op: AluOp::Lsl,
        size: OperandSize::Size32,
        rd: writable_xreg(0),
        rn: xreg(1),
        imm: 32,
        set_flags: false,
    });
    assert!(matches!(err, CodegenError::OutOfRange(_)));

    // The source aliases the immediate scratch register while the immediate
    // needs staging.
    let err = emit_err(&MInst::AluRRImm {
        op: AluOp::Add,
        size: OperandSize::Size64,
        rd: writable_xreg(0),
        rn: imm_tmp_reg(),
        imm: 0x1234_5678,
        set_flags: false,
    });
    assert!(matches!(err, CodegenError::ScratchConflict(_)));

    // The base aliases the address scratch register while the displacement
    // needs staging.
    let err = emit_err(&MInst::Store {
        ty: AccessWidth::D,
        rs: xreg(1),
        mem: MemArg::reg_offset(addr_tmp_reg(), 1 << 20),
    });
    assert!(matches!(err, CodegenError::ScratchConflict(_)));
}
