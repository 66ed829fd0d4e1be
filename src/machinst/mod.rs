//! Target-independent machine-instruction model.
//!
//! This module defines the portable instruction vocabulary: one logical
//! instruction set, parameterized by operand size, signedness and vector
//! width, that every target backend knows how to encode into its own 32-bit
//! opcode words. Callers build [`MInst`] values and feed them to a
//! [`TranslationSession`]; the session resolves operands, stages immediates
//! and addresses through scratch registers where needed, and appends the
//! final opcode words to a [`CodeBuffer`].

use core::fmt::{self, Debug, Display, Formatter};

use crate::condcodes::IntCC;

pub mod buffer;
pub mod session;

pub use buffer::{CodeBuffer, Endianness, LabelUse, MachLabel};
pub use session::TranslationSession;

/// The class of a register: scalar ("BASE") or vector ("SIMD").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegClass {
    /// Scalar integer / control registers.
    Int,
    /// Vector registers.
    Vector,
}

/// A logical register: a class plus a hardware encoding index.
///
/// The hardware encoding is only meaningful for the currently selected
/// target backend; backends validate both the class and the index against
/// their own register file when the register is used.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg {
    class: RegClass,
    hw_enc: u8,
}

impl Reg {
    /// A scalar register with the given hardware encoding.
    pub const fn int(hw_enc: u8) -> Reg {
        Reg {
            class: RegClass::Int,
            hw_enc,
        }
    }

    /// A vector register with the given hardware encoding.
    pub const fn vector(hw_enc: u8) -> Reg {
        Reg {
            class: RegClass::Vector,
            hw_enc,
        }
    }

    /// The register's class.
    pub fn class(self) -> RegClass {
        self.class
    }

    /// The register's hardware encoding index.
    pub fn hw_enc(self) -> u8 {
        self.hw_enc
    }

    /// The register at `self.hw_enc() + offset` in the same class.
    ///
    /// Used by the wide-register pairing layer to step through a pairing
    /// group of consecutive physical registers.
    pub(crate) fn offset(self, offset: u8) -> Reg {
        Reg {
            class: self.class,
            hw_enc: self.hw_enc + offset,
        }
    }
}

impl Debug for Reg {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.class {
            RegClass::Int => write!(f, "x{}", self.hw_enc),
            RegClass::Vector => write!(f, "v{}", self.hw_enc),
        }
    }
}

impl Display for Reg {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

/// A register with a "writable" marker: the destination role of an operand.
///
/// Only `Writable<Reg>` can appear in destination position in an [`MInst`],
/// which makes the destination/source distinction visible in every
/// instruction constructor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Writable<T> {
    reg: T,
}

impl<T: Copy> Writable<T> {
    /// Explicitly construct a `Writable<T>` from a `T`.
    pub fn from_reg(reg: T) -> Writable<T> {
        Writable { reg }
    }

    /// Get the underlying register.
    pub fn to_reg(self) -> T {
        self.reg
    }

    /// Map the underlying register.
    pub fn map<U: Copy, F: Fn(T) -> U>(self, f: F) -> Writable<U> {
        Writable { reg: f(self.reg) }
    }
}

/// Scalar operand size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandSize {
    /// 32-bit operation.
    Size32,
    /// 64-bit operation.
    Size64,
}

impl OperandSize {
    /// The size in bits.
    pub fn bits(self) -> u32 {
        match self {
            OperandSize::Size32 => 32,
            OperandSize::Size64 => 64,
        }
    }

    /// The AArch64-style `sf` bit: 1 for 64-bit operations.
    pub fn sf_bit(self) -> u32 {
        match self {
            OperandSize::Size32 => 0,
            OperandSize::Size64 => 1,
        }
    }
}

/// The logical width of a vector operand.
///
/// Widths above the target's native vector width are legal; the session
/// decomposes such instructions into one sub-instruction per native-width
/// pairing group before the backend sees them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VectorWidth {
    /// 128-bit vector.
    V128,
    /// 256-bit vector, a pair of 128-bit registers on 128-bit targets.
    V256,
    /// 512-bit vector, a quadruple of 128-bit registers on 128-bit targets.
    V512,
}

impl VectorWidth {
    /// The width in bytes.
    pub fn bytes(self) -> u32 {
        match self {
            VectorWidth::V128 => 16,
            VectorWidth::V256 => 32,
            VectorWidth::V512 => 64,
        }
    }
}

/// The element size of a vector lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaneSize {
    /// 8-bit lanes.
    S8,
    /// 16-bit lanes.
    S16,
    /// 32-bit lanes.
    S32,
    /// 64-bit lanes.
    S64,
}

impl LaneSize {
    /// The lane size in bytes.
    pub fn bytes(self) -> u32 {
        match self {
            LaneSize::S8 => 1,
            LaneSize::S16 => 2,
            LaneSize::S32 => 4,
            LaneSize::S64 => 8,
        }
    }

    /// log2 of the lane size in bytes, as used in several encodings.
    pub fn log2_bytes(self) -> u32 {
        match self {
            LaneSize::S8 => 0,
            LaneSize::S16 => 1,
            LaneSize::S32 => 2,
            LaneSize::S64 => 3,
        }
    }
}

/// The width of a scalar memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessWidth {
    /// 8-bit access.
    B,
    /// 16-bit access.
    H,
    /// 32-bit access.
    W,
    /// 64-bit access.
    D,
}

impl AccessWidth {
    /// The access width in bytes.
    pub fn bytes(self) -> u32 {
        match self {
            AccessWidth::B => 1,
            AccessWidth::H => 2,
            AccessWidth::W => 4,
            AccessWidth::D => 8,
        }
    }

    /// log2 of the access width in bytes.
    pub fn log2_bytes(self) -> u32 {
        match self {
            AccessWidth::B => 0,
            AccessWidth::H => 1,
            AccessWidth::W => 2,
            AccessWidth::D => 3,
        }
    }
}

/// A memory operand: base register, optional index register, and a constant
/// byte displacement.
///
/// Constructed per instruction and consumed immediately; whether the
/// displacement can be encoded inline or must be staged through the address
/// scratch register is the target backend's decision, made against the
/// displacement class for the access width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemArg {
    base: Reg,
    index: Option<Reg>,
    disp: i64,
}

impl MemArg {
    /// A base-plus-displacement memory operand.
    pub fn reg_offset(base: Reg, disp: i64) -> MemArg {
        MemArg {
            base,
            index: None,
            disp,
        }
    }

    /// A base-plus-index memory operand.
    pub fn reg_reg(base: Reg, index: Reg) -> MemArg {
        MemArg {
            base,
            index: Some(index),
            disp: 0,
        }
    }

    /// A base-plus-index-plus-displacement memory operand.
    pub fn reg_reg_offset(base: Reg, index: Reg, disp: i64) -> MemArg {
        MemArg {
            base,
            index: Some(index),
            disp,
        }
    }

    /// The base register.
    pub fn base(&self) -> Reg {
        self.base
    }

    /// The index register, if any.
    pub fn index(&self) -> Option<Reg> {
        self.index
    }

    /// The constant displacement.
    pub fn disp(&self) -> i64 {
        self.disp
    }

    /// The same operand with the displacement shifted by `delta` bytes.
    ///
    /// The pairing layer uses this to step a wide vector access through its
    /// native-width slices.
    pub(crate) fn with_disp_added(self, delta: i64) -> MemArg {
        MemArg {
            disp: self.disp + delta,
            ..self
        }
    }
}

impl Display for MemArg {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "[{}, {}, #{}]", self.base, index, self.disp),
            None => write!(f, "[{}, #{}]", self.base, self.disp),
        }
    }
}

/// Scalar ALU operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Mul,
    /// Logical shift left.
    Lsl,
    /// Logical shift right.
    Lsr,
    /// Arithmetic shift right.
    Asr,
}

impl AluOp {
    /// Mnemonic for pretty-printing.
    pub fn name(self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Sub => "sub",
            AluOp::And => "and",
            AluOp::Or => "or",
            AluOp::Xor => "xor",
            AluOp::Mul => "mul",
            AluOp::Lsl => "lsl",
            AluOp::Lsr => "lsr",
            AluOp::Asr => "asr",
        }
    }
}

/// Vector ALU operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VecAluOp {
    And,
    Or,
    Xor,
    Add,
    Sub,
}

impl VecAluOp {
    /// Mnemonic for pretty-printing.
    pub fn name(self) -> &'static str {
        match self {
            VecAluOp::And => "vand",
            VecAluOp::Or => "vor",
            VecAluOp::Xor => "vxor",
            VecAluOp::Add => "vadd",
            VecAluOp::Sub => "vsub",
        }
    }

    /// Bitwise ops ignore the lane size.
    pub fn is_bitwise(self) -> bool {
        match self {
            VecAluOp::And | VecAluOp::Or | VecAluOp::Xor => true,
            VecAluOp::Add | VecAluOp::Sub => false,
        }
    }
}

/// The flag test of an arithmetic-then-branch instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZeroCond {
    /// Branch if the result is zero.
    Zero,
    /// Branch if the result is non-zero.
    NotZero,
}

/// IEEE 754 rounding modes for the scoped rounding-mode override.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundingMode {
    /// Round to nearest, ties to even.
    Nearest,
    /// Round toward zero (truncate).
    TowardZero,
    /// Round toward positive infinity.
    TowardPositive,
    /// Round toward negative infinity.
    TowardNegative,
}

/// A logical machine instruction.
///
/// One variant per arity pattern, not per mnemonic: the operation itself is
/// a parameter ([`AluOp`], [`VecAluOp`], ...), and the per-mnemonic opcode
/// constants live in the target backends' encoding tables.
#[derive(Clone, Debug, PartialEq)]
pub enum MInst {
    /// An architectural no-op.
    Nop,

    /// Three-register scalar ALU operation.
    AluRRR {
        op: AluOp,
        size: OperandSize,
        rd: Writable<Reg>,
        rn: Reg,
        rm: Reg,
        /// Request condition-flag-setting semantics where the target has
        /// them (e.g. `adds` instead of `add` on AArch64).
        set_flags: bool,
    },

    /// Register-immediate scalar ALU operation. The immediate is staged
    /// through the immediate scratch register when it does not fit any
    /// inline encoding class of the target.
    AluRRImm {
        op: AluOp,
        size: OperandSize,
        rd: Writable<Reg>,
        rn: Reg,
        imm: i64,
        set_flags: bool,
    },

    /// Materialize a constant into a register.
    MovImm {
        size: OperandSize,
        rd: Writable<Reg>,
        imm: u64,
    },

    /// Scalar load. `sign_extend` selects between sign- and zero-extending
    /// forms for sub-register widths.
    Load {
        ty: AccessWidth,
        sign_extend: bool,
        rd: Writable<Reg>,
        mem: MemArg,
    },

    /// Scalar store.
    Store {
        ty: AccessWidth,
        rs: Reg,
        mem: MemArg,
    },

    /// Address-only computation: `rd = &mem`.
    LoadAddr {
        rd: Writable<Reg>,
        mem: MemArg,
    },

    /// Unconditional branch to a label.
    Jump {
        target: MachLabel,
    },

    /// Fused compare-and-branch: compare `rn` against `rm` and branch to
    /// `target` if the condition holds.
    CmpBr {
        cc: IntCC,
        size: OperandSize,
        rn: Reg,
        rm: Reg,
        target: MachLabel,
    },

    /// Fused arithmetic-and-branch: perform `rd = rn op rm`, then branch to
    /// `target` if the result is zero / non-zero.
    OpBr {
        op: AluOp,
        size: OperandSize,
        rd: Writable<Reg>,
        rn: Reg,
        rm: Reg,
        cond: ZeroCond,
        target: MachLabel,
    },

    /// Three-register vector ALU operation over `width` bits.
    VecAluRRR {
        op: VecAluOp,
        width: VectorWidth,
        lane: LaneSize,
        vd: Writable<Reg>,
        vn: Reg,
        vm: Reg,
    },

    /// Vector load of `width` bits.
    VecLoad {
        width: VectorWidth,
        vd: Writable<Reg>,
        mem: MemArg,
    },

    /// Vector store of `width` bits.
    VecStore {
        width: VectorWidth,
        vs: Reg,
        mem: MemArg,
    },

    /// Splat an immediate into every lane. Zero and all-ones have dedicated
    /// single-instruction forms on every supported target; other values may
    /// be staged through the immediate scratch register.
    VecSplatImm {
        width: VectorWidth,
        lane: LaneSize,
        vd: Writable<Reg>,
        imm: i64,
    },

    /// Broadcast a scalar register into every lane. The scalar source is a
    /// fixed singleton operand: the pairing layer references it identically
    /// in every sub-instruction.
    VecDup {
        width: VectorWidth,
        lane: LaneSize,
        vd: Writable<Reg>,
        rn: Reg,
    },

    /// Stage the floating-point rounding mode into the control register,
    /// saving the previous control word in the `fctrl_save` scratch
    /// register. Emitted by [`TranslationSession::with_rounding_mode`].
    SetFpRoundingMode {
        mode: RoundingMode,
    },

    /// Restore the control word saved by `SetFpRoundingMode`.
    RestoreFpRoundingMode,
}

impl MInst {
    /// The logical vector width of this instruction, if it has one.
    ///
    /// Instructions with a width wider than the target's native vector width
    /// are decomposed by the pairing layer; everything else is emitted
    /// directly.
    pub fn vector_width(&self) -> Option<VectorWidth> {
        match self {
            MInst::VecAluRRR { width, .. }
            | MInst::VecLoad { width, .. }
            | MInst::VecStore { width, .. }
            | MInst::VecSplatImm { width, .. }
            | MInst::VecDup { width, .. } => Some(*width),
            _ => None,
        }
    }
}

impl Display for MInst {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            MInst::Nop => write!(f, "nop"),
            MInst::AluRRR {
                op,
                size,
                rd,
                rn,
                rm,
                set_flags,
            } => {
                let s = if *set_flags { "s" } else { "" };
                write!(f, "{}{}.{} {}, {}, {}", op.name(), s, size.bits(), rd.to_reg(), rn, rm)
            }
            MInst::AluRRImm {
                op,
                size,
                rd,
                rn,
                imm,
                set_flags,
            } => {
                let s = if *set_flags { "s" } else { "" };
                write!(f, "{}{}.{} {}, {}, #{}", op.name(), s, size.bits(), rd.to_reg(), rn, imm)
            }
            MInst::MovImm { size, rd, imm } => {
                write!(f, "mov.{} {}, #{:#x}", size.bits(), rd.to_reg(), imm)
            }
            MInst::Load {
                ty,
                sign_extend,
                rd,
                mem,
            } => {
                let s = if *sign_extend { "s" } else { "u" };
                write!(f, "load{}.{} {}, {}", s, ty.bytes() * 8, rd.to_reg(), mem)
            }
            MInst::Store { ty, rs, mem } => {
                write!(f, "store.{} {}, {}", ty.bytes() * 8, rs, mem)
            }
            MInst::LoadAddr { rd, mem } => write!(f, "lea {}, {}", rd.to_reg(), mem),
            MInst::Jump { target } => write!(f, "b label{}", target.index()),
            MInst::CmpBr {
                cc,
                size,
                rn,
                rm,
                target,
            } => write!(f, "br.{}.{} {}, {}, label{}", cc, size.bits(), rn, rm, target.index()),
            MInst::OpBr {
                op,
                size,
                rd,
                rn,
                rm,
                cond,
                target,
            } => {
                let c = match cond {
                    ZeroCond::Zero => "z",
                    ZeroCond::NotZero => "nz",
                };
                write!(
                    f,
                    "{}.{}.br{} {}, {}, {}, label{}",
                    op.name(),
                    size.bits(),
                    c,
                    rd.to_reg(),
                    rn,
                    rm,
                    target.index()
                )
            }
            MInst::VecAluRRR {
                op,
                width,
                lane,
                vd,
                vn,
                vm,
            } => write!(
                f,
                "{}.{}x{} {}, {}, {}",
                op.name(),
                width.bytes() * 8,
                lane.bytes() * 8,
                vd.to_reg(),
                vn,
                vm
            ),
            MInst::VecLoad { width, vd, mem } => {
                write!(f, "vload.{} {}, {}", width.bytes() * 8, vd.to_reg(), mem)
            }
            MInst::VecStore { width, vs, mem } => {
                write!(f, "vstore.{} {}, {}", width.bytes() * 8, vs, mem)
            }
            MInst::VecSplatImm {
                width,
                lane,
                vd,
                imm,
            } => write!(
                f,
                "vsplat.{}x{} {}, #{}",
                width.bytes() * 8,
                lane.bytes() * 8,
                vd.to_reg(),
                imm
            ),
            MInst::VecDup {
                width,
                lane,
                vd,
                rn,
            } => write!(
                f,
                "vdup.{}x{} {}, {}",
                width.bytes() * 8,
                lane.bytes() * 8,
                vd.to_reg(),
                rn
            ),
            MInst::SetFpRoundingMode { mode } => write!(f, "fctrl.set {:?}", mode),
            MInst::RestoreFpRoundingMode => write!(f, "fctrl.restore"),
        }
    }
}
