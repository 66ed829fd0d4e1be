//! MIPS64 ISA definitions: registers.

use crate::machinst::{Reg, Writable};

/// Get a reference to a general-purpose register ($0..$31).
#[inline]
pub const fn gpr(num: u8) -> Reg {
    Reg::int(num)
}

/// Writable form of [`gpr`].
#[inline]
pub fn writable_gpr(num: u8) -> Writable<Reg> {
    Writable::from_reg(gpr(num))
}

/// Get a reference to an MSA vector register (w0..w31).
#[inline]
pub const fn wreg(num: u8) -> Reg {
    Reg::vector(num)
}

/// Writable form of [`wreg`].
#[inline]
pub fn writable_wreg(num: u8) -> Writable<Reg> {
    Writable::from_reg(wreg(num))
}

/// The hard-wired zero register, $0.
#[inline]
pub const fn zero_reg() -> Reg {
    gpr(0)
}

/// The immediate-staging scratch register, $1 (the assembler temporary).
#[inline]
pub const fn imm_tmp_reg() -> Reg {
    gpr(1)
}

/// The address-staging scratch register, $24 (t8).
#[inline]
pub const fn addr_tmp_reg() -> Reg {
    gpr(24)
}

/// The data-staging scratch register, $25 (t9).
#[inline]
pub const fn data_tmp_reg() -> Reg {
    gpr(25)
}

/// Left operand of a synthesized comparison, $12 (t4).
#[inline]
pub const fn cmp_lhs_reg() -> Reg {
    gpr(12)
}

/// Right operand of a synthesized comparison, $13 (t5).
#[inline]
pub const fn cmp_rhs_reg() -> Reg {
    gpr(13)
}

/// Saved FCSR inside a rounding-mode scope, $23 (s7).
#[inline]
pub const fn fctrl_save_reg() -> Reg {
    gpr(23)
}
