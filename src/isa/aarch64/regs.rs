//! AArch64 ISA definitions: registers.

use crate::machinst::{Reg, Writable};

/// Get a reference to a general-purpose register (X0..X30, XZR).
#[inline]
pub const fn xreg(num: u8) -> Reg {
    Reg::int(num)
}

/// Writable form of [`xreg`].
#[inline]
pub fn writable_xreg(num: u8) -> Writable<Reg> {
    Writable::from_reg(xreg(num))
}

/// Get a reference to a vector register (V0..V31).
#[inline]
pub const fn vreg(num: u8) -> Reg {
    Reg::vector(num)
}

/// Writable form of [`vreg`].
#[inline]
pub fn writable_vreg(num: u8) -> Writable<Reg> {
    Writable::from_reg(vreg(num))
}

/// Get a reference to the zero-register. Register 31 is XZR in every operand
/// position this encoder uses it; SP never appears as an operand here.
#[inline]
pub const fn zero_reg() -> Reg {
    xreg(31)
}

/// Writable form of [`zero_reg`] (this discards a result).
#[inline]
pub fn writable_zero_reg() -> Writable<Reg> {
    Writable::from_reg(zero_reg())
}

/// The address-staging scratch register, x16 (IP0).
#[inline]
pub const fn addr_tmp_reg() -> Reg {
    xreg(16)
}

/// The data-staging scratch register, x17 (IP1).
#[inline]
pub const fn data_tmp_reg() -> Reg {
    xreg(17)
}

/// The immediate-staging scratch register, x18.
#[inline]
pub const fn imm_tmp_reg() -> Reg {
    xreg(18)
}

/// Left operand of a synthesized comparison, x14.
#[inline]
pub const fn cmp_lhs_reg() -> Reg {
    xreg(14)
}

/// Right operand of a synthesized comparison, x15.
#[inline]
pub const fn cmp_rhs_reg() -> Reg {
    xreg(15)
}

/// Saved FPCR inside a rounding-mode scope, x19.
#[inline]
pub const fn fctrl_save_reg() -> Reg {
    xreg(19)
}
