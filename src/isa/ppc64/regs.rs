//! PowerPC64 ISA definitions: registers.

use crate::machinst::{Reg, Writable};

/// Get a reference to a general-purpose register (r0..r31).
///
/// r0 is a real register in every XO-form operand position, but reads as
/// literal zero in the base slot of D-form memory accesses and `addi`; the
/// resolver routes around those positions.
#[inline]
pub const fn gpr(num: u8) -> Reg {
    Reg::int(num)
}

/// Writable form of [`gpr`].
#[inline]
pub fn writable_gpr(num: u8) -> Writable<Reg> {
    Writable::from_reg(gpr(num))
}

/// Get a reference to a vector register.
///
/// Vector register n lives in VSX register 32+n (the VMX half of the VSX
/// file), so the TX/AX/BX extension bits are always set in VSX encodings.
#[inline]
pub const fn vreg(num: u8) -> Reg {
    Reg::vector(num)
}

/// Writable form of [`vreg`].
#[inline]
pub fn writable_vreg(num: u8) -> Writable<Reg> {
    Writable::from_reg(vreg(num))
}

/// The address-staging scratch register, r11.
#[inline]
pub const fn addr_tmp_reg() -> Reg {
    gpr(11)
}

/// The data-staging scratch register, r12.
#[inline]
pub const fn data_tmp_reg() -> Reg {
    gpr(12)
}

/// The immediate-staging scratch register, r31.
#[inline]
pub const fn imm_tmp_reg() -> Reg {
    gpr(31)
}

/// Left operand of a synthesized comparison, r30.
#[inline]
pub const fn cmp_lhs_reg() -> Reg {
    gpr(30)
}

/// Right operand of a synthesized comparison, r29.
#[inline]
pub const fn cmp_rhs_reg() -> Reg {
    gpr(29)
}

/// Saved FPSCR inside a rounding-mode scope: FPR31.
///
/// FPR31 aliases VSX register 31, which is disjoint from the vector
/// registers (VSX 32..63), so vector state is never clobbered by a
/// rounding-mode scope.
#[inline]
pub const fn fctrl_save_reg() -> Reg {
    Reg::vector(31)
}
