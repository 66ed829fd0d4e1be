//! AArch64 ISA definitions: instruction arguments.

use crate::isa::aarch64::imms::{SImm9, UImm12Scaled};
use crate::machinst::Reg;

/// A fully resolved addressing mode: every variant here maps onto exactly
/// one load/store encoding. The resolver in `emit.rs` turns a portable
/// [`MemArg`](crate::machinst::MemArg) into one of these, emitting staging
/// instructions first when the displacement does not fit.
#[derive(Clone, Copy, Debug)]
pub enum AMode {
    /// Unscaled signed 9-bit byte offset (`ldur`/`stur` family).
    Unscaled(Reg, SImm9),
    /// Scaled unsigned 12-bit offset (`ldr`/`str` unsigned-offset family).
    UnsignedOffset(Reg, UImm12Scaled),
    /// Register plus register (`ldr`/`str` register-offset family, LSL #0).
    RegReg(Reg, Reg),
}

impl AMode {
    /// A zero-displacement reference through `reg`, as produced at the end
    /// of an address-staging sequence.
    pub fn reg(reg: Reg, scale: u32) -> AMode {
        AMode::UnsignedOffset(reg, UImm12Scaled::zero(scale))
    }

    /// The base register of the resolved mode.
    pub fn base_register(&self) -> Reg {
        match self {
            AMode::Unscaled(rn, _) => *rn,
            AMode::UnsignedOffset(rn, _) => *rn,
            AMode::RegReg(rn, _) => *rn,
        }
    }
}
