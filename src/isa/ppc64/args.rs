//! PowerPC64 ISA definitions: instruction arguments.

use crate::isa::ppc64::imms::{DqOffset, SImm16};
use crate::machinst::Reg;

/// A fully resolved scalar addressing mode.
#[derive(Clone, Copy, Debug)]
pub enum AMode {
    /// D-form: base register plus signed 16-bit byte offset. DS-form users
    /// are guaranteed a 4-aligned offset by the resolver.
    D(Reg, SImm16),
    /// X-form: base register plus index register.
    X(Reg, Reg),
}

/// A fully resolved vector addressing mode.
#[derive(Clone, Copy, Debug)]
pub enum VecAMode {
    /// DQ-form base plus 16-aligned offset (`lxv`/`stxv`, ISA 3.0 only).
    Dq(Reg, DqOffset),
    /// Indexed (`lxvd2x`/`stxvd2x`). `None` in the base slot encodes the
    /// RA=0 literal-zero convention: the effective address is the index
    /// register alone.
    Indexed(Option<Reg>, Reg),
}
