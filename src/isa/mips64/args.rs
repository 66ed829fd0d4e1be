//! MIPS64 ISA definitions: instruction arguments.

use crate::isa::mips64::imms::{Imm16, SImm10};
use crate::machinst::Reg;

/// A fully resolved scalar addressing mode. MIPS scalar loads and stores
/// have exactly one shape: base register plus signed 16-bit byte offset.
/// The resolver in `emit.rs` folds index registers and wide displacements
/// into the address scratch register first.
#[derive(Clone, Copy, Debug)]
pub struct AMode {
    /// The base register.
    pub base: Reg,
    /// The signed byte offset.
    pub offset: Imm16,
}

/// A fully resolved MSA addressing mode: base register plus a signed 10-bit
/// offset scaled by the element size of the `ld.df`/`st.df` form in use.
#[derive(Clone, Copy, Debug)]
pub struct MsaAMode {
    /// The base register.
    pub base: Reg,
    /// The element-scaled offset.
    pub s10: SImm10,
    /// The data format field: log2 of the element size in bytes.
    pub df: u32,
}
