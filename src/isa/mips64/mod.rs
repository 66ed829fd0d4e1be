//! MIPS64 (with MSA) target backend.

pub mod args;
pub mod emit;
pub mod imms;
pub mod regs;


use target_lexicon::{Architecture, Mips64Architecture, Triple};

use crate::error::CodegenResult;
use crate::isa::{EmitState, ScratchRegs, TargetIsa};
use crate::machinst::{CodeBuffer, Endianness, MInst};

/// The architecture revision a MIPS64 backend encodes for.
///
/// The two revisions diverge in branch shape and multiplication: before R6
/// every branch carries a mandatory delay-slot `nop` and multiplication goes
/// through the hi/lo pair; R6 drops the delay slot, gains the compact `bc`
/// branch, and has single-word `mul`/`dmul`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Revision {
    /// MIPS64r2-style encoding, with branch delay slots.
    PreR6,
    /// MIPS64r6 encoding.
    R6,
}

/// A MIPS64 backend with MSA vectors.
#[derive(Clone, Debug)]
pub struct Mips64Backend {
    rev: Revision,
    endianness: Endianness,
}

impl Mips64Backend {
    /// Create a new MIPS64 backend for the given revision and byte order.
    pub fn new(rev: Revision, endianness: Endianness) -> Mips64Backend {
        Mips64Backend { rev, endianness }
    }

    /// The architecture revision this backend encodes for.
    pub fn revision(&self) -> Revision {
        self.rev
    }
}

impl TargetIsa for Mips64Backend {
    fn name(&self) -> &'static str {
        "mips64"
    }

    fn triple(&self) -> Triple {
        let architecture = match (self.rev, self.endianness) {
            (Revision::R6, Endianness::Big) => {
                Architecture::Mips64(Mips64Architecture::Mipsisa64r6)
            }
            (Revision::R6, Endianness::Little) => {
                Architecture::Mips64(Mips64Architecture::Mipsisa64r6el)
            }
            (Revision::PreR6, Endianness::Big) => {
                Architecture::Mips64(Mips64Architecture::Mips64)
            }
            (Revision::PreR6, Endianness::Little) => {
                Architecture::Mips64(Mips64Architecture::Mips64el)
            }
        };
        Triple {
            architecture,
            ..Triple::unknown()
        }
    }

    fn endianness(&self) -> Endianness {
        self.endianness
    }

    fn native_vector_bytes(&self) -> u32 {
        16
    }

    fn scratch_regs(&self) -> ScratchRegs {
        ScratchRegs {
            addr_tmp: regs::addr_tmp_reg(),
            data_tmp: regs::data_tmp_reg(),
            imm_tmp: regs::imm_tmp_reg(),
            cmp_lhs: regs::cmp_lhs_reg(),
            cmp_rhs: regs::cmp_rhs_reg(),
            fctrl_save: regs::fctrl_save_reg(),
        }
    }

    fn emit(
        &self,
        inst: &MInst,
        sink: &mut CodeBuffer,
        state: &mut EmitState,
    ) -> CodegenResult<()> {
        emit::emit(inst, sink, state, self.rev)
    }
}
