//! PowerPC64 instruction set support.

use target_lexicon::{Architecture, Triple};

use crate::error::CodegenResult;
use crate::isa::{EmitState, ScratchRegs, TargetIsa};
use crate::machinst::{CodeBuffer, Endianness, MInst};

pub mod args;
pub mod emit;
pub mod imms;
pub mod regs;

#[cfg(test)]
mod emit_tests;

/// Which generation of the VSX facility the target implements.
///
/// ISA 3.0 (POWER9) adds the DQ-form `lxv`/`stxv` pair, `xxspltib`, and
/// `mtvsrws`; on earlier VSX hardware the backend substitutes indexed
/// accesses and multi-instruction splats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Revision {
    /// VSX as of ISA 2.07 (POWER8).
    Vsx2,
    /// VSX as of ISA 3.0 (POWER9).
    Vsx3,
}

/// A PowerPC64 backend.
#[derive(Clone, Debug)]
pub struct Ppc64Backend {
    rev: Revision,
    endianness: Endianness,
}

impl Ppc64Backend {
    /// Create a new PowerPC64 backend for the given ISA revision and byte
    /// order.
    pub fn new(rev: Revision, endianness: Endianness) -> Ppc64Backend {
        Ppc64Backend { rev, endianness }
    }

    /// The ISA revision this backend targets.
    pub fn revision(&self) -> Revision {
        self.rev
    }
}

impl TargetIsa for Ppc64Backend {
    fn name(&self) -> &'static str {
        "ppc64"
    }

    fn triple(&self) -> Triple {
        let architecture = match self.endianness {
            Endianness::Big => Architecture::Powerpc64,
            Endianness::Little => Architecture::Powerpc64le,
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

    fn emit(&self, inst: &MInst, sink: &mut CodeBuffer, state: &mut EmitState) -> CodegenResult<()> {
        emit::emit(inst, sink, state, self.rev)
    }
}
