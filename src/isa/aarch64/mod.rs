//! AArch64 (with NEON) target backend.

pub mod args;
pub mod emit;
pub mod imms;
pub mod regs;

#[cfg(test)]
mod emit_tests;

use target_lexicon::{Aarch64Architecture, Architecture, Triple};

use crate::error::CodegenResult;
use crate::isa::{EmitState, ScratchRegs, TargetIsa};
use crate::machinst::{CodeBuffer, Endianness, MInst};

/// An AArch64 backend with NEON vectors.
#[derive(Clone, Debug, Default)]
pub struct Aarch64Backend;

impl Aarch64Backend {
    /// Create a new AArch64 backend.
    pub fn new() -> Aarch64Backend {
        Aarch64Backend
    }
}

impl TargetIsa for Aarch64Backend {
    fn name(&self) -> &'static str {
        "aarch64"
    }

    fn triple(&self) -> Triple {
        Triple {
            architecture: Architecture::Aarch64(Aarch64Architecture::Aarch64),
            ..Triple::unknown()
        }
    }

    fn endianness(&self) -> Endianness {
        Endianness::Little
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
        emit::emit(inst, sink, state)
    }
}
