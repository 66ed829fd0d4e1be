//! Target backends.
//!
//! Each backend implements [`TargetIsa`]: the single seam through which the
//! portable instruction vocabulary is turned into opcode words for one
//! architecture. Backends are pure encoders; selecting one is the caller's
//! job (by triple via [`lookup`], or directly with a revision parameter).

use target_lexicon::{Architecture, Triple};

use crate::error::{CodegenError, CodegenResult};
use crate::machinst::{CodeBuffer, Endianness, MInst, Reg};

#[cfg(feature = "aarch64")]
pub mod aarch64;
#[cfg(feature = "mips64")]
pub mod mips64;
#[cfg(feature = "ppc64")]
pub mod ppc64;

/// The architecture-reserved scratch registers of a backend.
///
/// These registers never hold caller-visible state across logical
/// instructions: their contents are defined only between a staging
/// instruction that writes them and the final word of the same logical
/// operation. The one exception is `fctrl_save`, which holds the saved
/// floating-point control word for the duration of a rounding-mode scope.
#[derive(Clone, Copy, Debug)]
pub struct ScratchRegs {
    /// Address staging: holds a computed base+displacement.
    pub addr_tmp: Reg,
    /// Data staging (e.g. multi-step constant synthesis).
    pub data_tmp: Reg,
    /// Immediate staging: receives materialized constants.
    pub imm_tmp: Reg,
    /// Left operand of a synthesized comparison.
    pub cmp_lhs: Reg,
    /// Right operand of a synthesized comparison.
    pub cmp_rhs: Reg,
    /// Saved floating-point control word inside a rounding-mode scope.
    pub fctrl_save: Reg,
}

/// Mutable per-session emission state.
///
/// Owned by one translation session; never shared. Backends must treat the
/// scratch registers as holding undefined values at the entry of every
/// logical instruction.
#[derive(Clone, Debug)]
pub struct EmitState {
    /// The active backend's scratch register set, passed explicitly into
    /// every resolver that may emit staging code.
    pub scratch: ScratchRegs,
}

impl EmitState {
    /// Create an emission state for the given backend.
    pub fn new(isa: &dyn TargetIsa) -> EmitState {
        EmitState {
            scratch: isa.scratch_regs(),
        }
    }
}

/// Methods that all target backends provide.
pub trait TargetIsa: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &'static str;

    /// Get the target triple that was used to make this backend.
    fn triple(&self) -> Triple;

    /// Byte order of emitted opcode words.
    fn endianness(&self) -> Endianness;

    /// The native vector register width in bytes. Logical vector operands
    /// wider than this are decomposed by the pairing layer before reaching
    /// [`TargetIsa::emit`].
    fn native_vector_bytes(&self) -> u32;

    /// The backend's reserved scratch registers.
    fn scratch_regs(&self) -> ScratchRegs;

    /// Encode one logical instruction, whose vector operands (if any) are at
    /// most the native vector width, into the code buffer. Staging words are
    /// emitted before the main word; on delayed-branch targets, the
    /// mandatory slot filler is emitted after a control-transfer word.
    fn emit(
        &self,
        inst: &MInst,
        sink: &mut CodeBuffer,
        state: &mut EmitState,
    ) -> CodegenResult<()>;
}

/// Look up a backend for the given target triple, at the default revision of
/// its architecture family. Use the per-backend constructors to pick an
/// explicit revision.
pub fn lookup(triple: Triple) -> CodegenResult<Box<dyn TargetIsa>> {
    match triple.architecture {
        #[cfg(feature = "aarch64")]
        Architecture::Aarch64(_) => Ok(Box::new(aarch64::Aarch64Backend::new())),
        #[cfg(feature = "mips64")]
        Architecture::Mips64(mips) => {
            use target_lexicon::Mips64Architecture;
            let rev = match mips {
                Mips64Architecture::Mipsisa64r6 | Mips64Architecture::Mipsisa64r6el => {
                    mips64::Revision::R6
                }
                _ => mips64::Revision::PreR6,
            };
            let endian = triple
                .endianness()
                .map_err(|_| CodegenError::Unsupported("unknown mips64 endianness".to_string()))?;
            Ok(Box::new(mips64::Mips64Backend::new(rev, endian.into())))
        }
        #[cfg(feature = "ppc64")]
        Architecture::Powerpc64 => Ok(Box::new(ppc64::Ppc64Backend::new(
            ppc64::Revision::Vsx2,
            Endianness::Big,
        ))),
        #[cfg(feature = "ppc64")]
        Architecture::Powerpc64le => Ok(Box::new(ppc64::Ppc64Backend::new(
            ppc64::Revision::Vsx2,
            Endianness::Little,
        ))),
        arch => Err(CodegenError::Unsupported(format!(
            "no backend for architecture {}",
            arch
        ))),
    }
}

impl From<target_lexicon::Endianness> for Endianness {
    fn from(e: target_lexicon::Endianness) -> Endianness {
        match e {
            target_lexicon::Endianness::Little => Endianness::Little,
            target_lexicon::Endianness::Big => Endianness::Big,
        }
    }
}
