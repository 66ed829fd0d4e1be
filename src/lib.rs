//! Retargetable machine-instruction encoder.
//!
//! Crossmach turns one portable vocabulary of logical instructions, scalar
//! ("BASE") operations and vector ("SIMD") operations, into exact 32-bit
//! opcode words for several unrelated CPU architectures: AArch64 with NEON,
//! MIPS64 with MSA, and 64-bit Power with VSX. One body of kernel code can
//! be retargeted across these architectures without per-target forks.
//!
//! The crate is an encoder only. It resolves register, memory and immediate
//! operands into the bit fields a target requires, synthesizes staging
//! instructions through reserved scratch registers when a value or address
//! does not fit one instruction word, composes final opcode words, and
//! splits logical wide-vector operations across pairs or quadruples of
//! physical registers where the target's native vector width is narrower.
//! Register allocation, instruction scheduling, executable-memory management
//! and disassembly are all the caller's concern.
//!
//! ```
//! use crossmach::isa::{self, TargetIsa};
//! use crossmach::machinst::{AluOp, MInst, OperandSize, Reg, TranslationSession, Writable};
//!
//! let isa = isa::lookup("aarch64-unknown-linux-gnu".parse().unwrap()).unwrap();
//! let mut sess = TranslationSession::new(&*isa);
//! sess.emit(&MInst::AluRRR {
//!     op: AluOp::Add,
//!     size: OperandSize::Size64,
//!     rd: Writable::from_reg(Reg::int(0)),
//!     rn: Reg::int(1),
//!     rm: Reg::int(2),
//!     set_flags: false,
//! })
//! .unwrap();
//! let code = sess.finalize().unwrap();
//! assert_eq!(code.len(), 4);
//! ```

#![warn(unused_import_braces)]

pub mod condcodes;
pub mod error;
pub mod isa;
pub mod machinst;

pub use crate::error::{CodegenError, CodegenResult};

/// Version number of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
