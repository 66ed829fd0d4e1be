//! Result and error types representing the outcome of encoding an instruction.

use thiserror::Error;

/// An encoding error.
///
/// When the encoder cannot translate a logical instruction into machine code
/// for the active target, it returns one of these error codes. All of them are
/// detected at translation time, instruction by instruction; none of them is
/// ever deferred to the runtime behavior of the emitted code.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodegenError {
    /// A register of the wrong class was used, a register index exceeds the
    /// target's register file, or an addressing mode is incompatible with the
    /// chosen mnemonic.
    #[error("operand class violation: {0}")]
    OperandClass(String),

    /// An immediate or displacement exceeds every representable encoding for
    /// its class. There is no silent fallback to an approximate encoding.
    #[error("value out of encodable range: {0}")]
    OutOfRange(String),

    /// A scratch register required for a staging sequence collides with a
    /// register the caller is using as a live operand.
    #[error("scratch register conflict: {0}")]
    ScratchConflict(String),

    /// A requested branch condition, rounding mode, or operand shape has no
    /// direct or synthesizable representation on the active target.
    #[error("unsupported on this target: {0}")]
    Unsupported(String),

    /// A branch target is out of reach for every branch form of the target,
    /// or the emitted code exceeds an implementation limit.
    #[error("code or branch offset too large")]
    CodeTooLarge,
}

/// A convenient alias for a `Result` that uses `CodegenError` as the error type.
pub type CodegenResult<T> = Result<T, CodegenError>;
