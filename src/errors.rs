//! Error taxonomy.
//!
//! Mirrors the teacher crate's three-tier shape: `ExceptionalHalt` for the
//! user-visible halting reasons a well-formed contract can trigger,
//! `InternalError` for invariants the analyzer/interpreter itself must
//! uphold (reaching one is a bug in this crate, not a property of the
//! executed bytecode), and `VMError` as the `thiserror`-derived umbrella
//! `?` propagates through the whole crate.

use thiserror::Error;

/// §7 error taxonomy: reasons a Frame can halt with `Outcome::Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExceptionalHalt {
    #[error("out of gas")]
    OutOfGas,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("invalid jump destination")]
    InvalidJump,
    #[error("invalid opcode")]
    InvalidOpcode,
    #[error("state-modifying opcode in a static context")]
    WriteProtection,
    #[error("returndatacopy read past the return data buffer")]
    ReturnDataOutOfBounds,
    #[error("deployed code exceeds the maximum size")]
    MaxCodeSizeExceeded,
}

/// Invariant violations internal to this crate: reaching one of these means
/// the analyzer or the interpreter has a bug, not that the contract under
/// execution did anything the EVM considers invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("arithmetic underflow")]
    Underflow,
    #[error("numeric type conversion failed")]
    TypeConversion,
    #[error("instruction index out of bounds")]
    InstructionIndexOutOfBounds,
    #[error("malformed analysis artifact: {0}")]
    MalformedAnalysis(&'static str),
}

/// Top-level error type threaded through `Result<_, VMError>` across
/// analysis and interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VMError {
    #[error(transparent)]
    ExceptionalHalt(#[from] ExceptionalHalt),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl VMError {
    /// Whether this error is a halting condition a contract can legitimately
    /// trigger (as opposed to an internal bug). Used at the `run()` seam to
    /// decide whether to surface `Outcome::Invalid` (exceptional halt) or
    /// propagate further up as a host-level failure.
    #[inline]
    pub const fn as_exceptional_halt(&self) -> Option<ExceptionalHalt> {
        match self {
            VMError::ExceptionalHalt(halt) => Some(*halt),
            VMError::Internal(_) => None,
        }
    }
}
