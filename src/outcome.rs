//! The caller-facing result of `execute(Frame, Analysis) -> Outcome` (§6).

use bytes::Bytes;

use crate::errors::ExceptionalHalt;

/// The single value the interpreter hands back to its Host. Internal
/// `Result<_, VMError>` plumbing is converted to this at exactly one seam
/// (`interpreter::run`), mirroring the teacher's `ContextResult`/`TxResult`
/// boundary between internal errors and the caller-facing report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `STOP` or `RETURN`. `gas_left` is the unconsumed remainder, returned
    /// to the caller.
    Success { output: Bytes, gas_left: u64 },
    /// `REVERT`. Per §7, remaining gas is still returned to the caller.
    Revert { output: Bytes, gas_left: u64 },
    /// Any exceptional halt (§7). `gas_left` is 0 for every kind in this
    /// engine's taxonomy — none of §7's `Invalid`-outcome rows are a
    /// "designated returning error" that refunds gas (only `Halt(REVERT)`
    /// refunds, and that's modeled as `Revert` above, not `Invalid`).
    Invalid {
        error: ExceptionalHalt,
        gas_left: u64,
    },
}

impl Outcome {
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    #[inline]
    pub const fn gas_left(&self) -> u64 {
        match self {
            Outcome::Success { gas_left, .. }
            | Outcome::Revert { gas_left, .. }
            | Outcome::Invalid { gas_left, .. } => *gas_left,
        }
    }

    #[inline]
    pub fn output(&self) -> Option<&Bytes> {
        match self {
            Outcome::Success { output, .. } | Outcome::Revert { output, .. } => Some(output),
            Outcome::Invalid { .. } => None,
        }
    }
}
