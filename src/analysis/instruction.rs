//! The fixed-width Instruction Record (§3, §4.3, §9).
//!
//! The spec targets a 16-byte record: an 8-byte handler function pointer
//! plus an 8-byte argument. Rather than a Rust `enum` for the argument
//! (which would need a discriminant and therefore grow past 8 bytes), the
//! argument is a raw `u64` whose interpretation is implied by which
//! handler it's paired with — the same trick real bytecode-analysis
//! interpreters use to keep records cache-line-friendly. Typed
//! pack/unpack helpers below are the only place that encoding is known.

use crate::errors::{InternalError, VMError};
use crate::frame::Frame;
use crate::host::Host;
use crate::word::Word;

use super::Analysis;

/// Outcome of executing one Instruction Record (§4.4 point 3).
pub enum StepOutcome {
    /// Advance to the next record in sequence.
    Continue,
    /// Set the next instruction index explicitly (JUMP/JUMPI targets).
    Jump(usize),
    /// Terminate the Frame with this outcome.
    Halt(crate::outcome::Outcome),
}

/// A handler implementing one opcode (or the synthetic `BEGINBLOCK`
/// pseudo-opcode). Takes the mutable Frame, the record being executed, a
/// read-only handle to the Analysis (for `push_values`/`jumpdest_set`
/// lookups), and the Host (for every external capability in §6).
pub type OpFn = fn(
    frame: &mut Frame,
    instr: &Instruction,
    analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError>;

/// One entry in the linear instruction stream built by C3.
#[derive(Clone, Copy)]
pub struct Instruction {
    pub handler: OpFn,
    pub arg: InstrArg,
}

impl Instruction {
    pub const fn new(handler: OpFn, arg: InstrArg) -> Self {
        Self { handler, arg }
    }
}

/// Raw 8-byte argument payload. Interpretation depends on which handler
/// it is paired with; see the `as_*`/`pack_*` helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstrArg(pub u64);

/// Static/dynamic jump classification tag, packed into the high bits of a
/// jump-target `InstrArg` (§3 Instruction Record "jump-target").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Static,
    ConditionalStatic,
    Dynamic,
}

impl JumpKind {
    const fn tag(self) -> u64 {
        match self {
            JumpKind::Static => 0,
            JumpKind::ConditionalStatic => 1,
            JumpKind::Dynamic => 2,
        }
    }

    const fn from_tag(tag: u64) -> Self {
        match tag {
            0 => JumpKind::Static,
            1 => JumpKind::ConditionalStatic,
            _ => JumpKind::Dynamic,
        }
    }
}

impl InstrArg {
    pub const NONE: InstrArg = InstrArg(0);

    /// *small-push*: an immediate value ≤ 8 bytes, inlined directly.
    #[inline]
    pub const fn small_push(value: u64) -> Self {
        InstrArg(value)
    }

    #[inline]
    pub fn as_small_push(self) -> Word {
        Word::from(self.0)
    }

    /// *large-push*: index into the Analysis's `push_values` side table.
    #[inline]
    pub const fn large_push(index: u32) -> Self {
        InstrArg(index as u64)
    }

    #[inline]
    pub const fn as_push_index(self) -> u32 {
        #[allow(clippy::as_conversions)]
        let index = self.0 as u32;
        index
    }

    /// *block-info*: `(gas_cost: u32, stack_req: i16, stack_max_growth: i16)`
    /// carried by a `BEGINBLOCK` record.
    #[inline]
    #[allow(clippy::as_conversions)]
    pub const fn block_info(gas_cost: u32, stack_req: i16, stack_max_growth: i16) -> Self {
        let gas = gas_cost as u64;
        let req = (stack_req as u16) as u64;
        let growth = (stack_max_growth as u16) as u64;
        InstrArg(gas | (req << 32) | (growth << 48))
    }

    #[inline]
    #[allow(clippy::as_conversions)]
    pub const fn as_block_info(self) -> (u32, i16, i16) {
        let gas_cost = (self.0 & 0xFFFF_FFFF) as u32;
        let stack_req = ((self.0 >> 32) & 0xFFFF) as u16 as i16;
        let stack_max_growth = ((self.0 >> 48) & 0xFFFF) as u16 as i16;
        (gas_cost, stack_req, stack_max_growth)
    }

    /// *jump-target*: resolved instruction index plus its jump-kind tag.
    #[inline]
    #[allow(clippy::as_conversions)]
    pub const fn jump_target(instruction_index: u32, kind: JumpKind) -> Self {
        InstrArg((instruction_index as u64) | (kind.tag() << 32))
    }

    #[inline]
    #[allow(clippy::as_conversions)]
    pub const fn as_jump_target(self) -> (u32, JumpKind) {
        let index = (self.0 & 0xFFFF_FFFF) as u32;
        let kind = JumpKind::from_tag(self.0 >> 32);
        (index, kind)
    }

    /// *raw-u64*: original PC, precomputed memory-expansion cost, or (for
    /// dynamic-gas handlers) the block's total precharge.
    #[inline]
    pub const fn raw(value: u64) -> Self {
        InstrArg(value)
    }

    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// *log-info*: LOG0..4 needs both its topic count (0..=4, packed into
    /// the low 3 bits) and the same mid-block gas-correction value (§4.2)
    /// every other dynamic-gas handler gets via [`InstrArg::raw`] — packed
    /// together since a LOG record has only the one `arg` slot to carry
    /// both in.
    #[inline]
    #[allow(clippy::as_conversions)]
    pub const fn log_info(topic_count: u64, correction: i64) -> Self {
        InstrArg(((correction as u64) << 3) | (topic_count & 0x7))
    }

    #[inline]
    #[allow(clippy::as_conversions)]
    pub const fn as_log_info(self) -> (u64, i64) {
        let topic_count = self.0 & 0x7;
        let correction = (self.0 as i64) >> 3;
        (topic_count, correction)
    }
}

/// Look up a push value, whether inline (small-push) or indexed
/// (large-push) — a convenience used by PUSH handlers.
#[inline]
pub fn resolve_push_value(
    arg: InstrArg,
    is_large: bool,
    analysis: &Analysis,
) -> Result<Word, VMError> {
    if is_large {
        let index = usize::try_from(arg.as_push_index())
            .map_err(|_| InternalError::TypeConversion)?;
        analysis
            .push_values
            .get(index)
            .copied()
            .ok_or_else(|| InternalError::InstructionIndexOutOfBounds.into())
    } else {
        Ok(arg.as_small_push())
    }
}
