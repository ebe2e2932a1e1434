//! Observability seam (§9 REDESIGN FLAGS: "expose a narrow callback
//! interface invoked before each handler; it must not change semantics.
//! When tracing is disabled, the check must compile out").
//!
//! Grounded on the teacher crate's `debug::DebugMode`/tracing hook around
//! its own opcode dispatch loop: a trait with empty default methods, so a
//! `NoopTracer` monomorphizes down to nothing and costs the dispatch loop
//! no more than an unconditional inlined no-op call.

use crate::analysis::{Analysis, Instruction};
use crate::frame::Frame;
use crate::outcome::Outcome;

/// Called by [`crate::interpreter::run_with_tracer`] around every
/// Instruction Record it dispatches. Must not observe or mutate anything
/// that would change the interpreter's own semantics — it is read-only
/// with respect to `frame`.
pub trait Tracer {
    /// Invoked immediately before `instr` is dispatched. `pc` is the
    /// original bytecode offset the instruction was compiled from, or
    /// `None` for the synthetic `BEGINBLOCK` record (which has no PC of
    /// its own).
    #[inline]
    fn on_step(&mut self, _frame: &Frame, _instr: &Instruction, _pc: Option<usize>) {}

    /// Invoked exactly once, when a Frame halts, with the final outcome.
    #[inline]
    fn on_halt(&mut self, _outcome: &Outcome) {}
}

/// The default [`Tracer`]: both methods are empty, so calls through it
/// compile away entirely under normal optimization.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// A [`Tracer`] that records every step's PC in order, for tests and
/// debugging tools that need to assert on control flow.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracer {
    pub steps: Vec<Option<usize>>,
    pub halted: Option<Outcome>,
}

impl Tracer for RecordingTracer {
    fn on_step(&mut self, _frame: &Frame, _instr: &Instruction, pc: Option<usize>) {
        self.steps.push(pc);
    }

    fn on_halt(&mut self, outcome: &Outcome) {
        self.halted = Some(outcome.clone());
    }
}
