//! Control Flow and block-metadata opcodes (§4.4, §4.5): STOP, JUMP, JUMPI,
//! PC, GAS, RETURN, REVERT, INVALID.
//!
//! No single teacher file covers these — the teacher's per-opcode handler
//! files retrieved into this pack stop at arithmetic/bitwise/environment/
//! system; STOP's own handler lives inline in the teacher's opcode table
//! rather than a dedicated function. These are built directly from §4.4's
//! normative text and this crate's own `Analysis`/`InstrArg` encodings
//! (`as_jump_target`, the gas-correction `as_raw`).

use bytes::Bytes;

use crate::analysis::{Analysis, Instruction, JumpKind, StepOutcome};
use crate::errors::{ExceptionalHalt, InternalError, VMError};
use crate::frame::Frame;
use crate::host::Host;
use crate::interpreter::{charge_memory_expansion_corrected, true_remaining_gas};
use crate::outcome::Outcome;
use crate::word::Word;

pub(crate) fn op_stop(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    Ok(StepOutcome::Halt(Outcome::Success {
        output: Bytes::new(),
        gas_left: frame.gas_left_u64(),
    }))
}

/// The original PC is baked into `InstrArg::raw` at analysis time.
pub(crate) fn op_pc(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(Word::from(instr.arg.as_raw()));
    Ok(StepOutcome::Continue)
}

/// §4.2 gas-correction protocol: the block's base gas was charged as a
/// lump sum at `BEGINBLOCK`; `true_remaining_gas` adds back what hasn't
/// "really" been spent as of this instruction.
pub(crate) fn op_gas(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let gas = true_remaining_gas(frame, instr);
    frame.stack.push_unchecked(Word::from(gas));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_return(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let offset = frame.stack.pop_unchecked();
    let size = frame.stack.pop_unchecked();
    let output = load_output_range(frame, instr, offset, size)?;
    frame.output = output.clone();
    Ok(StepOutcome::Halt(Outcome::Success {
        output,
        gas_left: frame.gas_left_u64(),
    }))
}

pub(crate) fn op_revert(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let offset = frame.stack.pop_unchecked();
    let size = frame.stack.pop_unchecked();
    let output = load_output_range(frame, instr, offset, size)?;
    frame.output = output.clone();
    Ok(StepOutcome::Halt(Outcome::Revert {
        output,
        gas_left: frame.gas_left_u64(),
    }))
}

fn load_output_range(frame: &mut Frame, instr: &Instruction, offset: Word, size: Word) -> Result<Bytes, VMError> {
    let size = crate::word::word_to_usize(size).ok_or(ExceptionalHalt::OutOfGas)?;
    if size == 0 {
        return Ok(Bytes::new());
    }
    let offset = crate::word::word_to_usize(offset).ok_or(ExceptionalHalt::OutOfGas)?;
    let new_size = crate::memory::calculate_memory_size(offset, size)?;
    charge_memory_expansion_corrected(frame, instr, new_size)?;
    frame.memory.load_range(offset, size)
}

pub(crate) fn op_invalid_opcode(
    _frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    Err(ExceptionalHalt::InvalidOpcode.into())
}

/// Static jump: the target was resolved to a `BEGINBLOCK` index at
/// analysis time (O-2), so this never consults `Analysis::is_valid_jumpdest`
/// at runtime — the destination word on the stack is discarded, not
/// re-validated.
pub(crate) fn op_jump_static(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.pop_unchecked();
    let (index, kind) = instr.arg.as_jump_target();
    debug_assert_eq!(kind, JumpKind::Static);
    Ok(StepOutcome::Jump(usize::try_from(index).map_err(|_| InternalError::TypeConversion)?))
}

pub(crate) fn op_jumpi_static(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.pop_unchecked(); // destination, already resolved
    let condition = frame.stack.pop_unchecked();
    if condition.is_zero() {
        return Ok(StepOutcome::Continue);
    }
    let (index, kind) = instr.arg.as_jump_target();
    debug_assert_eq!(kind, JumpKind::ConditionalStatic);
    Ok(StepOutcome::Jump(usize::try_from(index).map_err(|_| InternalError::TypeConversion)?))
}

pub(crate) fn op_jump_dynamic(
    frame: &mut Frame,
    _instr: &Instruction,
    analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let destination = frame.stack.pop_unchecked();
    Ok(StepOutcome::Jump(resolve_dynamic_jump(analysis, destination)?))
}

pub(crate) fn op_jumpi_dynamic(
    frame: &mut Frame,
    _instr: &Instruction,
    analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let destination = frame.stack.pop_unchecked();
    let condition = frame.stack.pop_unchecked();
    if condition.is_zero() {
        return Ok(StepOutcome::Continue);
    }
    Ok(StepOutcome::Jump(resolve_dynamic_jump(analysis, destination)?))
}

fn resolve_dynamic_jump(analysis: &Analysis, destination: Word) -> Result<usize, VMError> {
    let pc = crate::word::word_to_usize(destination).ok_or(ExceptionalHalt::InvalidJump)?;
    if !analysis.is_valid_jumpdest(pc) {
        return Err(ExceptionalHalt::InvalidJump.into());
    }
    analysis
        .pc_to_instruction_index(pc)
        .ok_or_else(|| ExceptionalHalt::InvalidJump.into())
}
