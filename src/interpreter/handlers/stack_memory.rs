//! Stack, Memory, and SHA3 opcodes (§4.5): PUSH0..32, DUPn, SWAPn, POP,
//! MLOAD, MSTORE, MSTORE8, MSIZE, MCOPY, SHA3.
//!
//! PUSH here differs from the teacher's `opcode_handlers/push.rs` (which
//! reads the immediate out of the bytecode buffer at execution time): this
//! design bakes the immediate into the Instruction Record at analysis time
//! (§3 small-push/large-push), so the runtime side is just "read it out of
//! `InstrArg`, push it" — no bytecode access, no PC tracking. DUP/SWAP/
//! SHA3/MLOAD/MSTORE/MCOPY are grounded in the teacher's stack/memory
//! handling pattern via this crate's own `Stack`/`Memory` primitives.

use crate::analysis::{resolve_push_value, Analysis, Instruction, StepOutcome};
use crate::errors::VMError;
use crate::frame::Frame;
use crate::gas;
use crate::host::Host;
use crate::interpreter::{charge_gas_corrected, charge_memory_expansion_corrected};
use crate::memory::calculate_memory_size;
use crate::word::Word;

pub(crate) fn op_push_small(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(instr.arg.as_small_push());
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_push_large(
    frame: &mut Frame,
    instr: &Instruction,
    analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let value = resolve_push_value(instr.arg, true, analysis)?;
    frame.stack.push_unchecked(value);
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_dup(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let depth = usize::try_from(instr.arg.as_raw()).unwrap_or(usize::MAX);
    frame.stack.dup_unchecked(depth);
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_swap(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let depth = usize::try_from(instr.arg.as_raw()).unwrap_or(usize::MAX);
    frame.stack.swap_unchecked(depth);
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_pop(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.pop_unchecked();
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_mload(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let offset = frame.stack.pop_unchecked();
    let offset = crate::word::word_to_usize(offset).ok_or(crate::errors::ExceptionalHalt::OutOfGas)?;
    let new_size = calculate_memory_size(offset, 32)?;
    charge_memory_expansion_corrected(frame, instr, new_size)?;
    let value = frame.memory.load_word(offset)?;
    frame.stack.push_unchecked(value);
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_mstore(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let offset = frame.stack.pop_unchecked();
    let value = frame.stack.pop_unchecked();
    let offset = crate::word::word_to_usize(offset).ok_or(crate::errors::ExceptionalHalt::OutOfGas)?;
    let new_size = calculate_memory_size(offset, 32)?;
    charge_memory_expansion_corrected(frame, instr, new_size)?;
    frame.memory.store_word(offset, value)?;
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_mstore8(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let offset = frame.stack.pop_unchecked();
    let value = frame.stack.pop_unchecked();
    let offset = crate::word::word_to_usize(offset).ok_or(crate::errors::ExceptionalHalt::OutOfGas)?;
    let new_size = calculate_memory_size(offset, 1)?;
    charge_memory_expansion_corrected(frame, instr, new_size)?;
    frame.memory.store_byte(offset, value.byte(0))?;
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_msize(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let len = u64::try_from(frame.memory.len()).unwrap_or(u64::MAX);
    frame.stack.push_unchecked(Word::from(len));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_mcopy(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let dest_offset = frame.stack.pop_unchecked();
    let src_offset = frame.stack.pop_unchecked();
    let size = frame.stack.pop_unchecked();

    let size = crate::word::word_to_usize(size).ok_or(crate::errors::ExceptionalHalt::OutOfGas)?;
    if size == 0 {
        return Ok(StepOutcome::Continue);
    }
    let dest_offset =
        crate::word::word_to_usize(dest_offset).ok_or(crate::errors::ExceptionalHalt::OutOfGas)?;
    let src_offset =
        crate::word::word_to_usize(src_offset).ok_or(crate::errors::ExceptionalHalt::OutOfGas)?;

    charge_gas_corrected(frame, instr, gas::copy_dynamic_cost(size)?)?;
    let new_size = calculate_memory_size(dest_offset.max(src_offset), size)?;
    charge_memory_expansion_corrected(frame, instr, new_size)?;
    frame.memory.copy_within(src_offset, dest_offset, size)?;
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_sha3(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let offset = frame.stack.pop_unchecked();
    let size = frame.stack.pop_unchecked();

    let size = crate::word::word_to_usize(size).ok_or(crate::errors::ExceptionalHalt::OutOfGas)?;
    let offset = crate::word::word_to_usize(offset).ok_or(crate::errors::ExceptionalHalt::OutOfGas)?;

    charge_gas_corrected(frame, instr, gas::keccak256_dynamic_cost(size)?)?;
    let new_size = calculate_memory_size(offset, size)?;
    charge_memory_expansion_corrected(frame, instr, new_size)?;
    let data = frame.memory.load_range(offset, size)?;
    let hash = host.keccak256(&data);
    frame.stack.push_unchecked(Word::from_big_endian(hash.as_bytes()));
    Ok(StepOutcome::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::InstrArg;
    use crate::config::Config;
    use crate::test_support::NullHost;

    fn frame_with(stack: &[Word]) -> Frame {
        let config = Config::default();
        let mut frame = Frame::new(
            &config,
            crate::word::Address::zero(),
            crate::word::Address::zero(),
            Word::zero(),
            bytes::Bytes::new(),
            1_000_000,
            0,
            false,
        );
        for value in stack {
            frame.stack.push_unchecked(*value);
        }
        frame
    }

    fn analysis() -> Analysis {
        Analysis::build(&[], &Config::default()).unwrap()
    }

    #[test]
    fn mstore_mload_round_trip() {
        let mut frame = frame_with(&[Word::from(99u64), Word::zero()]);
        let instr = Instruction::new(op_mstore, InstrArg::NONE);
        op_mstore(&mut frame, &instr, &analysis(), &mut NullHost).unwrap();
        frame.stack.push_unchecked(Word::zero());
        let instr = Instruction::new(op_mload, InstrArg::NONE);
        op_mload(&mut frame, &instr, &analysis(), &mut NullHost).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), Word::from(99u64));
    }

    #[test]
    fn dup1_copies_top() {
        let mut frame = frame_with(&[Word::from(7u64)]);
        let instr = Instruction::new(op_dup, InstrArg::raw(0));
        op_dup(&mut frame, &instr, &analysis(), &mut NullHost).unwrap();
        assert_eq!(frame.stack.len(), 2);
        assert_eq!(frame.stack.peek_unchecked(0), Word::from(7u64));
    }

    #[test]
    fn swap1_exchanges_top_two() {
        let mut frame = frame_with(&[Word::from(1u64), Word::from(2u64)]);
        let instr = Instruction::new(op_swap, InstrArg::raw(1));
        op_swap(&mut frame, &instr, &analysis(), &mut NullHost).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), Word::from(1u64));
        assert_eq!(frame.stack.peek_unchecked(1), Word::from(2u64));
    }
}
