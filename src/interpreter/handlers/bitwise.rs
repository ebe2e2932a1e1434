//! Comparison and Bitwise Logic Operations (§4.5): LT, GT, SLT, SGT, EQ,
//! ISZERO, AND, OR, XOR, NOT, BYTE, SHL, SHR, SAR.
//!
//! Grounded on the teacher crate's `opcode_handlers/bitwise_comparison.rs`:
//! same sign-bit comparison shape for SLT/SGT, the same `shift >= 256 ⇒ 0`
//! (or all-ones for a negative SAR) guard ahead of the native shift
//! operators. All pure stack ops; no memory, no dynamic gas.

use crate::analysis::{Analysis, Instruction, StepOutcome};
use crate::constants::WORD_SIZE;
use crate::errors::VMError;
use crate::frame::Frame;
use crate::host::Host;
use crate::word::Word;

#[inline]
fn bool_word(value: bool) -> Word {
    if value {
        Word::one()
    } else {
        Word::zero()
    }
}

#[inline]
pub(crate) fn op_lt(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let lhs = frame.stack.pop_unchecked();
    let rhs = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(bool_word(lhs < rhs));
    Ok(StepOutcome::Continue)
}

#[inline]
pub(crate) fn op_gt(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let lhs = frame.stack.pop_unchecked();
    let rhs = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(bool_word(lhs > rhs));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_slt(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let lhs = frame.stack.pop_unchecked();
    let rhs = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(bool_word(signed_less_than(lhs, rhs)));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_sgt(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let lhs = frame.stack.pop_unchecked();
    let rhs = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(bool_word(signed_less_than(rhs, lhs)));
    Ok(StepOutcome::Continue)
}

#[inline]
fn signed_less_than(lhs: Word, rhs: Word) -> bool {
    match (crate::word::is_negative(lhs), crate::word::is_negative(rhs)) {
        (true, false) => true,
        (false, true) => false,
        _ => lhs < rhs,
    }
}

#[inline]
pub(crate) fn op_eq(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let rhs = frame.stack.pop_unchecked();
    let lhs = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(bool_word(lhs == rhs));
    Ok(StepOutcome::Continue)
}

#[inline]
pub(crate) fn op_iszero(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let operand = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(bool_word(operand.is_zero()));
    Ok(StepOutcome::Continue)
}

#[inline]
pub(crate) fn op_and(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let rhs = frame.stack.pop_unchecked();
    let lhs = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(lhs & rhs);
    Ok(StepOutcome::Continue)
}

#[inline]
pub(crate) fn op_or(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let rhs = frame.stack.pop_unchecked();
    let lhs = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(lhs | rhs);
    Ok(StepOutcome::Continue)
}

#[inline]
pub(crate) fn op_xor(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let rhs = frame.stack.pop_unchecked();
    let lhs = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(lhs ^ rhs);
    Ok(StepOutcome::Continue)
}

#[inline]
pub(crate) fn op_not(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let operand = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(!operand);
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_byte(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let index = frame.stack.pop_unchecked();
    let value = frame.stack.pop_unchecked();

    let result = match crate::word::word_to_usize(index) {
        Some(byte_index) if byte_index < WORD_SIZE => {
            let from_msb = WORD_SIZE.saturating_sub(1).saturating_sub(byte_index);
            Word::from(value.byte(from_msb))
        }
        _ => Word::zero(),
    };
    frame.stack.push_unchecked(result);
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_shl(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let shift = frame.stack.pop_unchecked();
    let value = frame.stack.pop_unchecked();
    let result = if shift < Word::from(256u64) {
        value << shift.low_u32()
    } else {
        Word::zero()
    };
    frame.stack.push_unchecked(result);
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_shr(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let shift = frame.stack.pop_unchecked();
    let value = frame.stack.pop_unchecked();
    let result = if shift < Word::from(256u64) {
        value >> shift.low_u32()
    } else {
        Word::zero()
    };
    frame.stack.push_unchecked(result);
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_sar(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let shift = frame.stack.pop_unchecked();
    let value = frame.stack.pop_unchecked();
    let negative = crate::word::is_negative(value);

    let result = if shift < Word::from(256u64) {
        let shifted = value >> shift.low_u32();
        if negative {
            let fill = Word::MAX << (256u32.saturating_sub(shift.low_u32()));
            shifted | fill
        } else {
            shifted
        }
    } else if negative {
        Word::MAX
    } else {
        Word::zero()
    };
    frame.stack.push_unchecked(result);
    Ok(StepOutcome::Continue)
}
