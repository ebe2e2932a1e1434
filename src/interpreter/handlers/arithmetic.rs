//! Arithmetic Operations (§4.5): ADD, SUB, MUL, DIV, SDIV, MOD, SMOD,
//! ADDMOD, MULMOD, EXP, SIGNEXTEND.
//!
//! Grounded on the teacher crate's `opcode_handlers/arithmetic.rs`: same
//! wrapping/zero-on-divide-by-zero/two's-complement shape, adapted from
//! `current_call_frame.stack.pop()?`/`increase_consumed_gas` to this
//! crate's unchecked stack primitives (base gas already precharged at
//! `BEGINBLOCK`) and `primitive_types::U256` in place of
//! `ethrex_common::U256`. ADDMOD/MULMOD reduce via `overflowing_add` and
//! binary double-and-add rather than widening into a 512-bit type.

use crate::analysis::{Analysis, Instruction, StepOutcome};
use crate::errors::VMError;
use crate::frame::Frame;
use crate::gas;
use crate::host::Host;
use crate::interpreter::charge_gas_corrected;
use crate::word::{abs, is_negative, negate, Word};

#[inline]
pub(crate) fn op_add(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let addend = frame.stack.pop_unchecked();
    let augend = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(augend.overflowing_add(addend).0);
    Ok(StepOutcome::Continue)
}

#[inline]
pub(crate) fn op_sub(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let minuend = frame.stack.pop_unchecked();
    let subtrahend = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(minuend.overflowing_sub(subtrahend).0);
    Ok(StepOutcome::Continue)
}

#[inline]
pub(crate) fn op_mul(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let multiplier = frame.stack.pop_unchecked();
    let multiplicand = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(multiplicand.overflowing_mul(multiplier).0);
    Ok(StepOutcome::Continue)
}

#[inline]
pub(crate) fn op_div(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let dividend = frame.stack.pop_unchecked();
    let divisor = frame.stack.pop_unchecked();
    let quotient = dividend.checked_div(divisor).unwrap_or_default();
    frame.stack.push_unchecked(quotient);
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_sdiv(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let dividend = frame.stack.pop_unchecked();
    let divisor = frame.stack.pop_unchecked();

    if divisor.is_zero() || dividend.is_zero() {
        frame.stack.push_unchecked(Word::zero());
        return Ok(StepOutcome::Continue);
    }

    let (abs_dividend, dividend_negative) = abs(dividend);
    let (abs_divisor, divisor_negative) = abs(divisor);

    // MIN_I256 / -1 overflows back to MIN_I256 (§4.5): checked_div on the
    // magnitudes returns None only when abs_divisor is zero, already
    // excluded above, so this never hits the "MIN_I256 / 1" overflow case
    // directly — the overflow instead shows up naturally because negating
    // MIN_I256 is a no-op (word::negate is involutive on it).
    let quotient = abs_dividend.checked_div(abs_divisor).unwrap_or_default();
    let result = if dividend_negative ^ divisor_negative {
        negate(quotient)
    } else {
        quotient
    };
    frame.stack.push_unchecked(result);
    Ok(StepOutcome::Continue)
}

#[inline]
pub(crate) fn op_mod(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let dividend = frame.stack.pop_unchecked();
    let divisor = frame.stack.pop_unchecked();
    frame.stack.push_unchecked(dividend.checked_rem(divisor).unwrap_or_default());
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_smod(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let dividend = frame.stack.pop_unchecked();
    let divisor = frame.stack.pop_unchecked();

    if divisor.is_zero() || dividend.is_zero() {
        frame.stack.push_unchecked(Word::zero());
        return Ok(StepOutcome::Continue);
    }

    let (abs_dividend, dividend_negative) = abs(dividend);
    let (abs_divisor, _) = abs(divisor);

    let remainder = abs_dividend.checked_rem(abs_divisor).unwrap_or_default();
    let result = if dividend_negative { negate(remainder) } else { remainder };
    frame.stack.push_unchecked(result);
    Ok(StepOutcome::Continue)
}

/// `a + b mod m` for `a, b` already reduced mod `m`: the true sum fits in
/// 257 bits, one bit wider than `Word` can hold, so an `overflowing_add`
/// carry means the true sum is `2^256` too large — and since wrapping
/// subtraction is itself mod `2^256`, subtracting `m` from the wrapped sum
/// once (no extra 512-bit type needed) lands on the right residue either
/// way.
#[inline]
fn addmod_reduced(a: Word, b: Word, m: Word) -> Word {
    let (sum, carry) = a.overflowing_add(b);
    if carry || sum >= m {
        sum.overflowing_sub(m).0
    } else {
        sum
    }
}

/// `a * b mod m` for `a, b` already reduced mod `m`, via binary
/// double-and-add: keeps every intermediate within a single `Word` so no
/// wider integer type is needed for the 512-bit product EVM's MULMOD
/// implies.
fn mulmod_reduced(mut a: Word, mut b: Word, m: Word) -> Word {
    let mut result = Word::zero();
    while !b.is_zero() {
        if b.bit(0) {
            result = addmod_reduced(result, a, m);
        }
        a = addmod_reduced(a, a, m);
        b = b >> 1;
    }
    result
}

pub(crate) fn op_addmod(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let augend = frame.stack.pop_unchecked();
    let addend = frame.stack.pop_unchecked();
    let modulus = frame.stack.pop_unchecked();

    if modulus.is_zero() {
        frame.stack.push_unchecked(Word::zero());
        return Ok(StepOutcome::Continue);
    }

    let augend = augend.checked_rem(modulus).unwrap_or_default();
    let addend = addend.checked_rem(modulus).unwrap_or_default();
    frame.stack.push_unchecked(addmod_reduced(augend, addend, modulus));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_mulmod(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let multiplicand = frame.stack.pop_unchecked();
    let multiplier = frame.stack.pop_unchecked();
    let modulus = frame.stack.pop_unchecked();

    if modulus.is_zero() {
        frame.stack.push_unchecked(Word::zero());
        return Ok(StepOutcome::Continue);
    }

    let multiplicand = multiplicand.checked_rem(modulus).unwrap_or_default();
    let multiplier = multiplier.checked_rem(modulus).unwrap_or_default();
    frame.stack.push_unchecked(mulmod_reduced(multiplicand, multiplier, modulus));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_exp(
    frame: &mut Frame,
    instr: &Instruction,
    analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let base = frame.stack.pop_unchecked();
    let exponent = frame.stack.pop_unchecked();

    charge_gas_corrected(frame, instr, gas::exp_dynamic_cost(exponent, analysis.exp_byte_gas())?)?;

    frame.stack.push_unchecked(base.overflowing_pow(exponent).0);
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_signextend(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let byte_size_minus_one = frame.stack.pop_unchecked();
    let value_to_extend = frame.stack.pop_unchecked();

    if byte_size_minus_one > Word::from(31u64) {
        frame.stack.push_unchecked(value_to_extend);
        return Ok(StepOutcome::Continue);
    }

    let k = byte_size_minus_one.low_u32();
    let sign_bit_index = k.saturating_mul(8).saturating_add(7);
    let sign_bit = (value_to_extend >> sign_bit_index) & Word::one();
    let mask = (Word::one() << sign_bit_index)
        .checked_sub(Word::one())
        .unwrap_or_default();

    let result = if sign_bit.is_zero() {
        value_to_extend & mask
    } else {
        value_to_extend | !mask
    };
    frame.stack.push_unchecked(result);
    Ok(StepOutcome::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_support::MockHost;
    use crate::word::word_from_be_bytes;

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
    fn add_wraps_mod_2_256() {
        let mut frame = frame_with(&[Word::MAX, Word::one()]);
        op_add(&mut frame, &Instruction::new(op_add, Default::default()), &analysis(), &mut MockHost::default()).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), Word::zero());
    }

    #[test]
    fn div_by_zero_is_zero() {
        let mut frame = frame_with(&[Word::from(7u64), Word::zero()]);
        op_div(&mut frame, &Instruction::new(op_div, Default::default()), &analysis(), &mut MockHost::default()).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), Word::zero());
    }

    #[test]
    fn sdiv_min_i256_by_minus_one_returns_dividend() {
        let min_i256 = Word::one() << 255;
        let minus_one = Word::MAX;
        let mut frame = frame_with(&[minus_one, min_i256]);
        op_sdiv(&mut frame, &Instruction::new(op_sdiv, Default::default()), &analysis(), &mut MockHost::default()).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), min_i256);
    }

    #[test]
    fn smod_sign_follows_dividend() {
        // -7 % 3 == -1 in EVM SMOD semantics.
        let neg7 = negate(Word::from(7u64));
        let mut frame = frame_with(&[Word::from(3u64), neg7]);
        op_smod(&mut frame, &Instruction::new(op_smod, Default::default()), &analysis(), &mut MockHost::default()).unwrap();
        assert!(is_negative(frame.stack.peek_unchecked(0)));
        assert_eq!(frame.stack.peek_unchecked(0), negate(Word::one()));
    }

    #[test]
    fn addmod_wraps_past_2_256() {
        // (MAX + 2) mod 3 == 1, since MAX mod 3 == 2 and (2 + 2) mod 3 == 1.
        let mut frame = frame_with(&[Word::from(3u64), Word::from(2u64), Word::MAX]);
        op_addmod(&mut frame, &Instruction::new(op_addmod, Default::default()), &analysis(), &mut MockHost::default()).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), Word::one());
    }

    #[test]
    fn mulmod_matches_plain_arithmetic_when_no_overflow() {
        let mut frame = frame_with(&[Word::from(5u64), Word::from(7u64), Word::from(13u64)]);
        op_mulmod(&mut frame, &Instruction::new(op_mulmod, Default::default()), &analysis(), &mut MockHost::default()).unwrap();
        // (13 * 7) % 5 == 1
        assert_eq!(frame.stack.peek_unchecked(0), Word::one());
    }

    #[test]
    fn addmod_with_zero_modulus_is_zero() {
        let mut frame = frame_with(&[Word::zero(), Word::one(), Word::one()]);
        op_addmod(&mut frame, &Instruction::new(op_addmod, Default::default()), &analysis(), &mut MockHost::default()).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), Word::zero());
    }

    #[test]
    fn signextend_k_at_least_31_is_identity() {
        let value = word_from_be_bytes([0xAB; 32]);
        let mut frame = frame_with(&[value, Word::from(31u64)]);
        op_signextend(&mut frame, &Instruction::new(op_signextend, Default::default()), &analysis(), &mut MockHost::default()).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), value);
    }

    #[test]
    fn exp_charges_byte_length_dynamic_gas() {
        let mut frame = frame_with(&[Word::from(256u64), Word::from(2u64)]);
        let before = frame.gas_remaining;
        op_exp(&mut frame, &Instruction::new(op_exp, Default::default()), &analysis(), &mut MockHost::default()).unwrap();
        assert_eq!(before - frame.gas_remaining, 100); // byte_length(256) = 2, 50*2
    }
}
