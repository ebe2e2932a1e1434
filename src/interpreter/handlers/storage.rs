//! Storage Operations (§4.5, §6): SLOAD, SSTORE, TLOAD, TSTORE.
//!
//! Grounded on the teacher crate's `vm.rs` opcode dispatch table (SLOAD/
//! SSTORE aren't split into their own `opcode_handlers` file there; they're
//! dispatched inline) for the EIP-2929/2200/3529 shape (cold surcharge,
//! sentry gas, refund delta), adapted to this crate's `Host` trait in place
//! of the teacher's `VM`/`Db` pair: `access_storage`/`sload`/`sstore`/
//! `original_value`/`add_gas_refund` take the place of the teacher's
//! `get_storage_slot`/`increase_account_storage`.

use crate::analysis::{Analysis, Instruction, StepOutcome};
use crate::errors::{ExceptionalHalt, VMError};
use crate::frame::Frame;
use crate::gas;
use crate::host::Host;
use crate::interpreter::{charge_gas_corrected, true_remaining_gas};

pub(crate) fn op_sload(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let key = frame.stack.pop_unchecked();
    let status = host.access_storage(frame.address, key);
    charge_gas_corrected(frame, instr, gas::storage_access_surcharge(status))?;
    let value = host.sload(frame.address, key);
    frame.stack.push_unchecked(value);
    Ok(StepOutcome::Continue)
}

/// EIP-2200 sentry: refused outright once remaining gas drops to or below
/// `SSTORE_SENTRY_GAS`, independent of what this particular SSTORE would
/// otherwise cost — checked against the "true" gas (§4.2 correction), since
/// the block's base charge already came out of `frame.gas_remaining`.
pub(crate) fn op_sstore(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    if frame.is_static {
        return Err(ExceptionalHalt::WriteProtection.into());
    }
    if true_remaining_gas(frame, instr) <= gas::SSTORE_SENTRY_GAS {
        return Err(ExceptionalHalt::OutOfGas.into());
    }

    let key = frame.stack.pop_unchecked();
    let value = frame.stack.pop_unchecked();

    let status = host.access_storage(frame.address, key);
    let current = host.sload(frame.address, key);
    let original = host.original_value(frame.address, key);

    let cost = gas::sstore_cost(current, original, value)
        .checked_add(gas::storage_access_surcharge(status))
        .ok_or(ExceptionalHalt::OutOfGas)?;
    charge_gas_corrected(frame, instr, cost)?;

    host.sstore(frame.address, key, value);
    let refund = gas::sstore_refund_delta(current, original, value);
    if refund != 0 {
        host.add_gas_refund(refund);
    }
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_tload(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let key = frame.stack.pop_unchecked();
    let value = host.tload(frame.address, key);
    frame.stack.push_unchecked(value);
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_tstore(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    if frame.is_static {
        return Err(ExceptionalHalt::WriteProtection.into());
    }
    let key = frame.stack.pop_unchecked();
    let value = frame.stack.pop_unchecked();
    host.tstore(frame.address, key, value);
    Ok(StepOutcome::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::InstrArg;
    use crate::config::Config;
    use crate::test_support::MockHost;
    use crate::word::{Address, Word};

    fn frame_with(stack: &[Word], gas: i64) -> Frame {
        let config = Config::default();
        let mut frame = Frame::new(
            &config,
            Address::zero(),
            Address::zero(),
            Word::zero(),
            bytes::Bytes::new(),
            gas,
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
    fn sstore_static_context_is_write_protected() {
        let mut frame = frame_with(&[Word::one(), Word::one()], 100_000);
        frame.is_static = true;
        let instr = Instruction::new(op_sstore, InstrArg::raw(0));
        let err = op_sstore(&mut frame, &instr, &analysis(), &mut MockHost::default()).unwrap_err();
        assert_eq!(err, VMError::from(ExceptionalHalt::WriteProtection));
    }

    #[test]
    fn sstore_below_sentry_gas_fails() {
        let mut frame = frame_with(&[Word::one(), Word::one()], 2_000);
        let instr = Instruction::new(op_sstore, InstrArg::raw(0));
        let err = op_sstore(&mut frame, &instr, &analysis(), &mut MockHost::default()).unwrap_err();
        assert_eq!(err, VMError::from(ExceptionalHalt::OutOfGas));
    }

    #[test]
    fn sload_round_trips_through_sstore() {
        let mut host = MockHost::default();
        let mut frame = frame_with(&[Word::from(42u64), Word::from(7u64)], 100_000);
        let instr = Instruction::new(op_sstore, InstrArg::raw(0));
        op_sstore(&mut frame, &instr, &analysis(), &mut host).unwrap();

        frame.stack.push_unchecked(Word::from(7u64));
        let instr = Instruction::new(op_sload, InstrArg::NONE);
        op_sload(&mut frame, &instr, &analysis(), &mut host).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), Word::from(42u64));
    }

    #[test]
    fn tstore_tload_round_trip_bypasses_persistent_storage() {
        let mut host = MockHost::default();
        let mut frame = frame_with(&[Word::from(9u64), Word::from(3u64)], 100_000);
        let instr = Instruction::new(op_tstore, InstrArg::NONE);
        op_tstore(&mut frame, &instr, &analysis(), &mut host).unwrap();

        frame.stack.push_unchecked(Word::from(3u64));
        let instr = Instruction::new(op_tload, InstrArg::NONE);
        op_tload(&mut frame, &instr, &analysis(), &mut host).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), Word::from(9u64));
    }
}
