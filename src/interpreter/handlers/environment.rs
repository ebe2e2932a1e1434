//! Environmental and Block Information Operations (§4.5, §6): ADDRESS,
//! BALANCE, ORIGIN, CALLER, CALLVALUE, CALLDATALOAD, CALLDATASIZE,
//! CALLDATACOPY, CODESIZE, CODECOPY, GASPRICE, EXTCODESIZE, EXTCODECOPY,
//! RETURNDATASIZE, RETURNDATACOPY, EXTCODEHASH, BLOCKHASH, COINBASE,
//! TIMESTAMP, NUMBER, PREVRANDAO, GASLIMIT, CHAINID, SELFBALANCE, BASEFEE,
//! BLOBHASH, BLOBBASEFEE.
//!
//! Grounded on the teacher crate's `opcode_handlers/environment.rs`: same
//! shape for the *CODECOPY/*COPY family (bounds-check then zero-pad), same
//! cold/warm surcharge placement on BALANCE/EXTCODESIZE/EXTCODECOPY/
//! EXTCODEHASH, adapted to this crate's `Host` trait (`access_address`/
//! `code_of`/`balance_of` in place of the teacher's `substate`/`db`) and
//! `Frame`'s plain owned buffers in place of the teacher's `CallFrame`.
//! Deliberately dropped: the teacher's EIP-7928 BAL touched-address
//! recording and EIP-7702 delegation-designation copy marker — neither has
//! a counterpart here (out of scope).

use bytes::Bytes;

use crate::analysis::{Analysis, Instruction, StepOutcome};
use crate::errors::{ExceptionalHalt, VMError};
use crate::frame::Frame;
use crate::gas;
use crate::host::Host;
use crate::interpreter::{charge_gas, charge_memory_expansion};
use crate::memory::calculate_memory_size;
use crate::word::{address_to_word, word_to_address, word_to_usize, Word};

pub(crate) fn op_address(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(address_to_word(frame.address));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_balance(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let address = word_to_address(frame.stack.pop_unchecked());
    let status = host.access_address(address);
    charge_gas(frame, gas::address_access_surcharge(status))?;
    frame.stack.push_unchecked(host.balance_of(address));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_origin(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(address_to_word(host.tx_origin()));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_caller(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(address_to_word(frame.caller));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_callvalue(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(frame.value);
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_calldataload(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let offset = frame.stack.pop_unchecked();
    let mut data = [0u8; 32];
    if let Some(offset) = word_to_usize(offset) {
        if offset < frame.input.len() {
            let available = frame.input.len().saturating_sub(offset);
            let copy_len = available.min(32);
            let end = offset.saturating_add(copy_len);
            #[allow(clippy::indexing_slicing)]
            data[..copy_len].copy_from_slice(&frame.input[offset..end]);
        }
    }
    frame.stack.push_unchecked(Word::from_big_endian(&data));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_calldatasize(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let len = u64::try_from(frame.input.len()).unwrap_or(u64::MAX);
    frame.stack.push_unchecked(Word::from(len));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_calldatacopy(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let dest_offset = frame.stack.pop_unchecked();
    let data_offset = frame.stack.pop_unchecked();
    let size = frame.stack.pop_unchecked();
    copy_into_memory(frame, dest_offset, data_offset, size, |frame, data_offset, copy_len, end| {
        #[allow(clippy::indexing_slicing)]
        frame.input[data_offset..end.min(frame.input.len())].to_vec().into_iter().take(copy_len).collect()
    })
}

/// Shared bounds-check-then-zero-pad shape for CALLDATACOPY/CODECOPY/
/// RETURNDATACOPY: charge the per-word copy cost and memory expansion, then
/// hand the caller a closure to actually slice its source buffer (each has a
/// different one: `frame.input`, `analysis.code()`, `frame.return_data`).
fn copy_into_memory(
    frame: &mut Frame,
    dest_offset: Word,
    src_offset: Word,
    size: Word,
    read_source: impl FnOnce(&mut Frame, usize, usize, usize) -> Vec<u8>,
) -> Result<StepOutcome, VMError> {
    let size = word_to_usize(size).ok_or(ExceptionalHalt::OutOfGas)?;
    let dest_offset = word_to_usize(dest_offset).ok_or(ExceptionalHalt::OutOfGas)?;
    let src_offset = word_to_usize(src_offset).unwrap_or(usize::MAX);

    charge_gas(frame, gas::copy_dynamic_cost(size)?)?;
    let new_size = calculate_memory_size(dest_offset, size)?;
    charge_memory_expansion(frame, new_size)?;

    if size == 0 {
        return Ok(StepOutcome::Continue);
    }

    let end = src_offset.saturating_add(size);
    let slice = read_source(frame, src_offset, size, end);
    frame.memory.store_data_zero_padded(dest_offset, &slice, size)?;
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_codesize(
    frame: &mut Frame,
    _instr: &Instruction,
    analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let len = u64::try_from(analysis.code().len()).unwrap_or(u64::MAX);
    frame.stack.push_unchecked(Word::from(len));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_codecopy(
    frame: &mut Frame,
    _instr: &Instruction,
    analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let dest_offset = frame.stack.pop_unchecked();
    let code_offset = frame.stack.pop_unchecked();
    let size = frame.stack.pop_unchecked();
    let code = analysis.code().to_vec();
    copy_into_memory(frame, dest_offset, code_offset, size, move |_frame, offset, copy_len, _end| {
        if offset >= code.len() {
            return Vec::new();
        }
        let available = code.len().saturating_sub(offset);
        let take = copy_len.min(available);
        #[allow(clippy::indexing_slicing)]
        code[offset..offset.saturating_add(take)].to_vec()
    })
}

pub(crate) fn op_gasprice(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(host.tx_gasprice());
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_extcodesize(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let address = word_to_address(frame.stack.pop_unchecked());
    let status = host.access_address(address);
    charge_gas(frame, gas::address_access_surcharge(status))?;
    frame.stack.push_unchecked(Word::from(host.code_size_of(address)));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_extcodecopy(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let address = word_to_address(frame.stack.pop_unchecked());
    let dest_offset = frame.stack.pop_unchecked();
    let code_offset = frame.stack.pop_unchecked();
    let size = frame.stack.pop_unchecked();

    let status = host.access_address(address);
    charge_gas(frame, gas::address_access_surcharge(status))?;
    let code = host.code_of(address);
    copy_into_memory(frame, dest_offset, code_offset, size, move |_frame, offset, copy_len, _end| {
        if offset >= code.len() {
            return Vec::new();
        }
        let available = code.len().saturating_sub(offset);
        let take = copy_len.min(available);
        #[allow(clippy::indexing_slicing)]
        code[offset..offset.saturating_add(take)].to_vec()
    })
}

pub(crate) fn op_returndatasize(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let len = u64::try_from(frame.return_data.len()).unwrap_or(u64::MAX);
    frame.stack.push_unchecked(Word::from(len));
    Ok(StepOutcome::Continue)
}

/// Unlike CALLDATACOPY/CODECOPY, a range extending past the end of the
/// return data buffer is itself an exceptional halt (§4.5) rather than
/// something silently zero-padded.
pub(crate) fn op_returndatacopy(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    _host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let dest_offset = frame.stack.pop_unchecked();
    let returndata_offset = frame.stack.pop_unchecked();
    let size = frame.stack.pop_unchecked();

    let size = word_to_usize(size).ok_or(ExceptionalHalt::ReturnDataOutOfBounds)?;
    let returndata_offset =
        word_to_usize(returndata_offset).ok_or(ExceptionalHalt::ReturnDataOutOfBounds)?;
    let end = returndata_offset
        .checked_add(size)
        .ok_or(ExceptionalHalt::ReturnDataOutOfBounds)?;
    if end > frame.return_data.len() {
        return Err(ExceptionalHalt::ReturnDataOutOfBounds.into());
    }

    let dest_offset = word_to_usize(dest_offset).ok_or(ExceptionalHalt::OutOfGas)?;
    charge_gas(frame, gas::copy_dynamic_cost(size)?)?;
    let new_size = calculate_memory_size(dest_offset, size)?;
    charge_memory_expansion(frame, new_size)?;

    if size == 0 {
        return Ok(StepOutcome::Continue);
    }
    #[allow(clippy::indexing_slicing)]
    let slice = Bytes::copy_from_slice(&frame.return_data[returndata_offset..end]);
    frame.memory.store_data(dest_offset, &slice)?;
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_extcodehash(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let address = word_to_address(frame.stack.pop_unchecked());
    let status = host.access_address(address);
    charge_gas(frame, gas::address_access_surcharge(status))?;

    if !host.exists(address) {
        frame.stack.push_unchecked(Word::zero());
        return Ok(StepOutcome::Continue);
    }
    let hash = host.code_hash_of(address);
    frame.stack.push_unchecked(Word::from_big_endian(hash.as_bytes()));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_blockhash(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let requested = frame.stack.pop_unchecked();
    let hash = match word_to_usize(requested) {
        Some(number) => host.block_hash(u64::try_from(number).unwrap_or(u64::MAX)),
        None => crate::word::Hash::zero(),
    };
    frame.stack.push_unchecked(Word::from_big_endian(hash.as_bytes()));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_coinbase(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(address_to_word(host.block_coinbase()));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_timestamp(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(Word::from(host.block_timestamp()));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_number(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(Word::from(host.block_number()));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_prevrandao(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(host.block_prevrandao());
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_gaslimit(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(Word::from(host.block_gaslimit()));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_chainid(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(Word::from(host.block_chainid()));
    Ok(StepOutcome::Continue)
}

/// Never gains a cold-access surcharge (EIP-1884): a contract's own balance
/// is always warm.
pub(crate) fn op_selfbalance(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(host.balance_of(frame.address));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_basefee(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(host.block_basefee());
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_blobhash(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let index = frame.stack.pop_unchecked();
    let hash = word_to_usize(index)
        .and_then(|i| host.blob_hashes().get(i).copied())
        .unwrap_or_else(crate::word::Hash::zero);
    frame.stack.push_unchecked(Word::from_big_endian(hash.as_bytes()));
    Ok(StepOutcome::Continue)
}

pub(crate) fn op_blobbasefee(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    frame.stack.push_unchecked(host.blob_basefee());
    Ok(StepOutcome::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_support::MockHost;
    use crate::word::Address;

    fn frame_with_input(input: &[u8]) -> Frame {
        let config = Config::default();
        Frame::new(
            &config,
            Address::zero(),
            Address::from_low_u64_be(7),
            Word::zero(),
            Bytes::copy_from_slice(input),
            1_000_000,
            0,
            false,
        )
    }

    fn analysis(code: &[u8]) -> Analysis {
        Analysis::build(code, &Config::default()).unwrap()
    }

    #[test]
    fn calldataload_zero_pads_past_end() {
        let mut frame = frame_with_input(&[0xAA, 0xBB]);
        frame.stack.push_unchecked(Word::zero());
        let instr = Instruction::new(op_calldataload, crate::analysis::InstrArg::NONE);
        op_calldataload(&mut frame, &instr, &analysis(&[]), &mut MockHost::default()).unwrap();
        let top = frame.stack.peek_unchecked(0);
        assert_eq!(top, Word::from(0xAABBu64) << 240);
    }

    #[test]
    fn calldatasize_reports_input_length() {
        let mut frame = frame_with_input(&[1, 2, 3]);
        let instr = Instruction::new(op_calldatasize, crate::analysis::InstrArg::NONE);
        op_calldatasize(&mut frame, &instr, &analysis(&[]), &mut MockHost::default()).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), Word::from(3u64));
    }

    #[test]
    fn codesize_reports_original_bytecode_length() {
        let code = [0x60, 0x01, 0x00];
        let mut frame = frame_with_input(&[]);
        let instr = Instruction::new(op_codesize, crate::analysis::InstrArg::NONE);
        op_codesize(&mut frame, &instr, &analysis(&code), &mut MockHost::default()).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), Word::from(3u64));
    }

    #[test]
    fn returndatacopy_out_of_bounds_is_exceptional_halt() {
        let mut frame = frame_with_input(&[]);
        frame.return_data = Bytes::from_static(&[1, 2, 3]);
        frame.stack.push_unchecked(Word::from(10u64)); // size
        frame.stack.push_unchecked(Word::zero()); // returndata_offset
        frame.stack.push_unchecked(Word::zero()); // dest_offset
        let instr = Instruction::new(op_returndatacopy, crate::analysis::InstrArg::NONE);
        let err =
            op_returndatacopy(&mut frame, &instr, &analysis(&[]), &mut MockHost::default()).unwrap_err();
        assert_eq!(err, VMError::from(ExceptionalHalt::ReturnDataOutOfBounds));
    }

    #[test]
    fn balance_charges_cold_surcharge_once() {
        let mut frame = frame_with_input(&[]);
        let mut host = MockHost::default();
        let target = Address::from_low_u64_be(99);
        host.balances.insert(target, Word::from(5u64));

        frame.stack.push_unchecked(address_to_word(target));
        let instr = Instruction::new(op_balance, crate::analysis::InstrArg::NONE);
        let before = frame.gas_remaining;
        op_balance(&mut frame, &instr, &analysis(&[]), &mut host).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), Word::from(5u64));
        assert_eq!(before - frame.gas_remaining, gas::COLD_ACCOUNT_ACCESS_SURCHARGE as i64);
    }
}
