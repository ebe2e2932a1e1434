//! System Operations (§4.4, §4.5, §6, §9 SUPPLEMENTED): LOG0..4, CREATE,
//! CALL, CALLCODE, DELEGATECALL, CREATE2, STATICCALL, SELFDESTRUCT.
//!
//! Grounded on the teacher crate's `opcode_handlers/system.rs` shape
//! (pop args, charge cold-access/value/new-account surcharges, apply the
//! EIP-150 63/64 forwarding rule, then hand off to a shared "generic call"
//! path), adapted to this crate's `Host::call` seam in place of the
//! teacher's `VM::generic_call`/`generic_create` — the teacher recurses
//! into its own interpreter for the child frame; here the Host owns that
//! recursion entirely (§5: "the handler synchronously hands control to the
//! Host, which runs the child's interpreter to completion").

use bytes::Bytes;

use crate::analysis::{Analysis, Instruction, StepOutcome};
use crate::errors::{ExceptionalHalt, VMError};
use crate::frame::Frame;
use crate::gas;
use crate::host::{CallKind, CallParams, Host};
use crate::interpreter::{
    charge_gas, charge_gas_corrected_by, charge_memory_expansion, charge_memory_expansion_corrected_by,
    dispatch_call, dispatch_create, true_remaining_gas,
};
use crate::memory::calculate_memory_size;
use crate::outcome::Outcome;
use crate::word::{word_to_address, word_to_usize, Address, Word};

/// Common stack layout shared by all four CALL-family opcodes, differing
/// only in whether a `value` operand is present (CALL/CALLCODE have one,
/// DELEGATECALL/STATICCALL don't).
struct CallArgs {
    gas: Word,
    target: Address,
    value: Word,
    args_offset: usize,
    args_size: usize,
    ret_offset: usize,
    ret_size: usize,
}

fn pop_call_args(frame: &mut Frame, has_value: bool) -> Result<CallArgs, VMError> {
    let gas = frame.stack.pop_unchecked();
    let target = word_to_address(frame.stack.pop_unchecked());
    let value = if has_value { frame.stack.pop_unchecked() } else { Word::zero() };
    let args_offset_w = frame.stack.pop_unchecked();
    let args_size_w = frame.stack.pop_unchecked();
    let ret_offset_w = frame.stack.pop_unchecked();
    let ret_size_w = frame.stack.pop_unchecked();

    let args_size = word_to_usize(args_size_w).ok_or(ExceptionalHalt::OutOfGas)?;
    let args_offset = if args_size == 0 {
        0
    } else {
        word_to_usize(args_offset_w).ok_or(ExceptionalHalt::OutOfGas)?
    };
    let ret_size = word_to_usize(ret_size_w).ok_or(ExceptionalHalt::OutOfGas)?;
    let ret_offset = if ret_size == 0 {
        0
    } else {
        word_to_usize(ret_offset_w).ok_or(ExceptionalHalt::OutOfGas)?
    };

    Ok(CallArgs {
        gas,
        target,
        value,
        args_offset,
        args_size,
        ret_offset,
        ret_size,
    })
}

/// Memory is expanded once to cover whichever of the args/return ranges
/// reaches further, matching the teacher's `get_call_gas_params` which
/// resizes memory a single time rather than once per range.
fn charge_call_memory(frame: &mut Frame, args: &CallArgs) -> Result<(), VMError> {
    let args_mem = calculate_memory_size(args.args_offset, args.args_size)?;
    let ret_mem = calculate_memory_size(args.ret_offset, args.ret_size)?;
    charge_memory_expansion(frame, args_mem.max(ret_mem))
}

/// Shared CALL/CALLCODE/DELEGATECALL/STATICCALL path: charge the
/// cold-access surcharge and (for value-transferring kinds) the value and
/// new-account surcharges, apply the EIP-150 63/64 forwarding cap to
/// whatever gas remains after those charges, add the value stipend on top
/// for the callee without charging it to the caller, then dispatch.
#[allow(clippy::too_many_arguments)]
fn generic_call(
    frame: &mut Frame,
    instr: &Instruction,
    host: &mut dyn Host,
    kind: CallKind,
    args: CallArgs,
    is_static: bool,
) -> Result<StepOutcome, VMError> {
    charge_call_memory(frame, &args)?;

    let status = host.access_address(args.target);
    charge_gas(frame, gas::address_access_surcharge(status))?;

    let transfers_value = !args.value.is_zero();
    if frame.is_static && transfers_value {
        return Err(ExceptionalHalt::WriteProtection.into());
    }
    if transfers_value {
        charge_gas(frame, gas::CALL_VALUE_TRANSFER_COST)?;
        if !host.exists(args.target) {
            charge_gas(frame, gas::NEW_ACCOUNT_SURCHARGE)?;
        }
    }

    let gas_remaining = true_remaining_gas(frame, instr);
    let forwarded = gas::capped_call_gas(args.gas, gas_remaining);
    charge_gas(frame, forwarded)?;

    let input = frame.memory.load_range(args.args_offset, args.args_size)?;
    let stipend = if transfers_value {
        crate::constants::CALL_VALUE_STIPEND
    } else {
        0
    };

    let params = CallParams {
        kind,
        caller: frame.address,
        target: args.target,
        value: args.value,
        input,
        gas_limit: forwarded.saturating_add(stipend),
        is_static,
        salt: None,
    };
    dispatch_call(frame, host, params, args.ret_offset, args.ret_size)
}

pub(crate) fn op_call(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let args = pop_call_args(frame, true)?;
    let is_static = frame.is_static;
    generic_call(frame, instr, host, CallKind::Call, args, is_static)
}

pub(crate) fn op_callcode(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let args = pop_call_args(frame, true)?;
    let is_static = frame.is_static;
    generic_call(frame, instr, host, CallKind::CallCode, args, is_static)
}

/// DELEGATECALL carries no value operand and always inherits the caller's
/// own `is_static`/value rather than the popped (absent) one — it cannot
/// itself transfer value, so the static write-protection check in
/// `generic_call` never trips for it.
pub(crate) fn op_delegatecall(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let args = pop_call_args(frame, false)?;
    let is_static = frame.is_static;
    generic_call(frame, instr, host, CallKind::DelegateCall, args, is_static)
}

pub(crate) fn op_staticcall(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    let args = pop_call_args(frame, false)?;
    generic_call(frame, instr, host, CallKind::StaticCall, args, true)
}

/// Shared CREATE/CREATE2 path: initcode-size gate (EIP-3860), dynamic
/// initcode cost (+ hashing cost for CREATE2's salted address derivation),
/// EIP-150 forwarding with no value stipend (CREATE never carries one).
fn generic_create(
    frame: &mut Frame,
    instr: &Instruction,
    analysis: &Analysis,
    host: &mut dyn Host,
    kind: CallKind,
    has_salt: bool,
) -> Result<StepOutcome, VMError> {
    if frame.is_static {
        return Err(ExceptionalHalt::WriteProtection.into());
    }

    let value = frame.stack.pop_unchecked();
    let offset_w = frame.stack.pop_unchecked();
    let size_w = frame.stack.pop_unchecked();
    // CREATE2's stack (top->bottom) is value, offset, size, salt — salt sits
    // just below size, so it's popped last, after size is already in hand.
    let salt = has_salt.then(|| frame.stack.pop_unchecked());

    let size = word_to_usize(size_w).ok_or(ExceptionalHalt::OutOfGas)?;
    if host.is_eip3860() && size > analysis.max_initcode_size() {
        return Err(ExceptionalHalt::MaxCodeSizeExceeded.into());
    }
    let offset = if size == 0 {
        0
    } else {
        word_to_usize(offset_w).ok_or(ExceptionalHalt::OutOfGas)?
    };

    charge_gas(frame, gas::create_initcode_dynamic_cost(size)?)?;
    if matches!(kind, CallKind::Create2) {
        charge_gas(frame, gas::keccak256_dynamic_cost(size)?)?;
    }

    let new_size = calculate_memory_size(offset, size)?;
    charge_memory_expansion(frame, new_size)?;
    let initcode = frame.memory.load_range(offset, size)?;

    let gas_remaining = true_remaining_gas(frame, instr);
    let forwarded = gas::max_forwardable_gas(gas_remaining);
    charge_gas(frame, forwarded)?;

    let params = CallParams {
        kind,
        caller: frame.address,
        target: Address::zero(),
        value,
        input: initcode,
        gas_limit: forwarded,
        is_static: frame.is_static,
        salt,
    };
    dispatch_create(frame, host, params)
}

pub(crate) fn op_create(
    frame: &mut Frame,
    instr: &Instruction,
    analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    generic_create(frame, instr, analysis, host, CallKind::Create, false)
}

pub(crate) fn op_create2(
    frame: &mut Frame,
    instr: &Instruction,
    analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    generic_create(frame, instr, analysis, host, CallKind::Create2, true)
}

/// LOG0..4: topic count and the mid-block gas correction (§4.2) are packed
/// together into `InstrArg::log_info` — LOG's dynamic cost depends on its
/// own popped operands, but still needs the corrected remaining gas to avoid
/// a spurious `OutOfGas` against the block's lump-sum precharge.
pub(crate) fn op_log(
    frame: &mut Frame,
    instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    if frame.is_static {
        return Err(ExceptionalHalt::WriteProtection.into());
    }

    let offset_w = frame.stack.pop_unchecked();
    let size_w = frame.stack.pop_unchecked();
    let (topic_count, correction) = instr.arg.as_log_info();
    let mut topics = Vec::with_capacity(topic_count as usize);
    for _ in 0..topic_count {
        topics.push(frame.stack.pop_unchecked());
    }

    let size = word_to_usize(size_w).ok_or(ExceptionalHalt::OutOfGas)?;
    let offset = if size == 0 {
        0
    } else {
        word_to_usize(offset_w).ok_or(ExceptionalHalt::OutOfGas)?
    };

    charge_gas_corrected_by(frame, correction, gas::log_dynamic_cost(topic_count, size)?)?;
    let new_size = calculate_memory_size(offset, size)?;
    charge_memory_expansion_corrected_by(frame, correction, new_size)?;

    let data = frame.memory.load_range(offset, size)?;
    host.emit_log(frame.address, &topics, data);
    Ok(StepOutcome::Continue)
}

/// SELFDESTRUCT always terminates its block (§4.2 rule 2), so it never
/// needs the mid-block gas-correction protocol: nothing after it in the
/// same block has already been folded into `frame.gas_remaining`.
pub(crate) fn op_selfdestruct(
    frame: &mut Frame,
    _instr: &Instruction,
    _analysis: &Analysis,
    host: &mut dyn Host,
) -> Result<StepOutcome, VMError> {
    if frame.is_static {
        return Err(ExceptionalHalt::WriteProtection.into());
    }
    let beneficiary = word_to_address(frame.stack.pop_unchecked());

    let status = host.access_address(beneficiary);
    charge_gas(frame, gas::address_access_surcharge(status))?;

    let balance = host.balance_of(frame.address);
    if !balance.is_zero() && !host.exists(beneficiary) {
        charge_gas(frame, gas::NEW_ACCOUNT_SURCHARGE)?;
    }

    host.mark_selfdestruct(frame.address, beneficiary);
    Ok(StepOutcome::Halt(Outcome::Success {
        output: Bytes::new(),
        gas_left: frame.gas_left_u64(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::InstrArg;
    use crate::config::Config;
    use crate::host::CallOutcome;
    use crate::test_support::MockHost;

    fn frame_with(stack: &[Word], gas: i64) -> Frame {
        let config = Config::default();
        let mut frame = Frame::new(
            &config,
            Address::from_low_u64_be(1),
            Address::zero(),
            Word::zero(),
            Bytes::new(),
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
    fn log_emits_topics_in_stack_order() {
        // `frame_with`'s slice is pushed front-to-back, so the stack's top
        // (popped first: offset) is the slice's *last* entry.
        // pop order: offset, size, topic0, topic1 -> slice is the reverse.
        let mut frame = frame_with(
            &[
                Word::from(10u64), // topic1
                Word::from(20u64), // topic0
                Word::zero(),      // size
                Word::zero(),      // offset
            ],
            100_000,
        );
        let instr = Instruction::new(op_log, InstrArg::log_info(2, 0));
        let mut host = MockHost::default();
        op_log(&mut frame, &instr, &analysis(), &mut host).unwrap();
        assert_eq!(host.logs.len(), 1);
        assert_eq!(host.logs[0].1, vec![Word::from(20u64), Word::from(10u64)]);
    }

    #[test]
    fn log_under_static_context_is_write_protected() {
        let mut frame = frame_with(&[Word::zero(), Word::zero()], 100_000);
        frame.is_static = true;
        let instr = Instruction::new(op_log, InstrArg::log_info(0, 0));
        let err = op_log(&mut frame, &instr, &analysis(), &mut MockHost::default()).unwrap_err();
        assert_eq!(err, VMError::from(ExceptionalHalt::WriteProtection));
    }

    #[test]
    fn call_with_value_under_static_context_is_write_protected() {
        // pop order: gas, target, value, args_offset, args_size, ret_offset,
        // ret_size -> slice is pushed in the reverse of that.
        let mut frame = frame_with(
            &[
                Word::zero(),          // ret_size
                Word::zero(),          // ret_offset
                Word::zero(),          // args_size
                Word::zero(),          // args_offset
                Word::one(),           // value
                Word::from(7u64),      // target
                Word::from(50_000u64), // gas
            ],
            1_000_000,
        );
        frame.is_static = true;
        let instr = Instruction::new(op_call, InstrArg::raw(0));
        let err = op_call(&mut frame, &instr, &analysis(), &mut MockHost::default()).unwrap_err();
        assert_eq!(err, VMError::from(ExceptionalHalt::WriteProtection));
    }

    #[test]
    fn call_forwards_capped_gas_and_pushes_success() {
        let mut frame = frame_with(
            &[
                Word::zero(),             // ret_size
                Word::zero(),             // ret_offset
                Word::zero(),             // args_size
                Word::zero(),             // args_offset
                Word::zero(),             // value
                Word::from(7u64),         // target
                Word::from(1_000_000u64), // gas requested (will be capped)
            ],
            100_000,
        );
        let instr = Instruction::new(op_call, InstrArg::raw(0));
        let mut host = MockHost::default();
        host.next_call = Some(CallOutcome {
            success: true,
            gas_left: 10,
            output: Bytes::new(),
            created_address: None,
        });
        let outcome = op_call(&mut frame, &instr, &analysis(), &mut host).unwrap();
        assert!(matches!(outcome, StepOutcome::Continue));
        assert_eq!(frame.stack.peek_unchecked(0), Word::one());
    }

    #[test]
    fn create_under_static_context_is_write_protected() {
        let mut frame = frame_with(&[Word::zero(), Word::zero(), Word::zero()], 100_000);
        frame.is_static = true;
        let instr = Instruction::new(op_create, InstrArg::raw(0));
        let err = op_create(&mut frame, &instr, &analysis(), &mut MockHost::default()).unwrap_err();
        assert_eq!(err, VMError::from(ExceptionalHalt::WriteProtection));
    }

    #[test]
    fn create_pushes_created_address_on_success() {
        let mut frame = frame_with(
            &[
                Word::zero(), // size
                Word::zero(), // offset
                Word::zero(), // value
            ],
            1_000_000,
        );
        let instr = Instruction::new(op_create, InstrArg::raw(0));
        let mut host = MockHost::default();
        let created = Address::from_low_u64_be(42);
        host.next_call = Some(CallOutcome {
            success: true,
            gas_left: 0,
            output: Bytes::new(),
            created_address: Some(created),
        });
        op_create(&mut frame, &instr, &analysis(), &mut host).unwrap();
        assert_eq!(frame.stack.peek_unchecked(0), crate::word::address_to_word(created));
    }

    #[test]
    fn selfdestruct_halts_with_success() {
        let mut frame = frame_with(&[Word::from(9u64)], 100_000);
        let instr = Instruction::new(op_selfdestruct, InstrArg::NONE);
        let outcome = op_selfdestruct(&mut frame, &instr, &analysis(), &mut MockHost::default()).unwrap();
        assert!(matches!(outcome, StepOutcome::Halt(Outcome::Success { .. })));
    }
}
