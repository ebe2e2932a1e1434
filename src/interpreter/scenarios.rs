//! End-to-end scenario tests: literal bytecode buffers run through
//! `Analysis::build` and `interpreter::run` start to finish, checked
//! against the worked examples (S1-S6).
//!
//! Unlike the per-handler unit tests scattered through `handlers/*.rs`
//! (which splice a single `Instruction` into a manually-built `Analysis`
//! to isolate one opcode), these drive the whole pipeline the way a real
//! embedder would: raw bytes in, `Outcome` out.

#![cfg(test)]

use bytes::Bytes;

use crate::analysis::Analysis;
use crate::config::Config;
use crate::errors::ExceptionalHalt;
use crate::frame::Frame;
use crate::outcome::Outcome;
use crate::test_support::NullHost;
use crate::word::{Address, Word};

fn run_code(code: &[u8], gas_limit: u64) -> Outcome {
    let config = Config::default();
    let analysis = Analysis::build(code, &config).expect("analysis should succeed");
    let mut frame = Frame::new(
        &config,
        Address::zero(),
        Address::zero(),
        Word::zero(),
        Bytes::new(),
        gas_limit,
        0,
        false,
    );
    let mut host = NullHost;
    crate::interpreter::run(&mut frame, &analysis, &mut host)
}

fn word_from_u64(v: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&v.to_be_bytes());
    out
}

#[test]
fn s1_arithmetic() {
    // PUSH1 5, PUSH1 3, ADD, PUSH1 2, MUL, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
    let code = hex::decode("600560030160020260005260206000f3").unwrap();
    let outcome = run_code(&code, 10000);
    match outcome {
        Outcome::Success { output, gas_left } => {
            assert_eq!(&output[..], &word_from_u64(16)[..]);
            assert_eq!(gas_left, 9965);
        }
        other => panic!("expected Success, got {other:?}"),
    }
}

#[test]
fn s2_conditional_jump_taken() {
    // PUSH1 1, PUSH1 7, JUMPI, INVALID, STOP, JUMPDEST, PUSH1 0x42, PUSH1 0,
    // MSTORE, PUSH1 32, PUSH1 0, RETURN
    let code = hex::decode("6001600757fe005b604260005260206000f3").unwrap();
    let outcome = run_code(&code, 10000);
    match outcome {
        Outcome::Success { output, .. } => {
            assert_eq!(&output[..], &word_from_u64(0x42)[..]);
        }
        other => panic!("expected Success, got {other:?}"),
    }
}

#[test]
fn s3_invalid_jump() {
    // PUSH1 5, JUMP, STOP, PUSH1 0x42 -- PC 5 is not a JUMPDEST.
    let code = hex::decode("600556006042").unwrap();
    let outcome = run_code(&code, 10000);
    match outcome {
        Outcome::Invalid { error, gas_left } => {
            assert_eq!(gas_left, 0);
            assert_eq!(error, ExceptionalHalt::InvalidJump);
        }
        other => panic!("expected Invalid(InvalidJump), got {other:?}"),
    }
}

#[test]
fn s4_out_of_gas_at_block_entry() {
    // PUSH1 1, PUSH1 2, ADD, PUSH1 3, MUL, STOP -- block precharge 17 > gas=5.
    let code = hex::decode("600160020160030200").unwrap();
    let outcome = run_code(&code, 5);
    match outcome {
        Outcome::Invalid { error, gas_left } => {
            assert_eq!(gas_left, 0);
            assert_eq!(error, ExceptionalHalt::OutOfGas);
        }
        other => panic!("expected Invalid(OutOfGas), got {other:?}"),
    }
}

#[test]
fn s5_revert_preserves_gas() {
    // PUSH1 4, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, REVERT
    let code = hex::decode("600460005260206000fd").unwrap();
    let outcome = run_code(&code, 10000);
    match outcome {
        Outcome::Revert { output, gas_left } => {
            assert_eq!(&output[..], &word_from_u64(4)[..]);
            assert_eq!(gas_left, 9982);
        }
        other => panic!("expected Revert, got {other:?}"),
    }
}

#[test]
fn s6_static_jump_resolution() {
    // PUSH1 3, JUMP, INVALID, JUMPDEST, STOP -- INVALID at PC 3 is dead code.
    let code = hex::decode("600356fe5b00").unwrap();
    let outcome = run_code(&code, 10000);
    match outcome {
        Outcome::Success { output, gas_left } => {
            assert!(output.is_empty());
            assert_eq!(gas_left, 9988);
        }
        other => panic!("expected Success, got {other:?}"),
    }
}

#[test]
fn empty_bytecode_halts_immediately_with_full_gas() {
    let outcome = run_code(&[], 21000);
    match outcome {
        Outcome::Success { output, gas_left } => {
            assert!(output.is_empty());
            assert_eq!(gas_left, 21000);
        }
        other => panic!("expected Success, got {other:?}"),
    }
}

#[test]
fn dup_then_pop_round_trips_stack_depth() {
    // PUSH1 7, DUP1, POP, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
    let code = hex::decode("6007805060005260206000f3").unwrap();
    let outcome = run_code(&code, 10000);
    match outcome {
        Outcome::Success { output, .. } => {
            assert_eq!(&output[..], &word_from_u64(7)[..]);
        }
        other => panic!("expected Success, got {other:?}"),
    }
}
