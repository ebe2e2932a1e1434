//! # flowvm
//!
//! A two-phase bytecode analysis and block-validated interpreter core for a
//! 256-bit stack machine, in the shape of an Ethereum Virtual Machine
//! execution engine.
//!
//! ## Overview
//!
//! flowvm splits execution into two phases:
//!
//! - **Analysis** (§4.1-4.3): a single pass over a bytecode buffer scans for
//!   code/PUSH-data bytes and `JUMPDEST`s ([`bytecode`]), segments the code
//!   into basic blocks and computes each block's gas/stack requirements
//!   ([`analysis`]), and flattens the result into a dense linear stream of
//!   fixed-width Instruction Records plus a `push_values` side table and the
//!   PC<->instruction-index maps the `PC` opcode and dynamic jumps need.
//! - **Interpretation** (§4.4): the resulting [`analysis::Analysis`] is
//!   walked by [`interpreter::run`], which validates an entire block's stack
//!   depth and gas just once at its `BEGINBLOCK` record, then dispatches the
//!   block's body through unchecked handlers that trust that validation
//!   already happened.
//!
//! The persistent state backend, cryptography, and host environment this
//! engine needs are never implemented here — they are consumed through the
//! narrow [`host::Host`] trait, so an embedder brings its own.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         bytecode::scan                        │
//! │               (code/data bitmap, jumpdest offsets)            │
//! └───────────────────────────────┬────────────────────────────────┘
//!                                  ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         analysis::block                       │
//! │        (basic blocks, per-block gas/stack-req metadata)       │
//! └───────────────────────────────┬────────────────────────────────┘
//!                                  ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      analysis::Analysis                       │
//! │   (instructions, push_values, jumpdest_set, PC<->index maps)   │
//! └───────────────────────────────┬────────────────────────────────┘
//!                                  ▼
//! ┌─────────────────┐   ┌──────────────────┐   ┌───────────────────┐
//! │   frame::Frame   │   │ interpreter::run │   │   host::Host      │
//! │ (stack, memory,  │◄──┤  (dispatch loop, │──►│ (state, env,      │
//! │  gas, pc index)  │   │   gas/stack      │   │  hashing, calls)  │
//! │                  │   │   accounting)    │   │                   │
//! └─────────────────┘   └──────────────────┘   └───────────────────┘
//! ```
//!
//! ## Key components
//!
//! - [`bytecode::scan`]: C1, the code/PUSH-data scanner.
//! - [`analysis::Analysis`]: C2+C3, basic-block analysis and the flat
//!   Instruction Record stream it is compiled into.
//! - [`interpreter::run`]: C4, the block-validated dispatch loop.
//! - [`frame::Frame`]: per-call mutable execution state.
//! - [`host::Host`]: the trait an embedder implements for state, env,
//!   hashing, and subcalls.
//! - [`config::Config`] / [`config::Fork`]: the runtime-immutable knobs that
//!   replace the teacher's compile-time hardfork specialization.
//! - [`outcome::Outcome`]: the single value [`interpreter::run`] returns.
//! - [`tracer::Tracer`]: the narrow, semantics-preserving observability
//!   callback invoked around each dispatched instruction, with
//!   [`tracer::NoopTracer`] as the cost-free default.
//!
//! ## Usage
//!
//! ```ignore
//! use flowvm::{analysis::Analysis, config::Config, frame::Frame, interpreter, host::Host};
//!
//! let config = Config::default();
//! let analysis = Analysis::build(&bytecode, &config)?;
//! let mut frame = Frame::new(&config, address, caller, value, input, gas_limit, depth, is_static);
//! let outcome = interpreter::run(&mut frame, &analysis, &mut my_host);
//! ```
//!
//! ## Non-goals
//!
//! This crate does not define the persistence format of state, does not
//! specify RPC, and does not speak any wire protocol — it is a pure
//! in-process interpreter over a bounded bytecode buffer (§1).

pub mod analysis;
pub mod bytecode;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame;
pub mod gas;
pub mod host;
pub mod interpreter;
pub mod memory;
pub mod opcodes;
pub mod outcome;
pub mod stack;
pub mod tracer;
pub mod word;

#[cfg(test)]
mod test_support;
