//! The mutable, per-invocation execution context (§3 "Frame").

use bytes::Bytes;

use crate::config::Config;
use crate::memory::Memory;
use crate::stack::Stack;
use crate::word::Address;

/// Per-call mutable state. Owns the stack and memory buffers; destroyed
/// when the call returns. A subcall gets a fresh `Frame` of its own — see
/// `host::Host::call`.
#[derive(Debug)]
pub struct Frame {
    pub stack: Stack,
    pub memory: Memory,

    /// Remaining gas, signed so a handler can observe it going negative
    /// before converting that into an `OutOfGas` error (§3).
    pub gas_remaining: i64,

    /// Gas precharged for the block currently executing, recorded by the
    /// `BEGINBLOCK` handler. Dynamic-gas handlers and `GAS` use this for
    /// the gas-correction protocol described in §4.2/§4.4.
    pub block_precharge: u64,

    pub depth: usize,
    pub is_static: bool,

    pub address: Address,
    pub caller: Address,
    pub value: crate::word::Word,
    pub input: Bytes,

    /// Populated after any subcall; cleared to empty when a new subcall
    /// begins.
    pub return_data: Bytes,

    /// Set by RETURN/REVERT.
    pub output: Bytes,
}

impl Frame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &Config,
        address: Address,
        caller: Address,
        value: crate::word::Word,
        input: Bytes,
        gas_limit: u64,
        depth: usize,
        is_static: bool,
    ) -> Self {
        Self {
            stack: Stack::new(usize::from(config.stack_limit)),
            memory: Memory::new(),
            gas_remaining: i64::try_from(gas_limit).unwrap_or(i64::MAX),
            block_precharge: 0,
            depth,
            is_static,
            address,
            caller,
            value,
            input,
            return_data: Bytes::new(),
            output: Bytes::new(),
        }
    }

    /// Current remaining gas as an unsigned value; only meaningful when
    /// `gas_remaining >= 0` (callers check that before converting).
    #[inline]
    pub fn gas_left_u64(&self) -> u64 {
        u64::try_from(self.gas_remaining.max(0)).unwrap_or(0)
    }
}
