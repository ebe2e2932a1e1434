//! Runtime-immutable configuration.
//!
//! The teacher crate selects hardfork behavior through layered
//! `const fn build_opcode_table_*` builders chosen at `VM::new` time. Per
//! the REDESIGN FLAGS in SPEC_FULL.md this becomes a single `Config` value,
//! constructed once and handed by reference to `Analysis::build` and
//! `Frame::new`; nothing here is mutated after construction.

use crate::constants::{
    BLOCK_GAS_COST_CAP, MAX_CODE_SIZE, MAX_INITCODE_SIZE, STACK_LIMIT,
};

/// Hardfork selector used at `Analysis::build` time to pick gas-schedule
/// variants that are fixed properties of the bytecode's target ruleset
/// (e.g. EXP's per-byte cost, SELFBALANCE's availability). Gas-schedule
/// details that depend on host/chain state (basefee presence, blob
/// fields) stay on the `Host` trait instead — see `crate::host::Host`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum Fork {
    Frontier,
    Byzantium,
    Constantinople,
    Istanbul,
    Berlin,
    London,
    Paris,
    Shanghai,
    Cancun,
    Osaka,
}

impl Fork {
    /// Most recent fork this engine understands; used as the default.
    pub const LATEST: Fork = Fork::Osaka;

    #[inline]
    pub const fn at_least(self, other: Fork) -> bool {
        (self as u8) >= (other as u8)
    }

    /// Pre-Spurious-Dragon EXP surcharge was 10 gas/byte; Spurious Dragon
    /// onward it's 50 gas/byte. Frontier/Byzantium-era forks predate EIP-160;
    /// treat everything this engine models (Byzantium+) as post-EIP-160
    /// except `Frontier` itself, kept only as the enum's zero value.
    #[inline]
    pub const fn exp_byte_gas(self) -> u32 {
        match self {
            Fork::Frontier => 10,
            _ => 50,
        }
    }
}

impl Default for Fork {
    fn default() -> Self {
        Fork::LATEST
    }
}

/// Runtime-immutable knobs governing analysis and execution. Cheap to
/// clone; intended to be constructed once per process (or per chain
/// configuration) and shared by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub fork: Fork,
    pub stack_limit: u16,
    pub max_code_size: usize,
    pub max_initcode_size: usize,
    /// O-1: cap on a single block's precharged base-gas sum before the
    /// builder splits the block. Representable range is `u32`; this field
    /// lets tests exercise smaller caps without allocating multi-gigagas
    /// bytecode.
    pub block_gas_cost_cap: u32,
}

impl Config {
    pub fn new(fork: Fork) -> Self {
        Self {
            fork,
            stack_limit: STACK_LIMIT as u16,
            max_code_size: MAX_CODE_SIZE,
            max_initcode_size: MAX_INITCODE_SIZE,
            block_gas_cost_cap: BLOCK_GAS_COST_CAP,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Fork::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_ordering_is_chronological() {
        assert!(Fork::Cancun.at_least(Fork::Shanghai));
        assert!(!Fork::Shanghai.at_least(Fork::Cancun));
    }

    #[test]
    fn exp_byte_gas_matches_spurious_dragon_schedule() {
        assert_eq!(Fork::Osaka.exp_byte_gas(), 50);
        assert_eq!(Fork::Frontier.exp_byte_gas(), 10);
    }
}
