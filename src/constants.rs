//! Engine-wide numeric constants.
//!
//! Values that are configurable per deployment (stack capacity, code size
//! caps, gas cap per block) live on [`crate::config::Config`] instead; this
//! module holds the constants that are fixed properties of the word machine
//! itself.

/// Width of a stack word / memory word, in bytes.
pub const WORD_SIZE: usize = 32;
pub const WORD_SIZE_U64: u64 = WORD_SIZE as u64;

/// Default EIP-170 contract code size cap.
pub const MAX_CODE_SIZE: usize = 24576;

/// Default EIP-3860 initcode size cap (post-Shanghai).
pub const MAX_INITCODE_SIZE: usize = 2 * MAX_CODE_SIZE;

/// Default stack depth cap.
pub const STACK_LIMIT: usize = 1024;

/// Maximum call depth (CALL/CREATE family refuse to recurse further).
pub const MAX_CALL_DEPTH: usize = 1024;

/// Denominator in the quadratic memory expansion cost formula
/// `words^2 / MEMORY_EXPANSION_QUOTIENT + 3 * words`.
pub const MEMORY_EXPANSION_QUOTIENT: u64 = 512;

/// Stipend granted to a callee on a non-zero value transfer via CALL.
pub const CALL_VALUE_STIPEND: u64 = 2300;

/// EIP-150: only 63/64 of remaining gas may be forwarded to a subcall.
pub const CALL_GAS_RETENTION_DIVISOR: u64 = 64;

/// Ceiling on a single BEGINBLOCK's precharged gas sum (O-1): when a block's
/// running base-gas sum would exceed this, the block builder splits the
/// block at the offending instruction rather than saturating.
pub const BLOCK_GAS_COST_CAP: u32 = u32::MAX;

/// Sentinel stored in `pc_to_instruction_index` for PUSH-data bytes and for
/// instructions eliminated as dead code.
pub const NO_INSTRUCTION: u32 = u32::MAX;
