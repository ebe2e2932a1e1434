//! The 256-bit word type and the handful of free functions the handlers
//! need that `primitive_types::U256` doesn't provide directly (big-endian
//! byte conversion helpers, sign inspection, address truncation).
//!
//! `ethrex-common`'s `U256`/`H256`/`Address` are path-only workspace types
//! and aren't usable outside that monorepo; `primitive-types` is the
//! standard standalone substitute for the same role (see DESIGN.md).

use primitive_types::{H160, H256, U256};

pub use primitive_types::U256 as Word;

/// A 20-byte account address.
pub type Address = H160;

/// A 32-byte hash.
pub type Hash = H256;

/// Read a 32-byte big-endian buffer into a [`Word`].
#[inline]
pub fn word_from_be_bytes(bytes: [u8; 32]) -> Word {
    Word::from_big_endian(&bytes)
}

/// Write a [`Word`] out as a 32-byte big-endian buffer.
#[inline]
pub fn word_to_be_bytes(value: Word) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

/// Whether `value`, interpreted as a two's-complement i256, is negative.
#[inline]
pub fn is_negative(value: Word) -> bool {
    value.bit(255)
}

/// Two's-complement negation (`-value` in i256 arithmetic, wrapping).
#[inline]
pub fn negate(value: Word) -> Word {
    (!value).overflowing_add(Word::one()).0
}

/// Absolute value of a two's-complement i256, returned alongside whether the
/// input was negative (needed by callers that must remember the original
/// sign, e.g. SDIV/SMOD).
#[inline]
pub fn abs(value: Word) -> (Word, bool) {
    if is_negative(value) {
        (negate(value), true)
    } else {
        (value, false)
    }
}

/// Truncate a [`Word`] to the low 20 bytes, producing an [`Address`]. Upper
/// bytes are discarded, matching the EVM's own ADDRESS-from-stack-word
/// convention for CALL-family opcodes.
#[inline]
pub fn word_to_address(value: Word) -> Address {
    let bytes = word_to_be_bytes(value);
    #[allow(clippy::indexing_slicing)]
    Address::from_slice(&bytes[12..32])
}

/// Widen an [`Address`] back out to a full [`Word`] (upper 12 bytes zero).
#[inline]
pub fn address_to_word(address: Address) -> Word {
    Word::from_big_endian(address.as_bytes())
}

/// Narrow a [`Word`] down to a `usize` offset/length/PC, the conversion
/// every memory- or jump-target-consuming handler needs. Values that don't
/// fit in a `u64` can never correspond to a reachable byte offset, so the
/// caller maps the `None` case to whatever error is contextually right
/// (`OutOfGas` for a memory range, `InvalidJump` for a jump destination).
#[inline]
pub fn word_to_usize(value: Word) -> Option<usize> {
    if value > Word::from(u64::MAX) {
        return None;
    }
    usize::try_from(value.low_u64()).ok()
}
