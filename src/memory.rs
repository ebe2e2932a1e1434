//! Byte-addressable, monotonically growing memory (§3, §9).
//!
//! Adapted from the teacher crate's `Memory`: the quadratic expansion-cost
//! formula and the resize/load/store primitives are carried over almost
//! verbatim. Dropped: the `Rc<RefCell<Vec<u8>>>` cross-callframe sharing
//! trick the teacher uses to let a child call's memory share a buffer with
//! its parent without copying. §3 only requires that a Frame "owns the
//! stack and memory buffers" for its own duration; this crate gives every
//! Frame a plain owned `Vec<u8>` and lets the Host/interpreter boundary
//! pass bytes across call frames by value instead, which is simpler and
//! still meets the spec (see DESIGN.md for this simplification).

use bytes::Bytes;

use crate::constants::{MEMORY_EXPANSION_QUOTIENT, WORD_SIZE};
use crate::errors::{ExceptionalHalt, InternalError, VMError};
use crate::word::{word_from_be_bytes, word_to_be_bytes, Word};

/// A Frame's memory buffer. Always a multiple of 32 bytes in size.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    buffer: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Grow the buffer so it covers at least `new_size` bytes, rounded up
    /// to the next 32-byte word. Never shrinks.
    #[inline]
    pub fn resize(&mut self, new_size: usize) -> Result<(), VMError> {
        if new_size == 0 {
            return Ok(());
        }
        let new_size = new_size
            .checked_next_multiple_of(WORD_SIZE)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        if new_size <= self.buffer.len() {
            return Ok(());
        }
        self.buffer.resize(new_size, 0);
        Ok(())
    }

    /// Load `size` bytes starting at `offset`, resizing if needed.
    #[inline]
    pub fn load_range(&mut self, offset: usize, size: usize) -> Result<Bytes, VMError> {
        if size == 0 {
            return Ok(Bytes::new());
        }
        let end = offset.checked_add(size).ok_or(ExceptionalHalt::OutOfGas)?;
        self.resize(end)?;
        #[allow(clippy::indexing_slicing)]
        Ok(Bytes::copy_from_slice(&self.buffer[offset..end]))
    }

    /// Load exactly one 32-byte word at `offset` (MLOAD).
    #[inline]
    pub fn load_word(&mut self, offset: usize) -> Result<Word, VMError> {
        let end = offset
            .checked_add(WORD_SIZE)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        self.resize(end)?;
        #[allow(clippy::indexing_slicing)]
        let slice = &self.buffer[offset..end];
        let mut bytes = [0u8; WORD_SIZE];
        bytes.copy_from_slice(slice);
        Ok(word_from_be_bytes(bytes))
    }

    /// Store arbitrary bytes at `offset`, resizing if needed.
    #[inline]
    pub fn store_data(&mut self, offset: usize, data: &[u8]) -> Result<(), VMError> {
        if data.is_empty() {
            return Ok(());
        }
        let end = offset
            .checked_add(data.len())
            .ok_or(ExceptionalHalt::OutOfGas)?;
        self.resize(end)?;
        #[allow(clippy::indexing_slicing)]
        self.buffer[offset..end].copy_from_slice(data);
        Ok(())
    }

    /// Store `data`, zero-padded (or truncated) to exactly `total_size`
    /// bytes at `offset` — used by RETURNDATACOPY/CALLDATACOPY/CODECOPY
    /// when the source is shorter than the requested size.
    pub fn store_data_zero_padded(
        &mut self,
        offset: usize,
        data: &[u8],
        total_size: usize,
    ) -> Result<(), VMError> {
        if total_size == 0 {
            return Ok(());
        }
        let end = offset
            .checked_add(total_size)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        self.resize(end)?;
        let copy_len = data.len().min(total_size);
        if copy_len > 0 {
            self.store_data(offset, &data[..copy_len])?;
        }
        if copy_len < total_size {
            let zero_start = offset
                .checked_add(copy_len)
                .ok_or(InternalError::Overflow)?;
            let zero_end = end;
            #[allow(clippy::indexing_slicing)]
            self.buffer[zero_start..zero_end].fill(0);
        }
        Ok(())
    }

    /// Store a single word at `offset` (MSTORE).
    #[inline]
    pub fn store_word(&mut self, offset: usize, word: Word) -> Result<(), VMError> {
        let end = offset
            .checked_add(WORD_SIZE)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        self.resize(end)?;
        self.store_data(offset, &word_to_be_bytes(word))
    }

    /// Store a single byte at `offset` (MSTORE8).
    #[inline]
    pub fn store_byte(&mut self, offset: usize, byte: u8) -> Result<(), VMError> {
        let end = offset.checked_add(1).ok_or(ExceptionalHalt::OutOfGas)?;
        self.resize(end)?;
        #[allow(clippy::indexing_slicing)]
        {
            self.buffer[offset] = byte;
        }
        Ok(())
    }

    /// Copy `size` bytes from `src_offset` to `dst_offset` within this
    /// buffer (MCOPY semantics: overlapping ranges behave like `memmove`).
    pub fn copy_within(
        &mut self,
        src_offset: usize,
        dst_offset: usize,
        size: usize,
    ) -> Result<(), VMError> {
        if size == 0 {
            return Ok(());
        }
        let high = src_offset
            .max(dst_offset)
            .checked_add(size)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        self.resize(high)?;
        let src_end = src_offset.checked_add(size).ok_or(InternalError::Overflow)?;
        self.buffer.copy_within(src_offset..src_end, dst_offset);
        Ok(())
    }

    pub fn store_zeros(&mut self, offset: usize, size: usize) -> Result<(), VMError> {
        if size == 0 {
            return Ok(());
        }
        let end = offset.checked_add(size).ok_or(ExceptionalHalt::OutOfGas)?;
        self.resize(end)?;
        #[allow(clippy::indexing_slicing)]
        self.buffer[offset..end].fill(0);
        Ok(())
    }
}

/// Incremental expansion cost to grow from `current_size` to `new_size`
/// bytes (§3: `3*words + words^2/512`, minus what was already paid).
#[inline]
pub fn expansion_cost(new_size: usize, current_size: usize) -> Result<u64, VMError> {
    if new_size <= current_size {
        return Ok(0);
    }
    Ok(cost(new_size)?.saturating_sub(cost(current_size)?))
}

#[inline]
fn cost(size: usize) -> Result<u64, VMError> {
    let size = u64::try_from(size).map_err(|_| InternalError::TypeConversion)?;
    let words = size.div_ceil(WORD_SIZE as u64);
    let quadratic = words
        .checked_mul(words)
        .ok_or(ExceptionalHalt::OutOfGas)?
        / MEMORY_EXPANSION_QUOTIENT;
    let linear = words.checked_mul(3).ok_or(ExceptionalHalt::OutOfGas)?;
    quadratic
        .checked_add(linear)
        .ok_or_else(|| ExceptionalHalt::OutOfGas.into())
}

/// Smallest multiple-of-32 size covering `[offset, offset+size)`, or 0 if
/// `size` is 0 (no expansion needed to "touch" zero bytes).
#[inline]
pub fn calculate_memory_size(offset: usize, size: usize) -> Result<usize, VMError> {
    if size == 0 {
        return Ok(0);
    }
    offset
        .checked_add(size)
        .and_then(|sum| sum.checked_next_multiple_of(WORD_SIZE))
        .ok_or_else(|| ExceptionalHalt::OutOfGas.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mstore_mload_round_trip_aligned() {
        let mut mem = Memory::new();
        mem.store_word(0, Word::from(42u64)).unwrap();
        assert_eq!(mem.load_word(0).unwrap(), Word::from(42u64));
    }

    #[test]
    fn mstore_mload_round_trip_unaligned() {
        let mut mem = Memory::new();
        mem.store_word(5, Word::from(0xdead_beefu64)).unwrap();
        assert_eq!(mem.load_word(5).unwrap(), Word::from(0xdead_beefu64));
    }

    #[test]
    fn expansion_cost_is_zero_within_current_size() {
        assert_eq!(expansion_cost(32, 64).unwrap(), 0);
    }

    #[test]
    fn expansion_cost_one_word_from_empty() {
        // 1 word: 3*1 + 1/512 = 3
        assert_eq!(expansion_cost(32, 0).unwrap(), 3);
    }

    #[test]
    fn memory_size_rounds_up_to_word_multiple() {
        assert_eq!(calculate_memory_size(0, 1).unwrap(), 32);
        assert_eq!(calculate_memory_size(0, 32).unwrap(), 32);
        assert_eq!(calculate_memory_size(0, 33).unwrap(), 64);
        assert_eq!(calculate_memory_size(10, 0).unwrap(), 0);
    }

    #[test]
    fn mcopy_handles_overlap_like_memmove() {
        let mut mem = Memory::new();
        mem.store_data(0, &[1, 2, 3, 4]).unwrap();
        mem.copy_within(0, 2, 4).unwrap();
        let out = mem.load_range(0, 6).unwrap();
        assert_eq!(&out[..], &[1, 2, 1, 2, 3, 4]);
    }
}
