//! Main memory.
//!
//! Memory is a flat array of 8-bit cells. A word at index `i` occupies
//! cells `[4i, 4i+4)` stored little-endian: cell `4i` holds the least
//! significant byte. Data lives at the bottom, the assembled program is
//! packed against the top, and `program_index` marks the boundary.

use std::iter;
use crate::bits::{BitsError, Cell, Word};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::debug;

/// Default memory size in bytes (8-bit addressing).
pub const DEFAULT_ADDRESS_LEN: usize = 256;

/// Byte-addressable memory built from 8-bit cells.
#[derive(Clone, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<Cell>,
    /// Byte offset of the first program cell.
    program_index: usize,
}

impl Memory {
    /// Create a zeroed memory of `address_len` bytes with an empty program region.
    pub fn new(address_len: usize) -> Self {
        Self {
            cells: vec![Cell::byte(); address_len],
            program_index: address_len,
        }
    }

    /// Total size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether memory has no cells at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of whole words that fit.
    #[inline]
    pub fn word_count(&self) -> usize {
        self.cells.len() / Word::BYTES
    }

    /// Byte offset where the program region begins.
    #[inline]
    pub fn program_index(&self) -> usize {
        self.program_index
    }

    /// Word index where the program region begins.
    #[inline]
    pub fn program_start(&self) -> usize {
        self.program_index / Word::BYTES
    }

    /// Move the data/program boundary to the given word index.
    pub fn set_program_start(&mut self, word_index: usize) -> Result<(), MemoryError> {
        let byte_index = word_index.saturating_mul(Word::BYTES);
        if byte_index > self.len() {
            return Err(MemoryError::OutOfRange { index: word_index, len: self.len() });
        }
        self.program_index = byte_index;
        Ok(())
    }

    /// Read a single byte cell.
    pub fn read_cell(&self, addr: usize) -> Result<u8, MemoryError> {
        self.cells
            .get(addr)
            .map(Cell::read_byte)
            .ok_or(MemoryError::CellOutOfRange { addr, len: self.len() })
    }

    /// Read the word at `index`.
    pub fn read_word(&self, index: usize) -> Result<Word, MemoryError> {
        let base = self.word_base(index)?;
        let mut bytes = [0u8; 4];
        for (j, byte) in bytes.iter_mut().enumerate() {
            *byte = self.cells[base + j].read_byte();
        }
        Ok(Word::from_le_bytes(bytes))
    }

    /// Write the word at `index`.
    ///
    /// Data writes (`is_program == false`) that reach the program region
    /// grow the data region first, so program bytes are never overwritten.
    pub fn write_word(&mut self, index: usize, word: Word, is_program: bool) -> Result<(), MemoryError> {
        if !is_program {
            self.ensure_data_capacity(index);
        }
        let base = self.word_base(index)?;
        for (j, byte) in word.to_le_bytes().into_iter().enumerate() {
            self.cells[base + j].write_byte(byte)?;
        }
        Ok(())
    }

    /// Write initial data words starting at word 0.
    pub fn load_data(&mut self, data: &[u32]) -> Result<(), MemoryError> {
        for (i, &value) in data.iter().enumerate() {
            self.write_word(i, Word::from_u32(value), false)?;
        }
        Ok(())
    }

    /// Place a pre-assembled program at the top of memory.
    ///
    /// Returns the word index of the first instruction.
    pub fn load_program(&mut self, program: &[Word]) -> Result<usize, MemoryError> {
        let start = self.word_count().checked_sub(program.len()).ok_or(
            MemoryError::ProgramTooLarge {
                size: program.len(),
                available: self.word_count(),
            },
        )?;

        self.set_program_start(start)?;
        for (i, &word) in program.iter().enumerate() {
            self.write_word(start + i, word, true)?;
        }

        Ok(start)
    }

    /// Dump words (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, Word)> {
        let end = start.saturating_add(count).min(self.word_count());
        (start..end)
            .filter_map(|i| self.read_word(i).ok().map(|w| (i, w)))
            .collect()
    }

    fn word_base(&self, index: usize) -> Result<usize, MemoryError> {
        index
            .checked_mul(Word::BYTES)
            .filter(|base| base.checked_add(Word::BYTES).is_some_and(|end| end <= self.len()))
            .ok_or(MemoryError::OutOfRange { index, len: self.len() })
    }

    /// Grow the data region when a data write would land in the program region.
    fn ensure_data_capacity(&mut self, index: usize) {
        let end = index.saturating_mul(Word::BYTES).saturating_add(Word::BYTES);
        if end > self.program_index {
            self.grow(end - self.program_index);
        }
    }

    /// Insert `extra` zero cells in front of the program region.
    fn grow(&mut self, extra: usize) {
        let at = self.program_index;
        self.cells.splice(at..at, iter::repeat_with(Cell::byte).take(extra));
        self.program_index += extra;
        debug!(extra, len = self.len(), program_index = self.program_index, "memory grown");
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS_LEN)
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|c| c.read_byte() != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.len())
            .field("program_index", &self.program_index)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("word {index} out of range (memory is {len} bytes)")]
    OutOfRange { index: usize, len: usize },

    #[error("cell {addr} out of range (memory is {len} bytes)")]
    CellOutOfRange { addr: usize, len: usize },

    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },

    #[error("cell write failed: {0}")]
    Cell(#[from] BitsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::default();
        mem.write_word(3, Word::from_u32(25), false).unwrap();
        assert_eq!(mem.read_word(3).unwrap().to_u32(), 25);
    }

    #[test]
    fn test_word_is_little_endian_across_cells() {
        let mut mem = Memory::default();
        mem.write_word(1, Word::from_u32(0x1122_3344), false).unwrap();
        assert_eq!(mem.read_cell(4).unwrap(), 0x44);
        assert_eq!(mem.read_cell(5).unwrap(), 0x33);
        assert_eq!(mem.read_cell(6).unwrap(), 0x22);
        assert_eq!(mem.read_cell(7).unwrap(), 0x11);
    }

    #[test]
    fn test_memory_bounds() {
        let mem = Memory::new(16);
        assert!(mem.read_word(3).is_ok());
        assert_eq!(mem.read_word(4), Err(MemoryError::OutOfRange { index: 4, len: 16 }));
        assert!(mem.read_word(usize::MAX).is_err());
        assert!(mem.read_cell(16).is_err());
    }

    #[test]
    fn test_partial_word_at_top_is_out_of_range() {
        let mem = Memory::new(10);
        assert!(mem.read_word(1).is_ok());
        assert!(mem.read_word(2).is_err());
    }

    #[test]
    fn test_load_program_at_top() {
        let mut mem = Memory::default();
        let program = [Word::from_u32(1), Word::from_u32(2), Word::from_u32(3)];

        let start = mem.load_program(&program).unwrap();

        assert_eq!(start, 61);
        assert_eq!(mem.program_start(), 61);
        assert_eq!(mem.read_word(61).unwrap().to_u32(), 1);
        assert_eq!(mem.read_word(63).unwrap().to_u32(), 3);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut mem = Memory::new(8);
        let program = [Word::zero(); 3];
        assert_eq!(
            mem.load_program(&program),
            Err(MemoryError::ProgramTooLarge { size: 3, available: 2 })
        );
    }

    #[test]
    fn test_program_write_does_not_grow() {
        let mut mem = Memory::new(16);
        mem.set_program_start(2).unwrap();
        mem.write_word(2, Word::from_u32(7), true).unwrap();
        assert_eq!(mem.len(), 16);
        assert_eq!(mem.program_index(), 8);
    }

    #[test]
    fn test_data_write_into_program_region_grows() {
        let mut mem = Memory::new(16);
        let program = [Word::from_u32(0xAAAA_AAAA), Word::from_u32(0xBBBB_BBBB)];
        mem.load_program(&program).unwrap();
        assert_eq!(mem.program_start(), 2);

        mem.write_word(2, Word::from_u32(99), false).unwrap();

        assert_eq!(mem.len(), 20);
        assert_eq!(mem.program_start(), 3);
        assert_eq!(mem.read_word(2).unwrap().to_u32(), 99);
        assert_eq!(mem.read_word(3).unwrap().to_u32(), 0xAAAA_AAAA);
        assert_eq!(mem.read_word(4).unwrap().to_u32(), 0xBBBB_BBBB);
    }

    #[test]
    fn test_far_data_write_grows_enough() {
        let mut mem = Memory::new(16);
        mem.load_program(&[Word::from_u32(5)]).unwrap();

        mem.write_word(10, Word::from_u32(1), false).unwrap();

        assert_eq!(mem.program_start(), 11);
        assert_eq!(mem.read_word(10).unwrap().to_u32(), 1);
        assert_eq!(mem.read_word(11).unwrap().to_u32(), 5);
        assert_eq!(mem.len(), 48);
    }

    #[test]
    fn test_load_data_and_dump() {
        let mut mem = Memory::default();
        mem.load_data(&[10, 15]).unwrap();
        let dump = mem.dump(0, 3);
        assert_eq!(dump.len(), 3);
        assert_eq!(dump[0], (0, Word::from_u32(10)));
        assert_eq!(dump[1], (1, Word::from_u32(15)));
        assert_eq!(dump[2], (2, Word::zero()));
    }
}
