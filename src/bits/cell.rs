//! Fixed-width storage cells.

use serde::{Serialize, Deserialize};
use crate::bits::{BitString, BitsError};

/// Width of a memory cell.
pub const BYTE_BITS: usize = 8;

/// A storage unit that always holds exactly `width` bits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    data: BitString,
}

impl Cell {
    /// Create a zeroed cell.
    pub fn new(width: usize) -> Self {
        Self { data: BitString::zeros(width) }
    }

    /// A zeroed 8-bit memory cell.
    pub fn byte() -> Self {
        Self::new(BYTE_BITS)
    }

    /// Width in bits.
    #[inline]
    pub fn width(&self) -> usize {
        self.data.width()
    }

    /// Current contents.
    #[inline]
    pub fn read(&self) -> &BitString {
        &self.data
    }

    /// Replace the contents. The new value must match the cell width.
    pub fn write(&mut self, data: BitString) -> Result<(), BitsError> {
        if data.width() != self.width() {
            return Err(BitsError::Length { expected: self.width(), got: data.width() });
        }
        self.data = data;
        Ok(())
    }

    /// Read an 8-bit (or narrower) cell as a byte.
    pub fn read_byte(&self) -> u8 {
        self.data
            .bits()
            .iter()
            .take(BYTE_BITS)
            .enumerate()
            .fold(0u8, |acc, (i, b)| acc | ((b.is_set() as u8) << i))
    }

    /// Write a byte into an 8-bit cell.
    pub fn write_byte(&mut self, value: u8) -> Result<(), BitsError> {
        self.write(BitString::from_uint(value as u64, BYTE_BITS)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_starts_zeroed() {
        let cell = Cell::new(32);
        assert_eq!(cell.width(), 32);
        assert_eq!(cell.read().to_uint().unwrap(), 0);
    }

    #[test]
    fn test_cell_rejects_wrong_width() {
        let mut cell = Cell::byte();
        let wide = BitString::from_uint(1, 32).unwrap();
        assert_eq!(cell.write(wide), Err(BitsError::Length { expected: 8, got: 32 }));
        assert_eq!(cell.read_byte(), 0);
    }

    #[test]
    fn test_byte_roundtrip() {
        let mut cell = Cell::byte();
        cell.write_byte(0xA5).unwrap();
        assert_eq!(cell.read_byte(), 0xA5);
        assert_eq!(cell.read().to_string(), "10100101");
    }
}
