//! Variable-width bit strings and the integer conversions built on them.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::bits::Bit;

/// Widest bit string that still converts to a native integer.
pub const MAX_INT_WIDTH: usize = 64;

/// A fixed-length sequence of bits.
///
/// The width is set at construction and never changes. Bits are stored
/// from least significant (index 0) to most significant; text renders
/// most significant first.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitString {
    bits: Vec<Bit>,
}

impl BitString {
    /// An all-zero bit string of the given width.
    pub fn zeros(width: usize) -> Self {
        Self { bits: vec![Bit::Zero; width] }
    }

    /// Create from bits ordered LSB first.
    pub fn from_bits(bits: Vec<Bit>) -> Self {
        Self { bits }
    }

    /// Encode `value` as an unsigned bit string of exactly `width` bits,
    /// zero-padded on the left.
    pub fn from_uint(value: u64, width: usize) -> Result<Self, BitsError> {
        if width < MAX_INT_WIDTH && value >> width != 0 {
            return Err(BitsError::Range { value, width });
        }
        let bits = (0..width)
            .map(|i| Bit::from_bool(i < MAX_INT_WIDTH && (value >> i) & 1 == 1))
            .collect();
        Ok(Self { bits })
    }

    /// Parse a string of `'0'`/`'1'` characters, most significant first.
    pub fn parse(s: &str) -> Result<Self, BitsError> {
        if s.is_empty() {
            return Err(BitsError::Format { input: s.to_string() });
        }
        let bits = s
            .chars()
            .rev()
            .map(Bit::from_char)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| BitsError::Format { input: s.to_string() })?;
        Ok(Self { bits })
    }

    /// Interpret the bits as an unsigned integer.
    pub fn to_uint(&self) -> Result<u64, BitsError> {
        if self.bits[MAX_INT_WIDTH.min(self.bits.len())..].iter().any(|b| b.is_set()) {
            return Err(BitsError::TooWide { width: self.bits.len() });
        }
        Ok(self
            .bits
            .iter()
            .take(MAX_INT_WIDTH)
            .enumerate()
            .fold(0u64, |acc, (i, b)| acc | ((b.is_set() as u64) << i)))
    }

    /// Number of bits.
    #[inline]
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Get a single bit by index (0 = LSB).
    #[inline]
    pub fn get(&self, index: usize) -> Bit {
        self.bits[index]
    }

    /// The bits, LSB first.
    #[inline]
    pub fn bits(&self) -> &[Bit] {
        &self.bits
    }
}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitString({}:0b{})", self.width(), self)
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits.iter().rev() {
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

/// Format `value` as a `width`-character binary string, left-padded with zeros.
pub fn to_bits(value: u64, width: usize) -> Result<String, BitsError> {
    BitString::from_uint(value, width).map(|b| b.to_string())
}

/// Parse a binary string as an unsigned integer.
pub fn to_int(bits: &str) -> Result<u64, BitsError> {
    BitString::parse(bits)?.to_uint()
}

/// Errors from bit-level conversions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BitsError {
    #[error("value {value} does not fit in {width} bits")]
    Range { value: u64, width: usize },

    #[error("invalid bit string {input:?} (expected only '0' and '1')")]
    Format { input: String },

    #[error("expected {expected} bits, got {got}")]
    Length { expected: usize, got: usize },

    #[error("{width}-bit string does not fit in a 64-bit integer")]
    TooWide { width: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bits_pads_left() {
        assert_eq!(to_bits(5, 8).unwrap(), "00000101");
        assert_eq!(to_bits(0, 4).unwrap(), "0000");
        assert_eq!(to_bits(0xFFFF_FFFF, 32).unwrap(), "1".repeat(32));
    }

    #[test]
    fn test_to_bits_range() {
        assert_eq!(to_bits(256, 8), Err(BitsError::Range { value: 256, width: 8 }));
        assert!(to_bits(255, 8).is_ok());
        assert!(to_bits(1, 0).is_err());
    }

    #[test]
    fn test_to_int() {
        assert_eq!(to_int("00011001").unwrap(), 25);
        assert_eq!(to_int("1").unwrap(), 1);
    }

    #[test]
    fn test_to_int_format() {
        assert!(matches!(to_int("10201"), Err(BitsError::Format { .. })));
        assert!(matches!(to_int(""), Err(BitsError::Format { .. })));
        assert!(matches!(to_int("1x"), Err(BitsError::Format { .. })));
    }

    #[test]
    fn test_to_int_rejects_prefix_and_padding() {
        assert_eq!(to_int("0b101"), Err(BitsError::Format { input: "0b101".into() }));
        assert_eq!(to_int(" 101 "), Err(BitsError::Format { input: " 101 ".into() }));
        assert!(matches!(to_int("101\n"), Err(BitsError::Format { .. })));
    }

    #[test]
    fn test_wide_strings() {
        let wide = BitString::parse(&format!("1{}", "0".repeat(64))).unwrap();
        assert_eq!(wide.to_uint(), Err(BitsError::TooWide { width: 65 }));

        let padded = BitString::from_uint(3, 70).unwrap();
        assert_eq!(padded.width(), 70);
        assert_eq!(padded.to_uint().unwrap(), 3);
    }

    #[test]
    fn test_display_is_msb_first() {
        let b = BitString::from_uint(6, 4).unwrap();
        assert_eq!(b.get(0), Bit::Zero);
        assert_eq!(b.get(1), Bit::One);
        assert_eq!(b.to_string(), "0110");
    }
}
