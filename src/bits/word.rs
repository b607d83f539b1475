//! The 32-bit machine word.
//!
//! Everything the machine moves around is a [`Word`]: register contents,
//! data values, and encoded instructions.

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::bits::{Bit, BitString, BitsError};

/// A 32-bit unsigned word.
///
/// Used for:
/// - Every register cell (PC, MAR, MDR, IR, and the general-purpose bank)
/// - Data values in memory (four 8-bit cells each)
/// - Encoded instructions `[opcode:8][field1:8][field2:8][field3:8]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Word {
    /// Bits stored from least significant (index 0) to most significant (index 31)
    bits: [Bit; 32],
}

impl Word {
    /// Number of bits in a word.
    pub const WIDTH: usize = 32;

    /// Number of 8-bit bytes in a word.
    pub const BYTES: usize = 4;

    /// Create a word with all bits cleared.
    #[inline]
    pub const fn zero() -> Self {
        Self { bits: [Bit::Zero; 32] }
    }

    /// Create a word from an array of bits (LSB first).
    #[inline]
    pub const fn from_bits(bits: [Bit; 32]) -> Self {
        Self { bits }
    }

    /// Get the underlying bit array.
    #[inline]
    pub const fn bits(&self) -> &[Bit; 32] {
        &self.bits
    }

    /// Get a single bit by index (0 = LSB).
    #[inline]
    pub const fn get(&self, index: usize) -> Bit {
        self.bits[index]
    }

    /// Set a single bit by index (0 = LSB).
    #[inline]
    pub fn set(&mut self, index: usize, bit: Bit) {
        self.bits[index] = bit;
    }

    /// Create from a native integer.
    pub fn from_u32(value: u32) -> Self {
        let mut bits = [Bit::Zero; 32];
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = Bit::from_bool((value >> i) & 1 == 1);
        }
        Self { bits }
    }

    /// Convert to a native integer.
    pub fn to_u32(&self) -> u32 {
        self.bits
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, b)| acc | ((b.is_set() as u32) << i))
    }

    /// Split into bytes, least significant first.
    pub fn to_le_bytes(&self) -> [u8; 4] {
        self.to_u32().to_le_bytes()
    }

    /// Compose from bytes, least significant first.
    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self::from_u32(u32::from_le_bytes(bytes))
    }

    /// The instruction fields `[opcode, field1, field2, field3]`, most
    /// significant byte first.
    pub fn fields(&self) -> [u8; 4] {
        self.to_u32().to_be_bytes()
    }

    /// Pack instruction fields, most significant byte first.
    pub fn from_fields(fields: [u8; 4]) -> Self {
        Self::from_u32(u32::from_be_bytes(fields))
    }

    /// Check if all bits are cleared.
    pub fn is_zero(&self) -> bool {
        self.bits.iter().all(|b| !b.is_set())
    }

    /// Copy into a variable-width bit string.
    pub fn to_bit_string(&self) -> BitString {
        BitString::from_bits(self.bits.to_vec())
    }

    /// Parse a 32-character binary string, most significant bit first.
    pub fn parse(s: &str) -> Result<Self, BitsError> {
        Word::try_from(&BitString::parse(s)?)
    }
}

impl TryFrom<&BitString> for Word {
    type Error = BitsError;

    fn try_from(value: &BitString) -> Result<Self, Self::Error> {
        if value.width() != Self::WIDTH {
            return Err(BitsError::Length { expected: Self::WIDTH, got: value.width() });
        }
        let mut bits = [Bit::Zero; 32];
        bits.copy_from_slice(value.bits());
        Ok(Self { bits })
    }
}

impl From<u32> for Word {
    fn from(value: u32) -> Self {
        Word::from_u32(value)
    }
}

impl From<Word> for u32 {
    fn from(word: Word) -> Self {
        word.to_u32()
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word(0x{:08X} = {})", self.to_u32(), self.to_u32())
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits.iter().rev() {
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}
