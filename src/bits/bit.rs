//! Single binary digit.
//!
//! The emulator models storage and arithmetic at the bit level rather
//! than leaning on native integer operations, so every word is built
//! from these.

use std::fmt;
use serde::{Serialize, Deserialize};

/// A single binary digit.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Bit {
    /// Cleared (0)
    #[default]
    Zero = 0,
    /// Set (1)
    One = 1,
}

impl Bit {
    /// Both bit values in ascending order.
    pub const ALL: [Bit; 2] = [Bit::Zero, Bit::One];

    /// Create a bit from a boolean.
    #[inline]
    pub const fn from_bool(value: bool) -> Self {
        if value { Bit::One } else { Bit::Zero }
    }

    /// Whether this bit is set.
    #[inline]
    pub const fn is_set(self) -> bool {
        matches!(self, Bit::One)
    }

    /// Parse a `'0'` or `'1'` character.
    #[inline]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Bit::Zero),
            '1' => Some(Bit::One),
            _ => None,
        }
    }

    /// The `'0'`/`'1'` character for this bit.
    #[inline]
    pub const fn to_char(self) -> char {
        match self {
            Bit::Zero => '0',
            Bit::One => '1',
        }
    }

    /// Exclusive or.
    #[inline]
    pub const fn xor(self, other: Self) -> Self {
        Bit::from_bool(self.is_set() != other.is_set())
    }

    /// Full adder: adds three bits, returns (sum, carry_out).
    ///
    /// The sum is the parity of the inputs; the carry is their majority.
    #[inline]
    pub const fn full_add(self, other: Self, carry_in: Self) -> (Self, Self) {
        let sum = self.xor(other).xor(carry_in);
        let (a, b, c) = (self.is_set(), other.is_set(), carry_in.is_set());
        let carry_out = Bit::from_bool((a && b) || (a && c) || (b && c));
        (sum, carry_out)
    }
}

impl fmt::Debug for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

impl From<bool> for Bit {
    fn from(value: bool) -> Self {
        Bit::from_bool(value)
    }
}

impl From<Bit> for bool {
    fn from(bit: Bit) -> Self {
        bit.is_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_adder_truth_table() {
        for a in Bit::ALL {
            for b in Bit::ALL {
                for c in Bit::ALL {
                    let total = a as u8 + b as u8 + c as u8;
                    let (sum, carry) = a.full_add(b, c);
                    assert_eq!(sum as u8, total & 1, "sum of {:?}{:?}{:?}", a, b, c);
                    assert_eq!(carry as u8, total >> 1, "carry of {:?}{:?}{:?}", a, b, c);
                }
            }
        }
    }

    #[test]
    fn test_char_roundtrip() {
        for b in Bit::ALL {
            assert_eq!(Bit::from_char(b.to_char()), Some(b));
        }
        assert_eq!(Bit::from_char('2'), None);
    }
}
