//! Ripple-carry addition over 32-bit words.
//!
//! Models a chain of one-bit full adders instead of native integer
//! addition. The carry out of bit 31 is dropped, so sums wrap modulo 2^32.

use crate::bits::{Bit, Word};

/// Add two words, returning (result, carry_out).
pub fn ripple_add(a: &Word, b: &Word) -> (Word, Bit) {
    let mut result = Word::zero();
    let mut carry = Bit::Zero;

    for i in 0..Word::WIDTH {
        let (sum, new_carry) = a.get(i).full_add(b.get(i), carry);
        result.set(i, sum);
        carry = new_carry;
    }

    (result, carry)
}

/// Add two words, discarding the carry out of the top bit.
#[inline]
pub fn add(a: &Word, b: &Word) -> Word {
    ripple_add(a, b).0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(a: u32, b: u32) -> u32 {
        add(&Word::from_u32(a), &Word::from_u32(b)).to_u32()
    }

    #[test]
    fn test_small_sums() {
        assert_eq!(sum(10, 15), 25);
        assert_eq!(sum(0, 0), 0);
        assert_eq!(sum(1, 1), 2);
        assert_eq!(sum(0x0F0F, 0xF0F0), 0xFFFF);
    }

    #[test]
    fn test_wraparound() {
        assert_eq!(sum(0xFFFF_FFFF, 1), 0);
        assert_eq!(sum(0x8000_0000, 0x8000_0000), 0);
        assert_eq!(sum(0xFFFF_FFFF, 0xFFFF_FFFF), 0xFFFF_FFFE);
    }

    #[test]
    fn test_carry_out() {
        let (result, carry) = ripple_add(&Word::from_u32(u32::MAX), &Word::from_u32(1));
        assert!(result.is_zero());
        assert_eq!(carry, Bit::One);

        let (_, carry) = ripple_add(&Word::from_u32(3), &Word::from_u32(4));
        assert_eq!(carry, Bit::Zero);
    }
}
