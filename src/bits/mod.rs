//! Binary storage primitives.
//!
//! This module provides the bit-level types the machine is built from:
//! - [`Bit`] - A single binary digit with a full adder
//! - [`BitString`] - A variable-width bit sequence with integer conversion
//! - [`Word`] - A 32-bit word (registers, data values, instructions)
//! - [`Cell`] - Fixed-width storage (8-bit memory cells, 32-bit register cells)

mod bit;
mod string;
mod word;
mod cell;
pub mod adder;

pub use bit::Bit;
pub use string::{BitString, BitsError, to_bits, to_int};
pub use word::Word;
pub use cell::{Cell, BYTE_BITS};
pub use adder::{add, ripple_add};
