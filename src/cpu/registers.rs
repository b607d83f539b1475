//! CPU registers.
//!
//! The machine has five registers, all built from 32-bit cells:
//! - PC: program counter (word index of the next instruction)
//! - MAR: memory address register
//! - MDR: memory data register
//! - IR: instruction register
//! - GR: bank of 32 general-purpose registers, addressed by index

use std::fmt;
use crate::bits::{BitString, BitsError, Cell, Word};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of general-purpose registers.
pub const GPR_COUNT: usize = 32;

/// Register names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegisterName {
    Pc,
    Mar,
    Mdr,
    Ir,
    Gr,
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegisterName::Pc => "PC",
            RegisterName::Mar => "MAR",
            RegisterName::Mdr => "MDR",
            RegisterName::Ir => "IR",
            RegisterName::Gr => "GR",
        };
        f.write_str(name)
    }
}

/// A register made of one or more 32-bit cells.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Register {
    name: RegisterName,
    cells: Vec<Cell>,
}

impl Register {
    /// Create a zeroed register with `count` cells.
    pub fn new(name: RegisterName, count: usize) -> Self {
        Self {
            name,
            cells: vec![Cell::new(Word::WIDTH); count],
        }
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the register has no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read cell `index`.
    pub fn read(&self, index: usize) -> Result<Word, RegisterError> {
        let cell = self.cells.get(index).ok_or(RegisterError::Bounds {
            name: self.name,
            index,
            count: self.cells.len(),
        })?;
        Ok(Word::try_from(cell.read())?)
    }

    /// Write raw bits into cell `index`; the value must be exactly 32 bits wide.
    pub fn write_bits(&mut self, bits: BitString, index: usize) -> Result<(), RegisterError> {
        let count = self.cells.len();
        let cell = self.cells.get_mut(index).ok_or(RegisterError::Bounds {
            name: self.name,
            index,
            count,
        })?;
        cell.write(bits)?;
        Ok(())
    }

    /// Write a word into cell `index`.
    pub fn write(&mut self, word: Word, index: usize) -> Result<(), RegisterError> {
        self.write_bits(word.to_bit_string(), index)
    }

    fn reset(&mut self) {
        for cell in &mut self.cells {
            *cell = Cell::new(Word::WIDTH);
        }
    }
}

/// The register file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Registers {
    /// Program counter
    pub pc: Register,
    /// Memory address register
    pub mar: Register,
    /// Memory data register
    pub mdr: Register,
    /// Instruction register
    pub ir: Register,
    /// General-purpose bank
    pub gr: Register,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self {
            pc: Register::new(RegisterName::Pc, 1),
            mar: Register::new(RegisterName::Mar, 1),
            mdr: Register::new(RegisterName::Mdr, 1),
            ir: Register::new(RegisterName::Ir, 1),
            gr: Register::new(RegisterName::Gr, GPR_COUNT),
        }
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        self.pc.reset();
        self.mar.reset();
        self.mdr.reset();
        self.ir.reset();
        self.gr.reset();
    }

    fn get(&self, name: RegisterName) -> &Register {
        match name {
            RegisterName::Pc => &self.pc,
            RegisterName::Mar => &self.mar,
            RegisterName::Mdr => &self.mdr,
            RegisterName::Ir => &self.ir,
            RegisterName::Gr => &self.gr,
        }
    }

    fn get_mut(&mut self, name: RegisterName) -> &mut Register {
        match name {
            RegisterName::Pc => &mut self.pc,
            RegisterName::Mar => &mut self.mar,
            RegisterName::Mdr => &mut self.mdr,
            RegisterName::Ir => &mut self.ir,
            RegisterName::Gr => &mut self.gr,
        }
    }

    /// Read cell `index` of register `name`.
    pub fn read(&self, name: RegisterName, index: usize) -> Result<Word, RegisterError> {
        self.get(name).read(index)
    }

    /// Write a word into cell `index` of register `name`.
    pub fn write(&mut self, name: RegisterName, word: Word, index: usize) -> Result<(), RegisterError> {
        self.get_mut(name).write(word, index)
    }

    /// Write raw bits into cell `index` of register `name`.
    pub fn write_bits(&mut self, name: RegisterName, bits: BitString, index: usize) -> Result<(), RegisterError> {
        self.get_mut(name).write_bits(bits, index)
    }

    /// Current program counter as a word index.
    pub fn pc(&self) -> Result<u32, RegisterError> {
        Ok(self.pc.read(0)?.to_u32())
    }

    /// Set the program counter.
    pub fn set_pc(&mut self, value: u32) -> Result<(), RegisterError> {
        self.pc.write(Word::from_u32(value), 0)
    }

    /// Read general-purpose register `index`.
    pub fn gpr(&self, index: usize) -> Result<Word, RegisterError> {
        self.gr.read(index)
    }

    /// Write general-purpose register `index`.
    pub fn set_gpr(&mut self, index: usize, word: Word) -> Result<(), RegisterError> {
        self.gr.write(word, index)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during register access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("{name} index {index} out of bounds ({count} cells)")]
    Bounds { name: RegisterName, index: usize, count: usize },

    #[error("register write rejected: {0}")]
    Length(#[from] BitsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_start_zeroed() {
        let regs = Registers::new();
        assert_eq!(regs.pc().unwrap(), 0);
        for i in 0..GPR_COUNT {
            assert!(regs.gpr(i).unwrap().is_zero());
        }
    }

    #[test]
    fn test_gpr_read_write() {
        let mut regs = Registers::new();
        regs.write(RegisterName::Gr, Word::from_u32(42), 7).unwrap();
        assert_eq!(regs.read(RegisterName::Gr, 7).unwrap().to_u32(), 42);
        assert!(regs.gpr(6).unwrap().is_zero());
    }

    #[test]
    fn test_bounds() {
        let mut regs = Registers::new();
        assert_eq!(
            regs.read(RegisterName::Gr, 32),
            Err(RegisterError::Bounds { name: RegisterName::Gr, index: 32, count: 32 })
        );
        assert!(regs.write(RegisterName::Pc, Word::from_u32(1), 1).is_err());
        assert!(matches!(regs.read(RegisterName::Ir, 1), Err(RegisterError::Bounds { .. })));
    }

    #[test]
    fn test_length() {
        let mut regs = Registers::new();
        let short = BitString::from_uint(1, 8).unwrap();
        assert_eq!(
            regs.write_bits(RegisterName::Mdr, short, 0),
            Err(RegisterError::Length(BitsError::Length { expected: 32, got: 8 }))
        );
        assert!(regs.read(RegisterName::Mdr, 0).unwrap().is_zero());
    }

    #[test]
    fn test_pc_is_not_auto_incremented() {
        let mut regs = Registers::new();
        regs.set_pc(60).unwrap();
        regs.read(RegisterName::Pc, 0).unwrap();
        assert_eq!(regs.pc().unwrap(), 60);
    }

    #[test]
    fn test_reset() {
        let mut regs = Registers::new();
        regs.set_pc(5).unwrap();
        regs.set_gpr(3, Word::from_u32(9)).unwrap();
        regs.reset();
        assert_eq!(regs.pc().unwrap(), 0);
        assert!(regs.gpr(3).unwrap().is_zero());
    }
}
