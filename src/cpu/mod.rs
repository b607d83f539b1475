//! CPU emulation.
//!
//! This module implements the whole machine:
//! - 256 bytes of 8-bit cells, read and written as 32-bit words
//! - PC, MAR, MDR, IR and 32 general-purpose registers
//! - a three-instruction set: Load, Store, Add

pub mod memory;
pub mod registers;
pub mod isa;
pub mod execute;

pub use memory::{Memory, MemoryError};
pub use registers::{Registers, RegisterName, RegisterError};
pub use isa::{Instruction, Opcode, Operand, OperandKind, DecodeError, SyntaxError};
pub use execute::{Cpu, CpuError, CpuState, FaultKind, Snapshot, Stage};
