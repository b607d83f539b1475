//! # vn32
//!
//! A minimal von Neumann machine: byte-addressable memory, a small register
//! file, a three-instruction set (Load, Store, Add), and an assembler that
//! packs programs against the top of memory.
//!
//! Arithmetic goes through a bit-level ripple-carry adder, so the emulator
//! is suitable for teaching and exhaustive testing rather than speed.

pub mod bits;
pub mod cpu;
pub mod asm;
pub mod config;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use bits::{Bit, BitString, BitsError, Cell, Word, to_bits, to_int};
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Instruction, Opcode, Snapshot};
pub use asm::{assemble, compile, disassemble, AssemblerError, ProgramImage, load_image, save_image};
pub use config::{MachineConfig, ConfigError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
