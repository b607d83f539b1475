//! Assembler, disassembler, and program images.
//!
//! This module provides:
//! - An assembler (text → machine words in the program region)
//! - A disassembler (machine words → readable text)
//! - A text image format for assembled programs

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, compile, AssemblerError, Program};
pub use disasm::disassemble;
pub use image::{ProgramImage, ImageError, load_image, save_image};
