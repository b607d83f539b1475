//! Disassembler.
//!
//! Converts machine words back to readable assembly.

use crate::bits::Word;
use crate::cpu::isa::{decode, Instruction};

/// Disassemble a single instruction word to text.
pub fn disassemble_instruction(word: Word) -> String {
    match decode(word) {
        Ok(decoded) => format_instruction(&decoded),
        Err(_) => format!("??? ; 0x{:08X}", word.to_u32()),
    }
}

/// Disassemble a program whose first word sits at word index `start`.
pub fn disassemble(words: &[Word], start: usize) -> String {
    let mut output = String::new();
    output.push_str("; Disassembly\n");
    output.push_str("; -----------\n\n");

    for (offset, word) in words.iter().enumerate() {
        let line = disassemble_instruction(*word);
        output.push_str(&format!("{:03}: {:<18} ; {}\n", start + offset, line, word));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    match *instr {
        Instruction::Load { dest, addr } => format!("Load r{}, #{}", dest, addr),
        Instruction::Store { src, addr } => format!("Store r{}, #{}", src, addr),
        Instruction::Add { dest, lhs, rhs } => format!("Add r{}, r{}, r{}", dest, lhs, rhs),
    }
}
