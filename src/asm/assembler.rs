//! Assembler for the Load/Store/Add machine.
//!
//! Syntax:
//! ```text
//! ; Comment
//! Load r1, #0       ; r1 := MEM[0]
//! Load r2, #1
//! Add r3, r1, r2    ; r3 := r1 + r2
//! Store r3, #3      ; MEM[3] := r3
//! ```
//!
//! The assembled program is packed against the top of memory: with `n`
//! instructions in a memory of `len` bytes the first one lands at word
//! `len / 4 - n`.

use crate::bits::Word;
use crate::cpu::isa::{encode, Instruction, Opcode, SyntaxError};
use crate::cpu::memory::{Memory, MemoryError};
use thiserror::Error;
use tracing::{debug, trace};

/// Parse source code into instructions without touching memory.
pub fn assemble(source: &str) -> Result<Vec<Instruction>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)?;
    Ok(asm.output.into_iter().map(|(_, instr)| instr).collect())
}

/// Assemble `source` and write it into the program region of `memory`.
///
/// Every line is checked before the first word is written, so a program
/// that fails to assemble leaves memory untouched.
pub fn compile(source: &str, memory: &mut Memory) -> Result<Program, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)?;

    let lines = asm.output.len();
    let start = memory
        .word_count()
        .checked_sub(lines)
        .ok_or(AssemblerError::ProgramTooLarge { lines, capacity: memory.word_count() })?;

    memory.set_program_start(start)?;

    let mut words = Vec::with_capacity(lines);
    for (offset, (line, instr)) in asm.output.iter().enumerate() {
        let word = encode(instr);
        trace!(line, address = start + offset, word = %word, "emit");
        memory.write_word(start + offset, word, true)?;
        words.push(word);
    }

    debug!(instructions = lines, start, "program compiled");

    Ok(Program {
        start,
        words,
        instructions: asm.output.into_iter().map(|(_, instr)| instr).collect(),
    })
}

/// An assembled program and where it was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Word index of the first instruction.
    pub start: usize,
    /// Encoded machine words, in program order.
    pub words: Vec<Word>,
    /// The instructions the words encode.
    pub instructions: Vec<Instruction>,
}

/// The assembler state.
struct Assembler {
    /// Instructions with their 1-based source line.
    output: Vec<(usize, Instruction)>,
}

impl Assembler {
    fn new() -> Self {
        Self { output: Vec::new() }
    }

    fn assemble(&mut self, source: &str) -> Result<(), AssemblerError> {
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }
        Ok(())
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let mut pieces = line.split(',');
        let head = pieces.next().unwrap_or_default();
        let mut head_parts = head.split_whitespace();
        let mnemonic = head_parts.next().unwrap_or_default();

        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| {
            AssemblerError::UnknownInstruction {
                line: line_num,
                mnemonic: mnemonic.to_string(),
            }
        })?;

        let first: Vec<&str> = head_parts.collect();
        if first.len() > 1 {
            return Err(AssemblerError::Syntax {
                line: line_num,
                source: SyntaxError::Malformed { operand: first.join(" ") },
            });
        }

        let operands: Vec<&str> = first
            .into_iter()
            .chain(pieces.map(str::trim))
            .collect();

        let instr = Instruction::from_operands(opcode, &operands)
            .map_err(|source| AssemblerError::Syntax { line: line_num, source })?;

        self.output.push((line_num, instr));
        Ok(())
    }
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {source}")]
    Syntax { line: usize, source: SyntaxError },

    #[error("unknown instruction on line {line}: {mnemonic}")]
    UnknownInstruction { line: usize, mnemonic: String },

    #[error("program of {lines} instructions does not fit in {capacity} words")]
    ProgramTooLarge { lines: usize, capacity: usize },

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}
