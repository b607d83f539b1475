//! Instruction set.
//!
//! Three instructions, each encoded in one 32-bit word:
//!
//! ```text
//! [opcode:8][field1:8][field2:8][field3:8]
//!
//! Load  dest, #addr      0x81  addr  0     dest
//! Store src,  #addr      0x82  src   0     addr
//! Add   dest, lhs, rhs   0x83  lhs   rhs   dest
//! ```

use crate::bits::Word;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Instruction opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Load = 0b1000_0001,
    Store = 0b1000_0010,
    Add = 0b1000_0011,
}

impl Opcode {
    /// Every opcode in the instruction set.
    pub const ALL: [Opcode; 3] = [Opcode::Load, Opcode::Store, Opcode::Add];

    /// The assembly mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Load => "Load",
            Opcode::Store => "Store",
            Opcode::Add => "Add",
        }
    }

    /// Look up an opcode by mnemonic (case-insensitive).
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.mnemonic().eq_ignore_ascii_case(name))
    }

    /// Look up an opcode by its encoded byte.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0b1000_0001 => Some(Opcode::Load),
            0b1000_0010 => Some(Opcode::Store),
            0b1000_0011 => Some(Opcode::Add),
            _ => None,
        }
    }

    /// The operand kinds this instruction expects, in source order.
    pub const fn signature(self) -> &'static [OperandKind] {
        match self {
            Opcode::Load | Opcode::Store => &[OperandKind::Register, OperandKind::Immediate],
            Opcode::Add => &[OperandKind::Register, OperandKind::Register, OperandKind::Register],
        }
    }
}

/// Operand kinds in assembly source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandKind {
    /// `r<N>`
    Register,
    /// `#<N>`
    Immediate,
}

impl std::fmt::Display for OperandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperandKind::Register => f.write_str("register (r<N>)"),
            OperandKind::Immediate => f.write_str("immediate (#<N>)"),
        }
    }
}

/// A parsed operand token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Register(u8),
    Immediate(u8),
}

impl Operand {
    /// Parse `r<N>` or `#<N>`, where N is a decimal value that fits in 8 bits.
    pub fn parse(token: &str) -> Result<Self, SyntaxError> {
        let token = token.trim();
        let (kind, digits) = if let Some(rest) = token.strip_prefix('r') {
            (OperandKind::Register, rest)
        } else if let Some(rest) = token.strip_prefix('#') {
            (OperandKind::Immediate, rest)
        } else {
            return Err(SyntaxError::Malformed { operand: token.to_string() });
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(SyntaxError::Malformed { operand: token.to_string() });
        }
        let value: u8 = digits
            .parse()
            .map_err(|_| SyntaxError::ValueOutOfRange { operand: token.to_string() })?;

        Ok(match kind {
            OperandKind::Register => Operand::Register(value),
            OperandKind::Immediate => Operand::Immediate(value),
        })
    }

    /// The kind of this operand.
    pub const fn kind(&self) -> OperandKind {
        match self {
            Operand::Register(_) => OperandKind::Register,
            Operand::Immediate(_) => OperandKind::Immediate,
        }
    }

    /// The numeric value, whatever the kind.
    pub const fn value(&self) -> u8 {
        match *self {
            Operand::Register(v) | Operand::Immediate(v) => v,
        }
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Load data word: GR[dest] := MEM[addr]
    Load { dest: u8, addr: u8 },

    /// Store data word: MEM[addr] := GR[src]
    Store { src: u8, addr: u8 },

    /// Add registers: GR[dest] := GR[lhs] + GR[rhs] (mod 2^32)
    Add { dest: u8, lhs: u8, rhs: u8 },
}

impl Instruction {
    /// The opcode of this instruction.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Instruction::Load { .. } => Opcode::Load,
            Instruction::Store { .. } => Opcode::Store,
            Instruction::Add { .. } => Opcode::Add,
        }
    }

    /// Build an instruction from source operand tokens, validating them
    /// against the opcode's signature.
    pub fn from_operands(opcode: Opcode, tokens: &[&str]) -> Result<Self, SyntaxError> {
        let signature = opcode.signature();
        if tokens.len() != signature.len() {
            return Err(SyntaxError::OperandCount {
                mnemonic: opcode.mnemonic(),
                expected: signature.len(),
                got: tokens.len(),
            });
        }

        let mut values = [0u8; 3];
        for (i, (token, &expected)) in tokens.iter().zip(signature).enumerate() {
            let operand = Operand::parse(token)?;
            if operand.kind() != expected {
                return Err(SyntaxError::WrongKind {
                    operand: token.trim().to_string(),
                    position: i + 1,
                    expected,
                });
            }
            values[i] = operand.value();
        }

        Ok(match opcode {
            Opcode::Load => Instruction::Load { dest: values[0], addr: values[1] },
            Opcode::Store => Instruction::Store { src: values[0], addr: values[1] },
            Opcode::Add => Instruction::Add { dest: values[0], lhs: values[1], rhs: values[2] },
        })
    }
}

/// Decode an instruction word.
pub fn decode(word: Word) -> Result<Instruction, DecodeError> {
    let [op, f1, f2, f3] = word.fields();

    let instruction = match Opcode::from_byte(op) {
        Some(Opcode::Load) => Instruction::Load { dest: f3, addr: f1 },
        Some(Opcode::Store) => Instruction::Store { src: f1, addr: f3 },
        Some(Opcode::Add) => Instruction::Add { dest: f3, lhs: f1, rhs: f2 },
        None => return Err(DecodeError::UnknownOpcode(op)),
    };

    Ok(instruction)
}

/// Encode an instruction to a word.
pub fn encode(instr: &Instruction) -> Word {
    let op = instr.opcode() as u8;
    let fields = match *instr {
        Instruction::Load { dest, addr } => [op, addr, 0, dest],
        Instruction::Store { src, addr } => [op, src, 0, addr],
        Instruction::Add { dest, lhs, rhs } => [op, lhs, rhs, dest],
    };
    Word::from_fields(fields)
}

/// Malformed assembly operands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    #[error("{mnemonic} takes {expected} operands, got {got}")]
    OperandCount { mnemonic: &'static str, expected: usize, got: usize },

    #[error("operand {position} `{operand}` should be a {expected}")]
    WrongKind { operand: String, position: usize, expected: OperandKind },

    #[error("malformed operand `{operand}`")]
    Malformed { operand: String },

    #[error("operand `{operand}` does not fit in 8 bits")]
    ValueOutOfRange { operand: String },
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),
}
