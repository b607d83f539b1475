//! CPU execution engine.
//!
//! Implements the fetch-decode-execute cycle:
//!
//! ```text
//! MAR := PC; MDR := MEM[MAR]; IR := MDR     (fetch)
//! decode IR, execute                         (decode/execute)
//! PC := PC + 1                               (advance)
//! ```
//!
//! There is no halt instruction. The machine stops once `PC * 4` reaches
//! the end of memory, i.e. after the last word of the program region.

use std::fmt;
use crate::asm::assembler::{compile, AssemblerError, Program};
use crate::bits::{adder, Word};
use crate::config::{ConfigError, MachineConfig};
use crate::cpu::isa::{self, DecodeError, Instruction};
use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::registers::{RegisterError, RegisterName, Registers};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, error, trace, warn};

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// No program loaded yet.
    Uninitialized,
    /// Waiting to fetch the next instruction.
    Ready,
    /// Moving the next instruction into IR.
    Fetching,
    /// Decoding and executing the instruction in IR.
    Executing,
    /// PC has run past the end of memory.
    Halted,
    /// A fatal error stopped execution.
    Faulted,
}

/// Cycle stage at which a fault happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Fetch,
    Decode,
    Execute,
    Advance,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Decode => "decode",
            Stage::Execute => "execute",
            Stage::Advance => "PC advance",
        };
        f.write_str(name)
    }
}

/// The CPU.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    config: MachineConfig,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create an uninitialized CPU sized by `config`.
    pub fn new(config: MachineConfig) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(config.memory_bytes),
            state: CpuState::Uninitialized,
            cycles: 0,
            config,
            last_instr: None,
        }
    }

    /// The configuration this CPU was built from.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Reset to a blank, uninitialized machine.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem = Memory::new(self.config.memory_bytes);
        self.state = CpuState::Uninitialized;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Write the initial data, assemble `source` into the top of memory,
    /// and point PC at the first instruction.
    pub fn initialize(&mut self, source: &str) -> Result<Program, CpuError> {
        self.reset();
        self.config.validate()?;
        self.mem.load_data(&self.config.data)?;
        debug!(words = self.config.data.len(), "data initialized");

        let program = compile(source, &mut self.mem)?;
        self.start_at(program.start, program.words.len())?;
        Ok(program)
    }

    /// Like [`Cpu::initialize`], for an already-assembled image.
    pub fn initialize_image(&mut self, words: &[Word]) -> Result<usize, CpuError> {
        self.reset();
        self.config.validate()?;
        self.mem.load_data(&self.config.data)?;
        debug!(words = self.config.data.len(), "data initialized");

        let start = self.mem.load_program(words)?;
        self.start_at(start, words.len())?;
        Ok(start)
    }

    fn start_at(&mut self, start: usize, len: usize) -> Result<(), CpuError> {
        if len > 0 && start < self.config.data.len() {
            return Err(CpuError::Layout {
                data_words: self.config.data.len(),
                program_start: start,
            });
        }

        let pc = u32::try_from(start).map_err(|_| CpuError::Layout {
            data_words: self.config.data.len(),
            program_start: start,
        })?;
        self.regs
            .set_pc(pc)
            .map_err(|e| self.fault(pc, Stage::Advance, e.into()))?;

        self.state = if self.program_is_end() {
            CpuState::Halted
        } else {
            CpuState::Ready
        };
        debug!(pc, state = ?self.state, "PC initialized");
        Ok(())
    }

    /// MAR := PC; MDR := MEM[MAR]; IR := MDR.
    pub fn fetch_instruction(&mut self) -> Result<Word, FaultKind> {
        let pc = self.regs.read(RegisterName::Pc, 0)?;
        self.regs.write(RegisterName::Mar, pc, 0)?;

        let addr = self.regs.read(RegisterName::Mar, 0)?.to_u32() as usize;
        let word = self.mem.read_word(addr)?;
        self.regs.write(RegisterName::Mdr, word, 0)?;

        let ir = self.regs.read(RegisterName::Mdr, 0)?;
        self.regs.write(RegisterName::Ir, ir, 0)?;

        trace!(addr, ir = %ir, "fetched");
        Ok(ir)
    }

    /// Decode the instruction in IR and execute it.
    pub fn decode_and_execute(&mut self) -> Result<Instruction, FaultKind> {
        let ir = self.regs.read(RegisterName::Ir, 0)?;
        let instr = isa::decode(ir)?;
        self.execute(instr)?;
        Ok(instr)
    }

    /// PC := PC + 1.
    pub fn advance_pc(&mut self) -> Result<(), FaultKind> {
        let pc = self.regs.pc()?;
        self.regs.set_pc(pc.wrapping_add(1))?;
        Ok(())
    }

    /// Whether PC has moved past the end of memory.
    pub fn program_is_end(&self) -> bool {
        self.regs
            .pc()
            .map_or(true, |pc| pc as u64 * 4 >= self.mem.len() as u64)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error. Any error
    /// leaves the CPU in [`CpuState::Faulted`].
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Ready {
            return Err(CpuError::NotRunning(self.state));
        }

        let pc = self.regs.pc().map_err(|e| self.fault(0, Stage::Fetch, e.into()))?;

        // Fetch
        self.state = CpuState::Fetching;
        self.fetch_instruction()
            .map_err(|e| self.fault(pc, Stage::Fetch, e))?;

        // Decode and execute
        self.state = CpuState::Executing;
        let instr = self.decode_and_execute().map_err(|e| {
            let stage = match e {
                FaultKind::Decode(_) => Stage::Decode,
                _ => Stage::Execute,
            };
            self.fault(pc, stage, e)
        })?;

        // Advance
        self.advance_pc()
            .map_err(|e| self.fault(pc, Stage::Advance, e))?;

        self.cycles += 1;
        self.last_instr = Some(instr);
        self.state = if self.program_is_end() {
            CpuState::Halted
        } else {
            CpuState::Ready
        };

        Ok(instr)
    }

    /// Run until the halt predicate holds or an error occurs.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        if self.state == CpuState::Uninitialized {
            return Err(CpuError::NotRunning(self.state));
        }
        let start_cycles = self.cycles;

        while self.state == CpuState::Ready {
            self.step()?;
        }

        debug!(cycles = self.cycles - start_cycles, state = ?self.state, "run finished");
        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        if self.state == CpuState::Uninitialized {
            return Err(CpuError::NotRunning(self.state));
        }
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == CpuState::Ready && self.cycles < limit {
            self.step()?;
        }

        if self.state == CpuState::Ready {
            warn!(max_cycles, "cycle limit reached before halt");
        }
        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction.
    ///
    /// Each instruction reads all of its operands before its single write,
    /// so a failing instruction changes neither registers nor memory.
    fn execute(&mut self, instr: Instruction) -> Result<(), FaultKind> {
        match instr {
            Instruction::Load { dest, addr } => {
                let value = self.mem.read_word(addr as usize)?;
                self.regs.set_gpr(dest as usize, value)?;
                trace!(dest, addr, value = value.to_u32(), "load");
            }

            Instruction::Store { src, addr } => {
                let value = self.regs.gpr(src as usize)?;
                let boundary = self.mem.program_index();
                self.mem.write_word(addr as usize, value, false)?;
                self.rebase_pc(boundary)?;
                trace!(src, addr, value = value.to_u32(), "store");
            }

            Instruction::Add { dest, lhs, rhs } => {
                let a = self.regs.gpr(lhs as usize)?;
                let b = self.regs.gpr(rhs as usize)?;
                let sum = adder::add(&a, &b);
                self.regs.set_gpr(dest as usize, sum)?;
                trace!(dest, lhs, rhs, a = a.to_u32(), b = b.to_u32(), sum = sum.to_u32(), "add");
            }
        }

        Ok(())
    }

    /// Follow the program region if a data write grew memory in front of it.
    fn rebase_pc(&mut self, old_boundary: usize) -> Result<(), FaultKind> {
        let shift = self.mem.program_index() - old_boundary;
        if shift > 0 {
            let pc = self.regs.pc()?;
            let rebased = pc.wrapping_add((shift / Word::BYTES) as u32);
            self.regs.set_pc(rebased)?;
            debug!(from = pc, to = rebased, "program region moved, PC rebased");
        }
        Ok(())
    }

    fn fault(&mut self, pc: u32, stage: Stage, source: FaultKind) -> CpuError {
        self.state = CpuState::Faulted;
        error!(pc, %stage, %source, "CPU fault");
        CpuError::Fault { pc, stage, source }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU can execute another instruction.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Ready
    }

    /// Capture the visible machine state.
    pub fn snapshot(&self) -> Snapshot {
        let read = |name| self.regs.read(name, 0).map(|w| w.to_u32()).unwrap_or_default();
        Snapshot {
            state: self.state,
            cycles: self.cycles,
            pc: read(RegisterName::Pc),
            mar: read(RegisterName::Mar),
            mdr: read(RegisterName::Mdr),
            ir: read(RegisterName::Ir),
            gpr: (0..self.regs.gr.len())
                .map(|i| self.regs.gpr(i).map(|w| w.to_u32()).unwrap_or_default())
                .collect(),
            memory_bytes: self.mem.len(),
            program_start: self.mem.program_start(),
            data: self
                .mem
                .dump(0, self.mem.program_start())
                .into_iter()
                .map(|(_, w)| w.to_u32())
                .collect(),
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(MachineConfig::default())
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("pc", &self.regs.pc().ok())
            .field("mem", &self.mem)
            .finish()
    }
}

/// Plain-number view of the machine, for JSON output and front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: CpuState,
    pub cycles: u64,
    pub pc: u32,
    pub mar: u32,
    pub mdr: u32,
    pub ir: u32,
    pub gpr: Vec<u32>,
    pub memory_bytes: usize,
    pub program_start: usize,
    /// Data-region words, from word 0 up to the program start.
    pub data: Vec<u32>,
}

/// The underlying cause of a CPU fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultKind {
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("register error: {0}")]
    Register(#[from] RegisterError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("{stage} fault at PC={pc}: {source}")]
    Fault { pc: u32, stage: Stage, source: FaultKind },

    #[error("bad machine config: {0}")]
    Config(#[from] ConfigError),

    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblerError),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("program starting at word {program_start} overlaps {data_words} data words")]
    Layout { data_words: usize, program_start: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::isa::encode;

    const ADD_PROGRAM: &str = "Load r1, #0\nLoad r2, #1\nAdd r3, r1, r2\nStore r3, #3\n";

    fn cpu_with_data(data: &[u32]) -> Cpu {
        Cpu::new(MachineConfig {
            data: data.to_vec(),
            ..MachineConfig::default()
        })
    }

    #[test]
    fn test_add_program() {
        let mut cpu = cpu_with_data(&[10, 15]);
        let program = cpu.initialize(ADD_PROGRAM).unwrap();
        assert_eq!(program.start, 60);
        assert_eq!(cpu.regs.pc().unwrap(), 60);
        assert!(cpu.is_running());

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 4);
        assert!(cpu.is_halted());
        assert_eq!(cpu.mem.read_word(3).unwrap().to_u32(), 25);
        assert_eq!(cpu.regs.gpr(3).unwrap().to_u32(), 25);
        assert_eq!(cpu.regs.pc().unwrap(), 64);
    }

    #[test]
    fn test_fetch_fills_mar_mdr_ir() {
        let mut cpu = cpu_with_data(&[10, 15]);
        cpu.initialize(ADD_PROGRAM).unwrap();

        let word = cpu.fetch_instruction().unwrap();

        assert_eq!(word.to_u32(), 0x8100_0001);
        assert_eq!(cpu.regs.read(RegisterName::Mar, 0).unwrap().to_u32(), 60);
        assert_eq!(cpu.regs.read(RegisterName::Mdr, 0).unwrap(), word);
        assert_eq!(cpu.regs.read(RegisterName::Ir, 0).unwrap(), word);
        // Fetch does not move PC.
        assert_eq!(cpu.regs.pc().unwrap(), 60);
    }

    #[test]
    fn test_step_by_step() {
        let mut cpu = cpu_with_data(&[10, 15]);
        cpu.initialize(ADD_PROGRAM).unwrap();

        assert_eq!(cpu.step().unwrap(), Instruction::Load { dest: 1, addr: 0 });
        assert_eq!(cpu.regs.gpr(1).unwrap().to_u32(), 10);
        assert_eq!(cpu.regs.pc().unwrap(), 61);
        assert_eq!(cpu.last_instruction(), Some(Instruction::Load { dest: 1, addr: 0 }));
        assert_eq!(cpu.cycles, 1);
    }

    #[test]
    fn test_add_wraps() {
        let mut cpu = cpu_with_data(&[u32::MAX, 1]);
        cpu.initialize("Load r1, #0\nLoad r2, #1\nAdd r0, r1, r2\n").unwrap();
        cpu.run().unwrap();
        assert_eq!(cpu.regs.gpr(0).unwrap().to_u32(), 0);
    }

    #[test]
    fn test_store_then_load() {
        let mut cpu = cpu_with_data(&[0xCAFE_F00D]);
        cpu.initialize("Load r5, #0\nStore r5, #7\nLoad r6, #7\n").unwrap();
        cpu.run().unwrap();
        assert_eq!(cpu.regs.gpr(6).unwrap().to_u32(), 0xCAFE_F00D);
        assert_eq!(cpu.mem.read_word(7).unwrap().to_u32(), 0xCAFE_F00D);
    }

    #[test]
    fn test_register_out_of_bounds_faults_cleanly() {
        let mut cpu = cpu_with_data(&[10, 15]);
        cpu.initialize("Load r1, #0\nAdd r40, r1, r1\nLoad r2, #1\n").unwrap();

        cpu.step().unwrap();
        let gpr_before = cpu.snapshot().gpr;
        let mem_before = cpu.mem.dump(0, cpu.mem.word_count());

        let err = cpu.step().unwrap_err();

        assert_eq!(
            err,
            CpuError::Fault {
                pc: 62,
                stage: Stage::Execute,
                source: FaultKind::Register(RegisterError::Bounds {
                    name: RegisterName::Gr,
                    index: 40,
                    count: 32,
                }),
            }
        );
        assert_eq!(cpu.state, CpuState::Faulted);
        assert_eq!(cpu.snapshot().gpr, gpr_before);
        assert_eq!(cpu.mem.dump(0, cpu.mem.word_count()), mem_before);
        assert!(matches!(cpu.step(), Err(CpuError::NotRunning(CpuState::Faulted))));
    }

    #[test]
    fn test_source_register_out_of_bounds() {
        let mut cpu = cpu_with_data(&[1]);
        cpu.initialize("Store r32, #0\n").unwrap();
        let err = cpu.run().unwrap_err();
        assert!(matches!(err, CpuError::Fault { stage: Stage::Execute, .. }));
        assert_eq!(cpu.mem.read_word(0).unwrap().to_u32(), 1);
    }

    #[test]
    fn test_load_out_of_range() {
        let mut cpu = Cpu::new(MachineConfig { memory_bytes: 16, ..MachineConfig::default() });
        cpu.initialize("Load r1, #200\n").unwrap();
        let err = cpu.run().unwrap_err();
        assert!(matches!(
            err,
            CpuError::Fault {
                pc: 3,
                stage: Stage::Execute,
                source: FaultKind::Memory(MemoryError::OutOfRange { index: 200, .. }),
            }
        ));
        assert!(cpu.regs.gpr(1).unwrap().is_zero());
    }

    #[test]
    fn test_unknown_opcode_faults_in_decode() {
        let mut cpu = Cpu::default();
        cpu.initialize_image(&[Word::from_u32(0x0100_0000)]).unwrap();
        let err = cpu.run().unwrap_err();
        assert_eq!(
            err,
            CpuError::Fault {
                pc: 63,
                stage: Stage::Decode,
                source: FaultKind::Decode(DecodeError::UnknownOpcode(0x01)),
            }
        );
    }

    #[test]
    fn test_empty_program_halts_immediately() {
        let mut cpu = cpu_with_data(&[10, 15]);
        cpu.initialize("").unwrap();
        assert!(cpu.is_halted());
        assert_eq!(cpu.run().unwrap(), 0);
        assert_eq!(cpu.cycles, 0);
    }

    #[test]
    fn test_assembly_error_never_executes() {
        let mut cpu = cpu_with_data(&[10, 15]);
        let err = cpu.initialize("Load r1, #0\nAdd r1, #2, r3\n").unwrap_err();
        assert!(matches!(err, CpuError::Assembly(AssemblerError::Syntax { line: 2, .. })));
        assert_eq!(cpu.state, CpuState::Uninitialized);
        assert!(matches!(cpu.run(), Err(CpuError::NotRunning(CpuState::Uninitialized))));
    }

    #[test]
    fn test_program_overlapping_data_is_rejected() {
        let mut cpu = Cpu::new(MachineConfig {
            memory_bytes: 16,
            data: vec![1, 2, 3],
            ..MachineConfig::default()
        });
        let err = cpu.initialize("Load r1, #0\nLoad r2, #1\n").unwrap_err();
        assert_eq!(err, CpuError::Layout { data_words: 3, program_start: 2 });
    }

    #[test]
    fn test_store_growth_rebases_pc() {
        let mut cpu = Cpu::new(MachineConfig {
            memory_bytes: 16,
            data: vec![7],
            ..MachineConfig::default()
        });
        cpu.initialize("Load r1, #0\nStore r1, #3\nAdd r2, r1, r1\n").unwrap();
        assert_eq!(cpu.mem.program_start(), 1);

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 3);
        assert!(cpu.is_halted());
        assert_eq!(cpu.mem.len(), 28);
        assert_eq!(cpu.mem.program_start(), 4);
        assert_eq!(cpu.mem.read_word(3).unwrap().to_u32(), 7);
        assert_eq!(cpu.regs.gpr(2).unwrap().to_u32(), 14);
        // Program words survived the move.
        assert_eq!(
            cpu.mem.read_word(4).unwrap(),
            encode(&Instruction::Load { dest: 1, addr: 0 })
        );
    }

    #[test]
    fn test_run_limited() {
        let mut cpu = cpu_with_data(&[10, 15]);
        cpu.initialize(ADD_PROGRAM).unwrap();
        assert_eq!(cpu.run_limited(2).unwrap(), 2);
        assert!(cpu.is_running());
        assert_eq!(cpu.run_limited(10).unwrap(), 2);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_snapshot() {
        let mut cpu = cpu_with_data(&[10, 15]);
        cpu.initialize(ADD_PROGRAM).unwrap();
        cpu.run().unwrap();

        let snap = cpu.snapshot();

        assert_eq!(snap.state, CpuState::Halted);
        assert_eq!(snap.cycles, 4);
        assert_eq!(snap.pc, 64);
        assert_eq!(snap.gpr.len(), 32);
        assert_eq!(snap.gpr[3], 25);
        assert_eq!(snap.data.len(), 60);
        assert_eq!(&snap.data[..4], &[10, 15, 0, 25]);
        assert_eq!(snap.ir, 0x8203_0003);
    }

    #[test]
    fn test_reset() {
        let mut cpu = cpu_with_data(&[10, 15]);
        cpu.initialize(ADD_PROGRAM).unwrap();
        cpu.run().unwrap();
        cpu.reset();
        assert_eq!(cpu.state, CpuState::Uninitialized);
        assert_eq!(cpu.cycles, 0);
        assert!(cpu.mem.read_word(3).unwrap().is_zero());
    }

    #[test]
    fn test_unaligned_memory_is_rejected() {
        let mut cpu = Cpu::new(MachineConfig { memory_bytes: 10, ..MachineConfig::default() });

        let err = cpu.initialize("Add r1, r1, r1").unwrap_err();
        assert_eq!(err, CpuError::Config(ConfigError::Misaligned { memory_bytes: 10 }));
        assert_eq!(cpu.state, CpuState::Uninitialized);

        let word = encode(&Instruction::Add { dest: 1, lhs: 1, rhs: 1 });
        assert!(matches!(cpu.initialize_image(&[word]), Err(CpuError::Config(_))));
        assert!(matches!(cpu.run(), Err(CpuError::NotRunning(CpuState::Uninitialized))));
    }
}
