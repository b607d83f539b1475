//! WebAssembly bindings for the vn32 machine.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::{Cpu, MachineConfig, Word};
use crate::asm::assembler::assemble;
use crate::asm::disasm::{disassemble_instruction, format_instruction};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_err(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    source: String,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU with `memory_bytes` bytes of memory.
    #[wasm_bindgen(constructor)]
    pub fn new(memory_bytes: usize) -> Self {
        let config = MachineConfig { memory_bytes, ..MachineConfig::default() };
        Self {
            cpu: Cpu::new(config),
            source: String::new(),
        }
    }

    /// Load `data` words and assemble `source` into memory.
    /// Returns the word index of the first instruction.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str, data: Vec<u32>) -> Result<usize, JsError> {
        let config = MachineConfig { data, ..self.cpu.config().clone() };
        self.cpu = Cpu::new(config);
        let program = self.cpu.initialize(source).map_err(js_err)?;
        self.source = source.to_string();
        Ok(program.start)
    }

    /// Step one instruction. Returns the executed instruction as text.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let instr = self.cpu.step().map_err(js_err)?;
        Ok(format_instruction(&instr))
    }

    /// Run until halt or `max_cycles` instructions. Returns total cycles.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        self.cpu.run_limited(u64::from(max_cycles)).map_err(js_err)?;
        Ok(self.cpu.cycles)
    }

    /// Reload the last program with the same data.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        if self.source.is_empty() {
            self.cpu.reset();
            return Ok(());
        }
        self.cpu.initialize(&self.source).map_err(js_err)?;
        Ok(())
    }

    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Program counter, as a word index.
    #[wasm_bindgen]
    pub fn pc(&self) -> u32 {
        self.cpu.regs.pc().unwrap_or_default()
    }

    /// General-purpose register `index`, or 0 when out of range.
    #[wasm_bindgen]
    pub fn register(&self, index: usize) -> u32 {
        self.cpu.regs.gpr(index).map(|w| w.to_u32()).unwrap_or_default()
    }

    /// Memory word `index`, or 0 when out of range.
    #[wasm_bindgen]
    pub fn memory_word(&self, index: usize) -> u32 {
        self.cpu.mem.read_word(index).map(|w| w.to_u32()).unwrap_or_default()
    }

    /// Current memory size in bytes.
    #[wasm_bindgen]
    pub fn memory_bytes(&self) -> usize {
        self.cpu.mem.len()
    }

    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// Full machine state as JSON.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.snapshot()).map_err(js_err)
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new(crate::cpu::memory::DEFAULT_ADDRESS_LEN)
    }
}

/// Assemble source code and return the encoded words.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<Vec<u32>, JsError> {
    let instructions = assemble(source).map_err(js_err)?;
    Ok(instructions
        .iter()
        .map(|i| crate::cpu::isa::encode(i).to_u32())
        .collect())
}

/// Disassemble a single 32-bit word.
#[wasm_bindgen]
pub fn wasm_disassemble(value: u32) -> String {
    disassemble_instruction(Word::from_u32(value))
}
