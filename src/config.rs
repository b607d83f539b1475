//! Machine configuration.
//!
//! Everything here is fixed at construction time. A config can be read
//! from JSON; missing fields take their defaults:
//!
//! ```json
//! { "memory_bytes": 256, "data": [10, 15], "max_cycles": 10000 }
//! ```

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::bits::Word;
use crate::cpu::memory::DEFAULT_ADDRESS_LEN;

/// Default instruction budget for a run.
pub const DEFAULT_MAX_CYCLES: u64 = 10_000;

/// Construction-time parameters for a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Memory size in bytes. Must be a whole number of words.
    pub memory_bytes: usize,
    /// Initial data words, written from word 0 upward.
    pub data: Vec<u32>,
    /// Instruction budget used by callers that run with a limit.
    pub max_cycles: u64,
}

impl MachineConfig {
    /// Load a config from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Parse a config from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values a machine cannot be built from.
    ///
    /// The halt test compares `PC * 4` against the byte length, so memory
    /// must hold a whole number of words.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_bytes % Word::BYTES != 0 {
            return Err(ConfigError::Misaligned { memory_bytes: self.memory_bytes });
        }
        Ok(())
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_bytes: DEFAULT_ADDRESS_LEN,
            data: Vec::new(),
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }
}

/// Errors that can occur while loading a config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid config: {0}")]
    Json(String),

    #[error("memory size {memory_bytes} is not a multiple of 4 bytes")]
    Misaligned { memory_bytes: usize },
}
