//! Simulator configuration.
//!
//! Everything here is presentation: delays between animated micro-steps and
//! editor defaults. None of it changes what a program computes.

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::cpu::instruction::Address;

/// Delays, in milliseconds, for each pacing phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause after an instruction handler runs.
    pub execute_ms: u64,
    /// Pause after the program counter advances.
    pub advance_pc_ms: u64,
    /// Pause between steps of a run.
    pub between_steps_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig {
            execute_ms: 800,
            advance_pc_ms: 500,
            between_steps_ms: 1000,
        }
    }
}

impl PacingConfig {
    /// No delays at all.
    pub fn instant() -> Self {
        PacingConfig {
            execute_ms: 0,
            advance_pc_ms: 0,
            between_steps_ms: 0,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub pacing: PacingConfig,

    /// Operand given to an instruction retyped from HLT.
    pub default_operand: Address,

    /// Interval between run ticks in the terminal debugger.
    pub tick_ms: u64,

    /// Rows in a generated program, HLT included.
    pub generate_count: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            pacing: PacingConfig::default(),
            default_operand: 10,
            tick_ms: 250,
            generate_count: 4,
        }
    }
}

impl SimConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = SimConfig::from_json(r#"{ "pacing": { "execute_ms": 5 } }"#).unwrap();
        assert_eq!(cfg.pacing.execute_ms, 5);
        assert_eq!(cfg.pacing.advance_pc_ms, 500);
        assert_eq!(cfg.default_operand, 10);
        assert_eq!(cfg.generate_count, 4);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(SimConfig::from_json("{}").unwrap(), SimConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(SimConfig::from_json("{ nope"), Err(ConfigError::Json(_))));
    }
}
