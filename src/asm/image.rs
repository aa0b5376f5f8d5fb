//! JSON program images.
//!
//! An image holds a program and its initial memory:
//! ```json
//! {
//!   "instructions": [
//!     { "address": 0, "type": "LOAD", "operand": 5 },
//!     { "address": 1, "type": "HLT" }
//!   ],
//!   "memory": { "5": 3 }
//! }
//! ```

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::asm::assembler::Assembly;
use crate::cpu::{Memory, Program, ProgramEntry, ProgramError};

/// On-disk form of a program and its memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramImage {
    pub instructions: Vec<ProgramEntry>,
    #[serde(default)]
    pub memory: Memory,
}

impl ProgramImage {
    pub fn new(program: &Program, memory: &Memory) -> Self {
        Self {
            instructions: program.entries(),
            memory: memory.clone(),
        }
    }

    /// Validate and convert into a runnable program.
    pub fn into_assembly(self) -> Result<Assembly, ImageError> {
        Ok(Assembly {
            program: Program::from_entries(self.instructions)?,
            memory: self.memory,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, ImageError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ImageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<&Assembly> for ProgramImage {
    fn from(asm: &Assembly) -> Self {
        Self::new(&asm.program, &asm.memory)
    }
}

/// Load an image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Assembly, ImageError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    ProgramImage::from_json(&text)?.into_assembly()
}

/// Save an image to disk.
pub fn save_image<P: AsRef<Path>>(path: P, asm: &Assembly) -> Result<(), ImageError> {
    let json = ProgramImage::from(asm).to_json()?;
    std::fs::write(path.as_ref(), json + "\n")?;
    Ok(())
}

/// Errors that can occur during image operations.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid program: {0}")]
    Program(#[from] ProgramError),
}
