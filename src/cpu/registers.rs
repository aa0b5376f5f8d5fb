//! CPU registers.
//!
//! The machine has 3 registers:
//! - AC: signed accumulator (wraps on overflow)
//! - PC: index of the next instruction to fetch
//! - IR: the most recently fetched instruction, for display

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::cpu::instruction::{Address, Instruction, Word};

/// Register names, used when reporting which register changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Register {
    Ac,
    Pc,
    Ir,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Register::Ac => "AC",
            Register::Pc => "PC",
            Register::Ir => "IR",
        })
    }
}

/// The register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// AC: accumulator
    pub ac: Word,

    /// PC: program counter
    pub pc: Address,

    /// IR: instruction register, empty until the first fetch
    pub ir: Option<Instruction>,
}

impl Registers {
    /// Create a new register file with all values cleared.
    pub fn new() -> Self {
        Self {
            ac: 0,
            pc: 0,
            ir: None,
        }
    }

    /// Reset all registers.
    pub fn reset(&mut self) {
        self.ac = 0;
        self.pc = 0;
        self.ir = None;
    }

    /// Increment the program counter by 1.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> Address {
        let old = self.pc;
        self.pc += 1;
        old
    }

    /// Replace the accumulator, returning the old value.
    pub fn set_ac(&mut self, value: Word) -> Word {
        std::mem::replace(&mut self.ac, value)
    }

    /// IR as text, `-` when empty.
    pub fn ir_text(&self) -> String {
        match self.ir {
            Some(instr) => instr.to_string(),
            None => "-".to_string(),
        }
    }
}
