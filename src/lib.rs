//! # Sison CPU
//!
//! A fetch-decode-execute visualizer for a tiny single-accumulator CPU.
//!
//! The machine has an accumulator, a program counter and an instruction
//! register, five instructions (LOAD, STORE, ADD, SUB, HLT) and a sparse data
//! memory. Every step is narrated so students can follow the cycle.

pub mod cpu;
pub mod asm;
pub mod config;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{
    Address, Engine, EngineEvent, ExecState, Instruction, Memory, Observer, Opcode, Program,
    Registers, RunOutcome, StepResult, Word,
};
pub use asm::{assemble, generate, listing, load_file, Assembly, AssemblerError, LoadError};
pub use config::SimConfig;

#[cfg(feature = "tui")]
pub use tui::run_debugger;
