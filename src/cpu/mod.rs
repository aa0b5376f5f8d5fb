//! CPU emulation for the accumulator machine.
//!
//! This module implements the whole machine:
//! - sparse data memory, unset cells read as zero
//! - 3 registers: AC (accumulator), PC (program counter), IR (instruction register)
//! - 5-instruction set: LOAD, STORE, ADD, SUB, HLT

pub mod instruction;
pub mod memory;
pub mod registers;
pub mod program;
pub mod events;
pub mod pacing;
pub mod execute;

pub use instruction::{Address, Instruction, Opcode, ParseInstructionError, Word};
pub use memory::Memory;
pub use registers::{Register, Registers};
pub use program::{Program, ProgramEntry, ProgramError, ProgramWarning};
pub use events::{EngineEvent, NarrationLog, Observer};
pub use pacing::{NoPacing, Pacing, Phase, SleepPacing};
pub use execute::{Effect, Engine, ExecState, RunOutcome, Snapshot, StepResult};
