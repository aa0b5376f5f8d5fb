//! WebAssembly bindings for the simulator.
//!
//! This module provides JavaScript-friendly wrappers around the engine, for a
//! browser front end that renders the registers, memory and narration itself.

use wasm_bindgen::prelude::*;
use crate::asm::assembler::assemble;
use crate::asm::generate::generate;
use crate::asm::image::ProgramImage;
use crate::cpu::{Instruction, ParseInstructionError, StepResult};
use crate::Engine;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly engine wrapper.
#[wasm_bindgen]
pub struct WasmEngine {
    engine: Engine,
}

#[wasm_bindgen]
impl WasmEngine {
    /// Create an engine with an empty program.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            engine: Engine::new(),
        }
    }

    /// Load a program from assembly source code. Returns the instruction count.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let asm = assemble(source).map_err(|e| JsError::new(&e.to_string()))?;
        let len = asm.program.len();
        self.engine.load(asm.program, asm.memory);
        Ok(len)
    }

    /// Load a program from a JSON image. Returns the instruction count.
    #[wasm_bindgen]
    pub fn load_json(&mut self, json: &str) -> Result<usize, JsError> {
        let asm = ProgramImage::from_json(json)
            .and_then(ProgramImage::into_assembly)
            .map_err(|e| JsError::new(&e.to_string()))?;
        let len = asm.program.len();
        self.engine.load(asm.program, asm.memory);
        Ok(len)
    }

    /// Load a random program of `count` rows ending in HLT, with its data
    /// cells seeded. Returns the instruction count.
    #[wasm_bindgen]
    pub fn generate(&mut self, count: usize) -> usize {
        let asm = generate(count, &mut rand::thread_rng());
        let len = asm.program.len();
        self.engine.load(asm.program, asm.memory);
        len
    }

    /// Step one instruction. Returns a short description of what happened.
    #[wasm_bindgen]
    pub fn step(&mut self) -> String {
        match self.engine.step() {
            StepResult::Executed { effect, .. } => effect.to_string(),
            StepResult::Halted => "Program Halted.".into(),
            StepResult::Completed => "Program completed.".into(),
            StepResult::AlreadyHalted => "Program already halted.".into(),
        }
    }

    /// Run to completion without pacing. Returns the outcome as text.
    #[wasm_bindgen]
    pub fn run(&mut self) -> String {
        format!("{:?}", self.engine.run())
    }

    /// Reset registers and restart narration; program and memory stay.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// Replace one instruction, given as text such as `ADD 6`.
    #[wasm_bindgen]
    pub fn set_instruction(&mut self, address: usize, text: &str) -> Result<(), JsError> {
        let instr: Instruction = text
            .parse()
            .map_err(|e: ParseInstructionError| JsError::new(&e.to_string()))?;
        self.engine
            .program_mut()
            .set(address, instr)
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(())
    }

    /// Write a memory cell.
    #[wasm_bindgen]
    pub fn set_memory(&mut self, address: usize, value: i64) {
        self.engine.mem.write(address, value);
    }

    /// Read a memory cell (zero if unset).
    #[wasm_bindgen]
    pub fn memory_at(&self, address: usize) -> i64 {
        self.engine.mem.read(address)
    }

    /// Data addresses in order of first use.
    #[wasm_bindgen]
    pub fn data_addresses(&self) -> Vec<usize> {
        self.engine.program().data_addresses()
    }

    /// Check if the engine is halted.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.engine.is_halted()
    }

    /// Get accumulator value.
    #[wasm_bindgen]
    pub fn ac(&self) -> i64 {
        self.engine.regs.ac
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> usize {
        self.engine.regs.pc
    }

    /// Get instruction register as text, `-` when empty.
    #[wasm_bindgen]
    pub fn ir(&self) -> String {
        self.engine.regs.ir_text()
    }

    /// Get state as string.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.engine.state())
    }

    /// Narration lines as a JS array of strings.
    #[wasm_bindgen]
    pub fn narration(&self) -> js_sys::Array {
        self.engine
            .narration()
            .iter()
            .map(|line| JsValue::from_str(line))
            .collect()
    }

    /// Full state as a JSON string.
    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.engine.snapshot()).map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the instruction count.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<usize, JsError> {
    let asm = assemble(source).map_err(|e| JsError::new(&e.to_string()))?;
    Ok(asm.program.len())
}
