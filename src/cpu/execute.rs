//! Execution engine.
//!
//! Implements the fetch-decode-execute cycle, the four instruction handlers
//! and the run/step/reset state machine.

use std::fmt;
use serde::{Serialize, Deserialize};
use crate::cpu::{Memory, Program, Registers};
use crate::cpu::events::{EngineEvent, NarrationLog, Observer};
use crate::cpu::instruction::{Address, Instruction, Word};
use crate::cpu::pacing::{NoPacing, Pacing, Phase};
use crate::cpu::registers::Register;

pub const MSG_RUN_STARTED: &str = "Starting program execution...";
pub const MSG_RUN_COMPLETED: &str = "Program execution completed.";
pub const MSG_STEP_COMPLETED: &str = "Program completed. Reset to run again.";
pub const MSG_ALREADY_HALTED: &str = "Program already halted. Reset to run again.";
pub const MSG_RESET: &str = "Program reset. Step or run to begin execution.";

/// Execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecState {
    /// Idle; stepping and running are allowed.
    Ready,
    /// Inside a run.
    Running,
    /// Executed HLT. Terminal until reset.
    Halted,
}

/// What an executed instruction changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// LOAD: AC replaced by `memory[source]`.
    Loaded { old: Word, new: Word, source: Address, value: Word },
    /// ADD: `memory[source]` added to AC.
    Added { old: Word, new: Word, source: Address, value: Word },
    /// SUB: `memory[source]` subtracted from AC.
    Subtracted { old: Word, new: Word, source: Address, value: Word },
    /// STORE: `memory[target]` replaced by AC.
    Stored { target: Address, old: Word, new: Word },
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Effect::Loaded { old, new, source, value } => {
                write!(f, "AC={}→{} (loaded from memory[{}]={})", old, new, source, value)
            }
            Effect::Added { old, new, source, value } => {
                write!(f, "AC={}→{} (added memory[{}]={})", old, new, source, value)
            }
            Effect::Subtracted { old, new, source, value } => {
                write!(f, "AC={}→{} (subtracted memory[{}]={})", old, new, source, value)
            }
            Effect::Stored { target, old, new } => {
                write!(f, "Memory[{}]={}→{} (stored from AC={})", target, old, new, new)
            }
        }
    }
}

/// Outcome of a single `step()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepResult {
    /// An instruction ran and PC advanced.
    Executed { instruction: Instruction, effect: Effect },
    /// HLT was fetched. PC is left pointing at it.
    Halted,
    /// PC is past the last instruction.
    Completed,
    /// The engine was already halted; nothing happened.
    AlreadyHalted,
}

impl StepResult {
    /// The before/after description of an executed instruction.
    pub fn narration(&self) -> Option<String> {
        match self {
            StepResult::Executed { effect, .. } => Some(effect.to_string()),
            _ => None,
        }
    }
}

/// Outcome of `run()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Reached HLT after `steps` instructions (HLT included).
    Halted { steps: u64 },
    /// Ran off the end of the program.
    Completed { steps: u64 },
    /// The run was paused from outside before finishing.
    Paused { steps: u64 },
    /// A run was already in progress; nothing happened.
    AlreadyRunning,
    /// The engine is halted; nothing happened.
    AlreadyHalted,
}

/// Serialisable view of engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: ExecState,
    pub ac: Word,
    pub pc: Address,
    pub ir: Option<String>,
    pub cycles: u64,
    pub memory: Memory,
    pub narration: Vec<String>,
}

/// The execution engine.
pub struct Engine {
    /// CPU registers.
    pub regs: Registers,
    /// Data memory.
    pub mem: Memory,
    /// Instructions executed since the last reset, HLT included.
    pub cycles: u64,
    program: Program,
    state: ExecState,
    narration: NarrationLog,
    pacing: Box<dyn Pacing>,
    observers: Vec<Box<dyn Observer>>,
    last_events: Vec<EngineEvent>,
}

impl Engine {
    /// Create an engine with an empty program and memory.
    pub fn new() -> Self {
        Self::with_program(Program::new(), Memory::new())
    }

    /// Create an engine for a program and its initial memory.
    pub fn with_program(program: Program, mem: Memory) -> Self {
        Self {
            regs: Registers::new(),
            mem,
            cycles: 0,
            program,
            state: ExecState::Ready,
            narration: NarrationLog::new(),
            pacing: Box::new(NoPacing),
            observers: Vec::new(),
            last_events: Vec::new(),
        }
    }

    /// Replace the pacing strategy.
    pub fn set_pacing(&mut self, pacing: impl Pacing + 'static) {
        self.pacing = Box::new(pacing);
    }

    /// Register an observer.
    pub fn add_observer(&mut self, observer: impl Observer + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Replace program and memory and start from a clean state.
    pub fn load(&mut self, program: Program, mem: Memory) {
        self.program = program;
        self.mem = mem;
        self.clear();
        tracing::info!(len = self.program.len(), "program loaded");
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Editor access to the program. Registers and state are left alone.
    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == ExecState::Halted
    }

    pub fn is_running(&self) -> bool {
        self.state == ExecState::Running
    }

    /// Narration recorded since the last reset.
    pub fn narration(&self) -> &[String] {
        self.narration.lines()
    }

    /// Events raised by the most recent step, for highlighting.
    pub fn last_events(&self) -> &[EngineEvent] {
        &self.last_events
    }

    /// Reset registers and state, and restart the narration log with a
    /// single reset line. Program and memory are kept.
    pub fn reset(&mut self) {
        self.clear();
        self.narrate(MSG_RESET);
        tracing::info!("engine reset");
    }

    fn clear(&mut self) {
        self.regs.reset();
        self.state = ExecState::Ready;
        self.cycles = 0;
        self.narration.clear();
        self.last_events.clear();
    }

    /// Execute exactly one instruction.
    pub fn step(&mut self) -> StepResult {
        self.last_events.clear();

        if self.state == ExecState::Halted {
            // The log is sealed, so this line is dropped.
            self.narrate(MSG_ALREADY_HALTED);
            tracing::debug!("step ignored: already halted");
            return StepResult::AlreadyHalted;
        }

        // Fetch
        let pc = self.regs.pc;
        let Some(instr) = self.program.get(pc) else {
            self.narrate(MSG_STEP_COMPLETED);
            tracing::debug!(pc, "step past end of program");
            return StepResult::Completed;
        };

        let effect = match instr {
            Instruction::Hlt => return self.halt(pc),
            Instruction::Load { addr } => {
                self.latch(instr);
                self.exec_load(addr)
            }
            Instruction::Add { addr } => {
                self.latch(instr);
                self.exec_add(addr)
            }
            Instruction::Sub { addr } => {
                self.latch(instr);
                self.exec_sub(addr)
            }
            Instruction::Store { addr } => {
                self.latch(instr);
                self.exec_store(addr)
            }
        };
        self.pacing.pause(Phase::Execute);

        self.regs.advance_pc();
        self.emit(EngineEvent::RegisterChanged(Register::Pc));
        self.pacing.pause(Phase::AdvancePc);

        self.cycles += 1;
        self.narrate(format!("PC={} IR={} {}", pc, instr, effect));
        tracing::debug!(pc, instruction = %instr, %effect, "step");

        StepResult::Executed { instruction: instr, effect }
    }

    /// Enter the running state. Returns false, doing nothing, if a run is
    /// already in progress or the engine is halted.
    pub fn start_run(&mut self) -> bool {
        if self.state != ExecState::Ready {
            tracing::debug!(state = ?self.state, "run not started");
            return false;
        }
        self.state = ExecState::Running;
        self.narrate(MSG_RUN_STARTED);
        tracing::debug!(pc = self.regs.pc, "run started");
        true
    }

    /// Advance a run by one step.
    ///
    /// Returns `None` when no run is in progress. When the program counter has
    /// reached the end, the run finishes and `Completed` is returned.
    pub fn tick(&mut self) -> Option<StepResult> {
        if self.state != ExecState::Running {
            return None;
        }

        if self.regs.pc >= self.program.len() {
            self.last_events.clear();
            self.narrate(MSG_RUN_COMPLETED);
            self.state = ExecState::Ready;
            tracing::info!(cycles = self.cycles, "run completed");
            return Some(StepResult::Completed);
        }

        Some(self.step())
    }

    /// Stop a run between steps. No effect unless running.
    pub fn pause(&mut self) {
        if self.state == ExecState::Running {
            self.state = ExecState::Ready;
            tracing::debug!(pc = self.regs.pc, "run paused");
        }
    }

    /// Run until halt or the end of the program.
    pub fn run(&mut self) -> RunOutcome {
        if !self.start_run() {
            return match self.state {
                ExecState::Halted => RunOutcome::AlreadyHalted,
                _ => RunOutcome::AlreadyRunning,
            };
        }

        let mut steps = 0;
        while let Some(result) = self.tick() {
            match result {
                StepResult::Executed { .. } => {
                    steps += 1;
                    self.pacing.pause(Phase::BetweenSteps);
                }
                StepResult::Halted => return RunOutcome::Halted { steps: steps + 1 },
                StepResult::Completed => return RunOutcome::Completed { steps },
                StepResult::AlreadyHalted => return RunOutcome::AlreadyHalted,
            }
        }

        RunOutcome::Paused { steps }
    }

    /// Capture the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            ac: self.regs.ac,
            pc: self.regs.pc,
            ir: self.regs.ir.map(|i| i.to_string()),
            cycles: self.cycles,
            memory: self.mem.clone(),
            narration: self.narration.lines().to_vec(),
        }
    }

    /// HLT: PC and IR stay put and the narration log is sealed.
    fn halt(&mut self, pc: Address) -> StepResult {
        self.narrate(format!("PC={} IR=HLT Program Halted.", pc));
        self.narration.seal();
        self.state = ExecState::Halted;
        self.cycles += 1;
        tracing::info!(pc, ac = self.regs.ac, "halted");
        StepResult::Halted
    }

    fn latch(&mut self, instr: Instruction) {
        self.regs.ir = Some(instr);
        self.emit(EngineEvent::RegisterChanged(Register::Ir));
    }

    fn exec_load(&mut self, addr: Address) -> Effect {
        let value = self.load_operand(addr);
        let old = self.regs.set_ac(value);
        self.emit(EngineEvent::RegisterChanged(Register::Ac));
        Effect::Loaded { old, new: value, source: addr, value }
    }

    fn exec_add(&mut self, addr: Address) -> Effect {
        let value = self.load_operand(addr);
        let new = self.regs.ac.wrapping_add(value);
        let old = self.regs.set_ac(new);
        self.emit(EngineEvent::RegisterChanged(Register::Ac));
        Effect::Added { old, new, source: addr, value }
    }

    fn exec_sub(&mut self, addr: Address) -> Effect {
        let value = self.load_operand(addr);
        let new = self.regs.ac.wrapping_sub(value);
        let old = self.regs.set_ac(new);
        self.emit(EngineEvent::RegisterChanged(Register::Ac));
        Effect::Subtracted { old, new, source: addr, value }
    }

    fn exec_store(&mut self, addr: Address) -> Effect {
        let new = self.regs.ac;
        let old = self.mem.write(addr, new);
        self.emit(EngineEvent::MemoryTouched { address: addr });
        Effect::Stored { target: addr, old, new }
    }

    /// Read an operand; unset cells read as zero.
    fn load_operand(&mut self, addr: Address) -> Word {
        let value = self.mem.read(addr);
        self.emit(EngineEvent::MemoryTouched { address: addr });
        value
    }

    fn narrate(&mut self, line: impl Into<String>) {
        let line = line.into();
        if self.narration.push(line.clone()) {
            self.notify(&EngineEvent::Narration(line));
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        tracing::trace!(?event, "engine event");
        self.notify(&event);
        self.last_events.push(event);
    }

    fn notify(&mut self, event: &EngineEvent) {
        for observer in &mut self.observers {
            observer.on_event(event);
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("program_len", &self.program.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine(program: &[Instruction], memory: &[(Address, Word)]) -> Engine {
        Engine::with_program(
            Program::from_instructions(program.to_vec()),
            memory.iter().copied().collect(),
        )
    }

    fn sample() -> Engine {
        engine(
            &[
                Instruction::Load { addr: 5 },
                Instruction::Add { addr: 6 },
                Instruction::Store { addr: 7 },
                Instruction::Hlt,
            ],
            &[(5, 3), (6, 4)],
        )
    }

    #[test]
    fn test_run_sample_program() {
        let mut cpu = sample();

        let outcome = cpu.run();

        assert_eq!(outcome, RunOutcome::Halted { steps: 4 });
        assert_eq!(cpu.regs.ac, 7);
        assert_eq!(cpu.mem.read(7), 7);
        assert_eq!(cpu.regs.pc, 3);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_halt_only() {
        let mut cpu = engine(&[Instruction::Hlt], &[]);

        assert_eq!(cpu.run(), RunOutcome::Halted { steps: 1 });
        assert_eq!(cpu.regs.ac, 0);
        assert_eq!(cpu.regs.pc, 0);
        assert_eq!(cpu.regs.ir, None);
        assert_eq!(cpu.step(), StepResult::AlreadyHalted);
        assert_eq!(cpu.regs.pc, 0);
    }

    #[test]
    fn test_empty_program_completes() {
        let mut cpu = Engine::new();

        assert_eq!(cpu.step(), StepResult::Completed);
        assert_eq!(cpu.regs, Registers::new());
        assert_eq!(cpu.state(), ExecState::Ready);
        assert_eq!(cpu.narration(), &[MSG_STEP_COMPLETED.to_string()]);
    }

    #[test]
    fn test_step_narration() {
        let mut cpu = sample();

        let result = cpu.step();
        assert_eq!(result.narration().as_deref(), Some("AC=0→3 (loaded from memory[5]=3)"));
        cpu.step();
        let stored = cpu.step();
        assert_eq!(stored.narration().as_deref(), Some("Memory[7]=0→7 (stored from AC=7)"));

        assert_eq!(
            cpu.narration(),
            &[
                "PC=0 IR=LOAD 5 AC=0→3 (loaded from memory[5]=3)".to_string(),
                "PC=1 IR=ADD 6 AC=3→7 (added memory[6]=4)".to_string(),
                "PC=2 IR=STORE 7 Memory[7]=0→7 (stored from AC=7)".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_memory_reads_zero() {
        let mut cpu = engine(&[Instruction::Sub { addr: 40 }, Instruction::Add { addr: 41 }], &[]);
        cpu.regs.ac = 9;

        cpu.step();
        assert_eq!(cpu.regs.ac, 9);
        cpu.step();
        assert_eq!(cpu.regs.ac, 9);
        assert!(!cpu.mem.contains(40));
    }

    #[test]
    fn test_sub_goes_negative() {
        let mut cpu = engine(&[Instruction::Sub { addr: 1 }], &[(1, 5)]);
        let result = cpu.step();
        assert_eq!(cpu.regs.ac, -5);
        assert_eq!(result.narration().as_deref(), Some("AC=0→-5 (subtracted memory[1]=5)"));
    }

    #[test]
    fn test_accumulator_wraps() {
        let mut cpu = engine(&[Instruction::Add { addr: 0 }, Instruction::Sub { addr: 0 }], &[(0, 1)]);
        cpu.regs.ac = Word::MAX;
        cpu.step();
        assert_eq!(cpu.regs.ac, Word::MIN);

        cpu.step();
        assert_eq!(cpu.regs.ac, Word::MAX);
    }

    #[test]
    fn test_sub_wraps_below_min() {
        let mut cpu = engine(&[Instruction::Sub { addr: 0 }], &[(0, 1)]);
        cpu.regs.ac = Word::MIN;
        let result = cpu.step();
        assert_eq!(cpu.regs.ac, Word::MAX);
        assert!(matches!(
            result,
            StepResult::Executed { effect: Effect::Subtracted { old: Word::MIN, new: Word::MAX, .. }, .. }
        ));
    }

    #[test]
    fn test_run_empty_program() {
        let mut cpu = Engine::new();

        assert_eq!(cpu.run(), RunOutcome::Completed { steps: 0 });
        assert_eq!(cpu.state(), ExecState::Ready);
        assert_eq!(cpu.regs, Registers::new());
        assert_eq!(
            cpu.narration(),
            &[MSG_RUN_STARTED.to_string(), MSG_RUN_COMPLETED.to_string()]
        );
    }

    #[test]
    fn test_load_starts_clean() {
        let mut cpu = sample();
        cpu.run();

        cpu.load(Program::from_instructions(vec![Instruction::Hlt]), Memory::new());

        assert_eq!(cpu.state(), ExecState::Ready);
        assert_eq!(cpu.regs, Registers::new());
        assert!(cpu.narration().is_empty());
    }

    #[test]
    fn test_no_narration_after_halt() {
        let mut cpu = sample();
        cpu.run();
        let lines = cpu.narration().len();
        assert_eq!(cpu.narration().last().map(String::as_str), Some("PC=3 IR=HLT Program Halted."));

        assert_eq!(cpu.step(), StepResult::AlreadyHalted);
        assert_eq!(cpu.run(), RunOutcome::AlreadyHalted);
        assert_eq!(cpu.narration().len(), lines);
    }

    #[test]
    fn test_run_completion_without_halt() {
        let mut cpu = engine(&[Instruction::Load { addr: 1 }], &[(1, 2)]);

        assert_eq!(cpu.run(), RunOutcome::Completed { steps: 1 });
        assert_eq!(cpu.state(), ExecState::Ready);
        assert_eq!(cpu.regs.pc, 1);
        assert_eq!(cpu.narration().first().map(String::as_str), Some(MSG_RUN_STARTED));
        assert_eq!(cpu.narration().last().map(String::as_str), Some(MSG_RUN_COMPLETED));

        // Stepping afterwards reports completion without touching registers.
        assert_eq!(cpu.step(), StepResult::Completed);
        assert_eq!(cpu.regs.ac, 2);
    }

    #[test]
    fn test_reentrant_run_is_noop() {
        let mut cpu = sample();

        assert!(cpu.start_run());
        cpu.tick();
        let before = cpu.snapshot();

        assert_eq!(cpu.run(), RunOutcome::AlreadyRunning);
        assert!(!cpu.start_run());
        assert_eq!(cpu.snapshot(), before);

        while cpu.tick().is_some() {}

        let mut reference = sample();
        reference.run();
        assert_eq!(cpu.snapshot(), reference.snapshot());
    }

    #[test]
    fn test_pause_stops_run() {
        let mut cpu = sample();
        assert!(cpu.start_run());
        cpu.tick();
        cpu.pause();

        assert_eq!(cpu.state(), ExecState::Ready);
        assert_eq!(cpu.tick(), None);
        assert_eq!(cpu.regs.pc, 1);
    }

    #[test]
    fn test_reset_keeps_program_and_memory() {
        let mut cpu = sample();
        cpu.run();

        cpu.reset();

        assert_eq!(cpu.regs, Registers::new());
        assert_eq!(cpu.state(), ExecState::Ready);
        assert_eq!(cpu.narration(), &[MSG_RESET.to_string()]);
        assert_eq!(cpu.mem.read(7), 7);
        assert_eq!(cpu.program().len(), 4);

        // Runs again from the top.
        assert_eq!(cpu.run(), RunOutcome::Halted { steps: 4 });
    }

    #[test]
    fn test_events_and_observers() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut cpu = sample();
        cpu.add_observer(move |e: &EngineEvent| sink.borrow_mut().push(e.clone()));

        cpu.step();
        assert_eq!(
            cpu.last_events(),
            &[
                EngineEvent::RegisterChanged(Register::Ir),
                EngineEvent::MemoryTouched { address: 5 },
                EngineEvent::RegisterChanged(Register::Ac),
                EngineEvent::RegisterChanged(Register::Pc),
            ]
        );

        let seen = seen.borrow();
        assert_eq!(seen.len(), 5);
        assert!(matches!(seen.last(), Some(EngineEvent::Narration(_))));
    }

    #[test]
    fn test_observers_silent_after_halt() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut cpu = sample();
        cpu.add_observer(move |e: &EngineEvent| {
            if let EngineEvent::Narration(line) = e {
                sink.borrow_mut().push(line.clone());
            }
        });

        assert_eq!(cpu.run(), RunOutcome::Halted { steps: 4 });
        assert_eq!(seen.borrow().last().map(String::as_str), Some("PC=3 IR=HLT Program Halted."));
        let delivered = seen.borrow().len();

        assert_eq!(cpu.step(), StepResult::AlreadyHalted);
        assert_eq!(cpu.run(), RunOutcome::AlreadyHalted);
        assert!(!cpu.start_run());
        assert_eq!(seen.borrow().len(), delivered);

        // Reset opens the log again.
        cpu.reset();
        assert_eq!(seen.borrow().last().map(String::as_str), Some(MSG_RESET));
    }

    #[test]
    fn test_pacing_phases() {
        struct Recorder(Rc<RefCell<Vec<Phase>>>);
        impl Pacing for Recorder {
            fn pause(&mut self, phase: Phase) {
                self.0.borrow_mut().push(phase);
            }
        }

        let phases = Rc::new(RefCell::new(Vec::new()));
        let mut cpu = engine(&[Instruction::Load { addr: 0 }, Instruction::Hlt], &[]);
        cpu.set_pacing(Recorder(Rc::clone(&phases)));
        cpu.run();

        assert_eq!(
            *phases.borrow(),
            vec![Phase::Execute, Phase::AdvancePc, Phase::BetweenSteps]
        );
    }
}
