//! Debugger application state and logic.

use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::asm::Assembly;
use crate::config::SimConfig;
use crate::cpu::execute::MSG_RUN_COMPLETED;
use crate::cpu::{Address, EngineEvent, Program, Register, StepResult};
use crate::Engine;

/// Debugger application state.
pub struct DebuggerApp {
    /// The engine being driven.
    pub engine: Engine,
    /// Simulator settings.
    pub config: SimConfig,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Instruction row selected for editing.
    pub selected: Address,
    rng: StdRng,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded program.
    pub fn new(asm: Assembly, config: SimConfig) -> Self {
        Self::with_rng(asm, config, StdRng::from_entropy())
    }

    /// Create a debugger whose generated programs come from `rng`.
    pub fn with_rng(asm: Assembly, config: SimConfig, rng: StdRng) -> Self {
        Self {
            engine: Engine::with_program(asm.program, asm.memory),
            config,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            selected: 0,
            rng,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        self.engine.pause();
        let pc = self.engine.regs.pc;
        let result = self.engine.step();
        self.status = describe(pc, result);
    }

    /// Start a continuous run; `tick` advances it.
    pub fn run(&mut self) {
        if self.engine.start_run() {
            self.status = "Running...".into();
        } else if self.engine.is_halted() {
            self.status = "Program already halted. Press 'x' to reset.".into();
        }
    }

    /// Pause a continuous run.
    pub fn pause(&mut self) {
        if self.engine.is_running() {
            self.engine.pause();
            self.status = "Paused.".into();
        }
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        let pc = self.engine.regs.pc;
        if let Some(result) = self.engine.tick() {
            self.status = match result {
                StepResult::Completed => MSG_RUN_COMPLETED.to_string(),
                other => describe(pc, other),
            };
        }
    }

    /// Reset registers and narration; program and memory stay.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.status = "Reset. Ready.".into();
    }

    /// Replace the program with a random one. Data values already present
    /// are kept; new data addresses get random values.
    pub fn generate(&mut self) {
        let program = Program::generate(self.config.generate_count, &mut self.rng);
        let mut memory = self.engine.mem.clone();
        memory.seed_random(&program.data_addresses(), &mut self.rng);
        self.engine.load(program, memory);
        self.selected = 0;
        self.status = format!("Generated {} instructions.", self.engine.program().len());
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.engine.program().len() {
            self.selected += 1;
        }
    }

    /// Cycle the type of the selected instruction.
    pub fn cycle_type(&mut self) {
        let addr = self.selected;
        let Some(current) = self.engine.program().get(addr) else {
            return;
        };
        let fallback = self.config.default_operand;
        self.status = match self.engine.program_mut().retype(addr, current.opcode().next(), fallback) {
            Ok(instr) => format!("{:03}: {}", addr, instr),
            Err(e) => format!("Error: {}", e),
        };
    }

    /// Move the operand of the selected instruction up or down.
    pub fn adjust_operand(&mut self, delta: isize) {
        let addr = self.selected;
        let Some(operand) = self.engine.program().get(addr).and_then(|i| i.operand()) else {
            self.status = "HLT has no operand.".into();
            return;
        };
        let updated = operand.saturating_add_signed(delta);
        self.status = match self.engine.program_mut().set_operand(addr, updated) {
            Ok(instr) => format!("{:03}: {}", addr, instr),
            Err(e) => format!("Error: {}", e),
        };
    }

    /// Memory address touched by the last step, if any.
    pub fn touched_address(&self) -> Option<Address> {
        self.engine.last_events().iter().find_map(|e| match e {
            EngineEvent::MemoryTouched { address } => Some(*address),
            _ => None,
        })
    }

    /// Whether the last step wrote this register.
    pub fn register_changed(&self, reg: Register) -> bool {
        self.engine
            .last_events()
            .iter()
            .any(|e| *e == EngineEvent::RegisterChanged(reg))
    }
}

fn describe(pc: Address, result: StepResult) -> String {
    match result {
        StepResult::Executed { instruction, effect } => format!("PC={:03}: {}  {}", pc, instruction, effect),
        StepResult::Halted => format!("PC={:03}: HLT  Program Halted.", pc),
        StepResult::Completed => "Program completed. Press 'x' to reset.".into(),
        StepResult::AlreadyHalted => "Program already halted. Press 'x' to reset.".into(),
    }
}

/// Run the debugger with a program.
pub fn run_debugger(asm: Assembly, config: SimConfig) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::{Duration, Instant};

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let tick_rate = Duration::from_millis(config.tick_ms);
    let mut app = DebuggerApp::new(asm, config);
    let mut last_tick = Instant::now();

    // Main loop
    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => app.step(),
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => app.pause(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Char('g') => app.generate(),
                        KeyCode::Char('t') => app.cycle_type(),
                        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_operand(1),
                        KeyCode::Char('-') => app.adjust_operand(-1),
                        KeyCode::Up => app.select_prev(),
                        KeyCode::Down => app.select_next(),
                        _ => {}
                    }
                }
            }
        }

        // Tick for continuous running
        if app.engine.is_running() && last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;
    use crate::cpu::{ExecState, Instruction};

    fn app() -> DebuggerApp {
        let asm = assemble("LOAD 5\nADD 6\nSTORE 7\nHLT\nDAT 5 3\nDAT 6 4\n").unwrap();
        DebuggerApp::new(asm, SimConfig::default())
    }

    #[test]
    fn test_run_via_ticks() {
        let mut app = app();
        app.run();
        assert_eq!(app.engine.state(), ExecState::Running);

        for _ in 0..10 {
            app.tick();
        }
        assert!(app.engine.is_halted());
        assert_eq!(app.engine.mem.read(7), 7);
    }

    #[test]
    fn test_step_pauses_run() {
        let mut app = app();
        app.run();
        app.step();
        assert_eq!(app.engine.state(), ExecState::Ready);
        assert_eq!(app.touched_address(), Some(5));
        assert!(app.register_changed(Register::Ac));
        assert!(app.status.contains("AC=0→3"));
    }

    #[test]
    fn test_generate_replaces_program() {
        let config = SimConfig { generate_count: 7, ..SimConfig::default() };
        let asm = assemble("LOAD 5\nHLT\nDAT 5 3\n").unwrap();
        let mut app = DebuggerApp::with_rng(asm, config, StdRng::seed_from_u64(1));
        app.step();
        app.select_next();

        app.generate();

        let program = app.engine.program();
        assert_eq!(program.len(), 7);
        assert_eq!(program.get(6), Some(Instruction::Hlt));
        for addr in program.data_addresses() {
            assert!(app.engine.mem.contains(addr));
        }
        assert_eq!(app.engine.mem.read(5), 3);
        assert_eq!(app.engine.regs.pc, 0);
        assert_eq!(app.engine.state(), ExecState::Ready);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_editing() {
        let mut app = app();
        app.select_next();
        app.cycle_type();
        assert_eq!(app.engine.program().get(1), Some(Instruction::Sub { addr: 6 }));

        app.adjust_operand(-10);
        assert_eq!(app.engine.program().get(1), Some(Instruction::Sub { addr: 0 }));

        app.select_next();
        app.select_next();
        app.select_next();
        assert_eq!(app.selected, 3);
        app.adjust_operand(1);
        assert_eq!(app.status, "HLT has no operand.");
        app.cycle_type();
        assert_eq!(app.engine.program().get(3), Some(Instruction::Load { addr: 10 }));
    }
}
