//! Sison CPU - CLI Entry Point
//!
//! Commands:
//! - `sison-cpu run <program>` - Run a program until it halts
//! - `sison-cpu step <program>` - Execute a fixed number of steps
//! - `sison-cpu debug [program]` - Interactive terminal debugger
//! - `sison-cpu check <program>` - Validate and list a program
//! - `sison-cpu convert <source>` - Assemble to a JSON image
//! - `sison-cpu generate` - Generate a random program
//! - `sison-cpu demo` - Run the built-in sample program

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sison::asm::{save_image, Assembly};
use sison::cpu::{Address, EngineEvent, SleepPacing, StepResult, Word};
use sison::{generate, listing, load_file, Engine, Instruction, Memory, Program, RunOutcome, SimConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sison-cpu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A fetch-decode-execute visualizer for a tiny accumulator CPU")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts or runs off the end
    Run {
        /// Path to the program (.asm or .json)
        program: String,
        /// Seed a memory cell, e.g. --mem 5=3 (repeatable)
        #[arg(short, long, value_parser = parse_assignment)]
        mem: Vec<(Address, Word)>,
        /// Print narration as the program runs
        #[arg(short, long)]
        trace: bool,
        /// Animate with the configured delays
        #[arg(short, long)]
        paced: bool,
        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Execute a fixed number of single steps
    Step {
        /// Path to the program (.asm or .json)
        program: String,
        /// Number of steps to execute
        #[arg(short = 'n', long, default_value = "1")]
        count: u64,
        /// Seed a memory cell, e.g. --mem 5=3 (repeatable)
        #[arg(short, long, value_parser = parse_assignment)]
        mem: Vec<(Address, Word)>,
    },
    /// Interactive terminal debugger
    Debug {
        /// Path to the program (.asm or .json); a random one if omitted
        program: Option<String>,
    },
    /// Validate a program and print its listing
    Check {
        /// Path to the program (.asm or .json)
        program: String,
    },
    /// Convert an assembly file to a JSON image
    Convert {
        /// Path to the assembly source
        source: String,
        /// Output image file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Generate a random program ending in HLT
    Generate {
        /// Number of rows, HLT included
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// Save as a JSON image instead of printing a listing
        #[arg(short, long)]
        output: Option<String>,
        /// Seed for a reproducible program
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Run the built-in sample program
    Demo {
        /// Animate with the configured delays
        #[arg(short, long)]
        paced: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // The debugger owns the terminal; keep log output off it.
    if !matches!(cli.command, Some(Commands::Debug { .. })) {
        init_tracing(cli.verbose);
    }

    let config = load_config(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run { program, mem, trace, paced, json }) => {
            run_program(&program, &mem, trace, paced, json, &config);
        }
        Some(Commands::Step { program, count, mem }) => {
            step_program(&program, count, &mem);
        }
        Some(Commands::Debug { program }) => {
            debug_program(program.as_deref(), &config);
        }
        Some(Commands::Check { program }) => {
            check_program(&program);
        }
        Some(Commands::Convert { source, output }) => {
            convert_file(&source, output);
        }
        Some(Commands::Generate { count, output, seed }) => {
            generate_program(count.unwrap_or(config.generate_count), output, seed);
        }
        Some(Commands::Demo { paced }) => {
            run_demo(paced, &config);
        }
        None => {
            println!("Sison CPU v0.1.0");
            println!("A fetch-decode-execute visualizer for a tiny accumulator CPU");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&str>) -> SimConfig {
    let Some(path) = path else {
        return SimConfig::default();
    };
    match SimConfig::load(path) {
        Ok(config) => {
            tracing::debug!(path, ?config, "loaded config");
            config
        }
        Err(e) => {
            eprintln!("❌ Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}

/// Parse `ADDR=VALUE` for `--mem`.
fn parse_assignment(text: &str) -> Result<(Address, Word), String> {
    let (addr, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=VALUE, got '{}'", text))?;
    let addr = addr
        .trim()
        .parse::<Address>()
        .map_err(|_| format!("invalid address '{}'", addr))?;
    let value = value
        .trim()
        .parse::<Word>()
        .map_err(|_| format!("invalid value '{}'", value))?;
    Ok((addr, value))
}

/// Load a program file and apply `--mem` overrides, exiting on error.
fn load_program(path: &str, overrides: &[(Address, Word)]) -> Assembly {
    let mut asm = match load_file(path) {
        Ok(asm) => asm,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", path, e);
            std::process::exit(1);
        }
    };

    for &(addr, value) in overrides {
        asm.memory.write(addr, value);
    }

    for warning in asm.program.lint() {
        tracing::warn!(%warning, "program lint");
    }

    asm
}

fn build_engine(asm: Assembly, trace: bool, paced: bool, config: &SimConfig) -> Engine {
    let mut engine = Engine::with_program(asm.program, asm.memory);
    if paced {
        engine.set_pacing(SleepPacing::from(&config.pacing));
    }
    if trace {
        engine.add_observer(|event: &EngineEvent| {
            if let EngineEvent::Narration(line) = event {
                println!("{}", line);
            }
        });
    }
    engine
}

fn run_program(
    path: &str,
    overrides: &[(Address, Word)],
    trace: bool,
    paced: bool,
    json: bool,
    config: &SimConfig,
) {
    let asm = load_program(path, overrides);

    if !json {
        println!("🔧 Running: {} ({} instructions)", path, asm.program.len());
        println!();
        println!("━━━ Execution ━━━");
    }

    let mut engine = build_engine(asm, trace && !json, paced, config);
    let outcome = engine.run();

    if json {
        print_json(&engine);
    } else {
        print_summary(&engine, outcome);
    }
}

fn step_program(path: &str, count: u64, overrides: &[(Address, Word)]) {
    let asm = load_program(path, overrides);
    let mut engine = Engine::with_program(asm.program, asm.memory);

    for _ in 0..count {
        let pc = engine.regs.pc;
        let result = engine.step();
        match result {
            StepResult::Executed { instruction, effect } => {
                println!("{:03}: {:<10} {}", pc, instruction.to_string(), effect);
            }
            StepResult::Halted => {
                println!("{:03}: HLT        Program Halted.", pc);
            }
            StepResult::Completed => {
                println!("Program completed. Reset to run again.");
                break;
            }
            StepResult::AlreadyHalted => break,
        }
    }

    println!();
    print_registers(&engine);
}

fn debug_program(path: Option<&str>, config: &SimConfig) {
    #[cfg(feature = "tui")]
    {
        let asm = match path {
            Some(path) => load_program(path, &[]),
            None => generate(config.generate_count, &mut StdRng::from_entropy()),
        };
        println!("🚀 Launching debugger...");
        if let Err(e) = sison::run_debugger(asm, config.clone()) {
            eprintln!("❌ Debugger error: {}", e);
            std::process::exit(1);
        }
    }

    #[cfg(not(feature = "tui"))]
    {
        let _ = (path, config);
        eprintln!("❌ Built without the `tui` feature");
        std::process::exit(1);
    }
}

fn check_program(path: &str) {
    let asm = load_program(path, &[]);
    println!("✓ {} instructions, {} data cells", asm.program.len(), asm.memory.len());
    println!();
    print!("{}", listing(&asm.program, &asm.memory));
}

fn convert_file(source_path: &str, output: Option<String>) {
    let out_path = output.unwrap_or_else(|| {
        std::path::Path::new(source_path)
            .with_extension("json")
            .to_string_lossy()
            .into_owned()
    });

    if out_path == source_path {
        eprintln!("❌ Output would overwrite the input; use --output");
        std::process::exit(1);
    }

    println!("📝 Converting: {} → {}", source_path, out_path);

    let asm = load_program(source_path, &[]);
    if let Err(e) = save_image(&out_path, &asm) {
        eprintln!("❌ Failed to save image: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved {} instructions to {}", asm.program.len(), out_path);
}

fn generate_program(count: usize, output: Option<String>, seed: Option<u64>) {
    if count == 0 {
        eprintln!("❌ A program needs at least one row");
        std::process::exit(1);
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let asm = generate(count, &mut rng);
    tracing::debug!(count, ?seed, "generated program");

    match output {
        Some(path) => {
            if let Err(e) = save_image(&path, &asm) {
                eprintln!("❌ Failed to save image: {}", e);
                std::process::exit(1);
            }
            println!("✓ Saved {} instructions to {}", asm.program.len(), path);
        }
        None => print!("{}", listing(&asm.program, &asm.memory)),
    }
}

fn run_demo(paced: bool, config: &SimConfig) {
    let program = Program::from_instructions(vec![
        Instruction::Load { addr: 5 },
        Instruction::Add { addr: 6 },
        Instruction::Store { addr: 7 },
        Instruction::Hlt,
    ]);
    let memory: Memory = [(5, 3), (6, 4)].into_iter().collect();

    println!("━━━ Demo: memory[7] := memory[5] + memory[6] ━━━");
    println!();
    print!("{}", listing(&program, &memory));
    println!();
    println!("━━━ Execution ━━━");

    let asm = Assembly { program, memory };
    let mut engine = build_engine(asm, true, paced, config);
    let outcome = engine.run();
    print_summary(&engine, outcome);
}

fn print_summary(engine: &Engine, outcome: RunOutcome) {
    println!();
    println!("━━━ Result ━━━");
    println!("Outcome: {:?}", outcome);
    print_registers(engine);

    let data = engine.mem.dump(&engine.program().data_addresses());
    if !data.is_empty() {
        println!("Memory:");
        for (addr, value) in data {
            println!("  [{:03}] = {}", addr, value);
        }
    }
}

fn print_registers(engine: &Engine) {
    println!("State: {:?}", engine.state());
    println!("Cycles: {}", engine.cycles);
    println!("AC (accumulator):   {}", engine.regs.ac);
    println!("PC (program ctr):   {}", engine.regs.pc);
    println!("IR (instruction):   {}", engine.regs.ir_text());
}

fn print_json(engine: &Engine) {
    match serde_json::to_string_pretty(&engine.snapshot()) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("❌ Failed to encode state: {}", e);
            std::process::exit(1);
        }
    }
}
