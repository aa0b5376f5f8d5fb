//! Program listings.
//!
//! Renders a program and the data cells it references as plain text, in the
//! same shape a front end shows them: the instruction table, then the data
//! table in order of first use.

use std::fmt::Write;
use crate::cpu::{Memory, Program, ProgramWarning};

/// Render the instruction table.
pub fn disassemble(program: &Program) -> String {
    let mut output = String::new();
    output.push_str("; Program\n");
    output.push_str("; -------\n");

    for (addr, instr) in program.iter() {
        let _ = writeln!(output, "{:03}: {}", addr, instr);
    }

    output
}

/// Render the instruction table, the data table and any lint warnings.
pub fn listing(program: &Program, memory: &Memory) -> String {
    let mut output = disassemble(program);

    let data = memory.dump(&program.data_addresses());
    if !data.is_empty() {
        output.push_str("\n; Data\n");
        output.push_str("; ----\n");
        for (addr, value) in data {
            let _ = writeln!(output, "{:03}: {}", addr, value);
        }
    }

    let warnings: Vec<ProgramWarning> = program.lint();
    if !warnings.is_empty() {
        output.push('\n');
        for warning in warnings {
            let _ = writeln!(output, "; warning: {}", warning);
        }
    }

    output
}
