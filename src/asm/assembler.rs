//! Assembler for accumulator-machine programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//!     LOAD 5      ; AC := memory[5]
//!     ADD 6       ; AC := AC + memory[6]
//!     STORE 7     ; memory[7] := AC
//!     HLT         ; Halt
//!
//!     DAT 5 3     ; Seed memory[5] with 3
//!     DAT 6 0x04  ; Seed memory[6] with 4
//! ```
//!
//! Instructions take consecutive addresses from 0 in source order.
//! `DAT` lines may appear anywhere and do not occupy a program address.

use crate::cpu::instruction::{parse_address, Instruction, ParseInstructionError, Word};
use crate::cpu::{Memory, Program};
use thiserror::Error;

/// An assembled program together with its initial memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub program: Program,
    pub memory: Memory,
}

/// Assemble source code to a program and memory image.
pub fn assemble(source: &str) -> Result<Assembly, AssemblerError> {
    let mut asm = Assembler::new();
    for (line_num, line) in source.lines().enumerate() {
        asm.process_line(line, line_num + 1)?;
    }
    Ok(asm.finish())
}

/// The assembler state.
struct Assembler {
    program: Program,
    memory: Memory,
}

impl Assembler {
    fn new() -> Self {
        Self {
            program: Program::new(),
            memory: Memory::new(),
        }
    }

    fn finish(self) -> Assembly {
        Assembly {
            program: self.program,
            memory: self.memory,
        }
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove inline comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();

        if line.is_empty() {
            return Ok(());
        }

        let mut parts = line.split_whitespace();
        let head = parts.next().unwrap_or_default();

        if head.eq_ignore_ascii_case("DAT") || head.eq_ignore_ascii_case("DATA") {
            let args: Vec<&str> = parts.collect();
            return self.process_data(&args, line_num);
        }

        let instr: Instruction = line.parse().map_err(|source| AssemblerError::Instruction {
            line: line_num,
            source,
        })?;
        self.program.push(instr);
        Ok(())
    }

    /// `DAT <address> <value>`
    fn process_data(&mut self, args: &[&str], line_num: usize) -> Result<(), AssemblerError> {
        let [addr, value] = args else {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: "DAT requires an address and a value".into(),
            });
        };

        let addr = parse_address(addr).map_err(|source| AssemblerError::Instruction {
            line: line_num,
            source,
        })?;
        let value = parse_value(value).ok_or_else(|| AssemblerError::SyntaxError {
            line: line_num,
            message: format!("invalid data value: {}", value),
        })?;

        if self.memory.contains(addr) {
            return Err(AssemblerError::DuplicateData { line: line_num, address: addr });
        }
        self.memory.write(addr, value);
        Ok(())
    }
}

/// Parse a signed decimal or `0x` hexadecimal value.
fn parse_value(text: &str) -> Option<Word> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => Word::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<Word>().ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("line {line}: {source}")]
    Instruction {
        line: usize,
        #[source]
        source: ParseInstructionError,
    },

    #[error("memory address {address} seeded twice (line {line})")]
    DuplicateData { line: usize, address: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test program
            LOAD 5
            ADD 6
            STORE 7
            HLT
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result.program.len(), 4);
        assert_eq!(result.program.get(2), Some(Instruction::Store { addr: 7 }));
        assert!(result.memory.is_empty());
    }

    #[test]
    fn test_assemble_data() {
        let source = r#"
            DAT 5 3      ; first operand
            load 5
            DATA 6 -0x10
            hlt
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result.program.len(), 2);
        assert_eq!(result.memory.read(5), 3);
        assert_eq!(result.memory.read(6), -16);
    }

    #[test]
    fn test_errors_report_line() {
        let err = assemble("LOAD 1\nJMP 2\n").unwrap_err();
        assert!(matches!(
            err,
            AssemblerError::Instruction { line: 2, source: ParseInstructionError::UnknownMnemonic(_) }
        ));

        let err = assemble("DAT 4\n").unwrap_err();
        assert!(matches!(err, AssemblerError::SyntaxError { line: 1, .. }));

        let err = assemble("DAT 4 1\nDAT 4 2\n").unwrap_err();
        assert_eq!(err, AssemblerError::DuplicateData { line: 2, address: 4 });

        let err = assemble("HLT 3").unwrap_err();
        assert!(err.to_string().contains("does not take an operand"));
    }
}
