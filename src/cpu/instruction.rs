//! Instruction set of the accumulator machine.
//!
//! Five instructions, four of which take a memory address operand.
//! The set is closed: anything outside it cannot be represented.

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// A memory or program address.
pub type Address = usize;

/// The value held by a memory cell or the accumulator.
pub type Word = i64;

/// Instruction type without its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Opcode {
    Load,
    Store,
    Add,
    Sub,
    Hlt,
}

impl Opcode {
    /// All opcodes, in the order the editor cycles through them.
    pub const ALL: [Opcode; 5] = [
        Opcode::Load,
        Opcode::Store,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Hlt,
    ];

    /// Canonical mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Hlt => "HLT",
        }
    }

    /// Look up a mnemonic, accepting the usual aliases. Case-insensitive.
    pub fn from_mnemonic(text: &str) -> Option<Opcode> {
        match text.to_uppercase().as_str() {
            "LOAD" | "LD" | "LDA" => Some(Opcode::Load),
            "STORE" | "ST" | "STA" => Some(Opcode::Store),
            "ADD" => Some(Opcode::Add),
            "SUB" => Some(Opcode::Sub),
            "HLT" | "HALT" => Some(Opcode::Hlt),
            _ => None,
        }
    }

    /// Whether this opcode requires a memory operand.
    pub fn takes_operand(self) -> bool {
        !matches!(self, Opcode::Hlt)
    }

    /// The opcode after this one in [`Opcode::ALL`], wrapping around.
    pub fn next(self) -> Opcode {
        let idx = Opcode::ALL.iter().position(|&op| op == self).unwrap_or(0);
        Opcode::ALL[(idx + 1) % Opcode::ALL.len()]
    }

    /// Build an instruction of this type. The operand is ignored for HLT.
    pub fn with_operand(self, addr: Address) -> Instruction {
        match self {
            Opcode::Load => Instruction::Load { addr },
            Opcode::Store => Instruction::Store { addr },
            Opcode::Add => Instruction::Add { addr },
            Opcode::Sub => Instruction::Sub { addr },
            Opcode::Hlt => Instruction::Hlt,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    /// Load accumulator: AC := [addr]
    Load { addr: Address },

    /// Store accumulator: [addr] := AC
    Store { addr: Address },

    /// Add memory to accumulator: AC := AC + [addr]
    Add { addr: Address },

    /// Subtract memory from accumulator: AC := AC - [addr]
    Sub { addr: Address },

    /// Halt execution
    Hlt,
}

impl Instruction {
    /// Build an instruction from its parts, checking operand presence.
    pub fn new(opcode: Opcode, operand: Option<Address>) -> Result<Self, ParseInstructionError> {
        match (opcode.takes_operand(), operand) {
            (true, Some(addr)) => Ok(opcode.with_operand(addr)),
            (true, None) => Err(ParseInstructionError::MissingOperand(opcode)),
            (false, None) => Ok(Instruction::Hlt),
            (false, Some(_)) => Err(ParseInstructionError::UnexpectedOperand(opcode)),
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Load { .. } => Opcode::Load,
            Instruction::Store { .. } => Opcode::Store,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Sub { .. } => Opcode::Sub,
            Instruction::Hlt => Opcode::Hlt,
        }
    }

    /// The memory address operand, absent for HLT.
    pub fn operand(&self) -> Option<Address> {
        match *self {
            Instruction::Load { addr }
            | Instruction::Store { addr }
            | Instruction::Add { addr }
            | Instruction::Sub { addr } => Some(addr),
            Instruction::Hlt => None,
        }
    }

    pub fn is_halt(&self) -> bool {
        matches!(self, Instruction::Hlt)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand() {
            Some(addr) => write!(f, "{} {}", self.opcode(), addr),
            None => write!(f, "{}", self.opcode()),
        }
    }
}

impl FromStr for Instruction {
    type Err = ParseInstructionError;

    /// Parse `MNEMONIC [operand]`, e.g. `LOAD 5` or `hlt`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let mnemonic = parts.next().ok_or(ParseInstructionError::Empty)?;
        let opcode = Opcode::from_mnemonic(mnemonic)
            .ok_or_else(|| ParseInstructionError::UnknownMnemonic(mnemonic.to_string()))?;

        let operand = match parts.next() {
            Some(text) => Some(parse_address(text)?),
            None => None,
        };

        if let Some(extra) = parts.next() {
            return Err(ParseInstructionError::TrailingInput(extra.to_string()));
        }

        Instruction::new(opcode, operand)
    }
}

/// Parse a non-negative decimal or `0x` hexadecimal address.
pub fn parse_address(text: &str) -> Result<Address, ParseInstructionError> {
    let text = text.trim();
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Address::from_str_radix(hex, 16)
    } else {
        text.parse::<Address>()
    };
    parsed.map_err(|_| ParseInstructionError::InvalidOperand(text.to_string()))
}

/// Errors produced when building or parsing an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseInstructionError {
    #[error("empty instruction")]
    Empty,

    #[error("unknown mnemonic: {0}")]
    UnknownMnemonic(String),

    #[error("{0} requires a memory address operand")]
    MissingOperand(Opcode),

    #[error("{0} does not take an operand")]
    UnexpectedOperand(Opcode),

    #[error("invalid operand: {0} (expected a non-negative address)")]
    InvalidOperand(String),

    #[error("unexpected trailing input: {0}")]
    TrailingInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        assert_eq!("LOAD 5".parse::<Instruction>().unwrap(), Instruction::Load { addr: 5 });
        assert_eq!("store 7".parse::<Instruction>().unwrap(), Instruction::Store { addr: 7 });
        assert_eq!("  Add   0x10 ".parse::<Instruction>().unwrap(), Instruction::Add { addr: 16 });
        assert_eq!("HALT".parse::<Instruction>().unwrap(), Instruction::Hlt);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("LDA 1".parse::<Instruction>().unwrap().opcode(), Opcode::Load);
        assert_eq!("ST 1".parse::<Instruction>().unwrap().opcode(), Opcode::Store);
    }

    #[test]
    fn test_operand_presence() {
        assert_eq!(
            "SUB".parse::<Instruction>(),
            Err(ParseInstructionError::MissingOperand(Opcode::Sub))
        );
        assert_eq!(
            "HLT 3".parse::<Instruction>(),
            Err(ParseInstructionError::UnexpectedOperand(Opcode::Hlt))
        );
        assert!(matches!(
            "LOAD -1".parse::<Instruction>(),
            Err(ParseInstructionError::InvalidOperand(_))
        ));
        assert!(matches!(
            "JMP 4".parse::<Instruction>(),
            Err(ParseInstructionError::UnknownMnemonic(_))
        ));
        assert!(matches!(
            "ADD 4 5".parse::<Instruction>(),
            Err(ParseInstructionError::TrailingInput(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::Sub { addr: 12 }.to_string(), "SUB 12");
        assert_eq!(Instruction::Hlt.to_string(), "HLT");
    }

    #[test]
    fn test_opcode_cycle() {
        let mut op = Opcode::Load;
        for _ in 0..Opcode::ALL.len() {
            op = op.next();
        }
        assert_eq!(op, Opcode::Load);
        assert_eq!(Opcode::Sub.next(), Opcode::Hlt);
    }
}
