//! Programs: ordered instruction lists addressed from zero.
//!
//! The engine only reads a program. Editing goes through the methods here,
//! which keep addresses contiguous and operands consistent with their type.

use std::fmt;
use std::ops::RangeInclusive;
use rand::Rng;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::cpu::instruction::{Address, Instruction, Opcode, ParseInstructionError};

/// One program row as it appears in images: `{address, type, operand}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    pub address: Address,
    #[serde(rename = "type")]
    pub opcode: Opcode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand: Option<Address>,
}

impl ProgramEntry {
    pub fn new(address: Address, instr: Instruction) -> Self {
        Self {
            address,
            opcode: instr.opcode(),
            operand: instr.operand(),
        }
    }
}

impl TryFrom<ProgramEntry> for Instruction {
    type Error = ProgramError;

    fn try_from(entry: ProgramEntry) -> Result<Self, Self::Error> {
        Instruction::new(entry.opcode, entry.operand).map_err(|source| ProgramError::InvalidEntry {
            address: entry.address,
            source,
        })
    }
}

/// Problems a program can have that do not prevent execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramWarning {
    /// No HLT anywhere: a run ends by falling off the end.
    MissingHalt,
    /// A second (or later) HLT at this address.
    ExtraHalt(Address),
    /// The only HLT is not the last instruction; rows after it are unreachable.
    HaltNotLast(Address),
}

impl fmt::Display for ProgramWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramWarning::MissingHalt => write!(f, "program has no HLT instruction"),
            ProgramWarning::ExtraHalt(addr) => write!(f, "extra HLT at address {}", addr),
            ProgramWarning::HaltNotLast(addr) => {
                write!(f, "HLT at address {} is not the last instruction", addr)
            }
        }
    }
}

/// Instruction types drawn for the body of a generated program.
pub const GENERATED_OPCODES: [Opcode; 4] = [Opcode::Load, Opcode::Add, Opcode::Sub, Opcode::Store];

/// Operand addresses drawn for a generated program.
pub const GENERATED_OPERANDS: RangeInclusive<Address> = 10..=108;

/// An ordered program. Instruction `i` lives at address `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    /// Create an empty program.
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }

    /// Build from instructions in address order.
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Random program of `count` rows: `count - 1` random LOAD/ADD/SUB/STORE
    /// instructions followed by a single HLT. `count == 0` gives an empty
    /// program.
    pub fn generate<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let mut instructions: Vec<Instruction> = (1..count)
            .map(|_| {
                let opcode = GENERATED_OPCODES[rng.gen_range(0..GENERATED_OPCODES.len())];
                opcode.with_operand(rng.gen_range(GENERATED_OPERANDS))
            })
            .collect();
        if count > 0 {
            instructions.push(Instruction::Hlt);
        }
        Self { instructions }
    }

    /// Build from image rows, which may arrive in any order but must cover
    /// `0..n` exactly once.
    pub fn from_entries(mut entries: Vec<ProgramEntry>) -> Result<Self, ProgramError> {
        entries.sort_by_key(|e| e.address);

        let mut instructions = Vec::with_capacity(entries.len());
        for (expected, entry) in entries.into_iter().enumerate() {
            if entry.address < expected {
                return Err(ProgramError::DuplicateAddress(entry.address));
            }
            if entry.address > expected {
                return Err(ProgramError::MissingAddress(expected));
            }
            instructions.push(Instruction::try_from(entry)?);
        }

        Ok(Self { instructions })
    }

    /// Image rows in address order.
    pub fn entries(&self) -> Vec<ProgramEntry> {
        self.iter().map(|(addr, instr)| ProgramEntry::new(addr, instr)).collect()
    }

    #[inline]
    pub fn get(&self, addr: Address) -> Option<Instruction> {
        self.instructions.get(addr).copied()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// `(address, instruction)` pairs in program order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, Instruction)> + '_ {
        self.instructions.iter().copied().enumerate()
    }

    /// Append an instruction at the next address. Returns that address.
    pub fn push(&mut self, instr: Instruction) -> Address {
        self.instructions.push(instr);
        self.instructions.len() - 1
    }

    /// Replace the instruction at `addr`.
    pub fn set(&mut self, addr: Address, instr: Instruction) -> Result<Instruction, ProgramError> {
        let len = self.len();
        let slot = self
            .instructions
            .get_mut(addr)
            .ok_or(ProgramError::AddressOutOfRange { address: addr, len })?;
        Ok(std::mem::replace(slot, instr))
    }

    /// Change the type of the instruction at `addr`.
    ///
    /// The operand is kept when both types take one. Switching to HLT drops it;
    /// switching away from HLT uses `fallback_operand`.
    pub fn retype(
        &mut self,
        addr: Address,
        opcode: Opcode,
        fallback_operand: Address,
    ) -> Result<Instruction, ProgramError> {
        let current = self
            .get(addr)
            .ok_or(ProgramError::AddressOutOfRange { address: addr, len: self.len() })?;
        let operand = current.operand().unwrap_or(fallback_operand);
        let updated = opcode.with_operand(operand);
        self.set(addr, updated)?;
        Ok(updated)
    }

    /// Change the operand of the instruction at `addr`.
    pub fn set_operand(&mut self, addr: Address, operand: Address) -> Result<Instruction, ProgramError> {
        let current = self
            .get(addr)
            .ok_or(ProgramError::AddressOutOfRange { address: addr, len: self.len() })?;
        if current.is_halt() {
            return Err(ProgramError::OperandOnHalt(addr));
        }
        let updated = current.opcode().with_operand(operand);
        self.set(addr, updated)?;
        Ok(updated)
    }

    /// Operand addresses in order of first use. This is the data table a
    /// front end shows next to the program.
    pub fn data_addresses(&self) -> Vec<Address> {
        let mut seen = Vec::new();
        for operand in self.instructions.iter().filter_map(Instruction::operand) {
            if !seen.contains(&operand) {
                seen.push(operand);
            }
        }
        seen
    }

    /// Check the one-HLT-at-the-end convention.
    pub fn lint(&self) -> Vec<ProgramWarning> {
        let halts: Vec<Address> = self
            .iter()
            .filter(|(_, instr)| instr.is_halt())
            .map(|(addr, _)| addr)
            .collect();

        let mut warnings = Vec::new();
        match halts.split_first() {
            None => warnings.push(ProgramWarning::MissingHalt),
            Some((&first, rest)) => {
                warnings.extend(rest.iter().map(|&addr| ProgramWarning::ExtraHalt(addr)));
                if rest.is_empty() && first + 1 != self.len() {
                    warnings.push(ProgramWarning::HaltNotLast(first));
                }
            }
        }
        warnings
    }
}

impl From<Vec<Instruction>> for Program {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::from_instructions(instructions)
    }
}

impl FromIterator<Instruction> for Program {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

/// Errors that can occur while building or editing a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("duplicate instruction address {0}")]
    DuplicateAddress(Address),

    #[error("missing instruction at address {0} (addresses must be contiguous from 0)")]
    MissingAddress(Address),

    #[error("address {address} out of range (program has {len} instructions)")]
    AddressOutOfRange { address: Address, len: usize },

    #[error("HLT at address {0} does not take an operand")]
    OperandOnHalt(Address),

    #[error("invalid instruction at address {address}: {source}")]
    InvalidEntry {
        address: Address,
        #[source]
        source: ParseInstructionError,
    },
}
