//! Sparse data memory.
//!
//! Cells that were never written read as zero. That default is part of the
//! machine's contract, not an error path.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use rand::Rng;
use serde::{Serialize, Deserialize};
use crate::cpu::instruction::{Address, Word};

/// Values given to data cells that have none when a program is generated.
pub const SEED_VALUES: RangeInclusive<Word> = 1..=50;

/// Data memory: a sparse map from address to value.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Memory {
    cells: BTreeMap<Address, Word>,
}

impl Memory {
    /// Create an empty memory.
    pub fn new() -> Self {
        Self {
            cells: BTreeMap::new(),
        }
    }

    /// Read a cell, or zero if it was never written.
    #[inline]
    pub fn read(&self, addr: Address) -> Word {
        self.cells.get(&addr).copied().unwrap_or(0)
    }

    /// Read a cell only if it holds a value.
    #[inline]
    pub fn get(&self, addr: Address) -> Option<Word> {
        self.cells.get(&addr).copied()
    }

    /// Write a cell, returning its previous value (zero if unset).
    #[inline]
    pub fn write(&mut self, addr: Address, value: Word) -> Word {
        self.cells.insert(addr, value).unwrap_or(0)
    }

    /// Whether the cell has been written.
    pub fn contains(&self, addr: Address) -> bool {
        self.cells.contains_key(&addr)
    }

    /// Forget every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Number of written cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Written cells in address order.
    pub fn iter(&self) -> impl Iterator<Item = (Address, Word)> + '_ {
        self.cells.iter().map(|(&addr, &value)| (addr, value))
    }

    /// Give every unset cell among `addresses` a random value from
    /// [`SEED_VALUES`]. Cells that already hold a value are kept.
    pub fn seed_random<R: Rng + ?Sized>(&mut self, addresses: &[Address], rng: &mut R) {
        for &addr in addresses {
            if !self.contains(addr) {
                self.cells.insert(addr, rng.gen_range(SEED_VALUES));
            }
        }
    }

    /// Values for the given addresses, in the order given (for data views).
    pub fn dump(&self, addresses: &[Address]) -> Vec<(Address, Word)> {
        addresses.iter().map(|&addr| (addr, self.read(addr))).collect()
    }
}

impl FromIterator<(Address, Word)> for Memory {
    fn from_iter<I: IntoIterator<Item = (Address, Word)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.cells.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        assert_eq!(mem.write(10, 42), 0);
        assert_eq!(mem.read(10), 42);
        assert_eq!(mem.write(10, -3), 42);
        assert_eq!(mem.read(10), -3);
    }

    #[test]
    fn test_missing_reads_zero() {
        let mem = Memory::new();
        assert_eq!(mem.read(999), 0);
        assert_eq!(mem.get(999), None);
        assert!(!mem.contains(999));
    }

    #[test]
    fn test_dump_keeps_order() {
        let mem: Memory = [(5, 3), (6, 4)].into_iter().collect();
        assert_eq!(mem.dump(&[6, 9, 5]), vec![(6, 4), (9, 0), (5, 3)]);
        assert_eq!(mem.len(), 2);
    }

    #[test]
    fn test_json_shape() {
        let mem: Memory = [(5, 3)].into_iter().collect();
        let json = serde_json::to_string(&mem).unwrap();
        assert_eq!(json, r#"{"5":3}"#);
        let back: Memory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mem);
    }

    #[test]
    fn test_seed_random_fills_only_unset_cells() {
        use rand::{rngs::StdRng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        let mut mem: Memory = [(12, -4)].into_iter().collect();

        mem.seed_random(&[10, 12, 14, 10], &mut rng);

        assert_eq!(mem.len(), 3);
        assert_eq!(mem.get(12), Some(-4));
        for addr in [10, 14] {
            let value = mem.get(addr).unwrap();
            assert!(SEED_VALUES.contains(&value), "memory[{}]={}", addr, value);
        }
    }
}
