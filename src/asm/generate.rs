//! Random program generation.

use rand::Rng;
use crate::asm::Assembly;
use crate::cpu::{Memory, Program};

/// Generate a `count`-row program ending in HLT, with every data address it
/// uses seeded with a random value.
pub fn generate<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Assembly {
    let program = Program::generate(count, rng);
    let mut memory = Memory::new();
    memory.seed_random(&program.data_addresses(), rng);
    Assembly { program, memory }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::memory::SEED_VALUES;
    use crate::cpu::Instruction;
    use crate::Engine;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_generated_data_is_seeded() {
        let mut rng = StdRng::seed_from_u64(11);
        let asm = generate(9, &mut rng);

        assert_eq!(asm.program.len(), 9);
        assert_eq!(asm.program.get(8), Some(Instruction::Hlt));

        let addresses = asm.program.data_addresses();
        assert!(!addresses.is_empty());
        assert_eq!(asm.memory.len(), addresses.len());
        for addr in addresses {
            let value = asm.memory.get(addr).unwrap();
            assert!(SEED_VALUES.contains(&value));
        }
    }

    #[test]
    fn test_generated_program_runs_to_halt() {
        let asm = generate(6, &mut StdRng::seed_from_u64(5));
        let mut engine = Engine::with_program(asm.program, asm.memory);

        let outcome = engine.run();

        assert_eq!(outcome, crate::RunOutcome::Halted { steps: 6 });
        assert_eq!(engine.regs.pc, 5);
    }
}
