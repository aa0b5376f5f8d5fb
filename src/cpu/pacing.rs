//! Cosmetic pacing between micro-steps.
//!
//! Pauses exist only so a watcher can follow along. They never affect results,
//! and tests run with [`NoPacing`].

use std::time::Duration;
use crate::config::PacingConfig;

/// Suspension points inside the fetch-execute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// After an instruction handler has updated AC or memory.
    Execute,
    /// After the program counter was incremented.
    AdvancePc,
    /// Between two steps of a run.
    BetweenSteps,
}

/// A pacing strategy.
pub trait Pacing {
    fn pause(&mut self, phase: Phase);
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl Pacing for NoPacing {
    fn pause(&mut self, _phase: Phase) {}
}

/// Blocks the calling thread for a fixed delay per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepPacing {
    pub execute: Duration,
    pub advance_pc: Duration,
    pub between_steps: Duration,
}

impl SleepPacing {
    pub fn delay(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Execute => self.execute,
            Phase::AdvancePc => self.advance_pc,
            Phase::BetweenSteps => self.between_steps,
        }
    }
}

impl From<&PacingConfig> for SleepPacing {
    fn from(cfg: &PacingConfig) -> Self {
        Self {
            execute: Duration::from_millis(cfg.execute_ms),
            advance_pc: Duration::from_millis(cfg.advance_pc_ms),
            between_steps: Duration::from_millis(cfg.between_steps_ms),
        }
    }
}

impl Pacing for SleepPacing {
    fn pause(&mut self, phase: Phase) {
        let delay = self.delay(phase);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_from_config() {
        let pacing = SleepPacing::from(&PacingConfig::default());
        assert_eq!(pacing.delay(Phase::Execute), Duration::from_millis(800));
        assert_eq!(pacing.delay(Phase::AdvancePc), Duration::from_millis(500));
        assert_eq!(pacing.delay(Phase::BetweenSteps), Duration::from_millis(1000));
    }

    #[test]
    fn test_instant_config_does_not_sleep() {
        let mut pacing = SleepPacing::from(&PacingConfig::instant());
        let start = std::time::Instant::now();
        pacing.pause(Phase::BetweenSteps);
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
