//! Narration and observation hooks.
//!
//! The engine describes every micro-operation as a line of text and reports
//! which register or memory cell it touched, so a front end can highlight it.

use serde::{Serialize, Deserialize};
use crate::cpu::instruction::Address;
use crate::cpu::registers::Register;

/// Something a front end may want to highlight or print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A register was written.
    RegisterChanged(Register),
    /// A memory cell was read or written.
    MemoryTouched { address: Address },
    /// A narration line was accepted into the log.
    Narration(String),
}

/// Receives engine events. Purely informational.
pub trait Observer {
    fn on_event(&mut self, event: &EngineEvent);
}

impl<F: FnMut(&EngineEvent)> Observer for F {
    fn on_event(&mut self, event: &EngineEvent) {
        self(event)
    }
}

/// The engine's output log.
///
/// Once sealed (after the halt message) further lines are dropped until the
/// log is cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationLog {
    lines: Vec<String>,
    sealed: bool,
}

impl NarrationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line. Returns false if the log is sealed and the line was dropped.
    pub fn push(&mut self, line: impl Into<String>) -> bool {
        if self.sealed {
            return false;
        }
        self.lines.push(line.into());
        true
    }

    /// Stop accepting lines.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Drop all lines and accept new ones again.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.sealed = false;
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sealed_log_drops_lines() {
        let mut log = NarrationLog::new();
        assert!(log.push("one"));
        log.seal();
        assert!(!log.push("two"));
        assert_eq!(log.lines(), &["one".to_string()]);

        log.clear();
        assert!(log.is_empty());
        assert!(log.push("three"));
        assert_eq!(log.last(), Some("three"));
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut obs = |e: &EngineEvent| seen.push(e.clone());
            obs.on_event(&EngineEvent::MemoryTouched { address: 4 });
        }
        assert_eq!(seen, vec![EngineEvent::MemoryTouched { address: 4 }]);
    }
}
