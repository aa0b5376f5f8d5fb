//! TUI debugger for the accumulator machine.
//!
//! Provides an interactive terminal-based debugger with:
//! - Program view with PC marker and in-place editing
//! - Register and memory views highlighting what the last step touched
//! - Step/run/pause/reset controls
//! - Narration output

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
