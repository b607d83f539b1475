//! Terminal debugger.
//!
//! Shows the program region as disassembly, the special and general
//! registers, and a scrollable memory view split at the program boundary.
//! Execution can be single-stepped or run to a breakpoint.

mod app;
mod ui;

pub use app::{DebuggerApp, ListingRow, Mode, run_debugger};
