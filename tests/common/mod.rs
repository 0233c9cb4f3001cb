//! Integration test common infrastructure.
//!
//! Provides a fake econ console and helpers for running the daemon binary.

pub mod console;
pub mod daemon;

#[allow(unused_imports)]
pub use console::FakeConsole;
#[allow(unused_imports)]
pub use daemon::{TestDaemon, Workspace, run_command};
