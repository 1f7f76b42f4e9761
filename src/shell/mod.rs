//! Supervised execution of authorized commands.
//!
//! This module spawns the command through the configured shell, enforces
//! the wall-clock timeout, and audits our own stdin for smuggled data.

mod stdin_probe;
mod supervisor;

pub use stdin_probe::{probe_stdin_leak, MAX_LEAK_BYTES};
pub use supervisor::{Execution, ExitOutcome, Supervisor, SupervisorConfig, TIMEOUT_EXIT_CODE};
