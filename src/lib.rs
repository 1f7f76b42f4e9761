//! rcsh - a restricted command shell for forced-command SSH accounts
//!
//! This library provides the pieces the `rcsh` binary wires together:
//! - Whitelist loading (exact commands and anchored regexes) and the
//!   authorization decision
//! - Supervised execution with a timeout and a closed child stdin
//! - Detection of data pushed on our own stdin
//! - Audit lines for every decision and outcome
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use rcsh::security::{is_allowed, Whitelist};
//!
//! let whitelist = Whitelist::load("backup", Path::new("/etc/rcsh.d"));
//! if is_allowed("uptime", &whitelist) {
//!     println!("uptime may run");
//! }
//! ```

pub mod app;
pub mod audit;
pub mod config;
pub mod context;
pub mod error;
pub mod security;
pub mod shell;
pub mod utils;

// Re-export commonly used types
pub use app::{App, Invocation};
pub use audit::{AuditEvent, AuditSink, Auditor};
pub use config::Config;
pub use error::{RcshError, Result};
pub use security::{is_allowed, Whitelist};
pub use shell::{Execution, ExitOutcome, Supervisor};
