//! Utility modules for common functionality.
//!
//! This module contains the logging setup shared by the binary and tests.

pub mod logger;
