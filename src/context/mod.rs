//! Who is calling, and from where.
//!
//! Both values are resolved once at startup and stay fixed for the rest of
//! the invocation.

mod env;
mod identity;

pub use env::{source_address, source_from, UNKNOWN_SOURCE};
pub use identity::{current_username, username_for_uid};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    pub identity: String,
    pub source: String,
}

impl InvocationContext {
    /// Capture identity and source for the current process.
    pub fn capture() -> Result<Self> {
        Ok(Self {
            identity: current_username()?,
            source: source_address(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_capture_uses_real_uid() {
        let context = InvocationContext::capture().unwrap();
        let uid = unsafe { libc::getuid() };
        assert_eq!(context.identity, username_for_uid(uid).unwrap());
        assert!(!context.source.is_empty());
    }
}
