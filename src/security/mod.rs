//! Whitelist loading and command authorization.
//!
//! This is the security boundary of the shell: a command runs only if the
//! invoking user's whitelist allows it verbatim or through an anchored regex.

mod allowlist;
mod whitelist;

pub use allowlist::{evaluate, is_allowed, Verdict};
pub use whitelist::{AnchoredRegex, Whitelist, WhitelistEntry};
