//! Source address of the remote caller.
//!
//! sshd exports `SSH_CLIENT` (`ip port localport`) and `SSH_CONNECTION`
//! (`ip port localip localport`). Only the first field is used, and only
//! for logging.

use std::env;

pub const UNKNOWN_SOURCE: &str = "unknown source ip";

/// Capture the caller's address from the environment.
pub fn source_address() -> String {
    source_from(
        env::var("SSH_CLIENT").ok().as_deref(),
        env::var("SSH_CONNECTION").ok().as_deref(),
    )
}

pub fn source_from(ssh_client: Option<&str>, ssh_connection: Option<&str>) -> String {
    [ssh_client, ssh_connection]
        .into_iter()
        .flatten()
        .find_map(|value| value.split_whitespace().next())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_client() {
        assert_eq!(source_from(Some("192.0.2.7 51234 22"), None), "192.0.2.7");
    }

    #[test]
    fn test_ssh_connection_fallback() {
        assert_eq!(
            source_from(None, Some("2001:db8::1 51234 2001:db8::2 22")),
            "2001:db8::1"
        );
        assert_eq!(
            source_from(Some("   "), Some("198.51.100.3 1 198.51.100.4 22")),
            "198.51.100.3"
        );
    }

    #[test]
    fn test_missing_or_empty() {
        assert_eq!(source_from(None, None), UNKNOWN_SOURCE);
        assert_eq!(source_from(Some(""), Some("")), UNKNOWN_SOURCE);
    }
}
