//! Authorization decision for a requested command.
//!
//! Pure function of the command string and the loaded whitelist: an exact
//! entry must equal the command byte for byte, a regex entry must match the
//! whole command. Anything else is denied.

use super::whitelist::Whitelist;

/// Verdict for command evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
}

/// Evaluate a command against a whitelist.
pub fn evaluate(command: &str, whitelist: &Whitelist) -> Verdict {
    // Exact entries first; they are cheaper than any regex.
    if whitelist.exact().any(|allowed| allowed == command) {
        return Verdict::Allow;
    }

    if whitelist.patterns().any(|regex| regex.is_full_match(command)) {
        Verdict::Allow
    } else {
        Verdict::Deny
    }
}

pub fn is_allowed(command: &str, whitelist: &Whitelist) -> bool {
    evaluate(command, whitelist) == Verdict::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whitelist(exact: &[&str], regex: &[&str]) -> Whitelist {
        let mut whitelist = Whitelist::new();
        for e in exact {
            whitelist.push_exact(*e);
        }
        for r in regex {
            whitelist.push_regex(r).unwrap();
        }
        whitelist
    }

    #[test]
    fn test_empty_whitelist_denies_everything() {
        let empty = Whitelist::new();
        assert!(!is_allowed("", &empty));
        assert!(!is_allowed("uptime", &empty));
        assert!(!is_allowed("ls -la", &empty));
    }

    #[test]
    fn test_exact_match() {
        let wl = whitelist(&["uptime"], &[]);
        assert_eq!(evaluate("uptime", &wl), Verdict::Allow);
        assert!(is_allowed("uptime", &wl));
    }

    #[test]
    fn test_exact_is_not_prefix_or_substring() {
        let wl = whitelist(&["uptime"], &[]);
        assert!(!is_allowed("uptime extra", &wl));
        assert!(!is_allowed("uptim", &wl));
        assert!(!is_allowed(" uptime", &wl));
        assert!(!is_allowed("uptime\n", &wl));
        assert!(!is_allowed("UPTIME", &wl));
    }

    #[test]
    fn test_regex_full_match() {
        let wl = whitelist(&[], &["^ls(?: -[lahtr]+)?$"]);
        assert!(is_allowed("ls", &wl));
        assert!(is_allowed("ls -ltr", &wl));
        assert!(is_allowed("ls -lah", &wl));
    }

    #[test]
    fn test_regex_rejects_shell_composition() {
        let wl = whitelist(&[], &["^ls(?: -[lahtr]+)?$"]);
        assert!(!is_allowed("ls; rm -rf /", &wl));
        assert!(!is_allowed("ls -l && reboot", &wl));
        assert!(!is_allowed("ls -l\nreboot", &wl));
        assert!(!is_allowed("ls -x", &wl));
        assert!(!is_allowed("lsrmrf important", &wl));
    }

    #[test]
    fn test_mixed_whitelist() {
        let wl = whitelist(
            &["uptime", "df -h"],
            &["^ls(?: -[lahtr]+)?$", r"^tail -n \d+ /var/log/app\.log$"],
        );
        assert!(is_allowed("df -h", &wl));
        assert!(is_allowed("tail -n 50 /var/log/app.log", &wl));
        assert!(!is_allowed("tail -n 50 /etc/shadow", &wl));
        assert!(!is_allowed("df -h /", &wl));
    }

    #[test]
    fn test_empty_command_needs_explicit_entry() {
        let wl = whitelist(&["uptime"], &["^uptime$"]);
        assert_eq!(evaluate("", &wl), Verdict::Deny);
    }
}
