//! Per-user whitelist loading.
//!
//! A user's whitelist is assembled from every file in the filter directory
//! named `<user>.exact*` (one literal command per line) or `<user>.regex*`
//! (one anchored regular expression per line). Lines starting with `#` are
//! comments. Files are read fresh on every invocation.
//!
//! Loading never fails as a whole: an unreadable file or a bad pattern is
//! logged and skipped, so the worst case is an empty whitelist that denies
//! everything.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::error::WhitelistError;

const EXACT_SUFFIX: &str = "exact";
const REGEX_SUFFIX: &str = "regex";

/// A regular expression that must match the whole command.
///
/// The source pattern has to start with `^` and end with `$`. On top of that
/// it is compiled inside `\A(?:...)\z`, so alternations such as `^a|b$`
/// cannot match a mere prefix or suffix of the command.
#[derive(Debug, Clone)]
pub struct AnchoredRegex {
    pattern: String,
    regex: Regex,
}

impl AnchoredRegex {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        // Must compile on its own, otherwise `^a)|(b$` would close the group.
        Regex::new(pattern)?;
        let regex = Regex::new(&format!(r"\A(?:{})\z", pattern))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Check the `^...$` anchoring rule without compiling.
    pub fn is_anchored(pattern: &str) -> bool {
        pattern.len() >= 2 && pattern.starts_with('^') && pattern.ends_with('$')
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_full_match(&self, command: &str) -> bool {
        self.regex.is_match(command)
    }
}

#[derive(Debug, Clone)]
pub enum WhitelistEntry {
    Exact(String),
    Regex(AnchoredRegex),
}

/// All entries that apply to one identity.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    entries: Vec<WhitelistEntry>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the whitelist for `identity` from `filter_dir`.
    pub fn load(identity: &str, filter_dir: &Path) -> Self {
        let mut whitelist = Self::new();

        if let Err(e) = validate_identity(identity) {
            warn!("{}", e);
            return whitelist;
        }

        for path in matching_files(filter_dir, identity, EXACT_SUFFIX) {
            match fs::read_to_string(&path) {
                Ok(content) => whitelist.extend_exact(&content),
                Err(source) => warn!("{}", WhitelistError::Io { path, source }),
            }
        }

        for path in matching_files(filter_dir, identity, REGEX_SUFFIX) {
            match fs::read_to_string(&path) {
                Ok(content) => {
                    for err in whitelist.extend_regex(&path, &content) {
                        warn!("{}", err);
                    }
                }
                Err(source) => warn!("{}", WhitelistError::Io { path, source }),
            }
        }

        debug!(
            identity,
            exact = whitelist.exact().count(),
            regex = whitelist.patterns().count(),
            "whitelist loaded"
        );
        whitelist
    }

    pub fn push_exact(&mut self, command: impl Into<String>) {
        self.entries.push(WhitelistEntry::Exact(command.into()));
    }

    /// Add a regex entry, enforcing the anchoring rule.
    pub fn push_regex(&mut self, pattern: &str) -> Result<(), WhitelistError> {
        self.push_regex_from(Path::new("<inline>"), 0, pattern)
    }

    pub fn entries(&self) -> &[WhitelistEntry] {
        &self.entries
    }

    pub fn exact(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            WhitelistEntry::Exact(s) => Some(s.as_str()),
            WhitelistEntry::Regex(_) => None,
        })
    }

    pub fn patterns(&self) -> impl Iterator<Item = &AnchoredRegex> {
        self.entries.iter().filter_map(|e| match e {
            WhitelistEntry::Regex(r) => Some(r),
            WhitelistEntry::Exact(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn extend_exact(&mut self, content: &str) {
        for (_, line) in content_lines(content) {
            self.push_exact(line);
        }
    }

    fn extend_regex(&mut self, path: &Path, content: &str) -> Vec<WhitelistError> {
        content_lines(content)
            .filter_map(|(line_no, line)| self.push_regex_from(path, line_no, line).err())
            .collect()
    }

    fn push_regex_from(
        &mut self,
        path: &Path,
        line: usize,
        pattern: &str,
    ) -> Result<(), WhitelistError> {
        if !AnchoredRegex::is_anchored(pattern) {
            return Err(WhitelistError::Unanchored {
                path: path.to_path_buf(),
                line,
                pattern: pattern.to_string(),
            });
        }
        let regex = AnchoredRegex::new(pattern).map_err(|source| WhitelistError::InvalidRegex {
            path: path.to_path_buf(),
            line,
            pattern: pattern.to_string(),
            source: Box::new(source),
        })?;
        self.entries.push(WhitelistEntry::Regex(regex));
        Ok(())
    }
}

/// Usernames come from the passwd database, but they still end up in a path.
fn validate_identity(identity: &str) -> Result<(), WhitelistError> {
    if identity.is_empty() || identity.starts_with('.') || identity.contains('/') {
        return Err(WhitelistError::InvalidIdentity(identity.to_string()));
    }
    Ok(())
}

/// Trimmed, non-empty, non-comment lines with 1-based line numbers.
fn content_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Regular files named `<identity>.<kind>*`, in lexical order.
fn matching_files(filter_dir: &Path, identity: &str, kind: &str) -> Vec<PathBuf> {
    let prefix = format!("{}.{}", identity, kind);

    let read_dir = match fs::read_dir(filter_dir) {
        Ok(read_dir) => read_dir,
        Err(source) => {
            warn!(
                "{}",
                WhitelistError::Io {
                    path: filter_dir.to_path_buf(),
                    source,
                }
            );
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&prefix))
        })
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}
