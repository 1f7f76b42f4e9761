//! Error types for the restricted shell.
//!
//! Every failure is handled at the top level of the dispatcher; none of
//! these are ever rendered onto the caller's own terminal.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Problems reading `/etc/rcsh`. All of them degrade to the defaults.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for `{key}` in {path}: {reason}")]
    Invalid {
        path: PathBuf,
        key: &'static str,
        reason: String,
    },
}

/// A single whitelist file or line that was skipped during loading.
#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("refusing to load whitelist for identity {0:?}")]
    InvalidIdentity(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}:{line}: pattern {pattern:?} is not anchored with ^ and $")]
    Unanchored {
        path: PathBuf,
        line: usize,
        pattern: String,
    },

    #[error("{path}:{line}: invalid pattern {pattern:?}: {source}")]
    InvalidRegex {
        path: PathBuf,
        line: usize,
        pattern: String,
        #[source]
        source: Box<regex::Error>,
    },
}

#[derive(Debug, Error)]
pub enum RcshError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    WhitelistLoad(#[from] WhitelistError),

    #[error("command not permitted")]
    Denied,

    #[error("failed to start {shell}: {source}")]
    Spawn {
        shell: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for child process: {0}")]
    Wait(#[source] io::Error),

    #[error("cannot resolve invoking user: {0}")]
    Identity(String),
}

pub type Result<T> = std::result::Result<T, RcshError>;
