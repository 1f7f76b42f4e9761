//! Configuration loading for `/etc/rcsh`.
//!
//! The file is a small TOML document of `key = value` lines. Every key is
//! optional; anything missing falls back to the documented default. A file
//! that cannot be used at all degrades to [`Config::default`], which never
//! grants more than the whitelist files do.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "/etc/rcsh";
pub const DEFAULT_FILTER_DIR: &str = "/etc/rcsh.d";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SHELL: &str = "/bin/sh";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `<user>.exact*` and `<user>.regex*` files.
    pub filter_dir: PathBuf,
    /// Wall-clock limit for the invoked command, in seconds.
    #[serde(rename = "timeout")]
    pub timeout_secs: u64,
    /// Interpreter used as `<shell> -c <command>`.
    pub shell: PathBuf,
    /// Optional directory for daily-rotated diagnostic logs.
    pub log_dir: Option<PathBuf>,
    /// Threshold for the file log: `off`, `error`, `warn`, `info`, `debug`
    /// or `trace`. Syslog always receives warnings.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filter_dir: PathBuf::from(DEFAULT_FILTER_DIR),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            shell: PathBuf::from(DEFAULT_SHELL),
            log_dir: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Load and validate the configuration at `path`.
    ///
    /// A missing file is not an error and yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// Like [`Config::load`], but falls back to the defaults on any error.
    ///
    /// The error is handed back so it can be logged once logging is running.
    pub fn load_or_default(path: &Path) -> (Self, Option<ConfigError>) {
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::INFO)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                key: "timeout",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.filter_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                key: "filter_dir",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.shell.is_absolute() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                key: "shell",
                reason: "must be an absolute path".to_string(),
            });
        }
        if let Err(e) = self.log_level.parse::<LevelFilter>() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                key: "log_level",
                reason: e.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("rcsh");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("absent")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.filter_dir, PathBuf::from("/etc/rcsh.d"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "# local overrides\ntimeout = 5\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.filter_dir, PathBuf::from(DEFAULT_FILTER_DIR));
        assert_eq!(config.shell, PathBuf::from(DEFAULT_SHELL));
        assert_eq!(config.log_dir, None);
        assert_eq!(config.log_level(), LevelFilter::INFO);
    }

    #[test]
    fn test_full_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
filter_dir = "/srv/rcsh.d"
timeout = 120
shell = "/bin/bash"
log_dir = "/var/log/rcsh"
log_level = "debug"
"#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(
            config,
            Config {
                filter_dir: PathBuf::from("/srv/rcsh.d"),
                timeout_secs: 120,
                shell: PathBuf::from("/bin/bash"),
                log_dir: Some(PathBuf::from("/var/log/rcsh")),
                log_level: "debug".to_string(),
            }
        );
        assert_eq!(config.log_level(), LevelFilter::DEBUG);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "log_stdin = true\ntimeout = 7\n");
        assert_eq!(Config::load(&path).unwrap().timeout_secs, 7);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "timeout = = 5\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_wrong_type_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "timeout = \"soon\"\n");
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "timeout = 0\n");
        match Config::load(&path) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "timeout"),
            other => panic!("expected invalid timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_relative_shell_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "shell = \"sh\"\n");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid { key: "shell", .. })
        ));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "log_level = \"chatty\"\n");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid { key: "log_level", .. })
        ));
    }

    #[test]
    fn test_load_or_default_degrades() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "filter_dir = \"/tmp/x\"\ntimeout = 0\n");
        let (config, err) = Config::load_or_default(&path);
        assert_eq!(config, Config::default());
        assert!(err.is_some());
    }
}
