//! Logging initialization and configuration.
//!
//! Diagnostic output never goes to stdout or stderr: those belong to the
//! remote caller. Events are forwarded to syslog and, when `log_dir` is
//! configured, to a file in that directory rotated daily
//! (`rcsh.log.YYYY-MM-DD`).
//!
//! # Levels
//!
//! The syslog layer always passes warnings and errors, so skipped whitelist
//! entries reach the auth log whatever else is configured. The file layer
//! follows `log_level` from `/etc/rcsh` (default `info`). Nothing is read
//! from the environment, which the remote caller can partly set.

use std::path::Path;
use std::sync::Arc;

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::audit::{Syslog, SyslogLayer};

/// Fixed threshold for events forwarded to the auth facility.
pub const SYSLOG_LEVEL: LevelFilter = LevelFilter::WARN;

const LOG_FILE_PREFIX: &str = "rcsh.log";

/// Keeps the file writer alive; dropping it flushes pending lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the logging system.
///
/// The subscriber only borrows `syslog`: once the caller drops its last
/// handle, `closelog` runs and later events skip the syslog layer.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging(
    syslog: &Arc<Syslog>,
    log_dir: Option<&Path>,
    file_level: LevelFilter,
) -> LoggingGuard {
    let (file_layer, file_guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false) // No ANSI colors in log files
                .with_target(true) // Include module path
                .with_line_number(true)
                .with_filter(file_level);
            (Some(layer.boxed()), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(SyslogLayer::new(syslog).with_filter(SYSLOG_LEVEL))
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(log_dir = ?log_dir, level = %file_level, "logging initialized");
    }

    LoggingGuard {
        _file_guard: file_guard,
    }
}


#[cfg(test)]
mod tests {
    use super::capture::LevelCapture;
    use super::*;
    use crate::security::Whitelist;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;
    use tracing::Level;

    #[test]
    fn test_skipped_pattern_warns_with_file_logging_off() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("alice.regex"), "ls\n").unwrap();

        let forwarded = LevelCapture::default();
        let file_side = LevelCapture::default();
        let subscriber = tracing_subscriber::registry()
            .with(forwarded.clone().with_filter(SYSLOG_LEVEL))
            .with(file_side.clone().with_filter(LevelFilter::OFF));

        let whitelist = tracing::subscriber::with_default(subscriber, || {
            Whitelist::load("alice", dir.path())
        });

        assert!(whitelist.is_empty());
        assert_eq!(forwarded.levels(), vec![Level::WARN]);
        assert!(file_side.levels().is_empty());
    }

    #[test]
    fn test_syslog_level_drops_diagnostics() {
        let forwarded = LevelCapture::default();
        let subscriber =
            tracing_subscriber::registry().with(forwarded.clone().with_filter(SYSLOG_LEVEL));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("loaded");
            tracing::info!("started");
            tracing::warn!("skipped");
        });

        assert_eq!(forwarded.levels(), vec![Level::WARN]);
    }
}
