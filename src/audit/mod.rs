//! Audit trail for every invocation.
//!
//! Each authorization decision and execution outcome becomes exactly one
//! human-readable line carrying the identity, the source address and the
//! relevant detail. Lines go to an [`AuditSink`]; in production that is the
//! auth facility of syslog (see [`Syslog`]).
//!
//! Recording is fire-and-forget: a sink that fails to deliver never affects
//! the decision that was made.

mod syslog;

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use syslog::{Syslog, SyslogLayer};

/// Severity level for audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditSeverity {
    /// Informational, the invocation proceeded normally.
    Info,
    /// Something was refused or cut short.
    Warning,
    /// Possible attack or internal fault.
    Critical,
}

impl fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    InteractiveLogin,
    UnexpectedInvocation { argv: Vec<String> },
    Denied { command: String },
    Allowed { command: String },
    StdinLeak { payload: String },
    TimedOut { command: String, timeout: Duration },
    Finished { exit_code: i32 },
    SpawnFailed { error: String },
    InternalError { detail: String },
}

impl AuditEvent {
    pub fn severity(&self) -> AuditSeverity {
        match self {
            Self::Allowed { .. } | Self::Finished { .. } => AuditSeverity::Info,
            Self::InteractiveLogin
            | Self::UnexpectedInvocation { .. }
            | Self::Denied { .. }
            | Self::TimedOut { .. } => AuditSeverity::Warning,
            Self::StdinLeak { .. } | Self::SpawnFailed { .. } | Self::InternalError { .. } => {
                AuditSeverity::Critical
            }
        }
    }

    /// Render the log line for `identity` connecting from `source`.
    pub fn render(&self, identity: &str, source: &str) -> String {
        let who = escape_control(identity);
        let src = escape_control(source);
        match self {
            Self::InteractiveLogin => {
                format!("Interactive login not permitted for \"{}\" from {}", who, src)
            }
            Self::UnexpectedInvocation { argv } => {
                format!("Unexpected invocation by \"{}\" from {}, argv: {:?}", who, src, argv)
            }
            Self::Denied { command } => format!(
                "Invocation not allowed for \"{}\" from {}: {}",
                who,
                src,
                escape_control(command)
            ),
            Self::Allowed { command } => format!(
                "Invocation allowed for \"{}\" from {}: {}",
                who,
                src,
                escape_control(command)
            ),
            Self::StdinLeak { payload } => format!(
                "Invocation for \"{}\" from {} attempted to pass data over stdin: {:?}",
                who, src, payload
            ),
            Self::TimedOut { command, timeout } => format!(
                "Invocation for \"{}\" from {} timed out after {}s: {}",
                who,
                src,
                timeout.as_secs(),
                escape_control(command)
            ),
            Self::Finished { exit_code } => format!(
                "Invocation allowed for \"{}\" from {} finished with exit code {}",
                who, src, exit_code
            ),
            Self::SpawnFailed { error } => format!(
                "Invocation for \"{}\" from {} could not be started: {}",
                who,
                src,
                escape_control(error)
            ),
            Self::InternalError { detail } => format!(
                "Unexpected error occurred during invocation by \"{}\" from {}: {}",
                who,
                src,
                escape_control(detail)
            ),
        }
    }
}

/// Destination for rendered audit lines.
pub trait AuditSink {
    fn record(&self, severity: AuditSeverity, line: &str);
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn record(&self, severity: AuditSeverity, line: &str) {
        (**self).record(severity, line);
    }
}

/// Audit handle for one invocation; identity and source never change.
pub struct Auditor {
    identity: String,
    source: String,
    sink: Box<dyn AuditSink>,
}

impl Auditor {
    pub fn new(
        identity: impl Into<String>,
        source: impl Into<String>,
        sink: Box<dyn AuditSink>,
    ) -> Self {
        Self {
            identity: identity.into(),
            source: source.into(),
            sink,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn record(&self, event: AuditEvent) {
        let line = event.render(&self.identity, &self.source);
        self.sink.record(event.severity(), &line);
    }
}

/// Sink that keeps lines in memory, shared between clones.
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<(AuditSeverity, String)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, line)| line).collect()
    }

    pub fn entries(&self) -> Vec<(AuditSeverity, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl AuditSink for MemorySink {
    fn record(&self, severity: AuditSeverity, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((severity, line.to_string()));
        }
    }
}

/// Escape control characters so untrusted text stays on one log line.
fn escape_control(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}
