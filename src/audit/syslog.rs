//! Syslog output on the auth facility.
//!
//! [`Syslog`] owns the process-wide `openlog` state: it is opened once at
//! startup and `closelog` runs when the last handle is dropped. The same
//! handle serves the audit trail (as an [`AuditSink`]) and diagnostic
//! `tracing` events (through [`SyslogLayer`]). The layer lives in the global
//! subscriber for the rest of the process, so it only keeps a weak
//! reference and never delays `closelog`.

use std::ffi::CString;
use std::fmt;
use std::io;
use std::sync::{Arc, Weak};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use super::{AuditSeverity, AuditSink};

pub struct Syslog {
    // openlog keeps the pointer, so the ident must outlive the handle.
    _ident: CString,
}

impl Syslog {
    pub fn open(ident: &str) -> io::Result<Self> {
        let ident = CString::new(ident)?;
        unsafe { libc::openlog(ident.as_ptr(), libc::LOG_PID, libc::LOG_AUTH) };
        Ok(Self { _ident: ident })
    }

    pub fn send(&self, priority: libc::c_int, message: &str) {
        let message = match CString::new(message.replace('\0', "\\0")) {
            Ok(message) => message,
            Err(_) => return,
        };
        unsafe { libc::syslog(priority, c"%s".as_ptr(), message.as_ptr()) };
    }
}

impl Drop for Syslog {
    fn drop(&mut self) {
        unsafe { libc::closelog() };
    }
}

impl AuditSink for Syslog {
    fn record(&self, severity: AuditSeverity, line: &str) {
        self.send(severity_priority(severity), line);
    }
}

fn severity_priority(severity: AuditSeverity) -> libc::c_int {
    match severity {
        AuditSeverity::Info => libc::LOG_INFO,
        AuditSeverity::Warning => libc::LOG_WARNING,
        AuditSeverity::Critical => libc::LOG_ERR,
    }
}

fn level_priority(level: &Level) -> libc::c_int {
    match *level {
        Level::ERROR => libc::LOG_ERR,
        Level::WARN => libc::LOG_WARNING,
        Level::INFO => libc::LOG_INFO,
        Level::DEBUG | Level::TRACE => libc::LOG_DEBUG,
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    extras: Vec<(String, String)>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.extras.push((field.name().to_string(), rendered));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.extras.push((field.name().to_string(), value.to_string()));
        }
    }
}

impl FieldVisitor {
    fn into_line(self, level: &Level) -> String {
        let mut line = format!("{}: {}", level, self.message.unwrap_or_default());
        for (key, value) in self.extras {
            line.push_str(&format!(" {}={}", key, value));
        }
        line
    }
}

/// Forwards diagnostic `tracing` events to syslog.
///
/// Events arriving after the last [`Syslog`] handle was dropped are ignored.
pub struct SyslogLayer {
    syslog: Weak<Syslog>,
}

impl SyslogLayer {
    pub fn new(syslog: &Arc<Syslog>) -> Self {
        Self {
            syslog: Arc::downgrade(syslog),
        }
    }
}

impl<S> Layer<S> for SyslogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Some(syslog) = self.syslog.upgrade() else {
            return;
        };
        let level = event.metadata().level();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        syslog.send(level_priority(level), &visitor.into_line(level));
    }
}
