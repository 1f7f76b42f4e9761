//! Invocation dispatch.
//!
//! This module decides what kind of invocation we received, wires the
//! whitelist, the decision and the supervisor together, and maps every
//! outcome to an exit code. It never exits the process itself; the caller
//! turns the returned code into the process status.

use std::ffi::OsString;
use std::io::{self, Write};
use std::os::fd::AsFd;

use tracing::debug;

use crate::audit::{AuditEvent, AuditSink, Auditor};
use crate::config::Config;
use crate::context::InvocationContext;
use crate::error::{RcshError, Result};
use crate::security::{evaluate, Verdict, Whitelist};
use crate::shell::{ExitOutcome, Supervisor, SupervisorConfig};

/// Flag sshd passes before a forced or requested command.
pub const COMMAND_FLAG: &str = "-c";
/// Exit code for any refusal or internal failure.
pub const FAILURE_EXIT_CODE: i32 = 1;
/// Exit code when the shell itself could not be started.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = -1;

const INTERACTIVE_MESSAGE: &str = "Interactive login not permitted.";
const GENERIC_ERROR_MESSAGE: &str = "Unexpected error occurred.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// No arguments: someone tried to open a login shell.
    Interactive,
    /// `-c <command>`.
    Command(String),
    /// Any other argument shape, kept verbatim for the audit line.
    Unexpected(Vec<String>),
}

impl Invocation {
    /// Classify `argv`, program name included.
    pub fn parse(argv: &[String]) -> Self {
        match argv {
            [] | [_] => Invocation::Interactive,
            [_, flag, command] if flag == COMMAND_FLAG => Invocation::Command(command.clone()),
            _ => Invocation::Unexpected(argv.to_vec()),
        }
    }

    /// Like [`Invocation::parse`], but arguments that are not valid UTF-8
    /// always make the invocation unexpected.
    pub fn from_args_os(args: impl IntoIterator<Item = OsString>) -> Self {
        let mut argv = Vec::new();
        let mut lossy = false;
        for arg in args {
            match arg.into_string() {
                Ok(arg) => argv.push(arg),
                Err(arg) => {
                    lossy = true;
                    argv.push(arg.to_string_lossy().into_owned());
                }
            }
        }

        if lossy {
            Invocation::Unexpected(argv)
        } else {
            Self::parse(&argv)
        }
    }
}

/// Convert an exit code to a process status byte; out-of-range codes,
/// including the negative sentinels, become 255.
pub fn exit_status_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(u8::MAX)
}

pub struct App {
    config: Config,
    auditor: Auditor,
    supervisor: Supervisor,
}

impl App {
    pub fn new(config: Config, context: InvocationContext, sink: Box<dyn AuditSink>) -> Self {
        let supervisor = Supervisor::new(SupervisorConfig::from(&config));
        let auditor = Auditor::new(context.identity, context.source, sink);
        Self {
            config,
            auditor,
            supervisor,
        }
    }

    pub fn auditor(&self) -> &Auditor {
        &self.auditor
    }

    /// Handle one invocation and return its exit code.
    ///
    /// `stdin` is probed for smuggled data after an authorized command ran.
    pub async fn run(&self, invocation: Invocation, stdin: impl AsFd) -> i32 {
        match invocation {
            Invocation::Interactive => {
                write_to(&mut io::stdout(), INTERACTIVE_MESSAGE);
                self.auditor.record(AuditEvent::InteractiveLogin);
                FAILURE_EXIT_CODE
            }
            Invocation::Unexpected(argv) => {
                self.auditor
                    .record(AuditEvent::UnexpectedInvocation { argv });
                FAILURE_EXIT_CODE
            }
            Invocation::Command(command) => match self.run_command(&command, stdin).await {
                Ok(code) => code,
                Err(RcshError::Denied) => FAILURE_EXIT_CODE,
                Err(e @ RcshError::Spawn { .. }) => {
                    self.auditor.record(AuditEvent::SpawnFailed {
                        error: e.to_string(),
                    });
                    SPAWN_FAILURE_EXIT_CODE
                }
                Err(e) => {
                    self.report_internal_error(&e.to_string());
                    FAILURE_EXIT_CODE
                }
            },
        }
    }

    /// Audit an unexpected fault and tell the caller only that it happened.
    ///
    /// The audit line is the only auth-log record of the fault.
    pub fn report_internal_error(&self, detail: &str) {
        self.auditor.record(AuditEvent::InternalError {
            detail: detail.to_string(),
        });
        report_generic_error();
    }

    async fn run_command(&self, command: &str, stdin: impl AsFd) -> Result<i32> {
        self.authorize(command)?;

        let execution = self.supervisor.execute(command, stdin).await?;

        if let Some(payload) = execution.stdin_leak {
            self.auditor.record(AuditEvent::StdinLeak { payload });
        }
        if execution.outcome == ExitOutcome::TimedOut {
            self.auditor.record(AuditEvent::TimedOut {
                command: command.to_string(),
                timeout: self.supervisor.timeout(),
            });
        }

        let exit_code = execution.outcome.code();
        self.auditor.record(AuditEvent::Finished { exit_code });
        Ok(exit_code)
    }

    fn authorize(&self, command: &str) -> Result<()> {
        let whitelist = Whitelist::load(self.auditor.identity(), &self.config.filter_dir);

        match evaluate(command, &whitelist) {
            Verdict::Allow => {
                self.auditor.record(AuditEvent::Allowed {
                    command: command.to_string(),
                });
                Ok(())
            }
            Verdict::Deny => {
                self.auditor.record(AuditEvent::Denied {
                    command: command.to_string(),
                });
                Err(RcshError::Denied)
            }
        }
    }
}

/// Print the fixed failure notice on stderr; no detail is ever included.
pub fn report_generic_error() {
    write_to(&mut io::stderr(), GENERIC_ERROR_MESSAGE);
}

fn write_to(out: &mut impl Write, message: &str) {
    if let Err(e) = writeln!(out, "{}", message).and_then(|()| out.flush()) {
        debug!("failed to write to caller: {}", e);
    }
}
