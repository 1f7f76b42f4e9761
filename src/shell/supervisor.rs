//! Running an authorized command under a deadline.
//!
//! The command is handed to `<shell> -c`, with:
//! - stdin closed right after spawn (no interactive input, no shell escapes)
//! - stdout/stderr inherited (output is passed through untouched)
//! - its own process group, so a timeout kills grandchildren too
//!
//! After the wait, our own stdin is probed for smuggled data.

use std::fmt;
use std::io;
use std::os::fd::AsFd;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use super::stdin_probe::probe_stdin_leak;
use crate::config::Config;
use crate::error::{RcshError, Result};

/// Exit code reported when the deadline expires.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Interpreter invoked as `<shell> -c <command>`.
    pub shell: PathBuf,
    /// Wall-clock limit measured from spawn.
    pub timeout: Duration,
}

impl From<&Config> for SupervisorConfig {
    fn from(config: &Config) -> Self {
        Self {
            shell: config.shell.clone(),
            timeout: config.timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    Signaled(i32),
    TimedOut,
}

impl ExitOutcome {
    /// Shell-style exit code: signals map to 128+n, timeouts to the sentinel.
    pub fn code(self) -> i32 {
        match self {
            ExitOutcome::Exited(code) => code,
            ExitOutcome::Signaled(signal) => 128 + signal,
            ExitOutcome::TimedOut => TIMEOUT_EXIT_CODE,
        }
    }

    /// A reaped child has either exited or been killed; a stopped or
    /// continued status here is a wait failure, not an exit code.
    fn from_status(status: ExitStatus) -> Result<Self> {
        match (status.code(), status.signal()) {
            (Some(code), _) => Ok(ExitOutcome::Exited(code)),
            (None, Some(signal)) => Ok(ExitOutcome::Signaled(signal)),
            (None, None) => Err(RcshError::Wait(io::Error::other(format!(
                "child neither exited nor was killed: {:?}",
                status
            )))),
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exit code {}", code),
            ExitOutcome::Signaled(signal) => write!(f, "signal {}", signal),
            ExitOutcome::TimedOut => write!(f, "timeout"),
        }
    }
}

/// What happened to one supervised command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub outcome: ExitOutcome,
    /// First line found pending on our own stdin, if any.
    pub stdin_leak: Option<String>,
}

pub struct Supervisor {
    cfg: SupervisorConfig,
}

impl Supervisor {
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self { cfg }
    }

    pub fn timeout(&self) -> Duration {
        self.cfg.timeout
    }

    /// Run `command` to completion or until the timeout expires.
    ///
    /// `leak_source` is the stream to probe for smuggled input; in
    /// production this is the process's own stdin.
    ///
    /// # Errors
    /// Returns [`RcshError::Spawn`] if the shell cannot be started and
    /// [`RcshError::Wait`] if the child cannot be reaped.
    pub async fn execute(&self, command: &str, leak_source: impl AsFd) -> Result<Execution> {
        let mut child = self.spawn(command)?;
        let deadline = Instant::now() + self.cfg.timeout;

        let outcome = match timeout_at(deadline, child.wait()).await {
            Ok(status) => ExitOutcome::from_status(status.map_err(RcshError::Wait)?)?,
            Err(_) => {
                debug!(timeout = ?self.cfg.timeout, "command timed out, killing process group");
                terminate(&mut child).await?;
                ExitOutcome::TimedOut
            }
        };
        debug!(%outcome, "child finished");

        let stdin_leak = match probe_stdin_leak(leak_source) {
            Ok(leak) => leak,
            Err(e) => {
                warn!("failed to probe stdin: {}", e);
                None
            }
        };

        Ok(Execution { outcome, stdin_leak })
    }

    fn spawn(&self, command: &str) -> Result<Child> {
        let mut cmd = Command::new(&self.cfg.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .process_group(0)
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| RcshError::Spawn {
            shell: self.cfg.shell.clone(),
            source,
        })?;

        // Close the child's stdin immediately; it only ever sees EOF.
        drop(child.stdin.take());
        debug!(pid = child.id(), shell = %self.cfg.shell.display(), "spawned");
        Ok(child)
    }
}

/// Kill the child's whole process group and reap the child.
async fn terminate(child: &mut Child) -> Result<()> {
    if let Some(pid) = child.id() {
        if let Err(e) = kill_process_group(pid) {
            debug!("killpg({}) failed: {}", pid, e);
        }
    }
    if let Err(e) = child.start_kill() {
        debug!("kill of child failed: {}", e);
    }
    child.wait().await.map_err(RcshError::Wait)?;
    Ok(())
}

/// The child is spawned with `process_group(0)`, so its pid is its pgid.
fn kill_process_group(pgid: u32) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pgid out of range"))?;
    let result = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}
