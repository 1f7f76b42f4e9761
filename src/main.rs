//! Main entry point for rcsh.
//!
//! Installed as the login shell of a restricted account. sshd runs it as
//! `rcsh -c <command>`; the command only runs if the account's whitelist
//! allows it. Every decision is written to the auth syslog facility.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use rcsh::app::{self, App, Invocation, FAILURE_EXIT_CODE};
use rcsh::audit::{AuditEvent, Auditor, Syslog};
use rcsh::config::{Config, DEFAULT_CONFIG_FILE};
use rcsh::context::{self, InvocationContext};
use rcsh::utils;
use tracing::{debug, warn};

const SYSLOG_IDENT: &str = "rcsh";
const UNKNOWN_IDENTITY: &str = "unknown user";

fn main() -> ExitCode {
    // The default hook prints to stderr, which belongs to the caller. The
    // payload is audited below; the location only goes to the file log.
    panic::set_hook(Box::new(|info| debug!("panic: {}", info)));

    let invocation = Invocation::from_args_os(std::env::args_os());

    let syslog = match Syslog::open(SYSLOG_IDENT) {
        Ok(syslog) => Arc::new(syslog),
        Err(_) => {
            app::report_generic_error();
            return ExitCode::FAILURE;
        }
    };

    let (config, config_error) = Config::load_or_default(Path::new(DEFAULT_CONFIG_FILE));
    let _logging =
        utils::logger::init_logging(&syslog, config.log_dir.as_deref(), config.log_level());
    if let Some(e) = config_error {
        warn!("{}; falling back to defaults", e);
    }

    let invocation_context = match InvocationContext::capture() {
        Ok(invocation_context) => invocation_context,
        Err(e) => {
            let auditor =
                Auditor::new(UNKNOWN_IDENTITY, context::source_address(), Box::new(syslog));
            auditor.record(AuditEvent::InternalError {
                detail: e.to_string(),
            });
            app::report_generic_error();
            return ExitCode::FAILURE;
        }
    };

    let app = App::new(config, invocation_context, Box::new(syslog));

    let code = match panic::catch_unwind(AssertUnwindSafe(|| run(&app, invocation))) {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            app.report_internal_error(&format!("{:#}", e));
            FAILURE_EXIT_CODE
        }
        Err(payload) => {
            app.report_internal_error(&panic_detail(payload.as_ref()));
            FAILURE_EXIT_CODE
        }
    };

    ExitCode::from(app::exit_status_byte(code))
}

fn panic_detail(payload: &(dyn std::any::Any + Send)) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str));
    match message {
        Some(message) => format!("panic during invocation: {}", message),
        None => "panic during invocation".to_string(),
    }
}

fn run(app: &App, invocation: Invocation) -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let stdin = std::io::stdin();
    Ok(runtime.block_on(app.run(invocation, &stdin)))
}
