//! Forwarding of library log records to a host-provided logger.
//!
//! The crate logs through the `log` facade. Hosts that already install a
//! `log` implementation need nothing from this module. Hosts that route
//! logging through their own system implement [`Logger`] and call
//! [`set_logger`] once at startup.
//!
//! Payloads are never logged; records carry operation names, account names
//! and status codes only.

use std::sync::{Arc, OnceLock};

/// Receives log records from this crate.
///
/// # Examples
///
/// ```rust
/// use keychainkit_core::logger::{Logger, LogLevel};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{:?}] {}", level, message);
///     }
/// }
/// ```
pub trait Logger: Sync + Send {
    /// Logs `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Per-operation diagnostics.
    Debug,
    /// Informational messages.
    Info,
    /// Backend failures surfaced to callers.
    Warn,
    /// Errors.
    Error,
}

/// `log::Log` implementation that forwards to the installed [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        // Debug and trace records from other crates are dropped.
        if !should_forward(record.level(), record.module_path()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    let is_debug_or_trace = level == log::Level::Debug || level == log::Level::Trace;
    let is_from_keychainkit = module_path.is_some_and(|path| path.starts_with("keychainkit"));
    !is_debug_or_trace || is_from_keychainkit
}

const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs `logger` as the destination of this crate's log records.
///
/// Only the first call takes effect. If another `log` implementation is
/// already installed, records keep going there and a message is printed to
/// stderr.
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
