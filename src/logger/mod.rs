//! Logger module
//!
//! Observability for the server is an injected [`Sink`] rather than a
//! process-wide logger. The caller owns the sink and hands it to the
//! pipeline and the server binding, which report:
//! - the startup line once the socket is live
//! - one access log line per request
//! - warnings about handlers that misuse the continuation
//! - connection level errors

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::WriterSink;

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity attached to every report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for everything the server wants to say
pub trait Sink: Send + Sync {
    fn report(&self, level: Level, message: &str);
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn report(&self, level: Level, message: &str) {
        (**self).report(level, message);
    }
}

/// Forwards reports to the `tracing` macros.
///
/// This is the sink the binary installs after initialising
/// `tracing-subscriber`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn report(&self, level: Level, message: &str) {
        match level {
            Level::Debug => tracing::debug!("{message}"),
            Level::Info => tracing::info!("{message}"),
            Level::Warn => tracing::warn!("{message}"),
            Level::Error => tracing::error!("{message}"),
        }
    }
}

/// Keeps every report in memory.
///
/// Useful when embedding the server in tests or when the caller wants to
/// inspect what was reported.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all reports so far, oldest first
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Messages reported at exactly `level`
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }
}

impl Sink for MemorySink {
    fn report(&self, level: Level, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}
