//! Log writer module
//!
//! A [`Sink`] that writes plain lines to stdout/stderr or appends them to
//! files. Info and debug lines go to the access target, warnings and errors
//! to the error target.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;

use super::{Level, Sink};

/// Log output target
enum LogTarget {
    Stdout,
    Stderr,
    File(Mutex<File>),
}

/// Line-oriented sink with separate access and error targets
pub struct WriterSink {
    access: LogTarget,
    error: LogTarget,
}

impl WriterSink {
    /// stdout for access lines, stderr for problems
    pub const fn stdio() -> Self {
        Self {
            access: LogTarget::Stdout,
            error: LogTarget::Stderr,
        }
    }

    /// Create a writer with optional file paths; `None` keeps the stdio target
    pub fn new(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<Self> {
        let access = match access_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stdout,
        };

        let error = match error_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stderr,
        };

        Ok(Self { access, error })
    }
}

impl Default for WriterSink {
    fn default() -> Self {
        Self::stdio()
    }
}

impl Sink for WriterSink {
    fn report(&self, level: Level, message: &str) {
        let line = format!(
            "{} [{level}] {message}",
            Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        );
        match level {
            Level::Debug | Level::Info => write_to_target(&self.access, &line),
            Level::Warn | Level::Error => write_to_target(&self.error, &line),
        }
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

fn write_to_target(target: &LogTarget, message: &str) {
    match target {
        LogTarget::Stdout => println!("{message}"),
        LogTarget::Stderr => eprintln!("{message}"),
        LogTarget::File(file) => {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{message}");
            }
        }
    }
}
