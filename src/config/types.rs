// Configuration types module
// Caller-facing options and the resolved, immutable configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Caller supplied options; every field is optional.
///
/// Can be built in code or deserialized from a config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Options {
    /// Port to listen on, numeric or string
    pub port: Option<String>,
    /// Interface address, hostname or unix socket path
    pub host: Option<String>,
    /// Access log format passed to the access log stage
    pub log_format: Option<String>,
    /// Runtime environment name; `development` enables permissive CORS
    pub environment: Option<String>,
    /// Directory served by the static stage
    pub static_root: Option<PathBuf>,
    /// Binary only: append info lines to this file instead of stdout
    pub access_log: Option<String>,
    /// Binary only: append warnings and errors to this file instead of stderr
    pub error_log: Option<String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn port(mut self, port: impl ToString) -> Self {
        self.port = Some(port.to_string());
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn log_format(mut self, format: impl Into<String>) -> Self {
        self.log_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    #[must_use]
    pub fn static_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.static_root = Some(root.into());
        self
    }
}

/// Fully resolved configuration; never mutated after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub port: String,
    pub host: String,
    pub log_format: String,
    pub environment: Option<String>,
    pub static_root: PathBuf,
}

impl Configuration {
    /// Whether permissive cross-origin handling is enabled
    pub fn is_development(&self) -> bool {
        self.environment.as_deref() == Some(super::DEVELOPMENT)
    }

    /// Whether `host` names a unix socket path rather than an interface
    pub fn is_unix_socket(&self) -> bool {
        self.host.contains('/')
    }

    /// `host:port`, bracketing bare IPv6 literals
    pub fn authority(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
