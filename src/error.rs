//! Error types
//!
//! [`HttpError`] is the payload carried along the error path of a request.
//! [`ServerError`] is what the caller of `initialise_server` gets back when
//! the listening socket cannot be opened.

use hyper::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};

/// Failure raised while handling a request.
///
/// `status` is 0 until someone classifies the error; the error responder
/// then answers with 500.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    pub message: String,
    pub status: u16,
    /// Extra fields echoed next to `message` and `status` in the JSON body
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl HttpError {
    /// Unclassified error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: 0,
            details: Map::new(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            ..Self::new(message)
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_status(500, message)
    }

    /// The error synthesized when no stage answered the request
    pub fn route_not_found(path: &str) -> Self {
        let now = chrono::Local::now().format("%a %b %d %Y %H:%M:%S GMT%z");
        Self::with_status(404, format!("{now} Route not Found {path}"))
    }

    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Status to answer with: the classification, or 500 when unset or invalid
    pub fn effective_status(&self) -> StatusCode {
        match StatusCode::from_u16(self.status) {
            Ok(status) if self.status != 0 => status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_status(400, err.to_string())
    }
}

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unix socket paths are not supported on this platform: {0}")]
    UnixSocketUnsupported(String),
}
