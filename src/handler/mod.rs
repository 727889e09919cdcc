//! Handler model
//!
//! Everything the pipeline runs is a [`Handler`]: either a normal stage that
//! may answer, advance or fail, or a terminal error handler. Built-in stages
//! and caller code implement the same traits.

pub mod access_log;
pub mod cors;
pub mod error_responder;
mod next;
pub mod not_found;
pub mod security;
pub mod static_files;

pub use access_log::AccessLog;
pub use cors::PermissiveCors;
pub use error_responder::JsonErrorResponder;
pub use next::Next;
pub(crate) use next::Step;
pub use not_found::NotFound;
pub use security::SecurityHeaders;
pub use static_files::ServeStatic;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HttpError;
use crate::http::{Request, Response};

/// A normal pipeline stage.
///
/// Implementations either end `res`, call `next.advance()`, or call
/// `next.fail(err)`. The continuation must be invoked at most once.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: &mut Request, res: &mut Response, next: &mut Next);

    /// Label used in stage listings and warnings
    fn name(&self) -> &str {
        "handler"
    }
}

/// Terminal stage reached by every failed request; always produces a response.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn handle(&self, err: HttpError, req: &Request, res: &mut Response);

    fn name(&self) -> &str {
        "error-handler"
    }
}

#[derive(Clone)]
pub enum Handler {
    Normal(Arc<dyn Middleware>),
    Error(Arc<dyn ErrorHandler>),
}

impl Handler {
    pub fn middleware(m: impl Middleware + 'static) -> Self {
        Self::Normal(Arc::new(m))
    }

    pub fn error(h: impl ErrorHandler + 'static) -> Self {
        Self::Error(Arc::new(h))
    }

    /// Wrap a synchronous closure as a normal handler
    pub fn from_fn<F>(name: &str, f: F) -> Self
    where
        F: Fn(&mut Request, &mut Response, &mut Next) + Send + Sync + 'static,
    {
        Self::middleware(FnMiddleware {
            name: name.to_string(),
            f,
        })
    }

    /// Wrap a synchronous closure as an error handler
    pub fn from_error_fn<F>(name: &str, f: F) -> Self
    where
        F: Fn(HttpError, &Request, &mut Response) + Send + Sync + 'static,
    {
        Self::error(FnErrorHandler {
            name: name.to_string(),
            f,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Normal(m) => m.name(),
            Self::Error(e) => e.name(),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal(m) => f.debug_tuple("Normal").field(&m.name()).finish(),
            Self::Error(e) => f.debug_tuple("Error").field(&e.name()).finish(),
        }
    }
}

struct FnMiddleware<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut Request, &mut Response, &mut Next) + Send + Sync + 'static,
{
    async fn handle(&self, req: &mut Request, res: &mut Response, next: &mut Next) {
        (self.f)(req, res, next);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct FnErrorHandler<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> ErrorHandler for FnErrorHandler<F>
where
    F: Fn(HttpError, &Request, &mut Response) + Send + Sync + 'static,
{
    async fn handle(&self, err: HttpError, req: &Request, res: &mut Response) {
        (self.f)(err, req, res);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Caller handler input, normalized to an ordered sequence.
///
/// A single handler becomes a one-element sequence and `None` becomes an
/// empty one; normalization never fails.
#[derive(Debug, Clone, Default)]
pub struct Handlers(Vec<Handler>);

impl Handlers {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Handler> {
        self.0
    }
}

impl From<Handler> for Handlers {
    fn from(handler: Handler) -> Self {
        Self(vec![handler])
    }
}

impl From<Vec<Handler>> for Handlers {
    fn from(handlers: Vec<Handler>) -> Self {
        Self(handlers)
    }
}

impl<T: Into<Handlers>> From<Option<T>> for Handlers {
    fn from(handlers: Option<T>) -> Self {
        handlers.map(Into::into).unwrap_or_default()
    }
}

impl IntoIterator for Handlers {
    type Item = Handler;
    type IntoIter = std::vec::IntoIter<Handler>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
