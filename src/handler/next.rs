//! Continuation passed to every normal handler.
//!
//! A handler reports what should happen after it returns by calling
//! [`Next::advance`] or [`Next::fail`] at most once. The pipeline reads the
//! recorded outcome and moves its index accordingly; nothing is called
//! recursively.

use crate::error::HttpError;

/// What the dispatcher does after a handler returned
#[derive(Debug)]
pub(crate) enum Step {
    /// Continuation never invoked
    Stop,
    Advance,
    Fail(HttpError),
    /// Continuation invoked more than once
    Misused,
}

#[derive(Debug, Default)]
pub struct Next {
    calls: u32,
    error: Option<HttpError>,
}

impl Next {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass control to the next handler in the chain
    pub fn advance(&mut self) {
        self.calls = self.calls.saturating_add(1);
    }

    /// Skip the remaining handlers and go straight to the error handler
    pub fn fail(&mut self, err: impl Into<HttpError>) {
        self.calls = self.calls.saturating_add(1);
        self.error = Some(err.into());
    }

    /// Whether the continuation has been invoked at all
    pub const fn invoked(&self) -> bool {
        self.calls > 0
    }

    pub(crate) fn into_step(self) -> Step {
        match (self.calls, self.error) {
            (0, _) => Step::Stop,
            (1, None) => Step::Advance,
            (1, Some(err)) => Step::Fail(err),
            _ => Step::Misused,
        }
    }
}
