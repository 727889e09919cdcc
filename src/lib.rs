//! Bootstraps an HTTP server around a fixed middleware pipeline.
//!
//! ```no_run
//! use initserver::{initialise_server, Handler};
//!
//! # async fn run() -> Result<(), initserver::ServerError> {
//! let hello = Handler::from_fn("hello", |req, res, next| {
//!     if req.path() == "/hello" {
//!         res.send_text("hi");
//!     } else {
//!         next.advance();
//!     }
//! });
//! let server = initialise_server(hello).await?;
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod pipeline;
pub mod server;

use std::sync::Arc;

pub use crate::config::{Configuration, Options, ServerArgs};
pub use crate::error::{HttpError, ServerError};
pub use crate::handler::{ErrorHandler, Handler, Handlers, Middleware, Next};
pub use crate::http::{Request, Response};
pub use crate::logger::{Level, Sink};
pub use crate::pipeline::Pipeline;
pub use crate::server::{BoundAddr, ServerHandle};

use crate::config::{EnvSource, ProcessEnv};
use crate::logger::TracingSink;

/// Resolve configuration from the process environment, compose the pipeline
/// and start listening. Diagnostics go to `tracing`.
pub async fn initialise_server(args: impl Into<ServerArgs>) -> Result<ServerHandle, ServerError> {
    initialise_server_with(args, &ProcessEnv, Arc::new(TracingSink)).await
}

/// Like [`initialise_server`], with an explicit environment and log sink
pub async fn initialise_server_with(
    args: impl Into<ServerArgs>,
    env: &impl EnvSource,
    sink: Arc<dyn Sink>,
) -> Result<ServerHandle, ServerError> {
    let (config, handlers) = config::resolve(args, env);
    let pipeline = Arc::new(Pipeline::compose(&config, handlers, sink));
    server::start(&config, pipeline).await
}
