//! Pipeline composition and dispatch
//!
//! The chain is assembled once from the resolved configuration and the
//! caller's handlers, in a fixed order:
//!
//! 1. security headers
//! 2. access log
//! 3. permissive CORS (development only)
//! 4. static files
//! 5. caller handlers, in the order supplied
//! 6. not-found fallback
//! 7. error handler (terminal)
//!
//! Dispatch walks the stages with an explicit index. A stage that ends the
//! response stops the walk, `next.advance()` moves to the following stage
//! and `next.fail(err)` jumps straight to the error handler.

use std::any::Any;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::StatusCode;

use crate::config::Configuration;
use crate::error::HttpError;
use crate::handler::{
    AccessLog, ErrorHandler, Handler, JsonErrorResponder, Middleware, Next, NotFound,
    PermissiveCors, SecurityHeaders, ServeStatic, Step,
};
use crate::http::{Request, Response};
use crate::logger::{Level, Sink};

/// Security headers and access log always lead the chain
const PREAMBLE_STAGES: usize = 2;

/// How a walk over the stages stopped
enum Walk {
    Ended,
    Failed(HttpError),
    Exhausted,
}

pub struct Pipeline {
    stages: Vec<Arc<dyn Middleware>>,
    error_handler: Arc<dyn ErrorHandler>,
    sink: Arc<dyn Sink>,
}

impl Pipeline {
    /// Build the full chain.
    ///
    /// Caller error handlers are pulled out of the sequence: the last one
    /// supplied replaces the default JSON responder, earlier ones are
    /// reported and dropped.
    pub fn compose(
        config: &Configuration,
        handlers: impl IntoIterator<Item = Handler>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        let mut stages: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(SecurityHeaders::new()),
            Arc::new(AccessLog::new(&config.log_format, Arc::clone(&sink))),
        ];
        if config.is_development() {
            stages.push(Arc::new(PermissiveCors));
        }
        stages.push(Arc::new(ServeStatic::new(
            config.static_root.clone(),
            Arc::clone(&sink),
        )));

        let mut error_handler: Option<Arc<dyn ErrorHandler>> = None;
        for handler in handlers {
            match handler {
                Handler::Normal(stage) => stages.push(stage),
                Handler::Error(replacement) => {
                    if let Some(previous) = error_handler.replace(replacement) {
                        sink.report(
                            Level::Warn,
                            &format!(
                                "Error handler '{}' superseded by a later error handler",
                                previous.name()
                            ),
                        );
                    }
                }
            }
        }

        stages.push(Arc::new(NotFound));

        Self {
            stages,
            error_handler: error_handler.unwrap_or_else(|| Arc::new(JsonErrorResponder)),
            sink,
        }
    }

    /// Stage names in dispatch order, error handler last
    pub fn stage_names(&self) -> Vec<String> {
        self.stages
            .iter()
            .map(|stage| stage.name().to_string())
            .chain(std::iter::once(self.error_handler.name().to_string()))
            .collect()
    }

    pub(crate) fn report(&self, level: Level, message: &str) {
        self.sink.report(level, message);
    }

    /// Run one request through the chain and return the final response
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let mut res = Response::new();
        let failure = match self.walk(&self.stages, &mut req, &mut res).await {
            Walk::Ended => None,
            Walk::Failed(err) => Some(err),
            // Only reachable if the fallback itself advanced
            Walk::Exhausted => Some(HttpError::route_not_found(req.path())),
        };
        self.finish(&req, res, failure).await
    }

    /// Answer a request that could not be read.
    ///
    /// Only the always-on header and access log stages run before the error
    /// handler, so the rejection still carries security headers and is logged.
    pub async fn reject(&self, mut req: Request, err: HttpError) -> Response {
        let mut res = Response::new();
        let preamble = &self.stages[..PREAMBLE_STAGES.min(self.stages.len())];
        let failure = match self.walk(preamble, &mut req, &mut res).await {
            Walk::Failed(stage_err) => stage_err,
            Walk::Ended | Walk::Exhausted => err,
        };
        self.finish(&req, res, Some(failure)).await
    }

    /// Walk `stages` in order until one ends the response, fails, or the
    /// slice runs out
    async fn walk(
        &self,
        stages: &[Arc<dyn Middleware>],
        req: &mut Request,
        res: &mut Response,
    ) -> Walk {
        let mut index = 0;

        loop {
            let Some(stage) = stages.get(index) else {
                return Walk::Exhausted;
            };

            let mut next = Next::new();
            let outcome = AssertUnwindSafe(stage.handle(req, res, &mut next))
                .catch_unwind()
                .await;
            if let Err(panic) = outcome {
                self.sink.report(
                    Level::Error,
                    &format!(
                        "Stage '{}' panicked on {} {}: {}",
                        stage.name(),
                        req.method(),
                        req.path(),
                        panic_message(&*panic)
                    ),
                );
                return Walk::Failed(HttpError::internal(format!(
                    "Stage '{}' panicked",
                    stage.name()
                )));
            }

            if res.is_ended() {
                if next.invoked() {
                    self.sink.report(
                        Level::Warn,
                        &format!(
                            "Stage '{}' ended the response and also invoked next; ignoring next",
                            stage.name()
                        ),
                    );
                }
                return Walk::Ended;
            }

            match next.into_step() {
                Step::Advance => index += 1,
                Step::Fail(err) => return Walk::Failed(err),
                Step::Stop => {
                    self.sink.report(
                        Level::Warn,
                        &format!(
                            "Stage '{}' neither ended the response nor invoked next for {} {}",
                            stage.name(),
                            req.method(),
                            req.path()
                        ),
                    );
                    return Walk::Failed(HttpError::internal(format!(
                        "Stage '{}' neither ended the response nor invoked next",
                        stage.name()
                    )));
                }
                Step::Misused => {
                    return Walk::Failed(HttpError::internal(format!(
                        "Stage '{}' invoked next more than once",
                        stage.name()
                    )));
                }
            }
        }
    }

    /// Run the error handler if needed, end the response and fire finish hooks
    async fn finish(&self, req: &Request, mut res: Response, failure: Option<HttpError>) -> Response {
        if let Some(err) = failure {
            let outcome = AssertUnwindSafe(self.error_handler.handle(err, req, &mut res))
                .catch_unwind()
                .await;
            if let Err(panic) = outcome {
                self.sink.report(
                    Level::Error,
                    &format!(
                        "Error handler '{}' panicked: {}",
                        self.error_handler.name(),
                        panic_message(&*panic)
                    ),
                );
                res.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                res.send_text("Internal Server Error");
            }
        }

        res.end();
        res.run_finish_hooks();
        res
    }

    /// hyper service entry: buffer the body, dispatch, convert back
    pub async fn serve(
        &self,
        req: hyper::Request<Incoming>,
        remote_addr: Option<SocketAddr>,
    ) -> Result<hyper::Response<Full<Bytes>>, Infallible> {
        let (parts, body) = req.into_parts();
        let response = match body.collect().await {
            Ok(collected) => {
                let request = Request::from_parts(parts, collected.to_bytes(), remote_addr);
                self.dispatch(request).await
            }
            Err(e) => {
                let request = Request::from_parts(parts, Bytes::new(), remote_addr);
                self.reject(
                    request,
                    HttpError::with_status(400, format!("Failed to read request body: {e}")),
                )
                .await
            }
        };
        Ok(response.into_hyper())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}
