//! Not-found fallback: the last normal stage, reached only when nothing
//! before it answered. Diverts to the error handler with a 404.

use async_trait::async_trait;

use super::{Middleware, Next};
use crate::error::HttpError;
use crate::http::{Request, Response};

#[derive(Debug, Default, Clone, Copy)]
pub struct NotFound;

#[async_trait]
impl Middleware for NotFound {
    async fn handle(&self, req: &mut Request, _res: &mut Response, next: &mut Next) {
        next.fail(HttpError::route_not_found(req.path()));
    }

    fn name(&self) -> &str {
        "not-found"
    }
}
