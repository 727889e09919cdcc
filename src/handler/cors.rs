//! Permissive cross-origin stage
//!
//! Allows any origin. Preflight `OPTIONS` requests are answered here with
//! 204; everything else continues down the chain.

use async_trait::async_trait;
use hyper::header::{self, HeaderValue};
use hyper::{Method, StatusCode};

use super::{Middleware, Next};
use crate::http::{Request, Response};

const ALLOWED_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveCors;

#[async_trait]
impl Middleware for PermissiveCors {
    async fn handle(&self, req: &mut Request, res: &mut Response, next: &mut Next) {
        let headers = res.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );

        if req.method() != Method::OPTIONS {
            next.advance();
            return;
        }

        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        if let Some(requested) = req.headers().get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
            headers.append(
                header::VARY,
                HeaderValue::from_static("Access-Control-Request-Headers"),
            );
        }
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        res.set_status(StatusCode::NO_CONTENT);
        res.end();
    }

    fn name(&self) -> &str {
        "cors"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_request_gets_origin_header() {
        let mut req = Request::from_path(Method::GET, "/data");
        let mut res = Response::new();
        let mut next = Next::new();
        PermissiveCors.handle(&mut req, &mut res, &mut next).await;

        assert!(next.invoked());
        assert!(!res.is_ended());
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn test_preflight_is_answered() {
        let mut req = Request::from_path(Method::OPTIONS, "/data")
            .with_header("access-control-request-headers", "content-type,x-token");
        let mut res = Response::new();
        let mut next = Next::new();
        PermissiveCors.handle(&mut req, &mut res, &mut next).await;

        assert!(!next.invoked());
        assert!(res.is_ended());
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(res.header("access-control-allow-methods"), Some(ALLOWED_METHODS));
        assert_eq!(
            res.header("access-control-allow-headers"),
            Some("content-type,x-token")
        );
    }
}
