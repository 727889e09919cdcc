//! Default terminal error handler
//!
//! Answers with the error's status (500 when unclassified) and a JSON body
//! of the form `{"error": {"message": ..., "status": ...}}`.

use async_trait::async_trait;
use serde::Serialize;

use super::ErrorHandler;
use crate::error::HttpError;
use crate::http::{Request, Response};

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a HttpError,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonErrorResponder;

#[async_trait]
impl ErrorHandler for JsonErrorResponder {
    async fn handle(&self, mut err: HttpError, _req: &Request, res: &mut Response) {
        let status = err.effective_status();
        err.status = status.as_u16();

        res.set_status(status);
        if res.json(&ErrorBody { error: &err }).is_err() {
            res.send_text(err.message);
        }
    }

    fn name(&self) -> &str {
        "json-error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::{Method, StatusCode};

    async fn respond(err: HttpError) -> Response {
        let req = Request::from_path(Method::GET, "/");
        let mut res = Response::new();
        JsonErrorResponder.handle(err, &req, &mut res).await;
        res
    }

    fn body_json(res: &Response) -> serde_json::Value {
        serde_json::from_slice(res.body().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_classified_error() {
        let res = respond(HttpError::with_status(403, "no entry")).await;
        assert!(res.is_ended());
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(&res),
            serde_json::json!({"error": {"message": "no entry", "status": 403}})
        );
    }

    #[tokio::test]
    async fn test_unclassified_error_is_500() {
        let res = respond(HttpError::new("db down").detail("retry", true)).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(&res);
        assert_eq!(body["error"]["status"], 500);
        assert_eq!(body["error"]["retry"], true);
    }
}
