//! HTTP response model
//!
//! Stages write into a [`Response`] in place. Ending it marks the request
//! as handled; the pipeline turns it into a hyper response afterwards.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};
use hyper::StatusCode;
use serde::Serialize;

/// Callback run once after dispatch, with the final response
pub type FinishHook = Box<dyn FnOnce(&Response) + Send>;

pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
    ended: bool,
    finish_hooks: Vec<FinishHook>,
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
            ended: false,
            finish_hooks: Vec::new(),
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Header value as text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set a header; values that are not valid header text are rejected
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> bool {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
                true
            }
            Err(_) => false,
        }
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Written body length, `None` when nothing was written
    pub fn content_length(&self) -> Option<usize> {
        self.body.as_ref().map(Bytes::len)
    }

    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    /// Write the body and end the response.
    ///
    /// `Content-Type` defaults to `application/octet-stream` when no stage set one.
    pub fn send(&mut self, body: impl Into<Bytes>) {
        if !self.headers.contains_key(header::CONTENT_TYPE) {
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
        }
        self.body = Some(body.into());
        self.end();
    }

    pub fn send_text(&mut self, text: impl Into<String>) {
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.send(text.into());
    }

    /// Serialize `value` as the JSON body and end the response
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        self.send(body);
        Ok(())
    }

    /// End without (further) body
    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn on_finish(&mut self, hook: impl FnOnce(&Self) + Send + 'static) {
        self.finish_hooks.push(Box::new(hook));
    }

    pub(crate) fn run_finish_hooks(&mut self) {
        let hooks = std::mem::take(&mut self.finish_hooks);
        for hook in hooks {
            hook(&*self);
        }
    }

    /// Convert into the hyper response sent on the wire
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let mut response = hyper::Response::new(Full::new(self.body.unwrap_or_default()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.content_length())
            .field("ended", &self.ended)
            .field("finish_hooks", &self.finish_hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU16, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_new_response_is_open() {
        let res = Response::new();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(!res.is_ended());
        assert_eq!(res.content_length(), None);
    }

    #[test]
    fn test_send_text_ends_and_sets_type() {
        let mut res = Response::new();
        res.send_text("hello");
        assert!(res.is_ended());
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(res.content_length(), Some(5));
    }

    #[test]
    fn test_send_keeps_existing_content_type() {
        let mut res = Response::new();
        res.set_header(header::CONTENT_TYPE, "image/png");
        res.send(vec![1_u8, 2, 3]);
        assert_eq!(res.header("content-type"), Some("image/png"));
    }

    #[test]
    fn test_json_body() {
        let mut res = Response::new();
        res.json(&serde_json::json!({"ok": true})).unwrap();
        assert_eq!(res.body().unwrap().as_ref(), br#"{"ok":true}"#);
        assert_eq!(
            res.header("content-type"),
            Some("application/json; charset=utf-8")
        );
    }

    #[test]
    fn test_invalid_header_value_rejected() {
        let mut res = Response::new();
        assert!(!res.set_header(header::LOCATION, "bad\nvalue"));
        assert!(res.header("location").is_none());
    }

    #[test]
    fn test_finish_hooks_see_final_status() {
        let seen = Arc::new(AtomicU16::new(0));
        let mut res = Response::new();
        let hook_seen = Arc::clone(&seen);
        res.on_finish(move |res| hook_seen.store(res.status().as_u16(), Ordering::SeqCst));
        res.set_status(StatusCode::NOT_FOUND);
        res.run_finish_hooks();
        res.run_finish_hooks();
        assert_eq!(seen.load(Ordering::SeqCst), 404);
    }

    #[test]
    fn test_into_hyper() {
        let mut res = Response::new();
        res.set_status(StatusCode::CREATED);
        res.send_text("made");
        let hyper_res = res.into_hyper();
        assert_eq!(hyper_res.status(), StatusCode::CREATED);
        assert_eq!(
            hyper_res.headers().get("content-type").unwrap(),
            "text/plain; charset=utf-8"
        );
    }
}
