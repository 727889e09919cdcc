//! Request model handed to every pipeline stage.

use std::net::SocketAddr;
use std::time::Instant;

use hyper::body::Bytes;
use hyper::header::{AsHeaderName, HeaderMap, HeaderValue, IntoHeaderName};
use hyper::http::Extensions;
use hyper::{Method, Uri, Version};

/// An inbound request, fully buffered.
///
/// Stages may mutate headers and extensions to pass data to later stages.
/// The body is kept as raw bytes; parsing it is up to the handlers.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    received_at: Instant,
    extensions: Extensions,
}

impl Request {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            received_at: Instant::now(),
            extensions: Extensions::new(),
        }
    }

    /// Build a request for `path`; an unparsable path becomes `/`
    pub fn from_path(method: Method, path: &str) -> Self {
        Self::new(method, path.parse().unwrap_or_default())
    }

    /// Assemble from the parts hyper produced and the collected body
    pub fn from_parts(
        parts: hyper::http::request::Parts,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            remote_addr,
            received_at: Instant::now(),
            extensions: parts.extensions,
        }
    }

    #[must_use]
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub const fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub const fn version(&self) -> Version {
        self.version
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Header value as text, `None` if absent or not visible ASCII
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    pub const fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub const fn received_at(&self) -> Instant {
        self.received_at
    }

    pub const fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_splits_query() {
        let req = Request::from_path(Method::GET, "/api/users?page=2");
        assert_eq!(req.path(), "/api/users");
        assert_eq!(req.query(), Some("page=2"));
    }

    #[test]
    fn test_invalid_path_falls_back_to_root() {
        let req = Request::from_path(Method::GET, "not a uri");
        assert_eq!(req.path(), "/");
    }

    #[test]
    fn test_headers_and_extensions() {
        let mut req = Request::from_path(Method::POST, "/")
            .with_header("user-agent", "test-agent")
            .with_body("payload");
        req.extensions_mut().insert(42_u32);

        assert_eq!(req.header("user-agent"), Some("test-agent"));
        assert_eq!(req.header("referer"), None);
        assert_eq!(req.body().as_ref(), b"payload");
        assert_eq!(req.extensions().get::<u32>(), Some(&42));
    }
}
