//! Static file serving stage
//!
//! Serves GET/HEAD requests from a root directory with index file support.
//! Paths are percent-decoded before lookup. Anything it cannot serve (other
//! methods, missing files, undecodable paths, paths escaping the root) falls
//! through to the next stage.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use hyper::header::{self, HeaderValue};
use hyper::{Method, StatusCode};
use tokio::fs;

use super::{Middleware, Next};
use crate::http::{cache, mime, Request, Response};
use crate::logger::{Level, Sink};

pub struct ServeStatic {
    root: PathBuf,
    index_files: Vec<String>,
    sink: Arc<dyn Sink>,
}

impl ServeStatic {
    pub fn new(root: impl Into<PathBuf>, sink: Arc<dyn Sink>) -> Self {
        Self {
            root: root.into(),
            index_files: vec!["index.html".to_string()],
            sink,
        }
    }

    /// Locate the file for the decoded `path` inside the root, trying index
    /// files for directories
    async fn locate(&self, path: &str) -> Option<PathBuf> {
        let relative = path.trim_start_matches('/');
        if relative.split('/').any(|segment| segment == "..") {
            self.sink.report(
                Level::Warn,
                &format!("Path traversal attempt blocked: {path}"),
            );
            return None;
        }

        let root = match fs::canonicalize(&self.root).await {
            Ok(root) => root,
            Err(e) => {
                self.sink.report(
                    Level::Debug,
                    &format!(
                        "Static directory not accessible '{}': {e}",
                        self.root.display()
                    ),
                );
                return None;
            }
        };

        let mut candidate = root.join(relative);
        if fs::metadata(&candidate).await.ok()?.is_dir() {
            let mut found = None;
            for index in &self.index_files {
                let index_path = candidate.join(index);
                if fs::metadata(&index_path).await.is_ok_and(|m| m.is_file()) {
                    found = Some(index_path);
                    break;
                }
            }
            candidate = found?;
        }

        // Symlinks may still point outside the root
        let resolved = fs::canonicalize(&candidate).await.ok()?;
        if !resolved.starts_with(&root) {
            self.sink.report(
                Level::Warn,
                &format!(
                    "Path traversal attempt blocked: {path} -> {}",
                    resolved.display()
                ),
            );
            return None;
        }
        Some(resolved)
    }
}

#[async_trait]
impl Middleware for ServeStatic {
    async fn handle(&self, req: &mut Request, res: &mut Response, next: &mut Next) {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            next.advance();
            return;
        }

        let path = match urlencoding::decode(req.path()) {
            Ok(path) => path.into_owned(),
            Err(e) => {
                self.sink.report(
                    Level::Debug,
                    &format!("Undecodable static path {}: {e}", req.path()),
                );
                next.advance();
                return;
            }
        };

        let Some(file_path) = self.locate(&path).await else {
            next.advance();
            return;
        };

        let content = match fs::read(&file_path).await {
            Ok(content) => content,
            Err(e) => {
                self.sink.report(
                    Level::Error,
                    &format!("Failed to read file '{}': {e}", file_path.display()),
                );
                next.advance();
                return;
            }
        };

        let etag = cache::generate_etag(&content);
        res.set_header(header::ETAG, &etag);
        res.set_header(header::CACHE_CONTROL, "public, max-age=0");

        if cache::etag_matches(req.header(header::IF_NONE_MATCH), &etag) {
            res.set_status(StatusCode::NOT_MODIFIED);
            res.end();
            return;
        }

        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(mime::content_type_for(&file_path)),
        );
        res.send(content);
    }

    fn name(&self) -> &str {
        "static"
    }
}
