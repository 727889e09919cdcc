//! Access log stage
//!
//! Captures request details on the way in and reports one formatted line
//! through the sink once the response is final.

use std::sync::Arc;

use async_trait::async_trait;
use hyper::Version;

use super::{Middleware, Next};
use crate::http::{Request, Response};
use crate::logger::{AccessLogEntry, Level, Sink};

pub struct AccessLog {
    format: Arc<str>,
    sink: Arc<dyn Sink>,
}

impl AccessLog {
    pub fn new(format: &str, sink: Arc<dyn Sink>) -> Self {
        Self {
            format: Arc::from(format),
            sink,
        }
    }

    fn entry_for(req: &Request) -> AccessLogEntry {
        let remote_addr = req
            .remote_addr()
            .map_or_else(|| "-".to_string(), |addr| addr.ip().to_string());
        let mut entry = AccessLogEntry::new(
            remote_addr,
            req.method().to_string(),
            req.path().to_string(),
        );
        entry.query = req.query().map(ToString::to_string);
        entry.http_version = version_label(req.version()).to_string();
        entry.referer = req
            .header("referer")
            .or_else(|| req.header("referrer"))
            .map(ToString::to_string);
        entry.user_agent = req.header("user-agent").map(ToString::to_string);
        entry
    }
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2.0",
        Version::HTTP_3 => "3.0",
        _ => "1.1",
    }
}

#[async_trait]
impl Middleware for AccessLog {
    async fn handle(&self, req: &mut Request, res: &mut Response, next: &mut Next) {
        let mut entry = Self::entry_for(req);
        let started = req.received_at();
        let format = Arc::clone(&self.format);
        let sink = Arc::clone(&self.sink);

        res.on_finish(move |res| {
            entry.status = res.status().as_u16();
            entry.body_bytes = res.content_length();
            entry.request_time_us =
                u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            sink.report(Level::Info, &entry.format(&format));
        });

        next.advance();
    }

    fn name(&self) -> &str {
        "access-log"
    }
}
