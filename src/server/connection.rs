// Connection handling module
// Serves one accepted connection on its own task

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::logger::Level;
use crate::pipeline::Pipeline;

/// Spawn a task serving HTTP/1.1 (with keep-alive) on `stream`.
///
/// Every request on the connection walks its own copy of the dispatch
/// state; the pipeline itself is shared read-only.
pub fn serve_connection<S>(stream: S, remote_addr: Option<SocketAddr>, pipeline: Arc<Pipeline>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let service_pipeline = Arc::clone(&pipeline);

        let conn = http1::Builder::new().keep_alive(true).serve_connection(
            io,
            service_fn(move |req| {
                let pipeline = Arc::clone(&service_pipeline);
                async move { pipeline.serve(req, remote_addr).await }
            }),
        );

        if let Err(err) = conn.await {
            pipeline.report(
                Level::Error,
                &format!("Failed to serve connection from {}: {err}", peer_label(remote_addr)),
            );
        }
    });
}

fn peer_label(remote_addr: Option<SocketAddr>) -> String {
    remote_addr.map_or_else(|| "local socket".to_string(), |addr| addr.to_string())
}
