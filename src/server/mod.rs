// Server module entry point
// Binds the configured address and runs the accept loop

pub mod connection;
pub mod handle;
pub mod listener;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

pub use connection::serve_connection;
pub use handle::{BoundAddr, ServerHandle};
pub use listener::{bind_tcp, create_listener, resolve_addr};

use crate::config::Configuration;
use crate::error::ServerError;
use crate::logger::Level;
use crate::pipeline::Pipeline;

/// Bind the configured address and start accepting connections.
///
/// Returns once the socket is listening; a bind failure is returned to the
/// caller instead of being swallowed. The startup line is reported through
/// the pipeline's sink.
pub async fn start(config: &Configuration, pipeline: Arc<Pipeline>) -> Result<ServerHandle, ServerError> {
    let shutdown = Arc::new(Notify::new());
    let running = Arc::new(AtomicBool::new(true));

    if config.is_unix_socket() {
        return start_unix(config, pipeline, shutdown, running);
    }

    let listener = bind_tcp(config).await?;
    let local = listener
        .local_addr()
        .map_err(|source| ServerError::Bind {
            addr: config.authority(),
            source,
        })?;

    pipeline.report(
        Level::Info,
        &format!("Server started at http://{}:{}", config.host, local.port()),
    );

    let signal = Arc::clone(&shutdown);
    let flag = Arc::clone(&running);
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        serve_connection(stream, Some(peer_addr), Arc::clone(&pipeline));
                    }
                    Err(e) => {
                        pipeline.report(Level::Error, &format!("Failed to accept connection: {e}"));
                    }
                },
                () = signal.notified() => {
                    pipeline.report(Level::Info, &format!("Server at {local} shutting down"));
                    break;
                }
            }
        }
        flag.store(false, Ordering::SeqCst);
    });

    Ok(ServerHandle::new(BoundAddr::Tcp(local), shutdown, running, task))
}

#[cfg(unix)]
fn start_unix(
    config: &Configuration,
    pipeline: Arc<Pipeline>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
) -> Result<ServerHandle, ServerError> {
    let path = std::path::PathBuf::from(&config.host);
    let listener = listener::bind_unix(&config.host)?;

    pipeline.report(
        Level::Info,
        &format!("Server started at unix:{}", path.display()),
    );

    let signal = Arc::clone(&shutdown);
    let flag = Arc::clone(&running);
    let socket_path = path.clone();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => serve_connection(stream, None, Arc::clone(&pipeline)),
                    Err(e) => {
                        pipeline.report(Level::Error, &format!("Failed to accept connection: {e}"));
                    }
                },
                () = signal.notified() => {
                    pipeline.report(
                        Level::Info,
                        &format!("Server at unix:{} shutting down", socket_path.display()),
                    );
                    break;
                }
            }
        }
        let _ = std::fs::remove_file(&socket_path);
        flag.store(false, Ordering::SeqCst);
    });

    Ok(ServerHandle::new(BoundAddr::Unix(path), shutdown, running, task))
}

#[cfg(not(unix))]
fn start_unix(
    config: &Configuration,
    _pipeline: Arc<Pipeline>,
    _shutdown: Arc<Notify>,
    _running: Arc<AtomicBool>,
) -> Result<ServerHandle, ServerError> {
    Err(ServerError::UnixSocketUnsupported(config.host.clone()))
}
