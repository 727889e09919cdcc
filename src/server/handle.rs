// Server handle module
// The running binding returned to the caller

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Where the server is listening
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundAddr {
    Tcp(std::net::SocketAddr),
    Unix(PathBuf),
}

impl fmt::Display for BoundAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "{addr}"),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Handle to a running server.
///
/// Dropping the handle leaves the server running until the runtime shuts
/// down; call [`ServerHandle::shutdown`] to stop accepting connections.
#[derive(Debug)]
pub struct ServerHandle {
    addr: BoundAddr,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub(crate) const fn new(
        addr: BoundAddr,
        shutdown: Arc<Notify>,
        running: Arc<AtomicBool>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            addr,
            shutdown,
            running,
            task,
        }
    }

    pub const fn local_addr(&self) -> &BoundAddr {
        &self.addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Connections already accepted finish on their own tasks.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.task.await;
        self.running.store(false, Ordering::SeqCst);
    }
}
