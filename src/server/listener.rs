// Listener module
// Resolves the configured host/port and opens the listening socket

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

use crate::config::Configuration;
use crate::error::ServerError;

/// Create a `TcpListener` with `SO_REUSEADDR` enabled.
///
/// `SO_REUSEPORT` is deliberately left off: a port already held by another
/// process has to fail the bind.
pub fn create_listener(addr: std::net::SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // Allows rebinding a port still in TIME_WAIT after a restart
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// Resolve `host:port` to the first socket address (hostnames via DNS)
pub async fn resolve_addr(config: &Configuration) -> Result<std::net::SocketAddr, ServerError> {
    let authority = config.authority();
    let port: u16 = config
        .port
        .parse()
        .map_err(|e| ServerError::InvalidAddress {
            addr: authority.clone(),
            reason: format!("invalid port '{}': {e}", config.port),
        })?;

    let mut addrs = tokio::net::lookup_host((config.host.as_str(), port))
        .await
        .map_err(|e| ServerError::InvalidAddress {
            addr: authority.clone(),
            reason: e.to_string(),
        })?;

    addrs.next().ok_or_else(|| ServerError::InvalidAddress {
        addr: authority,
        reason: "host resolved to no addresses".to_string(),
    })
}

/// Resolve and bind in one step
pub async fn bind_tcp(config: &Configuration) -> Result<TcpListener, ServerError> {
    let addr = resolve_addr(config).await?;
    create_listener(addr).map_err(|source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    })
}

#[cfg(unix)]
pub fn bind_unix(path: &str) -> Result<tokio::net::UnixListener, ServerError> {
    tokio::net::UnixListener::bind(path).map_err(|source| ServerError::Bind {
        addr: path.to_string(),
        source,
    })
}
