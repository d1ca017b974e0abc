//! TCP transport implementation.
//!
//! Provides the [`Connector`] used for both the primary relay connection and
//! the ephemeral file-transfer connections, plus relay address resolution.

use crate::TransportConfig;
use crate::transport::{BoxedTransport, Connector, TransportError, TransportResult};
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;

/// Opens TCP streams with a bounded connect time.
///
/// # Examples
///
/// ```no_run
/// use lanchat_transport::{Connector, TcpConnector};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let connector = TcpConnector::new().with_nodelay(false);
/// let _stream = connector
///     .connect("192.168.1.20:50123".parse()?, Duration::from_secs(3))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    config: TransportConfig,
}

impl TcpConnector {
    /// Create a connector with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connector from an explicit transport configuration
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Enable or disable `TCP_NODELAY` on opened streams
    #[must_use]
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    /// Open a concrete `TcpStream`.
    ///
    /// # Errors
    /// Returns `TransportError::Timeout` if the handshake does not complete
    /// within `timeout`, otherwise the classified connect error.
    pub async fn connect_tcp(&self, addr: SocketAddr, timeout: Duration) -> TransportResult<TcpStream> {
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(TransportError::from_connect(e, addr)),
            Err(_) => return Err(TransportError::Timeout(addr)),
        };

        if self.config.nodelay {
            stream.set_nodelay(true)?;
        }

        tracing::debug!("Opened TCP stream to {}", addr);
        Ok(stream)
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> TransportResult<BoxedTransport> {
        let stream = self.connect_tcp(addr, timeout).await?;
        Ok(Box::new(stream))
    }
}

/// Resolve a relay address.
///
/// Accepts `ip`, `ip:port`, `[v6]:port`, `hostname` or `hostname:port`.
/// When no port is given `default_port` is used.
///
/// # Errors
/// Returns `TransportError::InvalidAddress` for empty input or a bad port
/// and `TransportError::Unreachable` if the hostname does not resolve.
pub async fn resolve(address: &str, default_port: u16) -> TransportResult<SocketAddr> {
    let address = address.trim();
    if address.is_empty() {
        return Err(TransportError::InvalidAddress("empty address".to_string()));
    }

    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| TransportError::InvalidAddress(format!("bad port in '{address}'")))?;
            (host, port)
        }
        None => (address, default_port),
    };

    if host.is_empty() {
        return Err(TransportError::InvalidAddress(format!("missing host in '{address}'")));
    }

    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| TransportError::Unreachable(format!("{host}: {e}")))?;

    addrs
        .next()
        .ok_or_else(|| TransportError::Unreachable(format!("{host}: no addresses")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            socket.read_exact(&mut buf).await.unwrap();
            buf
        });

        let connector = TcpConnector::new();
        let mut transport = connector.connect(addr, Duration::from_secs(1)).await.unwrap();
        transport.write_all(b"hello").await.unwrap();

        assert_eq!(&accept.await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = TcpConnector::new().connect(addr, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(TransportError::Refused(a)) if a == addr));
    }

    #[tokio::test]
    async fn test_config_controls_nodelay() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _accept = tokio::spawn(async move { listener.accept().await });

        let stream = TcpConnector::with_config(TransportConfig { nodelay: false })
            .connect_tcp(addr, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!stream.nodelay().unwrap());

        let stream = TcpConnector::new()
            .connect_tcp(addr, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(stream.nodelay().unwrap());
    }

    #[tokio::test]
    async fn test_connect_unroutable_fails() {
        // TEST-NET-1 is never routed; depending on the host this is a timeout
        // or an immediate unreachable error.
        let addr: SocketAddr = "192.0.2.1:9".parse().unwrap();
        let result = TcpConnector::new().connect(addr, Duration::from_millis(100)).await;
        assert!(matches!(
            result,
            Err(TransportError::Timeout(_)) | Err(TransportError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_ip_without_port() {
        let addr = resolve("10.0.0.5", 1234).await.unwrap();
        assert_eq!(addr, "10.0.0.5:1234".parse().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_ip_with_port() {
        let addr = resolve("10.0.0.5:4000", 1234).await.unwrap();
        assert_eq!(addr.port(), 4000);

        let addr = resolve("[::1]:4000", 1234).await.unwrap();
        assert!(addr.is_ipv6());

        let addr = resolve("::1", 1234).await.unwrap();
        assert_eq!(addr.port(), 1234);
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        let addr = resolve("localhost", 1234).await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 1234);
    }

    #[tokio::test]
    async fn test_resolve_invalid() {
        assert!(matches!(
            resolve("", 1234).await,
            Err(TransportError::InvalidAddress(_))
        ));
        assert!(matches!(
            resolve("relay:notaport", 1234).await,
            Err(TransportError::InvalidAddress(_))
        ));
        assert!(matches!(
            resolve(":80", 1234).await,
            Err(TransportError::InvalidAddress(_))
        ));
    }
}
