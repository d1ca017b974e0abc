//! Transport trait abstraction for duplex byte streams.
//!
//! The chat session and the file-transfer negotiator never name a concrete
//! socket type. They ask a [`Connector`] for a [`BoxedTransport`] and treat it
//! as an ordered, reliable byte stream that can be split into a read half and
//! a write half.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Transport layer errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// I/O error from underlying transport
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Remote end actively refused the connection
    #[error("Connection refused by {0}")]
    Refused(SocketAddr),

    /// Remote host could not be reached or resolved
    #[error("Host unreachable: {0}")]
    Unreachable(String),

    /// Connection attempt did not complete in time
    #[error("Connection to {0} timed out")]
    Timeout(SocketAddr),

    /// Address could not be parsed
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl TransportError {
    /// Classify an I/O error returned while connecting to `addr`.
    #[must_use]
    pub fn from_connect(err: io::Error, addr: SocketAddr) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => Self::Refused(addr),
            io::ErrorKind::TimedOut => Self::Timeout(addr),
            _ => Self::Unreachable(format!("{addr}: {err}")),
        }
    }

    /// Returns true if the peer refused the connection
    #[must_use]
    pub fn is_refused(&self) -> bool {
        matches!(self, Self::Refused(_))
    }

    /// Returns true if the connection attempt timed out
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// An open duplex byte stream.
///
/// Any `AsyncRead + AsyncWrite` type that can move between tasks is a
/// transport. Shutting down the write side performs a half-close: the peer
/// observes end-of-stream while this side can keep reading.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Type-erased transport handed out by connectors
pub type BoxedTransport = Box<dyn Transport>;

/// Opens transports to remote addresses.
///
/// # Examples
///
/// ```no_run
/// use lanchat_transport::{Connector, TcpConnector};
/// use std::time::Duration;
/// use tokio::io::AsyncWriteExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let connector = TcpConnector::new();
/// let mut transport = connector
///     .connect("127.0.0.1:1234".parse()?, Duration::from_secs(5))
///     .await?;
/// transport.write_all(b"alice\n").await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a transport to `addr`, giving up after `timeout`.
    ///
    /// # Errors
    /// Returns `TransportError::Refused`, `Timeout` or `Unreachable` when the
    /// stream cannot be opened.
    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> TransportResult<BoxedTransport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:1234".parse().unwrap()
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::Refused(addr());
        assert_eq!(err.to_string(), "Connection refused by 127.0.0.1:1234");

        let err = TransportError::Timeout(addr());
        assert!(err.to_string().contains("timed out"));

        let err = TransportError::InvalidAddress("nope".to_string());
        assert!(err.to_string().contains("Invalid address"));
    }

    #[test]
    fn test_transport_error_from_io() {
        let io_err = io::Error::other("test");
        let transport_err = TransportError::from(io_err);

        assert!(matches!(transport_err, TransportError::Io(_)));
    }

    #[test]
    fn test_from_connect_classification() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert!(TransportError::from_connect(refused, addr()).is_refused());

        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert!(TransportError::from_connect(timed_out, addr()).is_timeout());

        let other = io::Error::from(io::ErrorKind::AddrNotAvailable);
        let err = TransportError::from_connect(other, addr());
        assert!(matches!(err, TransportError::Unreachable(ref s) if s.starts_with("127.0.0.1:1234")));
    }

    #[tokio::test]
    async fn test_duplex_stream_is_transport() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (client, mut server) = tokio::io::duplex(64);
        let mut boxed: BoxedTransport = Box::new(client);

        boxed.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }
}
