//! Error types for the LANCHAT core.
//!
//! Each unit of concurrency has its own error type and handles it at its own
//! boundary:
//!
//! - [`ConnectionError`]: fatal to a `Session::connect` attempt, never retried
//! - [`SendError`]: returned to the caller of `Session::send`
//! - [`ProtocolError`]: logged and dropped by the receive loop
//! - [`TransferError`]: fatal to one negotiation, reported through the sink
//! - [`CodecError`]: raised by the line codec

use lanchat_transport::TransportError;
use std::io;
use thiserror::Error;

/// Errors opening the primary connection
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Relay host could not be reached or resolved
    #[error("relay unreachable: {0}")]
    Unreachable(String),

    /// Relay refused the connection
    #[error("connection refused by {0}")]
    Refused(String),

    /// Connection attempt timed out
    #[error("connection to {0} timed out")]
    Timeout(String),

    /// Identity is empty or spans several lines
    #[error("invalid identity: {0}")]
    InvalidIdentity(&'static str),

    /// Registration line could not be written
    #[error("handshake failed: {0}")]
    Handshake(String),
}

impl From<TransportError> for ConnectionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Refused(addr) => Self::Refused(addr.to_string()),
            TransportError::Timeout(addr) => Self::Timeout(addr.to_string()),
            TransportError::Unreachable(reason) | TransportError::InvalidAddress(reason) => {
                Self::Unreachable(reason)
            }
            TransportError::Io(e) => Self::Unreachable(e.to_string()),
        }
    }
}

/// Errors sending a chat line
#[derive(Debug, Error)]
pub enum SendError {
    /// The session's transport is closed
    #[error("session is closed")]
    Closed,

    /// The line cannot be framed
    #[error("invalid message: {0}")]
    InvalidMessage(#[from] CodecError),
}

/// Inbound protocol violations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A `FILE_PORT:` line whose port is not a decimal in 1..=65535
    #[error("malformed directive: {0:?}")]
    MalformedDirective(String),
}

/// Errors during one file-transfer negotiation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Side-channel connect did not complete in time
    #[error("transfer connection timed out")]
    Timeout,

    /// Nothing accepted on the announced port
    #[error("transfer connection refused")]
    Refused,

    /// Relay host could not be reached
    #[error("transfer peer unreachable: {0}")]
    Unreachable(String),

    /// Read, write or file error mid-transfer
    #[error("transfer I/O failure: {0}")]
    Io(String),

    /// Peer closed the stream before the exchange finished
    #[error("peer closed the transfer prematurely")]
    PrematureClose,

    /// Queued file is missing or not a regular file
    #[error("invalid file: {0}")]
    InvalidFile(String),

    /// File offered after the session closed
    #[error("session is closed")]
    SessionClosed,
}

impl TransferError {
    /// Classify an I/O error raised while streaming
    #[must_use]
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Self::PrematureClose,
            _ => Self::Io(err.to_string()),
        }
    }

    /// Returns true if the side channel was never opened
    #[must_use]
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::Timeout | Self::Refused | Self::Unreachable(_))
    }
}

impl From<TransportError> for TransferError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Refused(_) => Self::Refused,
            TransportError::Timeout(_) => Self::Timeout,
            TransportError::Unreachable(reason) | TransportError::InvalidAddress(reason) => {
                Self::Unreachable(reason)
            }
            TransportError::Io(e) => Self::from_io(&e),
        }
    }
}

/// Line framing errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// Text contains `\n` or `\r`
    #[error("message contains an embedded line break")]
    EmbeddedLineBreak,

    /// Inbound line exceeded the configured limit
    #[error("line exceeds {limit} bytes")]
    LineTooLong {
        /// Configured maximum line length
        limit: usize,
    },

    /// Underlying stream failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn addr() -> SocketAddr {
        "10.0.0.5:1234".parse().unwrap()
    }

    #[test]
    fn test_connection_error_from_transport() {
        let err: ConnectionError = TransportError::Refused(addr()).into();
        assert!(matches!(err, ConnectionError::Refused(ref a) if a == "10.0.0.5:1234"));

        let err: ConnectionError = TransportError::Timeout(addr()).into();
        assert!(matches!(err, ConnectionError::Timeout(_)));

        let err: ConnectionError = TransportError::Unreachable("no route".into()).into();
        assert!(matches!(err, ConnectionError::Unreachable(_)));

        let err: ConnectionError = TransportError::InvalidAddress("".into()).into();
        assert!(matches!(err, ConnectionError::Unreachable(_)));
    }

    #[test]
    fn test_transfer_error_from_transport() {
        assert_eq!(
            TransferError::from(TransportError::Refused(addr())),
            TransferError::Refused
        );
        assert_eq!(
            TransferError::from(TransportError::Timeout(addr())),
            TransferError::Timeout
        );
        assert!(TransferError::Refused.is_connect_failure());
        assert!(!TransferError::PrematureClose.is_connect_failure());
    }

    #[test]
    fn test_transfer_error_from_io() {
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(TransferError::from_io(&reset), TransferError::PrematureClose);

        let pipe = io::Error::from(io::ErrorKind::BrokenPipe);
        assert_eq!(TransferError::from_io(&pipe), TransferError::PrematureClose);

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(TransferError::from_io(&denied), TransferError::Io(_)));
    }

    #[test]
    fn test_error_display() {
        let err = ProtocolError::MalformedDirective("FILE_PORT:abc".to_string());
        assert_eq!(err.to_string(), "malformed directive: \"FILE_PORT:abc\"");

        let err = SendError::Closed;
        assert_eq!(err.to_string(), "session is closed");

        let err = CodecError::LineTooLong { limit: 16 };
        assert_eq!(err.to_string(), "line exceeds 16 bytes");

        let err = TransferError::SessionClosed;
        assert_eq!(err.to_string(), "session is closed");
    }
}
