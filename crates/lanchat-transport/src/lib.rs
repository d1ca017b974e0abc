//! # LANCHAT Transport
//!
//! Network transport layer for the LANCHAT client.
//!
//! This crate provides:
//! - The [`Transport`](transport::Transport) abstraction over duplex byte streams
//! - The [`Connector`](transport::Connector) trait used to open primary and
//!   file-transfer streams
//! - A TCP implementation with connect timeouts and host resolution

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod tcp;
pub mod transport;

pub use tcp::{TcpConnector, resolve};
pub use transport::{BoxedTransport, Connector, Transport, TransportError, TransportResult};

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Disable Nagle's algorithm so short chat lines leave immediately
    pub nodelay: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { nodelay: true }
    }
}
