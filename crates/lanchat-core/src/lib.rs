//! # LANCHAT Core
//!
//! Session and protocol engine for the LANCHAT client.
//!
//! This crate provides:
//! - Line framing over a duplex byte stream
//! - The chat session: handshake, background receive loop, send
//! - Classification of inbound lines into chat lines and `FILE_PORT:` directives
//! - Side-channel file transfer negotiation
//! - The event sink interface presentation adapters implement
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Presentation adapter                         │
//! │        (implements EventSink, calls Session::send)              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Session ── receive task ── Dispatcher ──┬── sink.on_chat_line   │
//! │     │                                    └── transfer task      │
//! │  LineWriter (owned write half)               (own transport)    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                 Transport (lanchat-transport)                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use lanchat_core::{ChannelSink, Session, SessionEvent};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (sink, mut events) = ChannelSink::new();
//! let mut session = Session::connect("10.0.0.5", "alice", Arc::new(sink)).await?;
//!
//! session.send("hello").await?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::ChatLine(line) => println!("{line}"),
//!         SessionEvent::ConnectionLost => break,
//!         SessionEvent::Transfer(status) => println!("transfer {}", status.state),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod session;
pub mod sink;
pub mod stats;
pub mod transfer;

pub use codec::{LineReader, LineWriter};
pub use config::{SessionConfig, TransferConfig};
pub use dispatcher::{Dispatched, Dispatcher, Inbound, classify};
pub use error::{CodecError, ConnectionError, ProtocolError, SendError, TransferError};
pub use message::{Identity, Message};
pub use session::{Session, SessionState};
pub use sink::{ChannelSink, EventSink, SessionEvent};
pub use stats::{SessionStats, SessionStatsSnapshot};
pub use transfer::{
    FileTransferNegotiator, FileTransferRequest, TransferLauncher, TransferOutbox, TransferPlan,
    TransferStatus,
};

/// Default relay port when the address carries none
pub const DEFAULT_RELAY_PORT: u16 = 1234;

/// Reserved prefix of the file-transfer port directive
pub const FILE_PORT_PREFIX: &str = "FILE_PORT:";

/// Terminator appended to every outbound line
pub const LINE_TERMINATOR: u8 = b'\n';

/// Default upper bound on inbound line length (64 KiB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Notice shown to the user when the relay connection ends
pub const CONNECTION_LOST_NOTICE: &str = "connection lost";
