//! # LANCHAT Files
//!
//! File transfer engine for the LANCHAT client.
//!
//! This crate provides:
//! - Fixed-size chunked reading of outgoing files
//! - The transfer state machine shared by negotiator and adapters
//! - Partial-file handling so incomplete downloads are never committed
//!
//! Transfers use framing version 1: the payload is the raw file content,
//! terminated by the sender half-closing its side of the stream. No name or
//! size travels in-band.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunker;
pub mod partial;
pub mod transfer;

pub use chunker::{ChunkReader, FileChunker};
pub use partial::PartialFile;
pub use transfer::{TransferDirection, TransferState};

/// Default chunk size (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Payload framing version spoken on file-transfer connections
pub const FRAMING_VERSION: u8 = 1;

/// Suffix for files still being received
pub const PARTIAL_SUFFIX: &str = "part";
