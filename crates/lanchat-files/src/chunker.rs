//! File chunking.

use crate::DEFAULT_CHUNK_SIZE;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Chunk a file into fixed-size pieces
#[derive(Debug, Clone, Copy)]
pub struct FileChunker {
    chunk_size: usize,
}

impl FileChunker {
    /// Create a new chunker with default chunk size
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a new chunker with custom chunk size (minimum 1 byte)
    pub fn with_chunk_size(size: usize) -> Self {
        Self {
            chunk_size: size.max(1),
        }
    }

    /// Get chunk size
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Calculate number of chunks for a file
    pub fn chunk_count(&self, file_size: u64) -> u64 {
        file_size.div_ceil(self.chunk_size as u64)
    }

    /// Wrap a byte source in a chunk reader using this chunk size
    pub fn reader<R: AsyncRead + Unpin>(&self, source: R) -> ChunkReader<R> {
        ChunkReader::new(source, self.chunk_size)
    }
}

impl Default for FileChunker {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a byte source in fixed-size chunks.
///
/// Every chunk except the last is exactly `chunk_size` bytes long.
pub struct ChunkReader<R> {
    source: R,
    buf: Vec<u8>,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// Create a reader yielding chunks of `chunk_size` bytes
    pub fn new(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            buf: vec![0u8; chunk_size.max(1)],
            bytes_read: 0,
        }
    }

    /// Read the next chunk, or `None` once the source is exhausted.
    ///
    /// # Errors
    /// Propagates read errors from the underlying source.
    pub async fn next_chunk(&mut self) -> io::Result<Option<&[u8]>> {
        let mut filled = 0;
        while filled < self.buf.len() {
            let n = self.source.read(&mut self.buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }

        self.bytes_read += filled as u64;
        Ok(Some(&self.buf[..filled]))
    }

    /// Total bytes handed out so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}
