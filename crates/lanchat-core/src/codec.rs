//! Line codec.
//!
//! Frames a byte stream into newline-terminated text records. Decoding
//! accepts `\n`, `\r\n` and a bare `\r` as terminators; encoding always emits
//! a single `\n` and flushes immediately so the relay sees each line without
//! buffering delay.

use crate::error::CodecError;
use crate::message::Message;
use crate::{DEFAULT_MAX_LINE_LENGTH, LINE_TERMINATOR};
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Encode one message into its wire form.
#[must_use]
pub fn encode(message: &Message) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 1);
    out.extend_from_slice(message.as_str().as_bytes());
    out.push(LINE_TERMINATOR);
    out
}

/// Decodes successive lines from a byte stream.
pub struct LineReader<R> {
    inner: BufReader<R>,
    max_line_length: usize,
    /// Previous line ended in `\r`; a following `\n` belongs to it.
    skip_lf: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Wrap a stream with the default line length limit
    pub fn new(inner: R) -> Self {
        Self::with_max_line_length(inner, DEFAULT_MAX_LINE_LENGTH)
    }

    /// Wrap a stream with a custom line length limit
    pub fn with_max_line_length(inner: R, max_line_length: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            max_line_length,
            skip_lf: false,
        }
    }

    /// Read the next complete line.
    ///
    /// Returns `Ok(None)` at end of stream. Bytes after the last terminator
    /// are never returned as a line.
    ///
    /// # Errors
    /// `CodecError::LineTooLong` if a line exceeds the limit; the oversized
    /// line is consumed so the next call starts at the following line.
    /// `CodecError::Io` if the stream fails.
    pub async fn next_line(&mut self) -> Result<Option<Message>, CodecError> {
        let mut line = Vec::new();
        let mut overflow = false;

        loop {
            let available = self.inner.fill_buf().await?;
            if available.is_empty() {
                if !line.is_empty() || overflow {
                    tracing::debug!("Discarding unterminated line at end of stream");
                }
                return Ok(None);
            }

            let mut start = 0;
            if self.skip_lf {
                self.skip_lf = false;
                if available[0] == b'\n' {
                    start = 1;
                }
            }

            let rest = &available[start..];
            let terminator = rest.iter().position(|&b| b == b'\n' || b == b'\r');
            let take = terminator.unwrap_or(rest.len());

            if !overflow {
                if line.len() + take > self.max_line_length {
                    overflow = true;
                    line.clear();
                } else {
                    line.extend_from_slice(&rest[..take]);
                }
            }

            match terminator {
                Some(pos) => {
                    self.skip_lf = rest[pos] == b'\r';
                    self.inner.consume(start + pos + 1);
                    break;
                }
                None => {
                    let used = available.len();
                    self.inner.consume(used);
                }
            }
        }

        if overflow {
            return Err(CodecError::LineTooLong {
                limit: self.max_line_length,
            });
        }

        let text = match String::from_utf8(line) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("Replacing invalid UTF-8 in inbound line");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(Some(Message::from_decoded(text)))
    }
}

/// Encodes lines onto a byte stream.
pub struct LineWriter<W> {
    inner: W,
    bytes_written: u64,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    /// Wrap a stream
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    /// Write one line plus terminator and flush.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    /// Propagates write and flush errors.
    pub async fn write_line(&mut self, message: &Message) -> io::Result<usize> {
        let record = encode(message);
        self.inner.write_all(&record).await?;
        self.inner.flush().await?;
        self.bytes_written += record.len() as u64;
        Ok(record.len())
    }

    /// Half-close the underlying stream
    ///
    /// # Errors
    /// Propagates the shutdown error.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }

    /// Total bytes written
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decode_all(bytes: &[u8]) -> Vec<String> {
        let mut reader = LineReader::new(bytes);
        let mut out = Vec::new();
        while let Some(line) = reader.next_line().await.unwrap() {
            out.push(line.into_string());
        }
        out
    }

    #[test]
    fn test_encode_appends_single_newline() {
        let msg = Message::new("hello").unwrap();
        assert_eq!(encode(&msg), b"hello\n");
    }

    #[tokio::test]
    async fn test_decode_lines() {
        assert_eq!(decode_all(b"one\ntwo\n").await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_decode_preserves_whitespace() {
        assert_eq!(decode_all(b"  padded \t\n").await, vec!["  padded \t"]);
    }

    #[tokio::test]
    async fn test_decode_all_terminator_styles() {
        assert_eq!(
            decode_all(b"crlf\r\nlf\ncr\rend\n").await,
            vec!["crlf", "lf", "cr", "end"]
        );
    }

    #[tokio::test]
    async fn test_decode_blank_lines() {
        assert_eq!(decode_all(b"\n\r\n\n").await, vec!["", "", ""]);
    }

    #[tokio::test]
    async fn test_decode_drops_partial_line_at_eof() {
        assert_eq!(decode_all(b"whole\npart").await, vec!["whole"]);
    }

    #[tokio::test]
    async fn test_decode_crlf_split_across_reads() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let mut reader = LineReader::new(rx);

        tx.write_all(b"first\r").await.unwrap();
        let first = reader.next_line().await.unwrap().unwrap();
        assert_eq!(first.as_str(), "first");

        tx.write_all(b"\nsecond\n").await.unwrap();
        drop(tx);
        let second = reader.next_line().await.unwrap().unwrap();
        assert_eq!(second.as_str(), "second");
        assert!(reader.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decode_line_too_long_recovers() {
        let mut input = vec![b'x'; 40];
        input.extend_from_slice(b"\nok\n");
        let mut reader = LineReader::with_max_line_length(&input[..], 16);

        assert!(matches!(
            reader.next_line().await,
            Err(CodecError::LineTooLong { limit: 16 })
        ));
        assert_eq!(reader.next_line().await.unwrap().unwrap().as_str(), "ok");
        assert!(reader.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decode_invalid_utf8_is_lossy() {
        let lines = decode_all(b"caf\xff\n").await;
        assert_eq!(lines, vec!["caf\u{FFFD}"]);
    }

    #[tokio::test]
    async fn test_writer_flushes_each_line() {
        let (tx, rx) = tokio::io::duplex(64);
        let mut writer = LineWriter::new(tx);
        let mut reader = LineReader::new(rx);

        let n = writer.write_line(&Message::new("hi").unwrap()).await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(reader.next_line().await.unwrap().unwrap().as_str(), "hi");
        assert_eq!(writer.bytes_written(), 3);
    }

    #[tokio::test]
    async fn test_writer_shutdown_ends_stream() {
        let (tx, rx) = tokio::io::duplex(64);
        let mut writer = LineWriter::new(tx);
        let mut reader = LineReader::new(rx);

        writer.write_line(&Message::new("bye").unwrap()).await.unwrap();
        writer.shutdown().await.unwrap();

        assert_eq!(reader.next_line().await.unwrap().unwrap().as_str(), "bye");
        assert!(reader.next_line().await.unwrap().is_none());
    }
}
