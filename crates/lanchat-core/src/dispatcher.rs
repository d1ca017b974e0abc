//! Inbound line classification and routing.

use crate::FILE_PORT_PREFIX;
use crate::error::{ProtocolError, TransferError};
use crate::message::Message;
use crate::sink::EventSink;
use crate::stats::SessionStats;
use crate::transfer::TransferLauncher;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Classified inbound line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// Ordinary chat text
    Chat(&'a Message),
    /// Well-formed port directive
    FilePort(u16),
}

/// Classify one inbound line.
///
/// A line is a directive iff it starts with `FILE_PORT:`. The remainder must
/// be ASCII digits only, denoting a port in `1..=65535`.
///
/// # Errors
/// `ProtocolError::MalformedDirective` for a prefixed line with any other
/// remainder.
pub fn classify(line: &Message) -> Result<Inbound<'_>, ProtocolError> {
    let Some(rest) = line.as_str().strip_prefix(FILE_PORT_PREFIX) else {
        return Ok(Inbound::Chat(line));
    };

    parse_port(rest)
        .map(Inbound::FilePort)
        .ok_or_else(|| ProtocolError::MalformedDirective(line.as_str().to_string()))
}

fn parse_port(digits: &str) -> Option<u16> {
    // `u16::from_str` tolerates a leading `+`
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u16>().ok().filter(|&port| port != 0)
}

/// Outcome of dispatching one line
#[derive(Debug)]
pub enum Dispatched {
    /// Delivered to the sink
    Chat,
    /// Negotiation spawned
    Transfer(JoinHandle<Result<PathBuf, TransferError>>),
    /// Logged and discarded
    Dropped(ProtocolError),
}

/// Routes inbound lines: chat to the sink, directives to a new negotiation.
#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn EventSink>,
    launcher: TransferLauncher,
    stats: Arc<SessionStats>,
}

impl Dispatcher {
    /// Create a dispatcher
    pub fn new(
        sink: Arc<dyn EventSink>,
        launcher: TransferLauncher,
        stats: Arc<SessionStats>,
    ) -> Self {
        Self {
            sink,
            launcher,
            stats,
        }
    }

    /// Route one line.
    ///
    /// Never blocks on a transfer; the negotiation runs on its own task.
    pub async fn dispatch(&self, line: Message) -> Dispatched {
        match classify(&line) {
            Ok(Inbound::Chat(_)) => {
                self.stats.record_recv();
                self.sink.on_chat_line(line);
                Dispatched::Chat
            }
            Ok(Inbound::FilePort(port)) => {
                debug!("File transfer directive for port {port}");
                self.stats.record_transfer();
                Dispatched::Transfer(self.launcher.launch(port).await)
            }
            Err(e) => {
                warn!("Dropping inbound line: {e}");
                self.stats.record_malformed();
                Dispatched::Dropped(e)
            }
        }
    }
}
