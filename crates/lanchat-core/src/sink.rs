//! Event sink: the core's only way of talking back to the presentation layer.
//!
//! Sinks are called from the receive task and from transfer tasks
//! concurrently, so implementations must be `Send + Sync` and append-only.

use crate::message::Message;
use crate::transfer::TransferStatus;
use tokio::sync::mpsc;

/// Receives inbound events from a session.
pub trait EventSink: Send + Sync {
    /// A chat line arrived; called once per line in receive order
    fn on_chat_line(&self, line: Message);

    /// The relay connection ended; called at most once per session
    fn on_connection_lost(&self);

    /// A file-transfer negotiation changed state
    fn on_transfer_status(&self, status: TransferStatus);
}

/// Events produced by a [`ChannelSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Chat line from another participant
    ChatLine(Message),
    /// The receive loop ended
    ConnectionLost,
    /// Transfer state transition
    Transfer(TransferStatus),
}

/// Sink forwarding events into an unbounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver adapters poll
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Event receiver dropped");
        }
    }
}

impl EventSink for ChannelSink {
    fn on_chat_line(&self, line: Message) {
        self.emit(SessionEvent::ChatLine(line));
    }

    fn on_connection_lost(&self) {
        self.emit(SessionEvent::ConnectionLost);
    }

    fn on_transfer_status(&self, status: TransferStatus) {
        self.emit(SessionEvent::Transfer(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_forwards_in_order() {
        let (sink, mut rx) = ChannelSink::new();

        sink.on_chat_line(Message::new("a").unwrap());
        sink.on_chat_line(Message::new("b").unwrap());
        sink.on_connection_lost();

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::ChatLine(Message::new("a").unwrap())
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::ChatLine(Message::new("b").unwrap())
        );
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::ConnectionLost);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.on_connection_lost();
    }
}
