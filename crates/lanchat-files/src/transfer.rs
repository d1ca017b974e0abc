//! Transfer state machine.

use std::fmt;

/// Transfer state
///
/// ```text
/// Idle -> Connecting -> Transferring -> Done
///             |              |
///             +---> Failed <-+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Directive received, nothing opened yet
    Idle,
    /// Opening the side-channel connection
    Connecting,
    /// Streaming file content
    Transferring,
    /// Transfer completed successfully
    Done,
    /// Transfer failed
    Failed,
}

impl TransferState {
    /// Returns true for `Done` and `Failed`
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Connecting)
                | (Self::Connecting, Self::Transferring)
                | (Self::Connecting, Self::Failed)
                | (Self::Transferring, Self::Done)
                | (Self::Transferring, Self::Failed)
        )
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Transferring => "transferring",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Sending file
    Send,
    /// Receiving file
    Receive,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => f.write_str("send"),
            Self::Receive => f.write_str("receive"),
        }
    }
}
