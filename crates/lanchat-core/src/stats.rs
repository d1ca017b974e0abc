//! Per-session counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Session statistics, shared between the session and its receive task
#[derive(Debug, Default)]
pub struct SessionStats {
    lines_sent: AtomicU64,
    bytes_sent: AtomicU64,
    lines_received: AtomicU64,
    malformed_directives: AtomicU64,
    transfers_started: AtomicU64,
}

/// Point-in-time copy of [`SessionStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStatsSnapshot {
    /// Chat lines written to the relay
    pub lines_sent: u64,
    /// Bytes written to the relay, terminators included
    pub bytes_sent: u64,
    /// Chat lines delivered to the sink
    pub lines_received: u64,
    /// `FILE_PORT:` lines dropped as malformed
    pub malformed_directives: u64,
    /// Negotiations spawned
    pub transfers_started: u64,
}

impl SessionStats {
    /// Record a written line
    pub fn record_send(&self, bytes: usize) {
        self.lines_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a delivered chat line
    pub fn record_recv(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped directive
    pub fn record_malformed(&self) {
        self.malformed_directives.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a spawned negotiation
    pub fn record_transfer(&self) {
        self.transfers_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values
    #[must_use]
    pub fn snapshot(&self) -> SessionStatsSnapshot {
        SessionStatsSnapshot {
            lines_sent: self.lines_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            lines_received: self.lines_received.load(Ordering::Relaxed),
            malformed_directives: self.malformed_directives.load(Ordering::Relaxed),
            transfers_started: self.transfers_started.load(Ordering::Relaxed),
        }
    }
}
