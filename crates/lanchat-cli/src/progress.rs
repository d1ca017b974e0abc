//! Transfer progress display.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use lanchat_core::TransferStatus;
use lanchat_files::{TransferDirection, TransferState};
use std::collections::HashMap;
use std::time::Duration;

// Reports arrive only on state changes, so byte counts appear in the final message
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {msg}";

/// One spinner per active negotiation, keyed by side-channel port.
pub struct TransferProgress {
    multi: MultiProgress,
    bars: HashMap<u16, ProgressBar>,
}

impl TransferProgress {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: HashMap::new(),
        }
    }

    /// Apply one status report
    pub fn update(&mut self, status: &TransferStatus) {
        match status.state {
            TransferState::Idle => {}
            TransferState::Connecting => {
                let bar = self.bar_for(status);
                bar.set_message(format!("{} connecting on port {}", label(status), status.port));
            }
            TransferState::Transferring => {
                let bar = self.bar_for(status);
                bar.set_message(label(status));
            }
            TransferState::Done => {
                let bar = self.bar_for(status);
                bar.finish_with_message(format!(
                    "{} done: {} in {} ({})",
                    label(status),
                    format_bytes(status.bytes),
                    format_duration(status.elapsed),
                    format_speed(speed(status.bytes, status.elapsed)),
                ));
                self.bars.remove(&status.port);
            }
            TransferState::Failed => {
                let bar = self.bar_for(status);
                let reason = status
                    .error
                    .as_ref()
                    .map_or_else(|| "unknown error".to_string(), ToString::to_string);
                bar.abandon_with_message(format!("{} failed: {reason}", label(status)));
                self.bars.remove(&status.port);
            }
        }
    }

    /// Print a line above the spinners
    pub fn println(&self, line: &str) {
        self.multi.suspend(|| println!("{line}"));
    }

    /// Number of transfers still running
    #[must_use]
    pub fn active(&self) -> usize {
        self.bars.len()
    }

    fn bar_for(&mut self, status: &TransferStatus) -> &ProgressBar {
        let multi = &self.multi;
        self.bars.entry(status.port).or_insert_with(|| {
            let bar = multi.add(ProgressBar::new_spinner());
            bar.set_style(
                ProgressStyle::with_template(SPINNER_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        })
    }
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn label(status: &TransferStatus) -> String {
    let verb = match status.direction {
        TransferDirection::Send => "Sending",
        TransferDirection::Receive => "Receiving",
    };
    match status.path.as_ref().and_then(|p| p.file_name()) {
        Some(name) => format!("{verb} {}", name.to_string_lossy()),
        None => verb.to_string(),
    }
}

fn speed(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { bytes as f64 / secs } else { 0.0 }
}

/// Format bytes in human-readable format
///
/// # Example
///
/// ```ignore
/// assert_eq!(format_bytes(1024), "1.00 KB");
/// assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{size:.2} {}", UNITS[unit_idx])
}

/// Format speed in human-readable format (bytes/sec)
#[must_use]
pub fn format_speed(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec as u64))
}

/// Format duration in human-readable format
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanchat_core::TransferError;
    use std::path::PathBuf;

    fn status(state: TransferState, path: Option<&str>) -> TransferStatus {
        TransferStatus {
            port: 5000,
            direction: TransferDirection::Receive,
            state,
            bytes: 2048,
            elapsed: Duration::from_secs(2),
            path: path.map(PathBuf::from),
            error: None,
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(1024_u64.pow(4)), "1.00 TB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(1024.0), "1.00 KB/s");
        assert_eq!(format_speed(speed(2048, Duration::from_secs(2))), "1.00 KB/s");
        assert_eq!(speed(100, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
    }

    #[test]
    fn test_label() {
        assert_eq!(label(&status(TransferState::Idle, None)), "Receiving");
        assert_eq!(
            label(&status(TransferState::Done, Some("/tmp/in/lanchat-5000-1-0"))),
            "Receiving lanchat-5000-1-0"
        );
    }

    #[test]
    fn test_bars_removed_at_terminal_state() {
        let mut progress = TransferProgress::new();

        progress.update(&status(TransferState::Idle, None));
        assert_eq!(progress.active(), 0);

        progress.update(&status(TransferState::Connecting, None));
        progress.update(&status(TransferState::Transferring, None));
        assert_eq!(progress.active(), 1);

        let mut failed = status(TransferState::Failed, None);
        failed.error = Some(TransferError::PrematureClose);
        progress.update(&failed);
        assert_eq!(progress.active(), 0);
    }

    #[test]
    fn test_byte_count_only_in_final_message() {
        assert!(!SPINNER_TEMPLATE.contains("bytes"));

        let mut progress = TransferProgress::new();
        progress.update(&status(TransferState::Connecting, None));
        progress.update(&status(TransferState::Transferring, None));
        let bar = progress.bars[&5000].clone();
        assert_eq!(bar.message(), "Receiving");

        progress.update(&status(TransferState::Done, Some("/tmp/in/f")));
        assert!(bar.is_finished());
        assert_eq!(bar.message(), "Receiving f done: 2.00 KB in 2s (1.00 KB/s)");
    }
}
