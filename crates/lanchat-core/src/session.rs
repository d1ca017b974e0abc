//! Chat session.
//!
//! A [`Session`] owns one connection to the relay. Connecting writes the
//! identity line and spawns the receive task, which owns the read half and
//! feeds every inbound line through the [`Dispatcher`]. The write half stays
//! with the session, so [`Session::send`] needs `&mut self` and concurrent
//! sends can never interleave bytes on the wire.
//!
//! The receive task holds a guard that reports `on_connection_lost` when the
//! loop ends for any reason other than a local [`Session::close`]. The state
//! cell's compare-and-swap makes that report happen at most once.

use crate::codec::{LineReader, LineWriter};
use crate::config::SessionConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{CodecError, ConnectionError, SendError, TransferError};
use crate::message::{Identity, Message};
use crate::sink::EventSink;
use crate::stats::{SessionStats, SessionStatsSnapshot};
use crate::transfer::{TransferLauncher, TransferOutbox};
use lanchat_transport::{BoxedTransport, Connector, TcpConnector, resolve};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Session lifecycle
///
/// ```text
/// Connecting -> Open -> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Opening the transport and registering
    Connecting = 0,
    /// Registered; lines flow both ways
    Open = 1,
    /// Closed locally or by the relay; terminal
    Closed = 2,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn open(&self) {
        // Never resurrects a closed session
        let _ = self.0.compare_exchange(
            SessionState::Connecting as u8,
            SessionState::Open as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Move to `Closed`. Returns true only for the caller that made the move.
    fn close(&self) -> bool {
        self.0.swap(SessionState::Closed as u8, Ordering::AcqRel) != SessionState::Closed as u8
    }
}

/// Reports connection loss when the receive task ends.
struct ConnectionGuard {
    state: Arc<StateCell>,
    sink: Arc<dyn EventSink>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.state.close() {
            info!("Connection to relay lost");
            self.sink.on_connection_lost();
        }
    }
}

type Reader = LineReader<ReadHalf<BoxedTransport>>;
type Writer = LineWriter<WriteHalf<BoxedTransport>>;

async fn receive_loop(mut reader: Reader, dispatcher: Dispatcher, guard: ConnectionGuard) {
    let _guard = guard;
    loop {
        match reader.next_line().await {
            Ok(Some(line)) => {
                dispatcher.dispatch(line).await;
            }
            Ok(None) => {
                debug!("Relay closed the stream");
                break;
            }
            Err(CodecError::LineTooLong { limit }) => {
                warn!("Dropping inbound line longer than {limit} bytes");
            }
            Err(e) => {
                warn!("Receive failed: {e}");
                break;
            }
        }
    }
}

/// A connection to the relay.
pub struct Session {
    identity: Identity,
    relay: SocketAddr,
    state: Arc<StateCell>,
    writer: Option<Writer>,
    receive_task: Option<JoinHandle<()>>,
    outbox: TransferOutbox,
    stats: Arc<SessionStats>,
}

impl Session {
    /// Connect over TCP with default configuration.
    ///
    /// `address` is a host name or IP, optionally with `:port`; the default
    /// port is 1234.
    ///
    /// # Errors
    /// See [`Session::connect_with`].
    pub async fn connect(
        address: &str,
        identity: &str,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, ConnectionError> {
        Self::connect_with(
            address,
            identity,
            sink,
            SessionConfig::default(),
            Arc::new(TcpConnector::new()),
        )
        .await
    }

    /// Connect through `connector`, register `identity`, start receiving.
    ///
    /// Connection failures are returned, never retried.
    ///
    /// # Errors
    /// - `InvalidIdentity` if `identity` is empty or contains a line break
    /// - `Unreachable`, `Refused` or `Timeout` if the relay cannot be reached
    /// - `Handshake` if the identity line cannot be written
    pub async fn connect_with(
        address: &str,
        identity: &str,
        sink: Arc<dyn EventSink>,
        config: SessionConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ConnectionError> {
        let identity = Identity::new(identity)?;
        let state = Arc::new(StateCell::new(SessionState::Connecting));

        let relay = resolve(address, config.relay_port).await?;
        info!("Connecting to relay {relay} as {identity}");

        let transport = connector.connect(relay, config.connect_timeout).await?;
        let (read_half, write_half) = tokio::io::split(transport);

        let mut writer = LineWriter::new(write_half);
        writer
            .write_line(&identity.to_message())
            .await
            .map_err(|e| ConnectionError::Handshake(e.to_string()))?;

        let stats = Arc::new(SessionStats::default());
        let outbox = TransferOutbox::default();
        let launcher = TransferLauncher::new(
            relay.ip(),
            identity.clone(),
            connector,
            config.transfer.clone(),
            Arc::clone(&sink),
            outbox.clone(),
        );
        let dispatcher = Dispatcher::new(Arc::clone(&sink), launcher, Arc::clone(&stats));
        let reader = LineReader::with_max_line_length(read_half, config.max_line_length);
        let guard = ConnectionGuard {
            state: Arc::clone(&state),
            sink,
        };

        state.open();
        let receive_task = tokio::spawn(receive_loop(reader, dispatcher, guard));
        info!("Registered with relay {relay}");

        Ok(Self {
            identity,
            relay,
            state,
            writer: Some(writer),
            receive_task: Some(receive_task),
            outbox,
            stats,
        })
    }

    /// Send one chat line.
    ///
    /// Empty input is a no-op. The line is written whole with a single
    /// terminator and flushed.
    ///
    /// # Errors
    /// - `InvalidMessage` if `text` contains `\n` or `\r`
    /// - `Closed` if the session is closed or the write fails
    pub async fn send(&mut self, text: &str) -> Result<(), SendError> {
        if text.is_empty() {
            return Ok(());
        }
        let message = Message::new(text)?;
        self.send_message(&message).await
    }

    /// Send an already validated line.
    ///
    /// # Errors
    /// `SendError::Closed` if the session is closed or the write fails.
    pub async fn send_message(&mut self, message: &Message) -> Result<(), SendError> {
        if message.is_empty() {
            return Ok(());
        }
        if self.state.load() != SessionState::Open {
            self.writer = None;
            return Err(SendError::Closed);
        }
        let writer = self.writer.as_mut().ok_or(SendError::Closed)?;

        match writer.write_line(message).await {
            Ok(n) => {
                self.stats.record_send(n);
                debug!("Sent {n} bytes");
                Ok(())
            }
            Err(e) => {
                warn!("Send failed: {e}");
                Err(SendError::Closed)
            }
        }
    }

    /// Queue a file for the next `FILE_PORT:` directive.
    ///
    /// # Errors
    /// - `SessionClosed` once the session is closed, since no directive can
    ///   arrive any more
    /// - `InvalidFile` if `path` is not a readable regular file
    pub async fn queue_file(&self, path: impl AsRef<Path>) -> Result<(), TransferError> {
        if self.state() != SessionState::Open {
            return Err(TransferError::SessionClosed);
        }
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| TransferError::InvalidFile(format!("{}: {e}", path.display())))?;
        if !metadata.is_file() {
            return Err(TransferError::InvalidFile(format!(
                "{}: not a regular file",
                path.display()
            )));
        }

        self.outbox.push(path.to_path_buf()).await;
        info!(
            "Queued {} ({} bytes) for transfer, {} waiting",
            path.display(),
            metadata.len(),
            self.outbox.len().await
        );
        Ok(())
    }

    /// Close the session.
    ///
    /// Idempotent. Stops the receive task and releases the transport; the
    /// sink is not told about a close it asked for.
    pub async fn close(&mut self) {
        let was_open = self.state.close();

        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("Shutdown of relay stream failed: {e}");
            }
        }
        if let Some(task) = self.receive_task.take() {
            task.abort();
            let _ = task.await;
        }

        if was_open {
            info!("Session with {} closed", self.relay);
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.load()
    }

    /// Returns true while lines can be sent
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Registered identity
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Resolved relay address
    #[must_use]
    pub fn relay_addr(&self) -> SocketAddr {
        self.relay
    }

    /// Counters since connect
    #[must_use]
    pub fn stats(&self) -> SessionStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.state.close();
        if let Some(task) = self.receive_task.take() {
            task.abort();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("relay", &self.relay)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
