//! File-transfer negotiation.
//!
//! A `FILE_PORT:<n>` directive tells this client that the relay is listening
//! on port `n` for a one-off side-channel connection. Each directive gets its
//! own [`FileTransferNegotiator`] running in its own task with its own
//! transport; the chat session is never blocked by a transfer.
//!
//! Payload framing (version 1): raw file bytes, ended by the sender
//! half-closing its side. The receiver drains to end of stream, then closes
//! its side, which the sender waits for before reporting `Done`.

use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::message::Identity;
use crate::sink::EventSink;
use lanchat_files::{FRAMING_VERSION, FileChunker, PartialFile, TransferDirection, TransferState};
use lanchat_transport::{BoxedTransport, Connector};
use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

static RECEIVE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A parsed port directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransferRequest {
    /// Side-channel port announced by the relay
    pub port: u16,
    /// Local identity of the session that received the directive
    pub identity: Identity,
}

/// What a negotiation does once connected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPlan {
    /// Stream this file to the peer
    Send(PathBuf),
    /// Store incoming bytes under this directory
    Receive(PathBuf),
}

impl TransferPlan {
    /// Direction of the plan
    #[must_use]
    pub fn direction(&self) -> TransferDirection {
        match self {
            Self::Send(_) => TransferDirection::Send,
            Self::Receive(_) => TransferDirection::Receive,
        }
    }
}

/// Progress report for one negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferStatus {
    /// Side-channel port
    pub port: u16,
    /// Send or receive
    pub direction: TransferDirection,
    /// State just entered
    pub state: TransferState,
    /// Payload bytes moved so far
    pub bytes: u64,
    /// Time since the directive was handled
    pub elapsed: Duration,
    /// Source file when sending, committed file when a receive is done
    pub path: Option<PathBuf>,
    /// Failure reason when `state` is `Failed`
    pub error: Option<TransferError>,
}

/// Files waiting for the relay to announce a port
#[derive(Debug, Clone, Default)]
pub struct TransferOutbox {
    queue: Arc<Mutex<VecDeque<PathBuf>>>,
}

impl TransferOutbox {
    /// Queue a file for the next directive
    pub async fn push(&self, path: PathBuf) {
        self.queue.lock().await.push_back(path);
    }

    /// Take the oldest queued file
    pub async fn pop(&self) -> Option<PathBuf> {
        self.queue.lock().await.pop_front()
    }

    /// Number of queued files
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Returns true if nothing is queued
    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }
}

/// Drives one side-channel exchange from directive to `Done` or `Failed`.
pub struct FileTransferNegotiator {
    request: FileTransferRequest,
    plan: TransferPlan,
    target: SocketAddr,
    connector: Arc<dyn Connector>,
    config: TransferConfig,
    sink: Arc<dyn EventSink>,
    state: TransferState,
    bytes: u64,
    started: Instant,
}

impl FileTransferNegotiator {
    /// Create a negotiator targeting `relay_ip` on the requested port
    pub fn new(
        request: FileTransferRequest,
        plan: TransferPlan,
        relay_ip: IpAddr,
        connector: Arc<dyn Connector>,
        config: TransferConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let target = SocketAddr::new(relay_ip, request.port);
        Self {
            request,
            plan,
            target,
            connector,
            config,
            sink,
            state: TransferState::Idle,
            bytes: 0,
            started: Instant::now(),
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Side-channel address
    #[must_use]
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Run the negotiation to completion.
    ///
    /// Every state change is reported to the sink. Returns the path of the
    /// sent or committed file.
    ///
    /// # Errors
    /// The error that moved the negotiation to `Failed`.
    pub async fn run(mut self) -> Result<PathBuf, TransferError> {
        self.report(None);

        self.transition(TransferState::Connecting);
        debug!(
            "{} connecting to transfer port {} ({}, framing v{})",
            self.request.identity,
            self.target,
            self.plan.direction(),
            FRAMING_VERSION
        );
        let transport = match self
            .connector
            .connect(self.target, self.config.connect_timeout)
            .await
        {
            Ok(transport) => transport,
            Err(e) => return Err(self.fail(e.into())),
        };

        self.transition(TransferState::Transferring);
        let result = match self.plan.clone() {
            TransferPlan::Send(path) => self.send_file(&path, transport).await,
            TransferPlan::Receive(dir) => self.receive_file(&dir, transport).await,
        };

        match result {
            Ok(path) => {
                info!(
                    "Transfer on port {} done: {} bytes {} in {:?}",
                    self.request.port,
                    self.bytes,
                    self.plan.direction(),
                    self.started.elapsed()
                );
                self.state = TransferState::Done;
                self.report(Some(path.clone()));
                Ok(path)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Run the negotiation on its own task
    pub fn spawn(self) -> JoinHandle<Result<PathBuf, TransferError>> {
        tokio::spawn(self.run())
    }

    async fn send_file(
        &mut self,
        path: &Path,
        mut transport: BoxedTransport,
    ) -> Result<PathBuf, TransferError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| TransferError::InvalidFile(format!("{}: {e}", path.display())))?;

        let chunker = FileChunker::with_chunk_size(self.config.chunk_size);
        if let Ok(meta) = file.metadata().await {
            debug!(
                "Sending {} ({} bytes, {} chunks)",
                path.display(),
                meta.len(),
                chunker.chunk_count(meta.len())
            );
        }

        let mut chunks = chunker.reader(file);
        while let Some(chunk) = chunks
            .next_chunk()
            .await
            .map_err(|e| TransferError::Io(e.to_string()))?
        {
            transport
                .write_all(chunk)
                .await
                .map_err(|e| TransferError::from_io(&e))?;
            self.bytes += chunk.len() as u64;
        }
        transport
            .flush()
            .await
            .map_err(|e| TransferError::from_io(&e))?;
        transport
            .shutdown()
            .await
            .map_err(|e| TransferError::from_io(&e))?;

        // Completion is the peer closing its side after draining ours.
        let mut scratch = [0u8; 512];
        loop {
            let n = transport
                .read(&mut scratch)
                .await
                .map_err(|e| TransferError::from_io(&e))?;
            if n == 0 {
                break;
            }
            debug!("Ignoring {n} trailing bytes from transfer peer");
        }

        Ok(path.to_path_buf())
    }

    async fn receive_file(
        &mut self,
        dir: &Path,
        mut transport: BoxedTransport,
    ) -> Result<PathBuf, TransferError> {
        let mut partial = PartialFile::create(dir, &self.incoming_name())
            .await
            .map_err(|e| TransferError::Io(e.to_string()))?;

        let mut buf = vec![0u8; self.config.chunk_size.max(1)];
        loop {
            let n = transport
                .read(&mut buf)
                .await
                .map_err(|e| TransferError::from_io(&e))?;
            if n == 0 {
                break;
            }
            partial
                .write_chunk(&buf[..n])
                .await
                .map_err(|e| TransferError::Io(e.to_string()))?;
            self.bytes += n as u64;
        }

        if let Err(e) = transport.shutdown().await {
            debug!("Transfer peer already gone at close: {e}");
        }

        partial
            .commit()
            .await
            .map_err(|e| TransferError::Io(e.to_string()))
    }

    fn incoming_name(&self) -> String {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let seq = RECEIVE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        format!("lanchat-{}-{secs}-{seq}", self.request.port)
    }

    fn transition(&mut self, next: TransferState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transfer transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
        self.report(None);
    }

    fn fail(&mut self, err: TransferError) -> TransferError {
        if err.is_connect_failure() {
            warn!(
                "Could not open transfer port {} on {}: {err}",
                self.request.port,
                self.target.ip()
            );
        } else {
            warn!(
                "Transfer on port {} failed after {} bytes: {err}",
                self.request.port, self.bytes
            );
        }
        self.state = TransferState::Failed;
        self.sink.on_transfer_status(self.status(None, Some(err.clone())));
        err
    }

    fn report(&self, path: Option<PathBuf>) {
        self.sink.on_transfer_status(self.status(path, None));
    }

    fn status(&self, path: Option<PathBuf>, error: Option<TransferError>) -> TransferStatus {
        let path = path.or_else(|| match &self.plan {
            TransferPlan::Send(p) => Some(p.clone()),
            TransferPlan::Receive(_) => None,
        });
        TransferStatus {
            port: self.request.port,
            direction: self.plan.direction(),
            state: self.state,
            bytes: self.bytes,
            elapsed: self.started.elapsed(),
            path,
            error,
        }
    }
}

/// Turns port directives into running negotiations.
///
/// Holds everything a negotiation needs from its session. A queued file in
/// the outbox makes the next negotiation a send; otherwise it receives.
#[derive(Clone)]
pub struct TransferLauncher {
    relay_ip: IpAddr,
    identity: Identity,
    connector: Arc<dyn Connector>,
    config: TransferConfig,
    sink: Arc<dyn EventSink>,
    outbox: TransferOutbox,
}

impl TransferLauncher {
    /// Create a launcher for a session connected to `relay_ip`
    pub fn new(
        relay_ip: IpAddr,
        identity: Identity,
        connector: Arc<dyn Connector>,
        config: TransferConfig,
        sink: Arc<dyn EventSink>,
        outbox: TransferOutbox,
    ) -> Self {
        Self {
            relay_ip,
            identity,
            connector,
            config,
            sink,
            outbox,
        }
    }

    /// Pick a plan for `port` and spawn its negotiator
    pub async fn launch(&self, port: u16) -> JoinHandle<Result<PathBuf, TransferError>> {
        let plan = match self.outbox.pop().await {
            Some(path) => TransferPlan::Send(path),
            None => TransferPlan::Receive(self.config.download_dir.clone()),
        };
        info!("Relay opened transfer port {port}, {}", plan.direction());

        FileTransferNegotiator::new(
            FileTransferRequest {
                port,
                identity: self.identity.clone(),
            },
            plan,
            self.relay_ip,
            Arc::clone(&self.connector),
            self.config.clone(),
            Arc::clone(&self.sink),
        )
        .spawn()
    }

    /// Queue shared with the owning session
    #[must_use]
    pub fn outbox(&self) -> &TransferOutbox {
        &self.outbox
    }
}
