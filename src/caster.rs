//! Broadcast pump implementation
//!
//! The [`ReadCaster`] owns the source and the registry of reader outlets.
//! The pump itself is a single background task, spawned at most once by the
//! first read on any [`CastReader`]. It reads the source chunk by chunk and
//! fans each chunk out to every live reader's bounded inbox, with a
//! per-reader delivery deadline.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use crate::config::CasterConfig;
use crate::error::{CastError, Result};
use crate::reader::CastReader;

/// The source is type-erased so that readers need no knowledge of it.
type BoxedSource = Box<dyn AsyncRead + Unpin + Send>;

/// Per-reader flag, set only by the pump on eviction, read by the reader
/// to turn a stall into a terminal error instead of a silent EOF.
pub(crate) struct ReaderSlot {
    timed_out: AtomicBool,
}

impl ReaderSlot {
    pub(crate) fn is_timed_out(&self) -> bool {
        self.timed_out.load(Ordering::SeqCst)
    }
}

/// Delivery endpoint for one reader, held by the pump. Dropping the outlet
/// closes the reader's inbox, which is how both EOF and eviction are
/// signalled.
struct Outlet {
    index: usize,
    tx: mpsc::Sender<Bytes>,
    slot: Arc<ReaderSlot>,
}

/// Everything the pump takes ownership of when it launches.
struct PumpState {
    source: BoxedSource,
    outlets: Vec<Outlet>,
    progress_tx: watch::Sender<u64>,
}

/// State shared between the caster handle and its readers.
pub(crate) struct Shared {
    /// One-shot launch token; flipped exactly once by the winning reader.
    started: AtomicBool,
    /// Taken by the pump at launch. `None` afterwards.
    state: Mutex<Option<PumpState>>,
    /// Mutable until the pump starts, then frozen.
    config: Mutex<CasterConfig>,
    /// Number of readers created via `new_reader`.
    reader_count: AtomicUsize,
    /// Kept here so `progress()` can hand out receivers at any time.
    progress_rx: watch::Receiver<u64>,
}

impl Shared {
    /// Launch the pump if it has not launched yet. Safe to call
    /// concurrently and repeatedly; at most one pump ever runs.
    pub(crate) fn start(&self) {
        if self.started.load(Ordering::SeqCst) {
            return;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(state) = state {
            let config = self
                .config
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone();
            tokio::spawn(pump(state, config));
        }
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// Broadcasts one sequential byte source to many independent readers.
///
/// Create readers with [`new_reader`](Self::new_reader) before any of them
/// performs its first read; the registry and all configuration freeze once
/// the pump starts. Each reader then consumes the complete source at its
/// own pace, decoupled from its peers by up to `backlog_depth` chunks.
pub struct ReadCaster {
    shared: Arc<Shared>,
}

impl ReadCaster {
    /// Create a caster over `source` with the default configuration
    /// (4096-byte chunks, backlog of 10, 1s reader timeout).
    pub fn new<R>(source: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self::build(Box::new(source), CasterConfig::default())
    }

    /// Create a caster over `source` with a custom configuration.
    ///
    /// Fails with [`CastError::InvalidChunkSize`] if the configured chunk
    /// size is zero.
    pub fn with_config<R>(source: R, config: CasterConfig) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        if config.chunk_size == 0 {
            return Err(CastError::InvalidChunkSize);
        }
        Ok(Self::build(Box::new(source), config))
    }

    fn build(source: BoxedSource, config: CasterConfig) -> Self {
        let (progress_tx, progress_rx) = watch::channel(0u64);

        Self {
            shared: Arc::new(Shared {
                started: AtomicBool::new(false),
                state: Mutex::new(Some(PumpState {
                    source,
                    outlets: Vec::new(),
                    progress_tx,
                })),
                config: Mutex::new(config),
                reader_count: AtomicUsize::new(0),
                progress_rx,
            }),
        }
    }

    /// Register a new reader over the caster's source.
    ///
    /// Fails with [`CastError::AlreadyStarted`] once any reader has begun
    /// reading; the consumer registry is append-only and frozen from the
    /// first read.
    pub fn new_reader(&self) -> Result<CastReader> {
        let mut guard = self
            .shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.shared.is_started() {
            return Err(CastError::AlreadyStarted);
        }
        let state = guard.as_mut().ok_or(CastError::AlreadyStarted)?;

        let capacity = self.config().effective_backlog();
        let (tx, rx) = mpsc::channel(capacity);
        let slot = Arc::new(ReaderSlot {
            timed_out: AtomicBool::new(false),
        });

        state.outlets.push(Outlet {
            index: state.outlets.len(),
            tx,
            slot: Arc::clone(&slot),
        });
        self.shared.reader_count.fetch_add(1, Ordering::SeqCst);

        Ok(CastReader::new(Arc::clone(&self.shared), rx, slot))
    }

    /// Size (in bytes) of each chunk read from the source.
    pub fn chunk_size(&self) -> usize {
        self.config().chunk_size
    }

    /// Number of chunks queued per reader before the pump blocks on it.
    pub fn backlog_depth(&self) -> usize {
        self.config().backlog_depth
    }

    /// Duration the pump waits for a slow reader before evicting it.
    pub fn reader_timeout(&self) -> Duration {
        self.config().reader_timeout
    }

    /// Set the reader timeout.
    ///
    /// Fails with [`CastError::AlreadyStarted`] once any reader has begun
    /// reading.
    pub fn set_reader_timeout(&self, timeout: Duration) -> Result<()> {
        if self.shared.is_started() {
            return Err(CastError::AlreadyStarted);
        }
        self.shared
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .reader_timeout = timeout;
        Ok(())
    }

    /// Number of readers created so far.
    pub fn reader_count(&self) -> usize {
        self.shared.reader_count.load(Ordering::SeqCst)
    }

    /// Whether the pump has started (and configuration is frozen).
    pub fn has_started(&self) -> bool {
        self.shared.is_started()
    }

    /// Advisory upper bound on the memory held in reader inboxes:
    /// chunk size x backlog depth x reader count.
    pub fn approx_memory_use(&self) -> usize {
        let config = self.config();
        config.chunk_size * config.effective_backlog() * self.reader_count()
    }

    /// Subscribe to read progress.
    ///
    /// The receiver observes the cumulative number of bytes read from the
    /// source. Publishing is best-effort: intermediate values may be
    /// skipped, only the latest is retained. The channel closes once the
    /// source is exhausted, with the final total as its last value.
    pub fn progress(&self) -> watch::Receiver<u64> {
        self.shared.progress_rx.clone()
    }

    fn config(&self) -> CasterConfig {
        self.shared
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl std::fmt::Debug for ReadCaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadCaster")
            .field("started", &self.has_started())
            .field("readers", &self.reader_count())
            .finish_non_exhaustive()
    }
}

/// The pump body: read the source end to end, exactly once, fanning every
/// chunk out to every live reader.
async fn pump(mut state: PumpState, config: CasterConfig) {
    tracing::debug!(
        readers = state.outlets.len(),
        chunk_size = config.chunk_size,
        "pump started"
    );

    let mut total: u64 = 0;
    loop {
        // fresh buffer per chunk; readers share it by refcount
        let mut buf = vec![0u8; config.chunk_size];
        let n = match state.source.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                // a source error ends the stream for everyone, same as EOF
                tracing::warn!(error = %e, "source read failed, ending stream");
                0
            }
        };

        total += n as u64;
        state.progress_tx.send_replace(total);

        if n == 0 {
            break;
        }

        buf.truncate(n);
        deliver(&mut state.outlets, Bytes::from(buf), config.reader_timeout).await;
    }

    tracing::debug!(total_bytes = total, "source exhausted, closing inboxes");
    // dropping the outlets closes every remaining inbox (EOF for the
    // readers); dropping progress_tx closes the progress channel
}

/// Deliver one chunk to every live outlet, in registration order, each with
/// its own deadline. Outlets that miss the deadline are evicted; outlets
/// whose reader was dropped are removed silently.
async fn deliver(outlets: &mut Vec<Outlet>, chunk: Bytes, reader_timeout: Duration) {
    let round = std::mem::take(outlets);
    for outlet in round {
        match timeout(reader_timeout, outlet.tx.send(chunk.clone())).await {
            Ok(Ok(())) => outlets.push(outlet),
            Ok(Err(_)) => {
                tracing::debug!(reader = outlet.index, "reader dropped, removed from delivery");
            }
            Err(_) => {
                outlet.slot.timed_out.store(true, Ordering::SeqCst);
                tracing::warn!(
                    reader = outlet.index,
                    timeout_ms = reader_timeout.as_millis() as u64,
                    "slow reader evicted"
                );
                // dropping the outlet here closes the evicted inbox
            }
        }
    }
}
