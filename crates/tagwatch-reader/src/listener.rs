//! Background polling of an open reader session.
//!
//! [`TagListener::start`] moves the session into its own task, which runs one
//! poll cycle per tick and publishes decoded identifiers to a bounded
//! channel:
//!
//! ```text
//! ┌──────────────┐  tick   ┌──────────────┐  TagId   ┌────────────────┐
//! │   interval   │────────►│ ReaderSession│─────────►│ mpsc (bounded) │──► ListenerHandle::recv
//! └──────────────┘         │   cycle()    │          └────────────────┘
//!                          └──────────────┘
//!        watch stop signal ──► checked between cycles
//! ```
//!
//! Recoverable per-cycle errors are logged and polling carries on; any other
//! error stops the worker. When the channel is full the worker waits up to
//! the configured publish timeout, then drops the identifier.
//!
//! # Examples
//!
//! ```no_run
//! use tagwatch_hardware::mock::MockNfcDriver;
//! use tagwatch_reader::{ReaderConfig, ReaderSession};
//!
//! #[tokio::main]
//! async fn main() -> tagwatch_reader::Result<()> {
//!     let (driver, _handle) = MockNfcDriver::new();
//!     let session = ReaderSession::connect(&driver, ReaderConfig::default()).await?;
//!
//!     let mut listener = session.listen();
//!     while let Some(id) = listener.recv().await {
//!         println!("Tag ID: {id}");
//!     }
//!
//!     listener.shutdown().await
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tagwatch_hardware::NfcDevice;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::decoder::TagId;
use crate::error::{ReaderError, Result};
use crate::session::{ReaderSession, SessionState};

/// Snapshot of listener counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Poll cycles run.
    pub cycles: u64,

    /// Identifiers delivered to the channel.
    pub published: u64,

    /// Identifiers dropped because the channel stayed full.
    pub dropped: u64,

    /// Cycles that ended in a recoverable error.
    pub errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cycles: AtomicU64,
    published: AtomicU64,
    dropped: AtomicU64,
    errors: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ListenerStats {
        ListenerStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Starts polling workers.
#[derive(Debug)]
pub struct TagListener;

impl TagListener {
    /// Move `session` into a polling task.
    ///
    /// The session should be open. A session in any other state makes the
    /// worker stop on its first cycle with [`ReaderError::InvalidState`],
    /// which [`ListenerHandle::shutdown`] then reports.
    pub fn start<D>(session: ReaderSession<D>) -> ListenerHandle
    where
        D: NfcDevice + 'static,
    {
        let (tag_tx, tag_rx) = mpsc::channel(session.config().channel_capacity.max(1));
        let (stop_tx, stop_rx) = watch::channel(false);
        let counters = Arc::new(Counters::default());

        let task = tokio::spawn(run(session, tag_tx, stop_rx, Arc::clone(&counters)));

        ListenerHandle {
            tag_rx,
            stop_tx,
            counters,
            task,
        }
    }
}

/// Consumer side of a running [`TagListener`].
///
/// Dropping the handle stops the worker after its current cycle.
#[derive(Debug)]
pub struct ListenerHandle {
    tag_rx: mpsc::Receiver<TagId>,
    stop_tx: watch::Sender<bool>,
    counters: Arc<Counters>,
    task: JoinHandle<Result<()>>,
}

impl ListenerHandle {
    /// Receive the next identifier.
    ///
    /// Returns `None` once the worker has stopped and every published
    /// identifier has been received.
    pub async fn recv(&mut self) -> Option<TagId> {
        self.tag_rx.recv().await
    }

    /// Current counters.
    pub fn stats(&self) -> ListenerStats {
        self.counters.snapshot()
    }

    /// Whether the worker has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the worker and close the session.
    ///
    /// Any in-flight poll is allowed to finish first.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::Close`] if releasing the device fails
    /// - the error that stopped the worker, if it stopped on its own
    /// - [`ReaderError::WorkerFailed`] if the worker panicked
    pub async fn shutdown(self) -> Result<()> {
        // Fails only if the worker already stopped
        let _ = self.stop_tx.send(true);

        let result = join_outcome(self.task.await);
        let stats = self.counters.snapshot();
        info!(
            "Listener stopped after {} cycles ({} published, {} dropped, {} errors)",
            stats.cycles, stats.published, stats.dropped, stats.errors
        );
        result
    }
}

fn join_outcome(result: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match result {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            error!("Polling worker panicked");
            Err(ReaderError::WorkerFailed("worker panicked".to_string()))
        }
        Err(e) => {
            error!("Polling worker failed: {}", e);
            Err(ReaderError::WorkerFailed(e.to_string()))
        }
    }
}

enum Publish {
    Sent,
    Dropped,
    Closed,
}

async fn publish(tx: &mpsc::Sender<TagId>, id: TagId, timeout: Duration) -> Publish {
    match tx.try_send(id) {
        Ok(()) => Publish::Sent,
        Err(TrySendError::Closed(_)) => Publish::Closed,
        Err(TrySendError::Full(id)) => match tx.send_timeout(id, timeout).await {
            Ok(()) => Publish::Sent,
            Err(SendTimeoutError::Timeout(id)) => {
                warn!("Identifier channel full, dropping {}", id);
                Publish::Dropped
            }
            Err(SendTimeoutError::Closed(_)) => Publish::Closed,
        },
    }
}

async fn run<D: NfcDevice>(
    mut session: ReaderSession<D>,
    tag_tx: mpsc::Sender<TagId>,
    mut stop_rx: watch::Receiver<bool>,
    counters: Arc<Counters>,
) -> Result<()> {
    let publish_timeout = session.config().publish_timeout;
    let mut ticker = tokio::time::interval(session.config().poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!("Polling worker started");

    let outcome = loop {
        tokio::select! {
            biased;
            // Also fires when the handle is dropped
            _ = stop_rx.changed() => {
                debug!("Polling worker received stop signal");
                break Ok(());
            }
            _ = ticker.tick() => {}
        }

        counters.cycles.fetch_add(1, Ordering::Relaxed);

        match session.cycle().await {
            Ok(Some(id)) => match publish(&tag_tx, id, publish_timeout).await {
                Publish::Sent => {
                    counters.published.fetch_add(1, Ordering::Relaxed);
                }
                Publish::Dropped => {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Publish::Closed => {
                    debug!("Identifier receiver dropped, stopping");
                    break Ok(());
                }
            },
            Ok(None) => {}
            Err(e) if e.is_recoverable() => {
                counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!("Poll cycle failed: {}", e);
            }
            Err(e) => {
                error!("Polling worker stopping: {}", e);
                break Err(e);
            }
        }
    };

    let closed = if session.state() == SessionState::Open {
        session.close().await
    } else {
        Ok(())
    };

    outcome.and(closed)
}
