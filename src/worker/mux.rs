//! Fan-in of per-worker event channels into one consumer.
//!
//! Each worker owns an unbounded sender; the receivers live in a
//! [`StreamMap`] keyed by worker number. [`collect`] pulls one event at a time
//! and applies it to the [`Reporter`], so reporter state is never touched by
//! two events concurrently. Order is preserved per worker only.

use std::collections::BTreeMap;

use tokio::sync::{mpsc, watch};
use tokio_stream::StreamExt;
use tokio_stream::StreamMap;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use super::protocol::WorkerEvent;
use crate::error::{Error, Result};
use crate::notification::SeedNotice;
use crate::reporter::Reporter;

/// Sending half handed to one worker task
#[derive(Debug, Clone)]
pub struct WorkerSender {
    worker: usize,
    tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl WorkerSender {
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Returns false once the consumer is gone
    pub fn send(&self, event: WorkerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Single consumer over every worker channel
pub struct Multiplexer {
    streams: StreamMap<usize, UnboundedReceiverStream<WorkerEvent>>,
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Multiplexer {
    pub fn new() -> Self {
        Self {
            streams: StreamMap::new(),
        }
    }

    /// Open the channel for `worker`
    pub fn channel(&mut self, worker: usize) -> WorkerSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams.insert(worker, UnboundedReceiverStream::new(rx));
        WorkerSender { worker, tx }
    }

    /// Wait for the next event from any worker; `None` once every sender is dropped
    pub async fn next(&mut self) -> Option<(usize, WorkerEvent)> {
        self.streams.next().await
    }

    pub fn open_channels(&self) -> usize {
        self.streams.len()
    }
}

/// Cooperative stop request shared with worker tasks
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn request(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }
}

/// How one worker ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    pub success: bool,
    pub code: Option<i32>,
    pub stopped: bool,
    pub closed: bool,
}

/// Everything the coordinator learns besides reporter state
#[derive(Debug, Default)]
pub struct WorkerOutcome {
    pub exits: BTreeMap<usize, WorkerExit>,
    pub seed: Option<SeedNotice>,
    pub fail_fast_triggered: bool,
}

impl WorkerOutcome {
    /// Every worker not asked to stop exited cleanly
    pub fn all_succeeded(&self) -> bool {
        self.exits.values().all(|exit| exit.success || exit.stopped)
    }
}

/// Drain the multiplexer into the reporter until every worker channel ends.
///
/// Events that arrive after a stop request are still applied.
pub async fn collect(
    mux: &mut Multiplexer,
    reporter: &mut Reporter,
    shutdown: &Shutdown,
) -> Result<WorkerOutcome> {
    let mut outcome = WorkerOutcome::default();
    let mut closed = BTreeMap::new();

    while let Some((worker, event)) = mux.next().await {
        match event {
            WorkerEvent::Notification(notification) => {
                reporter.handle(notification)?;
                if reporter.should_stop() && !shutdown.is_requested() {
                    info!("Fail-fast threshold reached, stopping remaining workers");
                    outcome.fail_fast_triggered = true;
                    shutdown.request();
                }
            }
            WorkerEvent::LoadTime(load_time) => reporter.set_load_time(load_time),
            WorkerEvent::Seed { seed, used } => {
                outcome.seed.get_or_insert(SeedNotice { seed, used });
            }
            WorkerEvent::Closed => {
                debug!("Worker {} closed its stream", worker);
                closed.insert(worker, true);
            }
            WorkerEvent::Exited {
                success,
                code,
                stopped,
            } => {
                let was_closed = closed.get(&worker).copied().unwrap_or(false);
                if !was_closed && !stopped && !shutdown.is_requested() {
                    return Err(Error::worker(
                        worker,
                        format!("stream ended before close marker (exit code {:?})", code),
                    ));
                }
                if !success && !stopped {
                    warn!("Worker {} exited with code {:?}", worker, code);
                }
                outcome.exits.insert(
                    worker,
                    WorkerExit {
                        success,
                        code,
                        stopped,
                        closed: was_closed,
                    },
                );
            }
            WorkerEvent::Failed(reason) => return Err(Error::worker(worker, reason)),
        }
    }

    Ok(outcome)
}
