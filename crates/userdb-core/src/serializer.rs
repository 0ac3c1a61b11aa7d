//! Write serialization for read-modify-write operations.
//!
//! The engine has no multi-key transactions, so a "read record, change it,
//! write it back" sequence can lose updates if two of them interleave. The
//! `WriteSerializer` admits such sequences through a queue drained by a
//! single worker: a task runs to completion before the next one starts.
//!
//! ## Architecture
//!
//! ```text
//!  callers ──submit(key, task)──► shard = blake3(key) mod K
//!                                    │
//!                      ┌─────────────┼─────────────┐
//!                      ▼             ▼             ▼
//!                  [queue 0]     [queue 1]  …  [queue K-1]
//!                      │             │             │
//!                  worker 0      worker 1      worker K-1
//!                      │  one task at a time per worker
//!                      ▼
//!               WriteExecutor::execute(task) ──► oneshot result to caller
//! ```
//!
//! With one shard (the default) every serialized write in the store is
//! totally ordered by arrival. With K shards, writes for the same key are
//! still totally ordered; writes for keys on different shards may overlap.
//!
//! A task that touches several keys ([`submit_many`](WriteSerializer::submit_many))
//! is admitted on every shard those keys map to. The lowest shard runs it;
//! each other shard gets a hold that parks its worker until the task is
//! done. All envelopes of one task are enqueued under a single lock, so
//! every queue sees multi-shard tasks in the same relative order and two
//! of them can never wait on each other.
//!
//! A task that fails (or panics) completes with an error and the worker
//! moves on. There is no timeout: a task that never returns blocks its
//! shard.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Result, UserDbError};

/// Executes queued write tasks.
///
/// `execute` runs on the blocking pool, so it may call a synchronous
/// engine directly.
pub trait WriteExecutor: Send + Sync + 'static {
    /// The explicit task object: everything needed to finish the sequence.
    type Task: Send + 'static;

    fn execute(&self, task: Self::Task) -> Result<()>;
}

/// A task waiting in a shard queue.
struct PendingWrite<T> {
    task: T,
    /// Channel to send the result.
    response_tx: oneshot::Sender<Result<()>>,
    /// When this write was queued.
    queued_at: Instant,
    /// Other shards that must be parked before the task runs.
    holds: Vec<HeldShard>,
}

/// The running side of a hold: learns when the other shard is parked, and
/// releases it when dropped.
struct HeldShard {
    parked_rx: oneshot::Receiver<()>,
    release_tx: oneshot::Sender<()>,
}

/// The parked side of a hold, queued on a secondary shard.
struct ShardHold {
    parked_tx: oneshot::Sender<()>,
    release_rx: oneshot::Receiver<()>,
}

fn hold_pair() -> (HeldShard, ShardHold) {
    let (parked_tx, parked_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();
    (
        HeldShard {
            parked_rx,
            release_tx,
        },
        ShardHold {
            parked_tx,
            release_rx,
        },
    )
}

enum Envelope<T> {
    Write(PendingWrite<T>),
    Hold(ShardHold),
}

type ShardSender<T> = mpsc::UnboundedSender<Envelope<T>>;

/// Single-worker-per-shard admission queue.
pub struct WriteSerializer<X: WriteExecutor> {
    senders: Mutex<Option<Vec<ShardSender<X::Task>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
    shard_count: usize,
}

impl<X: WriteExecutor> WriteSerializer<X> {
    /// Spawn `shards` workers sharing `executor`.
    ///
    /// # Errors
    ///
    /// Returns `UserDbError::InvalidInput` for zero shards and
    /// `UserDbError::Runtime` when called outside a Tokio runtime.
    pub fn new(executor: X, shards: usize) -> Result<Self> {
        if shards == 0 {
            return Err(UserDbError::InvalidInput(
                "Write serializer needs at least one shard".to_string(),
            ));
        }
        let handle = Handle::try_current()
            .map_err(|e| UserDbError::Runtime(format!("No Tokio runtime: {}", e)))?;

        let executor = Arc::new(executor);
        let pending = Arc::new(AtomicUsize::new(0));
        let mut senders = Vec::with_capacity(shards);
        let mut workers = Vec::with_capacity(shards);
        for shard in 0..shards {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            workers.push(handle.spawn(run_worker(
                shard,
                Arc::clone(&executor),
                rx,
                Arc::clone(&pending),
            )));
        }

        info!(shards, "Started write serializer");

        Ok(Self {
            senders: Mutex::new(Some(senders)),
            workers: Mutex::new(workers),
            pending,
            shard_count: shards,
        })
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Shard that serializes writes for `key`.
    pub fn shard_for(&self, key: &[u8]) -> usize {
        shard_index(key, self.shard_count)
    }

    /// Number of admitted tasks that have not completed yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Admit a task.
    ///
    /// Returns a receiver that resolves once the task has run. Dropping the
    /// receiver does not cancel the task.
    ///
    /// # Errors
    ///
    /// Returns `UserDbError::QueueClosed` after [`close`](Self::close).
    pub fn submit(&self, key: &[u8], task: X::Task) -> Result<oneshot::Receiver<Result<()>>> {
        self.submit_many(&[key], task)
    }

    /// Admit a task that reads or writes every key in `keys`.
    ///
    /// The task is ordered against all earlier tasks on each of the keys'
    /// shards, and later tasks on those shards wait for it.
    pub fn submit_many(
        &self,
        keys: &[&[u8]],
        task: X::Task,
    ) -> Result<oneshot::Receiver<Result<()>>> {
        let mut shards: Vec<usize> = keys.iter().map(|key| self.shard_for(key)).collect();
        shards.sort_unstable();
        shards.dedup();
        let Some((&primary, secondary)) = shards.split_first() else {
            return Err(UserDbError::InvalidInput(
                "A write task needs at least one key".to_string(),
            ));
        };

        let mut holds = Vec::with_capacity(secondary.len());
        let mut parked = Vec::with_capacity(secondary.len());
        for &shard in secondary {
            let (held, hold) = hold_pair();
            holds.push(held);
            parked.push((shard, hold));
        }

        let (response_tx, response_rx) = oneshot::channel();
        let write = PendingWrite {
            task,
            response_tx,
            queued_at: Instant::now(),
            holds,
        };

        let guard = self
            .senders
            .lock()
            .map_err(|_| UserDbError::Runtime("Write queue lock poisoned".to_string()))?;
        let senders = guard.as_ref().ok_or(UserDbError::QueueClosed)?;

        // Holds go first; if one cannot be queued the task is never queued.
        for (shard, hold) in parked {
            let sender = senders.get(shard).ok_or(UserDbError::QueueClosed)?;
            sender
                .send(Envelope::Hold(hold))
                .map_err(|_| UserDbError::QueueClosed)?;
        }

        let sender = senders.get(primary).ok_or(UserDbError::QueueClosed)?;
        self.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(Envelope::Write(write)).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(UserDbError::QueueClosed);
        }
        Ok(response_rx)
    }

    /// Admit a task and wait for its result.
    pub async fn run(&self, key: &[u8], task: X::Task) -> Result<()> {
        Self::wait(self.submit(key, task)?).await
    }

    /// Admit a multi-key task and wait for its result.
    pub async fn run_many(&self, keys: &[&[u8]], task: X::Task) -> Result<()> {
        Self::wait(self.submit_many(keys, task)?).await
    }

    async fn wait(response_rx: oneshot::Receiver<Result<()>>) -> Result<()> {
        response_rx
            .await
            .map_err(|_| UserDbError::Runtime("Write worker stopped before completing task".to_string()))?
    }

    /// Stop admitting tasks, let the workers drain their queues, and wait
    /// for them to exit. Idempotent.
    pub async fn close(&self) -> Result<()> {
        let senders = self
            .senders
            .lock()
            .map_err(|_| UserDbError::Runtime("Write queue lock poisoned".to_string()))?
            .take();
        drop(senders);

        let workers: Vec<JoinHandle<()>> = {
            let mut guard = self
                .workers
                .lock()
                .map_err(|_| UserDbError::Runtime("Write queue lock poisoned".to_string()))?;
            guard.drain(..).collect()
        };
        for worker in workers {
            worker.await?;
        }
        debug!("Write serializer closed");
        Ok(())
    }
}

impl<X: WriteExecutor> std::fmt::Debug for WriteSerializer<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteSerializer")
            .field("shard_count", &self.shard_count)
            .field("pending", &self.pending())
            .finish()
    }
}

/// Map a key onto one of `shards` queues.
pub fn shard_index(key: &[u8], shards: usize) -> usize {
    if shards <= 1 {
        return 0;
    }
    let hash = blake3::hash(key);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    (u64::from_le_bytes(prefix) % shards as u64) as usize
}

async fn run_worker<X: WriteExecutor>(
    shard: usize,
    executor: Arc<X>,
    mut rx: mpsc::UnboundedReceiver<Envelope<X::Task>>,
    pending: Arc<AtomicUsize>,
) {
    debug!(shard, "Write worker started");

    while let Some(envelope) = rx.recv().await {
        let write = match envelope {
            Envelope::Write(write) => write,
            Envelope::Hold(hold) => {
                // Parked until the task on the lower shard has finished.
                if hold.parked_tx.send(()).is_ok() {
                    let _ = hold.release_rx.await;
                }
                continue;
            }
        };
        let PendingWrite {
            task,
            response_tx,
            queued_at,
            holds,
        } = write;

        let mut releases = Vec::with_capacity(holds.len());
        for held in holds {
            if held.parked_rx.await.is_err() {
                debug!(shard, "Held shard went away before parking");
            }
            releases.push(held.release_tx);
        }

        let queued_for = queued_at.elapsed();
        let executor = Arc::clone(&executor);

        let result = match tokio::task::spawn_blocking(move || executor.execute(task)).await {
            Ok(result) => result,
            Err(e) => {
                error!(shard, error = %e, "Write task panicked");
                Err(UserDbError::Runtime(format!("Write task failed: {}", e)))
            }
        };

        match &result {
            Ok(()) => debug!(
                shard,
                queued_us = queued_for.as_micros() as u64,
                "Write task completed"
            ),
            Err(e) if e.is_not_found() => debug!(shard, error = %e, "Write task target missing"),
            Err(e) => warn!(shard, error = %e, "Write task failed"),
        }

        drop(releases);
        pending.fetch_sub(1, Ordering::SeqCst);
        if response_tx.send(result).is_err() {
            debug!(shard, "Write caller went away before completion");
        }
    }

    debug!(shard, "Write worker stopped");
}
