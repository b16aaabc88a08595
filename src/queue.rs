//! Work Queue
//!
//! FIFO queue drained by a single background worker. The worker blocks on a
//! `Notify` until work is enqueued, and processes exactly one item at a time in
//! submission order. A second `Notify` wakes callers of `wait_idle` once the
//! queue drains.

use crate::error::ApiError;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Processes one dequeued item
#[async_trait]
pub trait WorkProcessor<T>: Send + Sync + 'static {
    async fn process(&self, item: T) -> Result<(), ApiError>;
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Number of pending items
    pub pending: usize,
    /// Number of items currently being processed (0 or 1)
    pub processing: usize,
    /// Number of completed items
    pub completed: usize,
    /// Number of failed items
    pub failed: usize,
}

impl QueueStats {
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.processing == 0
    }
}

/// Single-worker FIFO queue
pub struct WorkQueue<T: Send + 'static> {
    name: String,
    capacity: usize,
    items: Arc<Mutex<VecDeque<T>>>,
    /// Wakes the worker when an item is enqueued or the queue is stopped
    notify: Arc<Notify>,
    /// Fired by the worker whenever nothing is left pending or processing
    idle: Arc<Notify>,
    running: Arc<RwLock<bool>>,
    stats: Arc<RwLock<QueueStats>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    processor: Arc<dyn WorkProcessor<T>>,
}

impl<T: Send + 'static> WorkQueue<T> {
    pub fn new(
        name: impl Into<String>,
        capacity: usize,
        processor: Arc<dyn WorkProcessor<T>>,
    ) -> Self {
        Self {
            name: name.into(),
            capacity,
            items: Arc::new(Mutex::new(VecDeque::new())),
            notify: Arc::new(Notify::new()),
            idle: Arc::new(Notify::new()),
            running: Arc::new(RwLock::new(false)),
            stats: Arc::new(RwLock::new(QueueStats::default())),
            worker: Mutex::new(None),
            processor,
        }
    }

    /// Enqueue an item, returning its 1-based position in the queue
    pub fn enqueue(&self, item: T) -> Result<usize, ApiError> {
        let position = {
            let mut items = self.items.lock();
            if items.len() >= self.capacity {
                warn!(
                    queue = %self.name,
                    queue_size = items.len(),
                    max_size = self.capacity,
                    "Queue is full, rejecting item"
                );
                return Err(ApiError::Validation(format!("queue '{}' is full", self.name)));
            }
            items.push_back(item);
            // Counted before the lock is released so the worker never takes an
            // item that is not yet pending
            self.stats.write().pending += 1;
            items.len()
        };

        self.notify.notify_one();
        debug!(queue = %self.name, position, "Enqueued item");
        Ok(position)
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    /// Start the background worker; no-op when already running
    pub fn start(&self) {
        {
            let mut running = self.running.write();
            if *running {
                return;
            }
            *running = true;
        }

        let name = self.name.clone();
        let items = Arc::clone(&self.items);
        let notify = Arc::clone(&self.notify);
        let idle = Arc::clone(&self.idle);
        let running = Arc::clone(&self.running);
        let stats = Arc::clone(&self.stats);
        let processor = Arc::clone(&self.processor);

        let handle = tokio::spawn(async move {
            Self::worker_loop(name, items, notify, idle, running, stats, processor).await;
        });
        *self.worker.lock() = Some(handle);

        info!(queue = %self.name, "Started queue worker");
    }

    /// Stop the worker.
    ///
    /// The in-flight item, if any, runs to completion; no further item is taken.
    /// Pending items stay queued for the next `start`.
    pub async fn stop(&self) {
        {
            let mut running = self.running.write();
            if !*running {
                return;
            }
            *running = false;
        }
        self.notify.notify_one();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(queue = %self.name, error = %e, "Queue worker ended abnormally");
            }
        }

        info!(queue = %self.name, "Stopped queue worker");
    }

    pub fn stats(&self) -> QueueStats {
        self.stats.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Wait until nothing is pending or processing
    pub async fn wait_idle(&self, timeout: Option<Duration>) -> Result<(), ApiError> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        loop {
            // Registered before the check so a drain in between is not missed
            let drained = self.idle.notified();
            if self.stats.read().is_idle() {
                return Ok(());
            }

            match deadline {
                Some(deadline) => {
                    if timeout_at(deadline, drained).await.is_err() {
                        if self.stats.read().is_idle() {
                            return Ok(());
                        }
                        return Err(ApiError::Handler(format!(
                            "Timeout waiting for queue '{}' to drain",
                            self.name
                        )));
                    }
                }
                None => drained.await,
            }
        }
    }

    async fn worker_loop(
        name: String,
        items: Arc<Mutex<VecDeque<T>>>,
        notify: Arc<Notify>,
        idle: Arc<Notify>,
        running: Arc<RwLock<bool>>,
        stats: Arc<RwLock<QueueStats>>,
        processor: Arc<dyn WorkProcessor<T>>,
    ) {
        debug!(queue = %name, "Worker started");

        while *running.read() {
            let item = items.lock().pop_front();
            let Some(item) = item else {
                notify.notified().await;
                continue;
            };

            {
                let mut guard = stats.write();
                guard.pending = guard.pending.saturating_sub(1);
                guard.processing += 1;
            }

            let result = processor.process(item).await;

            let drained = {
                let mut guard = stats.write();
                guard.processing = guard.processing.saturating_sub(1);
                match result {
                    Ok(()) => guard.completed += 1,
                    Err(e) => {
                        guard.failed += 1;
                        warn!(queue = %name, error = %e, "Queue item failed");
                    }
                }
                guard.is_idle()
            };
            if drained {
                idle.notify_waiters();
            }
        }

        debug!(queue = %name, "Worker stopped");
    }
}
