//! Per-session serialized command queue.
//!
//! One consumer loop per session runs jobs strictly one after another, so
//! handlers for the same session never overlap. The queue is bounded; when
//! it is full the oldest waiting job is thrown away instead of applying
//! backpressure to the receive path.

use futures_util::FutureExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use tokio::sync::Notify;
use tracing::{error, warn};

/// A unit of work run on the session's consumer loop.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Result of [`CommandQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pushed {
    Queued,
    /// Queued after discarding the oldest pending job.
    DroppedOldest,
    /// The queue was closed; the job was discarded.
    Closed,
}

struct Inner {
    jobs: VecDeque<Job>,
    closed: bool,
}

/// Bounded FIFO of jobs with a single consumer.
pub struct CommandQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CommandQueue")
            .field("pending", &inner.jobs.len())
            .field("closed", &inner.closed)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                jobs: VecDeque::with_capacity(capacity.min(16)),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueue a job.
    pub fn push<F>(&self, job: F) -> Pushed
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let outcome = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Pushed::Closed;
            }
            let outcome = if inner.jobs.len() >= self.capacity {
                inner.jobs.pop_front();
                Pushed::DroppedOldest
            } else {
                Pushed::Queued
            };
            inner.jobs.push_back(Box::pin(job));
            outcome
        };
        self.notify.notify_one();
        outcome
    }

    /// Refuse further jobs. Jobs already queued still run.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Jobs waiting to run.
    pub fn len(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn next(&self) -> Option<Job> {
        loop {
            {
                let mut inner = self.inner.lock();
                if let Some(job) = inner.jobs.pop_front() {
                    return Some(job);
                }
                if inner.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Consumer loop. Returns once the queue is closed and empty.
    ///
    /// A panicking job is logged and counted; the loop keeps going.
    pub async fn run(&self) {
        while let Some(job) = self.next().await {
            if let Err(panic) = AssertUnwindSafe(job).catch_unwind().await {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_owned())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_owned());
                error!(panic = %msg, "command handler panicked");
                crate::metrics::record_handler_panic();
            }
        }
    }
}

/// Log a dropped job.
pub(crate) fn warn_dropped(uid: &str) {
    warn!(%uid, "command queue full, dropped oldest pending command");
    crate::metrics::record_queue_drop();
}
