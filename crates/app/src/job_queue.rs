//! Job queue — the FIFO between the signal processor and the job processor.
//!
//! Every enqueue raises an "item enqueued" notification through a
//! [`Notify`]. Notifications coalesce: a consumer that was busy when several
//! jobs arrived wakes once and must drain until [`dequeue`](JobQueue::dequeue)
//! returns `None`.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use sigflow_domain::error::SigflowError;
use sigflow_domain::job::Job;

use crate::ports::JobDispatcher;

/// Internally synchronised FIFO of [`Job`]s with enqueue notification.
#[derive(Default)]
pub struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
    enqueued: Notify,
}

impl JobQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `job` and raise the enqueue notification.
    pub fn enqueue(&self, job: Job) {
        tracing::debug!(job_id = %job.id(), action_id = %job.action_id(), "job enqueued");
        self.lock().push_back(job);
        self.enqueued.notify_one();
    }

    /// Take the oldest job, or `None` when the queue is empty. Never blocks
    /// beyond the internal lock.
    pub fn dequeue(&self) -> Option<Job> {
        self.lock().pop_front()
    }

    /// Snapshot emptiness check. Racy under concurrent access: use only as a
    /// hint and re-check with [`dequeue`](Self::dequeue).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Discard every pending job. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut jobs = self.lock();
        let dropped = jobs.len();
        jobs.clear();
        dropped
    }

    /// Wait for the next enqueue notification.
    ///
    /// A notification raised while nobody was waiting is kept (at most one)
    /// and completes the next call immediately.
    pub async fn enqueued(&self) {
        self.enqueued.notified().await;
    }

    /// Drop a notification kept from while nobody was waiting. Queued jobs
    /// stay queued. Returns whether one was dropped.
    pub fn discard_notification(&self) -> bool {
        pin!(self.enqueued.notified()).enable()
    }
}

impl JobDispatcher for JobQueue {
    fn dispatch(&self, job: Job) -> impl Future<Output = Result<(), SigflowError>> + Send {
        self.enqueue(job);
        async { Ok(()) }
    }
}
