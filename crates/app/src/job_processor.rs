//! Job processor — drains the job queue and invokes actions.
//!
//! ```text
//! Stopped ──start()──▶ Started ──enqueue──▶ Worker running ──queue empty──▶ Worker idle
//!    ▲                                            │   ▲                         │
//!    └──────────────stop()────────────────────────┘   └────────enqueue──────────┘
//! ```
//!
//! At most one worker drains the queue at any time. A worker is spawned
//! lazily on the first enqueue into an idle processor and exits once it
//! observes the queue empty, so jobs run in enqueue order across idle periods.
//! Each invocation runs in its own task: an error or panic is logged with the
//! job's action id and the worker moves on to the next job.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use sigflow_domain::job::Job;
use sigflow_domain::time::elapsed_ms;

use crate::job_queue::JobQueue;
use crate::ports::ActionRegistry;

struct ActiveWorker {
    generation: u64,
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Counters {
    workers_spawned: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_skipped: AtomicU64,
}

struct Shared<R> {
    queue: Arc<JobQueue>,
    registry: R,
    started: AtomicBool,
    worker: Mutex<Option<ActiveWorker>>,
    next_generation: AtomicU64,
    counters: Counters,
}

/// Long-running consumer of a [`JobQueue`].
pub struct JobProcessor<R> {
    shared: Arc<Shared<R>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<R> JobProcessor<R>
where
    R: ActionRegistry + Send + Sync + 'static,
{
    /// Create a stopped processor for `queue`, resolving actions through `registry`.
    pub fn new(queue: Arc<JobQueue>, registry: R) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue,
                registry,
                started: AtomicBool::new(false),
                worker: Mutex::new(None),
                next_generation: AtomicU64::new(0),
                counters: Counters::default(),
            }),
            listener: Mutex::new(None),
        }
    }

    /// Start reacting to enqueue notifications. Does not spawn a worker by
    /// itself: jobs enqueued while stopped wait for the next enqueue.
    /// Calling `start` on a started processor is a no-op.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn start(&self) {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.shared.queue.discard_notification() {
            tracing::debug!(
                pending = self.shared.queue.len(),
                "ignoring enqueue raised while stopped"
            );
        }
        let shared = Arc::clone(&self.shared);
        let listener = tokio::spawn(async move {
            loop {
                shared.queue.enqueued().await;
                Shared::on_enqueued(&shared);
            }
        });
        if let Some(previous) = lock(&self.listener).replace(listener) {
            previous.abort();
        }
        tracing::info!("job processor started");
    }

    /// Stop the processor and wait for the active worker, if any, to finish.
    ///
    /// With `clear_current_queue` every queued job runs before `stop`
    /// returns. Without it, a non-empty queue cancels the worker after its
    /// in-flight job; remaining jobs stay queued. Idempotent.
    pub async fn stop(&self, clear_current_queue: bool) {
        let was_started = self.shared.started.swap(false, Ordering::SeqCst);

        let listener = lock(&self.listener).take();
        if let Some(listener) = listener {
            listener.abort();
            let _ = listener.await;
        }

        let worker = lock(&self.shared.worker).take();
        if let Some(worker) = worker {
            if !clear_current_queue && !self.shared.queue.is_empty() {
                tracing::info!(pending = self.shared.queue.len(), "cancelling active worker");
                worker.cancel.cancel();
            }
            if let Err(err) = worker.handle.await {
                tracing::error!(error = %err, "job worker terminated abnormally");
            }
        }

        // Jobs enqueued after the last worker went idle, but before its
        // notification was handled, have no worker yet.
        if was_started && clear_current_queue && !self.shared.queue.is_empty() {
            let generation = self.shared.next_generation.fetch_add(1, Ordering::SeqCst);
            self.shared
                .counters
                .workers_spawned
                .fetch_add(1, Ordering::Relaxed);
            tracing::info!(pending = self.shared.queue.len(), "draining remaining jobs");
            Shared::drain(
                Arc::clone(&self.shared),
                generation,
                CancellationToken::new(),
            )
            .instrument(tracing::info_span!("job_worker", generation))
            .await;
        }
        tracing::info!("job processor stopped");
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.shared.started.load(Ordering::SeqCst)
    }

    /// Whether a worker is currently draining the queue.
    #[must_use]
    pub fn is_worker_active(&self) -> bool {
        lock(&self.shared.worker)
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Number of workers spawned over the processor's lifetime.
    #[must_use]
    pub fn workers_spawned(&self) -> u64 {
        self.shared.counters.workers_spawned.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn jobs_completed(&self) -> u64 {
        self.shared.counters.jobs_completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn jobs_failed(&self) -> u64 {
        self.shared.counters.jobs_failed.load(Ordering::Relaxed)
    }

    /// Jobs dropped because their action was unknown or could not be resolved.
    #[must_use]
    pub fn jobs_skipped(&self) -> u64 {
        self.shared.counters.jobs_skipped.load(Ordering::Relaxed)
    }
}

impl<R> Drop for JobProcessor<R> {
    fn drop(&mut self) {
        if let Some(listener) = lock(&self.listener).take() {
            listener.abort();
        }
    }
}

impl<R> Shared<R>
where
    R: ActionRegistry + Send + Sync + 'static,
{
    /// React to an enqueue notification: spawn a worker unless stopped or
    /// one is already running.
    fn on_enqueued(shared: &Arc<Self>) {
        if !shared.started.load(Ordering::SeqCst) {
            return;
        }
        let mut slot = lock(&shared.worker);
        if slot
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
        {
            return;
        }
        let generation = shared.next_generation.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            Self::drain(Arc::clone(shared), generation, cancel.clone())
                .instrument(tracing::info_span!("job_worker", generation)),
        );
        shared
            .counters
            .workers_spawned
            .fetch_add(1, Ordering::Relaxed);
        *slot = Some(ActiveWorker {
            generation,
            handle,
            cancel,
        });
    }

    async fn drain(shared: Arc<Self>, generation: u64, cancel: CancellationToken) {
        tracing::debug!("job worker running");
        loop {
            if cancel.is_cancelled() {
                tracing::debug!("job worker cancelled");
                return;
            }
            if let Some(job) = shared.queue.dequeue() {
                shared.process(job).await;
                continue;
            }
            // Re-check under the worker lock: an enqueue that raced with the
            // empty dequeue either lands before this check or finds the slot
            // cleared and spawns a fresh worker.
            {
                let mut slot = lock(&shared.worker);
                if shared.queue.is_empty() {
                    if slot
                        .as_ref()
                        .is_some_and(|worker| worker.generation == generation)
                    {
                        *slot = None;
                    }
                    tracing::debug!("job worker idle");
                    return;
                }
            }
        }
    }

    async fn process(&self, job: Job) {
        let span = tracing::info_span!("job", job_id = %job.id(), action_id = %job.action_id());
        async move {
            let definition = match self.registry.find(job.action_id()).await {
                Ok(Some(definition)) => definition,
                Ok(None) => {
                    tracing::warn!("no action registered for job, skipping");
                    self.counters.jobs_skipped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(err) => {
                    tracing::error!(error = ?err, "action lookup failed, dropping job");
                    self.counters.jobs_skipped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            };

            let created_at = job.created_at();
            let invocation = tokio::spawn(
                async move { definition.invoke(job.parameters()).await }
                    .instrument(tracing::Span::current()),
            );
            match invocation.await {
                Ok(Ok(())) => {
                    self.counters.jobs_completed.fetch_add(1, Ordering::Relaxed);
                    tracing::info!(latency_ms = elapsed_ms(created_at), "job completed");
                }
                Ok(Err(err)) => {
                    self.counters.jobs_failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(error = ?err, "job failed");
                }
                Err(join_err) => {
                    self.counters.jobs_failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(error = %join_err, "job panicked");
                }
            }
        }
        .instrument(span)
        .await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
