//! Agent-topology dispatch: every job runs in a freshly loaded, disposable
//! execution context instead of going through the job queue.

use std::future::Future;

use sigflow_domain::error::SigflowError;
use sigflow_domain::job::Job;

use crate::ports::{ActionRegistry, ExecutorLoader, IsolatedExecutor, JobDispatcher};

/// [`JobDispatcher`] that executes each job through an [`ExecutorLoader`].
///
/// Failures at the isolation boundary are caught and logged here and never
/// reach the signal processor: dispatch always succeeds once the job has been
/// handed to an executor, or has been dropped.
pub struct IsolatedDispatcher<L, R> {
    loader: L,
    registry: R,
}

impl<L, R> IsolatedDispatcher<L, R>
where
    L: ExecutorLoader + Sync,
    R: ActionRegistry + Sync,
{
    pub fn new(loader: L, registry: R) -> Self {
        Self { loader, registry }
    }

    async fn run(&self, job: Job) {
        let span = tracing::info_span!("isolated", job_id = %job.id(), action_id = %job.action_id());

        let action = match self.registry.find(job.action_id()).await {
            Ok(Some(action)) => action,
            Ok(None) => {
                tracing::warn!(parent: &span, "no action registered for job, dropping");
                return;
            }
            Err(err) => {
                tracing::error!(parent: &span, error = ?err, "action lookup failed, dropping job");
                return;
            }
        };

        let executor = match self.loader.load(span.clone()).await {
            Ok(executor) => executor,
            Err(err) => {
                tracing::error!(parent: &span, error = ?err, "failed to load isolated executor");
                return;
            }
        };

        match executor.execute(job, action).await {
            Ok(()) => tracing::info!(parent: &span, "isolated job completed"),
            Err(err) => tracing::error!(parent: &span, error = ?err, "isolated job failed"),
        }
    }
}

impl<L, R> JobDispatcher for IsolatedDispatcher<L, R>
where
    L: ExecutorLoader + Sync,
    R: ActionRegistry + Sync,
{
    fn dispatch(&self, job: Job) -> impl Future<Output = Result<(), SigflowError>> + Send {
        async move {
            self.run(job).await;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_registry::InMemoryActionRegistry;
    use sigflow_domain::action::{ActionDefinition, ActionParameterDefinition, invocable_fn};
    use sigflow_domain::error::BoxError;
    use sigflow_domain::parameters::Parameters;
    use sigflow_domain::value::ParameterValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Runs the action in-line and records what it was asked to do.
    #[derive(Default)]
    struct RecordingLoader {
        loads: AtomicUsize,
        fail_load: bool,
    }

    struct RecordingExecutor;

    impl ExecutorLoader for RecordingLoader {
        type Executor = RecordingExecutor;

        fn load(
            &self,
            _span: tracing::Span,
        ) -> impl Future<Output = Result<Self::Executor, SigflowError>> + Send {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let result = if self.fail_load {
                Err(SigflowError::Transport(BoxError::from("sandbox unavailable")))
            } else {
                Ok(RecordingExecutor)
            };
            async { result }
        }
    }

    impl IsolatedExecutor for RecordingExecutor {
        fn execute(
            self,
            job: Job,
            action: ActionDefinition,
        ) -> impl Future<Output = Result<(), SigflowError>> + Send {
            async move { action.invoke(job.parameters()).await }
        }
    }

    fn registry(calls: Arc<Mutex<Vec<String>>>) -> InMemoryActionRegistry {
        let record = ActionDefinition::new(
            "record",
            vec![ActionParameterDefinition::new("target")],
            Arc::new(invocable_fn(move |args: Vec<ParameterValue>| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.lock().unwrap().push(args[0].to_string());
                    Ok(())
                }
            })),
        );
        let broken = ActionDefinition::new(
            "broken",
            Vec::new(),
            Arc::new(invocable_fn(|_| async { Err::<(), BoxError>("exit status 1".into()) })),
        );
        [record, broken].into_iter().collect()
    }

    #[tokio::test]
    async fn should_execute_job_through_fresh_executor() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = IsolatedDispatcher::new(RecordingLoader::default(), registry(Arc::clone(&calls)));

        dispatcher
            .dispatch(Job::new("record", Parameters::new().with("target", "foo")))
            .await
            .unwrap();
        dispatcher
            .dispatch(Job::new("record", Parameters::new().with("target", "bar")))
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), ["foo", "bar"]);
        assert_eq!(dispatcher.loader.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn should_swallow_action_failure() {
        let dispatcher = IsolatedDispatcher::new(
            RecordingLoader::default(),
            registry(Arc::new(Mutex::new(Vec::new()))),
        );

        let result = dispatcher.dispatch(Job::new("broken", Parameters::new())).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn should_drop_job_for_unknown_action_without_loading() {
        let dispatcher = IsolatedDispatcher::new(
            RecordingLoader::default(),
            registry(Arc::new(Mutex::new(Vec::new()))),
        );

        let result = dispatcher.dispatch(Job::new("missing", Parameters::new())).await;

        assert!(result.is_ok());
        assert_eq!(dispatcher.loader.loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn should_swallow_loader_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let loader = RecordingLoader {
            fail_load: true,
            ..RecordingLoader::default()
        };
        let dispatcher = IsolatedDispatcher::new(loader, registry(Arc::clone(&calls)));

        let result = dispatcher
            .dispatch(Job::new("record", Parameters::new().with("target", "foo")))
            .await;

        assert!(result.is_ok());
        assert!(calls.lock().unwrap().is_empty());
    }
}
