//! Task-backed isolated execution.
//!
//! Each job gets its own tokio task. A panic inside the action unwinds only
//! that task and comes back as [`ProcessError::Aborted`]. Everything the
//! action logs is recorded under the span handed to [`ExecutorLoader::load`].

use std::future::Future;

use tracing::Instrument;

use sigflow_app::ports::{ExecutorLoader, IsolatedExecutor};
use sigflow_domain::action::ActionDefinition;
use sigflow_domain::error::SigflowError;
use sigflow_domain::job::Job;

use crate::error::ProcessError;

/// Loads a [`TaskExecutor`] per job.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskExecutorLoader;

impl ExecutorLoader for TaskExecutorLoader {
    type Executor = TaskExecutor;

    fn load(
        &self,
        span: tracing::Span,
    ) -> impl Future<Output = Result<Self::Executor, SigflowError>> + Send {
        async move { Ok(TaskExecutor { span }) }
    }
}

/// Single-use executor running one job on a dedicated task.
#[derive(Debug)]
pub struct TaskExecutor {
    span: tracing::Span,
}

impl IsolatedExecutor for TaskExecutor {
    fn execute(
        self,
        job: Job,
        action: ActionDefinition,
    ) -> impl Future<Output = Result<(), SigflowError>> + Send {
        async move {
            let task = tokio::spawn(
                async move {
                    tracing::debug!("isolated execution started");
                    action.invoke(job.parameters()).await
                }
                .instrument(self.span),
            );
            match task.await {
                Ok(result) => result,
                Err(join_err) => Err(ProcessError::Aborted(join_err).into_domain()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use sigflow_domain::action::{ActionParameterDefinition, invocable_fn};
    use sigflow_domain::error::BoxError;
    use sigflow_domain::parameters::Parameters;
    use sigflow_domain::value::ParameterValue;

    async fn explode(_: Vec<ParameterValue>) -> Result<(), BoxError> {
        panic!("action blew up")
    }

    async fn execute(action: ActionDefinition, job: Job) -> Result<(), SigflowError> {
        let executor = TaskExecutorLoader
            .load(tracing::info_span!("test"))
            .await
            .unwrap();
        executor.execute(job, action).await
    }

    #[tokio::test]
    async fn should_run_action_with_job_parameters() {
        let (tx, rx) = std::sync::mpsc::channel();
        let action = ActionDefinition::new(
            "record",
            vec![ActionParameterDefinition::new("target")],
            Arc::new(invocable_fn(move |args: Vec<ParameterValue>| {
                let tx = tx.clone();
                async move {
                    tx.send(args[0].to_string())?;
                    Ok::<(), BoxError>(())
                }
            })),
        );

        execute(action, Job::new("record", Parameters::new().with("target", "foo")))
            .await
            .unwrap();

        assert_eq!(rx.recv().unwrap(), "foo");
    }

    #[tokio::test]
    async fn should_return_invocation_error_from_action() {
        let action = ActionDefinition::new(
            "broken",
            Vec::new(),
            Arc::new(invocable_fn(|_| async { Err::<(), BoxError>("exit status 1".into()) })),
        );

        let result = execute(action, Job::new("broken", Parameters::new())).await;

        assert!(matches!(result, Err(SigflowError::Invocation(_))));
    }

    #[tokio::test]
    async fn should_contain_panic_as_transport_error() {
        let action = ActionDefinition::new("panics", Vec::new(), Arc::new(invocable_fn(explode)));

        let result = execute(action, Job::new("panics", Parameters::new())).await;

        assert!(matches!(result, Err(SigflowError::Transport(_))));
    }

    #[tokio::test]
    async fn should_report_missing_parameter_as_validation_error() {
        let action = ActionDefinition::new(
            "record",
            vec![ActionParameterDefinition::new("target")],
            Arc::new(invocable_fn(|_| async { Ok(()) })),
        );

        let result = execute(action, Job::new("record", Parameters::new())).await;

        assert!(matches!(result, Err(SigflowError::Validation(_))));
    }
}
