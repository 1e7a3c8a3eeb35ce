//! Isolation port — running an action inside a disposable execution context.
//!
//! The core never depends on the isolation mechanism (task, subprocess,
//! sandbox). It asks a loader for a fresh executor, hands it one job, and
//! discards it.

use std::future::Future;

use sigflow_domain::action::ActionDefinition;
use sigflow_domain::error::SigflowError;
use sigflow_domain::job::Job;

/// Creates disposable executors.
pub trait ExecutorLoader {
    type Executor: IsolatedExecutor + Send;

    /// Load a fresh execution context.
    ///
    /// Log output produced inside the context must be relayed into `span`.
    fn load(
        &self,
        span: tracing::Span,
    ) -> impl Future<Output = Result<Self::Executor, SigflowError>> + Send;
}

/// A single-use execution context.
pub trait IsolatedExecutor {
    /// Run `job` against `action` and tear the context down.
    ///
    /// Failures inside the context, including panics, must come back as an
    /// `Err`, never unwind into the caller.
    fn execute(
        self,
        job: Job,
        action: ActionDefinition,
    ) -> impl Future<Output = Result<(), SigflowError>> + Send;
}
