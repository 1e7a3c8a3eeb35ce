//! Job dispatcher port — where accepted jobs are handed off.

use std::future::Future;
use std::sync::Arc;

use sigflow_domain::error::SigflowError;
use sigflow_domain::job::Job;

/// Receives jobs produced by the signal processor.
///
/// The server topology enqueues into a [`JobQueue`](crate::job_queue::JobQueue);
/// the agent topology executes through an
/// [`IsolatedDispatcher`](crate::isolation::IsolatedDispatcher).
pub trait JobDispatcher {
    /// Hand `job` off for execution.
    fn dispatch(&self, job: Job) -> impl Future<Output = Result<(), SigflowError>> + Send;
}

impl<T: JobDispatcher + Send + Sync> JobDispatcher for Arc<T> {
    fn dispatch(&self, job: Job) -> impl Future<Output = Result<(), SigflowError>> + Send {
        (**self).dispatch(job)
    }
}
