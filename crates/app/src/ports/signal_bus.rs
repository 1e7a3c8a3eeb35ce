//! Signal bus port — delivery of newly available signals.

use std::future::Future;

use sigflow_domain::error::SigflowError;
use sigflow_domain::signal::Signal;

/// Publishes signals towards the signal processor.
pub trait SignalPublisher {
    /// Publish a signal. Waits while the bus is at capacity.
    fn publish(&self, signal: Signal) -> impl Future<Output = Result<(), SigflowError>> + Send;
}

impl<T: SignalPublisher + Send + Sync> SignalPublisher for std::sync::Arc<T> {
    fn publish(&self, signal: Signal) -> impl Future<Output = Result<(), SigflowError>> + Send {
        (**self).publish(signal)
    }
}
