//! In-process signal bus backed by a bounded tokio mpsc channel.

use std::future::Future;

use tokio::sync::mpsc;

use sigflow_domain::error::SigflowError;
use sigflow_domain::signal::Signal;

use crate::ports::SignalPublisher;

/// In-process signal bus using a bounded tokio [`mpsc`] channel.
///
/// Every signal is delivered to exactly one consumer, the receiver returned
/// by [`InProcessSignalBus::new`]. Publishing waits while the channel is full
/// and fails once the receiver has been dropped.
#[derive(Clone)]
pub struct InProcessSignalBus {
    sender: mpsc::Sender<Signal>,
}

#[derive(Debug, thiserror::Error)]
#[error("signal bus is closed")]
struct BusClosed;

impl InProcessSignalBus {
    /// Create a bus holding at most `capacity` undelivered signals.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Signal>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Whether the consuming side has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl SignalPublisher for InProcessSignalBus {
    fn publish(&self, signal: Signal) -> impl Future<Output = Result<(), SigflowError>> + Send {
        let sender = self.sender.clone();
        async move {
            sender
                .send(signal)
                .await
                .map_err(|_| SigflowError::Transport(Box::new(BusClosed)))
        }
    }
}
