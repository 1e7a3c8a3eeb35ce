//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod action_registry;
pub mod isolation;
pub mod job_dispatcher;
pub mod signal_bus;

pub use action_registry::ActionRegistry;
pub use isolation::{ExecutorLoader, IsolatedExecutor};
pub use job_dispatcher::JobDispatcher;
pub use signal_bus::SignalPublisher;
