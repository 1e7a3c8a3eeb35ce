//! # sigflow-adapter-process
//!
//! Process adapter — executes actions outside of the core.
//!
//! ## Provided pieces
//!
//! | Type | Port | Behaviour |
//! |------|------|-----------|
//! | [`CommandAction`] | `Invocable` | Runs a program with the job's parameter values as trailing arguments |
//! | [`TaskExecutorLoader`] | `ExecutorLoader` | Hands each job to a fresh tokio task, relaying its logs into the caller's span |
//!
//! ## Dependency rule
//!
//! Depends on `sigflow-app` (port traits) and `sigflow-domain` only.

mod command;
mod error;
mod executor;

pub use command::CommandAction;
pub use error::ProcessError;
pub use executor::{TaskExecutor, TaskExecutorLoader};
