//! # sigflow-app
//!
//! Application layer — the signal-to-job pipeline and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `ActionRegistry` — resolve an action id to its definition
//!   - `JobDispatcher` — hand a job off for execution
//!   - `SignalPublisher` — deliver a newly available signal
//!   - `ExecutorLoader` / `IsolatedExecutor` — disposable execution contexts
//! - Define **driving/inbound ports** as use-case structs:
//!   - `RuleService` — load, reload and unload rule definitions
//!   - `SignalProcessor` — match signals against rules and dispatch jobs
//!   - `JobProcessor` — drain the job queue, one worker at a time
//! - Provide **in-process infrastructure** that doesn't need IO: rule store,
//!   job queue, signal bus, action registry
//!
//! ## Dependency rule
//! Depends on `sigflow-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod action_registry;
pub mod isolation;
pub mod job_processor;
pub mod job_queue;
pub mod ports;
pub mod rule_store;
pub mod services;
pub mod signal_bus;
pub mod signal_processor;
