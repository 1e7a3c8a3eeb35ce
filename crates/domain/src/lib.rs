//! # sigflow-domain
//!
//! Pure domain model for the sigflow signal-to-action automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Signals** (typed events carrying a named parameter bag)
//! - Define **Conditions** (the fixed set of comparison operators applied to a signal parameter)
//! - Define **Bindings** (action parameters resolved from literals or `{{signal.NAME}}` templates)
//! - Define **Rules** (signal type + conditions + bindings → job) and their source definitions
//! - Define **Jobs** (resolved, ready-to-run action invocations)
//! - Define **Action definitions** (declared parameters + the [`Invocable`](action::Invocable) target)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod binding;
pub mod condition;
pub mod job;
pub mod parameters;
pub mod rule;
pub mod signal;
pub mod value;
