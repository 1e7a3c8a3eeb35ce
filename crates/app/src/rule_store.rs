//! Rule store — the live set of rules, indexed for signal-time lookup.
//!
//! Two indices are kept behind one lock: source → rule (for update and
//! removal by the rule-source collaborator) and signal type → rules (for
//! lookup when a signal arrives). Every operation is O(bucket) under the lock
//! and never performs IO.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sigflow_domain::error::ValidationError;
use sigflow_domain::id::{RuleSource, SignalTypeId};
use sigflow_domain::rule::Rule;

#[derive(Default)]
struct Indices {
    by_source: HashMap<RuleSource, Arc<Rule>>,
    by_signal_type: HashMap<SignalTypeId, Vec<(RuleSource, Arc<Rule>)>>,
}

impl Indices {
    fn insert(&mut self, source: RuleSource, rule: Arc<Rule>) {
        self.by_signal_type
            .entry(rule.sensor_type().clone())
            .or_default()
            .push((source.clone(), Arc::clone(&rule)));
        self.by_source.insert(source, rule);
    }

    fn remove(&mut self, source: &RuleSource) -> Option<Arc<Rule>> {
        let rule = self.by_source.remove(source)?;
        let sensor_type = rule.sensor_type();
        if let Some(bucket) = self.by_signal_type.get_mut(sensor_type) {
            bucket.retain(|(s, _)| s != source);
            if bucket.is_empty() {
                self.by_signal_type.remove(sensor_type);
            }
        }
        Some(rule)
    }
}

/// Indexed, internally synchronised collection of [`Rule`]s.
#[derive(Default)]
pub struct RuleStore {
    indices: Mutex<Indices>,
}

impl RuleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Each operation leaves both indices consistent before releasing the
    // lock, so a poisoned guard still holds valid data.
    fn lock(&self) -> MutexGuard<'_, Indices> {
        self.indices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `rule` under `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RuleAlreadyExists`] when `source` is
    /// already mapped.
    pub fn add(&self, source: RuleSource, rule: Rule) -> Result<(), ValidationError> {
        let mut indices = self.lock();
        if indices.by_source.contains_key(&source) {
            return Err(ValidationError::RuleAlreadyExists { origin: source });
        }
        tracing::debug!(%source, rule = rule.name(), sensor_type = %rule.sensor_type(), "rule added");
        indices.insert(source, Arc::new(rule));
        Ok(())
    }

    /// Remove the rule registered under `source`. No-op when `source` is
    /// empty or unknown.
    pub fn remove(&self, source: &RuleSource) -> Option<Arc<Rule>> {
        if source.is_empty() {
            return None;
        }
        let removed = self.lock().remove(source);
        if let Some(rule) = &removed {
            tracing::debug!(%source, rule = rule.name(), "rule removed");
        }
        removed
    }

    /// Replace the rule registered under `source`, moving it to another
    /// signal-type bucket if its type changed. An unknown `source` is added.
    ///
    /// Returns the replaced rule, if any.
    pub fn update(&self, source: RuleSource, rule: Rule) -> Option<Arc<Rule>> {
        let mut indices = self.lock();
        let previous = indices.remove(&source);
        tracing::debug!(
            %source,
            rule = rule.name(),
            sensor_type = %rule.sensor_type(),
            replaced = previous.is_some(),
            "rule updated"
        );
        indices.insert(source, Arc::new(rule));
        previous
    }

    /// Snapshot of the rules listening to `sensor_type`, in registration order.
    ///
    /// The returned list is a copy: later mutations of the store are not
    /// observed by the caller.
    #[must_use]
    pub fn rules_for_signal(&self, sensor_type: &SignalTypeId) -> Vec<Arc<Rule>> {
        self.lock()
            .by_signal_type
            .get(sensor_type)
            .map(|bucket| bucket.iter().map(|(_, rule)| Arc::clone(rule)).collect())
            .unwrap_or_default()
    }

    /// The rule registered under `source`, if any.
    #[must_use]
    pub fn get(&self, source: &RuleSource) -> Option<Arc<Rule>> {
        self.lock().by_source.get(source).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().by_source.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().by_source.is_empty()
    }

    /// Number of distinct signal types with at least one rule.
    #[must_use]
    pub fn signal_type_count(&self) -> usize {
        self.lock().by_signal_type.len()
    }
}
