//! In-process action registry backed by a hash map.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};

use sigflow_domain::action::ActionDefinition;
use sigflow_domain::error::SigflowError;
use sigflow_domain::id::ActionId;

use crate::ports::ActionRegistry;

/// [`ActionRegistry`] holding definitions registered at startup.
#[derive(Default)]
pub struct InMemoryActionRegistry {
    actions: RwLock<HashMap<ActionId, ActionDefinition>>,
}

impl InMemoryActionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition`, returning the one it replaces.
    pub fn register(&self, definition: ActionDefinition) -> Option<ActionDefinition> {
        tracing::debug!(action_id = %definition.id(), "action registered");
        self.actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(definition.id().clone(), definition)
    }

    /// Remove the definition registered under `id`.
    pub fn unregister(&self, id: &ActionId) -> Option<ActionDefinition> {
        self.actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ActionId) -> bool {
        self.actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<ActionId> {
        let mut ids: Vec<_> = self
            .actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl FromIterator<ActionDefinition> for InMemoryActionRegistry {
    fn from_iter<I: IntoIterator<Item = ActionDefinition>>(iter: I) -> Self {
        let registry = Self::new();
        for definition in iter {
            registry.register(definition);
        }
        registry
    }
}

impl ActionRegistry for InMemoryActionRegistry {
    fn find(
        &self,
        id: &ActionId,
    ) -> impl Future<Output = Result<Option<ActionDefinition>, SigflowError>> + Send {
        let found = self
            .actions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned();
        async { Ok(found) }
    }
}
