//! Action registry port — resolves an action id to its definition.

use std::future::Future;
use std::sync::Arc;

use sigflow_domain::action::ActionDefinition;
use sigflow_domain::error::SigflowError;
use sigflow_domain::id::ActionId;

/// Lookup-by-id contract for [`ActionDefinition`]s.
///
/// Implementations may scan packages, query a remote catalogue or hold a
/// static table; the core only asks for a definition or "not found".
pub trait ActionRegistry {
    /// Find the definition registered under `id`.
    fn find(
        &self,
        id: &ActionId,
    ) -> impl Future<Output = Result<Option<ActionDefinition>, SigflowError>> + Send;
}

impl<T: ActionRegistry + Send + Sync> ActionRegistry for Arc<T> {
    fn find(
        &self,
        id: &ActionId,
    ) -> impl Future<Output = Result<Option<ActionDefinition>, SigflowError>> + Send {
        (**self).find(id)
    }
}
