//! Job — a resolved, ready-to-run action invocation.

use serde::{Deserialize, Serialize};

use crate::id::{ActionId, JobId};
use crate::parameters::Parameters;
use crate::time::{Timestamp, now};

/// An action id plus concrete parameter values. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    action_id: ActionId,
    parameters: Parameters,
    created_at: Timestamp,
}

impl Job {
    #[must_use]
    pub fn new(action_id: impl Into<ActionId>, parameters: Parameters) -> Self {
        Self {
            id: JobId::new(),
            action_id: action_id.into(),
            parameters,
            created_at: now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> JobId {
        self.id
    }

    #[must_use]
    pub fn action_id(&self) -> &ActionId {
        &self.action_id
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}
