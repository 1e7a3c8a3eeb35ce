//! Signal — an immutable record of something that happened outside.
//!
//! Signals are produced by ingestion collaborators (webhooks, sensors, …)
//! and consumed read-only by rule evaluation.

use serde::{Deserialize, Serialize};

use crate::error::ContractError;
use crate::id::{SignalId, SignalTypeId};
use crate::parameters::Parameters;
use crate::time::{Timestamp, now};
use crate::value::ParameterValue;

/// A typed event carrying a case-insensitive parameter bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    id: SignalId,
    #[serde(rename = "type")]
    sensor_type: SignalTypeId,
    #[serde(default)]
    parameters: Parameters,
    #[serde(default = "now")]
    received_at: Timestamp,
}

impl Signal {
    /// Create a signal stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(sensor_type: impl Into<SignalTypeId>, parameters: Parameters) -> Self {
        Self {
            id: SignalId::new(),
            sensor_type: sensor_type.into(),
            parameters,
            received_at: now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SignalId {
        self.id
    }

    #[must_use]
    pub fn sensor_type(&self) -> &SignalTypeId {
        &self.sensor_type
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[must_use]
    pub fn received_at(&self) -> Timestamp {
        self.received_at
    }

    /// Whether the signal carries `name` (case-insensitive).
    #[must_use]
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains(name)
    }

    /// Look up a parameter value (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::ParameterNotFound`] when the signal does not
    /// carry `name`.
    pub fn parameter(&self, name: &str) -> Result<&ParameterValue, ContractError> {
        self.parameters
            .get(name)
            .ok_or_else(|| ContractError::ParameterNotFound {
                name: name.to_string(),
            })
    }
}

/// Wire shape accepted from ingestion collaborators, without server-side stamps.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundSignal {
    #[serde(rename = "type")]
    pub sensor_type: SignalTypeId,
    #[serde(default)]
    pub parameters: Parameters,
}

impl From<InboundSignal> for Signal {
    fn from(inbound: InboundSignal) -> Self {
        Self::new(inbound.sensor_type, inbound.parameters)
    }
}
