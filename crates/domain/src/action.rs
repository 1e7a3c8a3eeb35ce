//! Action definitions — what an action expects and how to invoke it.
//!
//! Concrete actions implement [`Invocable`] and are registered under an
//! [`ActionId`]; nothing is resolved by name at invocation time.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BoxError, SigflowError, ValidationError};
use crate::id::ActionId;
use crate::parameters::Parameters;
use crate::value::ParameterValue;

/// The capability to run an action with positional arguments.
#[async_trait]
pub trait Invocable: Send + Sync {
    /// Run the action. Arguments arrive in the order the definition declares.
    async fn invoke(&self, arguments: Vec<ParameterValue>) -> Result<(), BoxError>;
}

/// [`Invocable`] backed by an async closure.
pub struct FnInvocable<F>(F);

/// Wrap an async closure as an [`Invocable`].
pub fn invocable_fn<F, Fut>(f: F) -> FnInvocable<F>
where
    F: Fn(Vec<ParameterValue>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    FnInvocable(f)
}

#[async_trait]
impl<F, Fut> Invocable for FnInvocable<F>
where
    F: Fn(Vec<ParameterValue>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    async fn invoke(&self, arguments: Vec<ParameterValue>) -> Result<(), BoxError> {
        (self.0)(arguments).await
    }
}

/// A parameter an action expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionParameterDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ActionParameterDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Metadata describing an invocable action.
#[derive(Clone)]
pub struct ActionDefinition {
    id: ActionId,
    parameters: Vec<ActionParameterDefinition>,
    target: Arc<dyn Invocable>,
}

impl ActionDefinition {
    #[must_use]
    pub fn new(
        id: impl Into<ActionId>,
        parameters: Vec<ActionParameterDefinition>,
        target: Arc<dyn Invocable>,
    ) -> Self {
        Self {
            id: id.into(),
            parameters,
            target,
        }
    }

    #[must_use]
    pub fn id(&self) -> &ActionId {
        &self.id
    }

    #[must_use]
    pub fn parameters(&self) -> &[ActionParameterDefinition] {
        &self.parameters
    }

    /// Order `values` by the declared parameter list (case-insensitive names).
    ///
    /// Values the action does not declare are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingActionParameter`] for the first
    /// declared parameter without a supplied value.
    pub fn arguments_for(&self, values: &Parameters) -> Result<Vec<ParameterValue>, ValidationError> {
        self.parameters
            .iter()
            .map(|param| {
                values.get(&param.name).cloned().ok_or_else(|| {
                    ValidationError::MissingActionParameter {
                        action: self.id.clone(),
                        parameter: param.name.clone(),
                    }
                })
            })
            .collect()
    }

    /// Map `values` onto the declared parameters and run the target.
    ///
    /// # Errors
    ///
    /// Returns [`SigflowError::Validation`] when a declared parameter is
    /// missing, or [`SigflowError::Invocation`] when the target fails.
    pub async fn invoke(&self, values: &Parameters) -> Result<(), SigflowError> {
        let arguments = self.arguments_for(values)?;
        self.target
            .invoke(arguments)
            .await
            .map_err(SigflowError::Invocation)
    }
}

impl fmt::Debug for ActionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDefinition")
            .field("id", &self.id)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}
