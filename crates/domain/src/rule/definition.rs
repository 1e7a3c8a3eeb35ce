//! Rule definitions — the authored form handed over by a rule source.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::binding::ActionParameterValue;
use crate::condition::{Condition, ConditionDefinition};
use crate::error::{RuleDefinitionError, ValidationError};
use crate::id::{ActionId, SignalTypeId};
use crate::parameters::fold;
use crate::value::ParameterValue;

use super::Rule;

fn enabled_by_default() -> bool {
    true
}

/// A rule as authored, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub signal: SignalDeclaration,
    #[serde(default)]
    pub conditions: Vec<ConditionDefinition>,
    #[serde(default)]
    pub action: ActionInvocationDefinition,
}

/// The signal a rule listens to and the parameters it may reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalDeclaration {
    #[serde(default)]
    pub id: SignalTypeId,
    #[serde(default)]
    pub parameters: Vec<String>,
}

/// The action a rule invokes and its authored parameter values.
///
/// String values containing `{{signal.NAME}}` placeholders become templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionInvocationDefinition {
    #[serde(default)]
    pub id: ActionId,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
}

impl RuleDefinition {
    /// Validate the definition and compile it into a [`Rule`].
    ///
    /// Returns `Ok(None)` for a disabled definition: it is discarded, not
    /// created. `is_known_action` answers whether an action id is registered.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRuleDefinition`] when the name,
    /// signal id or action id is missing, the action is unknown, or a
    /// condition or template references an undeclared signal parameter.
    /// Returns [`ValidationError::InvalidConditionType`] or
    /// [`ValidationError::InvalidPattern`] for a bad condition.
    pub fn compile(
        &self,
        is_known_action: impl Fn(&ActionId) -> bool,
    ) -> Result<Option<Rule>, ValidationError> {
        if !self.enabled {
            return Ok(None);
        }
        let invalid = |reason| ValidationError::InvalidRuleDefinition {
            rule: self.name.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid(RuleDefinitionError::EmptyName));
        }
        if self.signal.id.is_empty() {
            return Err(invalid(RuleDefinitionError::MissingSignalType));
        }
        if self.action.id.is_empty() {
            return Err(invalid(RuleDefinitionError::MissingActionId));
        }
        if !is_known_action(&self.action.id) {
            return Err(invalid(RuleDefinitionError::UnknownAction(
                self.action.id.clone(),
            )));
        }

        let mut builder = Rule::builder()
            .name(self.name.clone())
            .description(self.description.clone())
            .sensor_type(self.signal.id.clone())
            .action(self.action.id.clone());

        for definition in &self.conditions {
            self.ensure_declared(&definition.parameter_name)?;
            let condition = Condition::from_definition(definition)?;
            builder = builder.condition(&definition.parameter_name, condition);
        }

        for (parameter, value) in &self.action.parameters {
            let binding = ActionParameterValue::from_authored(value.clone());
            for reference in binding.references() {
                self.ensure_declared(reference)?;
            }
            builder = builder.bind(parameter.clone(), binding);
        }

        builder.build().map(Some)
    }

    fn ensure_declared(&self, parameter: &str) -> Result<(), ValidationError> {
        let declared = self
            .signal
            .parameters
            .iter()
            .any(|name| fold(name) == fold(parameter));
        if declared {
            Ok(())
        } else {
            Err(ValidationError::InvalidRuleDefinition {
                rule: self.name.clone(),
                reason: RuleDefinitionError::UndeclaredParameter(parameter.to_string()),
            })
        }
    }
}
