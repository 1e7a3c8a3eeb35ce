//! Rule — decides whether a signal applies and, if so, builds the job.
//!
//! A rule is gated on the signal type, then on per-parameter
//! [`Condition`]s, then on every action-parameter [`ActionParameterValue`]
//! being resolvable from the signal. Signal parameters without a registered
//! condition are unconstrained.

mod definition;

pub use definition::{ActionInvocationDefinition, RuleDefinition, SignalDeclaration};

use std::collections::HashMap;

use crate::binding::ActionParameterValue;
use crate::condition::Condition;
use crate::error::{ContractError, RuleDefinitionError, ValidationError};
use crate::id::{ActionId, SignalTypeId};
use crate::job::Job;
use crate::parameters::{Parameters, fold};
use crate::signal::Signal;

/// One action parameter bound to a literal or signal-derived value.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub parameter: String,
    pub value: ActionParameterValue,
}

/// A compiled signal matcher. Immutable once built.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    description: String,
    sensor_type: SignalTypeId,
    action_id: ActionId,
    conditions: HashMap<String, Vec<Condition>>,
    bindings: Vec<Binding>,
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn sensor_type(&self) -> &SignalTypeId {
        &self.sensor_type
    }

    #[must_use]
    pub fn action_id(&self) -> &ActionId {
        &self.action_id
    }

    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Conditions registered for `parameter` (case-insensitive).
    #[must_use]
    pub fn conditions_for(&self, parameter: &str) -> &[Condition] {
        self.conditions
            .get(&fold(parameter))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Decide whether `signal` triggers this rule.
    ///
    /// # Errors
    ///
    /// Propagates [`ContractError::NotComparable`] when an ordering condition
    /// meets a value it cannot compare.
    pub fn should_process(&self, signal: &Signal) -> Result<bool, ContractError> {
        if signal.sensor_type() != &self.sensor_type {
            return Ok(false);
        }
        for (name, value) in signal.parameters().iter() {
            for condition in self.conditions_for(name) {
                if !condition.evaluate(value)? {
                    return Ok(false);
                }
            }
        }
        Ok(self
            .bindings
            .iter()
            .all(|binding| binding.value.is_valid_for(signal)))
    }

    /// Build the job for `signal`, keyed by the bindings' action-parameter names.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidSignalForRule`] when
    /// [`should_process`](Self::should_process) is `false`, or any error it raises.
    pub fn to_job(&self, signal: &Signal) -> Result<Job, ContractError> {
        if !self.should_process(signal)? {
            let missing = self
                .bindings
                .iter()
                .flat_map(|binding| binding.value.references())
                .find(|name| !signal.has_parameter(name))
                .cloned();
            return Err(ContractError::InvalidSignalForRule {
                rule: Some(self.name.clone()),
                sensor_type: signal.sensor_type().clone(),
                missing,
            });
        }
        let mut parameters = Parameters::new();
        for binding in &self.bindings {
            let value = binding
                .value
                .value_for(signal)
                .map_err(|err| err.within_rule(&self.name))?;
            parameters.insert(binding.parameter.clone(), value);
        }
        Ok(Job::new(self.action_id.clone(), parameters))
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug, Default)]
pub struct RuleBuilder {
    name: Option<String>,
    description: Option<String>,
    sensor_type: Option<SignalTypeId>,
    action_id: Option<ActionId>,
    conditions: HashMap<String, Vec<Condition>>,
    bindings: Vec<Binding>,
}

impl RuleBuilder {
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn sensor_type(mut self, sensor_type: impl Into<SignalTypeId>) -> Self {
        self.sensor_type = Some(sensor_type.into());
        self
    }

    #[must_use]
    pub fn action(mut self, action_id: impl Into<ActionId>) -> Self {
        self.action_id = Some(action_id.into());
        self
    }

    /// Register a condition on a signal parameter. Several conditions on the
    /// same parameter must all accept.
    #[must_use]
    pub fn condition(mut self, parameter: &str, condition: Condition) -> Self {
        self.conditions
            .entry(fold(parameter))
            .or_default()
            .push(condition);
        self
    }

    #[must_use]
    pub fn bind(mut self, parameter: impl Into<String>, value: ActionParameterValue) -> Self {
        self.bindings.push(Binding {
            parameter: parameter.into(),
            value,
        });
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRuleDefinition`] when the name,
    /// signal type or action id is missing, and
    /// [`ValidationError::DuplicateBinding`] when an action parameter is
    /// bound twice (case-insensitive).
    pub fn build(self) -> Result<Rule, ValidationError> {
        let name = self.name.unwrap_or_default();
        let invalid = |reason| ValidationError::InvalidRuleDefinition {
            rule: name.clone(),
            reason,
        };
        if name.trim().is_empty() {
            return Err(invalid(RuleDefinitionError::EmptyName));
        }
        let sensor_type = self
            .sensor_type
            .filter(|id| !id.is_empty())
            .ok_or_else(|| invalid(RuleDefinitionError::MissingSignalType))?;
        let action_id = self
            .action_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| invalid(RuleDefinitionError::MissingActionId))?;

        let mut seen = std::collections::HashSet::new();
        for binding in &self.bindings {
            if !seen.insert(fold(&binding.parameter)) {
                return Err(ValidationError::DuplicateBinding(binding.parameter.clone()));
            }
        }

        Ok(Rule {
            name,
            description: self.description.unwrap_or_default(),
            sensor_type,
            action_id,
            conditions: self.conditions,
            bindings: self.bindings,
        })
    }
}
