//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`SigflowError`] via `#[from]` (or an explicit `into_domain`).

use crate::id::{ActionId, RuleSource, SignalTypeId};

/// Boxed source error carried by infrastructure variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error for every sigflow operation.
#[derive(Debug, thiserror::Error)]
pub enum SigflowError {
    /// Input rejected by a validation rule. Not retried.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// An operation was invoked outside of its precondition.
    #[error("contract violation")]
    Contract(#[from] ContractError),

    /// The action's invocation target failed.
    #[error("action invocation failed")]
    Invocation(#[source] BoxError),

    /// A transport or executor boundary failed.
    #[error("transport error")]
    Transport(#[source] BoxError),
}

/// Errors raised synchronously by the operation that detects them.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid condition type {0:?}")]
    InvalidConditionType(String),

    #[error("invalid regex pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("action {action} is missing parameter {parameter:?}")]
    MissingActionParameter { action: ActionId, parameter: String },

    #[error("a rule is already registered for {origin}")]
    RuleAlreadyExists { origin: RuleSource },

    #[error("invalid rule definition {rule:?}")]
    InvalidRuleDefinition {
        rule: String,
        #[source]
        reason: RuleDefinitionError,
    },

    #[error("action parameter {0:?} is bound more than once")]
    DuplicateBinding(String),
}

/// Why a rule definition was refused at load time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleDefinitionError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("signal type is missing")]
    MissingSignalType,

    #[error("action id is missing")]
    MissingActionId,

    #[error("action {0} is not registered")]
    UnknownAction(ActionId),

    #[error("signal parameter {0:?} is not declared")]
    UndeclaredParameter(String),
}

/// Errors raised when an operation runs outside its stated precondition.
///
/// These denote programmer errors and are not recovered from.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// `rule` is `None` when raised by a binding outside of any rule;
    /// `missing` names the first referenced parameter the signal lacks.
    #[error("signal of type {sensor_type} is not valid for {}", describe_rule(.rule.as_deref()))]
    InvalidSignalForRule {
        rule: Option<String>,
        sensor_type: SignalTypeId,
        missing: Option<String>,
    },

    #[error("parameter {name:?} not found")]
    ParameterNotFound { name: String },

    #[error("cannot order {value} against {pattern}")]
    NotComparable {
        value: &'static str,
        pattern: &'static str,
    },
}

fn describe_rule(rule: Option<&str>) -> String {
    rule.map_or_else(|| "binding".to_string(), |rule| format!("rule {rule:?}"))
}

impl ContractError {
    /// Attach `rule` to an [`InvalidSignalForRule`](Self::InvalidSignalForRule)
    /// raised below rule level. Other errors pass through.
    #[must_use]
    pub fn within_rule(self, rule: &str) -> Self {
        match self {
            Self::InvalidSignalForRule {
                rule: None,
                sensor_type,
                missing,
            } => Self::InvalidSignalForRule {
                rule: Some(rule.to_string()),
                sensor_type,
                missing,
            },
            other => other,
        }
    }
}
