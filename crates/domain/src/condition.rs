//! Condition — a predicate over one signal parameter value.
//!
//! The set of comparison operators is fixed. A [`ConditionDefinition`] is the
//! authored form; [`Condition::compile`] turns it into an evaluable predicate
//! (regexes are compiled once, at load time).
//!
//! Operand handling is deliberately asymmetric:
//! - `lessthan` / `greaterthan` on values without an ordering relation is a
//!   contract violation ([`ContractError::NotComparable`]).
//! - `matchregex`, `notmatchregex`, `startswith` and `endswith` on a non-string
//!   value (or with a non-string pattern) evaluate to `false`.

use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{ContractError, ValidationError};
use crate::value::ParameterValue;

/// The comparison operators a condition can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonType {
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    MatchRegex,
    NotMatchRegex,
    StartsWith,
    EndsWith,
}

impl ComparisonType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "notequals",
            Self::LessThan => "lessthan",
            Self::GreaterThan => "greaterthan",
            Self::MatchRegex => "matchregex",
            Self::NotMatchRegex => "notmatchregex",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
        }
    }
}

impl fmt::Display for ComparisonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses operator names ignoring ASCII case.
impl FromStr for ComparisonType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "equals" => Ok(Self::Equals),
            "notequals" => Ok(Self::NotEquals),
            "lessthan" => Ok(Self::LessThan),
            "greaterthan" => Ok(Self::GreaterThan),
            "matchregex" => Ok(Self::MatchRegex),
            "notmatchregex" => Ok(Self::NotMatchRegex),
            "startswith" => Ok(Self::StartsWith),
            "endswith" => Ok(Self::EndsWith),
            _ => Err(ValidationError::InvalidConditionType(s.to_string())),
        }
    }
}

/// Authored form of a condition, as supplied by a rule source.
///
/// `comparison_type` stays a free-form string so that unknown operators are
/// reported as [`ValidationError::InvalidConditionType`] at compile time
/// rather than as a deserialisation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    #[serde(rename = "parameter")]
    pub parameter_name: String,
    #[serde(rename = "type")]
    pub comparison_type: String,
    pub pattern: ParameterValue,
}

/// A compiled predicate over a single parameter value.
#[derive(Debug, Clone)]
pub struct Condition {
    comparison: ComparisonType,
    pattern: ParameterValue,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Value,
    Regex(Option<Regex>),
    Affix(Option<String>),
}

impl Condition {
    /// Compile a predicate for `comparison` against `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPattern`] when a regex operator is
    /// given a string pattern that is not a valid regular expression.
    pub fn compile(
        comparison: ComparisonType,
        pattern: ParameterValue,
    ) -> Result<Self, ValidationError> {
        let matcher = match comparison {
            ComparisonType::Equals
            | ComparisonType::NotEquals
            | ComparisonType::LessThan
            | ComparisonType::GreaterThan => Matcher::Value,
            ComparisonType::MatchRegex | ComparisonType::NotMatchRegex => {
                let regex = match pattern.as_str() {
                    Some(source) => Some(
                        RegexBuilder::new(source)
                            .case_insensitive(true)
                            .build()
                            .map_err(|source_err| ValidationError::InvalidPattern {
                                pattern: source.to_string(),
                                source: source_err,
                            })?,
                    ),
                    None => None,
                };
                Matcher::Regex(regex)
            }
            ComparisonType::StartsWith | ComparisonType::EndsWith => {
                Matcher::Affix(pattern.as_str().map(str::to_lowercase))
            }
        };
        Ok(Self {
            comparison,
            pattern,
            matcher,
        })
    }

    /// Compile from an authored definition.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidConditionType`] for an unknown
    /// operator name, or [`ValidationError::InvalidPattern`] for a bad regex.
    pub fn from_definition(definition: &ConditionDefinition) -> Result<Self, ValidationError> {
        let comparison = definition.comparison_type.parse()?;
        Self::compile(comparison, definition.pattern.clone())
    }

    #[must_use]
    pub fn comparison(&self) -> ComparisonType {
        self.comparison
    }

    #[must_use]
    pub fn pattern(&self) -> &ParameterValue {
        &self.pattern
    }

    /// Apply the predicate to a signal parameter value.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::NotComparable`] when `lessthan`/`greaterthan`
    /// is applied to a value that cannot be ordered against the pattern.
    pub fn evaluate(&self, value: &ParameterValue) -> Result<bool, ContractError> {
        let accepted = match (self.comparison, &self.matcher) {
            (ComparisonType::Equals, _) => *value == self.pattern,
            (ComparisonType::NotEquals, _) => *value != self.pattern,
            (ComparisonType::LessThan, _) => value.compare(&self.pattern)?.is_lt(),
            (ComparisonType::GreaterThan, _) => value.compare(&self.pattern)?.is_gt(),
            (ComparisonType::MatchRegex, Matcher::Regex(Some(regex))) => {
                value.as_str().is_some_and(|s| regex.is_match(s))
            }
            (ComparisonType::NotMatchRegex, Matcher::Regex(Some(regex))) => {
                value.as_str().is_some_and(|s| !regex.is_match(s))
            }
            (ComparisonType::StartsWith, Matcher::Affix(Some(prefix))) => value
                .as_str()
                .is_some_and(|s| s.to_lowercase().starts_with(prefix.as_str())),
            (ComparisonType::EndsWith, Matcher::Affix(Some(suffix))) => value
                .as_str()
                .is_some_and(|s| s.to_lowercase().ends_with(suffix.as_str())),
            _ => false,
        };
        Ok(accepted)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.comparison, self.pattern)
    }
}
