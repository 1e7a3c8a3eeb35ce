//! Binding — how one action parameter gets its value from a signal.
//!
//! A binding is either a literal, or a template string containing zero or
//! more `{{signal.NAME}}` placeholders (matched case-insensitively).
//!
//! Substitution is a single left-to-right pass over the template: every
//! placeholder occurrence is replaced by the stringified signal value, and
//! substituted text is never rescanned. A name referenced several times is
//! therefore replaced at every occurrence, whatever its surrounding text.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::ContractError;
use crate::signal::Signal;
use crate::value::ParameterValue;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{\{signal\.(\w+)\}\}").expect("placeholder pattern is a valid regex")
});

/// The value bound to one action parameter.
///
/// Deserialisation rescans a template's `format`; any `references` in the
/// input are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", from = "StoredBinding")]
pub enum ActionParameterValue {
    /// A value used as-is.
    Literal { value: ParameterValue },
    /// A format string plus the signal parameter names it references,
    /// in discovery order (duplicates preserved).
    Template {
        format: String,
        references: Vec<String>,
    },
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StoredBinding {
    Literal { value: ParameterValue },
    Template { format: String },
}

impl From<StoredBinding> for ActionParameterValue {
    fn from(stored: StoredBinding) -> Self {
        match stored {
            StoredBinding::Literal { value } => Self::Literal { value },
            StoredBinding::Template { format } => Self::template(format),
        }
    }
}

impl ActionParameterValue {
    #[must_use]
    pub fn literal(value: impl Into<ParameterValue>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    /// Scan `format` for `{{signal.NAME}}` placeholders.
    #[must_use]
    pub fn template(format: impl Into<String>) -> Self {
        let format = format.into();
        let references = PLACEHOLDER
            .captures_iter(&format)
            .map(|caps| caps[1].to_string())
            .collect();
        Self::Template { format, references }
    }

    /// Interpret an authored value: strings containing placeholders become
    /// templates, anything else is a literal.
    #[must_use]
    pub fn from_authored(value: ParameterValue) -> Self {
        match value {
            ParameterValue::String(s) if PLACEHOLDER.is_match(&s) => Self::template(s),
            other => Self::literal(other),
        }
    }

    /// Signal parameter names this binding needs, in discovery order.
    #[must_use]
    pub fn references(&self) -> &[String] {
        match self {
            Self::Literal { .. } => &[],
            Self::Template { references, .. } => references,
        }
    }

    /// Whether `signal` carries every referenced parameter.
    #[must_use]
    pub fn is_valid_for(&self, signal: &Signal) -> bool {
        self.references()
            .iter()
            .all(|name| signal.has_parameter(name))
    }

    /// Resolve the bound value for `signal`.
    ///
    /// Templates always resolve to a string, even when the format is a single
    /// placeholder: `{{signal.a}}` with `a = 5` yields `"5"`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::InvalidSignalForRule`] naming the first
    /// referenced parameter the signal lacks, i.e. whenever
    /// [`is_valid_for`](Self::is_valid_for) is `false`.
    pub fn value_for(&self, signal: &Signal) -> Result<ParameterValue, ContractError> {
        match self {
            Self::Literal { value } => Ok(value.clone()),
            Self::Template { format, references } => {
                if let Some(missing) = references.iter().find(|name| !signal.has_parameter(name)) {
                    return Err(ContractError::InvalidSignalForRule {
                        rule: None,
                        sensor_type: signal.sensor_type().clone(),
                        missing: Some(missing.clone()),
                    });
                }
                let resolved = PLACEHOLDER.replace_all(format, |caps: &Captures<'_>| {
                    signal
                        .parameters()
                        .get(&caps[1])
                        .map(ToString::to_string)
                        .unwrap_or_default()
                });
                Ok(ParameterValue::String(resolved.into_owned()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Parameters;

    fn signal(params: Parameters) -> Signal {
        Signal::new("webhook.push", params)
    }

    #[test]
    fn should_collect_references_in_order_with_duplicates() {
        let b = ActionParameterValue::template("{{signal.repo}}@{{signal.branch}}/{{signal.repo}}");
        assert_eq!(b.references(), ["repo", "branch", "repo"]);
    }

    #[test]
    fn should_discover_placeholders_ignoring_case() {
        let b = ActionParameterValue::template("{{SIGNAL.Repo}}");
        assert_eq!(b.references(), ["Repo"]);
    }

    #[test]
    fn should_resolve_single_placeholder_to_string() {
        let b = ActionParameterValue::template("{{signal.a}}");
        assert_eq!(b.references(), ["a"]);
        let s = signal(Parameters::new().with("a", 5));
        assert_eq!(b.value_for(&s).unwrap(), ParameterValue::from("5"));
    }

    #[test]
    fn should_substitute_every_occurrence() {
        let b = ActionParameterValue::template("{{signal.repo}}:{{signal.branch}} ({{Signal.REPO}})");
        let s = signal(Parameters::new().with("repo", "foo").with("branch", "main"));
        assert_eq!(
            b.value_for(&s).unwrap(),
            ParameterValue::from("foo:main (foo)")
        );
    }

    #[test]
    fn should_not_rescan_substituted_text() {
        let b = ActionParameterValue::template("{{signal.a}}-{{signal.b}}");
        let s = signal(
            Parameters::new()
                .with("a", "{{signal.b}}")
                .with("b", "x"),
        );
        assert_eq!(
            b.value_for(&s).unwrap(),
            ParameterValue::from("{{signal.b}}-x")
        );
    }

    #[test]
    fn should_return_literal_unchanged() {
        let b = ActionParameterValue::literal(42);
        let s = signal(Parameters::new());
        assert!(b.is_valid_for(&s));
        assert_eq!(b.value_for(&s).unwrap(), ParameterValue::Int(42));
    }

    #[test]
    fn should_treat_template_without_placeholders_as_always_valid() {
        let b = ActionParameterValue::template("static text");
        let s = signal(Parameters::new());
        assert!(b.is_valid_for(&s));
        assert_eq!(b.value_for(&s).unwrap(), ParameterValue::from("static text"));
    }

    #[test]
    fn should_be_invalid_when_any_reference_is_missing() {
        let b = ActionParameterValue::template("{{signal.repo}}/{{signal.tag}}");
        let s = signal(Parameters::new().with("REPO", "foo"));
        assert!(!b.is_valid_for(&s));
        let err = b.value_for(&s).unwrap_err();
        assert!(matches!(
            err,
            ContractError::InvalidSignalForRule { rule: None, missing: Some(name), .. } if name == "tag"
        ));
    }

    #[test]
    fn should_rescan_references_when_deserializing() {
        let stored = r#"{"kind":"template","format":"{{signal.repo}}@{{signal.tag}}","references":["branch"]}"#;

        let b: ActionParameterValue = serde_json::from_str(stored).unwrap();

        assert_eq!(b.references(), ["repo", "tag"]);
    }

    #[test]
    fn should_deserialize_literal() {
        let b: ActionParameterValue =
            serde_json::from_str(r#"{"kind":"literal","value":3}"#).unwrap();
        assert_eq!(b, ActionParameterValue::literal(3));
    }

    #[test]
    fn should_classify_authored_values() {
        assert!(matches!(
            ActionParameterValue::from_authored("{{signal.repo}}".into()),
            ActionParameterValue::Template { .. }
        ));
        assert!(matches!(
            ActionParameterValue::from_authored("plain".into()),
            ActionParameterValue::Literal { .. }
        ));
        assert!(matches!(
            ActionParameterValue::from_authored(ParameterValue::Int(3)),
            ActionParameterValue::Literal { .. }
        ));
    }
}
