//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `sigflow.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use sigflow_domain::id::ActionId;
use sigflow_domain::rule::RuleDefinition;

/// Default configuration file, relative to the working directory.
pub const CONFIG_FILE: &str = "sigflow.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where accepted jobs run.
    pub mode: Mode,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Signal ingestion settings.
    pub ingest: IngestConfig,
    /// Actions available to rules.
    pub actions: Vec<ActionConfig>,
    /// Rule definitions, loaded in order.
    pub rules: Vec<RuleDefinition>,
}

/// Execution topology.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Jobs go through the job queue and a single job processor.
    #[default]
    Server,
    /// Every job runs directly in a disposable isolated executor.
    Agent,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "agent" => Ok(Self::Agent),
            other => Err(ConfigError::Validation(format!("unknown mode {other:?}"))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Signal ingestion configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Signals buffered between ingestion and rule evaluation.
    pub capacity: usize,
}

/// An external program exposed as an action.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    pub id: ActionId,
    pub program: String,
    /// Fixed leading arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Declared parameters, in the order they are passed to the program.
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ActionConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from `sigflow.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(CONFIG_FILE)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("SIGFLOW_MODE") {
            self.mode = val.parse()?;
        }
        if let Ok(val) = std::env::var("SIGFLOW_INGEST_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                self.ingest.capacity = capacity;
            }
        }
        if let Ok(val) = std::env::var("SIGFLOW_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.capacity == 0 {
            return Err(ConfigError::Validation(
                "ingest capacity must be non-zero".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for action in &self.actions {
            if action.id.is_empty() {
                return Err(ConfigError::Validation("action id must not be empty".to_string()));
            }
            if action.program.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "action {} has no program",
                    action.id
                )));
            }
            if !seen.insert(&action.id) {
                return Err(ConfigError::Validation(format!(
                    "action {} is declared more than once",
                    action.id
                )));
            }
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "sigflowd=info,sigflow=info".to_string(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.mode, Mode::Server);
        assert_eq!(config.ingest.capacity, 256);
        assert_eq!(config.logging.filter, "sigflowd=info,sigflow=info");
        assert!(config.actions.is_empty());
        assert!(config.rules.is_empty());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.ingest.capacity, 256);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = r#"
            mode = "agent"

            [logging]
            filter = "debug"

            [ingest]
            capacity = 8

            [[actions]]
            id = "deploy"
            program = "/usr/local/bin/deploy"
            args = ["--target"]
            parameters = ["target"]
            timeout_secs = 60

            [[rules]]
            name = "deploy main"

            [rules.signal]
            id = "webhook.push"
            parameters = ["repo", "branch"]

            [[rules.conditions]]
            parameter = "branch"
            type = "equals"
            pattern = "main"

            [rules.action]
            id = "deploy"
            parameters = { target = "{{signal.repo}}" }
        "#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.mode, Mode::Agent);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.ingest.capacity, 8);

        let action = &config.actions[0];
        assert_eq!(action.id.as_str(), "deploy");
        assert_eq!(action.args, ["--target"]);
        assert_eq!(action.parameters, ["target"]);
        assert_eq!(action.timeout(), Some(Duration::from_secs(60)));

        let rule = &config.rules[0];
        assert_eq!(rule.name, "deploy main");
        assert!(rule.enabled);
        assert_eq!(rule.signal.id.as_str(), "webhook.push");
        assert_eq!(rule.conditions[0].comparison_type, "equals");
        assert_eq!(rule.action.id.as_str(), "deploy");
        assert_eq!(
            rule.action.parameters["target"].as_str(),
            Some("{{signal.repo}}")
        );
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.ingest.capacity, 256);
    }

    #[test]
    fn should_parse_mode_case_insensitively() {
        assert_eq!("Agent".parse::<Mode>().unwrap(), Mode::Agent);
        assert_eq!("SERVER".parse::<Mode>().unwrap(), Mode::Server);
        assert!("cluster".parse::<Mode>().is_err());
    }

    #[test]
    fn should_reject_zero_capacity() {
        let mut config = Config::default();
        config.ingest.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_duplicate_action_ids() {
        let toml = r#"
            [[actions]]
            id = "deploy"
            program = "deploy.sh"

            [[actions]]
            id = "deploy"
            program = "other.sh"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_action_without_program() {
        let toml = r#"
            [[actions]]
            id = "deploy"
            program = " "
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_accept_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
