//! Rule service — use-cases for the rule-source collaborator.
//!
//! Definitions arrive already parsed. This service validates them against
//! the action registry, compiles them and keeps the [`RuleStore`] in sync
//! with their source.

use std::sync::Arc;

use sigflow_domain::error::SigflowError;
use sigflow_domain::id::RuleSource;
use sigflow_domain::rule::{Rule, RuleDefinition};

use crate::ports::ActionRegistry;
use crate::rule_store::RuleStore;

/// Application service loading rule definitions into a [`RuleStore`].
pub struct RuleService<R> {
    store: Arc<RuleStore>,
    registry: R,
}

impl<R: ActionRegistry> RuleService<R> {
    /// Create a new service feeding `store`, resolving actions through `registry`.
    pub fn new(store: Arc<RuleStore>, registry: R) -> Self {
        Self { store, registry }
    }

    async fn compile(&self, definition: &RuleDefinition) -> Result<Option<Rule>, SigflowError> {
        let known = self.registry.find(&definition.action.id).await?.is_some();
        Ok(definition.compile(|_| known)?)
    }

    /// Compile `definition` and add it under `source`.
    ///
    /// Returns `false` when the definition is disabled and was discarded.
    ///
    /// # Errors
    ///
    /// Returns [`SigflowError::Validation`] if the definition is invalid or
    /// `source` already holds a rule, or an error from the action registry.
    #[tracing::instrument(skip(self, definition), fields(rule = %definition.name))]
    pub async fn load(
        &self,
        source: RuleSource,
        definition: &RuleDefinition,
    ) -> Result<bool, SigflowError> {
        let Some(rule) = self.compile(definition).await? else {
            tracing::info!(%source, "rule disabled, skipping");
            return Ok(false);
        };
        self.store.add(source.clone(), rule)?;
        tracing::info!(%source, "rule loaded");
        Ok(true)
    }

    /// Replace whatever `source` holds with `definition`.
    ///
    /// A definition that is now disabled removes the rule. Returns whether a
    /// rule is registered under `source` afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SigflowError::Validation`] if the definition is invalid, in
    /// which case the previous rule is left in place.
    #[tracing::instrument(skip(self, definition), fields(rule = %definition.name))]
    pub async fn reload(
        &self,
        source: RuleSource,
        definition: &RuleDefinition,
    ) -> Result<bool, SigflowError> {
        match self.compile(definition).await? {
            Some(rule) => {
                let previous = self.store.update(source.clone(), rule);
                tracing::info!(%source, replaced = previous.is_some(), "rule reloaded");
                Ok(true)
            }
            None => {
                let previous = self.store.remove(&source);
                tracing::info!(%source, removed = previous.is_some(), "rule disabled, unloaded");
                Ok(false)
            }
        }
    }

    /// Drop the rule held by `source`. Returns whether one was registered.
    #[tracing::instrument(skip(self))]
    pub fn unload(&self, source: &RuleSource) -> bool {
        let removed = self.store.remove(source).is_some();
        if removed {
            tracing::info!("rule unloaded");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_registry::InMemoryActionRegistry;
    use sigflow_domain::action::{ActionDefinition, invocable_fn};
    use sigflow_domain::condition::ConditionDefinition;
    use sigflow_domain::error::{RuleDefinitionError, ValidationError};
    use sigflow_domain::id::SignalTypeId;
    use sigflow_domain::rule::{ActionInvocationDefinition, SignalDeclaration};

    fn make_service() -> (Arc<RuleStore>, RuleService<InMemoryActionRegistry>) {
        let registry = InMemoryActionRegistry::new();
        registry.register(ActionDefinition::new(
            "deploy",
            Vec::new(),
            Arc::new(invocable_fn(|_| async { Ok(()) })),
        ));
        let store = Arc::new(RuleStore::new());
        (Arc::clone(&store), RuleService::new(store, registry))
    }

    fn deploy_definition() -> RuleDefinition {
        RuleDefinition {
            name: "deploy main".to_string(),
            description: String::new(),
            enabled: true,
            signal: SignalDeclaration {
                id: "webhook.push".into(),
                parameters: vec!["repo".to_string(), "branch".to_string()],
            },
            conditions: vec![ConditionDefinition {
                parameter_name: "branch".to_string(),
                comparison_type: "equals".to_string(),
                pattern: "main".into(),
            }],
            action: ActionInvocationDefinition {
                id: "deploy".into(),
                parameters: [("target".to_string(), "{{signal.repo}}".into())]
                    .into_iter()
                    .collect(),
            },
        }
    }

    fn source() -> RuleSource {
        RuleSource::new("rules/deploy.yaml")
    }

    #[tokio::test]
    async fn should_load_rule_when_valid() {
        let (store, svc) = make_service();

        let loaded = svc.load(source(), &deploy_definition()).await.unwrap();

        assert!(loaded);
        assert_eq!(store.rules_for_signal(&SignalTypeId::new("webhook.push")).len(), 1);
    }

    #[tokio::test]
    async fn should_discard_disabled_rule() {
        let (store, svc) = make_service();
        let definition = RuleDefinition {
            enabled: false,
            ..deploy_definition()
        };

        let loaded = svc.load(source(), &definition).await.unwrap();

        assert!(!loaded);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn should_reject_rule_for_unknown_action() {
        let (store, svc) = make_service();
        let mut definition = deploy_definition();
        definition.action.id = "rollback".into();

        let result = svc.load(source(), &definition).await;

        assert!(matches!(
            result,
            Err(SigflowError::Validation(ValidationError::InvalidRuleDefinition {
                reason: RuleDefinitionError::UnknownAction(_),
                ..
            }))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn should_reject_second_load_from_same_source() {
        let (_, svc) = make_service();
        svc.load(source(), &deploy_definition()).await.unwrap();

        let result = svc.load(source(), &deploy_definition()).await;

        assert!(matches!(
            result,
            Err(SigflowError::Validation(ValidationError::RuleAlreadyExists { .. }))
        ));
    }

    #[tokio::test]
    async fn should_move_rule_between_buckets_on_reload() {
        let (store, svc) = make_service();
        svc.load(source(), &deploy_definition()).await.unwrap();
        let mut definition = deploy_definition();
        definition.signal.id = "webhook.tag".into();

        let present = svc.reload(source(), &definition).await.unwrap();

        assert!(present);
        assert!(store.rules_for_signal(&SignalTypeId::new("webhook.push")).is_empty());
        assert_eq!(store.rules_for_signal(&SignalTypeId::new("webhook.tag")).len(), 1);
    }

    #[tokio::test]
    async fn should_unload_rule_when_reloaded_disabled() {
        let (store, svc) = make_service();
        svc.load(source(), &deploy_definition()).await.unwrap();
        let definition = RuleDefinition {
            enabled: false,
            ..deploy_definition()
        };

        let present = svc.reload(source(), &definition).await.unwrap();

        assert!(!present);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn should_keep_previous_rule_when_reload_is_invalid() {
        let (store, svc) = make_service();
        svc.load(source(), &deploy_definition()).await.unwrap();
        let mut definition = deploy_definition();
        definition.conditions[0].comparison_type = "near".to_string();

        let result = svc.reload(source(), &definition).await;

        assert!(matches!(
            result,
            Err(SigflowError::Validation(ValidationError::InvalidConditionType(_)))
        ));
        assert_eq!(store.get(&source()).unwrap().name(), "deploy main");
    }

    #[tokio::test]
    async fn should_report_whether_unload_removed_anything() {
        let (store, svc) = make_service();
        svc.load(source(), &deploy_definition()).await.unwrap();

        assert!(svc.unload(&source()));
        assert!(!svc.unload(&source()));
        assert!(store.is_empty());
    }
}
