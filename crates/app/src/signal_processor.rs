//! Signal processor — matches arriving signals against the rule store and
//! hands the resulting jobs to a [`JobDispatcher`].
//!
//! Rules are evaluated independently: an evaluation, job-creation or dispatch
//! failure for one rule is logged and the remaining candidates still run.

use std::sync::Arc;

use tokio::sync::mpsc;

use sigflow_domain::id::JobId;
use sigflow_domain::signal::Signal;

use crate::ports::JobDispatcher;
use crate::rule_store::RuleStore;

/// Glue between signal ingestion, the [`RuleStore`] and job execution.
pub struct SignalProcessor<D> {
    store: Arc<RuleStore>,
    dispatcher: D,
}

impl<D: JobDispatcher> SignalProcessor<D> {
    pub fn new(store: Arc<RuleStore>, dispatcher: D) -> Self {
        Self { store, dispatcher }
    }

    /// Evaluate `signal` against every rule registered for its type.
    ///
    /// Returns the ids of the jobs that were dispatched successfully.
    #[tracing::instrument(skip_all, fields(signal_id = %signal.id(), sensor_type = %signal.sensor_type()))]
    pub async fn process_signal(&self, signal: &Signal) -> Vec<JobId> {
        tracing::info!(parameters = signal.parameters().len(), "signal received");
        for (name, value) in signal.parameters().iter() {
            tracing::debug!(parameter = name, value = %value, "signal parameter");
        }

        let candidates = self.store.rules_for_signal(signal.sensor_type());
        let mut dispatched = Vec::new();

        for rule in &candidates {
            match rule.should_process(signal) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(rule = rule.name(), "rule does not apply");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(rule = rule.name(), error = %err, "rule evaluation failed");
                    continue;
                }
            }

            let job = match rule.to_job(signal) {
                Ok(job) => job,
                Err(err) => {
                    tracing::warn!(rule = rule.name(), error = %err, "job creation failed");
                    continue;
                }
            };
            let job_id = job.id();
            let action_id = job.action_id().clone();

            match self.dispatcher.dispatch(job).await {
                Ok(()) => {
                    tracing::info!(rule = rule.name(), %job_id, %action_id, "job dispatched");
                    dispatched.push(job_id);
                }
                Err(err) => {
                    tracing::error!(rule = rule.name(), %job_id, %action_id, error = ?err, "job dispatch failed, dropping");
                }
            }
        }

        if candidates.is_empty() {
            tracing::debug!("no rules registered for signal type");
        }
        dispatched
    }

    /// Consume signals from `signals` until every publisher is gone.
    pub async fn run(&self, mut signals: mpsc::Receiver<Signal>) {
        tracing::info!("signal processor running");
        while let Some(signal) = signals.recv().await {
            self.process_signal(&signal).await;
        }
        tracing::info!("signal bus closed, signal processor exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SignalPublisher;
    use crate::signal_bus::InProcessSignalBus;
    use sigflow_domain::binding::ActionParameterValue;
    use sigflow_domain::condition::{ComparisonType, Condition};
    use sigflow_domain::error::{BoxError, SigflowError};
    use sigflow_domain::id::RuleSource;
    use sigflow_domain::job::Job;
    use sigflow_domain::parameters::Parameters;
    use sigflow_domain::rule::Rule;
    use sigflow_domain::value::ParameterValue;
    use std::future::Future;
    use std::sync::Mutex;

    #[derive(Default)]
    struct SpyDispatcher {
        jobs: Mutex<Vec<Job>>,
        refuse_action: Option<&'static str>,
    }

    impl SpyDispatcher {
        fn jobs(&self) -> Vec<Job> {
            self.jobs.lock().unwrap().clone()
        }
    }

    impl JobDispatcher for SpyDispatcher {
        fn dispatch(&self, job: Job) -> impl Future<Output = Result<(), SigflowError>> + Send {
            let result = if self
                .refuse_action
                .is_some_and(|action| job.action_id().as_str() == action)
            {
                Err(SigflowError::Transport(BoxError::from("broker unavailable")))
            } else {
                self.jobs.lock().unwrap().push(job);
                Ok(())
            };
            async { result }
        }
    }

    fn deploy_rule() -> Rule {
        Rule::builder()
            .name("deploy main")
            .sensor_type("webhook.push")
            .action("deploy")
            .condition(
                "branch",
                Condition::compile(ComparisonType::Equals, "main".into()).unwrap(),
            )
            .bind("target", ActionParameterValue::template("{{signal.repo}}"))
            .build()
            .unwrap()
    }

    fn push(branch: &str) -> Signal {
        Signal::new(
            "webhook.push",
            Parameters::new().with("repo", "foo").with("branch", branch),
        )
    }

    fn processor_with(rules: Vec<(&str, Rule)>, dispatcher: SpyDispatcher) -> SignalProcessor<Arc<SpyDispatcher>> {
        let store = Arc::new(RuleStore::new());
        for (source, rule) in rules {
            store.add(RuleSource::new(source), rule).unwrap();
        }
        SignalProcessor::new(store, Arc::new(dispatcher))
    }

    #[tokio::test]
    async fn should_dispatch_job_when_push_to_main_matches() {
        let processor = processor_with(vec![("deploy.yaml", deploy_rule())], SpyDispatcher::default());

        let dispatched = processor.process_signal(&push("main")).await;

        let jobs = processor.dispatcher.jobs();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id(), dispatched[0]);
        assert_eq!(jobs[0].action_id().as_str(), "deploy");
        assert_eq!(
            jobs[0].parameters().get("target"),
            Some(&ParameterValue::from("foo"))
        );
    }

    #[tokio::test]
    async fn should_not_dispatch_when_branch_differs() {
        let processor = processor_with(vec![("deploy.yaml", deploy_rule())], SpyDispatcher::default());

        let dispatched = processor.process_signal(&push("dev")).await;

        assert!(dispatched.is_empty());
        assert!(processor.dispatcher.jobs().is_empty());
    }

    #[tokio::test]
    async fn should_ignore_signal_with_no_registered_rules() {
        let processor = processor_with(vec![("deploy.yaml", deploy_rule())], SpyDispatcher::default());

        let dispatched = processor
            .process_signal(&Signal::new("timer.tick", Parameters::new()))
            .await;

        assert!(dispatched.is_empty());
    }

    #[tokio::test]
    async fn should_keep_evaluating_after_rule_evaluation_error() {
        let ordering = Rule::builder()
            .name("too large")
            .sensor_type("webhook.push")
            .action("alert")
            .condition(
                "branch",
                Condition::compile(ComparisonType::GreaterThan, 10.into()).unwrap(),
            )
            .build()
            .unwrap();
        let processor = processor_with(
            vec![("alert.yaml", ordering), ("deploy.yaml", deploy_rule())],
            SpyDispatcher::default(),
        );

        let dispatched = processor.process_signal(&push("main")).await;

        assert_eq!(dispatched.len(), 1);
        assert_eq!(processor.dispatcher.jobs()[0].action_id().as_str(), "deploy");
    }

    #[tokio::test]
    async fn should_keep_dispatching_after_dispatch_failure() {
        let notify = Rule::builder()
            .name("notify")
            .sensor_type("webhook.push")
            .action("notify")
            .build()
            .unwrap();
        let dispatcher = SpyDispatcher {
            refuse_action: Some("notify"),
            ..SpyDispatcher::default()
        };
        let processor = processor_with(
            vec![("notify.yaml", notify), ("deploy.yaml", deploy_rule())],
            dispatcher,
        );

        let dispatched = processor.process_signal(&push("main")).await;

        assert_eq!(dispatched.len(), 1);
        assert_eq!(processor.dispatcher.jobs()[0].action_id().as_str(), "deploy");
    }

    #[tokio::test]
    async fn should_process_signals_from_bus_until_closed() {
        let processor = processor_with(vec![("deploy.yaml", deploy_rule())], SpyDispatcher::default());
        let (bus, rx) = InProcessSignalBus::new(8);

        bus.publish(push("main")).await.unwrap();
        bus.publish(push("dev")).await.unwrap();
        bus.publish(push("main")).await.unwrap();
        drop(bus);

        processor.run(rx).await;

        assert_eq!(processor.dispatcher.jobs().len(), 2);
    }
}
