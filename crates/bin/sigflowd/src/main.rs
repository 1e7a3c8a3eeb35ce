//! # sigflowd — sigflow daemon
//!
//! Composition root that wires the rule engine, the job pipeline and the
//! action adapters together.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialise logging
//! - Register the configured actions and load the configured rules
//! - Wire the server topology (job queue + job processor) or the agent
//!   topology (isolated executor per job)
//! - Read newline-delimited JSON signals from stdin
//! - Handle graceful shutdown (end of input, Ctrl-C), draining queued jobs
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod ingest;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use sigflow_adapter_process::{CommandAction, TaskExecutorLoader};
use sigflow_app::action_registry::InMemoryActionRegistry;
use sigflow_app::isolation::IsolatedDispatcher;
use sigflow_app::job_processor::JobProcessor;
use sigflow_app::job_queue::JobQueue;
use sigflow_app::ports::JobDispatcher;
use sigflow_app::rule_store::RuleStore;
use sigflow_app::services::rule_service::RuleService;
use sigflow_app::signal_bus::InProcessSignalBus;
use sigflow_app::signal_processor::SignalProcessor;
use sigflow_domain::action::{ActionDefinition, ActionParameterDefinition};
use sigflow_domain::id::RuleSource;
use sigflow_domain::signal::Signal;

use config::{ActionConfig, CONFIG_FILE, Config, Mode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .with_writer(std::io::stderr)
        .init();
    tracing::info!(mode = ?config.mode, "starting sigflowd");

    // Actions
    let registry: Arc<InMemoryActionRegistry> =
        Arc::new(config.actions.iter().map(action_definition).collect());
    tracing::info!(actions = registry.ids().len(), "actions registered");

    // Rules
    let store = Arc::new(RuleStore::new());
    let rules = RuleService::new(Arc::clone(&store), Arc::clone(&registry));
    for (index, definition) in config.rules.iter().enumerate() {
        let source = RuleSource::new(format!("{CONFIG_FILE}#rules[{index}]"));
        if let Err(err) = rules.load(source, definition).await {
            tracing::error!(rule = %definition.name, error = ?err, "rule rejected");
        }
    }
    tracing::info!(
        rules = store.len(),
        signal_types = store.signal_type_count(),
        "rules loaded"
    );

    // Ingestion
    let (bus, signals) = InProcessSignalBus::new(config.ingest.capacity);
    let ingestion = tokio::spawn(async move {
        ingest::forward_signals(BufReader::new(tokio::io::stdin()), &bus).await
    });

    match config.mode {
        Mode::Server => {
            let queue = Arc::new(JobQueue::new());
            let processor = JobProcessor::new(Arc::clone(&queue), Arc::clone(&registry));
            processor.start();

            serve(SignalProcessor::new(store, Arc::clone(&queue)), signals).await?;

            tracing::info!(pending = queue.len(), "draining job queue");
            processor.stop(true).await;
            tracing::info!(
                workers = processor.workers_spawned(),
                completed = processor.jobs_completed(),
                failed = processor.jobs_failed(),
                skipped = processor.jobs_skipped(),
                "job processor finished"
            );
        }
        Mode::Agent => {
            let dispatcher = IsolatedDispatcher::new(TaskExecutorLoader, Arc::clone(&registry));
            serve(SignalProcessor::new(store, dispatcher), signals).await?;
        }
    }

    ingestion.abort();
    tracing::info!("sigflowd stopped");
    Ok(())
}

/// Process signals until input ends or the process is interrupted.
async fn serve<D: JobDispatcher>(
    processor: SignalProcessor<D>,
    signals: mpsc::Receiver<Signal>,
) -> anyhow::Result<()> {
    tokio::select! {
        () = processor.run(signals) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            tracing::info!("shutdown requested");
        }
    }
    Ok(())
}

fn action_definition(config: &ActionConfig) -> ActionDefinition {
    let mut command = CommandAction::new(config.program.clone()).args(config.args.iter().cloned());
    if let Some(limit) = config.timeout() {
        command = command.timeout(limit);
    }
    ActionDefinition::new(
        config.id.clone(),
        config
            .parameters
            .iter()
            .map(ActionParameterDefinition::new)
            .collect(),
        Arc::new(command),
    )
}
