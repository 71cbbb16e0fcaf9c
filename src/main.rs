mod backend;
mod cli;
mod config;
mod error;
mod events;
mod liveness;
mod logging;
mod orchestrator;
mod policy;
mod state_machine;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::info;

use backend::{HttpBackend, SimulatedBackend, StyleParams, SynthesisBackend, Tier};
use cli::{Cli, Command, Scenario};
use config::FormationConfig;
use events::TracingEventLog;
use liveness::{FileLivenessStore, LivenessStore};
use orchestrator::JobController;
use policy::PolicyGuard;
use state_machine::JobState;
use ui::JobProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    let mut config = FormationConfig::load()?;
    if let Some(ms) = cli.deadline_ms {
        config.deadline_ms = ms;
        config.validate()?;
    }

    match cli.command {
        Command::Run {
            subject,
            style,
            tier,
        } => {
            let style = StyleParams {
                style,
                tier: tier.into(),
            };
            match config.backend_url.clone() {
                Some(url) => {
                    info!(target: "formation", %url, "using HTTP backend");
                    drive(&config, HttpBackend::new(&url)?, &subject, style).await
                }
                None => {
                    info!(target: "formation", "no backend configured; using simulated backend");
                    let backend = SimulatedBackend::new(Duration::from_millis(800));
                    drive(&config, backend, &subject, style).await
                }
            }
        }
        Command::Check { text } => {
            let guard = PolicyGuard::from_terms(&config.doctrine);
            let verdict = guard.validate(&text);
            if verdict.is_valid() {
                println!("accepted");
            } else {
                println!("rejected: {}", verdict.reason().unwrap_or_default());
            }
            Ok(())
        }
        Command::Status => {
            let store = FileLivenessStore::new(&config.liveness_path);
            let state = if store.get() { "in flight" } else { "idle" };
            println!("{state} ({})", store.path().display());
            Ok(())
        }
        Command::Demo { scenario } => {
            let latency = Duration::from_millis(600);
            let mut backend = SimulatedBackend::new(latency);
            let mut subject = "levitating orbital sphere";
            match scenario {
                Scenario::Success => {}
                Scenario::Fallback => backend.fail_primary = true,
                Scenario::Timeout => {
                    backend.primary_latency = Duration::from_secs(5);
                    if cli.deadline_ms.is_none() {
                        config.deadline_ms = 2_000;
                    }
                }
                Scenario::Rejected => subject = "a bomb over the bay",
            }
            let style = StyleParams {
                style: "chrome".to_string(),
                tier: Tier::Pro,
            };
            drive(&config, backend, subject, style).await
        }
    }
}

/// Submits one job and follows it to its terminal state.
async fn drive<B: SynthesisBackend>(
    config: &FormationConfig,
    backend: B,
    subject: &str,
    style: StyleParams,
) -> Result<()> {
    let controller = JobController::new(
        config,
        Arc::new(backend),
        Arc::new(FileLivenessStore::new(&config.liveness_path)),
        Arc::new(TracingEventLog),
    );
    if let Some(notice) = controller.current_state().message {
        eprintln!("note: {notice}");
        controller.dismiss_notice();
    }

    controller.focus();
    let mut updates = controller.subscribe();
    let progress = JobProgress::start(subject);
    let job_id = controller.submit(subject, style)?;

    let settled = controller.settled(job_id);
    tokio::pin!(settled);

    let mut fallback_announced = false;
    let snapshot = loop {
        tokio::select! {
            snapshot = &mut settled => break snapshot,
            changed = updates.changed() => {
                if changed.is_err() {
                    break (&mut settled).await;
                }
                let snapshot = updates.borrow_and_update().clone();
                progress.update(&snapshot, &mut fallback_announced);
            }
        }
    };

    progress.complete(&snapshot);
    progress.print_audit(&controller.audit_record());

    if snapshot.state != JobState::Succeeded {
        bail!("formation {job_id} did not succeed");
    }
    Ok(())
}
