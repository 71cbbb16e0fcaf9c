use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::gate::ResolutionGate;
use crate::backend::{BackendError, SynthesisBackend, SynthesisRequest};
use crate::events::{EventKind, EventLog};
use crate::state_machine::Bundle;

/// A producer's outcome once it has crossed the producer boundary.
pub type SubTaskResult<T> = Option<T>;

/// One rung of the degradation ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Primary,
    Fallback,
}

/// Strategies tried in order under the job's single deadline.
pub const LADDER: [Strategy; 2] = [Strategy::Primary, Strategy::Fallback];

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Primary => write!(f, "primary"),
            Strategy::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Producer {
    Artifacts(Strategy),
    Auxiliary,
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Producer::Artifacts(strategy) => write!(f, "{strategy} artifacts"),
            Producer::Auxiliary => write!(f, "auxiliary timeline"),
        }
    }
}

/// Final report of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineReport {
    Complete(Bundle),
    /// Every rung failed to produce a complete pair.
    Incomplete,
    /// The job was resolved elsewhere (or cancelled) before the ladder finished.
    Abandoned,
}

/// Fans a request out to an artifact producer and the auxiliary producer,
/// joins both under the all-or-nothing rule, and walks [`LADDER`] until a
/// rung yields a bundle.
pub struct SynthesisPipeline<B> {
    backend: Arc<B>,
    events: Arc<dyn EventLog>,
}

impl<B: SynthesisBackend> SynthesisPipeline<B> {
    pub fn new(backend: Arc<B>, events: Arc<dyn EventLog>) -> Self {
        Self { backend, events }
    }

    /// Runs the ladder for one job.
    ///
    /// The fallback rung is entered only while `gate` is unresolved, and
    /// `on_fallback` is invoked right before it starts. Cancelling `cancel`
    /// aborts in-flight producer tasks and ends the run as `Abandoned`.
    pub async fn run<F>(
        &self,
        request: &SynthesisRequest,
        gate: &ResolutionGate,
        cancel: &CancellationToken,
        on_fallback: F,
    ) -> PipelineReport
    where
        F: FnOnce(),
    {
        let mut on_fallback = Some(on_fallback);

        for strategy in LADDER {
            if strategy != Strategy::Primary {
                if gate.is_resolved() || cancel.is_cancelled() {
                    debug!(target: "formation.pipeline", job_id = %gate.job_id(), "resolved before {strategy}; stopping");
                    return PipelineReport::Abandoned;
                }
                if let Some(hook) = on_fallback.take() {
                    hook();
                }
                self.events
                    .record(EventKind::FallbackEntered, &format!("job {}", gate.job_id()));
            }

            if let Some(bundle) = self.attempt(strategy, request, cancel).await {
                info!(target: "formation.pipeline", job_id = %gate.job_id(), %strategy, artifacts = bundle.artifacts.len(), "bundle complete");
                return PipelineReport::Complete(bundle);
            }
            if cancel.is_cancelled() {
                return PipelineReport::Abandoned;
            }
            info!(target: "formation.pipeline", job_id = %gate.job_id(), %strategy, "attempt yielded no bundle");
        }

        PipelineReport::Incomplete
    }

    async fn attempt(
        &self,
        strategy: Strategy,
        request: &SynthesisRequest,
        cancel: &CancellationToken,
    ) -> SubTaskResult<Bundle> {
        let backend = Arc::clone(&self.backend);
        let artifact_req = match strategy {
            Strategy::Primary => request.clone(),
            Strategy::Fallback => request.degraded(),
        };
        let artifacts = self.produce(Producer::Artifacts(strategy), cancel, async move {
            let set = match strategy {
                Strategy::Primary => backend.synthesize_primary(&artifact_req).await?,
                Strategy::Fallback => backend.synthesize_fallback(&artifact_req).await?,
            };
            if set.is_empty() {
                return Err(BackendError::Malformed("empty artifact set".into()));
            }
            Ok(set)
        });

        let backend = Arc::clone(&self.backend);
        let auxiliary_req = request.clone();
        let timeline = self.produce(Producer::Auxiliary, cancel, async move {
            let timeline = backend.synthesize_auxiliary(&auxiliary_req).await?;
            if !timeline.is_well_formed() {
                return Err(BackendError::Malformed(format!(
                    "timeline has {} stages",
                    timeline.stages.len()
                )));
            }
            Ok(timeline)
        });

        let (artifacts, timeline) = tokio::join!(artifacts, timeline);
        Bundle::pair(artifacts, timeline, strategy == Strategy::Fallback)
    }

    /// The producer boundary: errors, malformed payloads and panics all become `None`.
    async fn produce<T, F>(
        &self,
        producer: Producer,
        cancel: &CancellationToken,
        call: F,
    ) -> SubTaskResult<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, BackendError>> + Send + 'static,
    {
        let mut task = tokio::spawn(call);

        let joined = tokio::select! {
            joined = &mut task => joined,
            _ = cancel.cancelled() => {
                task.abort();
                debug!(target: "formation.pipeline", %producer, "abandoned");
                return None;
            }
        };

        match joined {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                self.events
                    .record(EventKind::ProducerFailed, &format!("{producer}: {e}"));
                None
            }
            Err(e) => {
                self.events
                    .record(EventKind::ProducerFailed, &format!("{producer}: task {e}"));
                None
            }
        }
    }
}
