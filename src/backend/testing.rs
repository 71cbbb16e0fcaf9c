//! Scripted backend for orchestrator tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;

use super::SynthesisBackend;
use super::error::BackendError;
use super::types::{Artifact, ArtifactSet, SynthesisRequest, TimelineStage, TimelineStructure};

#[derive(Debug, Clone, Copy)]
pub enum Reply {
    /// Produce this many artifacts (or stages, for the auxiliary producer).
    Items(usize),
    Fail,
    Panic,
}

#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub delay: Duration,
    pub reply: Reply,
}

impl Step {
    pub fn ok(items: usize, delay_secs: u64) -> Self {
        Self {
            delay: Duration::from_secs(delay_secs),
            reply: Reply::Items(items),
        }
    }

    pub fn fail(delay_secs: u64) -> Self {
        Self {
            delay: Duration::from_secs(delay_secs),
            reply: Reply::Fail,
        }
    }

    pub fn panic() -> Self {
        Self {
            delay: Duration::ZERO,
            reply: Reply::Panic,
        }
    }
}

/// Steps are consumed in order; the last one repeats.
#[derive(Debug)]
struct Script {
    steps: Mutex<Vec<Step>>,
    started: AtomicUsize,
    finished: AtomicUsize,
}

impl Script {
    fn new(steps: Vec<Step>) -> Self {
        assert!(!steps.is_empty(), "script needs at least one step");
        Self {
            steps: Mutex::new(steps),
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        }
    }

    fn next(&self) -> Step {
        self.started.fetch_add(1, Ordering::SeqCst);
        let mut steps = self.steps.lock();
        if steps.len() > 1 { steps.remove(0) } else { steps[0] }
    }

    async fn play(&self) -> Result<usize, BackendError> {
        let step = self.next();
        sleep(step.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        match step.reply {
            Reply::Items(n) => Ok(n),
            Reply::Fail => Err(BackendError::Unavailable("scripted failure".into())),
            Reply::Panic => panic!("scripted producer panic"),
        }
    }
}

#[derive(Debug)]
pub struct ScriptedBackend {
    primary: Script,
    fallback: Script,
    auxiliary: Script,
}

impl ScriptedBackend {
    pub fn new(primary: Vec<Step>, fallback: Vec<Step>, auxiliary: Vec<Step>) -> Self {
        Self {
            primary: Script::new(primary),
            fallback: Script::new(fallback),
            auxiliary: Script::new(auxiliary),
        }
    }

    /// Every producer succeeds immediately; primary honours the requested fan-out.
    pub fn healthy() -> Self {
        Self::new(
            vec![Step::ok(usize::MAX, 0)],
            vec![Step::ok(1, 0)],
            vec![Step::ok(3, 0)],
        )
    }

    pub fn primary_calls(&self) -> usize {
        self.primary.started.load(Ordering::SeqCst)
    }

    pub fn fallback_calls(&self) -> usize {
        self.fallback.started.load(Ordering::SeqCst)
    }

    pub fn auxiliary_calls(&self) -> usize {
        self.auxiliary.started.load(Ordering::SeqCst)
    }

    pub fn fallback_finished(&self) -> usize {
        self.fallback.finished.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.primary_calls() + self.fallback_calls() + self.auxiliary_calls()
    }

    /// Calls that ran to the end of their scripted delay.
    pub fn total_finished(&self) -> usize {
        [&self.primary, &self.fallback, &self.auxiliary]
            .iter()
            .map(|s| s.finished.load(Ordering::SeqCst))
            .sum()
    }
}

fn artifacts(n: usize, req: &SynthesisRequest) -> ArtifactSet {
    // usize::MAX means "whatever the request asked for".
    let n = if n == usize::MAX { req.fan_out as usize } else { n };
    ArtifactSet {
        artifacts: (0..n)
            .map(|i| Artifact {
                label: format!("{} {i}", req.subject),
                uri: format!("test://{i}"),
            })
            .collect(),
    }
}

impl SynthesisBackend for ScriptedBackend {
    async fn synthesize_primary(&self, req: &SynthesisRequest) -> Result<ArtifactSet, BackendError> {
        let n = self.primary.play().await?;
        Ok(artifacts(n, req))
    }

    async fn synthesize_fallback(
        &self,
        req: &SynthesisRequest,
    ) -> Result<ArtifactSet, BackendError> {
        let n = self.fallback.play().await?;
        Ok(artifacts(n, req))
    }

    async fn synthesize_auxiliary(
        &self,
        _req: &SynthesisRequest,
    ) -> Result<TimelineStructure, BackendError> {
        let n = self.auxiliary.play().await?;
        Ok(TimelineStructure {
            stages: (0..n)
                .map(|i| TimelineStage {
                    title: format!("stage {i}"),
                    period_label: format!("P{i}"),
                    narrative: "scripted".into(),
                    category: "test".into(),
                })
                .collect(),
        })
    }
}
