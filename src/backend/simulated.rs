//! In-process backend producing deterministic payloads.
//!
//! Used by `formation demo` and by `formation run` when no backend URL is
//! configured. Latency and failures can be injected to exercise the fallback
//! and watchdog paths from the command line.

use std::time::Duration;

use tokio::time::sleep;

use super::SynthesisBackend;
use super::error::BackendError;
use super::types::{
    Artifact, ArtifactSet, SynthesisRequest, TIMELINE_STAGES, TimelineStage, TimelineStructure,
};

const STAGE_NAMES: [(&str, &str, &str); TIMELINE_STAGES] = [
    ("Genesis", "First Epoch", "origin"),
    ("Ascent", "Middle Epoch", "growth"),
    ("Equilibrium", "Late Epoch", "resolution"),
];

#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    /// Delay applied to every producer call.
    pub latency: Duration,
    /// Extra delay applied to the primary producer only.
    pub primary_latency: Duration,
    pub fail_primary: bool,
    pub fail_fallback: bool,
    pub fail_auxiliary: bool,
}

impl SimulatedBackend {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    fn artifacts(req: &SynthesisRequest, fidelity: &str) -> ArtifactSet {
        let slug = slug(&req.subject);
        let artifacts = (1..=req.fan_out.max(1))
            .map(|i| Artifact {
                label: format!("{} #{i} ({fidelity})", req.subject),
                uri: format!("sim://{slug}/{}/{fidelity}/{i}", req.style),
            })
            .collect();
        ArtifactSet { artifacts }
    }
}

fn slug(text: &str) -> String {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

impl SynthesisBackend for SimulatedBackend {
    async fn synthesize_primary(&self, req: &SynthesisRequest) -> Result<ArtifactSet, BackendError> {
        sleep(self.latency + self.primary_latency).await;
        if self.fail_primary {
            return Err(BackendError::Unavailable("primary renderer offline".into()));
        }
        Ok(Self::artifacts(req, "full"))
    }

    async fn synthesize_fallback(
        &self,
        req: &SynthesisRequest,
    ) -> Result<ArtifactSet, BackendError> {
        sleep(self.latency).await;
        if self.fail_fallback {
            return Err(BackendError::Unavailable("fallback renderer offline".into()));
        }
        Ok(Self::artifacts(req, "lite"))
    }

    async fn synthesize_auxiliary(
        &self,
        req: &SynthesisRequest,
    ) -> Result<TimelineStructure, BackendError> {
        sleep(self.latency).await;
        if self.fail_auxiliary {
            return Err(BackendError::Unavailable("timeline writer offline".into()));
        }
        let stages = STAGE_NAMES
            .iter()
            .map(|(title, period, category)| TimelineStage {
                title: (*title).to_string(),
                period_label: (*period).to_string(),
                narrative: format!("{} enters its {} phase.", req.subject, title.to_lowercase()),
                category: (*category).to_string(),
            })
            .collect();
        Ok(TimelineStructure { stages })
    }
}
