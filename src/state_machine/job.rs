use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::JobState;
use crate::backend::{Artifact, ArtifactSet, StyleParams, TimelineStructure};
use crate::error::FailureReason;

/// Raw request payload: free-text subject plus style selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationInput {
    pub subject: String,
    pub style: StyleParams,
}

/// The paired result of a successful formation.
///
/// Only constructed through [`Bundle::pair`], so both halves are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub artifacts: Vec<Artifact>,
    pub timeline: TimelineStructure,
    /// True when produced by the degraded fallback producer.
    pub degraded: bool,
}

impl Bundle {
    /// Combines two producer results under the all-or-nothing rule.
    pub fn pair(
        artifacts: Option<ArtifactSet>,
        timeline: Option<TimelineStructure>,
        degraded: bool,
    ) -> Option<Self> {
        let (artifacts, timeline) = (artifacts?, timeline?);
        Some(Self {
            artifacts: artifacts.artifacts,
            timeline,
            degraded,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    Success(Bundle),
    Failure(FailureReason),
}

/// Terminal outcome of a job with the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub message: String,
}

impl Outcome {
    pub fn success(bundle: Bundle) -> Self {
        let message = if bundle.degraded {
            "Formation complete (reduced detail).".to_string()
        } else {
            "Formation complete.".to_string()
        };
        Self {
            kind: OutcomeKind::Success(bundle),
            message,
        }
    }

    pub fn failure(reason: FailureReason) -> Self {
        Self {
            message: reason.user_message(),
            kind: OutcomeKind::Failure(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.kind, OutcomeKind::Success(_))
    }

    pub fn bundle(&self) -> Option<&Bundle> {
        match &self.kind {
            OutcomeKind::Success(bundle) => Some(bundle),
            OutcomeKind::Failure(_) => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&FailureReason> {
        match &self.kind {
            OutcomeKind::Success(_) => None,
            OutcomeKind::Failure(reason) => Some(reason),
        }
    }
}

/// The unit of work. Mutated only by the job controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub input: Option<FormationInput>,
    pub state: JobState,
    pub state_history: Vec<JobState>,
    pub admitted_at: Option<DateTime<Utc>>,
    pub deadline_at: Option<DateTime<Utc>>,
    pub fallback_active: bool,
    /// Mirrors the resolution gate once it has accepted an outcome.
    pub resolved: bool,
    pub outcome: Option<Outcome>,
    /// User-visible notice. Outlives the outcome until dismissed.
    pub message: Option<String>,
}

impl Job {
    /// An idle slot that has never been submitted.
    pub fn dormant() -> Self {
        Self {
            id: Uuid::nil(),
            input: None,
            state: JobState::Dormant,
            state_history: Vec::new(),
            admitted_at: None,
            deadline_at: None,
            fallback_active: false,
            resolved: false,
            outcome: None,
            message: None,
        }
    }

    /// A fresh submission starting from whatever idle state the slot was in.
    pub fn new(input: FormationInput, prior: JobState) -> Self {
        Self {
            id: Uuid::new_v4(),
            input: Some(input),
            state: prior,
            ..Self::dormant()
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id,
            state: self.state,
            fallback_active: self.fallback_active,
            message: self.message.clone(),
            bundle: self.outcome.as_ref().and_then(Outcome::bundle).cloned(),
            failure: self
                .outcome
                .as_ref()
                .and_then(Outcome::failure_reason)
                .cloned(),
        }
    }
}

/// Read-only view of a job handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub state: JobState,
    pub fallback_active: bool,
    pub message: Option<String>,
    pub bundle: Option<Bundle>,
    pub failure: Option<FailureReason>,
}

/// Structured record produced when a job resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub job_id: Uuid,
    pub subject: String,
    pub style: Option<StyleParams>,
    pub state_transitions: Vec<JobState>,
    pub fallback_active: bool,
    pub outcome: String,
    pub artifact_count: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: Option<i64>,
}

impl AuditRecord {
    pub fn from_job(job: &Job) -> Self {
        let now = Utc::now();
        let mut transitions = job.state_history.clone();
        transitions.push(job.state);

        let outcome = match job.outcome.as_ref().map(|o| &o.kind) {
            Some(OutcomeKind::Success(_)) => "Succeeded".to_string(),
            Some(OutcomeKind::Failure(reason)) => format!("Failed({reason})"),
            None => "Unresolved".to_string(),
        };

        Self {
            job_id: job.id,
            subject: job
                .input
                .as_ref()
                .map(|i| i.subject.clone())
                .unwrap_or_default(),
            style: job.input.as_ref().map(|i| i.style.clone()),
            state_transitions: transitions,
            fallback_active: job.fallback_active,
            outcome,
            artifact_count: job
                .outcome
                .as_ref()
                .and_then(Outcome::bundle)
                .map_or(0, |b| b.artifacts.len()),
            started_at: job.admitted_at,
            completed_at: now,
            duration_ms: job.admitted_at.map(|t| (now - t).num_milliseconds()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Tier;
    use crate::backend::types::TimelineStage;

    fn timeline() -> TimelineStructure {
        TimelineStructure {
            stages: vec![TimelineStage {
                title: "t".into(),
                period_label: "p".into(),
                narrative: "n".into(),
                category: "c".into(),
            }],
        }
    }

    fn artifacts(n: usize) -> ArtifactSet {
        ArtifactSet {
            artifacts: (0..n)
                .map(|i| Artifact {
                    label: format!("a{i}"),
                    uri: format!("u{i}"),
                })
                .collect(),
        }
    }

    fn input() -> FormationInput {
        FormationInput {
            subject: "orbital sphere".into(),
            style: StyleParams {
                style: "chrome".into(),
                tier: Tier::Pro,
            },
        }
    }

    #[test]
    fn bundle_requires_both_halves() {
        assert!(Bundle::pair(Some(artifacts(2)), None, false).is_none());
        assert!(Bundle::pair(None, Some(timeline()), false).is_none());
        assert!(Bundle::pair(None, None, true).is_none());

        let bundle = Bundle::pair(Some(artifacts(2)), Some(timeline()), false).unwrap();
        assert_eq!(bundle.artifacts.len(), 2);
        assert!(!bundle.degraded);
    }

    #[test]
    fn outcome_messages() {
        let bundle = Bundle::pair(Some(artifacts(1)), Some(timeline()), true).unwrap();
        let ok = Outcome::success(bundle);
        assert!(ok.is_success());
        assert!(ok.message.contains("reduced"));

        let failed = Outcome::failure(FailureReason::Timeout);
        assert!(!failed.is_success());
        assert_eq!(failed.failure_reason(), Some(&FailureReason::Timeout));
        assert_eq!(failed.message, FailureReason::Timeout.user_message());
    }

    #[test]
    fn new_job_gets_fresh_id_and_prior_state() {
        let a = Job::new(input(), JobState::Convening);
        let b = Job::new(input(), JobState::Dormant);
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, Uuid::nil());
        assert_eq!(a.state, JobState::Convening);
        assert!(!a.resolved);
        assert!(a.outcome.is_none());
    }

    #[test]
    fn snapshot_exposes_bundle_only_on_success() {
        let mut job = Job::new(input(), JobState::Dormant);
        job.outcome = Some(Outcome::failure(FailureReason::IncompleteBundle));
        let snap = job.snapshot();
        assert!(snap.bundle.is_none());
        assert_eq!(snap.failure, Some(FailureReason::IncompleteBundle));
    }

    #[test]
    fn audit_record_from_job() {
        let mut job = Job::new(input(), JobState::Dormant);
        job.admitted_at = Some(Utc::now());
        job.outcome = Some(Outcome::failure(FailureReason::Timeout));
        job.fallback_active = true;

        let record = AuditRecord::from_job(&job);
        assert_eq!(record.job_id, job.id);
        assert_eq!(record.subject, "orbital sphere");
        assert_eq!(record.outcome, "Failed(Timeout)");
        assert!(record.fallback_active);
        assert_eq!(record.artifact_count, 0);
        assert_eq!(record.state_transitions, vec![JobState::Dormant]);
        assert!(record.duration_ms.unwrap() >= 0);
    }
}
