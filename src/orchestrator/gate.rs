use std::sync::OnceLock;

use uuid::Uuid;

use crate::state_machine::Outcome;

/// Accept-once arbiter for a single job's terminal outcome.
///
/// One gate exists per job. The pipeline and the watchdog race to call
/// [`resolve`](Self::resolve); the first call stores its outcome and every
/// later call, or any call carrying another job's id, is refused without
/// touching the stored value. The check and the write are a single
/// `OnceLock::set`, never a separate read followed by a write.
#[derive(Debug)]
pub struct ResolutionGate {
    job_id: Uuid,
    outcome: OnceLock<Outcome>,
}

impl ResolutionGate {
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            outcome: OnceLock::new(),
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Returns `true` only for the call whose outcome was stored.
    pub fn resolve(&self, job_id: Uuid, outcome: Outcome) -> bool {
        if job_id != self.job_id {
            return false;
        }
        self.outcome.set(outcome).is_ok()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.get().is_some()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.get()
    }
}
