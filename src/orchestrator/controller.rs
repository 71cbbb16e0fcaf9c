use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::gate::ResolutionGate;
use super::pipeline::{PipelineReport, SynthesisPipeline};
use super::watchdog::Watchdog;
use crate::backend::{StyleParams, SynthesisBackend, SynthesisRequest};
use crate::config::FormationConfig;
use crate::error::{FailureReason, FormationError};
use crate::events::{EventKind, EventLog};
use crate::liveness::LivenessStore;
use crate::policy::{PolicyGuard, Verdict};
use crate::state_machine::{
    AuditRecord, Event, FormationInput, Job, JobSnapshot, JobState, Outcome, StateMachine,
    Transition,
};

const INTERRUPTED_NOTICE: &str = "The previous formation was interrupted before it finished.";

/// Per-job coordination objects. Dropped as soon as the job resolves.
struct Runtime {
    gate: Arc<ResolutionGate>,
    watchdog: Watchdog,
    cancel: CancellationToken,
}

/// The single live-job slot.
struct Slot {
    job: Job,
    runtime: Option<Runtime>,
}

struct Inner<B> {
    slot: Mutex<Slot>,
    policy: PolicyGuard,
    pipeline: SynthesisPipeline<B>,
    liveness: Arc<dyn LivenessStore>,
    events: Arc<dyn EventLog>,
    snapshots: watch::Sender<JobSnapshot>,
    deadline: Duration,
    success_display: Duration,
    failure_display: Duration,
    abandon_on_resolve: bool,
}

/// Drives formation jobs from admission to exactly one terminal outcome.
///
/// Cheap to clone; clones share the same live-job slot. Only one job may be
/// running at a time.
pub struct JobController<B> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for JobController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: SynthesisBackend> JobController<B> {
    /// Creates a controller. A persisted in-flight flag left by a previous
    /// process is cleared and surfaced as a dismissible notice.
    pub fn new(
        config: &FormationConfig,
        backend: Arc<B>,
        liveness: Arc<dyn LivenessStore>,
        events: Arc<dyn EventLog>,
    ) -> Self {
        let mut job = Job::dormant();
        if liveness.get() {
            warn!(target: "formation.controller", "found in-flight marker from a previous run");
            events.record(EventKind::Interrupted, "previous formation did not finish");
            liveness.set(false);
            job.message = Some(INTERRUPTED_NOTICE.to_string());
        }

        let (snapshots, _) = watch::channel(job.snapshot());
        let inner = Inner {
            slot: Mutex::new(Slot { job, runtime: None }),
            policy: PolicyGuard::from_terms(&config.doctrine),
            pipeline: SynthesisPipeline::new(backend, Arc::clone(&events)),
            liveness,
            events,
            snapshots,
            deadline: config.deadline(),
            success_display: config.success_display(),
            failure_display: config.failure_display(),
            abandon_on_resolve: config.abandon_on_resolve,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Submits a request. Must be called from within a tokio runtime.
    ///
    /// Returns the new job id; progress is observed through
    /// [`current_state`](Self::current_state) or [`subscribe`](Self::subscribe).
    /// Fails only with [`FormationError::AlreadyRunning`].
    pub fn submit(&self, raw_input: &str, style: StyleParams) -> Result<Uuid, FormationError> {
        let inner = &self.inner;
        let mut slot = inner.slot.lock();

        if !slot.job.state.accepts_submission() {
            let running = slot.job.id;
            inner
                .events
                .record(EventKind::AlreadyRunning, &format!("job {running}"));
            return Err(FormationError::AlreadyRunning(running));
        }

        let prior = match slot.job.state {
            JobState::Convening => JobState::Convening,
            _ => JobState::Dormant,
        };
        let input = FormationInput {
            subject: raw_input.trim().to_string(),
            style: style.clone(),
        };
        let mut job = Job::new(input, prior);
        let job_id = job.id;

        if let Verdict::Rejected { term, category } = inner.policy.validate(raw_input) {
            inner
                .events
                .record(EventKind::Rejected, &format!("job {job_id}: {category}"));
            StateMachine::next(
                &mut job,
                Event::Reject(FailureReason::ValidationRejected { term, category }),
            );
            slot.job = job;
            slot.runtime = None;
            self.publish(&slot);
            drop(slot);

            self.schedule_revert(job_id, inner.failure_display);
            return Ok(job_id);
        }

        let admitted_at = Utc::now();
        let deadline_at = chrono::Duration::from_std(inner.deadline)
            .ok()
            .and_then(|d| admitted_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        // Flag writes stay under the slot lock so they land in the same order
        // as the admissions and resolutions they mirror.
        inner.liveness.set(true);
        StateMachine::next(
            &mut job,
            Event::Admit {
                admitted_at,
                deadline_at,
            },
        );

        let gate = Arc::new(ResolutionGate::new(job_id));
        let cancel = CancellationToken::new();
        let watchdog = {
            let controller = self.clone();
            let gate = Arc::clone(&gate);
            Watchdog::arm(job_id, Instant::now() + inner.deadline, move |id| {
                controller
                    .inner
                    .events
                    .record(EventKind::WatchdogExpired, &format!("job {id}"));
                controller.settle(&gate, Outcome::failure(FailureReason::Timeout));
            })
        };

        slot.job = job;
        slot.runtime = Some(Runtime {
            gate: Arc::clone(&gate),
            watchdog,
            cancel: cancel.clone(),
        });
        self.publish(&slot);
        drop(slot);

        inner.events.record(
            EventKind::Admitted,
            &format!("job {job_id}: tier={} style={}", style.tier, style.style),
        );

        let request = SynthesisRequest::new(raw_input, &style);
        let controller = self.clone();
        tokio::spawn(async move {
            let report = controller
                .inner
                .pipeline
                .run(&request, &gate, &cancel, || controller.mark_fallback(job_id))
                .await;
            match report {
                PipelineReport::Complete(bundle) => {
                    controller.settle(&gate, Outcome::success(bundle));
                }
                PipelineReport::Incomplete => {
                    controller.settle(&gate, Outcome::failure(FailureReason::IncompleteBundle));
                }
                PipelineReport::Abandoned => {
                    debug!(target: "formation.controller", %job_id, "pipeline abandoned");
                }
            }
        });

        Ok(job_id)
    }

    /// Non-blocking read of the live job.
    pub fn current_state(&self) -> JobSnapshot {
        self.inner.slot.lock().job.snapshot()
    }

    /// Receives a new snapshot on every state change.
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Waits until `job_id` has left `Running`.
    pub async fn settled(&self, job_id: Uuid) -> JobSnapshot {
        let mut rx = self.subscribe();
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if snapshot.job_id == job_id && snapshot.state != JobState::Running {
                    return snapshot.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.current_state();
            }
        }
    }

    /// Marks the input as being composed (`Dormant -> Convening`).
    pub fn focus(&self) -> bool {
        let mut slot = self.inner.slot.lock();
        let moved = matches!(
            StateMachine::next(&mut slot.job, Event::Focus),
            Transition::Next(_)
        );
        if moved {
            self.publish(&slot);
        }
        moved
    }

    /// Clears the user-visible message without touching the state.
    pub fn dismiss_notice(&self) {
        let mut slot = self.inner.slot.lock();
        if slot.job.message.take().is_some() {
            self.publish(&slot);
        }
    }

    pub fn audit_record(&self) -> AuditRecord {
        AuditRecord::from_job(&self.inner.slot.lock().job)
    }

    /// Offers a terminal outcome to the job's gate. Only the first offer wins;
    /// every later one is logged and dropped.
    fn settle(&self, gate: &ResolutionGate, outcome: Outcome) -> bool {
        let inner = &self.inner;
        let job_id = gate.job_id();
        let offered = describe(&outcome);

        if !gate.resolve(job_id, outcome) {
            inner.events.record(
                EventKind::SupersededWrite,
                &format!("job {job_id}: dropped late {offered}"),
            );
            return false;
        }
        let Some(outcome) = gate.outcome().cloned() else {
            return false;
        };

        let mut slot = inner.slot.lock();
        if let Some(runtime) = slot.runtime.take_if(|r| r.gate.job_id() == job_id) {
            runtime.watchdog.disarm();
            if inner.abandon_on_resolve {
                runtime.cancel.cancel();
            }
        }
        // Under the lock: a resubmission cannot write `true` before this `false`.
        inner.liveness.set(false);

        if slot.job.id != job_id {
            warn!(target: "formation.controller", %job_id, "resolved job no longer occupies the slot");
            return true;
        }

        let display = if outcome.is_success() {
            inner.success_display
        } else {
            inner.failure_display
        };
        StateMachine::next(&mut slot.job, Event::Resolve(outcome));
        let record = AuditRecord::from_job(&slot.job);
        self.publish(&slot);
        drop(slot);

        info!(target: "formation.controller", %job_id, outcome = %offered, "job resolved");
        inner
            .events
            .record(EventKind::Resolved, &format!("job {job_id}: {offered}"));
        if let Ok(json) = serde_json::to_string(&record) {
            inner.events.record(EventKind::Audit, &json);
        }

        self.schedule_revert(job_id, display);
        true
    }

    fn mark_fallback(&self, job_id: Uuid) {
        let mut slot = self.inner.slot.lock();
        if slot.job.id == job_id && slot.job.state == JobState::Running {
            slot.job.fallback_active = true;
            self.publish(&slot);
        }
    }

    /// Independent display timer. Never touches the gate or the watchdog.
    fn schedule_revert(&self, job_id: Uuid, after: Duration) {
        let controller = self.clone();
        tokio::spawn(async move {
            sleep(after).await;
            let mut slot = controller.inner.slot.lock();
            if slot.job.id != job_id || !slot.job.state.is_terminal() {
                return;
            }
            StateMachine::next(&mut slot.job, Event::DisplayElapsed);
            controller.publish(&slot);
            drop(slot);
            controller
                .inner
                .events
                .record(EventKind::Reverted, &format!("job {job_id}"));
        });
    }

    fn publish(&self, slot: &Slot) {
        self.inner.snapshots.send_replace(slot.job.snapshot());
    }

    #[cfg(test)]
    fn live_gate(&self) -> Option<Arc<ResolutionGate>> {
        self.inner
            .slot
            .lock()
            .runtime
            .as_ref()
            .map(|r| Arc::clone(&r.gate))
    }
}

fn describe(outcome: &Outcome) -> String {
    match outcome.failure_reason() {
        None => "Success".to_string(),
        Some(reason) => format!("Failure({reason})"),
    }
}
