use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::{Job, Outcome};
use crate::error::FailureReason;

/// The five states of a formation job.
///
/// ```text
/// Dormant/Convening --admit--> Running --resolve--> Succeeded | Failed
/// Dormant/Convening --reject--> Failed
/// Succeeded/Failed --display elapsed--> Dormant
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Dormant,
    /// The user is composing a request. No concurrency semantics.
    Convening,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// States from which a new submission may start.
    pub fn accepts_submission(self) -> bool {
        !matches!(self, JobState::Running)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Dormant => write!(f, "DORMANT"),
            JobState::Convening => write!(f, "CONVENING"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Succeeded => write!(f, "SUCCEEDED"),
            JobState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone)]
pub enum Event {
    Focus,
    Admit {
        admitted_at: DateTime<Utc>,
        deadline_at: DateTime<Utc>,
    },
    Reject(FailureReason),
    Resolve(Outcome),
    DisplayElapsed,
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::Focus => "focus",
            Event::Admit { .. } => "admit",
            Event::Reject(_) => "reject",
            Event::Resolve(_) => "resolve",
            Event::DisplayElapsed => "display_elapsed",
        }
    }
}

/// The result of evaluating an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Next(JobState),
    /// The event does not apply in the current state. The job is untouched.
    Invalid { from: JobState, event: &'static str },
}

/// Applies events to a [`Job`].
pub struct StateMachine;

impl StateMachine {
    pub fn next(job: &mut Job, event: Event) -> Transition {
        use JobState::*;

        let target = match (job.state, &event) {
            (Dormant, Event::Focus) => Convening,
            (s, Event::Admit { .. }) if s.accepts_submission() => Running,
            (s, Event::Reject(_)) if s.accepts_submission() => Failed,
            (Running, Event::Resolve(outcome)) if outcome.is_success() => Succeeded,
            (Running, Event::Resolve(_)) => Failed,
            (Succeeded | Failed, Event::DisplayElapsed) => Dormant,
            (from, event) => {
                return Transition::Invalid {
                    from,
                    event: event.name(),
                };
            }
        };

        match event {
            Event::Admit {
                admitted_at,
                deadline_at,
            } => {
                job.admitted_at = Some(admitted_at);
                job.deadline_at = Some(deadline_at);
            }
            Event::Reject(reason) => {
                let outcome = Outcome::failure(reason);
                job.message = Some(outcome.message.clone());
                job.outcome = Some(outcome);
                job.resolved = true;
            }
            Event::Resolve(outcome) => {
                job.message = Some(outcome.message.clone());
                job.outcome = Some(outcome);
                job.resolved = true;
            }
            Event::DisplayElapsed => {
                // The bundle goes away with the display; the notice stays until dismissed.
                job.outcome = None;
            }
            Event::Focus => {}
        }

        job.state_history.push(job.state);
        job.state = target;
        Transition::Next(target)
    }
}
