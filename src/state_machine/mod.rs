mod job;
mod state;

pub use job::{AuditRecord, Bundle, FormationInput, Job, JobSnapshot, Outcome};
pub use state::{Event, JobState, StateMachine, Transition};
