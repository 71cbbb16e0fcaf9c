use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced to callers of the orchestrator and the CLI.
///
/// Job failures are never reported through this type; they become a terminal
/// `Failed` state carrying a [`FailureReason`].
#[derive(Debug, Error)]
pub enum FormationError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("A formation is already running (job {0})")]
    AlreadyRunning(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Why a job ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The doctrine check vetoed the request before any work started.
    ValidationRejected { term: String, category: String },
    /// Neither the primary nor the fallback attempt produced a complete pair.
    IncompleteBundle,
    /// The watchdog fired before the pipeline reported.
    Timeout,
}

impl FailureReason {
    /// Message shown to the end user. Internal distinctions between
    /// `IncompleteBundle` and `Timeout` stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            FailureReason::ValidationRejected { category, .. } => {
                format!("Request rejected: it touches on {category}.")
            }
            FailureReason::IncompleteBundle | FailureReason::Timeout => {
                "The formation could not be completed. Please try again.".to_string()
            }
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::ValidationRejected { term, category } => {
                write!(f, "ValidationRejected({category}: {term})")
            }
            FailureReason::IncompleteBundle => write!(f, "IncompleteBundle"),
            FailureReason::Timeout => write!(f, "Timeout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_hides_internal_distinction() {
        assert_eq!(
            FailureReason::IncompleteBundle.user_message(),
            FailureReason::Timeout.user_message()
        );
    }

    #[test]
    fn user_message_names_category() {
        let reason = FailureReason::ValidationRejected {
            term: "bomb".into(),
            category: "weapons".into(),
        };
        assert_eq!(reason.user_message(), "Request rejected: it touches on weapons.");
        assert_eq!(reason.to_string(), "ValidationRejected(weapons: bomb)");
    }

    #[test]
    fn config_error_display() {
        let err = FormationError::Config("deadline_ms must be positive".into());
        assert_eq!(err.to_string(), "Config error: deadline_ms must be positive");
    }

    #[test]
    fn already_running_display() {
        let id = Uuid::nil();
        let err = FormationError::AlreadyRunning(id);
        assert_eq!(
            err.to_string(),
            format!("A formation is already running (job {id})")
        );
    }
}
