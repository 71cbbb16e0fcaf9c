//! Fire-and-forget diagnostic sink.

use std::fmt;

#[cfg(test)]
use parking_lot::Mutex;

/// Kinds of diagnostic events recorded by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Admitted,
    Rejected,
    AlreadyRunning,
    ProducerFailed,
    FallbackEntered,
    WatchdogExpired,
    Resolved,
    SupersededWrite,
    Reverted,
    Interrupted,
    Audit,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Admitted => "admitted",
            EventKind::Rejected => "rejected",
            EventKind::AlreadyRunning => "already_running",
            EventKind::ProducerFailed => "producer_failed",
            EventKind::FallbackEntered => "fallback_entered",
            EventKind::WatchdogExpired => "watchdog_expired",
            EventKind::Resolved => "resolved",
            EventKind::SupersededWrite => "superseded_write",
            EventKind::Reverted => "reverted",
            EventKind::Interrupted => "interrupted",
            EventKind::Audit => "audit",
        };
        f.write_str(name)
    }
}

/// Diagnostic sink. Implementations must never block or fail.
pub trait EventLog: Send + Sync {
    fn record(&self, kind: EventKind, detail: &str);
}

/// Forwards events to `tracing` under the `formation.events` target.
#[derive(Debug, Default)]
pub struct TracingEventLog;

impl EventLog for TracingEventLog {
    fn record(&self, kind: EventKind, detail: &str) {
        match kind {
            EventKind::ProducerFailed | EventKind::Interrupted => {
                tracing::warn!(target: "formation.events", %kind, detail)
            }
            EventKind::SupersededWrite | EventKind::Audit => {
                tracing::debug!(target: "formation.events", %kind, detail)
            }
            _ => tracing::info!(target: "formation.events", %kind, detail),
        }
    }
}

/// Keeps every event in memory. Used by tests to assert on side effects.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<(EventKind, String)>>,
}

#[cfg(test)]
impl MemoryEventLog {
    pub fn events(&self) -> Vec<(EventKind, String)> {
        self.events.lock().clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|(k, _)| *k == kind).count()
    }
}

#[cfg(test)]
impl EventLog for MemoryEventLog {
    fn record(&self, kind: EventKind, detail: &str) {
        self.events.lock().push((kind, detail.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_log_counts_by_kind() {
        let log = MemoryEventLog::default();
        log.record(EventKind::Admitted, "job a");
        log.record(EventKind::SupersededWrite, "late");
        log.record(EventKind::SupersededWrite, "later");

        assert_eq!(log.count(EventKind::SupersededWrite), 2);
        assert_eq!(log.count(EventKind::Resolved), 0);
        assert_eq!(log.events()[0], (EventKind::Admitted, "job a".to_string()));
    }

    #[test]
    fn kind_display() {
        assert_eq!(EventKind::SupersededWrite.to_string(), "superseded_write");
        assert_eq!(EventKind::WatchdogExpired.to_string(), "watchdog_expired");
    }
}
