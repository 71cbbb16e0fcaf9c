//! Persisted "a job is in flight" flag.
//!
//! Only the job controller writes it: `true` on admission, `false` when the
//! resolution gate accepts an outcome. The file-backed store survives process
//! restarts, which lets the controller detect a job interrupted by a crash.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
#[cfg(test)]
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub trait LivenessStore: Send + Sync {
    fn set(&self, in_flight: bool);
    fn get(&self) -> bool;
}

#[derive(Debug, Serialize, Deserialize)]
struct LivenessRecord {
    in_flight: bool,
    updated_at: DateTime<Utc>,
}

/// Stores the flag as a small JSON document.
///
/// I/O failures are logged and otherwise ignored; a broken disk must not
/// change the outcome of a job.
#[derive(Debug)]
pub struct FileLivenessStore {
    path: PathBuf,
}

impl FileLivenessStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, in_flight: bool) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let record = LivenessRecord {
            in_flight,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&record)?;
        // Write-then-rename so a crash never leaves a torn file behind.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl LivenessStore for FileLivenessStore {
    fn set(&self, in_flight: bool) {
        if let Err(e) = self.write(in_flight) {
            warn!(target: "formation.liveness", path = %self.path.display(), error = %e, "failed to persist liveness flag");
        }
    }

    fn get(&self) -> bool {
        let Ok(bytes) = std::fs::read(&self.path) else {
            return false;
        };
        match serde_json::from_slice::<LivenessRecord>(&bytes) {
            Ok(record) => record.in_flight,
            Err(e) => {
                warn!(target: "formation.liveness", path = %self.path.display(), error = %e, "unreadable liveness file");
                false
            }
        }
    }
}

/// In-process store that also remembers every write.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryLivenessStore {
    writes: Mutex<Vec<bool>>,
}

#[cfg(test)]
impl MemoryLivenessStore {
    /// Starts with a persisted `true`, as if the last process died mid-job.
    pub fn interrupted() -> Self {
        Self {
            writes: Mutex::new(vec![true]),
        }
    }

    pub fn writes(&self) -> Vec<bool> {
        self.writes.lock().clone()
    }
}

#[cfg(test)]
impl LivenessStore for MemoryLivenessStore {
    fn set(&self, in_flight: bool) {
        self.writes.lock().push(in_flight);
    }

    fn get(&self) -> bool {
        self.writes.lock().last().copied().unwrap_or(false)
    }
}
