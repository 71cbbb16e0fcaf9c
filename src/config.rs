//! Formation configuration loaded from `formation.toml`.
//!
//! [`FormationConfig`] holds every tunable of the orchestrator. Fields missing
//! from the file fall back to defaults. `FORMATION_BACKEND_URL` takes precedence
//! over the file for the backend location.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::FormationError;
use crate::policy::DoctrineTerm;

/// Longest accepted deadline. Keeps `admitted_at + deadline` representable.
pub const MAX_DEADLINE_MS: u64 = 24 * 60 * 60 * 1000;

/// Top-level configuration loaded from `formation.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct FormationConfig {
    /// Hard wall-clock deadline from admission, shared by primary and fallback.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// How long a successful result stays on screen before reverting to dormant.
    #[serde(default = "default_success_display_ms")]
    pub success_display_ms: u64,

    /// How long a failure stays on screen before reverting to dormant.
    #[serde(default = "default_failure_display_ms")]
    pub failure_display_ms: u64,

    /// Abort in-flight producer calls once the job has been resolved.
    #[serde(default = "default_abandon_on_resolve")]
    pub abandon_on_resolve: bool,

    /// Where the in-flight flag is persisted.
    #[serde(default = "default_liveness_path")]
    pub liveness_path: PathBuf,

    /// Base URL of the HTTP synthesis backend. The simulated backend is used when unset.
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Ordered doctrine terms. Empty means the built-in doctrine.
    #[serde(default)]
    pub doctrine: Vec<DoctrineTerm>,
}

fn default_deadline_ms() -> u64 {
    20_000
}

fn default_success_display_ms() -> u64 {
    12_000
}

fn default_failure_display_ms() -> u64 {
    4_000
}

fn default_abandon_on_resolve() -> bool {
    true
}

fn default_liveness_path() -> PathBuf {
    PathBuf::from(".formation/liveness.json")
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            success_display_ms: default_success_display_ms(),
            failure_display_ms: default_failure_display_ms(),
            abandon_on_resolve: default_abandon_on_resolve(),
            liveness_path: default_liveness_path(),
            backend_url: None,
            doctrine: Vec::new(),
        }
    }
}

impl FormationConfig {
    /// Loads `formation.toml` from the current directory, or defaults if absent.
    pub fn load() -> Result<Self, FormationError> {
        Self::load_from(Path::new("formation.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self, FormationError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<FormationConfig>(&contents)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("FORMATION_BACKEND_URL")
            && !url.is_empty()
        {
            config.backend_url = Some(url);
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects a deadline of zero or longer than [`MAX_DEADLINE_MS`].
    ///
    /// Call again after applying command-line overrides.
    pub fn validate(&self) -> Result<(), FormationError> {
        if self.deadline_ms == 0 || self.deadline_ms > MAX_DEADLINE_MS {
            return Err(FormationError::Config(format!(
                "deadline_ms must be between 1 and {MAX_DEADLINE_MS}, got {}",
                self.deadline_ms
            )));
        }
        Ok(())
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn success_display(&self) -> Duration {
        Duration::from_millis(self.success_display_ms)
    }

    pub fn failure_display(&self) -> Duration {
        Duration::from_millis(self.failure_display_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = FormationConfig::default();
        assert_eq!(config.deadline(), Duration::from_secs(20));
        assert_eq!(config.failure_display_ms, 4_000);
        assert!(config.abandon_on_resolve);
        assert!(config.backend_url.is_none());
        assert!(config.doctrine.is_empty());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            deadline_ms = 5000
            abandon_on_resolve = false

            [[doctrine]]
            term = "dragon"
            category = "mythical hazards"
        "#;
        let config: FormationConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.deadline_ms, 5000);
        assert!(!config.abandon_on_resolve);
        assert_eq!(config.success_display_ms, 12_000);
        assert_eq!(config.doctrine.len(), 1);
        assert_eq!(config.doctrine[0].category, "mythical hazards");
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formation.toml");
        std::fs::write(&path, "failure_display_ms = 250\n").unwrap();

        let config = FormationConfig::load_from(&path).unwrap();
        assert_eq!(config.failure_display(), Duration::from_millis(250));
        assert_eq!(config.deadline_ms, 20_000);
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FormationConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.deadline_ms, 20_000);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formation.toml");
        std::fs::write(&path, "deadline_ms = \"soon\"\n").unwrap();
        let err = FormationConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, FormationError::Toml(_)));
    }

    #[test]
    fn out_of_range_deadline_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formation.toml");
        std::fs::write(&path, "deadline_ms = 0\n").unwrap();
        let err = FormationConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, FormationError::Config(_)));

        let config = FormationConfig {
            deadline_ms: u64::MAX,
            ..FormationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = FormationConfig {
            deadline_ms: MAX_DEADLINE_MS,
            ..FormationConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
