//! Request and payload types exchanged with a synthesis backend.
//!
//! All structs derive `Serialize` and `Deserialize` so the HTTP backend can
//! use them directly as JSON bodies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of stages every timeline structure must carry.
pub const TIMELINE_STAGES: usize = 3;

/// Fan-out used by the degraded producer regardless of tier.
pub const FALLBACK_FAN_OUT: u32 = 1;

/// Caller-selected quality tier. Controls primary fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Basic,
    Pro,
}

impl Tier {
    pub fn fan_out(self) -> u32 {
        match self {
            Tier::Basic => 1,
            Tier::Pro => 4,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Basic => write!(f, "basic"),
            Tier::Pro => write!(f, "pro"),
        }
    }
}

/// Style selector accompanying the free-text subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleParams {
    pub style: String,
    pub tier: Tier,
}

impl Default for StyleParams {
    fn default() -> Self {
        Self {
            style: "classic".to_string(),
            tier: Tier::Basic,
        }
    }
}

/// Body sent to every producer endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub subject: String,
    pub style: String,
    /// Number of artifacts requested. Ignored by the auxiliary producer.
    pub fan_out: u32,
}

impl SynthesisRequest {
    pub fn new(subject: &str, style: &StyleParams) -> Self {
        Self {
            subject: subject.trim().to_string(),
            style: style.style.clone(),
            fan_out: style.tier.fan_out(),
        }
    }

    /// Same request with the reduced fan-out of the degraded producer.
    pub fn degraded(&self) -> Self {
        Self {
            fan_out: FALLBACK_FAN_OUT,
            ..self.clone()
        }
    }
}

/// One opaque artifact payload. Its content lives behind `uri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub label: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSet {
    pub artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// One stage of the auxiliary timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineStage {
    pub title: String,
    pub period_label: String,
    pub narrative: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineStructure {
    pub stages: Vec<TimelineStage>,
}

impl TimelineStructure {
    /// A timeline is only usable with exactly [`TIMELINE_STAGES`] stages.
    pub fn is_well_formed(&self) -> bool {
        self.stages.len() == TIMELINE_STAGES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_fan_out() {
        assert_eq!(Tier::Basic.fan_out(), 1);
        assert_eq!(Tier::Pro.fan_out(), 4);
    }

    #[test]
    fn degraded_request_uses_single_artifact() {
        let style = StyleParams {
            style: "noir".into(),
            tier: Tier::Pro,
        };
        let req = SynthesisRequest::new("  levitating orbital sphere ", &style);
        assert_eq!(req.subject, "levitating orbital sphere");
        assert_eq!(req.fan_out, 4);

        let degraded = req.degraded();
        assert_eq!(degraded.fan_out, FALLBACK_FAN_OUT);
        assert_eq!(degraded.style, "noir");
    }

    #[test]
    fn tier_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Tier::Pro).unwrap(), r#""pro""#);
    }

    #[test]
    fn timeline_deserialize_from_api_format() {
        let json = r#"{"stages": [
            {"title": "Spark", "period_label": "Dawn", "narrative": "It begins.", "category": "origin"},
            {"title": "Rise", "period_label": "Noon", "narrative": "It grows.", "category": "growth"}
        ]}"#;
        let timeline: TimelineStructure = serde_json::from_str(json).unwrap();
        assert_eq!(timeline.stages[1].period_label, "Noon");
        assert!(!timeline.is_well_formed());
    }
}
