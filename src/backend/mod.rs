pub mod client;
pub mod error;
pub mod simulated;
#[cfg(test)]
pub mod testing;
pub mod types;

use std::future::Future;

pub use client::HttpBackend;
pub use error::BackendError;
pub use simulated::SimulatedBackend;
pub use types::{Artifact, ArtifactSet, StyleParams, SynthesisRequest, Tier, TimelineStructure};

/// The three producers a formation needs.
///
/// Each call may fail; the synthesis pipeline converts failures to absent
/// results at its producer boundary so nothing propagates further.
pub trait SynthesisBackend: Send + Sync + 'static {
    /// Full-fidelity artifact synthesis, `req.fan_out` artifacts.
    fn synthesize_primary(
        &self,
        req: &SynthesisRequest,
    ) -> impl Future<Output = Result<ArtifactSet, BackendError>> + Send;

    /// Degraded, lower-fidelity synthesis. Always a single artifact.
    fn synthesize_fallback(
        &self,
        req: &SynthesisRequest,
    ) -> impl Future<Output = Result<ArtifactSet, BackendError>> + Send;

    /// Timeline of three stages describing the subject.
    fn synthesize_auxiliary(
        &self,
        req: &SynthesisRequest,
    ) -> impl Future<Output = Result<TimelineStructure, BackendError>> + Send;
}
