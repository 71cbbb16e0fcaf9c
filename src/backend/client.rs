use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::SynthesisBackend;
use super::error::BackendError;
use super::types::{ArtifactSet, SynthesisRequest, TimelineStructure};

const PRIMARY_PATH: &str = "/v1/primary";
const FALLBACK_PATH: &str = "/v1/fallback";
const AUXILIARY_PATH: &str = "/v1/auxiliary";

/// Synthesis backend reached over HTTP with JSON bodies.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        // The watchdog owns the real deadline; this only bounds a hung socket.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        req: &SynthesisRequest,
    ) -> Result<T, BackendError> {
        let url = format!("{}{path}", self.base_url);
        debug!(target: "formation.backend", %url, fan_out = req.fan_out, "post");

        let response = self.client.post(&url).json(req).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| BackendError::Malformed(format!("{path}: undecodable body: {e}")))
    }
}

impl SynthesisBackend for HttpBackend {
    async fn synthesize_primary(&self, req: &SynthesisRequest) -> Result<ArtifactSet, BackendError> {
        self.post(PRIMARY_PATH, req).await
    }

    async fn synthesize_fallback(
        &self,
        req: &SynthesisRequest,
    ) -> Result<ArtifactSet, BackendError> {
        self.post(FALLBACK_PATH, req).await
    }

    async fn synthesize_auxiliary(
        &self,
        req: &SynthesisRequest,
    ) -> Result<TimelineStructure, BackendError> {
        self.post(AUXILIARY_PATH, req).await
    }
}
