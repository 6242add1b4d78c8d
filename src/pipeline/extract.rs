//! Vision extraction: one request to an OpenAI-compatible multimodal API.
//!
//! The service treats the model as an opaque transcription engine: one
//! image and one fixed instruction go out, raw text comes back verbatim.
//! Nothing is retried — a transient upstream failure fails the request and
//! the client decides whether to resubmit. The reply's CSV shape is the
//! model's contract to honour; it is not validated here.
//!
//! [`VisionExtractor`] is the seam the orchestrator depends on, so tests
//! drive the full request lifecycle against a stub without a network.

use crate::config::ServiceConfig;
use crate::error::MtoError;
use crate::pipeline::encode;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// An engine that turns a crop image plus instruction into reply text.
#[async_trait]
pub trait VisionExtractor: Send + Sync {
    /// Extract text from the image at `image_path` following `prompt`.
    ///
    /// Implementations must verify the image before any network I/O.
    async fn extract(&self, image_path: &Path, prompt: &str) -> Result<String, MtoError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiVisionClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    max_reply_tokens: usize,
}

impl OpenAiVisionClient {
    /// Build a client from the service configuration.
    ///
    /// The per-call timeout is baked into the underlying `reqwest` client;
    /// a stalled upstream surfaces as an extraction failure instead of
    /// pinning the worker indefinitely.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, MtoError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| MtoError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_reply_tokens: config.max_reply_tokens,
        })
    }
}

#[async_trait]
impl VisionExtractor for OpenAiVisionClient {
    async fn extract(&self, image_path: &Path, prompt: &str) -> Result<String, MtoError> {
        // Fails before any network call if the crop is missing or not a PNG.
        let data_uri = encode::encode_png_data_uri(image_path)?;

        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": data_uri } },
                ],
            }],
            "max_tokens": self.max_reply_tokens,
        });

        let url = format!("{}/chat/completions", self.api_base);
        debug!(model = %self.model, "Sending crop to vision API");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MtoError::ExtractionRequestFailed {
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MtoError::ExtractionApiError {
                status: status.as_u16(),
                detail,
            });
        }

        let reply: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| MtoError::ExtractionRequestFailed {
                    detail: format!("malformed reply body: {e}"),
                })?;

        let content = reply["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(MtoError::EmptyExtractionReply)?;

        info!("Vision API replied with {} bytes", content.len());
        Ok(content.to_string())
    }
}
