//! Local captioning model served over an Ollama-compatible API

use std::time::Duration;

use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::error::GenerationError;
use super::{GenerationRequest, TextGenerator};

/// Default endpoint of a local Ollama server
pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:11434";

/// Default local model
pub const DEFAULT_LOCAL_MODEL: &str = "llama3.2";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Sends prompts to a locally hosted model
#[derive(Debug, Clone)]
pub struct LocalCaptioner {
    client: ReqwestClient,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl LocalCaptioner {
    /// Create a captioner for `endpoint` running `model`
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: ReqwestClient::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout,
        }
    }

    /// Model name sent with every request
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextGenerator for LocalCaptioner {
    #[instrument(skip(self, request), fields(image_url = %request.image_url))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.endpoint);
        debug!("Sending prompt to local model {} at {}", self.model, url);

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&GenerateRequest {
                model: &self.model,
                prompt: &request.prompt,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::InvalidResponse(format!(
                "local model returned {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.response)
    }
}
