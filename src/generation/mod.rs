//! Alt text generation
//!
//! A [`GenerationBackend`] is chosen once at startup and handed to the CSV
//! batch runner. Backends that need credentials fail at construction when
//! the credential is missing, so a run never starts half-configured.
//!
//! ## Backends
//!
//! - [`LocalCaptioner`]: a model served by a local Ollama-compatible server
//! - [`HostedLlmClient`]: Gemini or OpenAI through `rig`, rate limited and retried
//! - [`OcrExtractor`]: text found in the image, read by tesseract

mod batch;
mod error;
mod hosted;
mod local;
mod ocr;
mod prompt;
mod retry;

pub use batch::{
    CrawlInputRow, DEFAULT_INSTRUCTIONS, GENERATED_COLUMN, GenerationSummary, MISSING_IMAGE_URL,
    generate_csv, output_path,
};
pub use error::GenerationError;
pub use hosted::{
    DEFAULT_REQUESTS_PER_MINUTE, GEMINI_MODEL, HostedLlmClient, OPENAI_MODEL, PromptAgent,
    PromptFuture, Provider, RateLimitedCompletionModel,
};
pub use local::{DEFAULT_LOCAL_ENDPOINT, DEFAULT_LOCAL_MODEL, LocalCaptioner};
pub use ocr::OcrExtractor;
pub use prompt::{UNHELPFUL_PHRASES, build_prompt, post_process};
pub use retry::{Backoff, RetryPolicy};

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Timeout for a single generation call
pub const GENERATION_TIMEOUT: Duration = Duration::from_secs(90);

/// Environment variable overriding the local endpoint
pub const LOCAL_ENDPOINT_VAR: &str = "ALT_SCAN_LOCAL_ENDPOINT";

/// Environment variable overriding the local model
pub const LOCAL_MODEL_VAR: &str = "ALT_SCAN_LOCAL_MODEL";

/// Input for one generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Image being described
    pub image_url: String,

    /// Full prompt for text models
    pub prompt: String,
}

/// Produces alt text for one image
pub trait TextGenerator {
    /// Generate text for the request
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// Which backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendKind {
    /// Local captioning model
    Local,
    /// Google Gemini
    Gemini,
    /// OpenAI
    #[value(name = "openai")]
    OpenAi,
    /// Tesseract OCR
    Ocr,
}

/// The selected generation backend
#[derive(Debug, Clone)]
pub enum GenerationBackend {
    /// Local captioning model
    Local(LocalCaptioner),

    /// Hosted LLM
    Hosted(HostedLlmClient),

    /// Text recognition
    Ocr(OcrExtractor),
}

impl GenerationBackend {
    /// Build a backend from the process environment
    pub fn from_env(kind: BackendKind) -> Result<Self, GenerationError> {
        Self::build(kind, |name| std::env::var(name).ok())
    }

    /// Build a backend reading settings through `lookup`
    ///
    /// Only the credential of the selected backend is required.
    pub fn build(
        kind: BackendKind,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, GenerationError> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let backend = match kind {
            BackendKind::Local => GenerationBackend::Local(LocalCaptioner::new(
                lookup(LOCAL_ENDPOINT_VAR).unwrap_or_else(|| DEFAULT_LOCAL_ENDPOINT.to_string()),
                lookup(LOCAL_MODEL_VAR).unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string()),
                GENERATION_TIMEOUT,
            )),
            BackendKind::Gemini => {
                let key = require(&lookup, Provider::Gemini.api_key_var())?;
                GenerationBackend::Hosted(HostedLlmClient::gemini(&key, GENERATION_TIMEOUT))
            }
            BackendKind::OpenAi => {
                let key = require(&lookup, Provider::OpenAi.api_key_var())?;
                GenerationBackend::Hosted(HostedLlmClient::openai(&key, GENERATION_TIMEOUT))
            }
            BackendKind::Ocr => GenerationBackend::Ocr(OcrExtractor::new(GENERATION_TIMEOUT)),
        };
        Ok(backend)
    }
}

fn require(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Result<String, GenerationError> {
    lookup(name).ok_or_else(|| GenerationError::MissingCredential(name.to_string()))
}

impl fmt::Display for GenerationBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationBackend::Local(local) => write!(f, "local ({})", local.model()),
            GenerationBackend::Hosted(hosted) => write!(f, "{}", hosted.provider()),
            GenerationBackend::Ocr(_) => write!(f, "ocr"),
        }
    }
}

impl TextGenerator for GenerationBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        match self {
            GenerationBackend::Local(local) => local.generate(request).await.map(|t| post_process(&t)),
            GenerationBackend::Hosted(hosted) => {
                hosted.generate(request).await.map(|t| post_process(&t))
            }
            GenerationBackend::Ocr(ocr) => ocr.generate(request).await,
        }
    }
}
