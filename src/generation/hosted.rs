//! Hosted LLM providers
//!
//! Prompts go through a `rig` agent whose completion model is wrapped in a
//! client-side rate limiter. Each prompt is bounded by a timeout and retried
//! according to a [`RetryPolicy`].

use std::fmt;
use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rig::agent::{Agent, AgentBuilder};
use rig::completion::{
    CompletionError, CompletionModel, CompletionRequest, CompletionResponse, Prompt, PromptError,
};
use rig::providers::{gemini, openai};
use tracing::{Instrument, debug_span, info, info_span, instrument};

use super::error::GenerationError;
use super::retry::RetryPolicy;
use super::{GenerationRequest, TextGenerator};

/// Gemini model used for alt text
pub const GEMINI_MODEL: &str = "gemini-2.0-flash";

/// OpenAI model used for alt text
pub const OPENAI_MODEL: &str = "gpt-4o-mini";

/// Requests per minute allowed by the client-side limiter
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

/// System preamble given to hosted models
pub const PREAMBLE: &str = "You write concise, accurate alternative text for web images \
following WCAG 1.1.1. Answer with the alternative text only.";

/// Hosted model vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Google Gemini
    Gemini,
    /// OpenAI
    OpenAi,
}

impl Provider {
    /// Environment variable holding the provider API key
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::OpenAi => write!(f, "openai"),
        }
    }
}

/// Completion model that waits for a slot in a per-minute quota before every
/// request
#[derive(Clone)]
pub struct RateLimitedCompletionModel<M: CompletionModel> {
    inner: M,
    quota: Arc<DefaultDirectRateLimiter>,
}

impl<M: CompletionModel> RateLimitedCompletionModel<M> {
    /// Wrap `inner`, allowing `requests_per_minute` completions
    pub fn per_minute(inner: M, requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            inner,
            quota: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
        }
    }

    /// Agent answering with alt text only
    fn alt_text_agent(self) -> Agent<Self> {
        AgentBuilder::new(self).preamble(PREAMBLE).build()
    }
}

impl<M: CompletionModel> CompletionModel for RateLimitedCompletionModel<M> {
    type Response = M::Response;

    async fn completion(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        self.quota.until_ready().instrument(debug_span!("quota")).await;
        self.inner
            .completion(request)
            .instrument(info_span!("alt_text_completion"))
            .await
    }
}

/// Boxed future returned by [`PromptAgent`]
pub type PromptFuture<'a> = Pin<Box<dyn Future<Output = Result<String, PromptError>> + Send + 'a>>;

/// Anything that answers a text prompt
pub trait PromptAgent: Send + Sync {
    /// Send one prompt and return the model's answer
    fn prompt_text<'a>(&'a self, prompt: &'a str) -> PromptFuture<'a>;
}

impl<M: CompletionModel> PromptAgent for Agent<M> {
    fn prompt_text<'a>(&'a self, prompt: &'a str) -> PromptFuture<'a> {
        Box::pin(Prompt::prompt(self, prompt))
    }
}

/// Client for a hosted LLM provider
#[derive(Clone)]
pub struct HostedLlmClient {
    provider: Provider,
    agent: Arc<dyn PromptAgent>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl fmt::Debug for HostedLlmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedLlmClient")
            .field("provider", &self.provider)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HostedLlmClient {
    /// Gemini client with the default quota
    pub fn gemini(api_key: &str, timeout: Duration) -> Self {
        let model = gemini::Client::new(api_key).completion_model(GEMINI_MODEL);
        let agent = RateLimitedCompletionModel::per_minute(model, DEFAULT_REQUESTS_PER_MINUTE)
            .alt_text_agent();
        Self::with_agent(Provider::Gemini, Arc::new(agent), timeout)
    }

    /// OpenAI client with the default quota
    pub fn openai(api_key: &str, timeout: Duration) -> Self {
        let model = openai::Client::new(api_key).completion_model(OPENAI_MODEL);
        let agent = RateLimitedCompletionModel::per_minute(model, DEFAULT_REQUESTS_PER_MINUTE)
            .alt_text_agent();
        Self::with_agent(Provider::OpenAi, Arc::new(agent), timeout)
    }

    /// Client around any prompt agent
    pub fn with_agent(provider: Provider, agent: Arc<dyn PromptAgent>, timeout: Duration) -> Self {
        Self {
            provider,
            agent,
            retry: RetryPolicy::default(),
            timeout,
        }
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Provider behind this client
    pub fn provider(&self) -> Provider {
        self.provider
    }

    async fn prompt_once(&self, prompt: &str) -> Result<String, GenerationError> {
        match tokio::time::timeout(self.timeout, self.agent.prompt_text(prompt)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(GenerationError::Prompt(e.to_string())),
            Err(_) => Err(GenerationError::Timeout(self.timeout)),
        }
    }
}

impl TextGenerator for HostedLlmClient {
    #[instrument(skip(self, request), fields(provider = %self.provider, image_url = %request.image_url))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let prompt = request.prompt.as_str();
        let text = self
            .retry
            .run(move |attempt| {
                if attempt > 1 {
                    info!("Retrying {} request, attempt {}", self.provider, attempt);
                }
                self.prompt_once(prompt)
            })
            .await?;
        Ok(text)
    }
}
