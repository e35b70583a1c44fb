mod chain;
mod gemini;
mod openai;

use thiserror::Error;

pub use chain::{validate_response, ProviderChain};
#[cfg(test)]
pub use chain::Provider;
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// One call to a hosted text model.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub prompt: String,
    /// Overrides the provider's own output budget when set.
    pub max_output_tokens: Option<u32>,
    pub temperature: f32,
    /// Ask for live web search when the provider supports it.
    pub grounding: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_output_tokens: None,
            temperature: 0.7,
            grounding: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("response rejected: {0}")]
    Rejected(String),

    #[error("timed out")]
    Timeout,

    #[error("all providers failed: {}", describe_failures(.0))]
    Exhausted(Vec<ProviderFailure>),
}

impl GenerationError {
    /// Only a fully exhausted chain ends a run; single-provider errors are
    /// handled by moving on to the next provider.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GenerationError::Exhausted(_))
    }
}

#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: GenerationError,
}

fn describe_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.provider, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}
