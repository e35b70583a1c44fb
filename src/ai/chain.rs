use std::time::Duration;

use tokio::time::Instant;

use crate::config::Config;
use crate::error::{AppError, Result};

use super::{GeminiClient, GenerationError, GenerationRequest, OpenAiClient, ProviderFailure};

/// Shortest response that can plausibly be a whole newsletter.
const MIN_PLAUSIBLE_LEN: usize = 500;

pub enum Provider {
    Gemini(GeminiClient),
    OpenAi(OpenAiClient),
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini(_) => "gemini",
            Provider::OpenAi(_) => "openai",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::Gemini(client) => client.model(),
            Provider::OpenAi(client) => client.model(),
        }
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, GenerationError> {
        match self {
            Provider::Gemini(client) => client.generate(request).await,
            Provider::OpenAi(client) => client.generate(request).await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub text: String,
    pub provider: &'static str,
}

/// Providers tried in order under one shared deadline.
pub struct ProviderChain {
    providers: Vec<Provider>,
    budget: Duration,
}

impl ProviderChain {
    pub fn new(providers: Vec<Provider>, budget: Duration) -> Result<Self> {
        if providers.is_empty() {
            return Err(AppError::Config(
                "at least one generation provider is required".to_string(),
            ));
        }
        Ok(Self { providers, budget })
    }

    /// Gemini is required; OpenAI joins the chain only when a key is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let gemini_key = config
            .gemini_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AppError::MissingCredential("gemini_api_key"))?;

        let http_timeout = Duration::from_secs(config.generation_timeout_secs);
        let mut providers = vec![Provider::Gemini(GeminiClient::new(
            gemini_key,
            config.gemini_model.clone(),
            config.gemini_base_url.clone(),
            config.primary_max_tokens,
            http_timeout,
        )?)];

        match config.openai_api_key.clone().filter(|k| !k.trim().is_empty()) {
            Some(key) => providers.push(Provider::OpenAi(OpenAiClient::new(
                key,
                config.openai_model.clone(),
                config.openai_base_url.clone(),
                config.fallback_max_tokens,
                http_timeout,
            )?)),
            None => tracing::info!("no OpenAI key configured, running without a fallback provider"),
        }

        Self::new(providers, Duration::from_secs(config.generation_timeout_secs))
    }

    pub fn primary(&self) -> &Provider {
        &self.providers[0]
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<Generated, GenerationError> {
        let deadline = Instant::now() + self.budget;
        let mut failures = Vec::new();

        for provider in &self.providers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                failures.push(ProviderFailure {
                    provider: provider.name().to_string(),
                    error: GenerationError::Timeout,
                });
                continue;
            }

            tracing::info!(provider = provider.name(), model = provider.model(), "generating");

            let outcome = match tokio::time::timeout(remaining, provider.generate(request)).await {
                Ok(Ok(text)) => validate_response(&text).map(|()| text),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(GenerationError::Timeout),
            };

            match outcome {
                Ok(text) => {
                    return Ok(Generated {
                        text,
                        provider: provider.name(),
                    })
                }
                Err(error) => {
                    tracing::warn!(provider = provider.name(), %error, "provider failed");
                    failures.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        error,
                    });
                }
            }
        }

        Err(GenerationError::Exhausted(failures))
    }
}

/// Accepts a model response unless it is empty or looks like an error page
/// served in place of content.
pub fn validate_response(text: &str) -> std::result::Result<(), GenerationError> {
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    if looks_like_error_page(text) {
        return Err(GenerationError::Rejected(
            "response looks like an HTML error page".to_string(),
        ));
    }
    Ok(())
}

pub fn looks_like_error_page(text: &str) -> bool {
    let trimmed = text.trim_start();
    let head: String = trimmed.chars().take(16).collect::<String>().to_lowercase();
    let is_document = head.starts_with("<!doctype html") || head.starts_with("<html");
    if !is_document {
        return false;
    }
    trimmed.to_lowercase().contains("error") || trimmed.len() < MIN_PLAUSIBLE_LEN
}
