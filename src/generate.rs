//! Generation provider abstraction and implementations.
//!
//! Defines the [`GenerationProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]** — returns errors; used when generation is not configured.
//! - **[`OpenAIProvider`]** — calls the OpenAI chat completions API with retry and backoff.
//!
//! The composer treats any error from this module as
//! `GenerationUnavailable` and switches to its deterministic template
//! path, so a missing key, quota error, or timeout can never surface to
//! the pipeline caller.
//!
//! # Retry Strategy
//!
//! The OpenAI provider uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s (capped at 2^3)

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::GenerationConfig;

/// Tunable parameters applied to every generative call. Adjusted over
/// time by the parameter tuner; defaults match the untuned system.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_tokens: u32,
    pub response_detail_level: f64,
    pub confidence_threshold: f64,
    pub context_window: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 200,
            response_detail_level: 1.0,
            confidence_threshold: 0.8,
            context_window: 3,
        }
    }
}

/// Trait for generation providers.
///
/// Carries provider metadata; the actual call is performed by
/// [`generate_text`], dispatching on the config's `provider` field.
pub trait GenerationProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;
}

/// Generate a response for a prompt using the configured provider.
///
/// # Errors
///
/// - `"disabled"` provider: always returns an error.
/// - `"openai"` provider: returns an error if the API key is missing,
///   the API returns a non-retryable error, or all retries are exhausted.
pub async fn generate_text(
    _provider: &dyn GenerationProvider,
    config: &GenerationConfig,
    params: &GenerationParams,
    system_prompt: &str,
    user_query: &str,
) -> Result<String> {
    match config.provider.as_str() {
        "openai" => generate_openai(config, params, system_prompt, user_query).await,
        "disabled" => bail!("Generation provider is disabled"),
        other => bail!("Unknown generation provider: {}", other),
    }
}

// ============ Disabled Provider ============

/// A no-op generation provider that always returns errors.
pub struct DisabledProvider;

impl GenerationProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
}

// ============ OpenAI Provider ============

/// Generation provider using the OpenAI chat completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAIProvider {
    model: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` is not set in config or if
    /// `OPENAI_API_KEY` is not in the environment.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.model required for OpenAI provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        Ok(Self { model })
    }
}

impl GenerationProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Call the OpenAI chat completions API with retry/backoff.
async fn generate_openai(
    config: &GenerationConfig,
    params: &GenerationParams,
    system_prompt: &str,
    user_query: &str,
) -> Result<String> {
    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let model = config
        .model
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("generation.model required"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": user_query }
        ],
        "max_tokens": params.max_tokens,
        "temperature": params.temperature,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(3));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_openai_response(&json);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "OpenAI API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                bail!("OpenAI API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
}

/// Extract the first completion's message content.
fn parse_openai_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))?;

    let trimmed = content.trim();
    if trimmed.is_empty() {
        bail!("OpenAI response was empty");
    }
    Ok(trimmed.to_string())
}

/// Create the appropriate [`GenerationProvider`] based on configuration.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
pub fn create_provider(config: &GenerationConfig) -> Result<Box<dyn GenerationProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}
