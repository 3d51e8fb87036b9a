//! LLM provider abstraction: one trait, two wire formats.
//!
//! The analysis pipeline only ever needs "send one prompt, get one raw text
//! string back". The two supported providers disagree on everything else —
//! auth placement, request body, and response envelope
//! (`candidates[0].content.parts[0].text` for Gemini vs
//! `choices[0].message.content` for OpenAI) — so each adapter normalises
//! its envelope here and the rest of the pipeline stays provider-agnostic.
//!
//! There are no automatic retries for transient network failures at this
//! layer; a caller that wants resilience against flaky connectivity wraps
//! the call itself. Dropping the returned future aborts the in-flight
//! request.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::CopilotError;

/// Generation settings for one completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_output_tokens: usize,
}

/// A chat/completion endpoint reduced to its essence.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Send one prompt, return the model's raw text output.
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CopilotError>;
}

// ── Gemini ───────────────────────────────────────────────────────────────

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Google Gemini `generateContent` adapter.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_secs: u64,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Result<Self, CopilotError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            timeout_secs,
        })
    }

    /// Point the adapter at a different host (local emulators, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CopilotError> {
        let url = format!(
            "{}/v1/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": options.temperature,
                "maxOutputTokens": options.max_output_tokens,
            }
        });

        let envelope = post_json(&self.client, "gemini", &url, &body, self.timeout_secs, None).await?;
        gemini_text(&envelope)
    }
}

/// Pull the raw completion text out of a Gemini response envelope.
fn gemini_text(envelope: &Value) -> Result<String, CopilotError> {
    envelope
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| CopilotError::UnexpectedEnvelope {
            provider: "gemini".into(),
            detail: "missing candidates[0].content.parts[0].text".into(),
        })
}

// ── OpenAI ───────────────────────────────────────────────────────────────

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// OpenAI chat-completions adapter.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_secs: u64,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Result<Self, CopilotError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
            timeout_secs,
        })
    }

    /// Point the adapter at a different host (local emulators, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CopilotError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": options.temperature,
            "max_tokens": options.max_output_tokens,
        });

        let envelope = post_json(
            &self.client,
            "openai",
            &url,
            &body,
            self.timeout_secs,
            Some(&self.api_key),
        )
        .await?;
        openai_text(&envelope)
    }
}

/// Pull the raw completion text out of an OpenAI response envelope.
fn openai_text(envelope: &Value) -> Result<String, CopilotError> {
    envelope
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| CopilotError::UnexpectedEnvelope {
            provider: "openai".into(),
            detail: "missing choices[0].message.content".into(),
        })
}

// ── Shared HTTP plumbing ─────────────────────────────────────────────────

fn build_client(timeout_secs: u64) -> Result<reqwest::Client, CopilotError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| CopilotError::Internal(format!("failed to build HTTP client: {e}")))
}

/// POST a JSON body and return the decoded JSON envelope.
///
/// Maps the three transport-level failure classes onto the error taxonomy:
/// timeout, connectivity, and non-2xx status (carrying the response body).
async fn post_json(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    body: &Value,
    timeout_secs: u64,
    bearer: Option<&str>,
) -> Result<Value, CopilotError> {
    let mut request = client.post(url).json(body);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            CopilotError::ApiTimeout { secs: timeout_secs }
        } else {
            CopilotError::RequestFailed {
                provider: provider.to_string(),
                detail: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CopilotError::ApiStatus {
            provider: provider.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| CopilotError::UnexpectedEnvelope {
            provider: provider.to_string(),
            detail: format!("response body is not JSON: {e}"),
        })
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Resolve the completion provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed
///    and configured it entirely; used as-is. This is how tests inject a
///    scripted provider.
/// 2. **Named provider** (`config.provider_name`) — "gemini" or "openai",
///    reading the corresponding API key from the environment.
/// 3. **Environment pair** (`R42_PROVIDER` + `R42_MODEL`) — both set means
///    the execution environment chose; honoured before auto-detection.
/// 4. **Auto-detection** — `GEMINI_API_KEY` wins when present (the
///    project's historical default provider), then `OPENAI_API_KEY`.
///
/// Fails fast with a configuration error when no credential is found; no
/// network call is ever attempted without one.
pub fn resolve_provider(config: &AnalysisConfig) -> Result<Arc<dyn CompletionProvider>, CopilotError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_named(name, config.model.as_deref(), config.api_timeout_secs);
    }

    if let (Ok(name), Ok(model)) = (std::env::var("R42_PROVIDER"), std::env::var("R42_MODEL")) {
        if !name.is_empty() && !model.is_empty() {
            return create_named(&name, Some(&model), config.api_timeout_secs);
        }
    }

    if env_key("GEMINI_API_KEY").is_some() {
        return create_named("gemini", config.model.as_deref(), config.api_timeout_secs);
    }
    if env_key("OPENAI_API_KEY").is_some() {
        return create_named("openai", config.model.as_deref(), config.api_timeout_secs);
    }

    Err(CopilotError::MissingApiKey {
        provider: "auto".into(),
        env_var: "GEMINI_API_KEY or OPENAI_API_KEY".into(),
    })
}

fn create_named(
    name: &str,
    model: Option<&str>,
    timeout_secs: u64,
) -> Result<Arc<dyn CompletionProvider>, CopilotError> {
    match name.to_ascii_lowercase().as_str() {
        "gemini" => {
            let key = env_key("GEMINI_API_KEY").ok_or_else(|| CopilotError::MissingApiKey {
                provider: "gemini".into(),
                env_var: "GEMINI_API_KEY".into(),
            })?;
            let model = model.unwrap_or(DEFAULT_GEMINI_MODEL);
            debug!("using gemini provider, model {model}");
            Ok(Arc::new(GeminiProvider::new(key, model, timeout_secs)?))
        }
        "openai" => {
            let key = env_key("OPENAI_API_KEY").ok_or_else(|| CopilotError::MissingApiKey {
                provider: "openai".into(),
                env_var: "OPENAI_API_KEY".into(),
            })?;
            let model = model.unwrap_or(DEFAULT_OPENAI_MODEL);
            debug!("using openai provider, model {model}");
            Ok(Arc::new(OpenAiProvider::new(key, model, timeout_secs)?))
        }
        other => Err(CopilotError::InvalidConfig(format!(
            "unknown provider '{other}' (expected 'gemini' or 'openai')"
        ))),
    }
}

fn env_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}
