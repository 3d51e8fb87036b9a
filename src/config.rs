//! Configuration types for report analysis.
//!
//! All pipeline behaviour is controlled through [`AnalysisConfig`], built
//! via its [`AnalysisConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across calls, serialise them for logging, and
//! diff two runs to understand why their outputs differ.
//!
//! Generation settings (temperature, max output tokens) are deliberately
//! config-level constants rather than per-call arguments: the JSON output
//! format only stays stable when every call uses the same low-temperature
//! settings.

use crate::error::CopilotError;
use crate::provider::CompletionProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Ingestion size ceiling. Reports larger than this are rejected at the
/// validation boundary before any extraction is attempted.
pub const MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Configuration for report extraction and analysis.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use r42_copilot::{AnalysisConfig, ExtractionStrategy};
///
/// let config = AnalysisConfig::builder()
///     .strategy(ExtractionStrategy::Structured)
///     .model("gemini-1.5-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// How text is pulled out of the PDF bytes. Default: [`ExtractionStrategy::Heuristic`].
    pub strategy: ExtractionStrategy,

    /// LLM model identifier, e.g. "gemini-1.5-flash", "gpt-4o-mini".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name ("gemini" or "openai").
    /// If None along with `provider`, the factory auto-detects from API key
    /// environment variables.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    /// Useful in tests or when the caller needs custom middleware.
    pub provider: Option<Arc<dyn CompletionProvider>>,

    /// Sampling temperature for the first analysis attempt. Default: 0.3.
    ///
    /// Low temperature keeps the model faithful to values actually present
    /// in the report text and keeps the JSON output format stable.
    pub temperature: f32,

    /// Maximum tokens the model may generate on the first attempt. Default: 2000.
    pub max_tokens: usize,

    /// Temperature for the single strict-prompt retry. Default: 0.1.
    ///
    /// The retry exists to recover from malformed output, so it trades the
    /// last bit of expressiveness for determinism.
    pub retry_temperature: f32,

    /// Max output tokens for the strict-prompt retry. Default: 1500.
    pub retry_max_tokens: usize,

    /// Per-LLM-call timeout in seconds. Default: 60.
    ///
    /// There is no automatic retry for transient network failures; a call
    /// that times out surfaces the error to the caller.
    pub api_timeout_secs: u64,

    /// Concurrent text extractions during batch ingestion. Default: 4.
    ///
    /// Extraction is CPU-bound (it runs on the blocking thread pool), so
    /// this is bounded by cores, not network width. The combined analysis
    /// call after the join point is always a single request.
    pub concurrency: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            strategy: ExtractionStrategy::default(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 2000,
            retry_temperature: 0.1,
            retry_max_tokens: 1500,
            api_timeout_secs: 60,
            concurrency: 4,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("strategy", &self.strategy)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn CompletionProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("retry_temperature", &self.retry_temperature)
            .field("retry_max_tokens", &self.retry_max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn strategy(mut self, strategy: ExtractionStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 1.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn retry_temperature(mut self, t: f32) -> Self {
        self.config.retry_temperature = t.clamp(0.0, 1.0);
        self
    }

    pub fn retry_max_tokens(mut self, n: usize) -> Self {
        self.config.retry_max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, CopilotError> {
        let c = &self.config;
        if c.max_tokens == 0 || c.retry_max_tokens == 0 {
            return Err(CopilotError::InvalidConfig(
                "max output tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(CopilotError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(CopilotError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How text is pulled out of a PDF's raw bytes.
///
/// The two strategies are alternatives, never combined, and expose
/// different failure modes:
///
/// | Strategy | Garbage input | Empty result |
/// |----------|--------------|--------------|
/// | `Heuristic` | produces *some* string (placeholder floor) | cannot happen |
/// | `Structured` | parser error propagates | hard failure |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStrategy {
    /// Scan the raw bytes and keep printable ASCII, with whitespace
    /// collapsing and sentence-aware truncation. Total: any non-empty
    /// input yields a non-empty string (a synthetic placeholder naming the
    /// file when under the plausibility floor). Silently mangles non-ASCII
    /// text — it is a heuristic, not a decoder. (default)
    #[default]
    Heuristic,
    /// Delegate to a page-oriented PDF parser and concatenate recognised
    /// text runs. Higher fidelity on well-formed documents; fails loudly
    /// when the parser errors or recognises no text at all.
    Structured,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_generation_settings() {
        let config = AnalysisConfig::default();
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.retry_temperature, 0.1);
        assert_eq!(config.retry_max_tokens, 1500);
        assert_eq!(config.api_timeout_secs, 60);
        assert_eq!(config.strategy, ExtractionStrategy::Heuristic);
    }

    #[test]
    fn builder_clamps_temperature() {
        let config = AnalysisConfig::builder().temperature(3.0).build().unwrap();
        assert_eq!(config.temperature, 1.0);
    }

    #[test]
    fn builder_rejects_zero_tokens() {
        let err = AnalysisConfig::builder().max_tokens(0).build();
        assert!(err.is_err());
    }

    #[test]
    fn builder_floors_concurrency() {
        let config = AnalysisConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(config.concurrency, 1);
    }
}
