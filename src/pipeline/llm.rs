//! LLM interaction: send report text to the provider and recover insights.
//!
//! This module is intentionally thin — all prompt engineering lives in
//! [`crate::prompts`] so it can be changed without touching the recovery
//! logic here.
//!
//! ## Recovery strategy
//!
//! There is exactly one retry, and it exists for *malformed output*, not
//! connectivity: when the first response cannot be parsed into a JSON
//! object or fails strict validation, the client re-sends once with the
//! shorter strict prompt at lower temperature and a tighter token budget.
//! Network and HTTP errors propagate immediately on either attempt — a
//! caller that wants resilience against flaky connectivity wraps the call
//! itself.

use crate::config::AnalysisConfig;
use crate::error::CopilotError;
use crate::insights::Insights;
use crate::pipeline::{parse, validate};
use crate::prompts;
use crate::provider::{CompletionOptions, CompletionProvider};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// One report's worth of input to the analysis call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Extracted report text (never empty; the extractor guarantees it).
    pub content: String,
    /// Partner platform tag, free text.
    pub platform: String,
    pub filename: String,
}

/// Analyze extracted report text into normalized [`Insights`].
///
/// Issues one completion call, runs the parse/validate pipeline, and on an
/// unusable response issues the single strict-prompt retry before failing
/// with [`CopilotError::UnusableResponse`].
pub async fn analyze_text(
    provider: &Arc<dyn CompletionProvider>,
    request: &AnalysisRequest,
    config: &AnalysisConfig,
) -> Result<Insights, CopilotError> {
    let start = Instant::now();

    let options = CompletionOptions {
        temperature: config.temperature,
        max_output_tokens: config.max_tokens,
    };
    let raw = provider
        .complete(&prompts::analysis_prompt(request), &options)
        .await?;
    debug!(
        "'{}': received {} chars from {} in {:?}",
        request.filename,
        raw.len(),
        provider.name(),
        start.elapsed()
    );

    let first_issue = match interpret(&raw) {
        Ok(insights) => return Ok(insights),
        Err(issue) => issue,
    };

    warn!(
        "'{}': first response unusable ({first_issue}); retrying with strict prompt",
        request.filename
    );

    let retry_options = CompletionOptions {
        temperature: config.retry_temperature,
        max_output_tokens: config.retry_max_tokens,
    };
    let raw = provider
        .complete(&prompts::retry_prompt(request), &retry_options)
        .await?;

    interpret(&raw).map_err(|retry_issue| CopilotError::UnusableResponse {
        detail: format!("{first_issue}; after retry: {retry_issue}"),
    })
}

/// Run one raw response through parse → strict validation → normalization.
///
/// The error is a plain description rather than a [`CopilotError`] because
/// a single failure here is not yet fatal — it selects the retry path.
fn interpret(raw: &str) -> Result<Insights, String> {
    let value = parse::parse_object(raw).map_err(|e| e.to_string())?;
    validate::validate_strict(&value).map_err(|e| e.to_string())?;
    Ok(validate::normalize(&value))
}
