//! Insight validation and normalization.
//!
//! Two layers with distinct jobs:
//!
//! * [`validate_strict`] — the gate. Rejects model output that is missing
//!   the required substance (summary, key metrics, recommendations, risk
//!   factors) or that contains the literal placeholder values a lazy model
//!   emits instead of real data. A rejection is retry-eligible: the
//!   analysis client re-prompts once with the strict prompt before giving
//!   up. This is the crate's one validation policy — placeholders are
//!   rejected, never passed through as data.
//!
//! * [`normalize`] — the shaper. Total and pure: whatever object comes in,
//!   an [`Insights`] comes out with every list present and every enum
//!   canonical. Optional fields missing from an otherwise-valid response
//!   (trends, metric descriptions) get fixed defaults. Running it twice
//!   yields identical output.
//!
//! `normalize` also guards the un-gated library entry point: if an object
//! normalizes to no metrics, no recommendations, and no risk factors at
//! once, a fixed "limited structured data" set is substituted so a caller
//! never renders a completely blank report.

use serde_json::Value;
use thiserror::Error;

use crate::insights::{
    Insights, KeyMetric, MetricStatus, Significance, Trend, TrendDirection,
    PLACEHOLDER_METRIC_NAME, PLACEHOLDER_METRIC_VALUE,
};

// ── Defaults used by normalization ───────────────────────────────────────

pub const DEFAULT_SUMMARY: &str = "Analysis completed successfully";
pub const DEFAULT_METRIC_DESCRIPTION: &str = "No description available";
pub const DEFAULT_RECOMMENDATION: &str = "Continue monitoring your health markers";
pub const DEFAULT_RISK_FACTOR: &str = "No specific risk factors identified";
pub const DEFAULT_TREND_CHANGE: &str = "No change";
pub const DEFAULT_TREND_PERIOD: &str = "Recent";

/// Why a parsed object failed strict validation.
#[derive(Debug, Error)]
pub enum ValidationIssue {
    #[error("response missing summary")]
    MissingSummary,
    #[error("response missing key metrics")]
    MissingKeyMetrics,
    #[error("key metric at index {0} is missing required fields")]
    IncompleteMetric(usize),
    #[error("key metric at index {0} is a generic placeholder instead of actual data")]
    PlaceholderMetric(usize),
    #[error("response missing recommendations")]
    MissingRecommendations,
    #[error("response missing risk factors")]
    MissingRiskFactors,
}

/// Strict gate over a parsed model response.
///
/// Checks mirror what a real report analysis must contain; anything less
/// means the model did not actually read the text, and a stricter
/// re-prompt is more useful than defaults.
pub fn validate_strict(raw: &Value) -> Result<(), ValidationIssue> {
    let summary_ok = raw
        .get("summary")
        .and_then(Value::as_str)
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);
    if !summary_ok {
        return Err(ValidationIssue::MissingSummary);
    }

    let metrics = raw
        .get("keyMetrics")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .ok_or(ValidationIssue::MissingKeyMetrics)?;

    for (i, metric) in metrics.iter().enumerate() {
        let name = non_empty_str(metric.get("name"));
        let value = non_empty_str(metric.get("value"));
        let status = non_empty_str(metric.get("status"));
        let description = non_empty_str(metric.get("description"));
        let (Some(name), Some(value), Some(_), Some(_)) = (name, value, status, description)
        else {
            return Err(ValidationIssue::IncompleteMetric(i));
        };
        if name == PLACEHOLDER_METRIC_NAME || value == PLACEHOLDER_METRIC_VALUE {
            return Err(ValidationIssue::PlaceholderMetric(i));
        }
    }

    let recommendations_ok = raw
        .get("recommendations")
        .and_then(Value::as_array)
        .map(|a| !a.is_empty())
        .unwrap_or(false);
    if !recommendations_ok {
        return Err(ValidationIssue::MissingRecommendations);
    }

    let risk_factors_ok = raw
        .get("riskFactors")
        .and_then(Value::as_array)
        .map(|a| !a.is_empty())
        .unwrap_or(false);
    if !risk_factors_ok {
        return Err(ValidationIssue::MissingRiskFactors);
    }

    Ok(())
}

/// Reshape whatever object the model returned into a complete [`Insights`].
///
/// Total and pure: never fails, never consults anything but its argument.
pub fn normalize(raw: &Value) -> Insights {
    let summary = non_empty_str(raw.get("summary"))
        .unwrap_or(DEFAULT_SUMMARY)
        .to_string();

    let key_metrics: Vec<KeyMetric> = raw
        .get("keyMetrics")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(normalize_metric).collect())
        .unwrap_or_default();

    let mut recommendations = string_list(raw.get("recommendations"));
    let mut risk_factors = string_list(raw.get("riskFactors"));

    // All three substantive lists empty means the model found nothing
    // structured at all; a fixed "limited data" set beats a blank report
    // padded with generic defaults.
    if key_metrics.is_empty() && recommendations.is_empty() && risk_factors.is_empty() {
        return limited_data_fallback();
    }

    if recommendations.is_empty() {
        recommendations = vec![DEFAULT_RECOMMENDATION.to_string()];
    }
    if risk_factors.is_empty() {
        risk_factors = vec![DEFAULT_RISK_FACTOR.to_string()];
    }

    let trends: Vec<Trend> = raw
        .get("trends")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(normalize_trend).collect())
        .unwrap_or_default();

    Insights {
        summary,
        key_metrics,
        recommendations,
        risk_factors,
        trends,
    }
}

/// Fixed fallback shown instead of a completely empty report.
pub fn limited_data_fallback() -> Insights {
    Insights {
        summary: "Limited structured data could be extracted from this report.".to_string(),
        key_metrics: Vec::new(),
        recommendations: vec![
            "Upload a text-based copy of the report for a more detailed analysis".to_string(),
        ],
        risk_factors: vec!["No structured risk factors could be identified".to_string()],
        trends: Vec::new(),
    }
}

// ── Per-entry coercion ───────────────────────────────────────────────────

fn normalize_metric(entry: &Value) -> Option<KeyMetric> {
    if !entry.is_object() {
        return None;
    }
    Some(KeyMetric {
        name: non_empty_str(entry.get("name"))
            .unwrap_or(PLACEHOLDER_METRIC_NAME)
            .to_string(),
        value: non_empty_str(entry.get("value"))
            .unwrap_or(PLACEHOLDER_METRIC_VALUE)
            .to_string(),
        status: non_empty_str(entry.get("status"))
            .map(MetricStatus::parse_lenient)
            .unwrap_or_default(),
        description: non_empty_str(entry.get("description"))
            .unwrap_or(DEFAULT_METRIC_DESCRIPTION)
            .to_string(),
        reference_range: non_empty_str(entry.get("referenceRange")).map(str::to_string),
    })
}

fn normalize_trend(entry: &Value) -> Option<Trend> {
    if !entry.is_object() {
        return None;
    }
    // A trend without a metric name has nothing to attach to; drop it.
    let metric = non_empty_str(entry.get("metric"))?.to_string();
    Some(Trend {
        metric,
        direction: non_empty_str(entry.get("direction"))
            .map(TrendDirection::parse_lenient)
            .unwrap_or_default(),
        change: non_empty_str(entry.get("change"))
            .unwrap_or(DEFAULT_TREND_CHANGE)
            .to_string(),
        period: non_empty_str(entry.get("period"))
            .unwrap_or(DEFAULT_TREND_PERIOD)
            .to_string(),
        significance: non_empty_str(entry.get("significance")).and_then(parse_significance),
    })
}

fn parse_significance(s: &str) -> Option<Significance> {
    match s.trim().to_ascii_lowercase().as_str() {
        "high" => Some(Significance::High),
        "medium" => Some(Significance::Medium),
        "low" => Some(Significance::Low),
        _ => None,
    }
}

fn non_empty_str(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn string_list(v: Option<&Value>) -> Vec<String> {
    v.and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.as_str())
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
