//! Normalized analysis-result types.
//!
//! [`Insights`] is the one shape the rest of the application trusts: once a
//! model response has passed through [`crate::pipeline::validate`], every
//! list is present (possibly empty, never missing) and every enum field
//! holds a canonical value. Wire names are camelCase to match the JSON
//! schema the model is prompted with, so a stored blob and a raw model
//! response deserialize through the same derives.

use serde::{Deserialize, Serialize};

/// Literal metric name the model falls back to when it ignores the
/// "extract only real values" instruction. Treated as invalid output.
pub const PLACEHOLDER_METRIC_NAME: &str = "Unknown Metric";

/// Literal metric value with the same meaning as [`PLACEHOLDER_METRIC_NAME`].
pub const PLACEHOLDER_METRIC_VALUE: &str = "N/A";

/// The normalized structured output of one report analysis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Insights {
    /// Two-to-three sentence free-text summary of the report.
    pub summary: String,
    /// Biomarkers actually named in the report, with values and status.
    pub key_metrics: Vec<KeyMetric>,
    /// Actionable free-text recommendations.
    pub recommendations: Vec<String>,
    /// Free-text risk factors identified from the data.
    pub risk_factors: Vec<String>,
    /// Direction-of-change observations, when the report contains history.
    pub trends: Vec<Trend>,
}

impl Insights {
    /// True when no structured content survived analysis — no metrics, no
    /// recommendations, no risk factors. Trends alone do not count; a
    /// trends-only report is still an empty one for display purposes.
    pub fn is_empty(&self) -> bool {
        self.key_metrics.is_empty() && self.recommendations.is_empty() && self.risk_factors.is_empty()
    }
}

/// One biomarker reading extracted from the report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyMetric {
    /// Exact metric name from the report, e.g. "CRP", "HbA1c", "Vitamin D".
    pub name: String,
    /// The reported value with units, e.g. "0.8 mg/L".
    pub value: String,
    pub status: MetricStatus,
    /// What the metric means and its health implications.
    pub description: String,
    /// Laboratory reference range, when the report states one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<String>,
}

/// Where a metric value sits relative to its reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    #[default]
    Normal,
    Elevated,
    Low,
    Critical,
}

impl MetricStatus {
    /// Canonical lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricStatus::Normal => "normal",
            MetricStatus::Elevated => "elevated",
            MetricStatus::Low => "low",
            MetricStatus::Critical => "critical",
        }
    }

    /// Lenient parse used during normalization; anything unrecognised is
    /// treated as [`MetricStatus::Normal`].
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "elevated" | "high" => MetricStatus::Elevated,
            "low" => MetricStatus::Low,
            "critical" => MetricStatus::Critical,
            _ => MetricStatus::Normal,
        }
    }
}

/// A direction-of-change observation across measurements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Trend {
    pub metric: String,
    pub direction: TrendDirection,
    /// Free-text change description, e.g. "down 0.3 mg/L".
    pub change: String,
    /// Free-text time period, e.g. "6 months".
    pub period: String,
    /// How meaningful the model judged the change to be.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance: Option<Significance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    #[default]
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Stable => "stable",
        }
    }

    /// Lenient parse used during normalization; anything unrecognised is
    /// treated as [`TrendDirection::Stable`].
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "improving" | "up" => TrendDirection::Improving,
            "declining" | "down" => TrendDirection::Declining,
            _ => TrendDirection::Stable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    High,
    Medium,
    Low,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_wire_names() {
        let insights = Insights {
            summary: "ok".into(),
            key_metrics: vec![KeyMetric {
                name: "CRP".into(),
                value: "0.8 mg/L".into(),
                status: MetricStatus::Normal,
                description: "inflammation marker".into(),
                reference_range: None,
            }],
            recommendations: vec!["keep walking".into()],
            risk_factors: vec![],
            trends: vec![],
        };
        let json = serde_json::to_string(&insights).unwrap();
        assert!(json.contains("\"keyMetrics\""));
        assert!(json.contains("\"riskFactors\""));
        assert!(!json.contains("referenceRange"), "None must be omitted");
    }

    #[test]
    fn missing_lists_deserialize_to_empty() {
        let insights: Insights = serde_json::from_str(r#"{"summary":"x"}"#).unwrap();
        assert_eq!(insights.summary, "x");
        assert!(insights.key_metrics.is_empty());
        assert!(insights.trends.is_empty());
        assert!(insights.is_empty());
    }

    #[test]
    fn status_parse_lenient_defaults_to_normal() {
        assert_eq!(MetricStatus::parse_lenient("Elevated"), MetricStatus::Elevated);
        assert_eq!(MetricStatus::parse_lenient("CRITICAL"), MetricStatus::Critical);
        assert_eq!(MetricStatus::parse_lenient("weird"), MetricStatus::Normal);
    }

    #[test]
    fn direction_parse_lenient_defaults_to_stable() {
        assert_eq!(TrendDirection::parse_lenient("improving"), TrendDirection::Improving);
        assert_eq!(TrendDirection::parse_lenient(""), TrendDirection::Stable);
    }

    #[test]
    fn trends_only_report_counts_as_empty() {
        let insights = Insights {
            trends: vec![Trend::default()],
            ..Default::default()
        };
        assert!(insights.is_empty());
    }
}
