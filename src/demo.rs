//! Demo fixtures: randomized, plausible-looking report scores.
//!
//! These populate a dashboard before any real analysis has run. They are
//! chart-oriented shapes (0–100 category scores, fixed six-month trend
//! labels) — deliberately a different type from [`crate::insights::Insights`]
//! so demo data can never be mistaken for analysis output, and they live
//! behind the `demo` cargo feature so release builds without it cannot
//! reach them at all.
//!
//! Generators take a filename for signature compatibility with real
//! ingestion call sites but ignore it: output is freshly randomized on
//! every call.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Fixed six-month window used by every demo trend chart.
pub const TREND_LABELS: [&str; 6] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun"];

// ── Cognitive (NeuroAge-shaped) ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitiveReport {
    pub cognitive_score: u8,
    pub brain_age: u8,
    pub data_quality: u8,
    pub cognitive_metrics: CognitiveMetrics,
    pub brain_health_metrics: BrainHealthMetrics,
    pub trends: TrendSeries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitiveMetrics {
    pub memory: u8,
    pub processing_speed: u8,
    pub attention: u8,
    pub executive_function: u8,
    pub working_memory: u8,
    pub visual_spatial: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrainHealthMetrics {
    pub neural_efficiency: u8,
    pub cognitive_flexibility: u8,
    pub reaction_time: u8,
    pub pattern_recognition: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries {
    pub labels: Vec<String>,
    pub cognitive_data: Vec<u8>,
    pub brain_age_data: Vec<u8>,
}

/// Generate a randomized cognitive demo report. The filename is ignored.
pub fn cognitive_report(_filename: &str) -> CognitiveReport {
    let mut rng = rand::thread_rng();
    CognitiveReport {
        cognitive_score: rng.gen_range(70..=100),
        brain_age: rng.gen_range(65..=80),
        data_quality: rng.gen_range(85..=100),
        cognitive_metrics: CognitiveMetrics {
            memory: rng.gen_range(75..=100),
            processing_speed: rng.gen_range(70..=100),
            attention: rng.gen_range(60..=100),
            executive_function: rng.gen_range(80..=100),
            working_memory: rng.gen_range(65..=100),
            visual_spatial: rng.gen_range(70..=100),
        },
        brain_health_metrics: BrainHealthMetrics {
            neural_efficiency: rng.gen_range(75..=100),
            cognitive_flexibility: rng.gen_range(70..=100),
            reaction_time: rng.gen_range(60..=100),
            pattern_recognition: rng.gen_range(80..=100),
        },
        trends: TrendSeries {
            labels: TREND_LABELS.iter().map(|s| s.to_string()).collect(),
            cognitive_data: vec![65, 68, 72, 75, 78, 82],
            brain_age_data: vec![70, 72, 69, 71, 74, 76],
        },
    }
}

// ── Metabolic (Iollo-shaped) ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetabolicReport {
    pub metabolic_score: u8,
    pub inflammation_score: u8,
    pub oxidative_stress_score: u8,
    pub mitochondrial_score: u8,
    pub overall_score: u8,
    pub metabolic_metrics: MetabolicMetrics,
    pub inflammation_metrics: InflammationMetrics,
    pub trends: Vec<MonthScore>,
    pub highlights: Vec<Highlight>,
    pub recommendations: Vec<DemoRecommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetabolicMetrics {
    pub insulin: u8,
    pub glucose: u8,
    pub hba1c: u8,
    pub triglycerides: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InflammationMetrics {
    pub crp: u8,
    pub il6: u8,
    pub tnf: u8,
    pub fibrinogen: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthScore {
    pub month: String,
    pub score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightTone {
    Positive,
    Warning,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Highlight {
    pub title: String,
    pub description: String,
    pub tone: HighlightTone,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoRecommendation {
    pub title: String,
    pub description: String,
}

/// Generate a randomized metabolic demo report. The filename is ignored.
pub fn metabolic_report(_filename: &str) -> MetabolicReport {
    let mut rng = rand::thread_rng();
    MetabolicReport {
        metabolic_score: rng.gen_range(75..=100),
        inflammation_score: rng.gen_range(60..=100),
        oxidative_stress_score: rng.gen_range(65..=100),
        mitochondrial_score: rng.gen_range(70..=100),
        overall_score: rng.gen_range(70..=100),
        metabolic_metrics: MetabolicMetrics {
            insulin: rng.gen_range(70..=100),
            glucose: rng.gen_range(75..=100),
            hba1c: rng.gen_range(80..=100),
            triglycerides: rng.gen_range(65..=100),
        },
        inflammation_metrics: InflammationMetrics {
            crp: rng.gen_range(60..=100),
            il6: rng.gen_range(65..=100),
            tnf: rng.gen_range(70..=100),
            fibrinogen: rng.gen_range(75..=100),
        },
        trends: TREND_LABELS
            .iter()
            .zip([65u8, 68, 72, 75, 78, 82])
            .map(|(month, score)| MonthScore {
                month: month.to_string(),
                score,
            })
            .collect(),
        highlights: vec![
            Highlight {
                title: "Good Metabolic Health".into(),
                description: "Insulin sensitivity and glucose metabolism are within optimal ranges."
                    .into(),
                tone: HighlightTone::Positive,
            },
            Highlight {
                title: "Elevated Inflammation".into(),
                description: "CRP levels are slightly elevated. Consider anti-inflammatory interventions."
                    .into(),
                tone: HighlightTone::Warning,
            },
            Highlight {
                title: "Strong Mitochondrial Function".into(),
                description: "Cellular energy production is functioning well.".into(),
                tone: HighlightTone::Positive,
            },
        ],
        recommendations: vec![
            DemoRecommendation {
                title: "Anti-inflammatory Diet".into(),
                description:
                    "Increase omega-3 fatty acids and reduce processed foods to lower inflammation markers."
                        .into(),
            },
            DemoRecommendation {
                title: "Intermittent Fasting".into(),
                description: "Consider time-restricted feeding to improve metabolic flexibility."
                    .into(),
            },
            DemoRecommendation {
                title: "Exercise Protocol".into(),
                description: "Add high-intensity interval training to boost mitochondrial function."
                    .into(),
            },
        ],
    }
}
