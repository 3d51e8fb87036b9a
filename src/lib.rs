//! # r42-copilot
//!
//! Analyze longevity and biomarker PDF reports with LLMs.
//!
//! ## Why this crate?
//!
//! Partner diagnostic platforms (NeuroAge, Jona Health, Iollo, …) deliver
//! results as PDF reports. This crate turns those documents into one
//! normalized, chart-ready insight structure: it scrapes text out of the
//! PDF, sends it to a completion model with a fixed analysis prompt, and
//! defensively repairs and validates the JSON that comes back — models
//! wrap output in fences, bury it in prose, or return placeholders, and
//! none of that should reach a dashboard.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate type claim and size ceiling, load bytes
//!  ├─ 2. Extract   heuristic byte scan or structured parse (CPU-bound,
//!  │               spawn_blocking)
//!  ├─ 3. LLM       one completion call (gemini / openai), one strict retry
//!  ├─ 4. Parse     strip code fences, salvage the outermost {...}
//!  ├─ 5. Validate  reject placeholder output, normalize to Insights
//!  └─ 6. Store     append to the profile, persist with degradation
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use r42_copilot::{analyze_file, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY
//!     let config = AnalysisConfig::default();
//!     let insights = analyze_file("labs.pdf", "Jona Health", &config).await?;
//!     println!("{}", insights.summary);
//!     for metric in &insights.key_metrics {
//!         println!("{}: {} ({})", metric.name, metric.value, metric.status.as_str());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `r42` binary (clap + anyhow + tracing-subscriber) |
//! | `demo`  | off     | Randomized chart-shaped fixtures for UI work without an API key |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! r42-copilot = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
#[cfg(feature = "demo")]
pub mod demo;
pub mod error;
pub mod insights;
pub mod pipeline;
pub mod profile;
pub mod prompts;
pub mod provider;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze_file, analyze_files, extract_file, ingest_file, reanalyze_report};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ExtractionStrategy, MAX_FILE_BYTES};
pub use error::{CopilotError, StorageError};
pub use insights::{Insights, KeyMetric, MetricStatus, Significance, Trend, TrendDirection};
pub use pipeline::llm::AnalysisRequest;
pub use profile::{DiagnosticSelection, ReportRecord, UserProfile};
pub use provider::{CompletionOptions, CompletionProvider, GeminiProvider, OpenAiProvider};
pub use store::{FileBackend, MemoryBackend, ProfileStore, StorageBackend};
