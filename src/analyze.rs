//! Top-level analysis entry points.
//!
//! These functions wire the pipeline stages together:
//! validate/load → extract → analyze → (optionally) persist. They are the
//! primary library API; the CLI is a thin shim over them.
//!
//! Cancellation: every await point is drop-safe, so a caller that stops
//! polling (user navigated away, request superseded) aborts the in-flight
//! work without side effects beyond any report record already persisted.

use crate::config::{AnalysisConfig, ExtractionStrategy};
use crate::error::CopilotError;
use crate::insights::Insights;
use crate::pipeline::llm::AnalysisRequest;
use crate::pipeline::{extract, input, llm};
use crate::profile::ReportRecord;
use crate::provider::resolve_provider;
use crate::store::ProfileStore;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::info;

/// Extract text from a report file without analyzing it.
///
/// Needs no API key; useful for checking what the model would see.
pub async fn extract_file(
    path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<String, CopilotError> {
    let file = input::load_report_file(path.as_ref()).await?;
    run_extraction(file, config.strategy).await
}

/// Analyze a single report file into normalized [`Insights`].
///
/// The provider is resolved first so a missing API key fails before any
/// file I/O or extraction work, with no network call made.
pub async fn analyze_file(
    path: impl AsRef<Path>,
    platform: &str,
    config: &AnalysisConfig,
) -> Result<Insights, CopilotError> {
    let provider = resolve_provider(config)?;
    let file = input::load_report_file(path.as_ref()).await?;
    let filename = file.filename.clone();
    let content = run_extraction(file, config.strategy).await?;

    info!("analyzing '{}' ({} chars) as {}", filename, content.len(), platform);
    let request = AnalysisRequest {
        content,
        platform: platform.to_string(),
        filename,
    };
    llm::analyze_text(&provider, &request, config).await
}

/// Analyze several report files together in one combined call.
///
/// Per-file extraction fans out concurrently (completion order is not
/// guaranteed; results are re-ordered by input position), then exactly one
/// analysis request covers all of them after the join point.
pub async fn analyze_files(
    paths: &[PathBuf],
    platform: &str,
    config: &AnalysisConfig,
) -> Result<Insights, CopilotError> {
    if paths.is_empty() {
        return Err(CopilotError::InvalidConfig("no input files given".into()));
    }
    let provider = resolve_provider(config)?;

    let results: Vec<Result<(usize, String, String), CopilotError>> =
        stream::iter(paths.iter().enumerate().map(|(idx, path)| {
            let path = path.clone();
            let strategy = config.strategy;
            async move {
                let file = input::load_report_file(&path).await?;
                let filename = file.filename.clone();
                let text = run_extraction(file, strategy).await?;
                Ok((idx, filename, text))
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    let mut sections = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    sections.sort_by_key(|(idx, _, _)| *idx);

    let filenames = sections
        .iter()
        .map(|(_, name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let combined = sections
        .iter()
        .map(|(_, name, text)| format!("=== Report: {name} ===\n{text}"))
        .collect::<Vec<_>>()
        .join("\n\n");

    info!(
        "analyzing {} reports together ({} chars) as {}",
        sections.len(),
        combined.len(),
        platform
    );
    let request = AnalysisRequest {
        content: combined,
        platform: platform.to_string(),
        filename: filenames,
    };
    llm::analyze_text(&provider, &request, config).await
}

/// Ingest a report into the profile store: extract, record, analyze, and
/// attach the insights.
///
/// The record is appended *before* analysis, mirroring an upload-then-
/// analyze flow: if analysis fails, the report (with its extracted text)
/// stays in the store without insights and can be re-analyzed later.
pub async fn ingest_file(
    store: &mut ProfileStore,
    path: impl AsRef<Path>,
    platform: &str,
    config: &AnalysisConfig,
) -> Result<ReportRecord, CopilotError> {
    let file = input::load_report_file(path.as_ref()).await?;
    let filename = file.filename.clone();
    let content = run_extraction(file, config.strategy).await?;

    let mut record = ReportRecord::new(filename, platform, content.clone());
    store.add_report(record.clone())?;

    let provider = resolve_provider(config)?;
    let request = AnalysisRequest {
        content,
        platform: platform.to_string(),
        filename: record.filename.clone(),
    };
    let insights = llm::analyze_text(&provider, &request, config).await?;

    store.update_insights(&record.id, insights.clone())?;
    record.insights = Some(insights);
    Ok(record)
}

/// Re-run analysis for a report already in the store, using its persisted
/// extracted text.
pub async fn reanalyze_report(
    store: &mut ProfileStore,
    report_id: &str,
    config: &AnalysisConfig,
) -> Result<Insights, CopilotError> {
    let record = store
        .get()
        .and_then(|p| p.report_by_id(report_id))
        .cloned()
        .ok_or_else(|| CopilotError::ReportNotFound {
            id: report_id.to_string(),
        })?;

    let provider = resolve_provider(config)?;
    let content = if record.content.is_empty() {
        // Content may have been dropped by a degraded persistence pass.
        extract::placeholder_text(&record.filename)
    } else {
        record.content.clone()
    };
    let request = AnalysisRequest {
        content,
        platform: record.platform.clone(),
        filename: record.filename.clone(),
    };
    let insights = llm::analyze_text(&provider, &request, config).await?;
    store.update_insights(report_id, insights.clone())?;
    Ok(insights)
}

/// Run CPU-bound extraction off the async worker threads.
async fn run_extraction(
    file: input::ReportFile,
    strategy: ExtractionStrategy,
) -> Result<String, CopilotError> {
    tokio::task::spawn_blocking(move || {
        extract::extract_text(&file.bytes, &file.filename, strategy)
    })
    .await
    .map_err(|e| CopilotError::Internal(format!("extraction task panicked: {e}")))?
}
