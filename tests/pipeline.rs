//! End-to-end pipeline tests with a scripted in-process provider.
//!
//! No network, no API keys: a `ScriptedProvider` plays back canned model
//! responses (or injected transport errors) so the full
//! validate → extract → analyze → parse → normalize → persist path runs
//! exactly as it would against a live endpoint.

use async_trait::async_trait;
use r42_copilot::{
    analyze_file, analyze_files, ingest_file, reanalyze_report, AnalysisConfig, CompletionOptions,
    CompletionProvider, CopilotError, MemoryBackend, ProfileStore, ReportRecord, UserProfile,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ── Scripted provider ────────────────────────────────────────────────────

enum Scripted {
    Text(&'static str),
    HttpStatus(u16),
}

/// Plays back scripted responses in order and records every prompt.
struct ScriptedProvider {
    script: Mutex<Vec<Scripted>>,
    prompts: Mutex<Vec<String>>,
    options_seen: Mutex<Vec<(f32, usize)>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            prompts: Mutex::new(Vec::new()),
            options_seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn prompt(&self, index: usize) -> String {
        self.prompts.lock().unwrap()[index].clone()
    }

    fn options(&self, index: usize) -> (f32, usize) {
        self.options_seen.lock().unwrap()[index]
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, CopilotError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.options_seen
            .lock()
            .unwrap()
            .push((options.temperature, options.max_output_tokens));

        let mut script = self.script.lock().unwrap();
        assert!(!script.is_empty(), "provider called more times than scripted");
        match script.remove(0) {
            Scripted::Text(s) => Ok(s.to_string()),
            Scripted::HttpStatus(status) => Err(CopilotError::ApiStatus {
                provider: "scripted".into(),
                status,
                body: "scripted failure".into(),
            }),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

const VALID_RESPONSE: &str = r#"{"summary":"CRP and HbA1c are within range.","keyMetrics":[{"name":"CRP","value":"0.8 mg/L","status":"normal","description":"Inflammation marker"}],"recommendations":["Maintain current exercise habits"],"riskFactors":["Family history of cardiovascular disease"],"trends":[{"metric":"CRP","direction":"improving","change":"down 0.3 mg/L","period":"6 months"}]}"#;

const FENCED_RESPONSE: &str = "```json\n{\"summary\":\"CRP and HbA1c are within range.\",\"keyMetrics\":[{\"name\":\"CRP\",\"value\":\"0.8 mg/L\",\"status\":\"normal\",\"description\":\"Inflammation marker\"}],\"recommendations\":[\"Maintain current exercise habits\"],\"riskFactors\":[\"Family history of cardiovascular disease\"]}\n```";

const PROSE_WRAPPED_RESPONSE: &str = "Here is the result: {\"summary\":\"All markers look good.\",\"keyMetrics\":[{\"name\":\"Vitamin D\",\"value\":\"32 ng/mL\",\"status\":\"normal\",\"description\":\"Sufficient\"}],\"recommendations\":[\"Keep supplementing\"],\"riskFactors\":[\"None identified\"]} Thanks!";

const PLACEHOLDER_RESPONSE: &str = r#"{"summary":"ok","keyMetrics":[{"name":"Unknown Metric","value":"N/A","status":"normal","description":"none"}],"recommendations":["x"],"riskFactors":["y"]}"#;

fn config_with(provider: &Arc<ScriptedProvider>) -> AnalysisConfig {
    AnalysisConfig::builder()
        .provider(Arc::clone(provider) as Arc<dyn CompletionProvider>)
        .build()
        .unwrap()
}

/// Write a report file with plausible lab-report text (over the
/// 100-character placeholder floor).
fn lab_report_file(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    let content = "Quarterly biomarker panel. CRP 0.8 mg/L within the reference range. \
                   HbA1c 5.2% optimal. Vitamin D 32 ng/mL sufficient. LDL 98 mg/dL.";
    std::fs::File::create(&path)
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
    path
}

/// A 50-byte plain-text file disguised as a PDF: under the plausibility
/// floor, so extraction substitutes the placeholder string.
fn tiny_report_file(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::File::create(&path)
        .unwrap()
        .write_all(b"too short to be a meaningful health report!!!!!!!!")
        .unwrap();
    path
}

// ── Parse/repair behaviour through the full pipeline ─────────────────────

#[tokio::test]
async fn fenced_response_is_recovered_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let path = lab_report_file(&dir, "labs.pdf");
    let provider = ScriptedProvider::new(vec![Scripted::Text(FENCED_RESPONSE)]);
    let config = config_with(&provider);

    let insights = analyze_file(&path, "Jona Health", &config).await.unwrap();

    assert_eq!(provider.calls(), 1, "fence stripping must not trigger the retry");
    assert_eq!(insights.summary, "CRP and HbA1c are within range.");
    assert_eq!(insights.key_metrics[0].name, "CRP");
}

#[tokio::test]
async fn prose_wrapped_response_is_salvaged_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let path = lab_report_file(&dir, "labs.pdf");
    let provider = ScriptedProvider::new(vec![Scripted::Text(PROSE_WRAPPED_RESPONSE)]);
    let config = config_with(&provider);

    let insights = analyze_file(&path, "Iollo", &config).await.unwrap();

    assert_eq!(provider.calls(), 1, "salvage parse must not trigger the retry");
    assert_eq!(insights.key_metrics[0].name, "Vitamin D");
}

#[tokio::test]
async fn garbage_first_response_retries_once_with_strict_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let path = lab_report_file(&dir, "labs.pdf");
    let provider = ScriptedProvider::new(vec![
        Scripted::Text("I'm sorry, I can't read this document."),
        Scripted::Text(VALID_RESPONSE),
    ]);
    let config = config_with(&provider);

    let insights = analyze_file(&path, "NeuroAge", &config).await.unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(insights.key_metrics[0].name, "CRP");

    // Retry uses the strict single-example prompt at tighter settings.
    assert!(provider.prompt(1).contains("EXACT structure"));
    assert_eq!(provider.options(0), (0.3, 2000));
    assert_eq!(provider.options(1), (0.1, 1500));
}

#[tokio::test]
async fn placeholder_output_is_rejected_and_retried() {
    let dir = tempfile::tempdir().unwrap();
    let path = lab_report_file(&dir, "labs.pdf");
    let provider = ScriptedProvider::new(vec![
        Scripted::Text(PLACEHOLDER_RESPONSE),
        Scripted::Text(VALID_RESPONSE),
    ]);
    let config = config_with(&provider);

    let insights = analyze_file(&path, "Iollo", &config).await.unwrap();
    assert_eq!(provider.calls(), 2, "placeholder metrics must be retried, not returned");
    assert_eq!(insights.key_metrics[0].name, "CRP");
}

#[tokio::test]
async fn two_unusable_responses_fail_permanently() {
    let dir = tempfile::tempdir().unwrap();
    let path = lab_report_file(&dir, "labs.pdf");
    let provider = ScriptedProvider::new(vec![
        Scripted::Text(PLACEHOLDER_RESPONSE),
        Scripted::Text("still not json"),
    ]);
    let config = config_with(&provider);

    let err = analyze_file(&path, "Iollo", &config).await.unwrap_err();
    assert_eq!(provider.calls(), 2);
    assert!(matches!(err, CopilotError::UnusableResponse { .. }));
    assert_eq!(err.user_message(), "Could not understand the response");
}

#[tokio::test]
async fn http_errors_are_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let path = lab_report_file(&dir, "labs.pdf");
    let provider = ScriptedProvider::new(vec![Scripted::HttpStatus(503)]);
    let config = config_with(&provider);

    let err = analyze_file(&path, "Iollo", &config).await.unwrap_err();
    assert_eq!(provider.calls(), 1, "transport failures get no automatic retry");
    assert!(matches!(err, CopilotError::ApiStatus { status: 503, .. }));
}

// ── Extraction edge cases through the pipeline ───────────────────────────

#[tokio::test]
async fn tiny_disguised_file_sends_placeholder_text_and_still_yields_insights() {
    let dir = tempfile::tempdir().unwrap();
    let path = tiny_report_file(&dir, "tiny.pdf");
    let provider = ScriptedProvider::new(vec![Scripted::Text(VALID_RESPONSE)]);
    let config = config_with(&provider);

    let insights = analyze_file(&path, "TokuEyes", &config).await.unwrap();

    // The model saw the synthetic placeholder naming the file, not the
    // 50 bytes of content.
    assert!(provider.prompt(0).contains("PDF content extracted from tiny.pdf"));

    // Whatever came back, every list is present.
    let value = serde_json::to_value(&insights).unwrap();
    for list in ["keyMetrics", "recommendations", "riskFactors", "trends"] {
        assert!(value[list].is_array(), "{list} must always be an array");
    }
}

#[tokio::test]
async fn wrong_file_type_rejected_before_any_provider_call() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "not a report").unwrap();
    let provider = ScriptedProvider::new(vec![]);
    let config = config_with(&provider);

    let err = analyze_file(&path, "Iollo", &config).await.unwrap_err();
    assert!(matches!(err, CopilotError::NotAPdf { .. }));
    assert_eq!(provider.calls(), 0);
}

// ── Batch: concurrent extraction, single combined call ───────────────────

#[tokio::test]
async fn batch_analysis_joins_into_one_call() {
    let dir = tempfile::tempdir().unwrap();
    let paths = vec![
        lab_report_file(&dir, "q1.pdf"),
        lab_report_file(&dir, "q2.pdf"),
        lab_report_file(&dir, "q3.pdf"),
    ];
    let provider = ScriptedProvider::new(vec![Scripted::Text(VALID_RESPONSE)]);
    let config = config_with(&provider);

    analyze_files(&paths, "Jona Health", &config).await.unwrap();

    assert_eq!(provider.calls(), 1, "batch must join into exactly one analysis call");
    let prompt = provider.prompt(0);
    // Sections appear in input order regardless of extraction completion order.
    let p1 = prompt.find("=== Report: q1.pdf ===").unwrap();
    let p2 = prompt.find("=== Report: q2.pdf ===").unwrap();
    let p3 = prompt.find("=== Report: q3.pdf ===").unwrap();
    assert!(p1 < p2 && p2 < p3);
}

// ── Store-backed ingestion ───────────────────────────────────────────────

#[tokio::test]
async fn ingest_records_report_and_attaches_insights() {
    let dir = tempfile::tempdir().unwrap();
    let path = lab_report_file(&dir, "labs.pdf");
    let backend = MemoryBackend::new();
    let mut store = ProfileStore::new(backend.clone());
    store.set(UserProfile::default());

    let provider = ScriptedProvider::new(vec![Scripted::Text(VALID_RESPONSE)]);
    let config = config_with(&provider);

    let record = ingest_file(&mut store, &path, "Jona Health", &config)
        .await
        .unwrap();
    assert!(record.insights.is_some());

    // A fresh store over the same backend sees the persisted record.
    let mut fresh = ProfileStore::new(backend);
    let profile = fresh.get().unwrap();
    assert_eq!(profile.reports.len(), 1);
    assert_eq!(profile.reports[0].id, record.id);
    assert_eq!(
        profile.reports[0].insights.as_ref().unwrap().summary,
        "CRP and HbA1c are within range."
    );
}

#[tokio::test]
async fn failed_analysis_keeps_the_uploaded_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = lab_report_file(&dir, "labs.pdf");
    let mut store = ProfileStore::new(MemoryBackend::new());
    store.set(UserProfile::default());

    let provider = ScriptedProvider::new(vec![Scripted::HttpStatus(500)]);
    let config = config_with(&provider);

    let err = ingest_file(&mut store, &path, "Iollo", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, CopilotError::ApiStatus { .. }));

    // The upload survived; only the insights are missing.
    let profile = store.get().unwrap();
    assert_eq!(profile.reports.len(), 1);
    assert!(profile.reports[0].insights.is_none());
}

#[tokio::test]
async fn reanalyze_uses_stored_text_and_updates_insights() {
    let mut store = ProfileStore::new(MemoryBackend::new());
    store.set(UserProfile::default());
    let mut record = ReportRecord::new("labs.pdf", "Iollo", "CRP 0.8 mg/L stable");
    record.id = "fixed-id".into();
    store.add_report(record).unwrap();

    let provider = ScriptedProvider::new(vec![Scripted::Text(VALID_RESPONSE)]);
    let config = config_with(&provider);

    let insights = reanalyze_report(&mut store, "fixed-id", &config)
        .await
        .unwrap();
    assert!(provider.prompt(0).contains("CRP 0.8 mg/L stable"));
    assert_eq!(
        store.get().unwrap().reports[0].insights.as_ref(),
        Some(&insights)
    );
}

#[tokio::test]
async fn reanalyze_unknown_id_is_an_error() {
    let mut store = ProfileStore::new(MemoryBackend::new());
    store.set(UserProfile::default());
    let provider = ScriptedProvider::new(vec![]);
    let config = config_with(&provider);

    let err = reanalyze_report(&mut store, "missing", &config)
        .await
        .unwrap_err();
    assert!(matches!(err, CopilotError::ReportNotFound { .. }));
    assert_eq!(provider.calls(), 0);
}

// ── Report ordering contract ─────────────────────────────────────────────

#[tokio::test]
async fn sequential_uploads_append_in_order_and_latest_is_by_timestamp() {
    let mut store = ProfileStore::new(MemoryBackend::new());
    store.set(UserProfile::default());

    let mut a = ReportRecord::new("a.pdf", "Iollo", "");
    a.id = "a".into();
    let mut b = ReportRecord::new("b.pdf", "Iollo", "");
    b.id = "b".into();
    // b uploaded after a, so it carries the later timestamp.
    b.uploaded_at = a.uploaded_at + chrono::Duration::seconds(1);
    store.add_report(a).unwrap();
    store.add_report(b).unwrap();

    let profile = store.get().unwrap();
    let ids: Vec<&str> = profile.reports.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"], "append semantics: insertion order preserved");
    assert_eq!(profile.latest_report().unwrap().id, "b");
    assert_eq!(
        profile.reports_for_platform("Iollo")[0].id,
        "b",
        "platform reads are newest-first by timestamp, not by index"
    );
}
