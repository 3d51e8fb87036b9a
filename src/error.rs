//! Error types for the r42-copilot library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CopilotError`] — **Fatal to the current operation**: the analysis or
//!   ingestion cannot proceed (bad input file, no API key, unusable model
//!   output). Returned as `Err(CopilotError)` from the top-level `analyze*`
//!   and `ingest*` functions.
//!
//! * [`StorageError`] — **Never fatal**: persistence is best-effort. The
//!   profile store catches these internally, logs them, and keeps serving
//!   the in-memory profile for the rest of the session. Callers only see
//!   this type when talking to a [`crate::store::StorageBackend`] directly.
//!
//! The separation means a full disk or an exceeded quota can never lose an
//! analysis result the user is looking at: it only loses reload survival.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the r42-copilot library.
///
/// Storage failures use [`StorageError`] and are swallowed (logged) by the
/// profile store rather than propagated here.
#[derive(Debug, Error)]
pub enum CopilotError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// No API credential for the requested provider. No network call was made.
    #[error("No API key configured for provider '{provider}'.\nSet {env_var} and retry.")]
    MissingApiKey { provider: String, env_var: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── File errors (validation boundary) ─────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Report file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but does not declare itself a PDF.
    #[error("File is not a PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The file exceeds the ingestion size ceiling.
    #[error("File too large: '{path}' is {size} bytes (limit {limit}).\nExport a smaller report or split it before uploading.")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The structured PDF parser produced no text at all.
    #[error("No text could be extracted from '{filename}'.\nThe document may be scanned images only; try the heuristic extraction strategy.")]
    EmptyExtraction { filename: String },

    /// The structured PDF parser itself failed on the document.
    #[error("Failed to parse PDF '{filename}': {detail}")]
    ExtractionFailed { filename: String, detail: String },

    // ── Network / HTTP errors ─────────────────────────────────────────────
    /// The LLM API returned a non-success status.
    #[error("LLM API error: HTTP {status} from '{provider}'\n{body}")]
    ApiStatus {
        provider: String,
        status: u16,
        body: String,
    },

    /// The request never completed (connectivity, TLS, DNS).
    #[error("Request to provider '{provider}' failed: {detail}\nCheck your internet connection.")]
    RequestFailed { provider: String, detail: String },

    /// The call exceeded the configured per-request timeout.
    #[error("LLM call timed out after {secs}s.\nIncrease the API timeout or retry later.")]
    ApiTimeout { secs: u64 },

    // ── Response-shape errors ─────────────────────────────────────────────
    /// The provider's response envelope did not contain the expected text field.
    #[error("Unexpected response shape from provider '{provider}': {detail}")]
    UnexpectedEnvelope { provider: String, detail: String },

    // ── Parse / validation errors ─────────────────────────────────────────
    /// Model output could not be turned into insights, even after the
    /// salvage parse and one strict-prompt retry.
    #[error("Could not understand the model's response: {detail}\nThe report may contain too little readable text for a structured analysis.")]
    UnusableResponse { detail: String },

    // ── Store errors that ARE the caller's bug ────────────────────────────
    /// `add_report` was called before any profile was set.
    #[error("No profile exists yet; create one before adding reports.")]
    ProfileMissing,

    /// `update_insights` named a report id not present in the profile.
    #[error("No report with id '{id}' in the current profile.")]
    ReportNotFound { id: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CopilotError {
    /// One short, actionable line for end users, collapsing the taxonomy to
    /// the cases a person can act on differently: a configuration problem, a
    /// transient request problem, or a model-quality problem.
    pub fn user_message(&self) -> &'static str {
        match self {
            CopilotError::MissingApiKey { .. } | CopilotError::InvalidConfig(_) => {
                "No API key configured"
            }
            CopilotError::ApiStatus { .. }
            | CopilotError::RequestFailed { .. }
            | CopilotError::ApiTimeout { .. }
            | CopilotError::UnexpectedEnvelope { .. } => "Analysis request failed",
            CopilotError::UnusableResponse { .. } => "Could not understand the response",
            _ => "Analysis failed",
        }
    }
}

/// A non-fatal persistence error.
///
/// Surfaced by [`crate::store::StorageBackend`] implementations; the profile
/// store downgrades these to `tracing` warnings and keeps the in-memory
/// profile authoritative for the session.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The serialized blob would exceed the backend's quota.
    #[error("storage quota exceeded: {attempted} bytes against a {quota}-byte quota")]
    QuotaExceeded { attempted: usize, quota: usize },

    /// Filesystem-level failure underneath the backend.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted blob exists but could not be decoded.
    #[error("persisted profile is corrupt: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_names_env_var() {
        let e = CopilotError::MissingApiKey {
            provider: "gemini".into(),
            env_var: "GEMINI_API_KEY".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("GEMINI_API_KEY"), "got: {msg}");
        assert_eq!(e.user_message(), "No API key configured");
    }

    #[test]
    fn api_status_carries_status_and_body() {
        let e = CopilotError::ApiStatus {
            provider: "openai".into(),
            status: 429,
            body: "rate limited".into(),
        };
        assert!(e.to_string().contains("429"));
        assert!(e.to_string().contains("rate limited"));
        assert_eq!(e.user_message(), "Analysis request failed");
    }

    #[test]
    fn unusable_response_user_message() {
        let e = CopilotError::UnusableResponse {
            detail: "no JSON object found".into(),
        };
        assert_eq!(e.user_message(), "Could not understand the response");
    }

    #[test]
    fn file_too_large_display() {
        let e = CopilotError::FileTooLarge {
            path: PathBuf::from("big.pdf"),
            size: 60_000_000,
            limit: 50 * 1024 * 1024,
        };
        assert!(e.to_string().contains("60000000"));
    }

    #[test]
    fn quota_exceeded_display() {
        let e = StorageError::QuotaExceeded {
            attempted: 2_000_000,
            quota: 1_000_000,
        };
        assert!(e.to_string().contains("2000000"));
    }
}
