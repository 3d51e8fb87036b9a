//! Validation boundary: load a user-supplied report file into memory.
//!
//! All file-level preconditions live here, before any extraction work:
//! the file must exist and be readable, must claim to be a PDF, and must be
//! under the ingestion size ceiling. The extractors downstream do not
//! re-validate — they receive bytes that already passed this gate.
//!
//! "Claims to be a PDF" accepts either signal: a `.pdf` extension or the
//! `%PDF` magic bytes. Real-world exports are frequently plain text or
//! print-to-PDF output with unusual headers, and the heuristic extractor
//! handles those fine; the gate only rejects files that claim neither way.
//! Rejections name the specific reason (wrong type vs too large) so the
//! user knows what to fix.

use crate::config::MAX_FILE_BYTES;
use crate::error::CopilotError;
use std::path::Path;
use tracing::debug;

/// A report file that passed the validation boundary.
#[derive(Debug, Clone)]
pub struct ReportFile {
    /// File name component of the input path.
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Read and validate a report file.
///
/// Checks, in order: existence, size ceiling, readability, PDF claim.
pub async fn load_report_file(path: &Path) -> Result<ReportFile, CopilotError> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => CopilotError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => CopilotError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    if !meta.is_file() {
        return Err(CopilotError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    if meta.len() > MAX_FILE_BYTES {
        return Err(CopilotError::FileTooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            limit: MAX_FILE_BYTES,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => CopilotError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => CopilotError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    validate_pdf_claim(path, &bytes)?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.pdf".to_string());

    debug!("loaded report file: {} ({} bytes)", filename, bytes.len());

    Ok(ReportFile { filename, bytes })
}

/// Accept a `.pdf` extension or the `%PDF` magic; reject everything else.
fn validate_pdf_claim(path: &Path, bytes: &[u8]) -> Result<(), CopilotError> {
    let extension_claims_pdf = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    if extension_claims_pdf || bytes.starts_with(b"%PDF") {
        return Ok(());
    }

    let mut magic = [0u8; 4];
    let head = &bytes[..bytes.len().min(4)];
    magic[..head.len()].copy_from_slice(head);
    Err(CopilotError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    })
}
