//! Text extraction: turn raw report bytes into a plain-text string.
//!
//! Two strategies exist and are never combined (see
//! [`crate::config::ExtractionStrategy`]):
//!
//! * **Heuristic** — a byte scan that keeps printable ASCII and throws the
//!   rest away. It mangles non-ASCII text and all PDF structural data, but
//!   it is total: any input produces *some* string, bottoming out at a
//!   synthetic placeholder that names the file. Downstream stages can rely
//!   on never receiving empty input.
//!
//! * **Structured** — delegation to the `pdf-extract` crate, which walks
//!   pages and concatenates recognised text runs. Higher fidelity on
//!   well-formed documents, but fails loudly: a parser error or an empty
//!   result is a hard error, not a placeholder.
//!
//! Both strategies cap output at [`EXTRACT_CHAR_BUDGET`] characters with
//! sentence-boundary-aware truncation, keeping the analysis prompt bounded.
//! Extraction is CPU-bound; async callers run it under `spawn_blocking`
//! (see [`crate::analyze`]).

use crate::config::ExtractionStrategy;
use crate::error::CopilotError;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Maximum characters of extracted text handed to analysis.
pub const EXTRACT_CHAR_BUDGET: usize = 200_000;

/// Below this many characters the heuristic result is considered
/// implausible and replaced by the placeholder string.
pub const MIN_PLAUSIBLE_CHARS: usize = 100;

/// Extract text from report bytes using the configured strategy.
pub fn extract_text(
    bytes: &[u8],
    filename: &str,
    strategy: ExtractionStrategy,
) -> Result<String, CopilotError> {
    match strategy {
        ExtractionStrategy::Heuristic => Ok(heuristic_extract(bytes, filename)),
        ExtractionStrategy::Structured => structured_extract(bytes, filename),
    }
}

// ── Heuristic strategy ───────────────────────────────────────────────────

static RE_WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Byte-scan extraction. Total: always returns a non-empty string.
pub fn heuristic_extract(bytes: &[u8], filename: &str) -> String {
    let scanned = scan_printable(bytes);
    let collapsed = RE_WHITESPACE_RUN.replace_all(&scanned, " ");
    let text = truncate_at_boundary(collapsed.trim(), EXTRACT_CHAR_BUDGET);

    if text.len() < MIN_PLAUSIBLE_CHARS {
        debug!(
            "heuristic extraction yielded only {} chars from '{}', substituting placeholder",
            text.len(),
            filename
        );
        return placeholder_text(filename);
    }

    debug!("extracted {} characters from '{}'", text.len(), filename);
    text.to_string()
}

/// Keep bytes in the printable-ASCII range (space through tilde), mapping
/// everything else — including all multi-byte UTF-8 — to nothing.
fn scan_printable(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len().min(EXTRACT_CHAR_BUDGET * 2));
    for &b in bytes {
        if (32..=126).contains(&b) {
            text.push(b as char);
        } else {
            // Preserve a separator so words across discarded bytes don't fuse.
            text.push(' ');
        }
    }
    text
}

/// Cut `text` down to at most `budget` bytes, preferring the last
/// sentence boundary within the final 20% of the budget, then the last
/// word boundary, then a hard cut.
///
/// Structured extraction can hand this non-ASCII text, so the hard cut
/// backs off to the nearest character boundary.
fn truncate_at_boundary(text: &str, budget: usize) -> String {
    if text.len() <= budget {
        return text.to_string();
    }

    let mut cut = budget;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let truncated = &text[..cut];
    let floor = budget * 4 / 5;

    if let Some(period) = truncated.rfind('.') {
        if period > floor {
            return truncated[..=period].to_string();
        }
    }
    if let Some(space) = truncated.rfind(' ') {
        if space > floor {
            return truncated[..space].to_string();
        }
    }
    truncated.to_string()
}

/// Synthetic stand-in when a document yields no plausible text, so the
/// analysis stage always receives non-empty input that names the file.
pub fn placeholder_text(filename: &str) -> String {
    format!(
        "PDF content extracted from {filename}. This PDF contains health and \
         biomarker data that will be analyzed by AI."
    )
}

// ── Structured strategy ──────────────────────────────────────────────────

/// Structured extraction via `pdf-extract`. Fails on parser errors and on
/// documents that contain no recognisable text.
pub fn structured_extract(bytes: &[u8], filename: &str) -> Result<String, CopilotError> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        CopilotError::ExtractionFailed {
            filename: filename.to_string(),
            detail: e.to_string(),
        }
    })?;

    let text = text.trim();
    if text.is_empty() {
        return Err(CopilotError::EmptyExtraction {
            filename: filename.to_string(),
        });
    }

    let capped = truncate_at_boundary(text, EXTRACT_CHAR_BUDGET);
    if capped.len() < text.len() {
        warn!(
            "structured extraction of '{}' truncated from {} to {} chars",
            filename,
            text.len(),
            capped.len()
        );
    }
    Ok(capped)
}
