//! User profile and uploaded-report records.
//!
//! One [`UserProfile`] exists per session, created during onboarding and
//! mutated through [`crate::store::ProfileStore`]. Every field carries a
//! serde default so that the degraded persistence passes (which strip
//! fields to fit a quota) still hydrate into a usable profile on reload.
//!
//! Report ordering contract: [`UserProfile::reports`] preserves insertion
//! order (append on upload). Any "most recent" read goes through
//! [`UserProfile::latest_report`] or [`UserProfile::reports_for_platform`],
//! which order by upload timestamp — never by list index.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::insights::Insights;

/// Which partner diagnostic platforms the user has data from.
///
/// Platforms are a small open set; these flags cover the onboarding
/// checklist, while [`ReportRecord::platform`] stays free-text so a new
/// partner does not require a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagnosticSelection {
    pub jona_health: bool,
    pub neuro_age: bool,
    pub iollo: bool,
}

/// One uploaded report: metadata, extracted text, and (once analysis has
/// run) the attached [`Insights`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportRecord {
    /// Opaque identifier, unique within the owning profile's report list.
    pub id: String,
    pub filename: String,
    /// Partner platform tag, free text (e.g. "NeuroAge", "Iollo").
    pub platform: String,
    pub uploaded_at: DateTime<Utc>,
    /// Extracted report text. May be truncated or emptied by the store's
    /// degraded persistence passes; the id, metadata, and insights survive.
    pub content: String,
    pub insights: Option<Insights>,
}

impl Default for ReportRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            filename: String::new(),
            platform: String::new(),
            uploaded_at: Utc::now(),
            content: String::new(),
            insights: None,
        }
    }
}

impl ReportRecord {
    /// Create a record for a freshly uploaded report with a generated id
    /// and the current upload timestamp.
    pub fn new(
        filename: impl Into<String>,
        platform: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            filename: filename.into(),
            platform: platform.into(),
            uploaded_at: Utc::now(),
            content: content.into(),
            insights: None,
        }
    }
}

/// Demographics, preferences, and the uploaded-report list for one user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: String,
    pub sex: String,
    /// Either total inches ("71") or a formatted string ("5'11\"").
    pub height: String,
    pub weight: String,
    pub health_goals: String,
    pub current_supplements: String,
    pub diagnostics: DiagnosticSelection,
    pub apple_health_connected: bool,
    pub research_consent: bool,
    /// Opaque per-platform analysis blobs imported from partner exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apple_health_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neuro_age_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iollo_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jona_health_data: Option<serde_json::Value>,
    /// Uploaded reports in insertion (upload) order.
    pub reports: Vec<ReportRecord>,
}

impl UserProfile {
    /// Display name: "First Last", "First", or "User" when unset.
    pub fn full_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            _ => "User".to_string(),
        }
    }

    pub fn has_reports(&self) -> bool {
        !self.reports.is_empty()
    }

    pub fn report_count(&self) -> usize {
        self.reports.len()
    }

    /// The most recently uploaded report, by upload timestamp.
    ///
    /// Ties (same timestamp) resolve to the later list entry, so two
    /// uploads within one clock tick still favour the newer insertion.
    pub fn latest_report(&self) -> Option<&ReportRecord> {
        self.reports
            .iter()
            .enumerate()
            .max_by_key(|(i, r)| (r.uploaded_at, *i))
            .map(|(_, r)| r)
    }

    /// Reports for one platform, most recent first (by upload timestamp).
    pub fn reports_for_platform(&self, platform: &str) -> Vec<&ReportRecord> {
        let mut matching: Vec<&ReportRecord> = self
            .reports
            .iter()
            .filter(|r| r.platform.eq_ignore_ascii_case(platform))
            .collect();
        matching.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        matching
    }

    /// The most recent report for one platform, by upload timestamp.
    pub fn latest_report_for_platform(&self, platform: &str) -> Option<&ReportRecord> {
        self.reports_for_platform(platform).into_iter().next()
    }

    pub fn report_by_id(&self, id: &str) -> Option<&ReportRecord> {
        self.reports.iter().find(|r| r.id == id)
    }
}

// ── Height helpers ───────────────────────────────────────────────────────

static RE_FEET_INCHES: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(\d+)'(\d+)""#).unwrap());

/// Format a height in total inches as a feet'inches string, e.g. `71` →
/// `5'11"`. Returns an empty string for zero.
pub fn format_height(total_inches: u32) -> String {
    if total_inches == 0 {
        return String::new();
    }
    format!("{}'{}\"", total_inches / 12, total_inches % 12)
}

/// Parse a height string into total inches. Accepts `5'11"` or a plain
/// inch count like `71`. Returns `None` when neither form matches.
pub fn parse_height(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(caps) = RE_FEET_INCHES.captures(s) {
        let feet: u32 = caps[1].parse().ok()?;
        let inches: u32 = caps[2].parse().ok()?;
        return Some(feet * 12 + inches);
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report_at(id: &str, platform: &str, ts: i64) -> ReportRecord {
        ReportRecord {
            id: id.to_string(),
            filename: format!("{id}.pdf"),
            platform: platform.to_string(),
            uploaded_at: Utc.timestamp_opt(ts, 0).unwrap(),
            content: String::new(),
            insights: None,
        }
    }

    #[test]
    fn full_name_fallbacks() {
        let mut p = UserProfile::default();
        assert_eq!(p.full_name(), "User");
        p.first_name = "Ada".into();
        assert_eq!(p.full_name(), "Ada");
        p.last_name = "Lovelace".into();
        assert_eq!(p.full_name(), "Ada Lovelace");
    }

    #[test]
    fn latest_report_is_by_timestamp_not_index() {
        let mut p = UserProfile::default();
        // Inserted newest-first: index 0 is NOT the latest by timestamp.
        p.reports.push(report_at("b", "Iollo", 200));
        p.reports.push(report_at("a", "Iollo", 100));
        assert_eq!(p.latest_report().unwrap().id, "b");
    }

    #[test]
    fn latest_report_tie_prefers_later_insertion() {
        let mut p = UserProfile::default();
        p.reports.push(report_at("first", "Iollo", 100));
        p.reports.push(report_at("second", "Iollo", 100));
        assert_eq!(p.latest_report().unwrap().id, "second");
    }

    #[test]
    fn reports_for_platform_sorted_descending() {
        let mut p = UserProfile::default();
        p.reports.push(report_at("old", "NeuroAge", 100));
        p.reports.push(report_at("other", "Iollo", 300));
        p.reports.push(report_at("new", "NeuroAge", 200));
        let neuro: Vec<&str> = p
            .reports_for_platform("NeuroAge")
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(neuro, vec!["new", "old"]);
        assert_eq!(p.latest_report_for_platform("neuroage").unwrap().id, "new");
    }

    #[test]
    fn record_new_generates_unique_ids() {
        let a = ReportRecord::new("a.pdf", "Iollo", "");
        let b = ReportRecord::new("b.pdf", "Iollo", "");
        assert_ne!(a.id, b.id);
        assert!(a.insights.is_none());
    }

    #[test]
    fn height_round_trip() {
        assert_eq!(format_height(71), "5'11\"");
        assert_eq!(parse_height("5'11\""), Some(71));
        assert_eq!(parse_height("71"), Some(71));
        assert_eq!(parse_height(""), None);
        assert_eq!(parse_height("tall"), None);
        assert_eq!(format_height(0), "");
    }

    #[test]
    fn profile_hydrates_from_partial_blob() {
        // Degraded persistence passes store only a subset of fields.
        let p: UserProfile = serde_json::from_str(
            r#"{"firstName":"Ada","email":"ada@example.com","reports":[{"id":"r1","filename":"x.pdf","platform":"Iollo","uploadedAt":"2025-06-01T00:00:00Z"}]}"#,
        )
        .unwrap();
        assert_eq!(p.first_name, "Ada");
        assert_eq!(p.reports.len(), 1);
        assert_eq!(p.reports[0].content, "");
        assert!(!p.diagnostics.iollo);
    }
}
