//! Profile persistence with progressive degradation.
//!
//! [`ProfileStore`] is an explicit context object with a controlled
//! lifecycle — construct it over a [`StorageBackend`], inject it into
//! whatever owns the session, drop it when the session ends. There is no
//! process-wide singleton; tests and multi-session embedders get clean
//! isolation for free.
//!
//! ## The persistence contract
//!
//! The in-memory profile is authoritative; the backend is a best-effort
//! cache for reload survival. [`ProfileStore::set`] always succeeds in
//! memory. Persistence then runs in three descending-fidelity passes:
//!
//! 1. full profile, per-report content truncated to a character budget,
//!    under a ~1 MB serialized ceiling
//! 2. report content dropped entirely; metadata and insights kept
//! 3. essential fields only (name, email, report metadata + insights)
//!
//! A pass that fails (quota, I/O) falls through to the next; when all
//! three fail the profile stays memory-only for the session and the
//! failure is logged, never returned.
//!
//! Access is sequential (`&mut self`); two interleaved updates to the same
//! report resolve as last-write-wins, matching single-session use.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::error::{CopilotError, StorageError};
use crate::insights::Insights;
use crate::profile::{ReportRecord, UserProfile};

/// The single logical key owning all profile data.
pub const STORE_KEY: &str = "r42-user-data";

/// Version stamped into every persisted blob; bump on incompatible layout
/// changes so old blobs are discarded instead of misread.
pub const SCHEMA_VERSION: u32 = 1;

/// Serialized-size ceiling for the full-fidelity pass.
const MAX_BLOB_BYTES: usize = 1_000_000;

/// Per-report content budget for the full-fidelity pass.
const REPORT_CONTENT_BUDGET: usize = 1_000;

/// Tighter per-report budget tried before giving up on pass 1.
const REPORT_CONTENT_BUDGET_TIGHT: usize = 500;

/// Total persisted bytes across all keys before foreign keys are evicted.
const TOTAL_USAGE_HIGH_WATER: u64 = 4_000_000;

/// Size at which the profile blob alone is removed ahead of a rewrite.
const PROFILE_BLOB_HIGH_WATER: u64 = 800_000;

/// The serialized form written to the backend.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredBlob {
    schema_version: u32,
    profile: UserProfile,
}

// ── Storage backends ─────────────────────────────────────────────────────

/// A small key-value surface over whatever persistence the host offers.
///
/// Implementations report quota and I/O problems as [`StorageError`]; the
/// profile store decides what failure means (it never propagates them).
pub trait StorageBackend: Send {
    fn save(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// In-memory backend with an optional total-bytes quota.
///
/// Cloning shares the underlying map, so a test can keep a handle to
/// inspect what the store persisted. The quota applies across all keys,
/// like a browser origin quota.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            inner: Arc::default(),
            quota: Some(quota),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // Lock poisoning only happens if a holder panicked; the map itself
        // is still coherent for a key-value store.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StorageBackend for MemoryBackend {
    fn save(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.lock();
        if let Some(quota) = self.quota {
            let others: usize = map
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            if others + value.len() > quota {
                return Err(StorageError::QuotaExceeded {
                    attempted: others + value.len(),
                    quota,
                });
            }
        }
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock().keys().cloned().collect())
    }
}

/// File-backed backend: one `<key>.json` per key inside a directory,
/// written atomically (temp file + rename) so a crash never leaves a
/// half-written blob.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Platform data directory, e.g. `~/.local/share/r42-copilot`.
    pub fn open_default() -> Result<Self, StorageError> {
        let base = dirs::data_dir().ok_or_else(|| {
            StorageError::Io(std::io::Error::other("no platform data directory"))
        })?;
        Self::new(base.join("r42-copilot"))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileBackend {
    fn save(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(self.path_for(key))
            .map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        Ok(keys)
    }
}

// ── Profile store ────────────────────────────────────────────────────────

/// Session-scoped owner of the [`UserProfile`] and its persisted form.
pub struct ProfileStore {
    profile: Option<UserProfile>,
    backend: Box<dyn StorageBackend>,
}

impl ProfileStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            profile: None,
            backend: Box::new(backend),
        }
    }

    /// Store backed by the platform data directory.
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self::new(FileBackend::open_default()?))
    }

    /// Replace the profile and persist best-effort. Always succeeds in
    /// memory; persistence problems are logged, never returned.
    pub fn set(&mut self, profile: UserProfile) {
        self.profile = Some(profile);
        self.persist();
    }

    /// The current profile, hydrating from the backend on first access.
    pub fn get(&mut self) -> Option<&UserProfile> {
        if self.profile.is_none() {
            self.hydrate();
        }
        self.profile.as_ref()
    }

    /// Append a report to the profile's list and re-persist.
    ///
    /// Append order is preserved; "most recent" reads go through the
    /// timestamp-based accessors on [`UserProfile`], not list position.
    pub fn add_report(&mut self, record: ReportRecord) -> Result<(), CopilotError> {
        self.get();
        let profile = self.profile.as_mut().ok_or(CopilotError::ProfileMissing)?;
        profile.reports.push(record);
        self.persist();
        Ok(())
    }

    /// Attach insights to the report with the given id and re-persist.
    pub fn update_insights(
        &mut self,
        report_id: &str,
        insights: Insights,
    ) -> Result<(), CopilotError> {
        self.get();
        let profile = self.profile.as_mut().ok_or(CopilotError::ProfileMissing)?;
        let report = profile
            .reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| CopilotError::ReportNotFound {
                id: report_id.to_string(),
            })?;
        report.insights = Some(insights);
        self.persist();
        Ok(())
    }

    /// Drop the in-memory profile and remove the persisted blob.
    pub fn clear(&mut self) {
        self.profile = None;
        if let Err(e) = self.backend.remove(STORE_KEY) {
            warn!("failed to remove persisted profile: {e}");
        }
    }

    /// Total bytes currently persisted across all keys in the backend.
    pub fn persisted_usage(&self) -> u64 {
        let Ok(keys) = self.backend.keys() else {
            return 0;
        };
        keys.iter()
            .filter_map(|k| self.backend.load(k).ok().flatten())
            .map(|v| v.len() as u64)
            .sum()
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn hydrate(&mut self) {
        match self.backend.load(STORE_KEY) {
            Ok(Some(blob)) => match serde_json::from_str::<StoredBlob>(&blob) {
                Ok(stored) if stored.schema_version == SCHEMA_VERSION => {
                    debug!("hydrated profile from persisted blob ({} bytes)", blob.len());
                    self.profile = Some(stored.profile);
                }
                Ok(stored) => {
                    warn!(
                        "persisted profile has schema version {} (expected {}); ignoring",
                        stored.schema_version, SCHEMA_VERSION
                    );
                }
                Err(e) => warn!("persisted profile is corrupt, ignoring: {e}"),
            },
            Ok(None) => {}
            Err(e) => warn!("failed to read persisted profile: {e}"),
        }
    }

    /// Run housekeeping, then the three persistence passes.
    fn persist(&mut self) {
        let Some(profile) = self.profile.clone() else {
            return;
        };
        self.housekeeping();

        // Pass 1: full profile, report content truncated.
        let mut blob = serialize(truncate_report_content(&profile, REPORT_CONTENT_BUDGET));
        if blob.len() > MAX_BLOB_BYTES {
            blob = serialize(truncate_report_content(&profile, REPORT_CONTENT_BUDGET_TIGHT));
        }
        if blob.len() <= MAX_BLOB_BYTES {
            match self.backend.save(STORE_KEY, &blob) {
                Ok(()) => {
                    debug!("profile persisted ({} bytes)", blob.len());
                    return;
                }
                Err(e) => warn!("full-fidelity persist failed: {e}"),
            }
        } else {
            warn!(
                "profile blob is {} bytes even after truncation; dropping report content",
                blob.len()
            );
        }

        // Pass 2: drop report content, keep metadata and insights.
        let blob = serialize(strip_report_content(&profile));
        match self.backend.save(STORE_KEY, &blob) {
            Ok(()) => {
                debug!("profile persisted without report content ({} bytes)", blob.len());
                return;
            }
            Err(e) => warn!("metadata-only persist failed: {e}"),
        }

        // Pass 3: essential fields only.
        let blob = serialize(essential_projection(&profile));
        match self.backend.save(STORE_KEY, &blob) {
            Ok(()) => debug!("essential profile persisted ({} bytes)", blob.len()),
            Err(e) => warn!("all persistence passes failed, profile is memory-only: {e}"),
        }
    }

    /// Evict before writing: foreign keys when total usage is high, and an
    /// oversized profile blob ahead of its rewrite.
    fn housekeeping(&mut self) {
        let keys = match self.backend.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("storage housekeeping skipped: {e}");
                return;
            }
        };

        let usage: u64 = keys
            .iter()
            .filter_map(|k| self.backend.load(k).ok().flatten())
            .map(|v| v.len() as u64)
            .sum();

        if usage > TOTAL_USAGE_HIGH_WATER {
            warn!("persisted usage {usage} bytes over high-water mark, evicting foreign keys");
            for key in keys.iter().filter(|k| k.as_str() != STORE_KEY) {
                if let Err(e) = self.backend.remove(key) {
                    warn!("failed to evict '{key}': {e}");
                }
            }
        }

        if let Ok(Some(blob)) = self.backend.load(STORE_KEY) {
            if blob.len() as u64 > PROFILE_BLOB_HIGH_WATER {
                warn!(
                    "persisted profile blob is {} bytes, removing ahead of rewrite",
                    blob.len()
                );
                if let Err(e) = self.backend.remove(STORE_KEY) {
                    warn!("failed to remove oversized profile blob: {e}");
                }
            }
        }
    }
}

// ── Projection helpers ───────────────────────────────────────────────────

fn serialize(profile: UserProfile) -> String {
    serde_json::to_string(&StoredBlob {
        schema_version: SCHEMA_VERSION,
        profile,
    })
    // UserProfile contains nothing that can fail to serialize (no maps with
    // non-string keys, no non-finite floats).
    .unwrap_or_default()
}

fn truncate_report_content(profile: &UserProfile, budget: usize) -> UserProfile {
    let mut profile = profile.clone();
    for report in &mut profile.reports {
        truncate_on_char_boundary(&mut report.content, budget);
    }
    profile
}

fn strip_report_content(profile: &UserProfile) -> UserProfile {
    let mut profile = profile.clone();
    for report in &mut profile.reports {
        report.content.clear();
    }
    profile
}

/// Name, email, and report metadata + insights; everything else defaulted.
fn essential_projection(profile: &UserProfile) -> UserProfile {
    let stripped = strip_report_content(profile);
    UserProfile {
        first_name: stripped.first_name,
        last_name: stripped.last_name,
        email: stripped.email,
        reports: stripped.reports,
        ..UserProfile::default()
    }
}

fn truncate_on_char_boundary(s: &mut String, max_bytes: usize) {
    if s.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::Insights;

    fn profile_with_report(content: &str) -> UserProfile {
        let mut profile = UserProfile {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            health_goals: "sleep more".into(),
            ..UserProfile::default()
        };
        profile
            .reports
            .push(ReportRecord::new("labs.pdf", "Jona Health", content));
        profile
    }

    fn hydrated(backend: &MemoryBackend) -> Option<UserProfile> {
        let mut fresh = ProfileStore::new(backend.clone());
        fresh.get().cloned()
    }

    #[test]
    fn round_trip_preserves_small_profile() {
        let backend = MemoryBackend::new();
        let mut store = ProfileStore::new(backend.clone());
        let profile = profile_with_report("short report text");
        store.set(profile.clone());

        assert_eq!(store.get(), Some(&profile));
        // A fresh store over the same backend hydrates the same profile.
        assert_eq!(hydrated(&backend), Some(profile));
    }

    #[test]
    fn long_content_is_truncated_in_persistence_only() {
        let backend = MemoryBackend::new();
        let mut store = ProfileStore::new(backend.clone());
        let long = "x".repeat(5_000);
        store.set(profile_with_report(&long));

        // In-memory copy keeps the full text.
        assert_eq!(store.get().unwrap().reports[0].content.len(), 5_000);
        // Persisted copy is budgeted.
        let reloaded = hydrated(&backend).unwrap();
        assert_eq!(reloaded.reports[0].content.len(), REPORT_CONTENT_BUDGET);
    }

    #[test]
    fn quota_forces_essential_projection() {
        // Room for the essential blob but not for the full profile.
        let backend = MemoryBackend::with_quota(1_200);
        let mut store = ProfileStore::new(backend.clone());
        let mut profile = profile_with_report(&"y".repeat(3_000));
        profile.current_supplements = "z".repeat(2_000);
        store.set(profile.clone());

        // In memory: authoritative and complete.
        assert_eq!(store.get().unwrap().current_supplements.len(), 2_000);

        // Persisted: essential fields only.
        let reloaded = hydrated(&backend).unwrap();
        assert_eq!(reloaded.first_name, "Ada");
        assert_eq!(reloaded.email, "ada@example.com");
        assert_eq!(reloaded.current_supplements, "");
        assert_eq!(reloaded.reports.len(), 1);
        assert_eq!(reloaded.reports[0].content, "");
    }

    #[test]
    fn hopeless_quota_leaves_profile_memory_only() {
        let backend = MemoryBackend::with_quota(10);
        let mut store = ProfileStore::new(backend.clone());
        store.set(profile_with_report("text"));

        // set() still succeeded in memory.
        assert!(store.get().is_some());
        // Nothing persisted at all.
        assert_eq!(hydrated(&backend), None);
    }

    #[test]
    fn add_report_requires_profile() {
        let mut store = ProfileStore::new(MemoryBackend::new());
        let err = store
            .add_report(ReportRecord::new("a.pdf", "Iollo", ""))
            .unwrap_err();
        assert!(matches!(err, CopilotError::ProfileMissing));
    }

    #[test]
    fn add_report_appends_in_order() {
        let mut store = ProfileStore::new(MemoryBackend::new());
        store.set(UserProfile::default());

        let mut a = ReportRecord::new("a.pdf", "Iollo", "");
        a.id = "a".into();
        let mut b = ReportRecord::new("b.pdf", "Iollo", "");
        b.id = "b".into();
        store.add_report(a).unwrap();
        store.add_report(b).unwrap();

        let ids: Vec<&str> = store
            .get()
            .unwrap()
            .reports
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn update_insights_attaches_and_persists() {
        let backend = MemoryBackend::new();
        let mut store = ProfileStore::new(backend.clone());
        store.set(UserProfile::default());
        let record = ReportRecord::new("a.pdf", "NeuroAge", "content");
        let id = record.id.clone();
        store.add_report(record).unwrap();

        let insights = Insights {
            summary: "all good".into(),
            ..Insights::default()
        };
        store.update_insights(&id, insights.clone()).unwrap();

        assert_eq!(
            store.get().unwrap().reports[0].insights.as_ref(),
            Some(&insights)
        );
        let reloaded = hydrated(&backend).unwrap();
        assert_eq!(reloaded.reports[0].insights, Some(insights));
    }

    #[test]
    fn update_insights_unknown_id_is_an_error() {
        let mut store = ProfileStore::new(MemoryBackend::new());
        store.set(UserProfile::default());
        let err = store
            .update_insights("nope", Insights::default())
            .unwrap_err();
        assert!(matches!(err, CopilotError::ReportNotFound { .. }));
    }

    #[test]
    fn clear_drops_memory_and_persisted_blob() {
        let backend = MemoryBackend::new();
        let mut store = ProfileStore::new(backend.clone());
        store.set(profile_with_report("text"));
        store.clear();

        assert!(store.get().is_none());
        assert_eq!(hydrated(&backend), None);
    }

    #[test]
    fn housekeeping_evicts_foreign_keys_over_high_water() {
        let mut backend = MemoryBackend::new();
        backend
            .save("unrelated-cache", &"j".repeat(4_100_000))
            .unwrap();
        let mut store = ProfileStore::new(backend.clone());
        store.set(profile_with_report("text"));

        assert_eq!(backend.load("unrelated-cache").unwrap(), None);
        // The profile itself survived the eviction.
        assert!(backend.load(STORE_KEY).unwrap().is_some());
    }

    #[test]
    fn corrupt_blob_is_ignored_not_fatal() {
        let mut backend = MemoryBackend::new();
        backend.save(STORE_KEY, "{not json").unwrap();
        let mut store = ProfileStore::new(backend);
        assert!(store.get().is_none());
    }

    #[test]
    fn future_schema_version_is_ignored() {
        let mut backend = MemoryBackend::new();
        backend
            .save(
                STORE_KEY,
                r#"{"schemaVersion":99,"profile":{"firstName":"Ada"}}"#,
            )
            .unwrap();
        let mut store = ProfileStore::new(backend);
        assert!(store.get().is_none());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let mut s = "héllo wörld".to_string();
        truncate_on_char_boundary(&mut s, 2);
        assert_eq!(s, "h");
    }
}
