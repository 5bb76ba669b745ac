//! Append-only meeting history.
//!
//! The log lives in a single JSON document (an array of [`MeetingRecord`]s)
//! that is rewritten in full on every append. Nothing is cached between calls;
//! every read goes back to disk so the file stays the only source of truth.
//!
//! Appends are serialized twice: a tokio mutex orders writers inside this
//! process and an `fs2` exclusive lock on a sibling `.lock` file orders
//! writers across processes. The rewrite goes through a temp file in the same
//! directory followed by a rename, so readers only ever observe a complete log.

use crate::error::{PipelineError, Result};
use fs2::FileExt;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One action item extracted from a meeting. Every field is free-form and may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    #[serde(default, deserialize_with = "lenient_text")]
    pub task: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub owner: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub deadline: Option<String>,
}

impl ActionItem {
    pub fn new(
        task: impl Into<String>,
        owner: impl Into<String>,
        deadline: impl Into<String>,
    ) -> Self {
        Self {
            task: Some(task.into()),
            owner: Some(owner.into()),
            deadline: Some(deadline.into()),
        }
    }
}

/// The persisted outcome of processing one meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRecord {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub summary: String,
    #[serde(default, deserialize_with = "object_items")]
    pub action_items: Vec<ActionItem>,
}

impl MeetingRecord {
    /// Stamp a new record with the current local time.
    pub fn new(summary: impl Into<String>, action_items: Vec<ActionItem>) -> Self {
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            summary: summary.into(),
            action_items,
        }
    }
}

/// Accept strings, nulls, and any other JSON scalar (rendered as text).
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn text_or_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

/// Keep the entries that are JSON objects; anything else is skipped with a warning.
fn object_items<'de, D>(deserializer: D) -> std::result::Result<Vec<ActionItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(entries) => entries,
        serde_json::Value::Null => return Ok(Vec::new()),
        other => {
            warn!("Ignoring action_items that are not a list: {}", other);
            return Ok(Vec::new());
        }
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| {
            if !entry.is_object() {
                warn!("Skipping action item that is not an object: {}", entry);
                return None;
            }
            serde_json::from_value::<ActionItem>(entry)
                .map_err(|e| warn!("Skipping unreadable action item: {}", e))
                .ok()
        })
        .collect())
}

/// File-backed store for the meeting history log.
#[derive(Clone)]
pub struct HistoryStore {
    inner: Arc<HistoryStoreInner>,
}

struct HistoryStoreInner {
    path: PathBuf,
    lock_path: PathBuf,
    writer: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = path.with_extension("json.lock");
        Self {
            inner: Arc::new(HistoryStoreInner {
                path,
                lock_path,
                writer: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Every committed record in append order.
    ///
    /// A missing log is empty history. An unparsable log is also treated as
    /// empty history, but the event is logged so an operator can notice it.
    pub async fn read_all(&self) -> Vec<MeetingRecord> {
        let path = self.inner.path.clone();
        let loaded = tokio::task::spawn_blocking(move || load_records(&path))
            .await
            .unwrap_or_else(|e| Err(PipelineError::Storage(e.to_string())));

        match loaded {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    "Meeting history at {:?} is unreadable, treating as empty: {}",
                    self.inner.path, err
                );
                Vec::new()
            }
        }
    }

    /// The last `min(n, len)` records, oldest first.
    pub async fn read_last_n(&self, n: usize) -> Vec<MeetingRecord> {
        let mut records = self.read_all().await;
        let skip = records.len().saturating_sub(n);
        records.drain(..skip);
        records
    }

    /// Append one record and atomically rewrite the log.
    pub async fn append(&self, record: MeetingRecord) -> Result<()> {
        let _guard = self.inner.writer.lock().await;

        let path = self.inner.path.clone();
        let lock_path = self.inner.lock_path.clone();
        let total = tokio::task::spawn_blocking(move || append_locked(&path, &lock_path, record))
            .await
            .map_err(|e| PipelineError::Storage(format!("History writer task failed: {}", e)))??;

        info!(
            "Appended meeting record to {:?} ({} total)",
            self.inner.path, total
        );
        Ok(())
    }
}

/// Raw log entries. Fails with `PersistenceCorruption` when the file is not a JSON array.
fn load_entries(path: &Path) -> Result<Vec<serde_json::Value>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let bytes = std::fs::read(path)?;
    let content = String::from_utf8(bytes).map_err(|e| {
        PipelineError::PersistenceCorruption(format!("history is not valid UTF-8: {}", e))
    })?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&content).map_err(|e| PipelineError::PersistenceCorruption(e.to_string()))
}

/// Decode entries one by one so a single bad record never hides the rest.
fn load_records(path: &Path) -> Result<Vec<MeetingRecord>> {
    let records = load_entries(path)?
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping unreadable meeting record #{}: {}", index, e);
                None
            }
        })
        .collect();
    Ok(records)
}

fn append_locked(path: &Path, lock_path: &Path, record: MeetingRecord) -> Result<usize> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;
    lock_file.lock_exclusive()?;

    let result = (|| -> Result<usize> {
        // Entries are carried over untouched so skipped records survive the rewrite.
        let mut entries = match load_entries(path) {
            Ok(entries) => entries,
            Err(PipelineError::PersistenceCorruption(reason)) => {
                let quarantine = quarantine_path(path);
                warn!(
                    "Meeting history is corrupt ({}); moving it to {:?} and starting fresh",
                    reason, quarantine
                );
                std::fs::rename(path, &quarantine)?;
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        let entry = serde_json::to_value(&record)
            .map_err(|e| PipelineError::Storage(format!("Failed to serialize record: {}", e)))?;
        entries.push(entry);
        write_atomically(dir, path, &entries)?;
        Ok(entries.len())
    })();

    if let Err(e) = FileExt::unlock(&lock_file) {
        debug!("Failed to release history lock explicitly: {}", e);
    }
    result
}

fn write_atomically(dir: &Path, path: &Path, entries: &[serde_json::Value]) -> Result<()> {
    let content = serde_json::to_string_pretty(entries)
        .map_err(|e| PipelineError::Storage(format!("Failed to serialize history: {}", e)))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PipelineError::Storage(e.to_string()))?;
    Ok(())
}

fn quarantine_path(path: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "meeting_history.json".to_string());
    path.with_file_name(format!("{}.corrupt-{}", name, stamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(summary: &str) -> MeetingRecord {
        MeetingRecord::new(summary, vec![ActionItem::new("Ship it", "Alice", "Friday")])
    }

    #[tokio::test]
    async fn test_missing_log_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        assert!(store.read_all().await.is_empty());
        assert!(store.read_last_n(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_appends_are_read_back_in_order() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        for summary in ["first", "second", "third"] {
            store.append(record(summary)).await.unwrap();
        }

        let summaries: Vec<String> = store
            .read_all()
            .await
            .into_iter()
            .map(|r| r.summary)
            .collect();
        assert_eq!(summaries, vec!["first", "second", "third"]);

        // Reading twice does not change anything
        assert_eq!(store.read_all().await.len(), 3);
    }

    #[tokio::test]
    async fn test_read_last_n_returns_suffix() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        for summary in ["a", "b", "c"] {
            store.append(record(summary)).await.unwrap();
        }

        let last_two: Vec<String> = store
            .read_last_n(2)
            .await
            .into_iter()
            .map(|r| r.summary)
            .collect();
        assert_eq!(last_two, vec!["b", "c"]);
        assert_eq!(store.read_last_n(10).await.len(), 3);
        assert!(store.read_last_n(0).await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_log_reads_as_empty_and_is_quarantined_on_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = HistoryStore::new(&path);
        assert!(store.read_all().await.is_empty());

        store.append(record("fresh start")).await.unwrap();
        let records = store.read_all().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].summary, "fresh start");

        let quarantined = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .count();
        assert_eq!(quarantined, 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(record(&format!("meeting {}", i))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.read_all().await.len(), 16);
    }

    #[test]
    fn test_partial_records_deserialize() {
        let raw = r#"[
            {"timestamp": "2024-05-01T10:00:00", "summary": null,
             "action_items": [{"task": "Draft plan"}, {"owner": "Bob", "deadline": 5}]}
        ]"#;
        let records: Vec<MeetingRecord> = serde_json::from_str(raw).unwrap();
        assert_eq!(records[0].summary, "");
        assert_eq!(records[0].action_items[0].task.as_deref(), Some("Draft plan"));
        assert!(records[0].action_items[0].owner.is_none());
        assert_eq!(records[0].action_items[1].deadline.as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn test_imperfect_records_do_not_hide_the_rest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(
            &path,
            r#"[
                {"timestamp": "2024-05-01T10:00:00", "summary": "Kickoff",
                 "action_items": [{"task": "Draft plan", "owner": "Alice", "deadline": "Friday"}]},
                {"summary": "Budget",
                 "action_items": ["Send invoice to Carol", {"task": "Book room"}]},
                "stray entry"
            ]"#,
        )
        .unwrap();

        let store = HistoryStore::new(&path);
        let records = store.read_all().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].summary, "Kickoff");
        assert_eq!(records[1].timestamp, "");
        assert_eq!(records[1].action_items.len(), 1);
        assert_eq!(records[1].action_items[0].task.as_deref(), Some("Book room"));

        store.append(record("Retro")).await.unwrap();
        assert_eq!(store.read_all().await.len(), 3);

        // The log is not quarantined and the skipped entries are still on disk.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Send invoice to Carol"));
        assert!(raw.contains("stray entry"));
        let quarantined = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .count();
        assert_eq!(quarantined, 0);
    }

    #[tokio::test]
    async fn test_non_utf8_log_is_quarantined_on_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, [0x5b, 0xff, 0xfe, 0x5d]).unwrap();

        let store = HistoryStore::new(&path);
        assert!(store.read_all().await.is_empty());

        store.append(record("after garbage")).await.unwrap();
        let records = store.read_all().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].summary, "after garbage");

        let quarantined: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(quarantined.len(), 1);
        assert_eq!(
            std::fs::read(quarantined[0].path()).unwrap(),
            vec![0x5b, 0xff, 0xfe, 0x5d]
        );
    }

    #[test]
    fn test_persisted_layout_is_json_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let lock = dir.path().join("history.json.lock");
        append_locked(&path, &lock, record("one")).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["summary"], "one");
        assert_eq!(array[0]["action_items"][0]["owner"], "Alice");
        assert!(lock.exists());
    }
}
