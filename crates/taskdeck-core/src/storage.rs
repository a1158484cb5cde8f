use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::task::Task;

/// Fixed key the whole task collection is stored under.
pub const TASKS_KEY: &str = "tasks";

/// Opaque key-value persistence, one serialized payload per key.
pub trait Storage {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn save(&self, key: &str, payload: &str) -> anyhow::Result<()>;
}

impl<S: Storage + ?Sized> Storage for Rc<S> {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, payload: &str) -> anyhow::Result<()> {
        (**self).save(key, payload)
    }
}

/// One JSON file per key inside a data directory, written atomically.
#[derive(Debug)]
pub struct JsonFileStorage {
    data_dir: PathBuf,
}

impl JsonFileStorage {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened file storage");
        Ok(Self { data_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }
}

impl Storage for JsonFileStorage {
    #[tracing::instrument(skip(self))]
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(file = %path.display(), "no stored payload");
            return Ok(None);
        }

        let payload = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        debug!(file = %path.display(), bytes = payload.len(), "loaded payload");
        Ok(Some(payload))
    }

    #[tracing::instrument(skip(self, payload))]
    fn save(&self, key: &str, payload: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        debug!(file = %path.display(), bytes = payload.len(), "saving payload atomically");

        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        temp.write_all(payload.as_bytes())?;
        temp.flush()?;

        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

        Ok(())
    }
}

/// Keeps payloads in a map; the storage double for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.borrow().get(key).cloned()
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn save(&self, key: &str, payload: &str) -> anyhow::Result<()> {
        self.map
            .borrow_mut()
            .insert(key.to_string(), payload.to_string());
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredTask {
    Full(Task),
    Legacy(String),
}

/// Decodes a stored task list. Plain strings are the legacy format and
/// upgrade to minimal tasks; records that no longer parse are skipped, not
/// fatal.
pub fn decode_tasks(payload: &str, now: DateTime<Utc>) -> anyhow::Result<Vec<Task>> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(payload).context("stored task list is not a JSON array")?;

    let mut tasks = Vec::with_capacity(raw.len());
    for (idx, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<StoredTask>(value) {
            Ok(StoredTask::Full(task)) => tasks.push(task),
            Ok(StoredTask::Legacy(title)) => {
                debug!(index = idx, "upgrading legacy string entry");
                tasks.push(Task::from_legacy_title(title, now));
            }
            Err(err) => {
                warn!(index = idx, error = %err, "skipping unreadable task record");
            }
        }
    }

    debug!(count = tasks.len(), "decoded stored tasks");
    Ok(tasks)
}

pub fn encode_tasks(tasks: &[Task]) -> anyhow::Result<String> {
    serde_json::to_string(tasks).context("failed to serialize task list")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use super::{JsonFileStorage, MemoryStorage, Storage, TASKS_KEY, decode_tasks, encode_tasks};
    use crate::task::{Priority, Task, TaskDraft};

    #[test]
    fn legacy_string_entries_upgrade_to_minimal_tasks() {
        let now = Utc.with_ymd_and_hms(2026, 8, 4, 9, 0, 0).unwrap();
        let tasks = decode_tasks(r#"["Buy milk", "Call mom"]"#, now).expect("decode legacy");

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Buy milk");
        assert!(!tasks[0].completed);
        assert!(tasks[0].subtasks.is_empty());
        assert_ne!(tasks[0].id, tasks[1].id);
    }

    #[test]
    fn mixed_payloads_keep_full_records_and_upgrade_strings() {
        let now = Utc.with_ymd_and_hms(2026, 8, 4, 9, 0, 0).unwrap();
        let full = Task::new(
            TaskDraft {
                title: "Plan trip".to_string(),
                priority: Priority::High,
                ..TaskDraft::default()
            },
            now,
        );
        let payload = format!(
            r#"["Water plants", {}]"#,
            serde_json::to_string(&full).expect("serialize")
        );

        let tasks = decode_tasks(&payload, now).expect("decode mixed");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Water plants");
        assert_eq!(tasks[1].title, "Plan trip");
        assert_eq!(tasks[1].priority, Priority::High);
    }

    #[test]
    fn unreadable_records_are_skipped_not_fatal() {
        let now = Utc.with_ymd_and_hms(2026, 8, 4, 9, 0, 0).unwrap();
        // Old mobile builds used epoch-millis ids, which are not uuids.
        let payload = r#"[{"id": "1691429384317", "title": "stale"}, "Buy milk"]"#;

        let tasks = decode_tasks(payload, now).expect("decode");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Buy milk");

        assert!(decode_tasks("{\"not\": \"a list\"}", now).is_err());
    }

    #[test]
    fn file_storage_roundtrips_through_the_data_dir() {
        let temp = tempdir().expect("tempdir");
        let storage = JsonFileStorage::open(temp.path()).expect("open storage");

        assert_eq!(storage.load(TASKS_KEY).expect("load empty"), None);

        let now = Utc.with_ymd_and_hms(2026, 8, 4, 9, 0, 0).unwrap();
        let tasks = vec![Task::new(
            TaskDraft {
                title: "Pack bags".to_string(),
                ..TaskDraft::default()
            },
            now,
        )];
        let payload = encode_tasks(&tasks).expect("encode");
        storage.save(TASKS_KEY, &payload).expect("save");

        let loaded = storage.load(TASKS_KEY).expect("load").expect("payload");
        let back = decode_tasks(&loaded, now).expect("decode");
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].title, "Pack bags");
    }

    #[test]
    fn memory_storage_overwrites_per_key() {
        let storage = MemoryStorage::new();
        storage.save("tasks", "[]").expect("save");
        storage.save("tasks", r#"["Call mom"]"#).expect("overwrite");
        assert_eq!(storage.get("tasks").as_deref(), Some(r#"["Call mom"]"#));
    }
}
