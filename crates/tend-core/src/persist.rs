use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::task::Task;
use crate::view::{FilterKind, SortKey};

pub const STATE_FILE: &str = "state.json";

/// The one persisted record: the task collection plus the active selectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub filter: FilterKind,

    #[serde(default)]
    pub sort_by: SortKey,
}

/// Reads the state record. A missing file is not an error; the caller gets
/// `None` and starts from the default state.
#[tracing::instrument(skip(path))]
pub fn load_state(path: &Path) -> anyhow::Result<Option<StateRecord>> {
    if !path.exists() {
        debug!(file = %path.display(), "no state file yet");
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    let record: StateRecord = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing {}", path.display()))?;

    debug!(
        file = %path.display(),
        tasks = record.tasks.len(),
        "loaded state"
    );
    Ok(Some(record))
}

/// Writes the record atomically: serialize into a temp file in the same
/// directory, then rename over the target.
#[tracing::instrument(skip(path, record))]
pub fn save_state(path: &Path, record: &StateRecord) -> anyhow::Result<()> {
    debug!(file = %path.display(), tasks = record.tasks.len(), "saving state");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    let serialized = serde_json::to_string_pretty(record)?;
    temp.write_all(serialized.as_bytes())?;
    writeln!(temp)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use super::{StateRecord, load_state, save_state};
    use crate::task::{Priority, Task, TaskDraft};
    use crate::view::{FilterKind, SortKey};

    #[test]
    fn missing_file_loads_as_none() {
        let temp = tempdir().expect("tempdir");
        let loaded = load_state(&temp.path().join("state.json")).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn roundtrip_preserves_tasks_and_selectors() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        let now = Utc
            .with_ymd_and_hms(2026, 3, 2, 9, 30, 0)
            .single()
            .expect("valid instant");

        let record = StateRecord {
            tasks: vec![Task::create(
                TaskDraft {
                    title: "ship it".to_string(),
                    priority: Some(Priority::High),
                    due_date: Some(now),
                    ..TaskDraft::default()
                },
                now,
            )],
            filter: FilterKind::Active,
            sort_by: SortKey::DueDate,
        };

        save_state(&path, &record).expect("save");
        let loaded = load_state(&path).expect("load").expect("some record");
        assert_eq!(loaded, record);
    }

    #[test]
    fn record_uses_camel_case_wire_names() {
        let record = StateRecord {
            filter: FilterKind::DueClose,
            sort_by: SortKey::CreatedAt,
            ..StateRecord::default()
        };
        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains("\"sortBy\":\"createdAt\""));
        assert!(json.contains("\"filter\":\"dueClose\""));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("state.json");
        std::fs::write(&path, "{not json").expect("write");
        assert!(load_state(&path).is_err());
    }
}
