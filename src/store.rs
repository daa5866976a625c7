//! Whole-document JSON persistence.
//!
//! Every document is read in one piece and written with write-temp-then-rename,
//! so a concurrent reader sees either the previous or the new document, never a
//! partial one. A failed write leaves the previous document in place.

use crate::error::{Result, ScheduleError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Load a document, returning `T::default()` when it is missing or corrupt.
pub fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    load_json_optional(path).unwrap_or_default()
}

/// Load a document, returning `None` when it is missing or unreadable.
///
/// Corrupt content is logged and treated like a missing document.
pub fn load_json_optional<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "document not present");
            return None;
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read document");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt document, ignoring");
            None
        }
    }
}

/// Load a keyed document one record at a time.
///
/// Records that fail to decode are skipped with a warning; the rest load as
/// usual. A missing or corrupt document yields an empty map.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> BTreeMap<String, T> {
    let raw: BTreeMap<String, serde_json::Value> = load_json_or_default(path);
    let mut records = BTreeMap::new();
    for (id, value) in raw {
        match serde_json::from_value(value) {
            Ok(record) => {
                records.insert(id, record);
            }
            Err(e) => {
                warn!(path = %path.display(), record = %id, error = %e, "skipping malformed record")
            }
        }
    }
    records
}

/// Field decoder that reads `null` as the default value.
pub fn null_as_default<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Serialize `data` and atomically replace the document at `path`.
pub fn save_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|e| ScheduleError::json(path, e))?;
    let parent = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| ScheduleError::io(parent, e))?;

    let tmp_path = temp_path_for(path);
    if let Err(e) = std::fs::write(&tmp_path, json) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ScheduleError::io(&tmp_path, e));
    }
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(ScheduleError::io(path, e));
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    parent.join(format!(
        ".{}.tmp.{}.{}",
        path.file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("document"),
        std::process::id(),
        nanos
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_document_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let data: HashMap<String, u32> = load_json_or_default(&dir.path().join("nope.json"));
        assert!(data.is_empty());
    }

    #[test]
    fn corrupt_document_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let data: Option<HashMap<String, u32>> = load_json_optional(&path);
        assert!(data.is_none());
    }

    #[test]
    fn malformed_records_are_skipped_individually() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, r#"{"a": 1, "b": "two", "c": 3, "d": null}"#).unwrap();
        let records: BTreeMap<String, u32> = load_records(&path);
        assert_eq!(records.keys().collect::<Vec<_>>(), ["a", "c"]);
        assert_eq!(records["c"], 3);
    }

    #[test]
    fn non_object_document_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(load_records::<u32>(&path).is_empty());
    }

    #[derive(Debug, Default, Deserialize)]
    struct Named {
        #[serde(default, deserialize_with = "null_as_default")]
        name: String,
        #[serde(default, deserialize_with = "null_as_default")]
        tags: Vec<String>,
    }

    #[test]
    fn null_fields_read_as_default() {
        let v: Named = serde_json::from_str(r#"{"name": null, "tags": null}"#).unwrap();
        assert!(v.name.is_empty() && v.tags.is_empty());
        let v: Named = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(v.name, "x");
    }

    #[test]
    fn save_creates_parent_and_replaces_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        let mut first = HashMap::new();
        first.insert("a".to_string(), 1u32);
        first.insert("b".to_string(), 2u32);
        save_json_atomic(&path, &first).unwrap();

        let mut second = HashMap::new();
        second.insert("c".to_string(), 3u32);
        save_json_atomic(&path, &second).unwrap();

        let loaded: HashMap<String, u32> = load_json_or_default(&path);
        assert_eq!(loaded, second);
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        save_json_atomic(&path, &vec![1, 2, 3]).unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["doc.json".to_string()]);
    }

    #[test]
    fn failed_write_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        save_json_atomic(&path, &vec![1u32]).unwrap();

        // Renaming a file over a non-empty directory fails.
        let blocked = dir.path().join("blocked");
        std::fs::create_dir(&blocked).unwrap();
        std::fs::write(blocked.join("keep"), "x").unwrap();
        assert!(save_json_atomic(&blocked, &vec![2u32]).is_err());

        let still: Vec<u32> = load_json_or_default(&path);
        assert_eq!(still, vec![1]);
    }
}
