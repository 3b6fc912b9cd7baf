//! Filesystem-backed persistence for Daylog.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use dl_core::{CoreError, CoreResult, DiaryStore, Entry, Profile};

/// Default directory name for the diary records.
pub const DATA_DIR_NAME: &str = "daylog";

const PROFILE_FILE_NAME: &str = "profile.json";
const ENTRIES_FILE_NAME: &str = "entries.json";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Filesystem-backed diary store holding the two JSON records.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Create a store rooted at the provided directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the root path of the store.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve the default data path (~/.daylog).
    pub fn default_path() -> CoreResult<PathBuf> {
        if let Some(dir) = dirs::home_dir() {
            return Ok(dir.join(format!(".{DATA_DIR_NAME}")));
        }
        Err(CoreError::StorageUnavailable(
            "unable to determine a default data path".into(),
        ))
    }

    fn profile_path(&self) -> PathBuf {
        self.root.join(PROFILE_FILE_NAME)
    }

    fn entries_path(&self) -> PathBuf {
        self.root.join(ENTRIES_FILE_NAME)
    }

    fn load_record<T: DeserializeOwned>(&self, path: &Path) -> CoreResult<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
        let record = serde_json::from_str(&contents)
            .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
        Ok(Some(record))
    }

    fn save_record<T: Serialize>(&self, path: &Path, record: &T) -> CoreResult<()> {
        let contents = serde_json::to_string(record)
            .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
        write_atomic(path, &contents)
    }
}

impl DiaryStore for JsonStore {
    fn load_profile(&self) -> CoreResult<Option<Profile>> {
        self.load_record(&self.profile_path())
    }

    fn save_profile(&self, profile: &Profile) -> CoreResult<()> {
        self.save_record(&self.profile_path(), profile)
    }

    fn load_entries(&self) -> CoreResult<Option<Vec<Entry>>> {
        self.load_record(&self.entries_path())
    }

    fn save_entries(&self, entries: &[Entry]) -> CoreResult<()> {
        self.save_record(&self.entries_path(), &entries)
    }
}

/// Write a record through a sibling temp file so a crash mid-write never
/// leaves a half-written record behind.
fn write_atomic(path: &Path, contents: &str) -> CoreResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| CoreError::StorageUnavailable("record path has no parent".into()))?;
    fs::create_dir_all(parent).map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
    temp.write_all(contents.as_bytes())
        .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
    temp.persist(path)
        .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
    Ok(())
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    pub path: Option<String>,
}

fn config_path() -> CoreResult<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join(DATA_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    Err(CoreError::StorageUnavailable(
        "unable to determine config directory".into(),
    ))
}

pub fn load_config() -> CoreResult<StoreConfig> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(StoreConfig::default());
    }
    let contents =
        fs::read_to_string(&path).map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
    serde_yaml::from_str(&contents).map_err(|err| CoreError::StorageUnavailable(err.to_string()))
}

pub fn save_config(config: &StoreConfig) -> CoreResult<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
    }
    let contents = serde_yaml::to_string(config)
        .map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
    fs::write(path, contents).map_err(|err| CoreError::StorageUnavailable(err.to_string()))?;
    Ok(())
}

pub fn set_config_path(path: &Path) -> CoreResult<()> {
    let config = StoreConfig {
        path: Some(path.to_string_lossy().to_string()),
    };
    save_config(&config)
}

pub fn resolve_data_path() -> CoreResult<PathBuf> {
    if let Ok(value) = std::env::var("DAYLOG_PATH") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }

    let config = load_config()?;
    if let Some(path) = config.path {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    JsonStore::default_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dl_core::digest;
    use tempfile::TempDir;

    fn entry(id: &str, title: &str, body: &str) -> Entry {
        let now = Utc::now();
        Entry {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            created: now,
            updated: now,
        }
    }

    #[test]
    fn missing_records_load_as_none() {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonStore::new(temp.path().to_path_buf());
        assert!(store.load_profile().expect("load profile").is_none());
        assert!(store.load_entries().expect("load entries").is_none());
    }

    #[test]
    fn round_trip_profile() {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonStore::new(temp.path().join("nested"));
        let profile = Profile {
            username: "mira".into(),
            pass_hash: digest("hunter2"),
            pin: Some("1234".into()),
            created: Utc::now(),
        };

        store.save_profile(&profile).expect("save profile");
        let loaded = store.load_profile().expect("load profile").expect("profile");
        assert_eq!(loaded, profile);
    }

    #[test]
    fn round_trip_entries_preserves_order() {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonStore::new(temp.path().to_path_buf());
        let entries = vec![entry("2", "newest", "front"), entry("1", "oldest", "back")];

        store.save_entries(&entries).expect("save entries");
        let loaded = store.load_entries().expect("load entries").expect("entries");
        assert_eq!(loaded, entries);
    }

    #[test]
    fn profile_record_uses_wire_field_names() {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonStore::new(temp.path().to_path_buf());
        let profile = Profile {
            username: "mira".into(),
            pass_hash: digest("hunter2"),
            pin: None,
            created: Utc::now(),
        };

        store.save_profile(&profile).expect("save profile");
        let raw = fs::read_to_string(temp.path().join(PROFILE_FILE_NAME)).expect("read raw");
        assert!(raw.contains("\"passHash\""));
        assert!(!raw.contains("pass_hash"));
    }

    #[test]
    fn corrupt_record_reports_storage_unavailable() {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonStore::new(temp.path().to_path_buf());
        fs::write(temp.path().join(ENTRIES_FILE_NAME), "{ not json").expect("write");

        assert!(matches!(
            store.load_entries(),
            Err(CoreError::StorageUnavailable(_))
        ));
    }

    #[test]
    fn save_replaces_the_previous_record() {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonStore::new(temp.path().to_path_buf());

        store
            .save_entries(&[entry("1", "first", "")])
            .expect("save entries");
        store
            .save_entries(&[entry("2", "second", "")])
            .expect("save entries");

        let loaded = store.load_entries().expect("load entries").expect("entries");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "2");
    }
}
