//! Persisted state: the synced config blob and the local-only last sync time.

use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::config::{LAST_SYNC_AT_KEY, STORAGE_KEY};
use crate::error::{SyncError, SyncResult};

const SYNC_STORAGE_FILE: &str = "sync-storage.json";
const LOCAL_STORAGE_FILE: &str = "local-storage.json";
const APP_DIR_NAME: &str = "chrome-home-plugin";

/// Env override for the storage directory.
pub const CONFIG_DIR_ENV: &str = "CHROME_HOME_CONFIG_DIR";

/// Key-value persistence behind the config.
///
/// Each call is a whole-value read or write; there is no cross-call locking.
pub trait ConfigStore: Send + Sync {
    /// Stored config blob, `None` before first write.
    fn load_config(&self) -> SyncResult<Option<Value>>;

    fn save_config(&self, config: &Value) -> SyncResult<()>;

    fn last_sync_at(&self) -> SyncResult<Option<String>>;

    fn set_last_sync_at(&self, timestamp: &str) -> SyncResult<()>;
}

/// JSON files in a directory, one per storage area.
pub struct FileConfigStore {
    dir: PathBuf,
}

impl FileConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$CHROME_HOME_CONFIG_DIR`, else `<config dir>/chrome-home-plugin`.
    pub fn default_dir() -> SyncResult<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| SyncError::Store("cannot determine config directory".into()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_area(&self, file: &str) -> SyncResult<Map<String, Value>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(Map::new());
        }
        let text = fs::read_to_string(&path)
            .map_err(|e| SyncError::Io(format!("read {}: {e}", path.display())))?;
        match serde_json::from_str(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(SyncError::Store(format!(
                "{} is not a JSON object",
                path.display()
            ))),
            Err(e) => Err(SyncError::Store(format!("parse {}: {e}", path.display()))),
        }
    }

    /// Atomic replace: temp file in the same directory, then rename.
    fn write_area(&self, file: &str, area: &Map<String, Value>) -> SyncResult<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| SyncError::Io(format!("create {}: {e}", self.dir.display())))?;
        let text = serde_json::to_string_pretty(area)
            .map_err(|e| SyncError::Store(format!("serialize {file}: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.flush()?;
        let target = self.dir.join(file);
        tmp.persist(&target)
            .map_err(|e| SyncError::Io(format!("write {}: {}", target.display(), e.error)))?;
        Ok(())
    }

    fn update_area(&self, file: &str, key: &str, value: Value) -> SyncResult<()> {
        let mut area = self.read_area(file)?;
        area.insert(key.to_string(), value);
        self.write_area(file, &area)
    }
}

impl ConfigStore for FileConfigStore {
    fn load_config(&self) -> SyncResult<Option<Value>> {
        Ok(self.read_area(SYNC_STORAGE_FILE)?.remove(STORAGE_KEY))
    }

    fn save_config(&self, config: &Value) -> SyncResult<()> {
        self.update_area(SYNC_STORAGE_FILE, STORAGE_KEY, config.clone())?;
        log::debug!("[Store] Config written to {}", self.dir.display());
        Ok(())
    }

    fn last_sync_at(&self) -> SyncResult<Option<String>> {
        Ok(self
            .read_area(LOCAL_STORAGE_FILE)?
            .get(LAST_SYNC_AT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn set_last_sync_at(&self, timestamp: &str) -> SyncResult<()> {
        self.update_area(
            LOCAL_STORAGE_FILE,
            LAST_SYNC_AT_KEY,
            Value::String(timestamp.to_string()),
        )
    }
}

/// In-memory store for tests and embedding.
#[derive(Default)]
pub struct MemoryConfigStore {
    config: RwLock<Option<Value>>,
    last_sync_at: RwLock<Option<String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Value) -> Self {
        Self {
            config: RwLock::new(Some(config)),
            last_sync_at: RwLock::new(None),
        }
    }
}

fn poisoned<T>(_: T) -> SyncError {
    SyncError::Store("lock poisoned".into())
}

impl ConfigStore for MemoryConfigStore {
    fn load_config(&self) -> SyncResult<Option<Value>> {
        Ok(self.config.read().map_err(poisoned)?.clone())
    }

    fn save_config(&self, config: &Value) -> SyncResult<()> {
        *self.config.write().map_err(poisoned)? = Some(config.clone());
        Ok(())
    }

    fn last_sync_at(&self) -> SyncResult<Option<String>> {
        Ok(self.last_sync_at.read().map_err(poisoned)?.clone())
    }

    fn set_last_sync_at(&self, timestamp: &str) -> SyncResult<()> {
        *self.last_sync_at.write().map_err(poisoned)? = Some(timestamp.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use tempfile::TempDir;

    fn create_test_store() -> (FileConfigStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileConfigStore::new(temp_dir.path().join("storage"));
        (store, temp_dir)
    }

    #[test]
    fn load_before_first_write_is_none() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.load_config().unwrap().is_none());
        assert!(store.last_sync_at().unwrap().is_none());
    }

    #[test]
    fn config_and_timestamp_live_in_separate_areas() {
        let (store, _temp_dir) = create_test_store();
        let config = json!({ "cards": [{ "title": "学习" }] });
        store.save_config(&config).unwrap();
        store.set_last_sync_at("2026-10-16T08:00:00.000Z").unwrap();

        assert_eq!(store.load_config().unwrap(), Some(config));
        assert_eq!(
            store.last_sync_at().unwrap().as_deref(),
            Some("2026-10-16T08:00:00.000Z")
        );

        let synced = fs::read_to_string(store.dir().join(SYNC_STORAGE_FILE)).unwrap();
        assert!(synced.contains(STORAGE_KEY));
        assert!(!synced.contains(LAST_SYNC_AT_KEY));
    }

    #[test]
    fn corrupt_storage_is_reported() {
        let (store, _temp_dir) = create_test_store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join(SYNC_STORAGE_FILE), "[1,2]").unwrap();
        assert!(matches!(store.load_config(), Err(SyncError::Store(_))));
    }

    #[test]
    #[serial]
    fn default_dir_honours_env_override() {
        let temp_dir = TempDir::new().unwrap();
        std::env::set_var(CONFIG_DIR_ENV, temp_dir.path());
        let dir = FileConfigStore::default_dir();
        std::env::remove_var(CONFIG_DIR_ENV);
        assert_eq!(dir.unwrap(), temp_dir.path());
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryConfigStore::new();
        store.save_config(&json!({ "a": 1 })).unwrap();
        assert_eq!(store.load_config().unwrap(), Some(json!({ "a": 1 })));
    }
}
