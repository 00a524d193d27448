// unbloat-core/src/store.rs
// Durable key-value state: cached catalog bytes, its revision, preferences.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use unbloat_aio::{fs as aio_fs, json_io};
use unbloat_common::config::Config;
use unbloat_common::error::{Result, UnbloatError};
use unbloat_common::preferences::Preferences;

const CATALOG_FILE: &str = "catalog.json";
const REVISION_FILE: &str = "catalog.revision";
const PREFERENCES_FILE: &str = "preferences.json";

/// Pure storage; deciding when to read or write is the caller's business.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    dir: PathBuf,
}

impl CatalogStore {
    pub fn new(config: &Config) -> Result<Self> {
        Self::at(config.state_dir())
    }

    pub fn at(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        aio_fs::create_dir_all(&dir).map_err(|e| {
            UnbloatError::Cache(format!(
                "Could not create state directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_catalog_bytes(&self) -> Result<Option<Vec<u8>>> {
        aio_fs::read_optional_bytes(&self.dir.join(CATALOG_FILE))
    }

    pub fn load_revision(&self) -> Result<Option<String>> {
        Ok(aio_fs::read_optional_string(&self.dir.join(REVISION_FILE))?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    /// Bytes are written before the revision so a crash in between leaves a
    /// stale revision, which only causes one extra refresh.
    pub fn store_catalog(&self, raw: &[u8], revision: &str) -> Result<()> {
        debug!(
            "Saving catalog ({} bytes, revision {}) to {}",
            raw.len(),
            revision,
            self.dir.display()
        );
        aio_fs::atomic_write_file(&self.dir.join(CATALOG_FILE), raw)?;
        aio_fs::atomic_write_file(&self.dir.join(REVISION_FILE), revision.as_bytes())
    }

    pub fn clear_catalog(&self) -> Result<()> {
        aio_fs::remove_file_if_exists(&self.dir.join(REVISION_FILE))?;
        aio_fs::remove_file_if_exists(&self.dir.join(CATALOG_FILE))
    }

    /// Defaults when nothing is stored or the stored file is unreadable.
    pub fn load_preferences(&self) -> Preferences {
        match json_io::read_json_sync::<Preferences>(&self.dir.join(PREFERENCES_FILE)) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Preferences::default(),
            Err(e) => {
                warn!("Ignoring unreadable preferences file: {}", e);
                Preferences::default()
            }
        }
    }

    pub fn store_preferences(&self, prefs: &Preferences) -> Result<()> {
        json_io::write_json_sync(&self.dir.join(PREFERENCES_FILE), prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (CatalogStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::at(temp_dir.path().join("state")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_empty_store() {
        let (store, _dir) = create_test_store();
        assert!(store.load_catalog_bytes().unwrap().is_none());
        assert!(store.load_revision().unwrap().is_none());
        assert_eq!(store.load_preferences(), Preferences::default());
    }

    #[test]
    fn test_catalog_round_trip_and_clear() {
        let (store, _dir) = create_test_store();
        store.store_catalog(b"{\"a\":{}}", "abc123").unwrap();

        assert_eq!(store.load_catalog_bytes().unwrap().unwrap(), b"{\"a\":{}}");
        assert_eq!(store.load_revision().unwrap().as_deref(), Some("abc123"));

        store.clear_catalog().unwrap();
        assert!(store.load_catalog_bytes().unwrap().is_none());
        assert!(store.load_revision().unwrap().is_none());
    }

    #[test]
    fn test_preferences_persist() {
        let (store, _dir) = create_test_store();
        let prefs = Preferences {
            auto_update_catalog: false,
            confirm_before_uninstall: true,
        };
        store.store_preferences(&prefs).unwrap();

        let reopened = CatalogStore::at(store.dir()).unwrap();
        assert_eq!(reopened.load_preferences(), prefs);
    }

    #[test]
    fn test_corrupt_preferences_fall_back_to_defaults() {
        let (store, _dir) = create_test_store();
        std::fs::write(store.dir().join(PREFERENCES_FILE), b"garbage").unwrap();
        assert_eq!(store.load_preferences(), Preferences::default());
    }
}
