//! Persistence for the installed-version record.
//!
//! The record is a small JSON file living alongside the installed
//! application. It is the single source of truth for "what is currently
//! installed"; the store is constructed explicitly at startup with one
//! resolved path, so there is no fallback chain to reason about when a
//! write fails.

use crate::constants::VERSION_FILE_NAME;
use crate::core::Result;
use crate::utils::fs::atomic_write;
use crate::version::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The persisted installed-version record.
///
/// Created on first successful install and mutated in place on every
/// later apply; never deleted by normal operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstalledVersionRecord {
    /// The installed version, serialized as `"X.Y.Z"`
    pub version: String,
    /// Name of the installed application
    pub app_name: String,
    /// When the application was first installed
    pub installed_at: DateTime<Utc>,
    /// When the record was last updated
    pub updated_at: DateTime<Utc>,
    /// When the launcher last checked for updates, if ever
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_check: Option<DateTime<Utc>>,
}

/// Reads and writes the installed-version record at a single resolved path.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    /// Create a store for the record file inside the given install directory.
    #[must_use]
    pub fn new(install_dir: &Path) -> Self {
        Self {
            path: install_dir.join(VERSION_FILE_NAME),
        }
    }

    /// Create a store at an explicit file path. Used by tests.
    #[must_use]
    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
        }
    }

    /// Path of the record file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, returning `None` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<InstalledVersionRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let record: InstalledVersionRecord = serde_json::from_str(&contents)?;
        Ok(Some(record))
    }

    /// Load the record and parse its version, tolerating a missing or
    /// corrupt file.
    ///
    /// A corrupt record is reported through logging and treated as "no
    /// version installed", which makes the next check offer a reinstall
    /// rather than aborting the launcher.
    #[must_use]
    pub fn installed_version(&self) -> Option<Version> {
        match self.load() {
            Ok(Some(record)) => match Version::parse(&record.version) {
                Ok(version) => Some(version),
                Err(e) => {
                    tracing::warn!("Installed-version record holds an invalid version: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read installed-version record: {e}");
                None
            }
        }
    }

    /// Persist a new version, preserving `installed_at` from any existing
    /// record and refreshing `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the atomic write fails. The
    /// caller decides whether the failure is fatal; after a successful
    /// apply it is reported as a warning because the files on disk are
    /// already correct.
    pub fn record_install(&self, version: &Version, app_name: &str) -> Result<InstalledVersionRecord> {
        let now = Utc::now();
        let existing = self.load().unwrap_or_default();

        let record = InstalledVersionRecord {
            version: version.to_string(),
            app_name: app_name.to_string(),
            installed_at: existing.as_ref().map_or(now, |r| r.installed_at),
            updated_at: now,
            last_update_check: existing.and_then(|r| r.last_update_check),
        };

        self.save(&record)?;
        Ok(record)
    }

    /// Stamp the time of the last update check, if a record exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing record cannot be rewritten.
    pub fn record_check(&self) -> Result<()> {
        if let Some(mut record) = self.load()? {
            record.last_update_check = Some(Utc::now());
            self.save(&record)?;
        }
        Ok(())
    }

    fn save(&self, record: &InstalledVersionRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(record)?;
        atomic_write(&self.path, contents.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_returns_none() {
        let temp = TempDir::new().unwrap();
        let store = VersionStore::new(temp.path());
        assert!(store.load().unwrap().is_none());
        assert!(store.installed_version().is_none());
    }

    #[test]
    fn test_record_install_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = VersionStore::new(temp.path());

        let version = Version::new(1, 2, 3);
        store.record_install(&version, "myapp").unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.version, "1.2.3");
        assert_eq!(loaded.app_name, "myapp");
        assert_eq!(store.installed_version(), Some(version));
    }

    #[test]
    fn test_record_install_preserves_installed_at() {
        let temp = TempDir::new().unwrap();
        let store = VersionStore::new(temp.path());

        let first = store.record_install(&Version::new(1, 0, 0), "myapp").unwrap();
        let second = store.record_install(&Version::new(1, 1, 0), "myapp").unwrap();

        assert_eq!(first.installed_at, second.installed_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(second.version, "1.1.0");
    }

    #[test]
    fn test_corrupt_record_treated_as_uninstalled() {
        let temp = TempDir::new().unwrap();
        let store = VersionStore::new(temp.path());
        std::fs::write(store.path(), "not json").unwrap();

        assert!(store.load().is_err());
        assert!(store.installed_version().is_none());
    }

    #[test]
    fn test_record_check_without_record_is_noop() {
        let temp = TempDir::new().unwrap();
        let store = VersionStore::new(temp.path());
        store.record_check().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_record_check_stamps_existing_record() {
        let temp = TempDir::new().unwrap();
        let store = VersionStore::new(temp.path());

        store.record_install(&Version::new(2, 0, 0), "myapp").unwrap();
        store.record_check().unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.last_update_check.is_some());
    }
}
