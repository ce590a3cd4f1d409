//! Whole-tree snapshot and restore of the installed application.
//!
//! The snapshot is a plain directory copy living at `backup/` inside the
//! install directory, so the single exclusion rule "skip the backup
//! directory itself" covers both directions. A copied `version.json`
//! travels with the snapshot and serves as its metadata.
//!
//! Restore is staged: the snapshot is first copied into a staging
//! directory inside the install tree, and the installed entries are only
//! deleted once the whole staged copy exists. A failure while staging
//! leaves the installed tree untouched; a failure after that point leaves
//! the snapshot itself intact for a re-run.

use crate::constants::{BACKUP_DIR_NAME, RESTORE_STAGING_DIR_NAME};
use crate::core::{LauncherError, Result};
use crate::process::ProcessGuard;
use crate::utils::fs::{
    copy_dir_contents, ensure_dir, remove_dir_all_with_retry, remove_file_with_retry,
    rename_with_retry,
};
use std::path::{Path, PathBuf};

/// Snapshots and restores the installed application tree.
pub struct BackupManager {
    install_dir: PathBuf,
    backup_dir: PathBuf,
    guard: ProcessGuard,
}

impl BackupManager {
    /// Create a manager for the given install directory and executable.
    #[must_use]
    pub fn new(install_dir: PathBuf, executable: &str) -> Self {
        let backup_dir = install_dir.join(BACKUP_DIR_NAME);
        Self {
            install_dir,
            backup_dir,
            guard: ProcessGuard::new(executable),
        }
    }

    /// Path of the snapshot directory.
    #[must_use]
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Whether a usable snapshot exists.
    ///
    /// Detection scans the snapshot directory for a file whose name ends
    /// with the executable name, which is the only marker the snapshot
    /// format guarantees.
    #[must_use]
    pub fn has_backup(&self) -> bool {
        let Ok(entries) = std::fs::read_dir(&self.backup_dir) else {
            return false;
        };
        entries.flatten().any(|entry| {
            entry.file_name().to_string_lossy().ends_with(self.guard.executable())
                && entry.path().is_file()
        })
    }

    /// Snapshot the installed tree into the backup directory.
    ///
    /// Any existing snapshot is cleared first, then every entry of the
    /// install directory except the backup directory itself is copied in.
    ///
    /// # Errors
    ///
    /// Returns [`LauncherError::BackupFailed`] naming the offending entry
    /// if the install directory is missing or any copy fails. A failure
    /// can leave a partial snapshot; re-running starts from a clean slate.
    pub async fn create_backup(&self) -> Result<()> {
        if !self.install_dir.is_dir() {
            return Err(LauncherError::BackupFailed {
                entry: self.install_dir.display().to_string(),
                reason: "install directory does not exist".to_string(),
            });
        }

        self.clear_backup().await?;
        ensure_dir(&self.backup_dir).map_err(|e| LauncherError::BackupFailed {
            entry: self.backup_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        copy_dir_contents(
            &self.install_dir,
            &self.backup_dir,
            &[BACKUP_DIR_NAME, RESTORE_STAGING_DIR_NAME],
        )
        .map_err(
            |e| LauncherError::BackupFailed {
                entry: self.install_dir.display().to_string(),
                reason: e.to_string(),
            },
        )?;

        tracing::info!("Snapshot created at {}", self.backup_dir.display());
        Ok(())
    }

    /// Restore the snapshot over the installed tree.
    ///
    /// The running application is stopped first. The snapshot is then
    /// copied into a staging directory before any installed file is
    /// touched, the installed entries are deleted, the staged entries are
    /// moved into place, and finally the staging and snapshot directories
    /// are cleared.
    ///
    /// # Errors
    ///
    /// [`LauncherError::NoBackup`] when no snapshot exists,
    /// [`LauncherError::ProcessBusy`] when the application refuses to
    /// stop, and [`LauncherError::BackupFailed`] for any file operation
    /// failure. The snapshot survives every failure before its final
    /// clearing step, so a failed restore can be retried.
    pub async fn downgrade(&self) -> Result<()> {
        if !self.has_backup() {
            return Err(LauncherError::NoBackup);
        }

        self.guard.ensure_stopped().await?;

        let staging = self.install_dir.join(RESTORE_STAGING_DIR_NAME);

        // Stage the snapshot before touching any installed file
        remove_dir_all_with_retry(&staging).await?;
        copy_dir_contents(&self.backup_dir, &staging, &[]).map_err(|e| {
            LauncherError::BackupFailed {
                entry: staging.display().to_string(),
                reason: format!("staging the snapshot failed: {e}"),
            }
        })?;

        self.remove_installed_entries(&staging).await?;
        self.promote_staged_entries(&staging).await?;

        remove_dir_all_with_retry(&staging).await?;
        self.clear_backup().await?;

        tracing::info!("Restored snapshot into {}", self.install_dir.display());
        Ok(())
    }

    /// Delete every installed entry except the snapshot and staging dirs.
    async fn remove_installed_entries(&self, staging: &Path) -> Result<()> {
        for entry in std::fs::read_dir(&self.install_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path == self.backup_dir || path == *staging {
                continue;
            }
            let result = if entry.file_type()?.is_dir() {
                remove_dir_all_with_retry(&path).await
            } else {
                remove_file_with_retry(&path).await
            };
            result.map_err(|e| LauncherError::BackupFailed {
                entry: path.display().to_string(),
                reason: format!("removing installed entry failed: {e}"),
            })?;
        }
        Ok(())
    }

    /// Move every staged entry into the install directory.
    async fn promote_staged_entries(&self, staging: &Path) -> Result<()> {
        for entry in std::fs::read_dir(staging)? {
            let entry = entry?;
            let from = entry.path();
            let to = self.install_dir.join(entry.file_name());
            rename_with_retry(&from, &to).await.map_err(|e| LauncherError::BackupFailed {
                entry: to.display().to_string(),
                reason: format!("promoting staged entry failed: {e}"),
            })?;
        }
        Ok(())
    }

    /// Delete everything inside the snapshot directory.
    async fn clear_backup(&self) -> Result<()> {
        if !self.backup_dir.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.backup_dir)? {
            let entry = entry?;
            let path = entry.path();
            let result = if entry.file_type()?.is_dir() {
                remove_dir_all_with_retry(&path).await
            } else {
                remove_file_with_retry(&path).await
            };
            result.map_err(|e| LauncherError::BackupFailed {
                entry: path.display().to_string(),
                reason: format!("clearing old snapshot failed: {e}"),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const EXE: &str = "pos.exe";

    fn seed_install(install: &Path) {
        fs::create_dir_all(install.join("data")).unwrap();
        fs::write(install.join(EXE), b"binary-v2").unwrap();
        fs::write(install.join("version.json"), b"{\"version\":\"2.0.0\"}").unwrap();
        fs::write(install.join("data/settings.toml"), b"[pos]").unwrap();
    }

    #[tokio::test]
    async fn test_create_backup_excludes_backup_dir() {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("install");
        seed_install(&install);

        let manager = BackupManager::new(install.clone(), EXE);
        manager.create_backup().await.unwrap();

        assert!(manager.has_backup());
        let backup = install.join("backup");
        assert_eq!(fs::read(backup.join(EXE)).unwrap(), b"binary-v2");
        assert_eq!(fs::read(backup.join("data/settings.toml")).unwrap(), b"[pos]");
        assert!(!backup.join("backup").exists());
    }

    #[tokio::test]
    async fn test_create_backup_replaces_previous_snapshot() {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("install");
        seed_install(&install);

        let manager = BackupManager::new(install.clone(), EXE);
        manager.create_backup().await.unwrap();

        // Simulate a stale snapshot entry and a changed install
        fs::write(install.join("backup/stale.txt"), b"old").unwrap();
        fs::write(install.join(EXE), b"binary-v3").unwrap();

        manager.create_backup().await.unwrap();
        assert!(!install.join("backup/stale.txt").exists());
        assert_eq!(fs::read(install.join("backup").join(EXE)).unwrap(), b"binary-v3");
    }

    #[tokio::test]
    async fn test_create_backup_requires_install_dir() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(temp.path().join("missing"), EXE);
        match manager.create_backup().await {
            Err(LauncherError::BackupFailed {
                ..
            }) => {}
            other => panic!("Expected BackupFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_downgrade_without_backup_fails() {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("install");
        seed_install(&install);

        let manager = BackupManager::new(install, EXE);
        match manager.downgrade().await {
            Err(LauncherError::NoBackup) => {}
            other => panic!("Expected NoBackup, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_backup_then_downgrade_round_trip() {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("install");
        seed_install(&install);

        let manager = BackupManager::new(install.clone(), EXE);
        manager.create_backup().await.unwrap();

        // Mutate the install the way an update would
        fs::write(install.join(EXE), b"binary-v9").unwrap();
        fs::write(install.join("new-file.dll"), b"new").unwrap();
        fs::remove_file(install.join("data/settings.toml")).unwrap();

        manager.downgrade().await.unwrap();

        assert_eq!(fs::read(install.join(EXE)).unwrap(), b"binary-v2");
        assert_eq!(fs::read(install.join("data/settings.toml")).unwrap(), b"[pos]");
        assert!(!install.join("new-file.dll").exists());
        assert!(!install.join(".restore-staging").exists());

        // The snapshot is consumed by a successful restore
        assert!(!manager.has_backup());
    }

    #[tokio::test]
    async fn test_downgrade_twice_fails_second_time() {
        let temp = TempDir::new().unwrap();
        let install = temp.path().join("install");
        seed_install(&install);

        let manager = BackupManager::new(install, EXE);
        manager.create_backup().await.unwrap();
        manager.downgrade().await.unwrap();

        match manager.downgrade().await {
            Err(LauncherError::NoBackup) => {}
            other => panic!("Expected NoBackup, got {other:?}"),
        }
    }
}
