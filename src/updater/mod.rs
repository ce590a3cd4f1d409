//! Update orchestration for the launcher.
//!
//! The [`Updater`] drives the whole update cycle against the release
//! host: check for a newer version, download the artifact with retries
//! and checksum verification, and apply it into the install directory
//! with rollback on failure.
//!
//! # State machine
//!
//! ```text
//! Idle -> Checking -> UpToDate
//!                  -> UpdateAvailable -> Downloading -> Downloaded
//!                                                    -> Applying -> Applied
//! ```
//!
//! `Failed(stage)` is reachable from `Checking`, `Downloading`, and
//! `Applying`. Each public operation records its failure stage before
//! propagating the error, so a controller can inspect where the cycle
//! stopped.

use crate::config::LauncherConfig;
use crate::core::{LauncherError, Result};
use crate::process::ProcessGuard;
use crate::release::{ReleaseClient, ReleaseMetadata};
use crate::utils::fs::{ensure_dir, remove_dir_if_empty, remove_file_with_retry, rename_with_retry};
use crate::verify::{self, DeclaredChecksum};
use crate::version::store::VersionStore;
use crate::version::{Version, is_newer};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(test)]
mod tests;

/// Where in the update cycle a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    /// The version check against the release host
    Check,
    /// The artifact download
    Download,
    /// Applying the artifact to the install directory
    Apply,
}

/// Observable state of the update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    /// No operation has run yet
    Idle,
    /// A version check is in flight
    Checking,
    /// The installed version is current
    UpToDate,
    /// A newer release exists
    UpdateAvailable,
    /// The artifact download is in flight
    Downloading,
    /// The artifact is on disk and verified
    Downloaded,
    /// The artifact is being installed
    Applying,
    /// The update is installed
    Applied,
    /// An operation failed at the given stage
    Failed(UpdateStage),
}

/// Immutable result of a successful version check.
///
/// Lives for one check cycle; each new check supersedes it.
#[derive(Debug, Clone)]
pub struct UpdateInfo {
    /// Release-host asset id
    pub asset_id: u64,
    /// File name of the asset
    pub asset_name: String,
    /// The available version
    pub version: Version,
    /// Resolved download URL
    pub download_url: String,
    /// Changelog text from the release body
    pub changelog: String,
    /// Release publication timestamp, as reported by the host
    pub release_date: Option<String>,
    /// Asset size in bytes
    pub file_size: u64,
    /// Declared checksum in `algorithm:hex` form, when the release
    /// carries one
    pub checksum: Option<String>,
}

/// Orchestrates check, download, and apply against one release source.
pub struct Updater {
    config: LauncherConfig,
    client: ReleaseClient,
    store: VersionStore,
    guard: ProcessGuard,
    state: UpdateState,
    update_info: Option<UpdateInfo>,
    downloaded_file: Option<PathBuf>,
}

impl Updater {
    /// Build an updater from the launcher configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: LauncherConfig) -> Result<Self> {
        let client = ReleaseClient::new(&config)?;
        let store = VersionStore::new(&config.install_dir());
        let guard = ProcessGuard::new(config.executable_name());
        Ok(Self {
            config,
            client,
            store,
            guard,
            state: UpdateState::Idle,
            update_info: None,
            downloaded_file: None,
        })
    }

    /// Current state of the update cycle.
    #[must_use]
    pub const fn state(&self) -> UpdateState {
        self.state
    }

    /// Result of the last successful check, if any.
    #[must_use]
    pub fn update_info(&self) -> Option<&UpdateInfo> {
        self.update_info.as_ref()
    }

    /// Path of the downloaded artifact, if a download succeeded.
    #[must_use]
    pub fn downloaded_file(&self) -> Option<&Path> {
        self.downloaded_file.as_deref()
    }

    /// The currently installed version, per the version record.
    #[must_use]
    pub fn installed_version(&self) -> Option<Version> {
        self.store.installed_version()
    }

    /// Check the release host for a newer version.
    ///
    /// Returns `None` when the installed version is current. On success
    /// the resulting [`UpdateInfo`] is also retained for the following
    /// download and apply calls.
    ///
    /// # Errors
    ///
    /// Propagates the HTTP taxonomy from the release client.
    pub async fn check_for_updates(&mut self) -> Result<Option<UpdateInfo>> {
        self.state = UpdateState::Checking;
        match self.check_inner().await {
            Ok(Some(info)) => {
                self.state = UpdateState::UpdateAvailable;
                self.update_info = Some(info.clone());
                Ok(Some(info))
            }
            Ok(None) => {
                self.state = UpdateState::UpToDate;
                Ok(None)
            }
            Err(e) => {
                self.state = UpdateState::Failed(UpdateStage::Check);
                Err(e)
            }
        }
    }

    async fn check_inner(&mut self) -> Result<Option<UpdateInfo>> {
        let metadata = self.client.fetch_latest_release().await?;

        if let Err(e) = self.store.record_check() {
            tracing::warn!("Could not stamp last-update-check time: {e}");
        }

        let installed = self.store.installed_version();
        if !is_newer(&metadata.tag_name, installed.as_ref()) {
            tracing::info!(
                "Installed version {} is current (remote tag {})",
                installed.map_or_else(|| "none".to_string(), |v| v.to_string()),
                metadata.tag_name
            );
            return Ok(None);
        }

        let version = Version::parse_lenient(&metadata.tag_name)?;
        let candidates = self.config.asset_candidates();
        let Some(asset) = ReleaseClient::resolve_asset(&metadata, &candidates) else {
            return Err(LauncherError::ReleaseNotFound {
                owner: self.config.release.owner.clone(),
                repo: self.config.release.repo.clone(),
            });
        };

        let checksum = self.lookup_checksum(&metadata, &asset.name).await;
        let changelog = if metadata.body.trim().is_empty() {
            "No changelog provided.".to_string()
        } else {
            metadata.body.clone()
        };

        tracing::info!("Update available: {} ({})", version, asset.name);
        Ok(Some(UpdateInfo {
            asset_id: asset.id,
            asset_name: asset.name.clone(),
            version,
            download_url: self.client.download_url(asset),
            changelog,
            release_date: metadata.published_at.clone(),
            file_size: asset.size,
            checksum,
        }))
    }

    /// Find the declared checksum for an asset, if the release publishes
    /// a checksums file. Failures here are logged, never fatal; checksum
    /// enforcement happens after the download.
    async fn lookup_checksum(&self, metadata: &ReleaseMetadata, asset_name: &str) -> Option<String> {
        if !self.config.update.verify_checksum {
            return None;
        }
        match self.client.fetch_checksums_text(metadata).await {
            Ok(Some(text)) => verify::parse_checksums_file(&text)
                .remove(asset_name)
                .map(|hex| format!("sha256:{hex}")),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Could not fetch checksums file: {e}");
                None
            }
        }
    }

    /// Download an update artifact.
    ///
    /// Uses `info` when given, else the result of the last check.
    /// Retries the whole transfer a configured number of times with a
    /// fixed delay. When the update info carries a supported checksum,
    /// the file is verified after the stream completes; a mismatch
    /// deletes the file and fails the download.
    ///
    /// # Errors
    ///
    /// [`LauncherError::NoUpdateInfo`] when neither an explicit `info`
    /// nor a preceding check exists; otherwise the download or checksum
    /// error of the last attempt.
    pub async fn download_update<F>(
        &mut self,
        info: Option<UpdateInfo>,
        mut on_progress: F,
    ) -> Result<PathBuf>
    where
        F: FnMut(u64, u64),
    {
        if let Some(info) = info {
            self.update_info = Some(info);
        }
        self.state = UpdateState::Downloading;
        match self.download_inner(&mut on_progress).await {
            Ok(path) => {
                self.state = UpdateState::Downloaded;
                self.downloaded_file = Some(path.clone());
                Ok(path)
            }
            Err(e) => {
                self.state = UpdateState::Failed(UpdateStage::Download);
                Err(e)
            }
        }
    }

    async fn download_inner<F>(&mut self, on_progress: &mut F) -> Result<PathBuf>
    where
        F: FnMut(u64, u64),
    {
        let info = self.update_info.clone().ok_or(LauncherError::NoUpdateInfo)?;
        let dest = self.config.temp_dir().join(&info.asset_name);
        ensure_dir(self.config.temp_dir().as_path())?;

        let attempts = self.config.network.max_download_retries.max(1);
        let delay = Duration::from_secs(self.config.network.retry_delay_secs);
        let mut last_err = None;

        for attempt in 1..=attempts {
            tracing::info!("Downloading {} (attempt {attempt}/{attempts})", info.asset_name);
            match self
                .client
                .stream_download(&info.download_url, info.file_size, &dest, &mut *on_progress)
                .await
            {
                Ok(()) => {
                    self.verify_download(&dest, &info).await?;
                    return Ok(dest);
                }
                Err(e) => {
                    tracing::warn!("Download attempt {attempt} failed: {e}");
                    last_err = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or(LauncherError::Download {
            reason: "download failed with no recorded error".to_string(),
        }))
    }

    /// Enforce the declared checksum on a completed download.
    async fn verify_download(&self, path: &Path, info: &UpdateInfo) -> Result<()> {
        let Some(declared) = &info.checksum else {
            return Ok(());
        };
        if !self.config.update.verify_checksum {
            return Ok(());
        }

        let declared = DeclaredChecksum::parse(declared);
        if !declared.is_supported() {
            tracing::warn!(
                "Skipping verification: unsupported checksum algorithm '{}'",
                declared.algorithm
            );
            return Ok(());
        }

        let actual = verify::hash_file(path)?;
        if actual.eq_ignore_ascii_case(&declared.hex) {
            tracing::info!("Checksum verified for {}", info.asset_name);
            return Ok(());
        }

        // A payload failing its declared checksum is never kept
        remove_file_with_retry(path).await?;
        Err(LauncherError::ChecksumMismatch {
            file: info.asset_name.clone(),
            expected: declared.hex,
            actual,
        })
    }

    /// Install the downloaded artifact into the install directory.
    ///
    /// Sequence: stop the running application, set the previous artifact
    /// aside as a `.bak` sibling, move the download into place, extract
    /// it over the install tree, and persist the new version record. A
    /// failure while moving or extracting restores the `.bak` sibling
    /// before propagating; a version-record write failure is only a
    /// warning because the files on disk are already correct.
    ///
    /// # Errors
    ///
    /// [`LauncherError::NoDownloadedFile`] / [`LauncherError::NoUpdateInfo`]
    /// when preconditions are missing, [`LauncherError::ProcessBusy`] when
    /// the application cannot be stopped, [`LauncherError::InstallFailed`]
    /// for move or extract failures.
    pub async fn apply_update(&mut self, make_backup_of_artifact: bool) -> Result<()> {
        self.state = UpdateState::Applying;
        match self.apply_inner(make_backup_of_artifact).await {
            Ok(()) => {
                self.state = UpdateState::Applied;
                Ok(())
            }
            Err(e) => {
                self.state = UpdateState::Failed(UpdateStage::Apply);
                Err(e)
            }
        }
    }

    async fn apply_inner(&mut self, make_backup_of_artifact: bool) -> Result<()> {
        let downloaded = self.downloaded_file.clone().ok_or(LauncherError::NoDownloadedFile)?;
        // The artifact may have been removed since the download finished
        if !downloaded.exists() {
            return Err(LauncherError::NoDownloadedFile);
        }
        let info = self.update_info.clone().ok_or(LauncherError::NoUpdateInfo)?;

        self.guard.ensure_stopped().await?;

        let install_dir = self.config.install_dir();
        let artifact_path = install_dir.join(&info.asset_name);
        let bak_path = artifact_path.with_extension("bak");

        let mut bak_exists = false;
        if make_backup_of_artifact && artifact_path.exists() {
            rename_with_retry(&artifact_path, &bak_path).await?;
            bak_exists = true;
        }

        let result = self.install_artifact(&downloaded, &artifact_path, &install_dir).await;

        if let Err(e) = result {
            if bak_exists {
                if let Err(restore_err) = rename_with_retry(&bak_path, &artifact_path).await {
                    tracing::warn!("Rollback of previous artifact failed: {restore_err}");
                }
            }
            return Err(e);
        }

        if bak_exists {
            if let Err(e) = remove_file_with_retry(&bak_path).await {
                tracing::warn!("Could not remove stale artifact backup: {e}");
            }
        }

        if let Err(e) = self.store.record_install(&info.version, &self.config.app.name) {
            tracing::warn!("Update installed, but writing the version record failed: {e}");
        }

        tracing::info!("Update {} applied", info.version);
        Ok(())
    }

    /// Move the download into the install tree and extract it.
    async fn install_artifact(
        &self,
        downloaded: &Path,
        artifact_path: &Path,
        install_dir: &Path,
    ) -> Result<()> {
        ensure_dir(install_dir)?;

        rename_with_retry(downloaded, artifact_path).await.map_err(|e| {
            LauncherError::InstallFailed {
                reason: format!("could not move artifact into install dir: {e}"),
            }
        })?;

        extract_archive(artifact_path, install_dir).await.map_err(|e| {
            LauncherError::InstallFailed {
                reason: format!("could not extract artifact: {e}"),
            }
        })
    }

    /// Remove download leftovers.
    ///
    /// Deletes the downloaded artifact if still present and removes the
    /// temp directory only when empty, so partial state from another
    /// attempt is never destroyed.
    pub async fn cleanup(&mut self) {
        if let Some(path) = self.downloaded_file.take() {
            if let Err(e) = remove_file_with_retry(&path).await {
                tracing::warn!("Could not remove downloaded artifact: {e}");
            }
        }
        remove_dir_if_empty(&self.config.temp_dir());
    }
}

/// Extract a zip archive into a directory, overwriting existing members.
///
/// Runs on the blocking pool; zip decompression is CPU-bound file I/O.
async fn extract_archive(archive_path: &Path, dest: &Path) -> Result<()> {
    let archive_path = archive_path.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let file = std::fs::File::open(&archive_path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| LauncherError::InstallFailed {
            reason: format!("invalid archive {}: {e}", archive_path.display()),
        })?;
        archive.extract(&dest).map_err(|e| LauncherError::InstallFailed {
            reason: format!("extraction into {} failed: {e}", dest.display()),
        })?;
        Ok(())
    })
    .await
    .map_err(|e| LauncherError::Other {
        message: format!("extraction task panicked: {e}"),
    })?
}
