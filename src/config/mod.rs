//! Launcher configuration.
//!
//! Configuration is a small TOML file with serde defaults for every
//! field, so an empty or missing file yields a fully working config. The
//! file is resolved from the `LAUNCHPAD_CONFIG` environment variable if
//! set, else `launcher.toml` next to the launcher executable, else pure
//! defaults.
//!
//! The release-API token is never stored in the file; it is read from
//! the `GITHUB_TOKEN` environment variable at request time.
//!
//! # Example
//!
//! ```toml
//! [app]
//! name = "pos"
//!
//! [release]
//! owner = "acme"
//! repo = "pos-releases"
//!
//! [network]
//! download_timeout_secs = 900
//!
//! [update]
//! auto_backup = false
//! ```

use crate::constants::{
    BACKUP_DIR_NAME, CONFIG_ENV_VAR, DEFAULT_DOWNLOAD_RETRIES, DEFAULT_DOWNLOAD_TIMEOUT_SECS,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_SECS, GITHUB_API_BASE, TOKEN_ENV_VAR,
};
use crate::core::{LauncherError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level launcher configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LauncherConfig {
    /// The managed application
    #[serde(default)]
    pub app: AppConfig,
    /// Where releases are published
    #[serde(default)]
    pub release: ReleaseConfig,
    /// Timeouts and retry policy
    #[serde(default)]
    pub network: NetworkConfig,
    /// Update behavior toggles
    #[serde(default)]
    pub update: UpdateConfig,
    /// Optional path overrides
    #[serde(default)]
    pub paths: PathsConfig,
}

/// The `[app]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application name, used for default paths and asset patterns
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Explicit executable file name; defaults to the app name with the
    /// platform suffix
    #[serde(default)]
    pub executable: Option<String>,
}

/// The `[release]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Repository owner
    #[serde(default)]
    pub owner: String,
    /// Repository name
    #[serde(default)]
    pub repo: String,
    /// Base URL of the release-hosting API
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Base name of the release asset; defaults to `{name}-{platform}`
    #[serde(default)]
    pub asset_pattern: Option<String>,
}

/// The `[network]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    /// Timeout for metadata requests, in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Timeout for the bulk artifact download, in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
    /// How many times a failed download is retried
    #[serde(default = "default_download_retries")]
    pub max_download_retries: u32,
    /// Fixed delay between download retries, in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

/// The `[update]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UpdateConfig {
    /// Check for updates when the launcher starts
    #[serde(default = "default_true")]
    pub check_on_startup: bool,
    /// Snapshot the installed tree before applying an update
    #[serde(default = "default_true")]
    pub auto_backup: bool,
    /// Verify the declared checksum of a downloaded artifact
    #[serde(default = "default_true")]
    pub verify_checksum: bool,
}

/// The `[paths]` section. Both fields override platform defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Where the application is installed
    #[serde(default)]
    pub install_dir: Option<PathBuf>,
    /// Where downloaded artifacts are staged
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_app_name() -> String {
    "app".to_string()
}

fn default_api_base() -> String {
    GITHUB_API_BASE.to_string()
}

const fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

const fn default_download_timeout() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

const fn default_download_retries() -> u32 {
    DEFAULT_DOWNLOAD_RETRIES
}

const fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_SECS
}

const fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            executable: None,
        }
    }
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            api_base: default_api_base(),
            asset_pattern: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            download_timeout_secs: default_download_timeout(),
            max_download_retries: default_download_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            check_on_startup: true,
            auto_backup: true,
            verify_checksum: true,
        }
    }
}

impl LauncherConfig {
    /// Load the configuration, resolving the file path in priority order:
    /// explicit path, `LAUNCHPAD_CONFIG` environment variable,
    /// `launcher.toml` next to the launcher executable. A missing file at
    /// any resolved location yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error only when a file exists but cannot be read or
    /// parsed; a missing file is never an error.
    pub fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = path
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .or_else(default_config_path);

        match path {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and parse the configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`LauncherError::ConfigError`] when a release owner is set
    /// without a repo or vice versa.
    pub fn validate(&self) -> Result<()> {
        if self.release.owner.is_empty() != self.release.repo.is_empty() {
            return Err(LauncherError::ConfigError {
                message: "release.owner and release.repo must be set together".to_string(),
            });
        }
        Ok(())
    }

    /// The executable file name, applying the platform suffix default.
    #[must_use]
    pub fn executable_name(&self) -> String {
        self.app.executable.clone().unwrap_or_else(|| {
            if cfg!(windows) {
                format!("{}.exe", self.app.name)
            } else {
                self.app.name.clone()
            }
        })
    }

    /// Directory holding the installed application.
    #[must_use]
    pub fn install_dir(&self) -> PathBuf {
        self.paths.install_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(&self.app.name)
        })
    }

    /// Directory where downloaded artifacts are staged.
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.paths
            .temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(format!("{}-updates", self.app.name)))
    }

    /// Full path of the installed executable.
    #[must_use]
    pub fn executable_path(&self) -> PathBuf {
        self.install_dir().join(self.executable_name())
    }

    /// Directory holding the whole-tree snapshot.
    #[must_use]
    pub fn backup_dir(&self) -> PathBuf {
        self.install_dir().join(BACKUP_DIR_NAME)
    }

    /// Base name of the expected release asset.
    #[must_use]
    pub fn asset_pattern(&self) -> String {
        self.release
            .asset_pattern
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.app.name, platform_label()))
    }

    /// Ordered asset-name candidates, most specific first.
    #[must_use]
    pub fn asset_candidates(&self) -> Vec<String> {
        let pattern = self.asset_pattern();
        vec![
            format!("{pattern}.zip"),
            format!("{pattern}.exe"),
            self.executable_name(),
            pattern,
        ]
    }

    /// The API token from the environment, if configured.
    #[must_use]
    pub fn token() -> Option<String> {
        std::env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty())
    }
}

fn default_config_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join("launcher.toml"))
}

fn platform_label() -> &'static str {
    if cfg!(windows) {
        "Windows"
    } else if cfg!(target_os = "macos") {
        "macOS"
    } else {
        "Linux"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = LauncherConfig::default();
        assert_eq!(config.app.name, "app");
        assert_eq!(config.release.api_base, GITHUB_API_BASE);
        assert_eq!(config.network.http_timeout_secs, 5);
        assert_eq!(config.network.max_download_retries, 3);
        assert!(config.update.check_on_startup);
        assert!(config.update.auto_backup);
        assert!(config.update.verify_checksum);
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: LauncherConfig = toml::from_str("").unwrap();
        assert_eq!(config, LauncherConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[app]
name = "pos"

[release]
owner = "acme"
repo = "pos-releases"

[network]
download_timeout_secs = 900
"#;
        let config: LauncherConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.app.name, "pos");
        assert_eq!(config.release.owner, "acme");
        assert_eq!(config.network.download_timeout_secs, 900);
        // Untouched fields keep their defaults
        assert_eq!(config.network.http_timeout_secs, 5);
        assert!(config.update.auto_backup);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<LauncherConfig, _> = toml::from_str("[app]\nnmae = \"x\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_owner_repo_pairing() {
        let mut config = LauncherConfig::default();
        config.release.owner = "acme".to_string();
        assert!(config.validate().is_err());

        config.release.repo = "pos".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_executable_name_default() {
        let mut config = LauncherConfig::default();
        config.app.name = "pos".to_string();

        if cfg!(windows) {
            assert_eq!(config.executable_name(), "pos.exe");
        } else {
            assert_eq!(config.executable_name(), "pos");
        }

        config.app.executable = Some("pos-gui.exe".to_string());
        assert_eq!(config.executable_name(), "pos-gui.exe");
    }

    #[test]
    fn test_asset_candidates_order() {
        let mut config = LauncherConfig::default();
        config.app.name = "pos".to_string();
        config.app.executable = Some("pos.exe".to_string());
        config.release.asset_pattern = Some("POS-Windows".to_string());

        assert_eq!(
            config.asset_candidates(),
            vec!["POS-Windows.zip", "POS-Windows.exe", "pos.exe", "POS-Windows"]
        );
    }

    #[test]
    fn test_path_overrides() {
        let temp = TempDir::new().unwrap();
        let mut config = LauncherConfig::default();
        config.paths.install_dir = Some(temp.path().join("install"));
        config.paths.temp_dir = Some(temp.path().join("tmp"));

        assert_eq!(config.install_dir(), temp.path().join("install"));
        assert_eq!(config.temp_dir(), temp.path().join("tmp"));
        assert_eq!(config.backup_dir(), temp.path().join("install").join("backup"));
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("launcher.toml");
        std::fs::write(&path, "[app]\nname = \"pos\"\n").unwrap();

        let config = LauncherConfig::load_from(&path).unwrap();
        assert_eq!(config.app.name, "pos");

        let missing = LauncherConfig::load_with_optional(Some(temp.path().join("nope.toml")));
        assert_eq!(missing.unwrap(), LauncherConfig::default());
    }
}
