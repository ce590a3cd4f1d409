//! Global constants used throughout the launchpad codebase.
//!
//! This module contains timeout durations, retry parameters, and other
//! numeric constants that are used across multiple modules. Defining
//! them centrally improves maintainability and makes magic numbers
//! more discoverable.

use std::time::Duration;

/// User agent sent with every request to the release-hosting API.
pub const USER_AGENT: &str = concat!("launchpad/", env!("CARGO_PKG_VERSION"));

/// Base URL of the GitHub REST API.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Value of the `X-GitHub-Api-Version` header sent on API asset downloads.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Default timeout for release-metadata requests (5 seconds).
///
/// The latest-release lookup is a small JSON round trip; a short timeout
/// keeps launcher startup responsive when the network is down.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;

/// Default timeout for bulk artifact downloads (10 minutes).
///
/// Artifacts may be tens of megabytes on slow links, so the download
/// request gets a much longer deadline than the metadata check.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// Default number of whole-download attempts before giving up.
pub const DEFAULT_DOWNLOAD_RETRIES: u32 = 3;

/// Default delay between download attempts (3 seconds).
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 3;

/// Chunk size for streaming checksum computation (8 KiB).
///
/// Tuning parameter only; correctness does not depend on it.
pub const CHECKSUM_CHUNK_SIZE: usize = 8192;

/// Grace interval after sending a terminate request before re-checking
/// whether the target process is gone (500ms).
pub const KILL_GRACE_INTERVAL: Duration = Duration::from_millis(500);

/// Number of attempts for single-file delete/rename operations.
///
/// Windows keeps files locked briefly after a process exits, so these
/// operations retry a few times before failing.
pub const FILE_OP_ATTEMPTS: u32 = 3;

/// Delay between single-file delete/rename attempts (500ms).
pub const FILE_OP_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Name of the backup directory inside the install directory.
pub const BACKUP_DIR_NAME: &str = "backup";

/// Name of the staging directory used while restoring a backup.
///
/// Staged entries are renamed into the install directory only after the
/// whole backup has been copied, so a failed restore never leaves the
/// installed tree half-deleted.
pub const RESTORE_STAGING_DIR_NAME: &str = ".restore-staging";

/// File name of the installed-version record inside the install directory.
pub const VERSION_FILE_NAME: &str = "version.json";

/// Conventional name of the checksums asset attached to a release.
pub const CHECKSUMS_ASSET_NAME: &str = "checksums.txt";

/// Environment variable holding the release-host auth token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Environment variable pointing at an alternate launcher config file.
pub const CONFIG_ENV_VAR: &str = "LAUNCHPAD_CONFIG";

/// Environment variable that disables progress indicators when set.
pub const NO_PROGRESS_ENV_VAR: &str = "LAUNCHPAD_NO_PROGRESS";
