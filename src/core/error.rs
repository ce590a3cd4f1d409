//! Error handling for the launcher.
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** for precise handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! Two main types cooperate:
//! - [`LauncherError`] - enumerated error types for every failure class
//! - [`ErrorContext`] - wrapper adding user-friendly suggestions and details
//!
//! # Error Categories
//!
//! - **Version model**: [`LauncherError::VersionParse`]
//! - **Release host / network**: [`LauncherError::Unauthorized`],
//!   [`LauncherError::Forbidden`], [`LauncherError::ReleaseNotFound`],
//!   [`LauncherError::HttpStatus`], [`LauncherError::ConnectionFailed`],
//!   [`LauncherError::Timeout`]
//! - **Download**: [`LauncherError::Download`], [`LauncherError::ChecksumMismatch`]
//! - **Apply**: [`LauncherError::ProcessBusy`], [`LauncherError::InstallFailed`]
//! - **Backup/restore**: [`LauncherError::BackupFailed`], [`LauncherError::NoBackup`]
//!
//! # Propagation policy
//!
//! Low-level file helpers retry transient lock errors internally and only
//! fail after exhausting bounded retries. Everything above that boundary
//! propagates a typed error up to the CLI, which is the only layer allowed
//! to render a user-facing message via [`user_friendly_error`].

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for launcher operations.
///
/// Each variant represents a specific failure mode with enough context to
/// build an actionable message. Network variants are mapped at the HTTP
/// layer and are never retried there; retry policy lives in the updater.
#[derive(Error, Debug)]
pub enum LauncherError {
    /// A version string did not parse as `major.minor.patch`.
    ///
    /// Always fails closed: an unparseable candidate is treated as
    /// "not newer" and is never installed.
    #[error("Invalid version string '{input}': {reason}")]
    VersionParse {
        /// The string that failed to parse
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// The release host rejected the request with 401.
    #[error("Authentication failed while {operation}")]
    Unauthorized {
        /// The request that was rejected (e.g. "fetching the latest release")
        operation: String,
    },

    /// The release host rejected the request with 403.
    #[error("Access denied while {operation}")]
    Forbidden {
        /// The request that was rejected
        operation: String,
    },

    /// The repository or release does not exist (404).
    #[error("No release found for {owner}/{repo}")]
    ReleaseNotFound {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,
    },

    /// Any other non-success HTTP status.
    #[error("HTTP {status} while {operation}")]
    HttpStatus {
        /// The numeric status code
        status: u16,
        /// The request that failed
        operation: String,
    },

    /// The connection could not be established.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// Transport-level failure description
        reason: String,
    },

    /// The server did not respond within the configured timeout.
    #[error("Timed out while {operation}")]
    Timeout {
        /// The request that stalled
        operation: String,
    },

    /// Streaming or writing the artifact failed.
    ///
    /// Wraps both transport errors mid-stream and local I/O write
    /// failures; the updater retries this class up to a fixed bound.
    #[error("Download failed: {reason}")]
    Download {
        /// What went wrong during the transfer
        reason: String,
    },

    /// The downloaded artifact does not match its declared checksum.
    ///
    /// The artifact is deleted before this error is raised; a payload
    /// that fails its declared checksum is never installed.
    #[error("Checksum mismatch for '{file}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Name of the downloaded file
        file: String,
        /// The declared checksum
        expected: String,
        /// The checksum actually computed
        actual: String,
    },

    /// The target application could not be stopped.
    ///
    /// Fatal for any operation that needs exclusive access to the
    /// executable, which stays locked while running on Windows.
    #[error("Could not close {executable}")]
    ProcessBusy {
        /// Image name of the process that refused to die
        executable: String,
    },

    /// Renaming or extracting the artifact into the install tree failed.
    #[error("Install failed: {reason}")]
    InstallFailed {
        /// What went wrong during the swap/extract
        reason: String,
    },

    /// Snapshot or restore of the installed tree failed.
    #[error("Backup operation failed on '{entry}': {reason}")]
    BackupFailed {
        /// The offending file or directory
        entry: String,
        /// What went wrong
        reason: String,
    },

    /// A downgrade was requested but no snapshot exists.
    #[error("No backup available to restore")]
    NoBackup,

    /// A download or apply was requested before a successful check.
    #[error("No update information available; run a check first")]
    NoUpdateInfo,

    /// An apply was requested but no artifact has been downloaded.
    #[error("No downloaded file to apply")]
    NoDownloadedFile,

    /// Launcher configuration problem.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for LauncherError {
    fn clone(&self) -> Self {
        match self {
            Self::VersionParse {
                input,
                reason,
            } => Self::VersionParse {
                input: input.clone(),
                reason: reason.clone(),
            },
            Self::Unauthorized {
                operation,
            } => Self::Unauthorized {
                operation: operation.clone(),
            },
            Self::Forbidden {
                operation,
            } => Self::Forbidden {
                operation: operation.clone(),
            },
            Self::ReleaseNotFound {
                owner,
                repo,
            } => Self::ReleaseNotFound {
                owner: owner.clone(),
                repo: repo.clone(),
            },
            Self::HttpStatus {
                status,
                operation,
            } => Self::HttpStatus {
                status: *status,
                operation: operation.clone(),
            },
            Self::ConnectionFailed {
                reason,
            } => Self::ConnectionFailed {
                reason: reason.clone(),
            },
            Self::Timeout {
                operation,
            } => Self::Timeout {
                operation: operation.clone(),
            },
            Self::Download {
                reason,
            } => Self::Download {
                reason: reason.clone(),
            },
            Self::ChecksumMismatch {
                file,
                expected,
                actual,
            } => Self::ChecksumMismatch {
                file: file.clone(),
                expected: expected.clone(),
                actual: actual.clone(),
            },
            Self::ProcessBusy {
                executable,
            } => Self::ProcessBusy {
                executable: executable.clone(),
            },
            Self::InstallFailed {
                reason,
            } => Self::InstallFailed {
                reason: reason.clone(),
            },
            Self::BackupFailed {
                entry,
                reason,
            } => Self::BackupFailed {
                entry: entry.clone(),
                reason: reason.clone(),
            },
            Self::NoBackup => Self::NoBackup,
            Self::NoUpdateInfo => Self::NoUpdateInfo,
            Self::NoDownloadedFile => Self::NoDownloadedFile,
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::JsonError(e) => Self::Other {
                message: format!("JSON error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information.
///
/// Wraps a [`LauncherError`] and adds optional suggestions and details.
/// This is the only form in which errors reach the user's terminal; every
/// layer below the CLI propagates the typed error untouched.
///
/// # Display Format
///
/// 1. **Error**: the main message in red
/// 2. **Details**: additional context in yellow (optional)
/// 3. **Suggestion**: actionable steps in green (optional)
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying launcher error
    pub error: LauncherError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: LauncherError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable
/// suggestions.
///
/// Recognizes [`LauncherError`] variants and common I/O errors and maps
/// each to tailored guidance; everything else is surfaced with its full
/// error chain so an unexpected failure never crashes the launcher without
/// an explanation.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(launcher_error) = error.downcast_ref::<LauncherError>() {
        return create_error_context(launcher_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(LauncherError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion(
                    "Check file ownership, or run with elevated permissions if the install directory is protected",
                )
                .with_details("The launcher does not have permission to read or write a required file");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(LauncherError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the install directory exists and the path is correct");
            }
            _ => {}
        }
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(LauncherError::Other {
        message,
    })
}

/// Map each [`LauncherError`] variant to tailored suggestions and details.
fn create_error_context(error: LauncherError) -> ErrorContext {
    match &error {
        LauncherError::Unauthorized { .. } => ErrorContext::new(error.clone())
            .with_suggestion(
                "Check that the GITHUB_TOKEN environment variable holds a valid token with access to the release repository",
            )
            .with_details("Private repositories and API asset downloads require a personal access token"),

        LauncherError::Forbidden { .. } => ErrorContext::new(error.clone())
            .with_suggestion(
                "The token may lack the required scope ('repo' for private repositories), or the repository requires authentication",
            ),

        LauncherError::ReleaseNotFound { owner, repo } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Verify that {owner}/{repo} exists and has at least one published release"
            )),

        LauncherError::ConnectionFailed { .. } | LauncherError::Timeout { .. } => {
            ErrorContext::new(error.clone())
                .with_suggestion("Check your internet connection and try again")
                .with_details("The release host could not be reached within the configured timeout")
        }

        LauncherError::ChecksumMismatch { .. } => ErrorContext::new(error.clone())
            .with_suggestion("The download was discarded; run the update again")
            .with_details(
                "The artifact did not match its declared checksum, which indicates corruption or tampering",
            ),

        LauncherError::ProcessBusy { executable } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Close {executable} manually and try again"
            ))
            .with_details("Files of a running application cannot be replaced"),

        LauncherError::InstallFailed { .. } => ErrorContext::new(error.clone())
            .with_suggestion("The previous artifact was restored where possible; retry the update")
            .with_details("Installation failed while swapping or extracting the downloaded artifact"),

        LauncherError::BackupFailed { entry, .. } => ErrorContext::new(error.clone())
            .with_suggestion(format!(
                "Check permissions on '{entry}' and re-run the operation"
            )),

        LauncherError::NoBackup => ErrorContext::new(error.clone())
            .with_suggestion("Create a backup first, or run an update (which snapshots the current install)"),

        _ => ErrorContext::new(error.clone()),
    }
}
