//! Core types shared across the launcher.
//!
//! This module holds the error taxonomy and result alias used by every
//! other module. Keeping them in one place ensures a uniform propagation
//! style: typed errors travel up, and only the CLI layer renders them.

pub mod error;

pub use error::{ErrorContext, LauncherError, user_friendly_error};

/// Result alias used throughout the launcher.
pub type Result<T> = std::result::Result<T, LauncherError>;
