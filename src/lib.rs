//! # launchpad
//!
//! A self-updating application launcher. On startup it compares the
//! installed version against the latest published release, downloads and
//! verifies a newer artifact when one exists, installs it with rollback
//! on failure, and then launches the application detached from itself.
//!
//! ## Architecture
//!
//! - [`updater`] - orchestrates the check, download, and apply cycle
//! - [`backup`] - whole-tree snapshot and staged restore
//! - [`release`] - HTTP client for the release-hosting API
//! - [`process`] - stops the running application and launches it detached
//! - [`verify`] - streaming SHA-256 hashing and checksum-file parsing
//! - [`version`] - version parsing, ordering, and the persisted record
//! - [`config`] - TOML configuration with full defaults
//! - [`cli`] - the `launchpad` command-line interface
//! - [`core`] - error taxonomy shared by everything above
//!
//! ## Safety properties
//!
//! - An unparseable remote version is never installed
//! - A payload failing its declared checksum is never installed
//! - Files of a running application are never overwritten
//! - A failed install restores the previous artifact where possible
//! - After any terminal outcome, a runnable executable is still launched

pub mod backup;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod process;
pub mod release;
pub mod updater;
pub mod utils;
pub mod verify;
pub mod version;

pub use crate::core::{LauncherError, Result};
