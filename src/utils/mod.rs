//! Shared utilities for the launcher.
//!
//! - [`fs`]: filesystem helpers with retry on transiently-locked files
//! - [`progress`]: progress indicators for downloads and long operations

pub mod fs;
pub mod progress;
