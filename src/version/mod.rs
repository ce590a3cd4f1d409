//! Version model for the launcher.
//!
//! Versions are triples of non-negative integers, parsed from strings that
//! may carry a single leading `v`/`V` prefix. Ordering is lexicographic on
//! `(major, minor, patch)`.
//!
//! Two parse modes exist:
//! - [`Version::parse`] is strict and requires exactly three components.
//!   Used when comparing installed-vs-available versions.
//! - [`Version::parse_lenient`] pads missing trailing components with zero
//!   and ignores extras. Used on the download path where release tags are
//!   sometimes abbreviated.
//!
//! A malformed string is always a parse failure; it is never coerced into
//! a version, and [`is_newer`] treats it as "not newer" so an unparseable
//! candidate can never be installed.

pub mod store;

use crate::core::{LauncherError, Result};
use std::fmt;

/// A semantic version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Patch component
    pub patch: u64,
}

impl Version {
    /// Create a version from its components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string strictly.
    ///
    /// Strips surrounding whitespace and one leading `v` or `V`, then
    /// requires exactly three dot-separated non-negative integers.
    ///
    /// # Errors
    ///
    /// Returns [`LauncherError::VersionParse`] if the string does not have
    /// exactly three integer components.
    pub fn parse(input: &str) -> Result<Self> {
        let components = Self::components(input)?;
        if components.len() != 3 {
            return Err(LauncherError::VersionParse {
                input: input.to_string(),
                reason: format!("expected 3 components, found {}", components.len()),
            });
        }
        Ok(Self::new(components[0], components[1], components[2]))
    }

    /// Parse a version string leniently.
    ///
    /// Same stripping rules as [`Version::parse`], but missing trailing
    /// components are padded with zero (`"1.2"` becomes `1.2.0`) and
    /// components past the third are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LauncherError::VersionParse`] if the string is empty or a
    /// component is not a non-negative integer.
    pub fn parse_lenient(input: &str) -> Result<Self> {
        let components = Self::components(input)?;
        Ok(Self::new(
            components.first().copied().unwrap_or(0),
            components.get(1).copied().unwrap_or(0),
            components.get(2).copied().unwrap_or(0),
        ))
    }

    /// Split a version string into integer components.
    fn components(input: &str) -> Result<Vec<u64>> {
        let trimmed = input.trim();
        let stripped = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        if stripped.is_empty() {
            return Err(LauncherError::VersionParse {
                input: input.to_string(),
                reason: "empty version string".to_string(),
            });
        }

        stripped
            .split('.')
            .map(|part| {
                part.parse::<u64>().map_err(|_| LauncherError::VersionParse {
                    input: input.to_string(),
                    reason: format!("'{part}' is not a non-negative integer"),
                })
            })
            .collect()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Decide whether a candidate version string should trigger an update.
///
/// Returns `true` when no version is installed, or when the candidate
/// parses and compares strictly greater than the installed version. An
/// unparseable candidate yields `false`; the launcher never installs a
/// version it cannot parse.
#[must_use]
pub fn is_newer(candidate: &str, installed: Option<&Version>) -> bool {
    let Ok(candidate) = Version::parse_lenient(candidate) else {
        tracing::warn!("Ignoring unparseable remote version '{candidate}'");
        return false;
    };

    match installed {
        None => true,
        Some(installed) => candidate > *installed,
    }
}
