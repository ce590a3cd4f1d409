//! Checksum computation and verification for downloaded artifacts.
//!
//! Hashes are streamed in fixed-size chunks so artifacts of tens of
//! megabytes never sit in memory. Verification is deliberately forgiving
//! at the edges: a missing or unreadable file is "not verified" rather
//! than a hard error, and only the caller decides whether that is fatal.

use crate::constants::CHECKSUM_CHUNK_SIZE;
use crate::core::Result;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Compute the SHA-256 hash of a file, streamed in fixed-size chunks.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHECKSUM_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Check a file against an expected SHA-256 hex digest.
///
/// Comparison is case-insensitive. Returns `false` rather than an error
/// when the file is missing or unreadable.
#[must_use]
pub fn verify_file(path: &Path, expected_hex: &str) -> bool {
    match hash_file(path) {
        Ok(actual) => actual.eq_ignore_ascii_case(expected_hex.trim()),
        Err(e) => {
            tracing::debug!("Could not hash {} for verification: {e}", path.display());
            false
        }
    }
}

/// A checksum declaration of the form `algorithm:hex`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredChecksum {
    /// The hash algorithm name, lowercased
    pub algorithm: String,
    /// The hex digest
    pub hex: String,
}

impl DeclaredChecksum {
    /// Parse an `algorithm:hex` string. A bare hex string with no colon is
    /// assumed to be SHA-256.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some((algo, hex)) => Self {
                algorithm: algo.trim().to_ascii_lowercase(),
                hex: hex.trim().to_string(),
            },
            None => Self {
                algorithm: "sha256".to_string(),
                hex: s.trim().to_string(),
            },
        }
    }

    /// Whether this launcher can verify the declared algorithm.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.algorithm == "sha256"
    }
}

/// Parse a conventional checksums file into a filename-to-hash map.
///
/// Accepts the two-column `hash  filename` format, with an optional `*`
/// prefix on the filename marking binary mode. Blank lines and
/// `#`-comments are ignored, as are lines without both columns.
#[must_use]
pub fn parse_checksums_file(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(hash), Some(filename)) = (parts.next(), parts.next()) else {
            continue;
        };
        let filename = filename.strip_prefix('*').unwrap_or(filename);
        map.insert(filename.to_string(), hash.to_string());
    }

    map
}
