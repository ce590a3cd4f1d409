//! Client for the release-hosting API.
//!
//! Talks to the GitHub-style releases endpoints: one metadata request for
//! the latest release, and a streaming download of the selected asset.
//! This layer never retries; it maps every failure onto the launcher's
//! error taxonomy and leaves retry policy to the updater.
//!
//! Asset downloads come in two flavors. With a token configured, the
//! API asset endpoint (`/releases/assets/{id}` with an octet-stream
//! `Accept` header) is used because it works for private repositories.
//! Without a token, the asset's public `browser_download_url` is used
//! directly.

use crate::config::{LauncherConfig, NetworkConfig, ReleaseConfig};
use crate::constants::{CHECKSUMS_ASSET_NAME, GITHUB_API_VERSION, USER_AGENT};
use crate::core::{LauncherError, Result};
use crate::utils::fs::ensure_dir;
use futures::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// One downloadable file attached to a release.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReleaseAsset {
    /// Asset id, used for the API download endpoint
    pub id: u64,
    /// File name of the asset
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Public download URL, usable without authentication
    pub browser_download_url: String,
}

/// Metadata of a published release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseMetadata {
    /// The release tag, typically `vX.Y.Z`
    pub tag_name: String,
    /// Changelog text
    #[serde(default)]
    pub body: String,
    /// Publication timestamp
    #[serde(default)]
    pub published_at: Option<String>,
    /// Files attached to the release
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// HTTP client for release metadata and asset downloads.
pub struct ReleaseClient {
    client: reqwest::Client,
    download_client: reqwest::Client,
    release: ReleaseConfig,
    token: Option<String>,
}

impl ReleaseClient {
    /// Build a client from the launcher configuration.
    ///
    /// Two underlying clients are kept: a short-timeout one for metadata
    /// and a long-timeout one for the bulk download, so a slow artifact
    /// transfer is not cut off by the metadata deadline.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be constructed.
    pub fn new(config: &LauncherConfig) -> Result<Self> {
        Self::with_token(&config.release, &config.network, LauncherConfig::token())
    }

    /// Build a client with an explicit token. Used by tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be constructed.
    pub fn with_token(
        release: &ReleaseConfig,
        network: &NetworkConfig,
        token: Option<String>,
    ) -> Result<Self> {
        let build = |timeout_secs: u64| {
            reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .map_err(|e| LauncherError::ConnectionFailed {
                    reason: format!("failed to build HTTP client: {e}"),
                })
        };

        Ok(Self {
            client: build(network.http_timeout_secs)?,
            download_client: build(network.download_timeout_secs)?,
            release: release.clone(),
            token,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header("X-GitHub-Api-Version", GITHUB_API_VERSION);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetch metadata of the latest published release.
    ///
    /// # Errors
    ///
    /// Maps HTTP failures onto the launcher taxonomy: 401 to
    /// [`LauncherError::Unauthorized`], 403 to [`LauncherError::Forbidden`],
    /// 404 to [`LauncherError::ReleaseNotFound`], any other non-success
    /// status to [`LauncherError::HttpStatus`], and transport problems to
    /// [`LauncherError::ConnectionFailed`] or [`LauncherError::Timeout`].
    pub async fn fetch_latest_release(&self) -> Result<ReleaseMetadata> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.release.api_base, self.release.owner, self.release.repo
        );
        let operation = "fetching the latest release";
        tracing::debug!("GET {url}");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| map_transport_error(&e, operation))?;

        self.check_status(&response, operation)?;

        let metadata: ReleaseMetadata = response.json().await.map_err(|e| {
            LauncherError::ConnectionFailed {
                reason: format!("invalid release metadata: {e}"),
            }
        })?;
        Ok(metadata)
    }

    fn check_status(&self, response: &reqwest::Response, operation: &str) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(match status.as_u16() {
            401 => LauncherError::Unauthorized {
                operation: operation.to_string(),
            },
            403 => LauncherError::Forbidden {
                operation: operation.to_string(),
            },
            404 => LauncherError::ReleaseNotFound {
                owner: self.release.owner.clone(),
                repo: self.release.repo.clone(),
            },
            code => LauncherError::HttpStatus {
                status: code,
                operation: operation.to_string(),
            },
        })
    }

    /// Pick the release asset to download, trying each candidate name in
    /// priority order.
    ///
    /// Exact name matches win, then substring matches in the same order.
    /// If nothing matches, the first asset in the release is returned so
    /// unconventional naming still makes forward progress, with a warning.
    #[must_use]
    pub fn resolve_asset<'a>(
        metadata: &'a ReleaseMetadata,
        candidates: &[String],
    ) -> Option<&'a ReleaseAsset> {
        for candidate in candidates {
            if let Some(asset) = metadata.assets.iter().find(|a| a.name == *candidate) {
                return Some(asset);
            }
        }
        for candidate in candidates {
            if let Some(asset) = metadata.assets.iter().find(|a| a.name.contains(candidate)) {
                tracing::debug!("Asset '{}' matched candidate '{candidate}' by substring", asset.name);
                return Some(asset);
            }
        }
        if let Some(asset) = metadata.assets.first() {
            tracing::warn!(
                "No asset matched any expected name; falling back to '{}'",
                asset.name
            );
            return Some(asset);
        }
        None
    }

    /// The URL from which an asset should be downloaded.
    ///
    /// With a token configured the API asset endpoint is used; it is the
    /// only one that works for private repositories. Otherwise the public
    /// browser URL is used.
    #[must_use]
    pub fn download_url(&self, asset: &ReleaseAsset) -> String {
        if self.token.is_some() {
            format!(
                "{}/repos/{}/{}/releases/assets/{}",
                self.release.api_base, self.release.owner, self.release.repo, asset.id
            )
        } else {
            asset.browser_download_url.clone()
        }
    }

    /// Stream an asset to disk, reporting progress after every chunk.
    ///
    /// Follows redirects, never buffers the whole payload, and writes
    /// through an async file handle.
    ///
    /// # Errors
    ///
    /// Transport failures map onto the HTTP taxonomy; local write
    /// failures and mid-stream errors map onto [`LauncherError::Download`].
    pub async fn stream_download<F>(
        &self,
        url: &str,
        total_size: u64,
        dest: &Path,
        mut on_progress: F,
    ) -> Result<()>
    where
        F: FnMut(u64, u64),
    {
        let operation = "downloading the update";
        tracing::debug!("GET {url} -> {}", dest.display());

        let response = self
            .authorize(self.download_client.get(url))
            .header(reqwest::header::ACCEPT, "application/octet-stream")
            // Identity encoding keeps content-length meaningful for progress
            .header(reqwest::header::ACCEPT_ENCODING, "identity")
            .send()
            .await
            .map_err(|e| map_transport_error(&e, operation))?;

        self.check_status(&response, operation)?;

        let total = response.content_length().unwrap_or(total_size);
        if let Some(parent) = dest.parent() {
            ensure_dir(parent)?;
        }
        let mut file = tokio::fs::File::create(dest).await?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                if e.is_timeout() {
                    LauncherError::Timeout {
                        operation: operation.to_string(),
                    }
                } else {
                    LauncherError::Download {
                        reason: format!("stream interrupted: {e}"),
                    }
                }
            })?;
            file.write_all(&chunk).await.map_err(|e| LauncherError::Download {
                reason: format!("write to {} failed: {e}", dest.display()),
            })?;
            downloaded += chunk.len() as u64;
            on_progress(downloaded, total);
        }

        file.flush().await?;
        Ok(())
    }

    /// Fetch the text of the conventional checksums asset, if the release
    /// carries one.
    ///
    /// # Errors
    ///
    /// Returns an error on transport or status failures; a release with
    /// no checksums asset is `Ok(None)`.
    pub async fn fetch_checksums_text(
        &self,
        metadata: &ReleaseMetadata,
    ) -> Result<Option<String>> {
        let Some(asset) = metadata.assets.iter().find(|a| a.name == CHECKSUMS_ASSET_NAME) else {
            return Ok(None);
        };
        let operation = "fetching the checksums file";

        let response = self
            .authorize(self.client.get(self.download_url(asset)))
            .header(reqwest::header::ACCEPT, "application/octet-stream")
            .send()
            .await
            .map_err(|e| map_transport_error(&e, operation))?;

        self.check_status(&response, operation)?;

        let text = response.text().await.map_err(|e| LauncherError::ConnectionFailed {
            reason: format!("reading checksums file failed: {e}"),
        })?;
        Ok(Some(text))
    }
}

fn map_transport_error(error: &reqwest::Error, operation: &str) -> LauncherError {
    if error.is_timeout() {
        LauncherError::Timeout {
            operation: operation.to_string(),
        }
    } else {
        LauncherError::ConnectionFailed {
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: u64, name: &str) -> ReleaseAsset {
        ReleaseAsset {
            id,
            name: name.to_string(),
            size: 1024,
            browser_download_url: format!("https://example.com/{name}"),
        }
    }

    fn metadata(assets: Vec<ReleaseAsset>) -> ReleaseMetadata {
        ReleaseMetadata {
            tag_name: "v1.0.0".to_string(),
            body: String::new(),
            published_at: None,
            assets,
        }
    }

    fn candidates() -> Vec<String> {
        vec![
            "POS-Windows.zip".to_string(),
            "POS-Windows.exe".to_string(),
            "pos.exe".to_string(),
            "POS-Windows".to_string(),
        ]
    }

    #[test]
    fn test_resolve_asset_exact_match_wins() {
        let meta = metadata(vec![asset(1, "POS.exe"), asset(2, "POS-Windows.zip")]);
        let resolved = ReleaseClient::resolve_asset(&meta, &candidates()).unwrap();
        assert_eq!(resolved.id, 2);
    }

    #[test]
    fn test_resolve_asset_priority_order() {
        // Both zip and exe candidates present; zip is first in priority
        let meta = metadata(vec![asset(1, "POS-Windows.exe"), asset(2, "POS-Windows.zip")]);
        let resolved = ReleaseClient::resolve_asset(&meta, &candidates()).unwrap();
        assert_eq!(resolved.name, "POS-Windows.zip");
    }

    #[test]
    fn test_resolve_asset_substring_match() {
        let meta = metadata(vec![asset(1, "release-POS-Windows.zip-v2")]);
        let resolved = ReleaseClient::resolve_asset(&meta, &candidates()).unwrap();
        assert_eq!(resolved.id, 1);
    }

    #[test]
    fn test_resolve_asset_falls_back_to_first() {
        let meta = metadata(vec![asset(7, "something-else.tar.gz"), asset(8, "other.zip")]);
        let resolved = ReleaseClient::resolve_asset(&meta, &candidates()).unwrap();
        assert_eq!(resolved.id, 7);
    }

    #[test]
    fn test_resolve_asset_empty_release() {
        let meta = metadata(vec![]);
        assert!(ReleaseClient::resolve_asset(&meta, &candidates()).is_none());
    }

    #[test]
    fn test_download_url_prefers_api_with_token() {
        let release = ReleaseConfig {
            owner: "acme".to_string(),
            repo: "pos".to_string(),
            ..Default::default()
        };
        let network = NetworkConfig::default();

        let with_token =
            ReleaseClient::with_token(&release, &network, Some("tok".to_string())).unwrap();
        let a = asset(42, "POS-Windows.zip");
        assert_eq!(
            with_token.download_url(&a),
            "https://api.github.com/repos/acme/pos/releases/assets/42"
        );

        let without_token = ReleaseClient::with_token(&release, &network, None).unwrap();
        assert_eq!(without_token.download_url(&a), "https://example.com/POS-Windows.zip");
    }

    #[test]
    fn test_metadata_deserialization() {
        let json = r#"{
            "tag_name": "v0.2.0",
            "body": "Fixes",
            "published_at": "2026-01-15T10:00:00Z",
            "assets": [
                {"id": 1, "name": "POS-Windows.zip", "size": 2048,
                 "browser_download_url": "https://example.com/POS-Windows.zip"}
            ]
        }"#;
        let meta: ReleaseMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.tag_name, "v0.2.0");
        assert_eq!(meta.assets.len(), 1);
        assert_eq!(meta.assets[0].size, 2048);
    }
}
