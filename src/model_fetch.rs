// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Startup download of classifier model files.
//!
//! When `MODEL_BUCKET` is set and `MODEL_LOCAL_PATH` is missing or empty,
//! every object under `MODEL_PREFIX` is copied to
//! `MODEL_LOCAL_PATH/<name without prefix>` before the speech adapter is
//! built. Objects are read through the Cloud Storage JSON API.
//!
//! Files land in a sibling `<dir>.partial` directory that is renamed onto
//! `MODEL_LOCAL_PATH` only after every object arrived, so an interrupted
//! download never looks like a present model on the next start.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

const DEFAULT_GCS_BASE_URL: &str = "https://storage.googleapis.com";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Model storage request failed: {0}")]
    Request(String),

    #[error("Model storage response was invalid: {0}")]
    InvalidResponse(String),

    #[error("Refusing to write object `{0}` outside the model directory")]
    UnsafePath(String),

    #[error("Failed to write model file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The local directory already held files; nothing was fetched.
    AlreadyPresent,
    /// This many objects were downloaded.
    Downloaded(usize),
}

#[async_trait]
pub trait ModelFetcher: Send + Sync {
    async fn fetch_if_absent(
        &self,
        bucket: &str,
        prefix: &str,
        local_path: &Path,
    ) -> Result<FetchOutcome, FetchError>;
}

#[derive(Debug, Clone)]
pub struct GcsModelFetcher {
    base_url: Url,
    http: Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    name: String,
}

impl GcsModelFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let base_url = Url::parse(DEFAULT_GCS_BASE_URL)
            .map_err(|e| FetchError::Request(format!("invalid base URL: {e}")))?;
        Self::with_base_url(base_url)
    }

    pub fn with_base_url(base_url: Url) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| FetchError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base_url, http })
    }

    fn object_url(&self, bucket: &str, object: Option<&str>) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| FetchError::Request("base URL cannot carry a path".to_string()))?;
            segments.pop_if_empty().extend(["storage", "v1", "b", bucket, "o"]);
            if let Some(object) = object {
                segments.push(object);
            }
        }
        Ok(url)
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, FetchError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.object_url(bucket, None)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("prefix", prefix);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::Request(e.to_string()))?;
            if !response.status().is_success() {
                return Err(FetchError::Request(format!(
                    "listing gs://{bucket}/{prefix} returned {}",
                    response.status()
                )));
            }
            let page: ObjectList = response
                .json()
                .await
                .map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

            names.extend(page.items.into_iter().map(|item| item.name));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(names),
            }
        }
    }

    async fn download(&self, bucket: &str, name: &str, target: &Path) -> Result<(), FetchError> {
        let mut url = self.object_url(bucket, Some(name))?;
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Request(format!(
                "downloading gs://{bucket}/{name} returned {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(target, &bytes).await?;
        Ok(())
    }

    async fn download_all(&self, bucket: &str, prefix: &str, into: &Path) -> Result<usize, FetchError> {
        let mut downloaded = 0;
        for name in self.list_objects(bucket, prefix).await? {
            let Some(target) = local_target(into, prefix, &name)? else {
                continue;
            };
            tracing::debug!(object = %name, target = %target.display(), "downloading object");
            self.download(bucket, &name, &target).await?;
            downloaded += 1;
        }
        Ok(downloaded)
    }
}

#[async_trait]
impl ModelFetcher for GcsModelFetcher {
    async fn fetch_if_absent(
        &self,
        bucket: &str,
        prefix: &str,
        local_path: &Path,
    ) -> Result<FetchOutcome, FetchError> {
        if directory_has_entries(local_path).await? {
            tracing::info!(path = %local_path.display(), "model already present locally");
            return Ok(FetchOutcome::AlreadyPresent);
        }

        tracing::info!(bucket, prefix, path = %local_path.display(), "downloading model files");
        let staging = staging_dir(local_path)?;
        if tokio::fs::try_exists(&staging).await? {
            tokio::fs::remove_dir_all(&staging).await?;
        }
        tokio::fs::create_dir_all(&staging).await?;

        let downloaded = match self.download_all(bucket, prefix, &staging).await {
            Ok(downloaded) => downloaded,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_dir_all(&staging).await {
                    tracing::warn!(error = %cleanup, path = %staging.display(), "failed to remove partial download");
                }
                return Err(e);
            }
        };

        // An existing but empty target directory is replaced.
        if tokio::fs::try_exists(local_path).await? {
            tokio::fs::remove_dir(local_path).await?;
        }
        tokio::fs::rename(&staging, local_path).await?;

        tracing::info!(downloaded, "model download complete");
        Ok(FetchOutcome::Downloaded(downloaded))
    }
}

/// `<local_path>.partial`, next to the final directory.
fn staging_dir(local_path: &Path) -> Result<PathBuf, FetchError> {
    let Some(name) = local_path.file_name() else {
        return Err(FetchError::UnsafePath(local_path.display().to_string()));
    };
    let mut staging = name.to_os_string();
    staging.push(".partial");
    Ok(local_path.with_file_name(staging))
}

async fn directory_has_entries(path: &Path) -> Result<bool, FetchError> {
    match tokio::fs::read_dir(path).await {
        Ok(mut entries) => Ok(entries.next_entry().await?.is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Where an object lands locally. `None` for directory placeholders.
fn local_target(local_path: &Path, prefix: &str, name: &str) -> Result<Option<PathBuf>, FetchError> {
    let relative = name
        .strip_prefix(prefix)
        .unwrap_or(name)
        .trim_start_matches('/');
    if relative.is_empty() || relative.ends_with('/') {
        return Ok(None);
    }

    let relative = Path::new(relative);
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(FetchError::UnsafePath(name.to_string()));
    }
    Ok(Some(local_path.join(relative)))
}
