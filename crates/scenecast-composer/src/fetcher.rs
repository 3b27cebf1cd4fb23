//! Asset fetcher: bounded-concurrency streaming downloads into the workspace.
//!
//! All distinct URLs referenced by a project (scene media deduplicated by
//! URL, plus the audio track) are fetched concurrently under a semaphore.
//! Any single failure fails the whole request: a timeline silently missing
//! a scene is worse than an error. The join set is fully drained before
//! returning so no download task can outlive the call and write into a
//! workspace that is being torn down.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use scenecast_core::models::{MediaKind, Project};
use scenecast_core::ComposeError;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::pipeline::Deadline;
use crate::workspace::Workspace;

const SNIFF_LEN: usize = 16;

/// A fetched media asset: local path plus the classification resolved from
/// server metadata and the inspected byte signature.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub path: PathBuf,
    pub content_type: Option<String>,
    pub sniffed_kind: Option<MediaKind>,
}

pub struct AssetFetcher {
    client: reqwest::Client,
    max_concurrent: usize,
}

impl AssetFetcher {
    pub fn new(
        max_concurrent: usize,
        connect_timeout: Duration,
        transfer_timeout: Duration,
    ) -> Result<Self, ComposeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(transfer_timeout)
            .build()
            .map_err(|e| ComposeError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(AssetFetcher {
            client,
            max_concurrent: max_concurrent.max(1),
        })
    }

    /// The distinct URL set of a project: scene media in first-seen order,
    /// then the audio track.
    pub fn distinct_urls(project: &Project) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for scene in &project.scenes {
            if !urls.contains(&scene.media_url) {
                urls.push(scene.media_url.clone());
            }
        }
        if let Some(audio_url) = &project.audio_url {
            if !urls.contains(audio_url) {
                urls.push(audio_url.clone());
            }
        }
        urls
    }

    /// Fetch every URL into the workspace. Completion order is irrelevant:
    /// results are keyed by URL, so downstream ordering depends only on
    /// scene order.
    #[tracing::instrument(skip_all, fields(url_count = urls.len()))]
    pub async fn fetch_all(
        &self,
        urls: &[String],
        workspace: &Workspace,
        deadline: &Deadline,
    ) -> Result<HashMap<String, FetchedAsset>, ComposeError> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks: JoinSet<Result<(String, FetchedAsset), ComposeError>> = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            let client = self.client.clone();
            let semaphore = semaphore.clone();
            let url = url.clone();
            let dest = workspace.asset_path(index, &extension_hint(&url));
            let deadline = *deadline;

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| ComposeError::Internal("Fetch pool closed".to_string()))?;

                match tokio::time::timeout_at(deadline.instant(), fetch_one(&client, &url, dest))
                    .await
                {
                    Ok(result) => result.map(|asset| (url, asset)),
                    Err(_) => Err(deadline.error()),
                }
            });
        }

        // Drain everything before returning, even after a failure: no task
        // may still be writing when the workspace is removed.
        let mut assets = HashMap::with_capacity(urls.len());
        let mut first_error: Option<ComposeError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok((url, asset))) => {
                    assets.insert(url, asset);
                }
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error =
                            Some(ComposeError::Internal(format!("Fetch task failed: {e}")));
                    }
                }
            }
        }

        match first_error {
            Some(error) => {
                tracing::warn!(error = %error, "Asset fetch failed, aborting request");
                Err(error)
            }
            None => {
                tracing::info!(fetched = assets.len(), "All assets fetched");
                Ok(assets)
            }
        }
    }
}

async fn fetch_one(
    client: &reqwest::Client,
    url: &str,
    dest: PathBuf,
) -> Result<FetchedAsset, ComposeError> {
    let fetch_err = |cause: String| ComposeError::Fetch {
        url: url.to_string(),
        cause,
    };

    let parsed = reqwest::Url::parse(url).map_err(|e| fetch_err(format!("invalid URL: {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(fetch_err("only HTTP and HTTPS URLs are allowed".to_string()));
    }

    tracing::debug!(url = %url, dest = %dest.display(), "Downloading asset");

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| fetch_err(e.to_string()))?;

    if !response.status().is_success() {
        return Err(fetch_err(format!("HTTP {}", response.status())));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|h| h.to_str().ok())
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_lowercase())
        .filter(|ct| !ct.is_empty());

    let mut file = tokio::fs::File::create(&dest)
        .await
        .map_err(|e| fetch_err(format!("cannot create {}: {e}", dest.display())))?;

    let mut head: Vec<u8> = Vec::with_capacity(SNIFF_LEN);
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| fetch_err(format!("transfer failed: {e}")))?;
        if head.len() < SNIFF_LEN {
            let take = (SNIFF_LEN - head.len()).min(chunk.len());
            head.extend_from_slice(&chunk[..take]);
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| fetch_err(format!("write failed: {e}")))?;
    }
    file.flush()
        .await
        .map_err(|e| fetch_err(format!("write failed: {e}")))?;

    if head.is_empty() {
        return Err(fetch_err("empty response body".to_string()));
    }

    let sniffed_kind = content_type
        .as_deref()
        .and_then(MediaKind::from_content_type)
        .or_else(|| sniff_media_kind(&head));

    Ok(FetchedAsset {
        path: dest,
        content_type,
        sniffed_kind,
    })
}

/// Classify common container signatures. Inconclusive headers return `None`
/// and the declared `mediaType` (or a later probe failure) decides.
fn sniff_media_kind(header: &[u8]) -> Option<MediaKind> {
    if header.len() >= 12 {
        if &header[4..8] == b"ftyp" {
            return Some(MediaKind::Video);
        }
        if header.starts_with(b"RIFF") {
            return match &header[8..12] {
                b"AVI " => Some(MediaKind::Video),
                b"WEBP" => Some(MediaKind::Image),
                _ => None,
            };
        }
    }
    if header.starts_with(b"\x1a\x45\xdf\xa3") || header.starts_with(b"OggS") {
        return Some(MediaKind::Video);
    }
    if header.starts_with(b"\xff\xd8\xff")
        || header.starts_with(b"\x89PNG")
        || header.starts_with(b"GIF8")
        || header.starts_with(b"BM")
    {
        return Some(MediaKind::Image);
    }
    None
}

/// Filename extension hint taken from the URL path, for friendlier
/// workspace filenames. Purely cosmetic; classification never trusts it.
fn extension_hint(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed.path_segments().and_then(|mut segments| {
                segments.next_back().and_then(|name| {
                    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
                })
            })
        })
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_default()
}
