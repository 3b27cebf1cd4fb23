//! Media probing: intrinsic duration and stream layout of fetched assets.
//!
//! Probing shells out to an external probe binary with JSON output. The
//! backend is picked once at startup by capability detection in a fixed
//! priority order (ffprobe, then avprobe) and dispatched through a tagged
//! variant, so the selection is deterministic and visible in logs.

use std::path::Path;
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// What the probe reports about one local media file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub duration_seconds: f64,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Duration/stream probing capability.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;
}

/// Validate that a binary path doesn't contain shell metacharacters or
/// traversal sequences before it is ever executed.
pub(crate) fn validate_binary_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Binary path contains dangerous characters: {}", path));
    }
    if path.contains("..") {
        return Err(anyhow!("Binary path contains directory traversal: {}", path));
    }
    Ok(())
}

pub struct FfprobeProber {
    ffprobe_path: String,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: String) -> Result<Self> {
        validate_binary_path(&ffprobe_path).context("Invalid ffprobe path")?;
        Ok(FfprobeProber { ffprobe_path })
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    #[tracing::instrument(skip(self), fields(probe_backend = "ffprobe"))]
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let probe_data: serde_json::Value =
            serde_json::from_slice(&output.stdout).context("Failed to parse ffprobe output")?;
        parse_probe_output(&probe_data)
    }
}

/// Interpret probe JSON (ffprobe and avprobe share this layout).
fn parse_probe_output(probe_data: &serde_json::Value) -> Result<MediaInfo> {
    let streams = probe_data["streams"]
        .as_array()
        .ok_or_else(|| anyhow!("No streams found in media file"))?;

    let has_video = streams
        .iter()
        .any(|s| s["codec_type"].as_str() == Some("video"));
    let has_audio = streams
        .iter()
        .any(|s| s["codec_type"].as_str() == Some("audio"));

    // Container duration is authoritative; fall back to the longest stream
    // duration when the container omits it.
    let duration_seconds = probe_data["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            streams
                .iter()
                .filter_map(|s| s["duration"].as_str().and_then(|d| d.parse::<f64>().ok()))
                .fold(None, |max: Option<f64>, d| {
                    Some(max.map_or(d, |m| m.max(d)))
                })
        })
        .ok_or_else(|| anyhow!("Could not determine media duration"))?;

    if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
        return Err(anyhow!("Invalid media duration: {}", duration_seconds));
    }

    Ok(MediaInfo {
        duration_seconds,
        has_video,
        has_audio,
    })
}

/// The resolved probe backend: a tagged variant rather than a boxed trait
/// object, so the chosen backend is explicit.
pub enum Prober {
    Ffprobe(FfprobeProber),
    Avprobe(AvprobeProber),
}

impl Prober {
    /// Capability-detect the available probe backend, in fixed priority
    /// order: the configured ffprobe first, then avprobe.
    pub async fn resolve(ffprobe_path: &str) -> Result<Prober> {
        if binary_available(ffprobe_path).await {
            tracing::info!(backend = "ffprobe", path = %ffprobe_path, "Probe backend selected");
            return Ok(Prober::Ffprobe(FfprobeProber::new(ffprobe_path.to_string())?));
        }
        if binary_available("avprobe").await {
            tracing::info!(backend = "avprobe", "Probe backend selected");
            return Ok(Prober::Avprobe(AvprobeProber::new("avprobe".to_string())?));
        }
        Err(anyhow!(
            "No media probe backend available (tried {}, avprobe)",
            ffprobe_path
        ))
    }
}

#[async_trait]
impl MediaProber for Prober {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        match self {
            Prober::Ffprobe(prober) => prober.probe(path).await,
            Prober::Avprobe(prober) => prober.probe(path).await,
        }
    }
}

/// avprobe (libav) fallback; same JSON surface as ffprobe.
pub struct AvprobeProber {
    avprobe_path: String,
}

impl AvprobeProber {
    pub fn new(avprobe_path: String) -> Result<Self> {
        validate_binary_path(&avprobe_path).context("Invalid avprobe path")?;
        Ok(AvprobeProber { avprobe_path })
    }
}

#[async_trait]
impl MediaProber for AvprobeProber {
    #[tracing::instrument(skip(self), fields(probe_backend = "avprobe"))]
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let output = Command::new(&self.avprobe_path)
            .args(["-v", "quiet", "-of", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to execute avprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "avprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let probe_data: serde_json::Value =
            serde_json::from_slice(&output.stdout).context("Failed to parse avprobe output")?;
        parse_probe_output(&probe_data)
    }
}

async fn binary_available(path: &str) -> bool {
    if validate_binary_path(path).is_err() {
        return false;
    }
    Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}
