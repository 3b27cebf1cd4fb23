//! Project descriptor: parsing and validation of composition requests.
//!
//! `Project::from_request` turns the untyped JSON payload into a validated
//! `Project`. It accepts the payload shapes clients already send: scenes at
//! the top level or under a `project` key (object or JSON-encoded string),
//! media referenced as `mediaUrl`/`mediaType` or via a nested `mediaItem`,
//! and the audio track as `audioUrl` or under `song`. Validation is pure;
//! nothing here touches the network or the filesystem.

use serde::Deserialize;

use crate::error::ComposeError;

const DEFAULT_WIDTH: u32 = 1920;
const DEFAULT_HEIGHT: u32 = 1080;
const DEFAULT_FPS: u32 = 30;

/// Classification of a scene's media asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Parse a declared media type. Case-insensitive; anything other than
    /// the recognized values is rejected by the descriptor.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    /// Classify from an HTTP `Content-Type` value, if it names a media family.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        if essence.starts_with("image/") {
            Some(MediaKind::Image)
        } else if essence.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// Output geometry and frame rate, overridable per request via `config`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
        }
    }
}

/// One timeline segment: a media reference plus its duration window.
#[derive(Debug, Clone)]
pub struct Scene {
    pub media_url: String,
    pub media_type: Option<MediaKind>,
    pub start_time: f64,
    pub end_time: f64,
    pub trim_start: Option<f64>,
    pub trim_end: Option<f64>,
}

impl Scene {
    /// Timeline span requested for this scene, in seconds.
    pub fn span(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Validated composition request.
#[derive(Debug, Clone)]
pub struct Project {
    pub scenes: Vec<Scene>,
    pub audio_url: Option<String>,
    pub settings: RenderSettings,
}

// ----- Raw payload shapes -----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProject {
    #[serde(default)]
    scenes: Vec<RawScene>,
    audio_url: Option<String>,
    song: Option<RawSong>,
    config: Option<RawConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScene {
    media_url: Option<String>,
    media_type: Option<String>,
    media_item: Option<RawMediaItem>,
    start_time: Option<f64>,
    end_time: Option<f64>,
    trim_start: Option<f64>,
    trim_end: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawMediaItem {
    url: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSong {
    audio_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
}

impl Project {
    /// Parse and validate an untyped request payload.
    pub fn from_request(payload: serde_json::Value) -> Result<Project, ComposeError> {
        let body = extract_project_value(payload)?;

        let raw: RawProject = serde_json::from_value(body)
            .map_err(|e| ComposeError::Validation(format!("Malformed project payload: {e}")))?;

        if raw.scenes.is_empty() {
            return Err(ComposeError::Validation(
                "No scenes found in the request".to_string(),
            ));
        }

        let mut scenes = Vec::with_capacity(raw.scenes.len());
        for (index, raw_scene) in raw.scenes.into_iter().enumerate() {
            scenes.push(validate_scene(index, raw_scene)?);
        }

        let audio_url = raw
            .audio_url
            .or_else(|| raw.song.and_then(|s| s.audio_url))
            .filter(|url| !url.trim().is_empty());

        let settings = resolve_settings(raw.config)?;

        Ok(Project {
            scenes,
            audio_url,
            settings,
        })
    }

    /// Total timeline duration requested across all scenes, in seconds.
    pub fn requested_duration(&self) -> f64 {
        self.scenes.iter().map(Scene::span).sum()
    }
}

/// Locate the project object: top-level `scenes`, or under `project`
/// (as an object or a JSON-encoded string).
fn extract_project_value(payload: serde_json::Value) -> Result<serde_json::Value, ComposeError> {
    if payload.get("scenes").is_some() {
        return Ok(payload);
    }

    match payload.get("project") {
        Some(serde_json::Value::String(encoded)) => serde_json::from_str(encoded)
            .map_err(|e| ComposeError::Validation(format!("`project` is not valid JSON: {e}"))),
        Some(obj @ serde_json::Value::Object(_)) => Ok(obj.clone()),
        _ => Err(ComposeError::Validation(
            "No scenes found in the request".to_string(),
        )),
    }
}

fn validate_scene(index: usize, raw: RawScene) -> Result<Scene, ComposeError> {
    let declared_type = raw
        .media_type
        .or_else(|| raw.media_item.as_ref().and_then(|m| m.kind.clone()));

    let media_url = raw
        .media_url
        .or_else(|| raw.media_item.and_then(|m| m.url))
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| {
            ComposeError::Validation(format!("Scene {index} is missing mediaUrl"))
        })?;

    let media_type = match declared_type {
        Some(value) => Some(MediaKind::parse(&value).ok_or_else(|| {
            ComposeError::Validation(format!(
                "Scene {index} has unrecognized mediaType '{value}' (expected image or video)"
            ))
        })?),
        None => None,
    };

    let start_time = raw.start_time.unwrap_or(0.0);
    let end_time = raw.end_time.unwrap_or(0.0);

    if !start_time.is_finite() || !end_time.is_finite() || start_time < 0.0 {
        return Err(ComposeError::Validation(format!(
            "Scene {index} has invalid timing (start {start_time}, end {end_time})"
        )));
    }
    if end_time <= start_time {
        return Err(ComposeError::Validation(format!(
            "Scene {index} has invalid timing: startTime {start_time} must be less than endTime {end_time}"
        )));
    }

    if let Some(trim_start) = raw.trim_start {
        if !trim_start.is_finite() || trim_start < 0.0 {
            return Err(ComposeError::Validation(format!(
                "Scene {index} has invalid trimStart {trim_start}"
            )));
        }
    }
    if let (Some(trim_start), Some(trim_end)) = (raw.trim_start, raw.trim_end) {
        if trim_end <= trim_start {
            return Err(ComposeError::Validation(format!(
                "Scene {index} has invalid trim window [{trim_start}, {trim_end})"
            )));
        }
    }

    Ok(Scene {
        media_url,
        media_type,
        start_time,
        end_time,
        trim_start: raw.trim_start,
        trim_end: raw.trim_end,
    })
}

fn resolve_settings(config: Option<RawConfig>) -> Result<RenderSettings, ComposeError> {
    let defaults = RenderSettings::default();
    let config = match config {
        Some(c) => c,
        None => return Ok(defaults),
    };

    let settings = RenderSettings {
        width: config.width.unwrap_or(defaults.width),
        height: config.height.unwrap_or(defaults.height),
        fps: config.fps.unwrap_or(defaults.fps),
    };

    if settings.width == 0 || settings.height == 0 {
        return Err(ComposeError::Validation(format!(
            "Invalid output geometry {}x{}",
            settings.width, settings.height
        )));
    }
    if settings.fps == 0 || settings.fps > 120 {
        return Err(ComposeError::Validation(format!(
            "Invalid output fps {}",
            settings.fps
        )));
    }

    Ok(settings)
}
