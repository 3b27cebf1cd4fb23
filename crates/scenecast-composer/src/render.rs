//! Render driver: turn a composition plan into one ffmpeg invocation.
//!
//! Argument construction is a pure function of the plan so it can be tested
//! without an encoder installed. Every clip becomes one input; the filter
//! graph normalizes each to the output geometry and frame rate, applies the
//! freeze tail where the timeline asked for one, and concatenates. The
//! output is clamped to the plan's total duration, which also truncates an
//! audio track that runs long; a short track gets padded with silence.

use std::path::Path;
use std::process::Stdio;

use anyhow::Context;
use scenecast_core::models::{ClipSource, CompositionPlan};
use scenecast_core::ComposeError;
use tokio::process::Command;

use crate::probe::validate_binary_path;

const STDERR_EXCERPT_LEN: usize = 2000;

pub struct RenderDriver {
    ffmpeg_path: String,
}

impl RenderDriver {
    pub fn new(ffmpeg_path: String) -> Result<Self, ComposeError> {
        validate_binary_path(&ffmpeg_path)
            .context("Invalid ffmpeg path")
            .map_err(ComposeError::from)?;
        Ok(RenderDriver { ffmpeg_path })
    }

    /// Run the encode. The child is killed if this future is dropped, so a
    /// deadline wrapping this call never leaves an encoder running.
    #[tracing::instrument(skip_all, fields(
        clip_count = plan.clips().len(),
        total_duration = plan.total_duration(),
    ))]
    pub async fn render(&self, plan: &CompositionPlan, output: &Path) -> Result<(), ComposeError> {
        let args = build_args(plan, output);
        tracing::debug!(ffmpeg = %self.ffmpeg_path, args = ?args, "Starting encode");

        let result = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ComposeError::Internal(format!("Failed to execute ffmpeg: {e}")))?;

        if !result.status.success() {
            return Err(ComposeError::Render {
                exit_code: result.status.code(),
                stderr_excerpt: stderr_excerpt(&result.stderr),
            });
        }

        let metadata = tokio::fs::metadata(output).await.map_err(|_| {
            ComposeError::Render {
                exit_code: result.status.code(),
                stderr_excerpt: "encoder exited successfully but produced no output file"
                    .to_string(),
            }
        })?;
        if metadata.len() == 0 {
            return Err(ComposeError::Render {
                exit_code: result.status.code(),
                stderr_excerpt: "encoder produced an empty output file".to_string(),
            });
        }

        tracing::info!(bytes = metadata.len(), "Encode finished");
        Ok(())
    }
}

/// Full ffmpeg argument list for a plan. Input order matches clip order;
/// the audio track, when present, is always the last input.
pub fn build_args(plan: &CompositionPlan, output: &Path) -> Vec<String> {
    let settings = plan.settings();
    let clips = plan.clips();
    let mut args: Vec<String> = Vec::new();

    for clip in clips {
        match clip.source {
            ClipSource::Still => {
                args.extend([
                    "-loop".to_string(),
                    "1".to_string(),
                    "-t".to_string(),
                    fmt_secs(clip.duration),
                ]);
            }
            ClipSource::Video {
                source_start,
                source_end,
                ..
            } => {
                args.extend([
                    "-ss".to_string(),
                    fmt_secs(source_start),
                    "-t".to_string(),
                    fmt_secs(source_end - source_start),
                ]);
            }
        }
        args.push("-i".to_string());
        args.push(clip.path.to_string_lossy().into_owned());
    }

    let audio_input = plan.audio().map(|path| {
        let index = clips.len();
        args.push("-i".to_string());
        args.push(path.to_string_lossy().into_owned());
        index
    });

    let mut filter = String::new();
    for (i, clip) in clips.iter().enumerate() {
        filter.push_str(&format!(
            "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps}",
            w = settings.width,
            h = settings.height,
            fps = settings.fps,
        ));
        if let ClipSource::Video { freeze_tail, .. } = clip.source {
            if freeze_tail > 0.0 {
                filter.push_str(&format!(
                    ",tpad=stop_mode=clone:stop_duration={}",
                    fmt_secs(freeze_tail)
                ));
            }
        }
        filter.push_str(&format!("[v{i}];"));
    }
    for i in 0..clips.len() {
        filter.push_str(&format!("[v{i}]"));
    }
    filter.push_str(&format!("concat=n={}:v=1:a=0[vout]", clips.len()));

    if let Some(index) = audio_input {
        // apad covers a short track with trailing silence; the output -t
        // cuts a long one. The track is never looped.
        filter.push_str(&format!(";[{index}:a]apad[aout]"));
    }

    args.push("-filter_complex".to_string());
    args.push(filter);
    args.extend(["-map".to_string(), "[vout]".to_string()]);
    if audio_input.is_some() {
        args.extend([
            "-map".to_string(),
            "[aout]".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "192k".to_string(),
        ]);
    }

    args.extend([
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "medium".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-t".to_string(),
        fmt_secs(plan.total_duration()),
        "-y".to_string(),
        output.to_string_lossy().into_owned(),
    ]);

    args
}

/// Seconds with millisecond precision, the resolution timing hints carry.
fn fmt_secs(seconds: f64) -> String {
    format!("{seconds:.3}")
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim_end();
    match trimmed.char_indices().nth_back(STDERR_EXCERPT_LEN - 1) {
        Some((start, _)) if start > 0 => format!("...{}", &trimmed[start..]),
        _ => trimmed.to_string(),
    }
}
