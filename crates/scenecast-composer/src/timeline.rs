//! Timeline builder: resolve fetched scenes into duration-correct clips.
//!
//! Scene `startTime`/`endTime` values are duration hints, not absolute
//! placement: each scene occupies `endTime - startTime` seconds and the
//! clips are laid back-to-back in array order. Still images hold for the
//! whole span. Videos play their (clamped) trim window; when the playable
//! footage is shorter than the span, the last frame is frozen to fill the
//! remainder rather than looping the source.

use std::collections::HashMap;

use scenecast_core::models::{ClipSpec, MediaKind, Project, Scene};
use scenecast_core::ComposeError;

use crate::fetcher::FetchedAsset;
use crate::probe::MediaProber;

/// Freeze tails below this are noise from float subtraction, not intent.
const FREEZE_TAIL_EPSILON: f64 = 0.001;

pub struct TimelineBuilder<'a, P: MediaProber> {
    prober: &'a P,
}

impl<'a, P: MediaProber> TimelineBuilder<'a, P> {
    pub fn new(prober: &'a P) -> Self {
        TimelineBuilder { prober }
    }

    /// Resolve every scene into a clip, in scene order. Fetch completion
    /// order never matters here: assets are looked up by URL.
    #[tracing::instrument(skip_all, fields(scene_count = project.scenes.len()))]
    pub async fn build(
        &self,
        project: &Project,
        assets: &HashMap<String, FetchedAsset>,
    ) -> Result<Vec<ClipSpec>, ComposeError> {
        let mut clips = Vec::with_capacity(project.scenes.len());
        for (index, scene) in project.scenes.iter().enumerate() {
            let asset = assets.get(&scene.media_url).ok_or_else(|| {
                ComposeError::Internal(format!(
                    "No fetched asset for scene {index} ({})",
                    scene.media_url
                ))
            })?;
            clips.push(self.build_clip(index, scene, asset).await?);
        }
        Ok(clips)
    }

    async fn build_clip(
        &self,
        index: usize,
        scene: &Scene,
        asset: &FetchedAsset,
    ) -> Result<ClipSpec, ComposeError> {
        let clip_err = |cause: String| ComposeError::ClipBuild {
            scene_index: index,
            cause,
        };

        // Declared type wins; otherwise fall back to what the fetch saw in
        // the response headers and byte signature.
        let kind = scene
            .media_type
            .or(asset.sniffed_kind)
            .ok_or_else(|| {
                clip_err(format!(
                    "cannot classify media (content-type {})",
                    asset.content_type.as_deref().unwrap_or("unknown")
                ))
            })?;

        let span = scene.span();

        match kind {
            MediaKind::Image => {
                tracing::debug!(scene = index, span, "Resolved still clip");
                Ok(ClipSpec::still(asset.path.clone(), span))
            }
            MediaKind::Video => {
                let info = self
                    .prober
                    .probe(&asset.path)
                    .await
                    .map_err(|e| clip_err(format!("probe failed: {e:#}")))?;
                if !info.has_video {
                    return Err(clip_err("file has no video stream".to_string()));
                }

                let intrinsic = info.duration_seconds;
                let source_start = scene.trim_start.unwrap_or(0.0).clamp(0.0, intrinsic);
                let source_end = scene
                    .trim_end
                    .unwrap_or(intrinsic)
                    .clamp(source_start, intrinsic);

                let available = source_end - source_start;
                if available <= 0.0 {
                    return Err(clip_err(format!(
                        "trim window [{source_start}, {source_end}) leaves no footage \
                         (source is {intrinsic:.3}s)"
                    )));
                }

                let played = span.min(available);
                let mut freeze_tail = span - played;
                if freeze_tail < FREEZE_TAIL_EPSILON {
                    freeze_tail = 0.0;
                }

                tracing::debug!(
                    scene = index,
                    span,
                    played,
                    freeze_tail,
                    intrinsic,
                    "Resolved video clip"
                );
                Ok(ClipSpec::video(
                    asset.path.clone(),
                    source_start,
                    source_start + played,
                    freeze_tail,
                ))
            }
        }
    }
}
