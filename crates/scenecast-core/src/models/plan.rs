//! Resolved clips and the composition plan handed to the render driver.

use std::path::{Path, PathBuf};

use crate::error::ComposeError;
use crate::models::project::RenderSettings;

/// How a resolved clip produces frames for its timeline slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipSource {
    /// Hold a still image for the clip's whole duration.
    Still,
    /// Play `[source_start, source_end)` from the file, then hold the last
    /// frame for `freeze_tail` seconds to fill the remaining slot.
    Video {
        source_start: f64,
        source_end: f64,
        freeze_tail: f64,
    },
}

/// One positioned, duration-correct clip. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSpec {
    pub path: PathBuf,
    /// Total timeline seconds this clip occupies.
    pub duration: f64,
    pub source: ClipSource,
}

impl ClipSpec {
    pub fn still(path: PathBuf, duration: f64) -> Self {
        ClipSpec {
            path,
            duration,
            source: ClipSource::Still,
        }
    }

    pub fn video(path: PathBuf, source_start: f64, source_end: f64, freeze_tail: f64) -> Self {
        ClipSpec {
            path,
            duration: (source_end - source_start) + freeze_tail,
            source: ClipSource::Video {
                source_start,
                source_end,
                freeze_tail,
            },
        }
    }
}

/// The ordered clip sequence plus audio assignment: the sole input to the
/// render driver. Built once per request; clips are laid back-to-back in
/// array order, which is the final placement authority. The audio track,
/// when present, spans the whole composed duration: truncated if longer,
/// trailing silence if shorter, never looped.
#[derive(Debug, Clone)]
pub struct CompositionPlan {
    clips: Vec<ClipSpec>,
    audio: Option<PathBuf>,
    total_duration: f64,
    settings: RenderSettings,
}

impl CompositionPlan {
    /// Assemble the plan from resolved clips, in input order.
    pub fn assemble(
        clips: Vec<ClipSpec>,
        audio: Option<PathBuf>,
        settings: RenderSettings,
    ) -> Result<CompositionPlan, ComposeError> {
        if clips.is_empty() {
            return Err(ComposeError::Validation(
                "Composition plan requires at least one clip".to_string(),
            ));
        }

        let total_duration = clips.iter().map(|c| c.duration).sum();

        Ok(CompositionPlan {
            clips,
            audio,
            total_duration,
            settings,
        })
    }

    pub fn clips(&self) -> &[ClipSpec] {
        &self.clips
    }

    pub fn audio(&self) -> Option<&Path> {
        self.audio.as_deref()
    }

    /// Total composed duration in seconds: the sum of every clip's played
    /// duration. The output is clamped to exactly this length.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn settings(&self) -> RenderSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_clip_duration_includes_freeze_tail() {
        let clip = ClipSpec::video(PathBuf::from("/tmp/a.mp4"), 0.0, 6.0, 4.0);
        assert!((clip.duration - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_duration_is_sum_of_clip_durations() {
        let plan = CompositionPlan::assemble(
            vec![
                ClipSpec::still(PathBuf::from("/tmp/a.jpg"), 3.0),
                ClipSpec::video(PathBuf::from("/tmp/b.mp4"), 1.0, 5.0, 0.0),
                ClipSpec::video(PathBuf::from("/tmp/c.mp4"), 0.0, 2.5, 1.5),
            ],
            None,
            RenderSettings::default(),
        )
        .expect("plan");
        assert!((plan.total_duration() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_order_is_preserved() {
        let clips = vec![
            ClipSpec::still(PathBuf::from("/tmp/first.jpg"), 1.0),
            ClipSpec::still(PathBuf::from("/tmp/second.jpg"), 1.0),
            ClipSpec::still(PathBuf::from("/tmp/third.jpg"), 1.0),
        ];
        let plan =
            CompositionPlan::assemble(clips.clone(), None, RenderSettings::default()).expect("plan");
        assert_eq!(plan.clips(), clips.as_slice());
    }

    #[test]
    fn test_empty_plan_is_rejected() {
        let err =
            CompositionPlan::assemble(vec![], None, RenderSettings::default()).unwrap_err();
        assert!(matches!(err, ComposeError::Validation(_)));
    }
}
