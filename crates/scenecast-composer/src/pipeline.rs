//! The composition pipeline: one entry point per request.
//!
//! `Composer::compose` owns the whole lifecycle: workspace creation,
//! concurrent asset fetch, timeline resolution, plan assembly, the encode,
//! and workspace teardown. Every awaited phase runs under one shared
//! deadline; the child processes are killed on drop, so hitting the
//! deadline never strands an encoder or a half-written download.

use scenecast_core::models::{CompositionPlan, Project};
use scenecast_core::{ComposeError, ComposerConfig};
use std::time::Duration;

use crate::fetcher::AssetFetcher;
use crate::probe::Prober;
use crate::render::RenderDriver;
use crate::timeline::TimelineBuilder;
use crate::workspace::Workspace;

/// Absolute cutoff for one composition request. Copied into every fetch
/// task and checked before each pipeline phase, so all concurrent work
/// shares the same wall-clock budget.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: tokio::time::Instant,
    total_secs: u64,
}

impl Deadline {
    pub fn after_secs(secs: u64) -> Deadline {
        Deadline {
            at: tokio::time::Instant::now() + Duration::from_secs(secs),
            total_secs: secs,
        }
    }

    pub fn instant(&self) -> tokio::time::Instant {
        self.at
    }

    pub fn error(&self) -> ComposeError {
        ComposeError::Timeout {
            seconds: self.total_secs,
        }
    }
}

pub struct Composer {
    fetcher: AssetFetcher,
    prober: Prober,
    renderer: RenderDriver,
    compose_timeout_secs: u64,
}

impl Composer {
    /// Build the composer, resolving the probe backend up front so a
    /// missing binary fails at startup instead of on the first request.
    pub async fn from_config(config: &ComposerConfig) -> Result<Composer, ComposeError> {
        let fetcher = AssetFetcher::new(
            config.fetch_concurrency,
            Duration::from_secs(config.fetch_connect_timeout_secs),
            Duration::from_secs(config.fetch_timeout_secs),
        )?;
        let prober = Prober::resolve(&config.ffprobe_path).await?;
        let renderer = RenderDriver::new(config.ffmpeg_path.clone())?;

        Ok(Composer {
            fetcher,
            prober,
            renderer,
            compose_timeout_secs: config.compose_timeout_secs,
        })
    }

    /// Compose one project into MP4 bytes. The workspace is removed on
    /// every exit path; on success, removal failures are reported rather
    /// than swallowed.
    #[tracing::instrument(skip_all, fields(
        scene_count = project.scenes.len(),
        has_audio = project.audio_url.is_some(),
    ))]
    pub async fn compose(&self, project: &Project) -> Result<Vec<u8>, ComposeError> {
        let deadline = Deadline::after_secs(self.compose_timeout_secs);
        let workspace = Workspace::create()?;

        let result = self.run_pipeline(project, &workspace, &deadline).await;
        match result {
            Ok(bytes) => {
                workspace.close()?;
                tracing::info!(output_bytes = bytes.len(), "Composition finished");
                Ok(bytes)
            }
            Err(error) => {
                tracing::warn!(stage = error.stage(), error = %error, "Composition failed");
                if let Err(cleanup) = workspace.close() {
                    tracing::warn!(error = %cleanup, "Workspace cleanup failed");
                }
                Err(error)
            }
        }
    }

    async fn run_pipeline(
        &self,
        project: &Project,
        workspace: &Workspace,
        deadline: &Deadline,
    ) -> Result<Vec<u8>, ComposeError> {
        let urls = AssetFetcher::distinct_urls(project);
        let assets = self.fetcher.fetch_all(&urls, workspace, deadline).await?;

        let builder = TimelineBuilder::new(&self.prober);
        let clips =
            match tokio::time::timeout_at(deadline.instant(), builder.build(project, &assets))
                .await
            {
                Ok(result) => result?,
                Err(_) => return Err(deadline.error()),
            };

        let audio = project
            .audio_url
            .as_ref()
            .and_then(|url| assets.get(url))
            .map(|asset| asset.path.clone());

        let plan = CompositionPlan::assemble(clips, audio, project.settings)?;
        tracing::info!(
            clip_count = plan.clips().len(),
            total_duration = plan.total_duration(),
            "Composition plan assembled"
        );

        let output = workspace.output_path();
        match tokio::time::timeout_at(deadline.instant(), self.renderer.render(&plan, &output))
            .await
        {
            Ok(result) => result?,
            Err(_) => return Err(deadline.error()),
        }

        tokio::fs::read(&output)
            .await
            .map_err(|e| ComposeError::Internal(format!("Failed to read rendered output: {e}")))
    }
}
