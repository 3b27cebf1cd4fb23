//! Composition endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scenecast_core::models::Project;
use scenecast_core::ComposeError;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::HttpComposeError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ComposeQuery {
    /// `?store=1` uploads the artifact instead of returning it inline.
    store: Option<String>,
}

impl ComposeQuery {
    fn wants_store(&self) -> bool {
        matches!(self.store.as_deref(), Some("1") | Some("true"))
    }
}

/// `POST /compose`: validate the project, run the pipeline, return the MP4
/// inline or (with `?store=1`) upload it and return its public URL.
#[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn compose(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ComposeQuery>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Response, HttpComposeError> {
    let project = Project::from_request(payload)?;
    tracing::info!(
        scene_count = project.scenes.len(),
        has_audio = project.audio_url.is_some(),
        store = query.wants_store(),
        "Composition request accepted"
    );

    let video = state.composer.compose(&project).await?;

    if query.wants_store() {
        let storage = state.storage.as_ref().ok_or_else(|| {
            ComposeError::Validation(
                "Storing compositions requires a configured storage backend".to_string(),
            )
        })?;
        let url = storage
            .upload("composition.mp4", "video/mp4", video)
            .await
            .map_err(|e| ComposeError::Internal(format!("Upload failed: {e}")))?;
        tracing::info!(url = %url, "Composition stored");
        return Ok(Json(serde_json::json!({ "url": url })).into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, "video/mp4"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"composition.mp4\"",
            ),
        ],
        video,
    )
        .into_response())
}
