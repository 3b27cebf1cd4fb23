//! Application wiring: state construction, routes, server startup.

pub mod routes;
pub mod server;

use std::sync::Arc;

use axum::Router;
use scenecast_composer::Composer;
use scenecast_core::ComposerConfig;

use crate::state::AppState;

/// Build application state and the router from configuration.
pub async fn initialize_app(
    config: ComposerConfig,
) -> Result<(Arc<AppState>, Router), anyhow::Error> {
    let composer = Composer::from_config(&config).await?;
    let storage = scenecast_storage::create_storage(&config).await?;
    if storage.is_none() {
        tracing::info!("No storage backend configured; compositions are returned inline only");
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        composer: Arc::new(composer),
        storage,
    });

    let router = routes::setup_routes(&config, state.clone())?;
    Ok((state, router))
}
