//! Shared application state.

use std::sync::Arc;

use scenecast_composer::Composer;
use scenecast_core::ComposerConfig;
use scenecast_storage::Storage;

pub struct AppState {
    pub config: ComposerConfig,
    pub composer: Arc<Composer>,
    /// Upload collaborator for `?store=1`; `None` when no backend is
    /// configured, in which case compositions are only returned inline.
    pub storage: Option<Arc<dyn Storage>>,
}
