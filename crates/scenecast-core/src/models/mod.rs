//! Data model for composition requests and derived plans.

pub mod plan;
pub mod project;

pub use plan::{ClipSource, ClipSpec, CompositionPlan};
pub use project::{MediaKind, Project, RenderSettings, Scene};
