//! Composition pipeline: fetch → probe → timeline → plan → render.
//!
//! One `Composer` serves many requests; each request gets its own
//! exclusively-owned workspace and bounded fetch pool, and runs under a
//! single deadline covering every suspension point (downloads, duration
//! probes, the final encode).

pub mod fetcher;
pub mod pipeline;
pub mod probe;
pub mod render;
pub mod timeline;
pub mod workspace;

pub use fetcher::{AssetFetcher, FetchedAsset};
pub use pipeline::{Composer, Deadline};
pub use probe::{FfprobeProber, MediaInfo, MediaProber, Prober};
pub use render::RenderDriver;
pub use timeline::TimelineBuilder;
pub use workspace::Workspace;
