//! Core types for the scenecast composition service.
//!
//! This crate holds the configuration, the error taxonomy, and the data
//! model shared by the composer pipeline and the HTTP surface. It has no
//! IO of its own: parsing and validation here are pure.

pub mod config;
pub mod error;
pub mod models;

pub use config::ComposerConfig;
pub use error::{ComposeError, ErrorMetadata, LogLevel};
