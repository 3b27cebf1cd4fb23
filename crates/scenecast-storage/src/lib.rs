//! Upload collaborator for finished composition artifacts.
//!
//! The composer hands its output file to a `Storage` backend when the
//! caller asks for a hosted URL instead of the raw bytes. Backends are
//! interchangeable: local filesystem for development, S3 (or any
//! S3-compatible endpoint) in production.
//!
//! Keys are flat: `compositions/{uuid}.mp4`.

mod factory;
#[cfg(feature = "storage-local")]
mod local;
#[cfg(feature = "storage-s3")]
mod s3;
mod traits;

pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
