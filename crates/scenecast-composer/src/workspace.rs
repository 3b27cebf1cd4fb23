//! Scoped temporary workspace for one composition request.
//!
//! Every request gets its own directory; removal is guaranteed on every
//! exit path because the directory is deleted on drop, including when the
//! request future is cancelled by the deadline. The success path calls
//! `close()` to surface removal errors instead of swallowing them.

use std::path::{Path, PathBuf};

use scenecast_core::ComposeError;
use tempfile::TempDir;

pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh, exclusively-owned temporary directory.
    pub fn create() -> Result<Workspace, ComposeError> {
        let dir = TempDir::with_prefix("scenecast-")
            .map_err(|e| ComposeError::Workspace(format!("Failed to create temp directory: {e}")))?;
        tracing::debug!(path = %dir.path().display(), "Workspace created");
        Ok(Workspace { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a fetched asset, keyed by its position in the distinct URL
    /// set so concurrent downloads never collide.
    pub fn asset_path(&self, index: usize, extension: &str) -> PathBuf {
        let ext = extension.trim_start_matches('.');
        if ext.is_empty() {
            self.dir.path().join(format!("asset_{index}"))
        } else {
            self.dir.path().join(format!("asset_{index}.{ext}"))
        }
    }

    /// Destination for the rendered artifact.
    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join("output.mp4")
    }

    /// Remove the directory, surfacing failures. Dropping the workspace
    /// removes it too; this exists so the success path can report cleanup
    /// problems instead of logging them silently.
    pub fn close(self) -> Result<(), ComposeError> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| ComposeError::Workspace(format!("Failed to remove {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_removes_directory() {
        let workspace = Workspace::create().expect("workspace");
        let path = workspace.path().to_path_buf();
        assert!(path.is_dir());

        workspace.close().expect("close");
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory_with_contents() {
        let path = {
            let workspace = Workspace::create().expect("workspace");
            std::fs::write(workspace.asset_path(0, "mp4"), b"partial download").expect("write");
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_asset_paths_are_distinct_and_extension_aware() {
        let workspace = Workspace::create().expect("workspace");
        let a = workspace.asset_path(0, "mp4");
        let b = workspace.asset_path(1, ".jpg");
        let c = workspace.asset_path(2, "");
        assert_ne!(a, b);
        assert!(a.to_string_lossy().ends_with("asset_0.mp4"));
        assert!(b.to_string_lossy().ends_with("asset_1.jpg"));
        assert!(c.to_string_lossy().ends_with("asset_2"));
    }
}
