//! Error types module
//!
//! Every failure in the composition pipeline is represented by one
//! `ComposeError` variant. Each variant identifies the failing stage and
//! carries enough context (scene index, offending URL, encoder stderr) for
//! a structured client message; raw stack traces never leave the service.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for remote-asset and media problems
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// Allows errors to self-describe their HTTP response characteristics.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "FETCH_ERROR")
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Invalid project: {0}")]
    Validation(String),

    #[error("Failed to fetch {url}: {cause}")]
    Fetch { url: String, cause: String },

    #[error("Failed to build clip for scene {scene_index}: {cause}")]
    ClipBuild { scene_index: usize, cause: String },

    #[error("Render failed (exit code {exit_code:?}): {stderr_excerpt}")]
    Render {
        exit_code: Option<i32>,
        stderr_excerpt: String,
    },

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Composition timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ComposeError {
    fn from(err: anyhow::Error) -> Self {
        ComposeError::Internal(format!("{err:#}"))
    }
}

/// Static metadata per variant: (http_status, error_code, log_level).
fn static_metadata(err: &ComposeError) -> (u16, &'static str, LogLevel) {
    match err {
        ComposeError::Validation(_) => (400, "VALIDATION_ERROR", LogLevel::Debug),
        ComposeError::Fetch { .. } => (422, "FETCH_ERROR", LogLevel::Warn),
        ComposeError::ClipBuild { .. } => (422, "CLIP_BUILD_ERROR", LogLevel::Warn),
        ComposeError::Render { .. } => (500, "RENDER_ERROR", LogLevel::Error),
        ComposeError::Workspace(_) => (500, "WORKSPACE_ERROR", LogLevel::Error),
        ComposeError::Timeout { .. } => (504, "COMPOSE_TIMEOUT", LogLevel::Warn),
        ComposeError::Internal(_) => (500, "INTERNAL_ERROR", LogLevel::Error),
    }
}

impl ComposeError {
    /// Stage name for structured logging
    pub fn stage(&self) -> &'static str {
        match self {
            ComposeError::Validation(_) => "validation",
            ComposeError::Fetch { .. } => "fetch",
            ComposeError::ClipBuild { .. } => "timeline",
            ComposeError::Render { .. } => "render",
            ComposeError::Workspace(_) => "workspace",
            ComposeError::Timeout { .. } => "deadline",
            ComposeError::Internal(_) => "internal",
        }
    }
}

impl ErrorMetadata for ComposeError {
    fn http_status_code(&self) -> u16 {
        static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            // Internal details (stderr dumps, IO errors) stay out of the
            // client message; everything else is already user-addressed.
            ComposeError::Render { exit_code, .. } => match exit_code {
                Some(code) => format!("Video rendering failed (encoder exit code {code})"),
                None => "Video rendering failed".to_string(),
            },
            ComposeError::Workspace(_) => "Failed to allocate temporary storage".to_string(),
            ComposeError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}
