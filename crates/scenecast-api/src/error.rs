//! HTTP error response conversion
//!
//! **Preferred handler pattern:** return `Result<impl IntoResponse,
//! HttpComposeError>` and let `ComposeError` values convert with `?`, so
//! every failure renders consistently (status, `{"detail": ...}` body,
//! logging at the variant's level).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scenecast_core::{ComposeError, ErrorMetadata, LogLevel};

/// Wrapper type for ComposeError to implement IntoResponse.
/// Necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for ComposeError (external type from
/// scenecast-core).
#[derive(Debug)]
pub struct HttpComposeError(pub ComposeError);

impl From<ComposeError> for HttpComposeError {
    fn from(err: ComposeError) -> Self {
        HttpComposeError(err)
    }
}

fn log_error(error: &ComposeError) {
    let stage = error.stage();
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, stage, code, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, stage, code, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, stage, code, "Request failed");
        }
    }
}

impl IntoResponse for HttpComposeError {
    fn into_response(self) -> Response {
        let error = &self.0;

        log_error(error);

        let status = StatusCode::from_u16(error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({ "detail": error.client_message() }));

        (status, body).into_response()
    }
}
