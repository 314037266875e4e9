use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use fragments_core::FragmentError;

/// Errors that can occur when running the fragments server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener or reading a password file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A fragment operation failed.
    #[error(transparent)]
    Fragment(#[from] FragmentError),

    /// Authentication failed (missing or invalid credentials).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The request body's Content-Type is missing or not storable.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The request body could not be read (e.g. it exceeds the body limit).
    #[error("{}", .0.body_text())]
    Body(#[from] BytesRejection),

    /// No route matches the request.
    #[error("not found")]
    NotFound,
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Body(rejection) => rejection.status(),
            Self::Fragment(e) => match e {
                FragmentError::Validation(_) | FragmentError::TypeChanged { .. } => {
                    StatusCode::BAD_REQUEST
                }
                FragmentError::NotFound { .. } => StatusCode::NOT_FOUND,
                FragmentError::UnsupportedConversion { .. } | FragmentError::ContentMismatch(_) => {
                    StatusCode::UNSUPPORTED_MEDIA_TYPE
                }
                FragmentError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                FragmentError::Conversion(_)
                | FragmentError::Storage(_)
                | FragmentError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

/// The JSON body every failed request carries.
pub fn error_body(status: StatusCode, message: &str) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "error",
        "error": {
            "code": status.as_u16(),
            "message": message,
        }
    }))
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "error processing request");
        }
        (status, error_body(status, &self.to_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_errors_map_to_status_codes() {
        let cases = [
            (FragmentError::Validation("x".into()), 400),
            (
                FragmentError::TypeChanged {
                    current: "text/plain".into(),
                    requested: "text/html".into(),
                },
                400,
            ),
            (FragmentError::not_found("o", "i"), 404),
            (
                FragmentError::UnsupportedConversion {
                    from: "text/csv".into(),
                    to: "image/png".into(),
                },
                415,
            ),
            (FragmentError::ContentMismatch("bad".into()), 415),
            (FragmentError::TooLarge { size: 2, limit: 1 }, 413),
            (FragmentError::Conversion("x".into()), 500),
            (FragmentError::Storage("x".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(ServerError::from(err).status().as_u16(), code);
        }
    }

    #[test]
    fn server_errors_map_to_status_codes() {
        assert_eq!(
            ServerError::Unauthorized("no".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServerError::UnsupportedMediaType("x".into()).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(ServerError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServerError::Config("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn body_shape() {
        let body = error_body(StatusCode::NOT_FOUND, "not found");
        assert_eq!(
            body.0,
            serde_json::json!({"status": "error", "error": {"code": 404, "message": "not found"}})
        );
    }
}
