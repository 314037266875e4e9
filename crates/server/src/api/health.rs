use axum::Json;
use axum::http::header;
use axum::response::IntoResponse;

use super::schemas::HealthResponse;

/// `GET /` -- liveness plus build information. Never cached.
pub async fn health() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-cache")],
        Json(HealthResponse {
            status: "ok",
            author: env!("CARGO_PKG_AUTHORS"),
            github_url: env!("CARGO_PKG_REPOSITORY"),
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
