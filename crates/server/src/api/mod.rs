pub mod fragments;
pub mod health;
pub mod schemas;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use fragments_registry::FragmentRegistry;

use crate::auth::AuthProvider;
use crate::auth::middleware::AuthLayer;
use crate::error::ServerError;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: FragmentRegistry,
    /// Credential checking; `None` when authentication is disabled.
    pub auth: Option<Arc<AuthProvider>>,
    /// Public base URL for `Location` headers.
    pub api_url: Option<Arc<str>>,
}

/// Build the Axum router with all API routes and middleware.
pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.registry.max_payload_bytes()).unwrap_or(usize::MAX);

    let public = Router::new().route("/", get(health::health));

    let protected = Router::new()
        .route(
            "/v1/fragments",
            get(fragments::list_fragments).post(fragments::create_fragment),
        )
        .route(
            "/v1/fragments/{id}",
            get(fragments::get_fragment)
                .put(fragments::update_fragment)
                .delete(fragments::delete_fragment),
        )
        .route("/v1/fragments/{id}/info", get(fragments::get_fragment_info))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(AuthLayer::new(state.auth.clone()));

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn not_found() -> ServerError {
    ServerError::NotFound
}
