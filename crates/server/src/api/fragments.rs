use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use bytes::Bytes;

use fragments_core::{FragmentId, FragmentMetadata};

use super::AppState;
use super::schemas::{FragmentListResponse, FragmentResponse, ListQuery, OkResponse};
use crate::auth::Owner;
use crate::error::ServerError;

/// The request's Content-Type, which must name a storable type.
fn content_type(headers: &HeaderMap) -> Result<String, ServerError> {
    let value = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServerError::UnsupportedMediaType("missing Content-Type".into()))?;

    if !FragmentMetadata::is_supported_type(value) {
        tracing::warn!(content_type = value, "rejected unsupported fragment type");
        return Err(ServerError::UnsupportedMediaType(format!(
            "unsupported fragment type: {value}"
        )));
    }
    Ok(value.to_owned())
}

/// Absolute URL of a fragment, based on the configured API URL or the
/// request's `Host` header. Falls back to a path when neither is known.
fn location(state: &AppState, headers: &HeaderMap, id: &FragmentId) -> String {
    let path = format!("/v1/fragments/{id}");
    if let Some(base) = state.api_url.as_deref() {
        return format!("{}{path}", base.trim_end_matches('/'));
    }
    match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("http://{host}{path}"),
        None => path,
    }
}

/// Split `{id}.{ext}` into its parts. Generated ids never contain a dot.
fn split_extension(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('.') {
        Some((id, ext)) => (id, Some(ext)),
        None => (raw, None),
    }
}

/// `GET /v1/fragments`
pub async fn list_fragments(
    State(state): State<AppState>,
    Extension(Owner(owner_id)): Extension<Owner>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let fragments = state.registry.by_user(&owner_id, query.expand()).await?;
    Ok(Json(FragmentListResponse {
        status: "ok",
        fragments,
    }))
}

/// `POST /v1/fragments`
pub async fn create_fragment(
    State(state): State<AppState>,
    Extension(Owner(owner_id)): Extension<Owner>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let content_type = content_type(&headers)?;
    let body = body?;

    let fragment = state
        .registry
        .create(&owner_id, &content_type, body)
        .await?;
    let location = location(&state, &headers, fragment.id());

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(FragmentResponse::ok(fragment.into_metadata())),
    ))
}

/// `GET /v1/fragments/{id}` and `GET /v1/fragments/{id}.{ext}`
pub async fn get_fragment(
    State(state): State<AppState>,
    Extension(Owner(owner_id)): Extension<Owner>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let (id, extension) = split_extension(&raw);
    let fragment = state.registry.load(&owner_id, &FragmentId::from(id)).await?;

    let (content_type, data) = match extension {
        None => (
            fragment.metadata().fragment_type.clone(),
            fragment.get_data().await?,
        ),
        Some(ext) => {
            let converted = fragment.get_converted_into(ext).await?;
            (converted.content_type, converted.data)
        }
    };

    Ok(([(header::CONTENT_TYPE, content_type)], data))
}

/// `GET /v1/fragments/{id}/info`
pub async fn get_fragment_info(
    State(state): State<AppState>,
    Extension(Owner(owner_id)): Extension<Owner>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let metadata = state.registry.by_id(&owner_id, &FragmentId::from(id)).await?;
    Ok(Json(FragmentResponse::ok(metadata)))
}

/// `PUT /v1/fragments/{id}`
pub async fn update_fragment(
    State(state): State<AppState>,
    Extension(Owner(owner_id)): Extension<Owner>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let content_type = content_type(&headers)?;
    let body = body?;

    let fragment = state
        .registry
        .update(&owner_id, &FragmentId::from(id), &content_type, body)
        .await?;
    Ok(Json(FragmentResponse::ok(fragment.into_metadata())))
}

/// `DELETE /v1/fragments/{id}`
pub async fn delete_fragment(
    State(state): State<AppState>,
    Extension(Owner(owner_id)): Extension<Owner>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    state.registry.delete(&owner_id, &FragmentId::from(id)).await?;
    Ok(Json(OkResponse { status: "ok" }))
}
