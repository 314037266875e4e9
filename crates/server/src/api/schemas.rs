use serde::{Deserialize, Serialize};

use fragments_core::{FragmentList, FragmentMetadata};

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub author: &'static str,
    pub github_url: &'static str,
    pub version: &'static str,
}

/// Body of `GET /v1/fragments`.
#[derive(Debug, Serialize)]
pub struct FragmentListResponse {
    pub status: &'static str,
    /// Ids, or full records when `expand=1`.
    pub fragments: FragmentList,
}

/// Body carrying a single fragment's metadata.
#[derive(Debug, Serialize)]
pub struct FragmentResponse {
    pub status: &'static str,
    pub fragment: FragmentMetadata,
}

impl FragmentResponse {
    pub fn ok(fragment: FragmentMetadata) -> Self {
        Self {
            status: "ok",
            fragment,
        }
    }
}

/// A success body with nothing else to say.
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub status: &'static str,
}

/// Query parameters for listing fragments.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// `1` or `true` to return full records instead of ids.
    pub expand: Option<String>,
}

impl ListQuery {
    pub fn expand(&self) -> bool {
        matches!(self.expand.as_deref(), Some("1" | "true"))
    }
}
