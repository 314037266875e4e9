use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FragmentError;
use crate::media::{MediaType, base_type};
use crate::types::{FragmentId, OwnerId};

/// Current time truncated to millisecond precision, the resolution every
/// backend persists timestamps at.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Unvalidated attributes for constructing a fragment.
///
/// Every field is optional so that a missing owner or type surfaces as a
/// validation error from [`FragmentMetadata::new`] rather than a type error
/// at the call site.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFragment {
    pub id: Option<FragmentId>,
    pub owner_id: Option<OwnerId>,
    #[serde(rename = "type")]
    pub fragment_type: Option<String>,
    pub size: Option<i64>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl NewFragment {
    /// Start from the two required attributes.
    #[must_use]
    pub fn new(owner_id: impl Into<OwnerId>, fragment_type: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            fragment_type: Some(fragment_type.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<FragmentId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }
}

impl From<FragmentMetadata> for NewFragment {
    fn from(meta: FragmentMetadata) -> Self {
        Self {
            id: Some(meta.id),
            owner_id: Some(meta.owner_id),
            fragment_type: Some(meta.fragment_type),
            size: i64::try_from(meta.size).ok(),
            created: Some(meta.created),
            updated: Some(meta.updated),
        }
    }
}

/// The persisted metadata record of one fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentMetadata {
    /// Unique (per owner) fragment id.
    pub id: FragmentId,
    /// Hashed owner identity.
    pub owner_id: OwnerId,
    /// Full Content-Type, parameters included (e.g. `text/plain; charset=utf-8`).
    #[serde(rename = "type")]
    pub fragment_type: String,
    /// Byte length of the stored payload.
    pub size: u64,
    /// When the fragment was created.
    pub created: DateTime<Utc>,
    /// When the metadata or payload was last written.
    pub updated: DateTime<Utc>,
}

impl FragmentMetadata {
    /// Validate attributes and build a metadata record.
    ///
    /// Fails with [`FragmentError::Validation`] if the owner or type is
    /// missing, the size is negative, or the base type is unsupported.
    pub fn new(attrs: NewFragment) -> Result<Self, FragmentError> {
        let (Some(owner_id), Some(fragment_type)) = (attrs.owner_id, attrs.fragment_type) else {
            return Err(FragmentError::Validation(
                "ownerId and type must be defined".into(),
            ));
        };
        if owner_id.is_empty() || fragment_type.trim().is_empty() {
            return Err(FragmentError::Validation(
                "ownerId and type must be defined".into(),
            ));
        }

        let size = match attrs.size {
            None => 0,
            Some(n) => u64::try_from(n).map_err(|_| {
                FragmentError::Validation(format!("size must be a non-negative number, got {n}"))
            })?,
        };

        // Surfaces the unsupported-type validation error.
        fragment_type.parse::<MediaType>()?;

        let now = now();
        Ok(Self {
            id: attrs
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(FragmentId::generate),
            owner_id,
            fragment_type,
            size,
            created: attrs.created.unwrap_or(now),
            updated: attrs.updated.unwrap_or(now),
        })
    }

    /// Returns `true` if the base type of `value` is one we store.
    #[must_use]
    pub fn is_supported_type(value: &str) -> bool {
        MediaType::parse(value).is_some()
    }

    /// The base media type, parameters stripped: `text/html; charset=utf-8`
    /// becomes `text/html`.
    #[must_use]
    pub fn mime_type(&self) -> String {
        base_type(&self.fragment_type)
    }

    /// The parsed media type, or `None` for a record with an unsupported type.
    #[must_use]
    pub fn media_type(&self) -> Option<MediaType> {
        MediaType::parse(&self.fragment_type)
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        self.mime_type().starts_with("text/")
    }

    /// The MIME types this fragment can be converted into.
    #[must_use]
    pub fn formats(&self) -> Vec<&'static str> {
        self.media_type()
            .map(|t| t.reachable().iter().map(MediaType::as_str).collect())
            .unwrap_or_default()
    }

    /// Refresh the `updated` timestamp.
    pub fn touch(&mut self) {
        self.updated = now();
    }
}

/// Result of listing an owner's fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FragmentList {
    /// Ids only.
    Ids(Vec<FragmentId>),
    /// Full metadata records.
    Expanded(Vec<FragmentMetadata>),
}

impl FragmentList {
    /// An empty listing in the requested shape.
    #[must_use]
    pub fn empty(expand: bool) -> Self {
        if expand {
            Self::Expanded(Vec::new())
        } else {
            Self::Ids(Vec::new())
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Ids(ids) => ids.len(),
            Self::Expanded(records) => records.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The ids in this listing, regardless of its shape.
    #[must_use]
    pub fn ids(&self) -> Vec<&FragmentId> {
        match self {
            Self::Ids(ids) => ids.iter().collect(),
            Self::Expanded(records) => records.iter().map(|r| &r.id).collect(),
        }
    }
}
