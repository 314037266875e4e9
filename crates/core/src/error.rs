use thiserror::Error;

/// Errors surfaced by fragment operations to their callers.
///
/// Backend-specific detail never crosses this boundary: storage failures are
/// logged where they happen and reported as [`FragmentError::Storage`].
#[derive(Debug, Error)]
pub enum FragmentError {
    /// Construction-time validation failed (missing owner or type, unsupported type).
    #[error("validation error: {0}")]
    Validation(String),

    /// No fragment with this id exists for the owner.
    #[error("fragment not found: {id}")]
    NotFound { owner_id: String, id: String },

    /// The requested representation is not reachable from the fragment's type.
    #[error("unsupported conversion from {from} to {to}")]
    UnsupportedConversion { from: String, to: String },

    /// The uploaded bytes do not match their declared type.
    #[error("content does not match declared type: {0}")]
    ContentMismatch(String),

    /// An update tried to change a fragment's type.
    #[error("cannot change fragment type from {current} to {requested}")]
    TypeChanged { current: String, requested: String },

    /// The payload exceeds the accepted size ceiling.
    #[error("payload too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// A reachable conversion failed on the stored bytes.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// The storage backend rejected or failed an operation.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl FragmentError {
    /// Build a [`FragmentError::NotFound`] for an owner and id.
    pub fn not_found(owner_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            owner_id: owner_id.into(),
            id: id.into(),
        }
    }
}
