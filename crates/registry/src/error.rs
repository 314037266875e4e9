use fragments_core::{FragmentError, FragmentId, OwnerId};
use fragments_store::StoreError;

/// Log a backend failure with its context and reduce it to the caller-facing
/// error. Backend detail stays in the log.
pub(crate) fn storage_error(
    op: &'static str,
    owner_id: &OwnerId,
    id: Option<&FragmentId>,
    err: StoreError,
) -> FragmentError {
    let id_str = id.map_or("", |id| id.as_str());
    match err {
        StoreError::NotFound(_) => FragmentError::not_found(owner_id.as_str(), id_str),
        StoreError::TooLarge { size, limit } => {
            tracing::warn!(op, owner_id = %owner_id, id = id_str, size, limit, "stored payload over limit");
            FragmentError::TooLarge { size, limit }
        }
        err => {
            tracing::error!(op, owner_id = %owner_id, id = id_str, error = %err, "storage backend failed");
            FragmentError::Storage(format!("{op} failed"))
        }
    }
}
