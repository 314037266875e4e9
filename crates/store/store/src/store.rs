use async_trait::async_trait;
use bytes::Bytes;

use fragments_core::{FragmentId, FragmentList, FragmentMetadata, OwnerId};

use crate::error::StoreError;

/// Raw persistence for fragment metadata records and payloads.
///
/// Metadata and payload are stored separately and addressed by
/// `(owner_id, id)`. Implementations must be `Send + Sync` and safe for
/// concurrent access; concurrent writers of the same fragment are
/// last-write-wins.
#[async_trait]
pub trait FragmentStore: Send + Sync {
    /// Upsert a metadata record.
    async fn write_fragment(&self, metadata: &FragmentMetadata) -> Result<(), StoreError>;

    /// Read a metadata record. Returns `None` if not found.
    async fn read_fragment(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
    ) -> Result<Option<FragmentMetadata>, StoreError>;

    /// Overwrite the payload of a fragment.
    ///
    /// `content_type` is the fragment's full type, recorded alongside the
    /// bytes by backends that support it.
    async fn write_fragment_data(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), StoreError>;

    /// Read the payload of a fragment. Returns `None` if not found.
    async fn read_fragment_data(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
    ) -> Result<Option<Bytes>, StoreError>;

    /// List an owner's fragments, ordered by id: ids only, or full records
    /// when `expand` is set. An owner with no fragments yields an empty list.
    async fn list_fragments(
        &self,
        owner_id: &OwnerId,
        expand: bool,
    ) -> Result<FragmentList, StoreError>;

    /// Remove a fragment's metadata and payload.
    ///
    /// Fails with [`StoreError::NotFound`] if no metadata record exists.
    async fn delete_fragment(&self, owner_id: &OwnerId, id: &FragmentId)
    -> Result<(), StoreError>;

    /// Finish deletes that were interrupted after the record was marked.
    /// Returns the number of fragments removed.
    ///
    /// Backends whose deletes are atomic have nothing to do here.
    async fn sweep_pending_deletes(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}
