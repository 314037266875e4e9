use std::sync::Arc;

use bytes::Bytes;

use fragments_core::{
    DEFAULT_MAX_PAYLOAD_BYTES, FragmentError, FragmentId, FragmentList, FragmentMetadata,
    NewFragment, OwnerId, base_type,
};
use fragments_store::FragmentStore;

use crate::builder::FragmentRegistryBuilder;
use crate::error::storage_error;
use crate::fragment::Fragment;

/// Entry point for fragment operations against one storage backend.
///
/// Cheap to clone; clones share the backend.
#[derive(Clone)]
pub struct FragmentRegistry {
    store: Arc<dyn FragmentStore>,
    max_payload_bytes: u64,
}

impl std::fmt::Debug for FragmentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentRegistry")
            .field("max_payload_bytes", &self.max_payload_bytes)
            .finish_non_exhaustive()
    }
}

impl FragmentRegistry {
    /// Create a registry with the default payload ceiling.
    pub fn new(store: Arc<dyn FragmentStore>) -> Self {
        Self::with_limit(store, DEFAULT_MAX_PAYLOAD_BYTES)
    }

    pub(crate) fn with_limit(store: Arc<dyn FragmentStore>, max_payload_bytes: u64) -> Self {
        Self {
            store,
            max_payload_bytes,
        }
    }

    pub fn builder() -> FragmentRegistryBuilder {
        FragmentRegistryBuilder::new()
    }

    pub fn max_payload_bytes(&self) -> u64 {
        self.max_payload_bytes
    }

    /// Validate attributes and wrap them in an unsaved [`Fragment`].
    pub fn new_fragment(&self, attrs: NewFragment) -> Result<Fragment, FragmentError> {
        let metadata = FragmentMetadata::new(attrs)?;
        Ok(self.wrap(metadata))
    }

    fn wrap(&self, metadata: FragmentMetadata) -> Fragment {
        Fragment::new(metadata, Arc::clone(&self.store), self.max_payload_bytes)
    }

    /// List an owner's fragments: ids, or full records when `expand` is set.
    pub async fn by_user(
        &self,
        owner_id: &OwnerId,
        expand: bool,
    ) -> Result<FragmentList, FragmentError> {
        self.store
            .list_fragments(owner_id, expand)
            .await
            .map_err(|e| storage_error("by_user", owner_id, None, e))
    }

    /// Fetch one fragment's metadata.
    pub async fn by_id(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
    ) -> Result<FragmentMetadata, FragmentError> {
        if owner_id.is_empty() || id.is_empty() {
            return Err(FragmentError::not_found(owner_id.as_str(), id.as_str()));
        }
        self.store
            .read_fragment(owner_id, id)
            .await
            .map_err(|e| storage_error("by_id", owner_id, Some(id), e))?
            .ok_or_else(|| FragmentError::not_found(owner_id.as_str(), id.as_str()))
    }

    /// Fetch one fragment as an entity.
    pub async fn load(&self, owner_id: &OwnerId, id: &FragmentId) -> Result<Fragment, FragmentError> {
        let metadata = self.by_id(owner_id, id).await?;
        Ok(self.wrap(metadata))
    }

    /// Remove a fragment's metadata and payload.
    pub async fn delete(&self, owner_id: &OwnerId, id: &FragmentId) -> Result<(), FragmentError> {
        self.store
            .delete_fragment(owner_id, id)
            .await
            .map_err(|e| storage_error("delete", owner_id, Some(id), e))?;
        tracing::info!(owner_id = %owner_id, id = %id, "fragment deleted");
        Ok(())
    }

    /// Validate `data` against `content_type`, then store it as a new
    /// fragment. Nothing is written if validation fails.
    pub async fn create(
        &self,
        owner_id: &OwnerId,
        content_type: &str,
        data: Bytes,
    ) -> Result<Fragment, FragmentError> {
        self.check_size(&data)?;
        let mut fragment = self.new_fragment(NewFragment::new(owner_id.clone(), content_type))?;
        fragments_convert::validate(&data, content_type)?;

        fragment.save().await?;
        fragment.set_data(data).await?;
        tracing::info!(
            owner_id = %owner_id,
            id = %fragment.id(),
            content_type,
            size = fragment.metadata().size,
            "fragment created"
        );
        Ok(fragment)
    }

    /// Replace an existing fragment's payload. The Content-Type must name the
    /// same base type as the stored one; parameters may differ and the stored
    /// type is kept.
    pub async fn update(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
        content_type: &str,
        data: Bytes,
    ) -> Result<Fragment, FragmentError> {
        let mut fragment = self.load(owner_id, id).await?;
        if fragment.mime_type() != base_type(content_type) {
            return Err(FragmentError::TypeChanged {
                current: fragment.metadata().fragment_type.clone(),
                requested: content_type.to_owned(),
            });
        }
        self.check_size(&data)?;
        fragments_convert::validate(&data, content_type)?;

        fragment.set_data(data).await?;
        tracing::info!(
            owner_id = %owner_id,
            id = %id,
            size = fragment.metadata().size,
            "fragment updated"
        );
        Ok(fragment)
    }

    /// Finish deletes a crash interrupted. Returns how many were completed.
    pub async fn sweep_pending_deletes(&self) -> Result<usize, FragmentError> {
        self.store.sweep_pending_deletes().await.map_err(|e| {
            tracing::error!(error = %e, "sweep of pending deletes failed");
            FragmentError::Storage("sweep failed".into())
        })
    }

    fn check_size(&self, data: &Bytes) -> Result<(), FragmentError> {
        let size = data.len() as u64;
        if size > self.max_payload_bytes {
            return Err(FragmentError::TooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }
        Ok(())
    }
}
