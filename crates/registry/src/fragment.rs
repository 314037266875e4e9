use std::sync::Arc;

use bytes::Bytes;

use fragments_core::{
    FragmentError, FragmentId, FragmentMetadata, MediaType, Negotiation, OwnerId, negotiate,
};
use fragments_store::FragmentStore;

use crate::error::storage_error;

/// A representation produced by [`Fragment::get_converted_into`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    /// Content-Type of `data`. For passthrough this is the stored type,
    /// parameters included.
    pub content_type: String,
    pub data: Bytes,
}

/// One stored fragment: its metadata plus a handle to the backend holding
/// its payload.
#[derive(Clone)]
pub struct Fragment {
    metadata: FragmentMetadata,
    store: Arc<dyn FragmentStore>,
    max_payload_bytes: u64,
}

impl std::fmt::Debug for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fragment")
            .field("metadata", &self.metadata)
            .field("max_payload_bytes", &self.max_payload_bytes)
            .finish_non_exhaustive()
    }
}

impl Fragment {
    pub(crate) fn new(
        metadata: FragmentMetadata,
        store: Arc<dyn FragmentStore>,
        max_payload_bytes: u64,
    ) -> Self {
        Self {
            metadata,
            store,
            max_payload_bytes,
        }
    }

    pub fn metadata(&self) -> &FragmentMetadata {
        &self.metadata
    }

    pub fn into_metadata(self) -> FragmentMetadata {
        self.metadata
    }

    pub fn id(&self) -> &FragmentId {
        &self.metadata.id
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.metadata.owner_id
    }

    /// Base media type, parameters stripped.
    pub fn mime_type(&self) -> String {
        self.metadata.mime_type()
    }

    pub fn is_text(&self) -> bool {
        self.metadata.is_text()
    }

    /// MIME types this fragment can be converted into.
    pub fn formats(&self) -> Vec<&'static str> {
        self.metadata.formats()
    }

    /// Refresh `updated` and upsert the metadata record.
    pub async fn save(&mut self) -> Result<(), FragmentError> {
        self.persist(self.metadata.clone()).await
    }

    /// Stamp and write `next`. `self` only takes it once the write succeeds.
    async fn persist(&mut self, mut next: FragmentMetadata) -> Result<(), FragmentError> {
        next.touch();
        self.store
            .write_fragment(&next)
            .await
            .map_err(|e| storage_error("save", &next.owner_id, Some(&next.id), e))?;
        self.metadata = next;
        Ok(())
    }

    /// Read the payload. Fails with [`FragmentError::NotFound`] if none is
    /// stored.
    pub async fn get_data(&self) -> Result<Bytes, FragmentError> {
        self.store
            .read_fragment_data(self.owner_id(), self.id())
            .await
            .map_err(|e| storage_error("get_data", self.owner_id(), Some(self.id()), e))?
            .ok_or_else(|| FragmentError::not_found(self.owner_id().as_str(), self.id().as_str()))
    }

    /// Replace the payload.
    ///
    /// Size and `updated` are recorded and the metadata is persisted before
    /// the bytes. A payload over the size ceiling is refused before anything
    /// is written.
    pub async fn set_data(&mut self, data: Bytes) -> Result<(), FragmentError> {
        let size = data.len() as u64;
        if size > self.max_payload_bytes {
            return Err(FragmentError::TooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }

        let mut next = self.metadata.clone();
        next.size = size;
        self.persist(next).await?;

        self.store
            .write_fragment_data(
                &self.metadata.owner_id,
                &self.metadata.id,
                &self.metadata.fragment_type,
                data,
            )
            .await
            .map_err(|e| storage_error("set_data", self.owner_id(), Some(self.id()), e))?;

        tracing::debug!(owner_id = %self.owner_id(), id = %self.id(), size, "payload stored");
        Ok(())
    }

    /// Produce the representation named by a file extension such as `.html`.
    ///
    /// The stored type's own extension returns the stored bytes unchanged.
    /// An unknown or unreachable extension fails with
    /// [`FragmentError::UnsupportedConversion`] before any data is read.
    pub async fn get_converted_into(&self, extension: &str) -> Result<Converted, FragmentError> {
        let source = self.metadata.media_type().ok_or_else(|| {
            FragmentError::UnsupportedConversion {
                from: self.metadata.mime_type(),
                to: format!(".{}", extension.trim_start_matches('.')),
            }
        })?;

        let target = match negotiate(source, extension)? {
            Negotiation::Passthrough => {
                return Ok(Converted {
                    content_type: self.metadata.fragment_type.clone(),
                    data: self.get_data().await?,
                });
            }
            Negotiation::Convert(target) => target,
        };

        let data = self.get_data().await?;
        let converted = if target.is_image() {
            tokio::task::spawn_blocking(move || fragments_convert::convert(&data, source, target))
                .await
                .map_err(|e| FragmentError::Conversion(format!("conversion task failed: {e}")))??
        } else {
            fragments_convert::convert(&data, source, target)?
        };

        tracing::debug!(
            owner_id = %self.owner_id(),
            id = %self.id(),
            from = %source,
            to = %target,
            "fragment converted"
        );
        Ok(Converted {
            content_type: content_type_for(target),
            data: converted,
        })
    }
}

/// Content-Type header value for converted output.
fn content_type_for(target: MediaType) -> String {
    if target.is_text() {
        format!("{target}; charset=utf-8")
    } else {
        target.to_string()
    }
}
