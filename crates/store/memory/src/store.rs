use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use fragments_core::{FragmentId, FragmentList, FragmentMetadata, OwnerId};
use fragments_store::{FragmentStore, StoreError};

/// Metadata and payload for one fragment. Either half may be missing while a
/// write is in flight.
#[derive(Debug, Clone, Default)]
struct Entry {
    metadata: Option<FragmentMetadata>,
    data: Option<Bytes>,
}

/// In-memory [`FragmentStore`] backed by a [`DashMap`] of per-owner maps.
///
/// Contents live for the process lifetime only. Each owner's fragments sit
/// in a `BTreeMap` so listings come back ordered by id, and every mutation
/// happens under that owner's shard lock.
#[derive(Debug, Default)]
pub struct MemoryFragmentStore {
    owners: DashMap<OwnerId, BTreeMap<FragmentId, Entry>>,
}

impl MemoryFragmentStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fragments with a metadata record, across all owners.
    pub fn len(&self) -> usize {
        self.owners
            .iter()
            .map(|owner| owner.values().filter(|e| e.metadata.is_some()).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FragmentStore for MemoryFragmentStore {
    async fn write_fragment(&self, metadata: &FragmentMetadata) -> Result<(), StoreError> {
        self.owners
            .entry(metadata.owner_id.clone())
            .or_default()
            .entry(metadata.id.clone())
            .or_default()
            .metadata = Some(metadata.clone());
        Ok(())
    }

    async fn read_fragment(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
    ) -> Result<Option<FragmentMetadata>, StoreError> {
        Ok(self
            .owners
            .get(owner_id)
            .and_then(|fragments| fragments.get(id).and_then(|e| e.metadata.clone())))
    }

    async fn write_fragment_data(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
        _content_type: &str,
        data: Bytes,
    ) -> Result<(), StoreError> {
        self.owners
            .entry(owner_id.clone())
            .or_default()
            .entry(id.clone())
            .or_default()
            .data = Some(data);
        Ok(())
    }

    async fn read_fragment_data(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
    ) -> Result<Option<Bytes>, StoreError> {
        Ok(self
            .owners
            .get(owner_id)
            .and_then(|fragments| fragments.get(id).and_then(|e| e.data.clone())))
    }

    async fn list_fragments(
        &self,
        owner_id: &OwnerId,
        expand: bool,
    ) -> Result<FragmentList, StoreError> {
        let Some(fragments) = self.owners.get(owner_id) else {
            return Ok(FragmentList::empty(expand));
        };
        let records = fragments.values().filter_map(|e| e.metadata.as_ref());
        Ok(if expand {
            FragmentList::Expanded(records.cloned().collect())
        } else {
            FragmentList::Ids(records.map(|m| m.id.clone()).collect())
        })
    }

    async fn delete_fragment(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
    ) -> Result<(), StoreError> {
        // A payload without metadata is not a fragment; leave it in place.
        let removed = match self.owners.get_mut(owner_id) {
            Some(mut fragments) if fragments.get(id).is_some_and(|e| e.metadata.is_some()) => {
                fragments.remove(id).is_some()
            }
            _ => false,
        };
        if !removed {
            return Err(StoreError::NotFound(format!("{owner_id}/{id}")));
        }
        // Drop the owner map once it is empty so idle owners cost nothing.
        self.owners
            .remove_if(owner_id, |_, fragments| fragments.is_empty());
        tracing::debug!(owner_id = %owner_id, id = %id, "fragment removed from memory");
        Ok(())
    }
}
