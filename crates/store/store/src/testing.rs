use bytes::Bytes;

use fragments_core::{FragmentId, FragmentList, FragmentMetadata, NewFragment, OwnerId};

use crate::error::StoreError;
use crate::store::FragmentStore;

/// A fresh owner per test so suites can share a durable backend across runs.
fn test_owner() -> OwnerId {
    OwnerId::new(format!("conformance-{}", FragmentId::generate()))
}

fn record(owner: &OwnerId, id: &str, size: i64) -> Result<FragmentMetadata, StoreError> {
    FragmentMetadata::new(
        NewFragment::new(owner.clone(), "text/plain; charset=utf-8")
            .with_id(id)
            .with_size(size),
    )
    .map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Run the full fragment store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if a store operation fails unexpectedly. Assertion
/// failures panic.
pub async fn run_store_conformance_tests(store: &dyn FragmentStore) -> Result<(), StoreError> {
    test_read_missing(store).await?;
    test_write_and_read_metadata(store).await?;
    test_write_and_read_data(store).await?;
    test_data_overwrite(store).await?;
    test_list_empty(store).await?;
    test_list_ids_and_expanded(store).await?;
    test_owner_isolation(store).await?;
    test_delete(store).await?;
    test_delete_missing(store).await?;
    Ok(())
}

async fn test_read_missing(store: &dyn FragmentStore) -> Result<(), StoreError> {
    let owner = test_owner();
    let id = FragmentId::new("missing");
    assert!(
        store.read_fragment(&owner, &id).await?.is_none(),
        "read of missing metadata should return None"
    );
    assert!(
        store.read_fragment_data(&owner, &id).await?.is_none(),
        "read of missing data should return None"
    );
    Ok(())
}

async fn test_write_and_read_metadata(store: &dyn FragmentStore) -> Result<(), StoreError> {
    let owner = test_owner();
    let meta = record(&owner, "meta-rt", 5)?;
    store.write_fragment(&meta).await?;
    let read = store.read_fragment(&owner, &meta.id).await?;
    assert_eq!(read.as_ref(), Some(&meta), "metadata should round-trip");

    let mut updated = meta.clone();
    updated.size = 10;
    updated.touch();
    store.write_fragment(&updated).await?;
    let read = store.read_fragment(&owner, &meta.id).await?;
    assert_eq!(read, Some(updated), "write should upsert");
    Ok(())
}

async fn test_write_and_read_data(store: &dyn FragmentStore) -> Result<(), StoreError> {
    let owner = test_owner();
    let meta = record(&owner, "data-rt", 5)?;
    store.write_fragment(&meta).await?;
    store
        .write_fragment_data(&owner, &meta.id, &meta.fragment_type, Bytes::from_static(b"hello"))
        .await?;
    let data = store.read_fragment_data(&owner, &meta.id).await?;
    assert_eq!(data.as_deref(), Some(&b"hello"[..]));
    Ok(())
}

async fn test_data_overwrite(store: &dyn FragmentStore) -> Result<(), StoreError> {
    let owner = test_owner();
    let meta = record(&owner, "overwrite", 2)?;
    store.write_fragment(&meta).await?;
    store
        .write_fragment_data(&owner, &meta.id, &meta.fragment_type, Bytes::from_static(b"v1"))
        .await?;
    store
        .write_fragment_data(&owner, &meta.id, &meta.fragment_type, Bytes::from_static(b"v2"))
        .await?;
    let data = store.read_fragment_data(&owner, &meta.id).await?;
    assert_eq!(data.as_deref(), Some(&b"v2"[..]), "last write should win");
    Ok(())
}

async fn test_list_empty(store: &dyn FragmentStore) -> Result<(), StoreError> {
    let owner = test_owner();
    let ids = store.list_fragments(&owner, false).await?;
    assert_eq!(ids, FragmentList::Ids(Vec::new()));
    let expanded = store.list_fragments(&owner, true).await?;
    assert_eq!(expanded, FragmentList::Expanded(Vec::new()));
    Ok(())
}

async fn test_list_ids_and_expanded(store: &dyn FragmentStore) -> Result<(), StoreError> {
    let owner = test_owner();
    let b = record(&owner, "b", 1)?;
    let a = record(&owner, "a", 2)?;
    store.write_fragment(&b).await?;
    store.write_fragment(&a).await?;

    let ids = store.list_fragments(&owner, false).await?;
    assert_eq!(
        ids,
        FragmentList::Ids(vec![a.id.clone(), b.id.clone()]),
        "listing should be ordered by id"
    );

    let expanded = store.list_fragments(&owner, true).await?;
    assert_eq!(expanded, FragmentList::Expanded(vec![a, b]));
    Ok(())
}

async fn test_owner_isolation(store: &dyn FragmentStore) -> Result<(), StoreError> {
    let owner = test_owner();
    let other = test_owner();
    let meta = record(&owner, "private", 0)?;
    store.write_fragment(&meta).await?;

    assert!(store.read_fragment(&other, &meta.id).await?.is_none());
    assert!(store.list_fragments(&other, false).await?.is_empty());
    assert!(matches!(
        store.delete_fragment(&other, &meta.id).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(store.read_fragment(&owner, &meta.id).await?.is_some());
    Ok(())
}

async fn test_delete(store: &dyn FragmentStore) -> Result<(), StoreError> {
    let owner = test_owner();
    let meta = record(&owner, "to-delete", 3)?;
    store.write_fragment(&meta).await?;
    store
        .write_fragment_data(&owner, &meta.id, &meta.fragment_type, Bytes::from_static(b"bye"))
        .await?;

    store.delete_fragment(&owner, &meta.id).await?;
    assert!(store.read_fragment(&owner, &meta.id).await?.is_none());
    assert!(store.read_fragment_data(&owner, &meta.id).await?.is_none());
    assert!(store.list_fragments(&owner, false).await?.is_empty());
    Ok(())
}

async fn test_delete_missing(store: &dyn FragmentStore) -> Result<(), StoreError> {
    let owner = test_owner();
    let result = store
        .delete_fragment(&owner, &FragmentId::new("never-written"))
        .await;
    assert!(
        matches!(result, Err(StoreError::NotFound(_))),
        "delete of a missing fragment should be NotFound, got {result:?}"
    );
    Ok(())
}
