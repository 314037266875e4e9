//! Conversion between [`FragmentMetadata`] and `DynamoDB` items.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};

use fragments_core::{FragmentMetadata, OwnerId};
use fragments_store::StoreError;

pub(crate) const OWNER_ID: &str = "ownerId";
pub(crate) const ID: &str = "id";
pub(crate) const TYPE: &str = "type";
pub(crate) const SIZE: &str = "size";
pub(crate) const CREATED: &str = "created";
pub(crate) const UPDATED: &str = "updated";
pub(crate) const DELETING: &str = "deleting";

pub(crate) type Item = HashMap<String, AttributeValue>;

fn timestamp(value: &DateTime<Utc>) -> AttributeValue {
    AttributeValue::S(value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub(crate) fn to_item(meta: &FragmentMetadata) -> Item {
    HashMap::from([
        (OWNER_ID.to_owned(), AttributeValue::S(meta.owner_id.to_string())),
        (ID.to_owned(), AttributeValue::S(meta.id.to_string())),
        (TYPE.to_owned(), AttributeValue::S(meta.fragment_type.clone())),
        (SIZE.to_owned(), AttributeValue::N(meta.size.to_string())),
        (CREATED.to_owned(), timestamp(&meta.created)),
        (UPDATED.to_owned(), timestamp(&meta.updated)),
    ])
}

pub(crate) fn get_s<'a>(item: &'a Item, name: &str) -> Result<&'a str, StoreError> {
    match item.get(name) {
        Some(AttributeValue::S(s)) => Ok(s),
        _ => Err(StoreError::Serialization(format!(
            "item is missing string attribute '{name}'"
        ))),
    }
}

fn get_timestamp(item: &Item, name: &str) -> Result<DateTime<Utc>, StoreError> {
    let raw = get_s(item, name)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("invalid '{name}' timestamp {raw}: {e}")))
}

pub(crate) fn from_item(item: &Item) -> Result<FragmentMetadata, StoreError> {
    let size = match item.get(SIZE) {
        Some(AttributeValue::N(n)) => n.parse::<u64>().map_err(|_| {
            StoreError::Serialization(format!("size must be a non-negative integer, got {n}"))
        })?,
        _ => {
            return Err(StoreError::Serialization(
                "item is missing numeric attribute 'size'".into(),
            ));
        }
    };

    Ok(FragmentMetadata {
        id: get_s(item, ID)?.into(),
        owner_id: OwnerId::new(get_s(item, OWNER_ID)?),
        fragment_type: get_s(item, TYPE)?.to_owned(),
        size,
        created: get_timestamp(item, CREATED)?,
        updated: get_timestamp(item, UPDATED)?,
    })
}

/// Returns `true` if the item carries the soft-delete marker.
pub(crate) fn is_deleting(item: &Item) -> bool {
    matches!(item.get(DELETING), Some(AttributeValue::Bool(true)))
}
