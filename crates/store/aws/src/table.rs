use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};

use fragments_core::{FragmentId, OwnerId};
use fragments_store::StoreError;

use crate::item::{ID, OWNER_ID};

/// Build the S3 object key for a fragment.
///
/// Format: `{prefix}{owner_id}/{id}`
pub fn object_key(prefix: Option<&str>, owner_id: &OwnerId, id: &FragmentId) -> String {
    format!("{}{owner_id}/{id}", prefix.unwrap_or_default())
}

fn backend<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Create the metadata table programmatically.
///
/// The table uses a composite primary key with:
/// - `ownerId` (String) as the partition key
/// - `id` (String) as the sort key
///
/// This is intended for tests and local development. In production you would
/// typically provision the table via Infrastructure-as-Code tooling. An
/// existing table is not an error.
pub async fn create_table(
    client: &aws_sdk_dynamodb::Client,
    table_name: &str,
) -> Result<(), StoreError> {
    let result = client
        .create_table()
        .table_name(table_name)
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(OWNER_ID)
                .key_type(KeyType::Hash)
                .build()
                .map_err(backend)?,
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(ID)
                .key_type(KeyType::Range)
                .build()
                .map_err(backend)?,
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(OWNER_ID)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(backend)?,
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(ID)
                .attribute_type(ScalarAttributeType::S)
                .build()
                .map_err(backend)?,
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) => {
            let service_err = err.into_service_error();
            if service_err.is_resource_in_use_exception() {
                Ok(())
            } else {
                Err(backend(service_err))
            }
        }
    }
}

/// Create the payload bucket. An existing bucket owned by the caller is not
/// an error.
pub async fn create_bucket(client: &aws_sdk_s3::Client, bucket: &str) -> Result<(), StoreError> {
    match client.create_bucket().bucket(bucket).send().await {
        Ok(_) => Ok(()),
        Err(err) => {
            let service_err = err.into_service_error();
            if service_err.is_bucket_already_owned_by_you() {
                Ok(())
            } else {
                Err(backend(service_err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_format() {
        let key = object_key(None, &OwnerId::new("abc"), &FragmentId::new("f1"));
        assert_eq!(key, "abc/f1");
    }

    #[test]
    fn object_key_with_prefix() {
        let key = object_key(Some("fragments/"), &OwnerId::new("abc"), &FragmentId::new("f1"));
        assert_eq!(key, "fragments/abc/f1");
    }
}
