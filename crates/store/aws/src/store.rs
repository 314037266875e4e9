use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

use fragments_core::{FragmentId, FragmentList, FragmentMetadata, OwnerId};
use fragments_store::{FragmentStore, StoreError};

use crate::config::AwsStoreConfig;
use crate::item::{self, DELETING, ID, Item, OWNER_ID, from_item, is_deleting, to_item};
use crate::table::object_key;

/// Durable [`FragmentStore`]: metadata in `DynamoDB`, payloads in S3.
///
/// Metadata items use the composite primary key (`ownerId`, `id`); payloads
/// live at `{ownerId}/{id}` in the bucket. Deletes mark the item with a
/// `deleting` attribute before removing the object and then the item, so a
/// failure part-way leaves a marked record that reads ignore and
/// [`FragmentStore::sweep_pending_deletes`] finishes.
pub struct AwsFragmentStore {
    dynamo: aws_sdk_dynamodb::Client,
    s3: aws_sdk_s3::Client,
    table_name: String,
    bucket: String,
    key_prefix: Option<String>,
    max_object_bytes: u64,
}

impl std::fmt::Debug for AwsFragmentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsFragmentStore")
            .field("table_name", &self.table_name)
            .field("bucket", &self.bucket)
            .field("key_prefix", &self.key_prefix)
            .field("max_object_bytes", &self.max_object_bytes)
            .finish_non_exhaustive()
    }
}

impl AwsFragmentStore {
    /// Create a new `AwsFragmentStore` from the provided configuration.
    ///
    /// Loads AWS credentials and configuration from the environment and
    /// optionally overrides the endpoint URL for local development.
    pub async fn new(config: &AwsStoreConfig) -> Self {
        let (dynamo, s3) = build_clients(config).await;
        Self::from_clients(dynamo, s3, config)
    }

    /// Create a store from existing clients.
    pub fn from_clients(
        dynamo: aws_sdk_dynamodb::Client,
        s3: aws_sdk_s3::Client,
        config: &AwsStoreConfig,
    ) -> Self {
        Self {
            dynamo,
            s3,
            table_name: config.table_name.clone(),
            bucket: config.bucket.clone(),
            key_prefix: config.key_prefix.clone(),
            max_object_bytes: config.max_object_bytes,
        }
    }

    fn object_key(&self, owner_id: &OwnerId, id: &FragmentId) -> String {
        object_key(self.key_prefix.as_deref(), owner_id, id)
    }

    /// Remove the S3 object, then the `DynamoDB` item. Both calls are
    /// idempotent so this is safe to repeat.
    async fn purge(&self, owner_id: &OwnerId, id: &FragmentId) -> Result<(), StoreError> {
        let key = self.object_key(owner_id, id);
        self.s3
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                tracing::error!(bucket = %self.bucket, key = %key, error = %err, "S3 delete_object failed");
                StoreError::Backend(err.to_string())
            })?;

        self.dynamo
            .delete_item()
            .table_name(&self.table_name)
            .key(OWNER_ID, AttributeValue::S(owner_id.to_string()))
            .key(ID, AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.into_service_error().to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl FragmentStore for AwsFragmentStore {
    async fn write_fragment(&self, metadata: &FragmentMetadata) -> Result<(), StoreError> {
        self.dynamo
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(metadata)))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.into_service_error().to_string()))?;
        tracing::debug!(owner_id = %metadata.owner_id, id = %metadata.id, "metadata written");
        Ok(())
    }

    async fn read_fragment(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
    ) -> Result<Option<FragmentMetadata>, StoreError> {
        let result = self
            .dynamo
            .get_item()
            .table_name(&self.table_name)
            .key(OWNER_ID, AttributeValue::S(owner_id.to_string()))
            .key(ID, AttributeValue::S(id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.into_service_error().to_string()))?;

        match result.item() {
            Some(item) if !is_deleting(item) => from_item(item).map(Some),
            _ => Ok(None),
        }
    }

    async fn write_fragment_data(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), StoreError> {
        let key = self.object_key(owner_id, id);
        let len = data.len();
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                tracing::error!(bucket = %self.bucket, key = %key, error = %err, "S3 put_object failed");
                StoreError::Backend(err.to_string())
            })?;
        tracing::debug!(bucket = %self.bucket, key = %key, size = len, "payload uploaded");
        Ok(())
    }

    async fn read_fragment_data(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
    ) -> Result<Option<Bytes>, StoreError> {
        let key = self.object_key(owner_id, id);
        let output = match self
            .s3
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let err = e.into_service_error();
                if err.is_no_such_key() {
                    return Ok(None);
                }
                tracing::error!(bucket = %self.bucket, key = %key, error = %err, "S3 get_object failed");
                return Err(StoreError::Backend(err.to_string()));
            }
        };

        // Refuse early when S3 reports the length; the collected body is
        // checked either way.
        if let Some(size) = output.content_length().and_then(|n| u64::try_from(n).ok()) {
            check_object_size(size, self.max_object_bytes)?;
        }

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Connection(format!("failed to read S3 body: {e}")))?
            .into_bytes();
        check_object_size(body.len() as u64, self.max_object_bytes)?;
        Ok(Some(body))
    }

    async fn list_fragments(
        &self,
        owner_id: &OwnerId,
        expand: bool,
    ) -> Result<FragmentList, StoreError> {
        let mut items: Vec<Item> = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let mut query = self
                .dynamo
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#owner = :owner")
                .filter_expression("attribute_not_exists(#deleting)")
                .expression_attribute_names("#owner", OWNER_ID)
                .expression_attribute_names("#deleting", DELETING)
                .expression_attribute_values(":owner", AttributeValue::S(owner_id.to_string()))
                .consistent_read(true);

            if !expand {
                query = query
                    .projection_expression("#id")
                    .expression_attribute_names("#id", ID);
            }
            if let Some(key) = exclusive_start_key {
                query = query.set_exclusive_start_key(Some(key));
            }

            let response = query
                .send()
                .await
                .map_err(|e| StoreError::Backend(e.into_service_error().to_string()))?;

            items.extend(response.items().iter().cloned());

            exclusive_start_key = response.last_evaluated_key().cloned();
            if exclusive_start_key.is_none() {
                break;
            }
        }

        if expand {
            let records = items
                .iter()
                .map(from_item)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FragmentList::Expanded(records))
        } else {
            let ids = items
                .iter()
                .map(|item| item::get_s(item, ID).map(FragmentId::from))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FragmentList::Ids(ids))
        }
    }

    async fn delete_fragment(
        &self,
        owner_id: &OwnerId,
        id: &FragmentId,
    ) -> Result<(), StoreError> {
        let marked = self
            .dynamo
            .update_item()
            .table_name(&self.table_name)
            .key(OWNER_ID, AttributeValue::S(owner_id.to_string()))
            .key(ID, AttributeValue::S(id.to_string()))
            .update_expression("SET #deleting = :true")
            .condition_expression("attribute_exists(#id) AND attribute_not_exists(#deleting)")
            .expression_attribute_names("#deleting", DELETING)
            .expression_attribute_names("#id", ID)
            .expression_attribute_values(":true", AttributeValue::Bool(true))
            .send()
            .await;

        if let Err(err) = marked {
            let service_err = err.into_service_error();
            if service_err.is_conditional_check_failed_exception() {
                return Err(StoreError::NotFound(format!("{owner_id}/{id}")));
            }
            return Err(StoreError::Backend(service_err.to_string()));
        }

        self.purge(owner_id, id).await?;
        tracing::debug!(owner_id = %owner_id, id = %id, "fragment deleted");
        Ok(())
    }

    async fn sweep_pending_deletes(&self) -> Result<usize, StoreError> {
        let mut pending: Vec<(OwnerId, FragmentId)> = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let mut scan = self
                .dynamo
                .scan()
                .table_name(&self.table_name)
                .filter_expression("#deleting = :true")
                .projection_expression("#owner, #id")
                .expression_attribute_names("#deleting", DELETING)
                .expression_attribute_names("#owner", OWNER_ID)
                .expression_attribute_names("#id", ID)
                .expression_attribute_values(":true", AttributeValue::Bool(true));

            if let Some(key) = exclusive_start_key {
                scan = scan.set_exclusive_start_key(Some(key));
            }

            let response = scan
                .send()
                .await
                .map_err(|e| StoreError::Backend(e.into_service_error().to_string()))?;

            for item in response.items() {
                let owner = item::get_s(item, OWNER_ID)?;
                let id = item::get_s(item, ID)?;
                pending.push((OwnerId::new(owner), FragmentId::new(id)));
            }

            exclusive_start_key = response.last_evaluated_key().cloned();
            if exclusive_start_key.is_none() {
                break;
            }
        }

        for (owner_id, id) in &pending {
            tracing::info!(owner_id = %owner_id, id = %id, "finishing interrupted delete");
            self.purge(owner_id, id).await?;
        }
        Ok(pending.len())
    }
}

fn check_object_size(size: u64, limit: u64) -> Result<(), StoreError> {
    if size > limit {
        return Err(StoreError::TooLarge { size, limit });
    }
    Ok(())
}

/// Build the `DynamoDB` and S3 clients from configuration.
///
/// A custom endpoint switches S3 to path-style addressing, which local
/// emulators require.
pub async fn build_clients(
    config: &AwsStoreConfig,
) -> (aws_sdk_dynamodb::Client, aws_sdk_s3::Client) {
    let mut aws_config =
        aws_config::from_env().region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint_url {
        aws_config = aws_config.endpoint_url(endpoint);
    }

    let sdk_config = aws_config.load().await;
    let dynamo = aws_sdk_dynamodb::Client::new(&sdk_config);
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.endpoint_url.is_some())
        .build();
    (dynamo, aws_sdk_s3::Client::from_conf(s3_config))
}
