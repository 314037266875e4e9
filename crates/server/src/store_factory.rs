use std::sync::Arc;

use fragments_store::FragmentStore;
#[cfg(feature = "aws")]
use fragments_store_aws::{AwsFragmentStore, AwsStoreConfig, build_clients, create_bucket, create_table};
use fragments_store_memory::MemoryFragmentStore;

use crate::config::StoreConfig;
use crate::error::ServerError;

/// Construct the configured `FragmentStore`.
#[cfg_attr(not(feature = "aws"), allow(unused_variables))]
pub async fn create_store(
    config: &StoreConfig,
    max_payload_bytes: u64,
) -> Result<Arc<dyn FragmentStore>, ServerError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryFragmentStore::new())),
        #[cfg(feature = "aws")]
        "aws" => create_aws(config, max_payload_bytes).await,
        other => Err(ServerError::Config(format!(
            "unsupported store backend: {other} (is the feature enabled?)"
        ))),
    }
}

#[cfg(feature = "aws")]
async fn create_aws(
    config: &StoreConfig,
    max_payload_bytes: u64,
) -> Result<Arc<dyn FragmentStore>, ServerError> {
    let defaults = AwsStoreConfig::default();
    let aws_config = AwsStoreConfig {
        table_name: config.table_name.clone().unwrap_or(defaults.table_name),
        bucket: config.bucket.clone().unwrap_or(defaults.bucket),
        region: config.region.clone().unwrap_or(defaults.region),
        endpoint_url: config.endpoint_url.clone(),
        key_prefix: config.key_prefix.clone(),
        max_object_bytes: max_payload_bytes,
    };

    let (dynamo, s3) = build_clients(&aws_config).await;

    // A custom endpoint means a local emulator: create the table and bucket
    // so a fresh `LocalStack` works out of the box.
    if aws_config.endpoint_url.is_some() {
        create_table(&dynamo, &aws_config.table_name)
            .await
            .map_err(|e| ServerError::Config(format!("dynamodb create table: {e}")))?;
        create_bucket(&s3, &aws_config.bucket)
            .await
            .map_err(|e| ServerError::Config(format!("s3 create bucket: {e}")))?;
    }

    tracing::info!(
        table = %aws_config.table_name,
        bucket = %aws_config.bucket,
        region = %aws_config.region,
        "using aws fragment store"
    );
    Ok(Arc::new(AwsFragmentStore::from_clients(
        dynamo,
        s3,
        &aws_config,
    )))
}
