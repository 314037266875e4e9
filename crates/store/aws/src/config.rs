use fragments_core::DEFAULT_MAX_PAYLOAD_BYTES;

/// Configuration for the DynamoDB + S3 fragment store.
#[derive(Debug, Clone)]
pub struct AwsStoreConfig {
    /// `DynamoDB` table holding metadata records.
    pub table_name: String,

    /// S3 bucket holding payloads.
    pub bucket: String,

    /// AWS region (e.g. `"us-east-1"`).
    pub region: String,

    /// Optional endpoint URL for local development (e.g. `LocalStack`).
    /// When set, S3 requests use path-style addressing.
    pub endpoint_url: Option<String>,

    /// Optional prefix prepended to every S3 object key.
    pub key_prefix: Option<String>,

    /// Objects reported larger than this are refused before the body is read.
    pub max_object_bytes: u64,
}

impl Default for AwsStoreConfig {
    fn default() -> Self {
        Self {
            table_name: String::from("fragments"),
            bucket: String::from("fragments"),
            region: String::from("us-east-1"),
            endpoint_url: None,
            key_prefix: None,
            max_object_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}
