use serde::Deserialize;

use fragments_core::DEFAULT_MAX_PAYLOAD_BYTES;

/// Top-level configuration for the fragments server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct FragmentsConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage backend configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Request size limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// HTTP server bind configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL used in `Location` headers (e.g. `https://fragments.example.com`).
    ///
    /// If not set, the request's `Host` header is used.
    pub api_url: Option<String>,
    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_url: None,
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// Configuration for the storage backend.
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    /// Which backend to use: `"memory"` or `"aws"`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// AWS region for the `aws` backend.
    pub region: Option<String>,

    /// Endpoint override for local development (e.g. `LocalStack`).
    pub endpoint_url: Option<String>,

    /// `DynamoDB` table name.
    pub table_name: Option<String>,

    /// S3 bucket name.
    pub bucket: Option<String>,

    /// Prefix prepended to every S3 object key.
    pub key_prefix: Option<String>,

    /// How often to finish interrupted deletes, in seconds. `0` disables the sweep.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            region: None,
            endpoint_url: None,
            table_name: None,
            bucket: None,
            key_prefix: None,
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

fn default_backend() -> String {
    "memory".to_owned()
}

fn default_sweep_interval() -> u64 {
    300
}

/// How callers prove who they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStrategy {
    /// HTTP Basic against a password file.
    Basic,
    /// HS256-signed JWT in an `Authorization: Bearer` header.
    Bearer,
    /// No authentication; every caller is the same anonymous user.
    #[default]
    None,
}

/// Authentication configuration.
#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub strategy: AuthStrategy,

    /// Path to a file of `username:argon2-hash` lines (`basic` strategy).
    pub password_file: Option<String>,

    /// Shared HMAC secret for verifying tokens (`bearer` strategy).
    pub bearer_secret: Option<String>,

    /// Expected `aud` claim. Unchecked when unset.
    pub bearer_audience: Option<String>,
}

/// Request size limits.
#[derive(Debug, Deserialize)]
pub struct LimitsConfig {
    /// Largest accepted fragment payload in bytes.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_max_payload_bytes() -> u64 {
    DEFAULT_MAX_PAYLOAD_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: FragmentsConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.api_url.is_none());
        assert_eq!(config.server.shutdown_timeout_seconds, 30);
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.store.sweep_interval_seconds, 300);
        assert_eq!(config.auth.strategy, AuthStrategy::None);
        assert_eq!(config.limits.max_payload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn full_file_parses() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 9000
api_url = "https://fragments.example.com"

[store]
backend = "aws"
region = "ca-central-1"
endpoint_url = "http://localhost:4566"
table_name = "fragments-dev"
bucket = "fragments-dev"
key_prefix = "v1/"
sweep_interval_seconds = 0

[auth]
strategy = "bearer"
bearer_secret = "s3cret"
bearer_audience = "fragments-ui"

[limits]
max_payload_bytes = 1024
"#;
        let config: FragmentsConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.server.api_url.as_deref(),
            Some("https://fragments.example.com")
        );
        assert_eq!(config.store.backend, "aws");
        assert_eq!(config.store.region.as_deref(), Some("ca-central-1"));
        assert_eq!(config.store.key_prefix.as_deref(), Some("v1/"));
        assert_eq!(config.store.sweep_interval_seconds, 0);
        assert_eq!(config.auth.strategy, AuthStrategy::Bearer);
        assert_eq!(config.auth.bearer_audience.as_deref(), Some("fragments-ui"));
        assert_eq!(config.limits.max_payload_bytes, 1024);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let result: Result<FragmentsConfig, _> = toml::from_str("[auth]\nstrategy = \"cognito\"");
        assert!(result.is_err());
    }
}
