use std::sync::Arc;

use fragments_core::{DEFAULT_MAX_PAYLOAD_BYTES, FragmentError};
use fragments_store::FragmentStore;

use crate::registry::FragmentRegistry;

/// Builder for constructing a [`FragmentRegistry`] with optional settings.
#[derive(Default)]
pub struct FragmentRegistryBuilder {
    store: Option<Arc<dyn FragmentStore>>,
    max_payload_bytes: Option<u64>,
}

impl FragmentRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage backend (required).
    #[must_use]
    pub fn store(mut self, store: Arc<dyn FragmentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the largest payload accepted by writes, in bytes.
    #[must_use]
    pub fn max_payload_bytes(mut self, limit: u64) -> Self {
        self.max_payload_bytes = Some(limit);
        self
    }

    /// Build the registry.
    ///
    /// Fails with [`FragmentError::Configuration`] if no store was set or the
    /// payload limit is zero.
    pub fn build(self) -> Result<FragmentRegistry, FragmentError> {
        let store = self
            .store
            .ok_or_else(|| FragmentError::Configuration("fragment store is required".into()))?;
        let limit = self.max_payload_bytes.unwrap_or(DEFAULT_MAX_PAYLOAD_BYTES);
        if limit == 0 {
            return Err(FragmentError::Configuration(
                "max_payload_bytes must be greater than zero".into(),
            ));
        }
        Ok(FragmentRegistry::with_limit(store, limit))
    }
}
