use sha2::{Digest, Sha256};

use crate::types::OwnerId;

/// Derive the owner id for an authenticated user identifier.
///
/// The identifier (usually an email address) is hashed with SHA-256 so raw
/// identities are never persisted or used as storage keys.
#[must_use]
pub fn hash_owner(identifier: &str) -> OwnerId {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    OwnerId::new(hex::encode(hasher.finalize()))
}
