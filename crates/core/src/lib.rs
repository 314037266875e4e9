pub mod error;
pub mod fragment;
pub mod media;
pub mod owner;
pub mod types;

pub use error::FragmentError;
pub use fragment::{FragmentList, FragmentMetadata, NewFragment, now};
pub use media::{MediaType, Negotiation, base_type, negotiate};
pub use owner::hash_owner;
pub use types::{FragmentId, OwnerId};

/// Largest payload accepted by default, in bytes (5 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: u64 = 5 * 1024 * 1024;
