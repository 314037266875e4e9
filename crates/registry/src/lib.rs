//! The fragment entity and the registry that creates, fetches, lists and
//! deletes fragments through an injected [`FragmentStore`].
//!
//! [`FragmentStore`]: fragments_store::FragmentStore

mod builder;
mod error;
mod fragment;
mod registry;

pub use builder::FragmentRegistryBuilder;
pub use fragment::{Converted, Fragment};
pub use registry::FragmentRegistry;
