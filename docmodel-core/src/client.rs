//! The boundary trait for external store clients.
//!
//! The core never opens sockets or blocks on I/O itself; everything that
//! touches a physical store goes through a [`StoreClient`]. Implementations
//! must be thread-safe and are expected to handle their own retry and
//! backoff policies.

use async_trait::async_trait;
use bson::Bson;
use std::fmt::Debug;

use crate::{error::StoreResult, reference::PointerRecord};

/// Abstract interface to a key/value document store.
///
/// A storage map here is exactly the shape produced by the codec: one flat
/// BSON document per record, with nested arrays/maps for containers and
/// pointer records for non-embedded references.
#[async_trait]
pub trait StoreClient: Send + Sync + Debug {
    /// Persists a storage map into the named collection, returning the
    /// stored identity. Implementations assign a fresh identity when the
    /// map carries none.
    async fn save(&self, collection: &str, document: bson::Document) -> StoreResult<Bson>;

    /// Fetches the storage map a pointer record refers to, or `None` when
    /// the target no longer exists. A given pointer must dereference to the
    /// same logical document as long as it is unmodified.
    async fn dereference(&self, pointer: &PointerRecord) -> StoreResult<Option<bson::Document>>;

    /// Returns every storage map in the collection matching the flat
    /// equality filter.
    async fn find(
        &self,
        collection: &str,
        filter: bson::Document,
    ) -> StoreResult<Vec<bson::Document>>;

    /// Deletes the document with the given identity. Deleting an absent
    /// document is not an error.
    async fn delete(&self, collection: &str, id: &Bson) -> StoreResult<()>;
}
