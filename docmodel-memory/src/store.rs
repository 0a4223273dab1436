//! In-memory storage implementation of the store-client boundary.
//!
//! Documents are stored as BSON storage maps in HashMaps with async-safe
//! read-write locks, keyed by collection name and rendered identity.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::Bson;
use mea::rwlock::RwLock;
use tracing::debug;

use docmodel_core::{
    client::StoreClient,
    error::StoreResult,
    reference::PointerRecord,
};

type CollectionMap = HashMap<String, bson::Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory store client.
///
/// Cloneable: clones share the same underlying data. Identities are
/// assigned on save when a storage map carries none. Queries scan the whole
/// collection; fine for tests and small datasets, which is what this client
/// exists for.
///
/// The `$db` component of pointer records is ignored; a memory store is
/// one logical database.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::MemoryStore;
/// use docmodel_core::client::StoreClient;
/// use bson::doc;
///
/// # async fn example() -> docmodel_core::error::StoreResult<()> {
/// let store = MemoryStore::new();
/// let id = store.save("Gardener", doc! { "name": "Jim" }).await?;
/// let found = store.find("Gardener", doc! { "name": "Jim" }).await?;
/// assert_eq!(found.len(), 1);
/// # Ok(()) }
/// ```
#[derive(Default, Clone, Debug)]
pub struct MemoryStore {
    collections: Arc<RwLock<StoreMap>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held by a collection.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, CollectionMap::len)
    }

    /// True when the collection holds no documents.
    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }

    fn matches(document: &bson::Document, filter: &bson::Document) -> bool {
        filter
            .iter()
            .all(|(key, expected)| document.get(key) == Some(expected))
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn save(&self, collection: &str, mut document: bson::Document) -> StoreResult<Bson> {
        let id = match document.get("_id") {
            Some(id) if !matches!(id, Bson::Null) => id.clone(),
            _ => {
                let id = Bson::from(bson::Uuid::new());
                document.insert("_id", id.clone());
                id
            }
        };

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        debug!(collection, %id, "saved document");

        Ok(id)
    }

    async fn dereference(&self, pointer: &PointerRecord) -> StoreResult<Option<bson::Document>> {
        let collections = self.collections.read().await;
        let found = collections
            .get(&pointer.type_name)
            .and_then(|map| map.get(&pointer.id.to_string()))
            .cloned();
        debug!(
            collection = %pointer.type_name,
            hit = found.is_some(),
            "dereferenced pointer"
        );
        Ok(found)
    }

    async fn find(
        &self,
        collection: &str,
        filter: bson::Document,
    ) -> StoreResult<Vec<bson::Document>> {
        let collections = self.collections.read().await;
        let matches = collections
            .get(collection)
            .map(|map| {
                map.values()
                    .filter(|doc| Self::matches(doc, &filter))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        debug!(collection, matches = matches.len(), "ran filter");
        Ok(matches)
    }

    async fn delete(&self, collection: &str, id: &Bson) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        if let Some(map) = collections.get_mut(collection) {
            map.remove(&id.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[tokio::test]
    async fn save_assigns_an_identity_when_missing() {
        let store = MemoryStore::new();
        let id = store.save("Flower", doc! { "species": "Rose" }).await.unwrap();
        assert!(!matches!(id, Bson::Null));
        assert_eq!(store.len("Flower").await, 1);
    }

    #[tokio::test]
    async fn save_keeps_an_existing_identity() {
        let store = MemoryStore::new();
        let id = Bson::from(bson::Uuid::new());
        let saved = store
            .save("Flower", doc! { "_id": id.clone(), "species": "Rose" })
            .await
            .unwrap();
        assert_eq!(saved, id);
    }

    #[tokio::test]
    async fn find_is_flat_equality() {
        let store = MemoryStore::new();
        store
            .save("Flower", doc! { "species": "Rose", "petals": 5_i64 })
            .await
            .unwrap();
        store
            .save("Flower", doc! { "species": "Daisy", "petals": 34_i64 })
            .await
            .unwrap();

        let roses = store
            .find("Flower", doc! { "species": "Rose" })
            .await
            .unwrap();
        assert_eq!(roses.len(), 1);

        let none = store
            .find("Flower", doc! { "species": "Rose", "petals": 34_i64 })
            .await
            .unwrap();
        assert!(none.is_empty());

        let all = store.find("Flower", doc! {}).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn dereference_round_trip() {
        let store = MemoryStore::new();
        let id = store.save("Gardener", doc! { "name": "Jones" }).await.unwrap();

        let pointer = PointerRecord::new("Gardener", id, "");
        let found = store.dereference(&pointer).await.unwrap().unwrap();
        assert_eq!(found.get("name"), Some(&Bson::String("Jones".into())));

        let dangling = PointerRecord::new("Gardener", Bson::from(bson::Uuid::new()), "");
        assert!(store.dereference(&dangling).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        let id = store.save("Flower", doc! { "species": "Rose" }).await.unwrap();

        store.delete("Flower", &id).await.unwrap();
        assert!(store.is_empty("Flower").await);
        // Deleting again is not an error.
        store.delete("Flower", &id).await.unwrap();
    }
}
