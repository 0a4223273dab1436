use async_trait::async_trait;
use bson::{Bson, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    options::{Acknowledgment, CollectionOptions, WriteConcern},
};
use tracing::debug;

use docmodel_core::{
    client::StoreClient,
    error::{StoreError, StoreResult},
    reference::PointerRecord,
};

/// A MongoDB-backed store client bound to one database.
///
/// Collections are named after schemas; pointer records whose `$db` names
/// a different database are dereferenced through it on the same client.
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    database: String,
    write_concern: Option<u32>,
}

impl MongoStore {
    /// Binds a driver client to a database.
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
            write_concern: None,
        }
    }

    /// Requires acknowledgment from `nodes` replica-set members on every
    /// save, mirroring the schema-level `write_concern` option.
    pub fn with_write_concern(mut self, nodes: u32) -> Self {
        self.write_concern = Some(nodes);
        self
    }

    fn collection(&self, name: &str) -> MongoCollection<bson::Document> {
        let database = self.client.database(&self.database);
        match self.write_concern {
            Some(nodes) => database.collection_with_options(
                name,
                CollectionOptions::builder()
                    .write_concern(
                        WriteConcern::builder()
                            .w(Acknowledgment::Nodes(nodes))
                            .build(),
                    )
                    .build(),
            ),
            None => database.collection(name),
        }
    }
}

#[async_trait]
impl StoreClient for MongoStore {
    async fn save(&self, collection: &str, mut document: bson::Document) -> StoreResult<Bson> {
        let id = match document.get("_id") {
            Some(id) if !matches!(id, Bson::Null) => id.clone(),
            _ => {
                let id = Bson::from(bson::Uuid::new());
                document.insert("_id", id.clone());
                id
            }
        };

        self.collection(collection)
            .replace_one(doc! { "_id": id.clone() }, document)
            .upsert(true)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        debug!(collection, %id, "saved document");

        Ok(id)
    }

    async fn dereference(&self, pointer: &PointerRecord) -> StoreResult<Option<bson::Document>> {
        let database = if pointer.location.is_empty() || pointer.location == self.database {
            self.client.database(&self.database)
        } else {
            self.client.database(&pointer.location)
        };

        database
            .collection::<bson::Document>(&pointer.type_name)
            .find_one(doc! { "_id": pointer.id.clone() })
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn find(
        &self,
        collection: &str,
        filter: bson::Document,
    ) -> StoreResult<Vec<bson::Document>> {
        self.collection(collection)
            .find(filter)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .try_collect::<Vec<bson::Document>>()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn delete(&self, collection: &str, id: &Bson) -> StoreResult<()> {
        self.collection(collection)
            .delete_one(doc! { "_id": id.clone() })
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }
}
