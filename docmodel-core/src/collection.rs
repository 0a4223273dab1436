//! High-level persistence API binding schemas to a store client.
//!
//! A [`DocumentStore`] owns a [`StoreClient`] and hands out [`Collection`]s,
//! one per schema. The collection is where documents meet the store: saving
//! validates and serializes, finding deserializes, and dereferencing turns
//! lazy pointer handles back into documents.
//!
//! # Example
//!
//! ```ignore
//! use docmodel_core::collection::DocumentStore;
//!
//! let store = DocumentStore::new(client);
//! let gardeners = store.collection(&gardener_schema);
//!
//! let mut jim = Document::new(gardener_schema.clone());
//! jim.set("name", "Jim")?;
//! let id = gardeners.save(&mut jim).await?;
//! ```

use std::sync::Arc;

use bson::Bson;

use crate::{
    client::StoreClient,
    codec,
    document::Document,
    error::{StoreError, StoreResult},
    reference::PointerRecord,
    schema::ModelSchema,
};

/// A store client bound to a schema registry's worth of collections.
#[derive(Debug)]
pub struct DocumentStore<C: StoreClient> {
    client: C,
}

impl<C: StoreClient> DocumentStore<C> {
    /// Wraps a store client.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// A collection for the given schema. The collection is named after
    /// the schema.
    pub fn collection<'a>(&'a self, schema: &Arc<ModelSchema>) -> Collection<'a, C> {
        Collection {
            schema: schema.clone(),
            client: &self.client,
        }
    }
}

/// One schema's documents in the store.
#[derive(Debug)]
pub struct Collection<'a, C: StoreClient> {
    schema: Arc<ModelSchema>,
    client: &'a C,
}

impl<'a, C: StoreClient> Collection<'a, C> {
    /// The collection's name.
    pub fn name(&self) -> &str {
        self.schema.collection_name()
    }

    /// The schema this collection stores.
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// Validates, serializes, and persists a document, returning its
    /// stored identity.
    ///
    /// # Errors
    ///
    /// Validation failures surface as
    /// [`StoreError::Codec`](crate::error::StoreError::Codec) before the
    /// client is touched; backend failures come back as-is.
    pub async fn save(&self, doc: &mut Document) -> StoreResult<Bson> {
        let storage = codec::to_storage_document(doc)?;
        self.client.save(self.name(), storage).await
    }

    /// Runs a flat equality filter against the collection and
    /// reconstructs each match.
    ///
    /// A filter key naming the primary-key field is rewritten to `_id`,
    /// the key primary keys store under.
    pub async fn find(&self, filter: bson::Document) -> StoreResult<Vec<Document>> {
        let filter = self.rewrite_primary_key(filter);
        let rows = self.client.find(self.name(), filter).await?;
        rows.iter()
            .map(|row| {
                codec::from_storage_document(&self.schema, row).map_err(StoreError::from)
            })
            .collect()
    }

    /// Like [`find`](Self::find), but expects exactly one match.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] on zero matches,
    /// [`StoreError::Ambiguous`] on more than one.
    pub async fn get(&self, filter: bson::Document) -> StoreResult<Document> {
        let mut matches = self.find(filter).await?;
        match matches.len() {
            0 => Err(StoreError::NotFound(self.name().to_string())),
            1 => Ok(matches.remove(0)),
            found => Err(StoreError::Ambiguous {
                collection: self.name().to_string(),
                matches: found,
            }),
        }
    }

    /// Deletes a document by its primary key.
    ///
    /// # Errors
    ///
    /// [`StoreError::MissingPrimaryKey`] when the document has no key to
    /// delete by.
    pub async fn delete(&self, doc: &mut Document) -> StoreResult<()> {
        let mut id = doc.pk().ok_or(StoreError::MissingPrimaryKey)?;
        let id = self
            .schema
            .primary_key_field()
            .to_storage(&mut id)
            .map_err(StoreError::Codec)?;
        self.client.delete(self.name(), &id).await
    }

    /// Eagerly dereferences a pointer record into a document.
    ///
    /// The pointer may name this collection's schema or any type declared
    /// in the same registry (a subtype, typically).
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the pointed-at document no longer
    /// exists or the pointer names an undeclared type.
    pub async fn dereference(&self, pointer: &PointerRecord) -> StoreResult<Document> {
        let schema = if pointer.type_name == self.schema.name() {
            self.schema.clone()
        } else {
            self.schema
                .registry_schema(&pointer.type_name)
                .ok_or_else(|| StoreError::NotFound(pointer.type_name.clone()))?
        };

        let stored = self
            .client
            .dereference(pointer)
            .await?
            .ok_or_else(|| StoreError::NotFound(pointer.type_name.clone()))?;
        codec::from_storage_document(&schema, &stored).map_err(StoreError::from)
    }

    fn rewrite_primary_key(&self, mut filter: bson::Document) -> bson::Document {
        let pk_name = self.schema.primary_key_field().name().to_string();
        if pk_name != "_id"
            && let Some(value) = filter.remove(&pk_name)
        {
            filter.insert("_id", value);
        }
        filter
    }
}
