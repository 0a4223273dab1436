//! Main docmodel crate providing a typed schema and validation layer over
//! generic document stores.
//!
//! This crate is the primary entry point for users of the docmodel
//! framework. It re-exports the core types and provides convenient access
//! to the store clients.
//!
//! # Features
//!
//! - **Declare once, validate everywhere** - Describe a record type's
//!   fields, constraints, and relationships once; every document of that
//!   type is validated attribute by attribute
//! - **Bidirectional codec** - Documents convert to and from flat storage
//!   maps, with pointer records for references and inline nesting for
//!   embedded ones
//! - **Forward and self references** - Reference a type before it is
//!   declared, or the type itself; resolution is retried on access and
//!   tracked in a backref registry
//! - **Pluggable store clients** - In-memory for tests, MongoDB behind the
//!   `mongodb` feature, or anything implementing the client trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docmodel::{prelude::*, memory::MemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = SchemaRegistry::new();
//!     let gardener = SchemaBuilder::new("Gardener")
//!         .field("name", FieldSpec::string().required())
//!         .field("instructor", FieldSpec::reference("self"))
//!         .register(&registry)?;
//!
//!     let mut jones = Document::new(gardener.clone());
//!     jones.set("name", "Mr. Jones")?;
//!
//!     let mut jim = Document::new(gardener.clone());
//!     jim.set("name", "Jim")?;
//!     jim.set("instructor", jones)?;
//!
//!     // Persist through the in-memory client.
//!     let store = DocumentStore::new(MemoryStore::new());
//!     let gardeners = store.collection(&gardener);
//!     gardeners.save(&mut jim).await?;
//!
//!     // Jim's instructor was stored as a pointer record, not a copy.
//!     let found = gardeners.get(doc! { "name": "Jim" }).await?;
//!     println!("{:?}", found.get("instructor"));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Store clients
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB client (requires the `mongodb`
//!   feature)

pub mod prelude;

pub use docmodel_core::{
    backref, client, codec, collection, document, error, field, reference, schema, validate,
    value,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory store client implementations.
pub mod memory {
    pub use docmodel_memory::MemoryStore;
}

/// MongoDB store client implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::{ConnectionPool, MongoStore};
}
