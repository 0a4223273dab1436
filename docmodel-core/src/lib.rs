//! A typed schema and validation layer over generic key/value document
//! stores.
//!
//! Declare a record type once (field names, kinds, constraints, and
//! relationships to other record types) and get attribute-level
//! validation, bidirectional conversion to a storage-ready representation,
//! and relationship resolution (including self-referential and
//! forward-declared types) for free.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Field specifications** ([`field`]) - Per-attribute validation and
//!   serialization contracts
//! - **Schema construction** ([`schema`]) - The builder, option merging,
//!   and the process-wide type registry
//! - **Type references** ([`reference`]) - Lazy resolution of `"self"` and
//!   forward-declared targets, with pointer records for storage
//! - **Backref tracking** ([`backref`]) - Which (schema, field) pairs point
//!   at a given type
//! - **Documents** ([`document`]) - Runtime instances with validated
//!   attribute access
//! - **Validation** ([`validate`]) - The aggregate, non-short-circuiting
//!   validation walk
//! - **Codec** ([`codec`]) - Conversion between document graphs and storage
//!   maps
//! - **Store boundary** ([`client`], [`collection`]) - The async interface
//!   to external store clients and the persistence API on top of it
//! - **Error handling** ([`error`]) - Error families and result types
//!
//! # Example
//!
//! ```ignore
//! use docmodel_core::{
//!     document::Document,
//!     field::FieldSpec,
//!     schema::{SchemaBuilder, SchemaRegistry},
//! };
//!
//! let registry = SchemaRegistry::new();
//! let gardener = SchemaBuilder::new("Gardener")
//!     .field("name", FieldSpec::string().required())
//!     .field("instructor", FieldSpec::reference("self"))
//!     .register(&registry)?;
//!
//! let mut jones = Document::new(gardener.clone());
//! jones.set("name", "Mr. Jones")?;
//!
//! let mut jim = Document::new(gardener.clone());
//! jim.set("name", "Jim")?;
//! jim.set("instructor", jones)?;
//!
//! let storage_map = jim.to_storage()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod backref;
pub mod client;
pub mod codec;
pub mod collection;
pub mod document;
pub mod error;
pub mod field;
pub mod reference;
pub mod schema;
pub mod validate;
pub mod value;
