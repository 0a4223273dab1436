//! Convenient re-exports of commonly used types from docmodel.
//!
//! Import this prelude module to quickly access the most frequently used
//! types without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```
//!
//! This provides access to:
//! - Schema declaration (builder, registry, options)
//! - Field specifications and values
//! - Documents and pointer records
//! - The store client boundary and collections
//! - Error types

pub use docmodel_core::{
    client::StoreClient,
    collection::{Collection, DocumentStore},
    document::Document,
    error::{
        CodecError, CodecResult, FieldError, SchemaError, SchemaResult, StoreError, StoreResult,
        ValidationErrors,
    },
    field::{ContainerShape, FieldKind, FieldSpec, ScalarKind},
    reference::{PointerRecord, TypeRef},
    schema::{DbAddress, Meta, ModelSchema, SchemaBuilder, SchemaRegistry},
    value::Value,
};
