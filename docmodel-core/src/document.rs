//! Runtime document instances.
//!
//! A [`Document`] is one record of a declared type: a mapping from field
//! name to validated value, owned exclusively by the instance. There is no
//! implicit sharing between documents; assigning one document to another's
//! reference field stores an owned copy.
//!
//! Attribute access is routed through the schema's field specifications:
//! [`set`](Document::set) validates eagerly, [`get`](Document::get) falls
//! back to the declared default, and [`clear`](Document::clear) keeps the
//! backref registry consistent when a reference value is removed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    backref::BackrefError,
    codec,
    error::{CodecResult, FieldError, ValidationErrors},
    field::{FieldKind, ScalarKind},
    schema::ModelSchema,
    validate,
    value::Value,
};

/// One record of a declared type.
#[derive(Debug, Clone)]
pub struct Document {
    schema: Arc<ModelSchema>,
    values: HashMap<String, Value>,
}

impl Document {
    /// Creates an empty document of the given type.
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        Self {
            schema,
            values: HashMap::new(),
        }
    }

    /// The schema this document is an instance of.
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// Assigns a field value, validating it against the field's contract.
    ///
    /// Setting a reference field retries target resolution first. While the
    /// target type is still undeclared the value is accepted provisionally;
    /// it is checked by the next `validate` or serialization once the
    /// target resolves.
    ///
    /// # Errors
    ///
    /// [`FieldError::UnknownField`] for names the schema does not declare,
    /// otherwise the first failure from the field's own validation.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), FieldError> {
        let schema = self.schema.clone();
        let spec = schema.field(field).ok_or(FieldError::UnknownField)?;
        let value = value.into();

        match spec.type_ref() {
            // Not yet an error while the target stays undeclared;
            // resolution may still happen.
            Some(reference) if reference.target(spec.owner(), spec.name()).is_err() => {}
            _ => spec.validate(&value)?,
        }

        self.values.insert(field.to_string(), value);
        Ok(())
    }

    /// Reads a field value: the assigned value if any, otherwise the
    /// field's declared default. `None` when neither exists or the field
    /// is unknown.
    ///
    /// Defaults are not materialized into the document by reads; only the
    /// primary key is fixed on first read, by [`pk`](Document::pk).
    pub fn get(&self, field: &str) -> Option<Value> {
        match self.values.get(field) {
            Some(value) => Some(value.clone()),
            None => self
                .schema
                .field(field)
                .and_then(|spec| spec.default().cloned()),
        }
    }

    /// Removes a field's value, returning it.
    ///
    /// Removing the value of a resolved reference field also removes its
    /// backref entry.
    ///
    /// # Errors
    ///
    /// [`BackrefError::MissingEntry`] when the reference's entry is already
    /// gone. Removing twice is reported, not silently accepted, because it
    /// signals that the registry and the schema graph disagree.
    pub fn clear(&mut self, field: &str) -> Result<Option<Value>, BackrefError> {
        let schema = self.schema.clone();
        let Some(spec) = schema.field(field) else {
            return Ok(None);
        };

        if let Some(reference) = spec.type_ref()
            && reference.is_resolved()
        {
            let target = match reference.target(spec.owner(), spec.name()) {
                Ok(target) => target.name().to_string(),
                Err(_) => reference.symbol().to_string(),
            };
            schema.remove_backref(&target, spec.name())?;
        }

        Ok(self.values.remove(field))
    }

    /// The document's primary key.
    ///
    /// For identity-style keys (UUID primary keys without an assigned
    /// value) a fresh identity is generated, stored, and returned; repeat
    /// reads see the same value. Returns `None` when the key is neither
    /// assigned nor generatable.
    pub fn pk(&mut self) -> Option<Value> {
        let schema = self.schema.clone();
        let spec = schema.primary_key_field();

        if let Some(value) = self.values.get(spec.name())
            && !value.is_null()
        {
            return Some(value.clone());
        }

        let generated = spec.default().cloned().or_else(|| match spec.kind() {
            FieldKind::Simple {
                scalar: ScalarKind::Uuid,
                ..
            } => Some(Value::Uuid(bson::Uuid::new())),
            _ => None,
        })?;

        // Fixed for the document's lifetime from here on.
        self.values.insert(spec.name().to_string(), generated.clone());
        Some(generated)
    }

    /// Validates every field, aggregating all violations.
    ///
    /// Non-mutating except for primary-key materialization, which counts as
    /// the key's first read.
    ///
    /// # Errors
    ///
    /// A [`ValidationErrors`] aggregate mapping field names to their
    /// failures. The walk never stops at the first failure.
    pub fn validate(&mut self) -> Result<&Self, ValidationErrors> {
        validate::check_document(self)?;
        Ok(self)
    }

    /// Serializes to the storage-map form, validating first.
    pub fn to_storage(&mut self) -> CodecResult<bson::Document> {
        codec::to_storage_document(self)
    }

    /// Reconstructs a document from its storage-map form.
    pub fn from_storage(
        schema: &Arc<ModelSchema>,
        stored: &bson::Document,
    ) -> CodecResult<Document> {
        codec::from_storage_document(schema, stored)
    }

    pub(crate) fn stored(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub(crate) fn stored_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.values.get_mut(field)
    }

    pub(crate) fn insert_raw(&mut self, field: String, value: Value) {
        self.values.insert(field, value);
    }
}

/// Field-wise equality over the union of stored values and defaults.
/// Expensive for documents with deeply nested values; use accordingly.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name()
            && self
                .schema
                .fields()
                .iter()
                .all(|spec| self.get(spec.name()) == other.get(spec.name()))
    }
}
