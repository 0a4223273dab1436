//! Conversion between document graphs and their storage-map form.
//!
//! Serialization is only ever attempted on a valid document:
//! [`to_storage_document`] validates first and fails fast on inconsistent
//! input, before anything touches the store. Deserialization is lenient
//! about missing keys, falling back to declared defaults so older stored
//! documents keep loading after a schema gains fields.

use std::sync::Arc;

use bson::Bson;

use crate::{document::Document, error::CodecResult, schema::ModelSchema};

/// Serializes a document into its storage map: one entry per schema field,
/// keyed by the field's storage key.
///
/// Takes the document mutably because serialization materializes lazy
/// primary keys, both the document's own and those of referenced documents
/// (a pointer record must name the same identity every time it is emitted).
///
/// # Errors
///
/// [`CodecError::Validation`](crate::error::CodecError::Validation) when
/// the document is invalid; other [`CodecError`](crate::error::CodecError)
/// variants indicate a broken resolver invariant and are never aggregated.
pub fn to_storage_document(doc: &mut Document) -> CodecResult<bson::Document> {
    doc.validate()?;

    let schema = doc.schema().clone();
    let mut out = bson::Document::new();

    for spec in schema.fields() {
        let stored = match doc.stored_mut(spec.name()) {
            Some(value) => spec.to_storage(value)?,
            None => match spec.default() {
                Some(default) => spec.to_storage(&mut default.clone())?,
                None => Bson::Null,
            },
        };
        out.insert(spec.storage_key().to_string(), stored);
    }

    Ok(out)
}

/// Reconstructs a document from its storage map.
///
/// Each declared field is looked up by storage key. A missing key falls
/// back to the field's declared default; an explicit stored null leaves the
/// field unset.
///
/// # Errors
///
/// Fail-fast [`CodecError`](crate::error::CodecError)s when a stored value
/// does not decode into its field's declared type.
pub fn from_storage_document(
    schema: &Arc<ModelSchema>,
    stored: &bson::Document,
) -> CodecResult<Document> {
    let mut doc = Document::new(schema.clone());

    for spec in schema.fields() {
        match stored.get(spec.storage_key()) {
            Some(Bson::Null) => {}
            Some(value) => {
                let value = spec.to_memory(value)?;
                doc.insert_raw(spec.name().to_string(), value);
            }
            None => {
                if let Some(default) = spec.default() {
                    doc.insert_raw(spec.name().to_string(), default.clone());
                }
            }
        }
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;
    use crate::{
        error::CodecError,
        field::FieldSpec,
        schema::{SchemaBuilder, SchemaRegistry},
        value::Value,
    };

    fn registry_with_book() -> (SchemaRegistry, Arc<ModelSchema>) {
        let registry = SchemaRegistry::new();
        let book = SchemaBuilder::new("Book")
            .field("title", FieldSpec::string().required())
            .field("author", FieldSpec::string().stored_as("written_by"))
            .field("pages", FieldSpec::integer().default_value(1))
            .register(&registry)
            .unwrap();
        (registry, book)
    }

    #[test]
    fn emits_one_entry_per_field_keyed_by_storage_key() {
        let (_registry, book) = registry_with_book();
        let mut doc = Document::new(book);
        doc.set("title", "Moby Dick").unwrap();
        doc.set("author", "Charles Dickens").unwrap();

        let stored = to_storage_document(&mut doc).unwrap();

        assert!(stored.get("_id").is_some());
        assert_eq!(stored.get("title"), Some(&Bson::String("Moby Dick".into())));
        assert_eq!(
            stored.get("written_by"),
            Some(&Bson::String("Charles Dickens".into()))
        );
        assert_eq!(stored.get("author"), None);
        // The unset field serializes through its default.
        assert_eq!(stored.get("pages"), Some(&Bson::Int64(1)));
        assert_eq!(stored.len(), 4);
    }

    #[test]
    fn serialization_validates_first() {
        let (_registry, book) = registry_with_book();
        let mut doc = Document::new(book);

        match to_storage_document(&mut doc) {
            Err(CodecError::Validation(errors)) => {
                assert!(errors.field("title").is_some());
            }
            other => panic!("expected a validation failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let (_registry, book) = registry_with_book();
        // An older stored document from before "pages" existed.
        let stored = doc! { "title": "The Stand", "written_by": "Steven King" };

        let doc = from_storage_document(&book, &stored).unwrap();
        assert_eq!(doc.get("title"), Some(Value::from("The Stand")));
        assert_eq!(doc.get("author"), Some(Value::from("Steven King")));
        assert_eq!(doc.get("pages"), Some(Value::Int(1)));
    }

    #[test]
    fn stored_null_leaves_the_field_unset() {
        let (_registry, book) = registry_with_book();
        let stored = doc! { "title": "Untitled", "written_by": Bson::Null };

        let doc = from_storage_document(&book, &stored).unwrap();
        assert_eq!(doc.stored("author"), None);
    }

    #[test]
    fn round_trip_preserves_accepted_values() {
        let (_registry, book) = registry_with_book();
        let mut doc = Document::new(book.clone());
        doc.set("title", "Moby Dick").unwrap();
        doc.set("pages", 635).unwrap();
        doc.pk().unwrap();

        let stored = to_storage_document(&mut doc).unwrap();
        let mut back = from_storage_document(&book, &stored).unwrap();

        assert_eq!(back, doc);
        assert!(back.validate().is_ok());
    }

    #[test]
    fn wrong_stored_type_is_a_decode_error() {
        let (_registry, book) = registry_with_book();
        let stored = doc! { "title": "x", "pages": "not a number" };

        match from_storage_document(&book, &stored) {
            Err(CodecError::Decode { field, .. }) => assert_eq!(field, "pages"),
            other => panic!("expected a decode failure, got {other:?}"),
        }
    }
}
