//! The document validation walk.
//!
//! Walks every field of a document's schema in order, running four
//! independent checks per field and collecting all failures instead of
//! stopping at the first: required-ness, choice membership, intra-document
//! `unique_with` equality, and the field's own validation. The aggregate is
//! the only error a caller of `validate` ever sees.

use crate::{
    document::Document,
    error::{FieldError, ValidationErrors},
};

/// Validates `doc` against its schema, collecting every violation.
///
/// Primary-key presence is an implicit required check; reading the key here
/// is what materializes lazy identities, the walk's only mutation.
/// [`Document::validate`] is the usual entry point.
pub fn check_document(doc: &mut Document) -> Result<(), ValidationErrors> {
    let schema = doc.schema().clone();
    let mut errors = ValidationErrors::new();

    if doc.pk().is_none() {
        errors.push(
            schema.primary_key_field().name(),
            FieldError::constraint("document is missing a primary key"),
        );
    }

    for spec in schema.fields() {
        let current = doc.get(spec.name()).filter(|value| !value.is_null());

        if spec.is_required() && current.is_none() {
            errors.push(
                spec.name(),
                FieldError::constraint(format!("{} is required", spec.name())),
            );
        }

        let Some(value) = current else { continue };

        if let Err(e) = spec.check_choices(&value) {
            errors.push(spec.name(), e);
        }

        // Uniqueness within this document's own field values only; nothing
        // here consults persisted data.
        for sibling in &spec.unique_with {
            let other = doc.get(sibling).filter(|value| !value.is_null());
            if other.as_ref() == Some(&value) {
                errors.push(
                    spec.name(),
                    FieldError::constraint(format!(
                        "{} is not unique with field {sibling}",
                        spec.name()
                    )),
                );
            }
        }

        if let Err(e) = spec.check_value(&value) {
            errors.push(spec.name(), e);
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
