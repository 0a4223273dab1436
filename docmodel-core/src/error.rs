//! Error types and result aliases for the schema layer.
//!
//! Errors are split by family: [`SchemaError`] for malformed type declarations
//! (fatal at declaration time), [`FieldError`] for per-field validation
//! failures (always collected into a [`ValidationErrors`] aggregate, never
//! thrown individually mid-walk), [`CodecError`] for fail-fast serialization
//! failures, and [`StoreError`] for the storage-client boundary.

use std::fmt;

use thiserror::Error;

use crate::backref::BackrefError;

/// A malformed type declaration. Fatal at declaration time; the registry is
/// left untouched when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The declaration names more than one parent schema.
    #[error("Multiple inheritance not allowed for type {0}")]
    MultipleInheritance(String),
    /// A declared field reuses a reserved name (`pk`, `validate`, `save`,
    /// `delete`, or the identity field's canonical name `_id`).
    #[error("Field name {field} is reserved (type {name})")]
    ReservedName {
        /// The type being declared.
        name: String,
        /// The offending field name.
        field: String,
    },
    /// More than one field is marked as the primary key.
    #[error("Type {name} declares more than one primary key (field {field})")]
    DuplicatePrimaryKey {
        /// The type being declared.
        name: String,
        /// The second primary-key field encountered.
        field: String,
    },
    /// A schema with this name is already registered.
    #[error("Type {0} is already registered")]
    DuplicateType(String),
}

/// A specialized `Result` type for schema declaration.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A single field-level validation failure.
///
/// These are collected per field by the validation walk and surfaced to
/// callers only inside a [`ValidationErrors`] aggregate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// The value's type does not match the field's declared type.
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        /// Type name of the offending value.
        actual: String,
        /// Type name the field declares.
        expected: String,
    },
    /// The value violates a declared constraint (bounds, length, choices,
    /// required, uniqueness within the document).
    #[error("{reason}")]
    Constraint {
        /// Human-readable reason, one line.
        reason: String,
    },
    /// A reference field was exercised while its target type is still
    /// unresolved. Recoverable: declare the missing type and retry.
    #[error("reference target {symbol} is not resolved")]
    Unresolved {
        /// The symbolic name the reference was declared with.
        symbol: String,
    },
    /// The named field is not declared on the schema.
    #[error("no such field")]
    UnknownField,
    /// One or more container elements failed validation. A container is
    /// valid iff all of its elements are valid.
    #[error("invalid elements: {}", format_elements(.0))]
    Elements(Vec<(String, FieldError)>),
}

impl FieldError {
    pub(crate) fn constraint(reason: impl Into<String>) -> Self {
        FieldError::Constraint {
            reason: reason.into(),
        }
    }
}

fn format_elements(errors: &[(String, FieldError)]) -> String {
    errors
        .iter()
        .map(|(at, e)| format!("[{at}]: {e}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The aggregate error returned by document validation.
///
/// Wraps a mapping from field name to the list of per-field errors found in
/// one validation pass. Renders as one line per offending field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors {
    errors: Vec<(String, Vec<FieldError>)>,
}

impl ValidationErrors {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records a failure for the named field.
    pub(crate) fn push(&mut self, field: &str, error: FieldError) {
        if let Some((_, list)) = self.errors.iter_mut().find(|(name, _)| name == field) {
            list.push(error);
        } else {
            self.errors.push((field.to_string(), vec![error]));
        }
    }

    /// True when the pass found no failures.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of offending fields.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The failures recorded for one field, if any.
    pub fn field(&self, name: &str) -> Option<&[FieldError]> {
        self.errors
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, list)| list.as_slice())
    }

    /// Iterates over `(field name, failures)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldError])> {
        self.errors
            .iter()
            .map(|(name, list)| (name.as_str(), list.as_slice()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Document failed to validate")?;
        for (name, list) in &self.errors {
            let reasons = list
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            write!(f, "\n{name}: {reasons}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// A fail-fast serialization or deserialization error.
///
/// Unlike validation failures these are never aggregated: they indicate that
/// validation was skipped or a resolver invariant was broken before the
/// codec ran.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The document failed validation before serialization was attempted.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    /// A reference field was serialized or deserialized while its target
    /// type is still unresolved.
    #[error("Unresolved reference target {0}")]
    Unresolved(String),
    /// The in-memory value cannot be represented in the storage form the
    /// field declares.
    #[error("Cannot encode field {field}: {reason}")]
    Unsupported {
        /// Field whose conversion failed.
        field: String,
        /// What went wrong.
        reason: String,
    },
    /// A stored value does not decode into the field's declared type.
    #[error("Cannot decode field {field}: {reason}")]
    Decode {
        /// Field whose conversion failed.
        field: String,
        /// What went wrong.
        reason: String,
    },
}

/// A specialized `Result` type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors surfaced at the boundary with the external store client.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error during connection establishment.
    #[error("Connection error: {0}")]
    Connection(String),
    /// An error reported by the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
    /// No document matched the query.
    #[error("No matching documents in collection {0}")]
    NotFound(String),
    /// More than one document matched a query expected to be unique.
    #[error("Multiple matching documents ({matches}) in collection {collection}")]
    Ambiguous {
        /// Collection queried.
        collection: String,
        /// Number of matches found.
        matches: usize,
    },
    /// The document has no primary key and the operation needs one.
    #[error("Document has no primary key")]
    MissingPrimaryKey,
    /// Conversion to or from the storage representation failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Backref bookkeeping failed, signalling a consistency bug.
    #[error(transparent)]
    Backref(#[from] BackrefError),
}

/// A specialized `Result` type for store-boundary operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<ValidationErrors> for StoreError {
    fn from(errors: ValidationErrors) -> Self {
        StoreError::Codec(CodecError::Validation(errors))
    }
}
