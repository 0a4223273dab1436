//! Field specifications: the validation and serialization contract for one
//! schema attribute.
//!
//! A [`FieldSpec`] is declared unbound, attached to its owning schema by the
//! builder, and from then on owns everything the layer knows about one
//! attribute: its kind, its constraints, how it validates values, and how it
//! converts them to and from the storage representation.
//!
//! # Example
//!
//! ```ignore
//! use docmodel_core::field::FieldSpec;
//!
//! let name = FieldSpec::string().required();
//! let acres = FieldSpec::float().min(0.0);
//! let flowers = FieldSpec::list(FieldSpec::reference("Flower"));
//! let instructor = FieldSpec::reference("self");
//! ```

use std::sync::{Arc, Weak};

use bson::{Binary, Bson, spec::BinarySubtype};

use crate::{
    codec,
    error::{CodecError, CodecResult, FieldError},
    reference::{PointerRecord, SELF_SYMBOL, TypeRef},
    schema::{ModelSchema, RegistryShared},
    value::Value,
};

/// The scalar types a simple field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// UTF-8 string.
    String,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float. Accepts integers by widening.
    Float,
    /// Boolean.
    Boolean,
    /// Millisecond-precision timestamp.
    DateTime,
    /// Universally unique identifier.
    Uuid,
    /// Opaque byte blob.
    Binary,
    /// String constrained to an email-address shape.
    Email,
    /// String constrained to a URL shape.
    Url,
}

impl ScalarKind {
    fn name(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "boolean",
            ScalarKind::DateTime => "datetime",
            ScalarKind::Uuid => "uuid",
            ScalarKind::Binary => "binary",
            ScalarKind::Email => "email",
            ScalarKind::Url => "url",
        }
    }
}

/// The shapes a container field can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerShape {
    /// Ordered sequence; order is preserved through storage.
    List,
    /// Collection of distinct elements.
    Set,
    /// String-keyed mapping.
    Dict,
    /// Lazily produced sequence; materialized as a list in memory and
    /// stored like one.
    Stream,
}

/// What kind of values a field holds.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A scalar with optional bounds and an optional closed set of choices.
    Simple {
        /// The declared scalar type.
        scalar: ScalarKind,
        /// Inclusive lower bound for numeric kinds.
        min: Option<f64>,
        /// Inclusive upper bound for numeric kinds.
        max: Option<f64>,
        /// Maximum length in characters (not bytes) for string kinds.
        length: Option<usize>,
        /// Closed set of admissible values, compared on the coerced type.
        choices: Vec<Value>,
    },
    /// Accepts data of any type.
    Dynamic,
    /// A homogeneous container of a fully specified element field.
    Container {
        /// Specification every element must satisfy.
        element: Box<FieldSpec>,
        /// The container's shape.
        shape: ContainerShape,
    },
    /// A relationship to another record type, possibly not yet declared.
    Reference {
        /// The target schema, symbolic until resolved.
        target: TypeRef,
        /// Inline the full nested document instead of a pointer record.
        embed: bool,
    },
}

/// The declaration of one schema attribute.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub(crate) name: String,
    pub(crate) owner: String,
    pub(crate) storage_key: Option<String>,
    pub(crate) kind: FieldKind,
    pub(crate) required: bool,
    pub(crate) default: Option<Value>,
    pub(crate) primary_key: bool,
    pub(crate) unique: bool,
    pub(crate) unique_with: Vec<String>,
}

impl FieldSpec {
    fn with_kind(kind: FieldKind) -> Self {
        Self {
            name: String::new(),
            owner: String::new(),
            storage_key: None,
            kind,
            required: false,
            default: None,
            primary_key: false,
            unique: false,
            unique_with: Vec::new(),
        }
    }

    fn simple(scalar: ScalarKind) -> Self {
        Self::with_kind(FieldKind::Simple {
            scalar,
            min: None,
            max: None,
            length: None,
            choices: Vec::new(),
        })
    }

    /// A UTF-8 string field.
    pub fn string() -> Self {
        Self::simple(ScalarKind::String)
    }

    /// A 64-bit integer field.
    pub fn integer() -> Self {
        Self::simple(ScalarKind::Integer)
    }

    /// A 64-bit float field.
    pub fn float() -> Self {
        Self::simple(ScalarKind::Float)
    }

    /// A boolean field.
    pub fn boolean() -> Self {
        Self::simple(ScalarKind::Boolean)
    }

    /// A timestamp field.
    pub fn datetime() -> Self {
        Self::simple(ScalarKind::DateTime)
    }

    /// A UUID field.
    pub fn uuid() -> Self {
        Self::simple(ScalarKind::Uuid)
    }

    /// A byte-blob field.
    pub fn binary() -> Self {
        Self::simple(ScalarKind::Binary)
    }

    /// A string field validated as an email address.
    pub fn email() -> Self {
        Self::simple(ScalarKind::Email)
    }

    /// A string field validated as a URL.
    pub fn url() -> Self {
        Self::simple(ScalarKind::Url)
    }

    /// A field accepting values of any type.
    pub fn dynamic() -> Self {
        Self::with_kind(FieldKind::Dynamic)
    }

    fn container(element: FieldSpec, shape: ContainerShape) -> Self {
        Self::with_kind(FieldKind::Container {
            element: Box::new(element),
            shape,
        })
    }

    /// An ordered list whose elements all satisfy `element`.
    pub fn list(element: FieldSpec) -> Self {
        Self::container(element, ContainerShape::List)
    }

    /// A collection of distinct elements satisfying `element`.
    pub fn set(element: FieldSpec) -> Self {
        Self::container(element, ContainerShape::Set)
    }

    /// A string-keyed mapping whose values all satisfy `element`.
    pub fn dict(element: FieldSpec) -> Self {
        Self::container(element, ContainerShape::Dict)
    }

    /// A stream of elements satisfying `element`.
    pub fn stream(element: FieldSpec) -> Self {
        Self::container(element, ContainerShape::Stream)
    }

    /// A pointer-style reference to the named type, or to `"self"`.
    pub fn reference(target: impl Into<String>) -> Self {
        Self::with_kind(FieldKind::Reference {
            target: TypeRef::new(target),
            embed: false,
        })
    }

    /// A reference to the named type whose document is inlined on
    /// serialization instead of stored as a pointer record.
    pub fn embedded(target: impl Into<String>) -> Self {
        Self::with_kind(FieldKind::Reference {
            target: TypeRef::new(target),
            embed: true,
        })
    }

    /// Marks the field as required: validation fails when it has neither a
    /// value nor a default.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Stores the field under `key` instead of its name.
    pub fn stored_as(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    /// Marks the field as the primary key. Primary keys always store under
    /// `_id`.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Declares a default value, returned by reads when the field is unset.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the field as unique. Uniqueness against persisted data is out
    /// of this layer's scope; the flag is carried for index declarations.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Declares that the field's value must differ from each of the named
    /// sibling fields on the same document. Implies `unique`.
    pub fn unique_with<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_with = fields.into_iter().map(Into::into).collect();
        self.unique = true;
        self
    }

    /// Sets the inclusive lower bound. No effect on non-simple kinds.
    pub fn min(mut self, bound: f64) -> Self {
        if let FieldKind::Simple { min, .. } = &mut self.kind {
            *min = Some(bound);
        }
        self
    }

    /// Sets the inclusive upper bound. No effect on non-simple kinds.
    pub fn max(mut self, bound: f64) -> Self {
        if let FieldKind::Simple { max, .. } = &mut self.kind {
            *max = Some(bound);
        }
        self
    }

    /// Sets the maximum length in characters. No effect on non-simple kinds.
    pub fn length(mut self, chars: usize) -> Self {
        if let FieldKind::Simple { length, .. } = &mut self.kind {
            *length = Some(chars);
        }
        self
    }

    /// Restricts the field to a closed set of values. No effect on
    /// non-simple kinds.
    pub fn choices<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        if let FieldKind::Simple { choices, .. } = &mut self.kind {
            *choices = values.into_iter().map(Into::into).collect();
        }
        self
    }

    /// The field's name, bound when its schema was built.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the schema owning this field.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The key this field stores under: the declared storage key, the
    /// field name, or `_id` for primary keys.
    pub fn storage_key(&self) -> &str {
        if self.primary_key {
            "_id"
        } else {
            self.storage_key.as_deref().unwrap_or(&self.name)
        }
    }

    /// The field's kind.
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether validation requires a value.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether this field is its schema's primary key.
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// The declared default, if any.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Binds the field to its owner. Containers bind their element under
    /// the container's own name, so element backrefs are attributed to the
    /// container field.
    pub(crate) fn bind(&mut self, owner: &str, name: &str, registry: &Weak<RegistryShared>) {
        self.name = name.to_string();
        self.owner = owner.to_string();
        match &mut self.kind {
            FieldKind::Reference { target, .. } => target.attach_registry(registry),
            FieldKind::Container { element, .. } => element.bind(owner, name, registry),
            _ => {}
        }
    }

    /// Resolves `"self"` references against the schema under construction.
    pub(crate) fn resolve_self(&self, schema: &Weak<ModelSchema>) {
        match &self.kind {
            FieldKind::Reference { target, .. } if target.symbol() == SELF_SYMBOL => {
                target.resolve_to(schema);
            }
            FieldKind::Container { element, .. } => element.resolve_self(schema),
            _ => {}
        }
    }

    /// The reference this field carries, looking through containers.
    pub fn type_ref(&self) -> Option<&TypeRef> {
        match &self.kind {
            FieldKind::Reference { target, .. } => Some(target),
            FieldKind::Container { element, .. } => element.type_ref(),
            _ => None,
        }
    }

    fn target_schema(&self) -> CodecResult<Arc<ModelSchema>> {
        match &self.kind {
            FieldKind::Reference { target, .. } => target
                .target(&self.owner, &self.name)
                .map_err(|_| CodecError::Unresolved(target.symbol().to_string())),
            _ => Err(CodecError::Unsupported {
                field: self.name.clone(),
                reason: "not a reference field".to_string(),
            }),
        }
    }

    /// Validates a value against the field's full contract: declared type,
    /// bounds, and choice membership. `Null` is always admissible here;
    /// required-ness is the validation walk's concern.
    ///
    /// # Errors
    ///
    /// The first applicable [`FieldError`]. Container element failures are
    /// aggregated into a single [`FieldError::Elements`].
    pub fn validate(&self, value: &Value) -> Result<(), FieldError> {
        self.check_value(value)?;
        self.check_choices(value)
    }

    /// Choice membership alone, on the already-coerced value.
    pub(crate) fn check_choices(&self, value: &Value) -> Result<(), FieldError> {
        if value.is_null() {
            return Ok(());
        }
        if let FieldKind::Simple { choices, .. } = &self.kind
            && !choices.is_empty()
            && !choices.contains(value)
        {
            return Err(FieldError::constraint(format!(
                "{} is not one of the declared choices",
                self.name
            )));
        }
        Ok(())
    }

    /// Type, bound, and shape checks, without choice membership.
    pub(crate) fn check_value(&self, value: &Value) -> Result<(), FieldError> {
        if value.is_null() {
            return Ok(());
        }
        match &self.kind {
            FieldKind::Simple {
                scalar,
                min,
                max,
                length,
                ..
            } => self.check_simple(*scalar, *min, *max, *length, value),
            FieldKind::Dynamic => Ok(()),
            FieldKind::Container { element, shape } => {
                self.check_container(element, *shape, value)
            }
            FieldKind::Reference { target, .. } => self.check_reference(target, value),
        }
    }

    fn mismatch(&self, expected: &str, value: &Value) -> FieldError {
        FieldError::TypeMismatch {
            actual: value.kind_name().to_string(),
            expected: expected.to_string(),
        }
    }

    fn check_simple(
        &self,
        scalar: ScalarKind,
        min: Option<f64>,
        max: Option<f64>,
        length: Option<usize>,
        value: &Value,
    ) -> Result<(), FieldError> {
        let numeric = match (scalar, value) {
            (ScalarKind::String | ScalarKind::Email | ScalarKind::Url, Value::String(s)) => {
                if let Some(limit) = length
                    && s.chars().count() > limit
                {
                    return Err(FieldError::constraint(format!(
                        "{} is longer than {limit} characters",
                        self.name
                    )));
                }
                match scalar {
                    ScalarKind::Email => {
                        let mut parts = s.splitn(2, '@');
                        let local = parts.next().unwrap_or_default();
                        let domain = parts.next().unwrap_or_default();
                        if local.is_empty() || domain.is_empty() {
                            return Err(FieldError::constraint(format!(
                                "{} is not a valid email address",
                                self.name
                            )));
                        }
                    }
                    ScalarKind::Url => {
                        let parts = s.split_once("://");
                        if !parts.is_some_and(|(scheme, rest)| {
                            !scheme.is_empty() && !rest.is_empty()
                        }) {
                            return Err(FieldError::constraint(format!(
                                "{} is not a valid URL",
                                self.name
                            )));
                        }
                    }
                    _ => {}
                }
                None
            }
            (ScalarKind::Integer, Value::Int(i)) => Some(*i as f64),
            // Floats accept integers by widening; the reverse is a mismatch.
            (ScalarKind::Float, Value::Float(f)) => Some(*f),
            (ScalarKind::Float, Value::Int(i)) => Some(*i as f64),
            (ScalarKind::Boolean, Value::Bool(_)) => None,
            (ScalarKind::DateTime, Value::DateTime(_)) => None,
            (ScalarKind::Uuid, Value::Uuid(_)) => None,
            (ScalarKind::Binary, Value::Bytes(_)) => None,
            _ => return Err(self.mismatch(scalar.name(), value)),
        };

        if let Some(n) = numeric {
            // Bounds are inclusive on both ends.
            if let Some(lower) = min
                && n < lower
            {
                return Err(FieldError::constraint(format!(
                    "{} is below the minimum of {lower}",
                    self.name
                )));
            }
            if let Some(upper) = max
                && n > upper
            {
                return Err(FieldError::constraint(format!(
                    "{} is above the maximum of {upper}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn check_container(
        &self,
        element: &FieldSpec,
        shape: ContainerShape,
        value: &Value,
    ) -> Result<(), FieldError> {
        let mut errors = Vec::new();
        match (shape, value) {
            (ContainerShape::List | ContainerShape::Stream, Value::List(items)) => {
                for (index, item) in items.iter().enumerate() {
                    if let Err(e) = element.validate(item) {
                        errors.push((index.to_string(), e));
                    }
                }
            }
            (ContainerShape::Set, Value::Set(items)) => {
                for (index, item) in items.iter().enumerate() {
                    if let Err(e) = element.validate(item) {
                        errors.push((index.to_string(), e));
                    } else if items[..index].contains(item) {
                        errors.push((
                            index.to_string(),
                            FieldError::constraint("duplicate element in set"),
                        ));
                    }
                }
            }
            (ContainerShape::Dict, Value::Dict(map)) => {
                for (key, item) in map {
                    if let Err(e) = element.validate(item) {
                        errors.push((key.clone(), e));
                    }
                }
            }
            (ContainerShape::List | ContainerShape::Stream, _) => {
                return Err(self.mismatch("list", value));
            }
            (ContainerShape::Set, _) => return Err(self.mismatch("set", value)),
            (ContainerShape::Dict, _) => return Err(self.mismatch("dict", value)),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            // A container is valid iff all of its elements are.
            Err(FieldError::Elements(errors))
        }
    }

    fn check_reference(&self, target: &TypeRef, value: &Value) -> Result<(), FieldError> {
        match value {
            Value::Document(instance) => {
                let schema = target.target(&self.owner, &self.name)?;
                if instance.schema().is_a(schema.name()) {
                    Ok(())
                } else {
                    Err(FieldError::TypeMismatch {
                        actual: instance.schema().name().to_string(),
                        expected: schema.name().to_string(),
                    })
                }
            }
            // A pointer is a placeholder: not an error while the target
            // type is still unresolved, checked by name once it is.
            Value::Pointer(pointer) => match target.target(&self.owner, &self.name) {
                Ok(schema) if pointer.type_name == schema.name() => Ok(()),
                Ok(schema) => match schema.registry_schema(&pointer.type_name) {
                    Some(pointed) if pointed.is_a(schema.name()) => Ok(()),
                    Some(_) => Err(FieldError::TypeMismatch {
                        actual: pointer.type_name.clone(),
                        expected: schema.name().to_string(),
                    }),
                    None => Ok(()),
                },
                Err(_) => Ok(()),
            },
            other => Err(self.mismatch(target.symbol(), other)),
        }
    }

    /// Converts a validated value to its storage form.
    ///
    /// Takes the value mutably because serializing a non-embedded reference
    /// materializes the referenced document's primary key, which must stay
    /// fixed for repeat serializations to point at the same identity.
    ///
    /// # Errors
    ///
    /// Fail-fast [`CodecError`]s; a shape mismatch here means validation
    /// was skipped.
    pub fn to_storage(&self, value: &mut Value) -> CodecResult<Bson> {
        if value.is_null() {
            return Ok(Bson::Null);
        }
        let unsupported = |reason: String| CodecError::Unsupported {
            field: self.name.clone(),
            reason,
        };

        match &self.kind {
            FieldKind::Simple { scalar, .. } => match (*scalar, &*value) {
                (
                    ScalarKind::String | ScalarKind::Email | ScalarKind::Url,
                    Value::String(s),
                ) => Ok(Bson::String(s.clone())),
                (ScalarKind::Integer, Value::Int(i)) => Ok(Bson::Int64(*i)),
                (ScalarKind::Float, Value::Float(f)) => Ok(Bson::Double(*f)),
                // Widen to the declared numeric kind.
                (ScalarKind::Float, Value::Int(i)) => Ok(Bson::Double(*i as f64)),
                (ScalarKind::Boolean, Value::Bool(b)) => Ok(Bson::Boolean(*b)),
                (ScalarKind::DateTime, Value::DateTime(dt)) => Ok(Bson::DateTime(*dt)),
                (ScalarKind::Uuid, Value::Uuid(u)) => Ok(Bson::from(*u)),
                (ScalarKind::Binary, Value::Bytes(b)) => Ok(Bson::Binary(Binary {
                    subtype: BinarySubtype::Generic,
                    bytes: b.clone(),
                })),
                (scalar, other) => Err(unsupported(format!(
                    "expected {}, got {}",
                    scalar.name(),
                    other.kind_name()
                ))),
            },
            FieldKind::Dynamic => value
                .to_bson()
                .ok_or_else(|| unsupported("dynamic value has no storage form".to_string())),
            FieldKind::Container { element, shape } => match (*shape, value) {
                (
                    ContainerShape::List | ContainerShape::Stream,
                    Value::List(items),
                )
                | (ContainerShape::Set, Value::Set(items)) => Ok(Bson::Array(
                    items
                        .iter_mut()
                        .map(|item| element.to_storage(item))
                        .collect::<CodecResult<Vec<_>>>()?,
                )),
                (ContainerShape::Dict, Value::Dict(map)) => {
                    let mut out = bson::Document::new();
                    for (key, item) in map.iter_mut() {
                        out.insert(key.clone(), element.to_storage(item)?);
                    }
                    Ok(Bson::Document(out))
                }
                (shape, other) => Err(unsupported(format!(
                    "expected {shape:?} container, got {}",
                    other.kind_name()
                ))),
            },
            FieldKind::Reference { embed: false, .. } => match value {
                Value::Document(instance) => {
                    // Resolution must have happened for the value to be
                    // valid; retry once more so the error names the symbol.
                    self.target_schema()?;
                    let mut id = instance.pk().ok_or_else(|| {
                        unsupported("referenced document has no primary key".to_string())
                    })?;
                    let pk_spec = instance.schema().primary_key_field().clone();
                    let id = pk_spec.to_storage(&mut id)?;
                    let pointer = PointerRecord::new(
                        instance.schema().name(),
                        id,
                        instance.schema().meta().database.name.clone(),
                    );
                    Ok(Bson::Document(pointer.to_storage()))
                }
                Value::Pointer(pointer) => Ok(Bson::Document(pointer.to_storage())),
                other => Err(unsupported(format!(
                    "expected document or pointer, got {}",
                    other.kind_name()
                ))),
            },
            FieldKind::Reference { embed: true, .. } => match value {
                Value::Document(instance) => Ok(Bson::Document(
                    codec::to_storage_document(instance)?,
                )),
                Value::Pointer(_) => Err(unsupported(
                    "embedded reference holds an undereferenced pointer".to_string(),
                )),
                other => Err(unsupported(format!(
                    "expected document, got {}",
                    other.kind_name()
                ))),
            },
        }
    }

    /// Converts a stored value back to its in-memory form.
    ///
    /// Non-embedded references come back as lazy [`Value::Pointer`] handles;
    /// dereferencing is an explicit store operation.
    ///
    /// # Errors
    ///
    /// Fail-fast [`CodecError`]s when the stored value does not match the
    /// declared kind, or when an embedded reference's target type is still
    /// unresolved.
    pub fn to_memory(&self, stored: &Bson) -> CodecResult<Value> {
        if matches!(stored, Bson::Null) {
            return Ok(Value::Null);
        }
        let decode = |reason: String| CodecError::Decode {
            field: self.name.clone(),
            reason,
        };

        match &self.kind {
            FieldKind::Simple { scalar, .. } => match (*scalar, stored) {
                (
                    ScalarKind::String | ScalarKind::Email | ScalarKind::Url,
                    Bson::String(s),
                ) => Ok(Value::String(s.clone())),
                (ScalarKind::Integer, Bson::Int32(i)) => Ok(Value::Int(i64::from(*i))),
                (ScalarKind::Integer, Bson::Int64(i)) => Ok(Value::Int(*i)),
                (ScalarKind::Float, Bson::Double(f)) => Ok(Value::Float(*f)),
                (ScalarKind::Float, Bson::Int32(i)) => Ok(Value::Float(f64::from(*i))),
                (ScalarKind::Float, Bson::Int64(i)) => Ok(Value::Float(*i as f64)),
                (ScalarKind::Boolean, Bson::Boolean(b)) => Ok(Value::Bool(*b)),
                (ScalarKind::DateTime, Bson::DateTime(dt)) => Ok(Value::DateTime(*dt)),
                (ScalarKind::Uuid, Bson::Binary(binary))
                    if binary.subtype == BinarySubtype::Uuid =>
                {
                    <[u8; 16]>::try_from(binary.bytes.as_slice())
                        .map(|bytes| Value::Uuid(bson::Uuid::from_bytes(bytes)))
                        .map_err(|_| decode("malformed uuid bytes".to_string()))
                }
                (ScalarKind::Binary, Bson::Binary(binary)) => {
                    Ok(Value::Bytes(binary.bytes.clone()))
                }
                (scalar, other) => Err(decode(format!(
                    "expected {}, got {other}",
                    scalar.name()
                ))),
            },
            FieldKind::Dynamic => Ok(Value::from_bson(stored)),
            FieldKind::Container { element, shape } => match (*shape, stored) {
                (ContainerShape::List | ContainerShape::Stream, Bson::Array(items)) => {
                    Ok(Value::List(
                        items
                            .iter()
                            .map(|item| element.to_memory(item))
                            .collect::<CodecResult<Vec<_>>>()?,
                    ))
                }
                (ContainerShape::Set, Bson::Array(items)) => Ok(Value::Set(
                    items
                        .iter()
                        .map(|item| element.to_memory(item))
                        .collect::<CodecResult<Vec<_>>>()?,
                )),
                (ContainerShape::Dict, Bson::Document(map)) => Ok(Value::Dict(
                    map.iter()
                        .map(|(k, v)| Ok((k.clone(), element.to_memory(v)?)))
                        .collect::<CodecResult<_>>()?,
                )),
                (shape, other) => Err(decode(format!(
                    "expected {shape:?} container, got {other}"
                ))),
            },
            FieldKind::Reference { embed: false, .. } => match stored {
                Bson::Document(map) => PointerRecord::from_storage(map)
                    .map(Value::Pointer)
                    .ok_or_else(|| decode("expected a pointer record".to_string())),
                other => Err(decode(format!("expected a pointer record, got {other}"))),
            },
            FieldKind::Reference { embed: true, .. } => match stored {
                Bson::Document(map) => {
                    let schema = self.target_schema()?;
                    Ok(Value::Document(Box::new(codec::from_storage_document(
                        &schema, map,
                    )?)))
                }
                other => Err(decode(format!("expected an embedded document, got {other}"))),
            },
        }
    }
}
