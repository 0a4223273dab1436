//! Schema construction and the process-wide type registry.
//!
//! A [`ModelSchema`] is the compiled description of one record type: its
//! fields in declaration order, its merged options, and its primary key. It
//! is built exactly once by a [`SchemaBuilder`] when the type is declared
//! and is immutable afterwards, except for deferred reference resolution,
//! which mutates only the pending [`TypeRef`](crate::reference::TypeRef)
//! slots.
//!
//! The [`SchemaRegistry`] is the namespace schemas are declared into. It is
//! a cheap clone-able handle over shared state; one lock guards both the
//! schema map and the backref registry.
//!
//! # Example
//!
//! ```ignore
//! use docmodel_core::{field::FieldSpec, schema::{SchemaBuilder, SchemaRegistry}};
//!
//! let registry = SchemaRegistry::new();
//! let gardener = SchemaBuilder::new("Gardener")
//!     .field("name", FieldSpec::string().required())
//!     .field("instructor", FieldSpec::reference("self"))
//!     .register(&registry)?;
//! # Ok::<(), docmodel_core::error::SchemaError>(())
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, Weak},
};

use serde::{Deserialize, Serialize};

use crate::{
    backref::{BackrefError, BackrefRegistry},
    error::{SchemaError, SchemaResult},
    field::FieldSpec,
};

/// Field names that cannot be declared because the document API claims them.
const RESERVED_NAMES: [&str; 5] = ["pk", "validate", "save", "delete", "_id"];

/// Canonical name (and storage key) of the synthesized identity field.
pub const IDENTITY_FIELD: &str = "_id";

/// An opaque connection descriptor naming which database a schema's
/// documents flow through. The core never opens sockets itself; this is
/// only used to pick a store-client connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbAddress {
    /// Database name; empty means "not bound to a named database".
    pub name: String,
    /// Host the database lives on.
    pub host: String,
    /// Port the database listens on.
    pub port: u16,
}

impl DbAddress {
    /// Builds a connection descriptor.
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }
}

impl Default for DbAddress {
    fn default() -> Self {
        Self {
            name: String::new(),
            host: "localhost".to_string(),
            port: 27017,
        }
    }
}

/// Per-schema options. Merged by inheritance: the child overrides the
/// parent per key and inherits the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Field names to index. Carried for index declarations, not enforced
    /// by the core.
    pub index: Vec<String>,
    /// Maximum serialized document size in bytes. Carried, not enforced.
    pub max_size: u64,
    /// Which database this schema's documents flow through.
    pub database: DbAddress,
    /// Write concern handed to the store client at save time.
    pub write_concern: u32,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            index: Vec::new(),
            max_size: 10_000_000,
            database: DbAddress::default(),
            write_concern: 1,
        }
    }
}

/// Locally declared meta keys; `None` means "inherit".
#[derive(Debug, Clone, Default)]
struct MetaOverrides {
    index: Option<Vec<String>>,
    max_size: Option<u64>,
    database: Option<DbAddress>,
    write_concern: Option<u32>,
}

impl MetaOverrides {
    fn apply(&self, base: &Meta) -> Meta {
        Meta {
            index: self.index.clone().unwrap_or_else(|| base.index.clone()),
            max_size: self.max_size.unwrap_or(base.max_size),
            database: self
                .database
                .clone()
                .unwrap_or_else(|| base.database.clone()),
            write_concern: self.write_concern.unwrap_or(base.write_concern),
        }
    }
}

/// The state every registry handle shares: the schema namespace and the
/// backref registry, guarded together by a single lock.
#[derive(Debug, Default)]
pub(crate) struct RegistryShared {
    inner: Mutex<RegistryInner>,
}

#[derive(Debug, Default)]
pub(crate) struct RegistryInner {
    pub(crate) schemas: HashMap<String, Arc<ModelSchema>>,
    pub(crate) backrefs: BackrefRegistry,
}

impl RegistryShared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// A clone-able handle to a schema namespace.
///
/// Clones share the same underlying state, so types declared through one
/// handle are visible through every clone.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    shared: Arc<RegistryShared>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a schema by name.
    pub fn get(&self, name: &str) -> Option<Arc<ModelSchema>> {
        self.shared.lock().schemas.get(name).cloned()
    }

    /// True when a schema with this name has been declared.
    pub fn contains(&self, name: &str) -> bool {
        self.shared.lock().schemas.contains_key(name)
    }

    /// The `(owner schema, field name)` pairs whose reference fields have
    /// resolved to `target`.
    pub fn backrefs(&self, target: &str) -> Vec<(String, String)> {
        self.shared.lock().backrefs.lookup(target)
    }

    pub(crate) fn shared(&self) -> &Arc<RegistryShared> {
        &self.shared
    }
}

/// The compiled description of one record type.
#[derive(Debug)]
pub struct ModelSchema {
    name: String,
    parent: Option<Arc<ModelSchema>>,
    fields: Vec<FieldSpec>,
    meta: Meta,
    primary_key: usize,
    registry: Weak<RegistryShared>,
}

impl ModelSchema {
    /// The type's name. Doubles as its collection name in the store.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The collection this schema's documents persist into.
    pub fn collection_name(&self) -> &str {
        &self.name
    }

    /// The parent schema, if the type was declared with one.
    pub fn parent(&self) -> Option<&Arc<ModelSchema>> {
        self.parent.as_ref()
    }

    /// The schema's fields, inherited first, in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name() == name)
    }

    /// The schema's merged options.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// The field holding the primary key. Every schema has exactly one.
    pub fn primary_key_field(&self) -> &FieldSpec {
        &self.fields[self.primary_key]
    }

    /// True when this schema is `ancestor` or inherits from it.
    pub fn is_a(&self, ancestor: &str) -> bool {
        self.name == ancestor
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_a(ancestor))
    }

    pub(crate) fn shared_registry(&self) -> Option<Arc<RegistryShared>> {
        self.registry.upgrade()
    }

    /// Looks up another schema in the registry this one was declared in.
    pub(crate) fn registry_schema(&self, name: &str) -> Option<Arc<ModelSchema>> {
        self.shared_registry()
            .and_then(|shared| shared.lock().schemas.get(name).cloned())
    }

    pub(crate) fn remove_backref(
        &self,
        target: &str,
        field: &str,
    ) -> Result<(), BackrefError> {
        match self.shared_registry() {
            Some(shared) => shared.lock().backrefs.remove(target, &self.name, field),
            None => Err(BackrefError::MissingEntry {
                target: target.to_string(),
                owner: self.name.clone(),
                field: field.to_string(),
            }),
        }
    }
}

/// Builds one [`ModelSchema`] from a type declaration.
///
/// Collects the locally declared fields, options, and (at most one) parent,
/// then compiles and registers the schema atomically: either the type
/// becomes visible as a whole or the registry is left untouched.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    parents: Vec<Arc<ModelSchema>>,
    fields: Vec<(String, FieldSpec)>,
    meta: MetaOverrides,
}

impl SchemaBuilder {
    /// Starts a declaration for the named type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            fields: Vec::new(),
            meta: MetaOverrides::default(),
        }
    }

    /// Declares the parent schema. Declaring more than one makes
    /// [`register`](Self::register) fail; there is no multiple inheritance.
    pub fn parent(mut self, parent: &Arc<ModelSchema>) -> Self {
        self.parents.push(parent.clone());
        self
    }

    /// Declares a field. Redeclaring an inherited name replaces the
    /// inherited field; it does not stack.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    /// Overrides the inherited index list.
    pub fn index<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meta.index = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Overrides the inherited maximum document size.
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.meta.max_size = Some(bytes);
        self
    }

    /// Overrides the inherited connection descriptor.
    pub fn database(mut self, database: DbAddress) -> Self {
        self.meta.database = Some(database);
        self
    }

    /// Overrides the inherited write concern.
    pub fn write_concern(mut self, write_concern: u32) -> Self {
        self.meta.write_concern = Some(write_concern);
        self
    }

    /// Compiles the declaration and registers it.
    ///
    /// Inherited fields carry over unless redeclared; options merge child
    /// over parent; `"self"` references resolve to the schema being built;
    /// and an identity field is synthesized when no declared field is
    /// marked as the primary key.
    ///
    /// # Errors
    ///
    /// [`SchemaError`] on multiple parents, reserved or duplicate primary
    /// keys, reserved field names, or a name collision in the registry. On
    /// error nothing is registered.
    pub fn register(self, registry: &SchemaRegistry) -> SchemaResult<Arc<ModelSchema>> {
        if self.parents.len() > 1 {
            return Err(SchemaError::MultipleInheritance(self.name));
        }
        let parent = self.parents.into_iter().next();

        for (field, _) in &self.fields {
            if RESERVED_NAMES.contains(&field.as_str()) {
                return Err(SchemaError::ReservedName {
                    name: self.name,
                    field: field.clone(),
                });
            }
        }

        let meta = self
            .meta
            .apply(parent.as_ref().map_or(&Meta::default(), |p| p.meta()));

        // Inherited fields first, then local declarations; a redeclared
        // name replaces the inherited field in place.
        let mut fields: Vec<(String, FieldSpec)> = parent
            .as_ref()
            .map(|p| {
                p.fields()
                    .iter()
                    .map(|spec| (spec.name().to_string(), spec.clone()))
                    .collect()
            })
            .unwrap_or_default();
        for (field, spec) in self.fields {
            match fields.iter_mut().find(|(existing, _)| *existing == field) {
                Some(slot) => slot.1 = spec,
                None => fields.push((field, spec)),
            }
        }

        let mut primary_key = None;
        for (index, (field, spec)) in fields.iter().enumerate() {
            if spec.primary_key {
                if primary_key.is_some() {
                    return Err(SchemaError::DuplicatePrimaryKey {
                        name: self.name,
                        field: field.clone(),
                    });
                }
                primary_key = Some(index);
            }
        }
        let primary_key = match primary_key {
            Some(index) => index,
            None => {
                fields.insert(
                    0,
                    (
                        IDENTITY_FIELD.to_string(),
                        FieldSpec::uuid().primary_key(),
                    ),
                );
                0
            }
        };

        let weak_registry = Arc::downgrade(registry.shared());
        let name = self.name;
        let specs: Vec<FieldSpec> = fields
            .into_iter()
            .map(|(field, mut spec)| {
                spec.bind(&name, &field, &weak_registry);
                spec
            })
            .collect();

        let schema = Arc::new_cyclic(|weak| {
            for spec in &specs {
                spec.resolve_self(weak);
            }
            ModelSchema {
                name,
                parent,
                fields: specs,
                meta,
                primary_key,
                registry: weak_registry,
            }
        });

        let mut inner = registry.shared.lock();
        if inner.schemas.contains_key(schema.name()) {
            return Err(SchemaError::DuplicateType(schema.name().to_string()));
        }
        inner
            .schemas
            .insert(schema.name().to_string(), schema.clone());

        // References that are born resolved (self-references, and fields
        // inherited in resolved state) record their backref entries now;
        // everything else registers on first resolution.
        for spec in schema.fields() {
            if let Some(reference) = spec.type_ref()
                && reference.is_resolved()
                && let Ok(target) = reference.target(schema.name(), spec.name())
            {
                inner.backrefs.add(target.name(), schema.name(), spec.name());
            }
        }

        Ok(schema)
    }
}
