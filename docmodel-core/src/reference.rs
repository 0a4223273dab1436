//! Symbolic type references and their lazy resolution.
//!
//! A reference field declares its target as a symbol: `"self"`, or the name
//! of a schema that may not be registered yet. [`TypeRef`] carries that
//! symbol and transitions to a resolved schema handle at most once, the
//! first time the target is known to exist. Resolution is retried on every
//! access (set, validate, serialize) rather than driven by notifications,
//! and is never undone.

use std::sync::{Arc, OnceLock, Weak};

use bson::{Bson, doc};

use crate::{
    error::FieldError,
    schema::{ModelSchema, RegistryShared},
};

/// The canonical symbol for a reference to the owning schema itself.
pub const SELF_SYMBOL: &str = "self";

/// The storage form of a non-embedded reference: type name, identity, and
/// the database the target's documents live in. Serialized in the familiar
/// `{$ref, $id, $db}` shape.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerRecord {
    /// Name of the target schema; doubles as its collection name.
    pub type_name: String,
    /// The referenced document's primary key, in wire form.
    pub id: Bson,
    /// Name of the database the target schema stores into.
    pub location: String,
}

impl PointerRecord {
    /// Builds a pointer record.
    pub fn new(type_name: impl Into<String>, id: Bson, location: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id,
            location: location.into(),
        }
    }

    /// The `{$ref, $id, $db}` storage-map form.
    pub fn to_storage(&self) -> bson::Document {
        doc! {
            "$ref": self.type_name.clone(),
            "$id": self.id.clone(),
            "$db": self.location.clone(),
        }
    }

    /// Parses a pointer record out of a storage map, or `None` when the map
    /// is not pointer-shaped.
    pub fn from_storage(map: &bson::Document) -> Option<Self> {
        let type_name = match map.get("$ref") {
            Some(Bson::String(name)) => name.clone(),
            _ => return None,
        };
        let id = map.get("$id")?.clone();
        let location = match map.get("$db") {
            Some(Bson::String(db)) => db.clone(),
            _ => String::new(),
        };
        Some(Self {
            type_name,
            id,
            location,
        })
    }
}

/// A symbolic-or-resolved handle to a schema.
///
/// Starts out unresolved, holding only the declared symbol. The transition
/// to resolved happens at most once and registers the owning field's backref
/// entry as a side effect. An indefinitely unresolved reference is not an
/// error by itself; it fails only when exercised.
#[derive(Debug, Clone)]
pub struct TypeRef {
    symbol: String,
    registry: OnceLock<Weak<RegistryShared>>,
    slot: OnceLock<Weak<ModelSchema>>,
}

impl TypeRef {
    /// Creates an unresolved reference to the named type.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            registry: OnceLock::new(),
            slot: OnceLock::new(),
        }
    }

    /// The symbol the reference was declared with.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// True once the target schema has been pinned.
    pub fn is_resolved(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Installs the registry the owning schema was declared in. Called once
    /// during schema construction; later calls against the same registry are
    /// no-ops.
    pub(crate) fn attach_registry(&self, registry: &Weak<RegistryShared>) {
        let _ = self.registry.set(registry.clone());
    }

    /// Pins the target to the schema under construction. Used for `"self"`
    /// references, which resolve during the owning build.
    pub(crate) fn resolve_to(&self, schema: &Weak<ModelSchema>) {
        let _ = self.slot.set(schema.clone());
    }

    /// Returns the target schema, resolving on the fly if the target has
    /// been registered since the last attempt.
    ///
    /// The first successful resolution records the `(owner, field)` backref
    /// entry against the target.
    ///
    /// # Errors
    ///
    /// [`FieldError::Unresolved`] while no schema with the declared symbol
    /// is registered.
    pub fn target(&self, owner: &str, field: &str) -> Result<Arc<ModelSchema>, FieldError> {
        let unresolved = || FieldError::Unresolved {
            symbol: self.symbol.clone(),
        };

        if let Some(weak) = self.slot.get() {
            return weak.upgrade().ok_or_else(unresolved);
        }

        let shared = self
            .registry
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(unresolved)?;

        let mut inner = shared.lock();
        let schema = inner
            .schemas
            .get(&self.symbol)
            .cloned()
            .ok_or_else(unresolved)?;

        // First resolver wins; only the winner records the backref entry.
        if self.slot.set(Arc::downgrade(&schema)).is_ok() {
            inner.backrefs.add(schema.name(), owner, field);
        }

        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_record_storage_shape() {
        let id = Bson::from(bson::Uuid::new());
        let pointer = PointerRecord::new("Gardener", id.clone(), "allotments");
        let map = pointer.to_storage();

        assert_eq!(map.get("$ref"), Some(&Bson::String("Gardener".into())));
        assert_eq!(map.get("$id"), Some(&id));
        assert_eq!(map.get("$db"), Some(&Bson::String("allotments".into())));
        assert_eq!(PointerRecord::from_storage(&map), Some(pointer));
    }

    #[test]
    fn non_pointer_maps_are_rejected() {
        let map = doc! { "name": "rose" };
        assert_eq!(PointerRecord::from_storage(&map), None);
    }
}
