//! Reverse-relationship bookkeeping for reference fields.
//!
//! For every schema that is the target of a reference field, the registry
//! tracks which `(owner schema, field name)` pairs point at it. Entries are
//! added when a reference resolves and removed when a resolved reference
//! field's value is deleted from a document. Removing an entry that is not
//! present is reported rather than ignored, since it signals a consistency
//! bug elsewhere in the bookkeeping.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

/// Failure in backref bookkeeping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackrefError {
    /// Attempted to remove an entry that does not exist.
    #[error("No backref entry for {owner}.{field} -> {target}")]
    MissingEntry {
        /// Schema the reference points at.
        target: String,
        /// Schema owning the reference field.
        owner: String,
        /// Name of the reference field.
        field: String,
    },
}

/// Mapping from target schema name to the set of referring
/// `(owner schema, field name)` pairs.
#[derive(Debug, Default)]
pub struct BackrefRegistry {
    entries: HashMap<String, BTreeSet<(String, String)>>,
}

impl BackrefRegistry {
    /// Records that `owner.field` references `target`.
    ///
    /// Returns `false` when the entry was already present.
    pub fn add(&mut self, target: &str, owner: &str, field: &str) -> bool {
        self.entries
            .entry(target.to_string())
            .or_default()
            .insert((owner.to_string(), field.to_string()))
    }

    /// Removes the entry recording that `owner.field` references `target`.
    ///
    /// # Errors
    ///
    /// Returns [`BackrefError::MissingEntry`] when no such entry exists;
    /// every resolved reference field must have exactly one entry, so a
    /// missing one means the registry and the schema graph disagree.
    pub fn remove(&mut self, target: &str, owner: &str, field: &str) -> Result<(), BackrefError> {
        let removed = self
            .entries
            .get_mut(target)
            .is_some_and(|set| set.remove(&(owner.to_string(), field.to_string())));

        if removed {
            Ok(())
        } else {
            Err(BackrefError::MissingEntry {
                target: target.to_string(),
                owner: owner.to_string(),
                field: field.to_string(),
            })
        }
    }

    /// The `(owner schema, field name)` pairs referencing `target`, in
    /// lexicographic order.
    pub fn lookup(&self, target: &str) -> Vec<(String, String)> {
        self.entries
            .get(target)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_remove() {
        let mut backrefs = BackrefRegistry::default();
        assert!(backrefs.add("Gardener", "Garden", "gardener"));
        assert!(!backrefs.add("Gardener", "Garden", "gardener"));

        assert_eq!(
            backrefs.lookup("Gardener"),
            vec![("Garden".to_string(), "gardener".to_string())]
        );

        backrefs.remove("Gardener", "Garden", "gardener").unwrap();
        assert!(backrefs.lookup("Gardener").is_empty());
    }

    #[test]
    fn double_remove_is_reported() {
        let mut backrefs = BackrefRegistry::default();
        backrefs.add("Gardener", "Garden", "gardener");
        backrefs.remove("Gardener", "Garden", "gardener").unwrap();

        let err = backrefs
            .remove("Gardener", "Garden", "gardener")
            .unwrap_err();
        assert_eq!(
            err,
            BackrefError::MissingEntry {
                target: "Gardener".to_string(),
                owner: "Garden".to_string(),
                field: "gardener".to_string(),
            }
        );
    }
}
