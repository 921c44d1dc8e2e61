use crate::{
    error::InternalError,
    heap::{OwnedValue, ValueRef},
    lifecycle::Retained,
    mutable::{HeapCollection, promote_slot},
    value::Dict,
};
use packdoc_primitives::Tag;
use std::collections::{BTreeMap, btree_map};

///
/// MutableDict
///
/// String-keyed map. Keys are kept sorted, so encoding is deterministic
/// regardless of the order of the source dict.
///

#[derive(Debug, Default)]
pub struct MutableDict {
    entries: BTreeMap<String, OwnedValue>,
    changed: bool,
}

impl MutableDict {
    /// Copy a packed dict. A repeated key keeps its last value, and the
    /// copy is then marked changed since it no longer matches the source.
    pub(crate) fn copy_from(source: Dict<'_>) -> Result<Self, InternalError> {
        let mut entries = BTreeMap::new();
        for (key, child) in source {
            entries.insert(key.to_owned(), ValueRef::Embedded(child).to_owned_value()?);
        }
        let changed = entries.len() != source.len();

        Ok(Self { entries, changed })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether this dict itself was edited. Edits inside promoted children
    /// do not set it; use [`HeapCollection::has_changes`] before deciding
    /// not to re-serialize.
    #[must_use]
    pub const fn is_changed(&self) -> bool {
        self.changed
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OwnedValue> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> btree_map::Values<'_, String, OwnedValue> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OwnedValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    ///
    /// MUTATION
    ///

    /// Insert or replace `key`; a replaced owner is released.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OwnedValue>) {
        self.entries.insert(key.into(), value.into());
        self.changed = true;
    }

    /// Remove `key`. Only an actual removal marks the dict changed.
    pub fn remove(&mut self, key: &str) -> Option<OwnedValue> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.changed = true;
        }

        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.changed = true;
    }

    ///
    /// PROMOTION
    ///

    /// Mutable handle to the array under `key`, promoting it in place if it
    /// is still packed. `Ok(None)` when the key is missing or holds
    /// something else.
    pub fn get_mutable_array(
        &mut self,
        key: &str,
    ) -> Result<Option<Retained<HeapCollection>>, InternalError> {
        self.promote(key, Tag::Array)
    }

    /// Mutable handle to the dict under `key`. See [`Self::get_mutable_array`].
    pub fn get_mutable_dict(
        &mut self,
        key: &str,
    ) -> Result<Option<Retained<HeapCollection>>, InternalError> {
        self.promote(key, Tag::Dict)
    }

    fn promote(
        &mut self,
        key: &str,
        kind: Tag,
    ) -> Result<Option<Retained<HeapCollection>>, InternalError> {
        match self.entries.get_mut(key) {
            Some(slot) => promote_slot(slot, kind),
            None => Ok(None),
        }
    }
}
