use crate::{
    error::InternalError,
    heap::{OwnedValue, ValueRef},
    lifecycle::Retained,
    mutable::{HeapCollection, promote_slot},
    value::Array,
};
use packdoc_primitives::Tag;

///
/// MutableArray
///

#[derive(Debug, Default)]
pub struct MutableArray {
    items: Vec<OwnedValue>,
    changed: bool,
}

impl MutableArray {
    pub(crate) fn copy_from(source: Array<'_>) -> Result<Self, InternalError> {
        let items = source
            .iter()
            .map(|child| ValueRef::Embedded(child).to_owned_value())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            items,
            changed: false,
        })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether this array itself was edited. Edits inside promoted children
    /// do not set it; use [`HeapCollection::has_changes`] before deciding
    /// not to re-serialize.
    #[must_use]
    pub const fn is_changed(&self) -> bool {
        self.changed
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&OwnedValue> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OwnedValue> {
        self.items.iter()
    }

    ///
    /// MUTATION
    ///

    /// Replace the element at `index`; the previous owner is released.
    pub fn set(&mut self, index: usize, value: impl Into<OwnedValue>) -> Result<(), InternalError> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or_else(|| InternalError::collection_out_of_range(index, len))?;

        *slot = value.into();
        self.changed = true;

        Ok(())
    }

    pub fn push(&mut self, value: impl Into<OwnedValue>) {
        self.items.push(value.into());
        self.changed = true;
    }

    /// Insert before `index`; `index == len()` appends.
    pub fn insert(
        &mut self,
        index: usize,
        value: impl Into<OwnedValue>,
    ) -> Result<(), InternalError> {
        if index > self.items.len() {
            return Err(InternalError::collection_out_of_range(
                index,
                self.items.len(),
            ));
        }

        self.items.insert(index, value.into());
        self.changed = true;

        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<OwnedValue, InternalError> {
        if index >= self.items.len() {
            return Err(InternalError::collection_out_of_range(
                index,
                self.items.len(),
            ));
        }

        self.changed = true;

        Ok(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.changed = true;
    }

    ///
    /// PROMOTION
    ///

    /// Mutable handle to the array at `index`, promoting it in place if it
    /// is still packed. `Ok(None)` when the element is not an array.
    pub fn get_mutable_array(
        &mut self,
        index: usize,
    ) -> Result<Option<Retained<HeapCollection>>, InternalError> {
        self.promote(index, Tag::Array)
    }

    /// Mutable handle to the dict at `index`. See [`Self::get_mutable_array`].
    pub fn get_mutable_dict(
        &mut self,
        index: usize,
    ) -> Result<Option<Retained<HeapCollection>>, InternalError> {
        self.promote(index, Tag::Dict)
    }

    fn promote(
        &mut self,
        index: usize,
        kind: Tag,
    ) -> Result<Option<Retained<HeapCollection>>, InternalError> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or_else(|| InternalError::collection_out_of_range(index, len))?;

        promote_slot(slot, kind)
    }
}

impl<'a> IntoIterator for &'a MutableArray {
    type Item = &'a OwnedValue;
    type IntoIter = std::slice::Iter<'a, OwnedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
