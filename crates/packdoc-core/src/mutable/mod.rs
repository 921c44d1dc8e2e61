//! Copy-on-write arrays and dicts.
//!
//! A [`HeapCollection`] is a mutable overlay built from an immutable
//! encoded array or dict. Children are detached into owned references on
//! copy; nested containers stay packed until promoted with
//! `get_mutable_array` / `get_mutable_dict`. Every structural mutation sets
//! the collection's `changed` flag, which is never cleared.
//!
//! Collections may share children but must not contain themselves.

mod array;
mod dict;

#[cfg(test)]
mod tests;

pub use array::MutableArray;
pub use dict::MutableDict;

use crate::{
    error::InternalError,
    heap::{HeapValue, OwnedValue, ValueRef},
    lifecycle::Retained,
    obs::sink::{self, MetricsEvent},
    value::{self, Value},
};
use packdoc_primitives::{GUARD_BYTE, Tag};
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::fmt;

///
/// HeapCollection
///
/// Shared, lock-protected mutable array or dict.
///

pub struct HeapCollection {
    body: RwLock<CollectionBody>,
}

#[derive(Debug)]
enum CollectionBody {
    Array(MutableArray),
    Dict(MutableDict),
}

impl HeapCollection {
    /// Fresh, empty mutable array.
    #[must_use]
    pub fn new_array() -> Retained<Self> {
        Self::from_body(CollectionBody::Array(MutableArray::default()))
    }

    /// Fresh, empty mutable dict.
    #[must_use]
    pub fn new_dict() -> Retained<Self> {
        Self::from_body(CollectionBody::Dict(MutableDict::default()))
    }

    fn from_body(body: CollectionBody) -> Retained<Self> {
        Retained::new(Self {
            body: RwLock::new(body),
        })
    }

    #[must_use]
    pub fn tag(&self) -> Tag {
        match &*self.body.read_recursive() {
            CollectionBody::Array(_) => Tag::Array,
            CollectionBody::Dict(_) => Tag::Dict,
        }
    }

    /// Element count (pairs, for dicts).
    #[must_use]
    pub fn len(&self) -> usize {
        match &*self.body.read_recursive() {
            CollectionBody::Array(array) => array.len(),
            CollectionBody::Dict(dict) => dict.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this collection itself has been mutated since it was copied.
    /// Promoting and editing a child leaves this unset; callers deciding
    /// whether to re-serialize should ask [`Self::has_changes`].
    #[must_use]
    pub fn is_changed(&self) -> bool {
        match &*self.body.read_recursive() {
            CollectionBody::Array(array) => array.is_changed(),
            CollectionBody::Dict(dict) => dict.is_changed(),
        }
    }

    /// Whether this collection or any promoted descendant has changed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        let nested = |child: &OwnedValue| child.as_collection().is_some_and(Self::has_changes);

        match &*self.body.read_recursive() {
            CollectionBody::Array(array) => array.is_changed() || array.iter().any(nested),
            CollectionBody::Dict(dict) => dict.is_changed() || dict.values().any(nested),
        }
    }

    ///
    /// ACCESS
    ///

    #[must_use]
    pub fn as_array(&self) -> Option<MappedRwLockReadGuard<'_, MutableArray>> {
        RwLockReadGuard::try_map(self.body.read(), |body| match body {
            CollectionBody::Array(array) => Some(array),
            CollectionBody::Dict(_) => None,
        })
        .ok()
    }

    #[must_use]
    pub fn as_array_mut(&self) -> Option<MappedRwLockWriteGuard<'_, MutableArray>> {
        RwLockWriteGuard::try_map(self.body.write(), |body| match body {
            CollectionBody::Array(array) => Some(array),
            CollectionBody::Dict(_) => None,
        })
        .ok()
    }

    #[must_use]
    pub fn as_dict(&self) -> Option<MappedRwLockReadGuard<'_, MutableDict>> {
        RwLockReadGuard::try_map(self.body.read(), |body| match body {
            CollectionBody::Dict(dict) => Some(dict),
            CollectionBody::Array(_) => None,
        })
        .ok()
    }

    #[must_use]
    pub fn as_dict_mut(&self) -> Option<MappedRwLockWriteGuard<'_, MutableDict>> {
        RwLockWriteGuard::try_map(self.body.write(), |body| match body {
            CollectionBody::Dict(dict) => Some(dict),
            CollectionBody::Array(_) => None,
        })
        .ok()
    }

    ///
    /// ENCODING
    ///

    /// Serialize the current contents into a new immutable heap value.
    /// Dict pairs are written in key order.
    #[must_use]
    pub fn encode(&self) -> Retained<HeapValue> {
        let mut buf = vec![GUARD_BYTE];
        self.encode_into(&mut buf);

        HeapValue::finish(buf)
    }

    pub(crate) fn encode_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);

        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match &*self.body.read_recursive() {
            CollectionBody::Array(array) => {
                value::write_collection_header(out, Tag::Array, array.len());
                for item in array.iter() {
                    write_child(out, item);
                }
            }
            CollectionBody::Dict(dict) => {
                value::write_collection_header(out, Tag::Dict, dict.len());
                for (key, item) in dict.iter() {
                    value::write_string(out, key);
                    write_child(out, item);
                }
            }
        }
    }
}

impl fmt::Debug for HeapCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.body.try_read_recursive() {
            Some(body) => fmt::Debug::fmt(&*body, f),
            None => f.write_str("HeapCollection(<locked>)"),
        }
    }
}

fn write_child(out: &mut Vec<u8>, child: &OwnedValue) {
    match child {
        ValueRef::Collection(collection) => collection.encode_into(out),
        other => out.extend_from_slice(&other.encoded()),
    }
}

///
/// mutable_copy
///
/// Mutable overlay of `value` when it is a `kind` collection.
///
/// Returns `Ok(None)` for an absent value or a kind mismatch, the same
/// identity (retained) when `value` is already mutable, and otherwise a
/// fresh copy with `changed == false`. `kind` must be array or dict.
///

pub fn mutable_copy(
    value: Option<&ValueRef<'_>>,
    kind: Tag,
) -> Result<Option<Retained<HeapCollection>>, InternalError> {
    if !kind.is_collection() {
        return Err(InternalError::collection_unsupported(format!(
            "cannot make a mutable copy of a {} value",
            kind.label()
        )));
    }

    let Some(value) = value else {
        return Ok(None);
    };

    if let ValueRef::Collection(existing) = value {
        if existing.tag() != kind {
            return Ok(None);
        }
        sink::record(MetricsEvent::MutableCopy { tag: kind, reused: true });

        return Ok(Some(existing.retain()?));
    }

    match value.as_value() {
        Some(source) if source.tag() == kind => copy_packed(source, kind).map(Some),
        _ => Ok(None),
    }
}

fn copy_packed(source: Value<'_>, kind: Tag) -> Result<Retained<HeapCollection>, InternalError> {
    let body = if kind == Tag::Dict {
        CollectionBody::Dict(MutableDict::copy_from(source.expect_dict()?)?)
    } else {
        CollectionBody::Array(MutableArray::copy_from(source.expect_array()?)?)
    };
    let count = match &body {
        CollectionBody::Array(array) => array.len(),
        CollectionBody::Dict(dict) => dict.len(),
    };

    sink::record(MetricsEvent::MutableCopy {
        tag: kind,
        reused: false,
    });
    tracing::debug!(kind = kind.label(), count, "collection.mutable_copy");

    Ok(HeapCollection::from_body(body))
}

// Promote a packed container child in place, returning the mutable
// handle. The slot keeps its own retained reference.
fn promote_slot(
    slot: &mut OwnedValue,
    kind: Tag,
) -> Result<Option<Retained<HeapCollection>>, InternalError> {
    let Some(collection) = mutable_copy(Some(&*slot), kind)? else {
        return Ok(None);
    };
    if !slot.is_mutable() {
        *slot = ValueRef::Collection(collection.retain()?);
    }

    Ok(Some(collection))
}
