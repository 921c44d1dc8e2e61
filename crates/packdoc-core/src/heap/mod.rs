//! Owned value storage and the value-reference discriminant.
//!
//! A [`HeapValue`] is one exact-size allocation holding a guard byte
//! followed by a complete encoded value. [`ValueRef`] says, by variant
//! rather than by address bits, whether a reference is heap-owned, one of
//! the hard-wired constants, a mutable collection, or a borrowed view into
//! somebody else's buffer.


use crate::{
    error::InternalError,
    lifecycle::Retained,
    mutable::HeapCollection,
    obs::sink::{self, MetricsEvent},
    value::{
        self, CodecError, Value, encoded_len_data, encoded_len_int, encoded_len_string,
        encoded_len_uint,
    },
};
use packdoc_primitives::{GUARD_BYTE, Special, Tag};
use std::{borrow::Cow, fmt};

///
/// HeapValue
///
/// Byte 0 is always [`GUARD_BYTE`]; bytes `1..` are the encoded value.
///

pub struct HeapValue {
    bytes: Box<[u8]>,
}

impl HeapValue {
    ///
    /// CONSTRUCTION
    ///

    /// Allocate a value from its header parts and extra bytes.
    pub fn create_raw(tag: Tag, tiny: u8, extra: &[u8]) -> Result<Retained<Self>, InternalError> {
        let mut buf = Self::buffer(1 + extra.len());
        buf.push(tag.header(tiny));
        buf.extend_from_slice(extra);

        let size = value::validate(&buf[1..])?;
        if size != extra.len() + 1 {
            return Err(InternalError::codec_corruption(format!(
                "{} trailing bytes after {} value",
                extra.len() + 1 - size,
                tag.label()
            )));
        }

        Ok(Self::finish(buf))
    }

    #[must_use]
    pub fn create_null() -> Retained<Self> {
        Self::create_special(Special::Null)
    }

    #[must_use]
    pub fn create_undefined() -> Retained<Self> {
        Self::create_special(Special::Undefined)
    }

    #[must_use]
    pub fn create_bool(value: bool) -> Retained<Self> {
        Self::create_special(if value { Special::True } else { Special::False })
    }

    #[must_use]
    pub fn create_int(value: i64) -> Retained<Self> {
        Self::build(encoded_len_int(value), |out| value::write_int(out, value))
    }

    #[must_use]
    pub fn create_uint(value: u64) -> Retained<Self> {
        Self::build(encoded_len_uint(value), |out| value::write_uint(out, value))
    }

    #[must_use]
    pub fn create_float(value: f32) -> Retained<Self> {
        Self::build(6, |out| value::write_float(out, value))
    }

    #[must_use]
    pub fn create_double(value: f64) -> Retained<Self> {
        Self::build(10, |out| value::write_double(out, value))
    }

    #[must_use]
    pub fn create_string(value: &str) -> Retained<Self> {
        Self::build(encoded_len_string(value.len()), |out| {
            value::write_string(out, value);
        })
    }

    #[must_use]
    pub fn create_data(value: &[u8]) -> Retained<Self> {
        Self::build(encoded_len_data(value.len()), |out| {
            value::write_data(out, value);
        })
    }

    /// Allocate any supported Rust value.
    #[must_use]
    pub fn create(value: impl IntoHeapValue) -> Retained<Self> {
        value.into_heap_value()
    }

    /// Copy an existing encoded value, containers included.
    #[must_use]
    pub fn copy_of(value: Value<'_>) -> Retained<Self> {
        let src = value.as_bytes();
        Self::build(src.len(), |out| out.extend_from_slice(src))
    }

    /// Validate `bytes` and copy the value at its front.
    pub fn from_encoded(bytes: &[u8]) -> Result<Retained<Self>, CodecError> {
        Value::from_bytes(bytes).map(Self::copy_of)
    }

    ///
    /// ACCESS
    ///

    /// View the owned bytes as a value without copying.
    #[must_use]
    pub fn as_value(&self) -> Value<'_> {
        Value::from_trusted(&self.bytes[1..])
    }

    #[must_use]
    pub fn tag(&self) -> Tag {
        self.as_value().tag()
    }

    #[must_use]
    pub fn guard(&self) -> u8 {
        self.bytes[0]
    }

    /// Size of the allocation, guard included.
    #[must_use]
    pub fn allocation_size(&self) -> usize {
        self.bytes.len()
    }

    ///
    /// INTERNALS
    ///

    fn create_special(special: Special) -> Retained<Self> {
        Self::build(1, |out| value::write_special(out, special))
    }

    fn buffer(encoded_len: usize) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + encoded_len);
        buf.push(GUARD_BYTE);
        buf
    }

    fn build(encoded_len: usize, write: impl FnOnce(&mut Vec<u8>)) -> Retained<Self> {
        let mut buf = Self::buffer(encoded_len);
        write(&mut buf);
        debug_assert_eq!(buf.len(), 1 + encoded_len, "heap value sized exactly");

        Self::finish(buf)
    }

    pub(crate) fn finish(buf: Vec<u8>) -> Retained<Self> {
        let heap = Self {
            bytes: buf.into_boxed_slice(),
        };
        sink::record(MetricsEvent::HeapAlloc {
            tag: heap.tag(),
            bytes: heap.allocation_size(),
        });

        Retained::new(heap)
    }
}

impl fmt::Debug for HeapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeapValue({})", self.as_value())
    }
}

///
/// IntoHeapValue
///
/// Rust values with a direct heap encoding. `None` encodes as null.
///

pub trait IntoHeapValue {
    fn into_heap_value(self) -> Retained<HeapValue>;
}

impl IntoHeapValue for () {
    fn into_heap_value(self) -> Retained<HeapValue> {
        HeapValue::create_null()
    }
}

impl IntoHeapValue for bool {
    fn into_heap_value(self) -> Retained<HeapValue> {
        HeapValue::create_bool(self)
    }
}

impl IntoHeapValue for f32 {
    fn into_heap_value(self) -> Retained<HeapValue> {
        HeapValue::create_float(self)
    }
}

impl IntoHeapValue for f64 {
    fn into_heap_value(self) -> Retained<HeapValue> {
        HeapValue::create_double(self)
    }
}

impl IntoHeapValue for &str {
    fn into_heap_value(self) -> Retained<HeapValue> {
        HeapValue::create_string(self)
    }
}

impl IntoHeapValue for String {
    fn into_heap_value(self) -> Retained<HeapValue> {
        HeapValue::create_string(&self)
    }
}

impl IntoHeapValue for &[u8] {
    fn into_heap_value(self) -> Retained<HeapValue> {
        HeapValue::create_data(self)
    }
}

impl IntoHeapValue for Value<'_> {
    fn into_heap_value(self) -> Retained<HeapValue> {
        HeapValue::copy_of(self)
    }
}

impl<T: IntoHeapValue> IntoHeapValue for Option<T> {
    fn into_heap_value(self) -> Retained<HeapValue> {
        self.map_or_else(HeapValue::create_null, IntoHeapValue::into_heap_value)
    }
}

macro_rules! impl_into_heap_value_signed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoHeapValue for $ty {
                fn into_heap_value(self) -> Retained<HeapValue> {
                    HeapValue::create_int(i64::from(self))
                }
            }
        )*
    };
}

macro_rules! impl_into_heap_value_unsigned {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoHeapValue for $ty {
                fn into_heap_value(self) -> Retained<HeapValue> {
                    HeapValue::create_uint(u64::from(self))
                }
            }
        )*
    };
}

impl_into_heap_value_signed!(i8, i16, i32, i64);
impl_into_heap_value_unsigned!(u8, u16, u32, u64);

///
/// HardWired
///
/// The six process-wide constants. They live in static memory and are
/// never counted.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HardWired {
    Null,
    Undefined,
    False,
    True,
    EmptyArray,
    EmptyDict,
}

static NULL_BYTES: [u8; 1] = [Special::Null.header()];
static UNDEFINED_BYTES: [u8; 1] = [Special::Undefined.header()];
static FALSE_BYTES: [u8; 1] = [Special::False.header()];
static TRUE_BYTES: [u8; 1] = [Special::True.header()];
static EMPTY_ARRAY_BYTES: [u8; 1] = [Tag::Array.header(0)];
static EMPTY_DICT_BYTES: [u8; 1] = [Tag::Dict.header(0)];

impl HardWired {
    pub const ALL: [Self; 6] = [
        Self::Null,
        Self::Undefined,
        Self::False,
        Self::True,
        Self::EmptyArray,
        Self::EmptyDict,
    ];

    #[must_use]
    pub const fn from_bool(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }

    /// The constant whose encoding equals `value`, if any.
    #[must_use]
    pub fn matching(value: Value<'_>) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|hw| hw.bytes() == value.as_bytes())
    }

    #[must_use]
    pub const fn bytes(self) -> &'static [u8] {
        match self {
            Self::Null => &NULL_BYTES,
            Self::Undefined => &UNDEFINED_BYTES,
            Self::False => &FALSE_BYTES,
            Self::True => &TRUE_BYTES,
            Self::EmptyArray => &EMPTY_ARRAY_BYTES,
            Self::EmptyDict => &EMPTY_DICT_BYTES,
        }
    }

    #[must_use]
    pub const fn as_value(self) -> Value<'static> {
        Value::from_trusted(self.bytes())
    }
}

///
/// ValueRef
///
/// A reference to one value, tagged with how it is owned.
///
/// Only `Heap` and `Collection` are reference-counted. `HardWired`
/// constants may be retained and released freely. An `Embedded` view
/// borrows from a parent buffer and can never be owned independently.
///

#[derive(Debug)]
pub enum ValueRef<'a> {
    HardWired(HardWired),
    Heap(Retained<HeapValue>),
    Collection(Retained<HeapCollection>),
    Embedded(Value<'a>),
}

/// A value reference that does not borrow from any buffer.
pub type OwnedValue = ValueRef<'static>;

impl<'a> ValueRef<'a> {
    /// Whether this reference owns a counted allocation.
    #[must_use]
    pub const fn is_heap_value(&self) -> bool {
        matches!(self, Self::Heap(_) | Self::Collection(_))
    }

    #[must_use]
    pub const fn is_mutable(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    /// Downcast to the owning heap allocation, checking its guard byte.
    pub fn as_heap_value(&self) -> Result<&HeapValue, InternalError> {
        match self {
            Self::Heap(heap) => {
                check_guard(heap.guard())?;
                Ok(&**heap)
            }
            Self::Collection(_) => Err(InternalError::heap_invalid_data(
                "mutable collection is not a packed heap value",
            )),
            Self::HardWired(_) | Self::Embedded(_) => Err(InternalError::heap_invalid_data(
                "value is not heap-owned",
            )),
        }
    }

    #[must_use]
    pub fn as_collection(&self) -> Option<&HeapCollection> {
        match self {
            Self::Collection(collection) => Some(&**collection),
            _ => None,
        }
    }

    #[must_use]
    pub fn tag(&self) -> Tag {
        match self {
            Self::Collection(collection) => collection.tag(),
            _ => self.as_value().map_or(Tag::Special, |v| v.tag()),
        }
    }

    /// Read-only view of a packed value. Mutable collections have no
    /// packed form until encoded.
    #[must_use]
    pub fn as_value(&self) -> Option<Value<'_>> {
        match self {
            Self::HardWired(hw) => Some(hw.as_value()),
            Self::Heap(heap) => Some(heap.as_value()),
            Self::Embedded(value) => Some(*value),
            Self::Collection(_) => None,
        }
    }

    /// Encoded bytes of this value, serializing mutable collections.
    #[must_use]
    pub fn encoded(&self) -> Cow<'_, [u8]> {
        match self {
            Self::Collection(collection) => Cow::Owned(collection.encode_bytes()),
            _ => Cow::Borrowed(self.as_value().map_or(&[][..], |v| v.as_bytes())),
        }
    }

    /// Add an owner. Hard-wired constants are returned as-is.
    pub fn retain(&self) -> Result<OwnedValue, InternalError> {
        match self {
            Self::HardWired(hw) => Ok(ValueRef::HardWired(*hw)),
            Self::Heap(heap) => Ok(ValueRef::Heap(heap.retain()?)),
            Self::Collection(collection) => Ok(ValueRef::Collection(collection.retain()?)),
            Self::Embedded(_) => Err(embedded_misuse("retain")),
        }
    }

    /// Give up this owner.
    pub fn release(self) -> Result<(), InternalError> {
        match self {
            Self::HardWired(_) => Ok(()),
            Self::Heap(heap) => Ok(heap.release()?),
            Self::Collection(collection) => Ok(collection.release()?),
            Self::Embedded(_) => Err(embedded_misuse("release")),
        }
    }

    /// Detach from any parent buffer. Borrowed views are copied into a
    /// fresh heap value unless they equal a hard-wired constant.
    pub fn to_owned_value(&self) -> Result<OwnedValue, InternalError> {
        match self {
            Self::Embedded(value) => Ok(HardWired::matching(*value)
                .map_or_else(|| ValueRef::Heap(HeapValue::copy_of(*value)), ValueRef::HardWired)),
            _ => self.retain(),
        }
    }
}

impl From<HardWired> for ValueRef<'_> {
    fn from(hw: HardWired) -> Self {
        Self::HardWired(hw)
    }
}

impl From<Retained<HeapValue>> for ValueRef<'_> {
    fn from(heap: Retained<HeapValue>) -> Self {
        Self::Heap(heap)
    }
}

impl From<Retained<HeapCollection>> for ValueRef<'_> {
    fn from(collection: Retained<HeapCollection>) -> Self {
        Self::Collection(collection)
    }
}

impl<'a> From<Value<'a>> for ValueRef<'a> {
    fn from(value: Value<'a>) -> Self {
        Self::Embedded(value)
    }
}

impl fmt::Display for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.encoded();
        write!(f, "{}", Value::from_trusted(&bytes))
    }
}

/// Retain an optional reference. Absent values stay absent.
pub fn retain(value: Option<&ValueRef<'_>>) -> Result<Option<OwnedValue>, InternalError> {
    value.map(ValueRef::retain).transpose()
}

/// Release an optional reference. Absent values are ignored.
pub fn release(value: Option<ValueRef<'_>>) -> Result<(), InternalError> {
    value.map_or(Ok(()), ValueRef::release)
}

fn check_guard(guard: u8) -> Result<(), InternalError> {
    if guard != GUARD_BYTE {
        return Err(InternalError::heap_invalid_data(format!(
            "heap value guard byte is {guard:#04x}, expected {GUARD_BYTE:#04x}"
        )));
    }

    Ok(())
}

fn embedded_misuse(op: &str) -> InternalError {
    InternalError::heap_invalid_data(format!("cannot {op} a value embedded in another buffer"))
}
