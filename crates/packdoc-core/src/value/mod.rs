//! Packed value codec.
//!
//! A value is a self-describing byte span: one header byte (4-bit [`Tag`],
//! 4-bit tiny payload) followed by zero or more extra bytes. The total
//! length of any value is recoverable from its header plus, for
//! variable-length kinds, a leading varint, so containers need no offset
//! table to skip a child.
//!
//! Everything here is pure and allocation-free except the [`Encoder`].

mod collection;
mod compare;
mod display;
mod encode;
pub mod varint;


use packdoc_primitives::{
    FLOAT_DOUBLE_FLAG, INT_UNSIGNED_FLAG, SizeRule, Special, TINY_LENGTH_SENTINEL, Tag,
};
use thiserror::Error as ThisError;

// re-exports
pub use collection::{Array, ChildIter, Dict, DictIter};
pub use compare::{canonical_cmp, canonical_cmp_ref};
pub use encode::{
    Encoder, encoded_len_data, encoded_len_int, encoded_len_string, encoded_len_uint,
    write_bool, write_collection_header, write_data, write_double, write_float, write_int,
    write_null, write_special, write_string, write_uint, write_undefined,
};
pub use packdoc_primitives::Tag as ValueTag;

///
/// CONSTANTS
///

/// Deepest container nesting accepted by the decoder.
pub const MAX_NESTING_DEPTH: usize = 256;

///
/// CodecError
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
pub enum CodecError {
    #[error("value span is empty")]
    Empty,

    #[error("unknown value tag in header {header:#04x}")]
    UnknownTag { header: u8 },

    #[error("invalid tiny payload {tiny:#x} for {tag} value")]
    InvalidTiny { tag: &'static str, tiny: u8 },

    #[error("value truncated: needs {needed} bytes, span holds {available}")]
    Truncated { needed: usize, available: usize },

    #[error("malformed varint")]
    MalformedVarint,

    #[error("string payload is not valid utf-8")]
    InvalidUtf8,

    #[error("dict key at pair {index} is not a string")]
    NonStringKey { index: usize },

    #[error("containers nested deeper than {max}")]
    TooDeep { max: usize },

    #[error("expected {expected} value, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("encoder misuse: {reason}")]
    EncoderMisuse { reason: &'static str },
}

///
/// ValueType
///
/// Caller-facing kind of a value, coarser than the wire tag.
/// Declaration order is the cross-kind sort order.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ValueType {
    Null,
    Undefined,
    Boolean,
    Number,
    String,
    Data,
    Array,
    Dict,
}

/// Total encoded length of the value at the front of `bytes`.
///
/// Dispatches on the header tag: fixed widths for short ints, specials and
/// floats, the width nibble for long ints, a length prefix for strings and
/// binaries, and a count plus child walk for containers.
pub fn data_size(bytes: &[u8]) -> Result<usize, CodecError> {
    measure(bytes, 0, false)
}

/// Check that `bytes` starts with one well-formed value.
/// Returns its encoded length.
pub fn validate(bytes: &[u8]) -> Result<usize, CodecError> {
    measure(bytes, 0, true)
}

// Shared size walker. With `strict`, payload contents are checked as well.
fn measure(bytes: &[u8], depth: usize, strict: bool) -> Result<usize, CodecError> {
    let header = *bytes.first().ok_or(CodecError::Empty)?;
    let tag = Tag::from_header(header).ok_or(CodecError::UnknownTag { header })?;
    let tiny = header & 0x0F;

    let size = match tag.size_rule() {
        SizeRule::Fixed(size) => {
            if strict && tag == Tag::Special && Special::from_tiny(tiny).is_none() {
                return Err(CodecError::InvalidTiny {
                    tag: tag.label(),
                    tiny,
                });
            }
            size
        }
        SizeRule::IntWidth => 2 + usize::from(tiny & 0x07),
        SizeRule::FloatWidth => {
            if strict && tiny & !FLOAT_DOUBLE_FLAG != 0 {
                return Err(CodecError::InvalidTiny {
                    tag: tag.label(),
                    tiny,
                });
            }
            if tiny & FLOAT_DOUBLE_FLAG == 0 { 6 } else { 10 }
        }
        SizeRule::LengthPrefixed => {
            let (len, prefix) = read_length(bytes, tiny)?;
            let size = 1 + prefix + len;
            ensure_available(bytes, size)?;
            if strict && tag == Tag::String && std::str::from_utf8(&bytes[1 + prefix..size]).is_err()
            {
                return Err(CodecError::InvalidUtf8);
            }
            size
        }
        SizeRule::Counted => {
            if depth >= MAX_NESTING_DEPTH {
                return Err(CodecError::TooDeep {
                    max: MAX_NESTING_DEPTH,
                });
            }
            let (count, prefix) = read_length(bytes, tiny)?;
            let children = if tag == Tag::Dict {
                count.checked_mul(2).ok_or(CodecError::MalformedVarint)?
            } else {
                count
            };

            // every child is at least one byte
            let mut offset = 1 + prefix;
            ensure_available(bytes, offset.saturating_add(children))?;

            for idx in 0..children {
                let child = &bytes[offset..];
                if strict && tag == Tag::Dict && idx % 2 == 0 {
                    let key_tag = child.first().and_then(|h| Tag::from_header(*h));
                    if key_tag != Some(Tag::String) {
                        return Err(CodecError::NonStringKey { index: idx / 2 });
                    }
                }
                offset += measure(child, depth + 1, strict)?;
            }
            offset
        }
    };

    ensure_available(bytes, size)?;

    Ok(size)
}

// Decode an inline-or-varint length. Returns `(length, prefix bytes)`.
fn read_length(bytes: &[u8], tiny: u8) -> Result<(usize, usize), CodecError> {
    if tiny < TINY_LENGTH_SENTINEL {
        return Ok((usize::from(tiny), 0));
    }

    let (len, consumed) = varint::get_uvarint(&bytes[1..])?;
    let len = usize::try_from(len).map_err(|_| CodecError::MalformedVarint)?;

    Ok((len, consumed))
}

const fn ensure_available(bytes: &[u8], needed: usize) -> Result<(), CodecError> {
    if needed > bytes.len() {
        return Err(CodecError::Truncated {
            needed,
            available: bytes.len(),
        });
    }

    Ok(())
}

///
/// Value
///
/// Read-only view of one encoded value. The span is trimmed to exactly
/// the value's encoded length, so `data_size()` is the span length.
///

#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Value<'a> {
    bytes: &'a [u8],
}

impl<'a> Value<'a> {
    ///
    /// CONSTRUCTION
    ///

    /// Validate and view the value at the front of `bytes`.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, CodecError> {
        let size = validate(bytes)?;

        Ok(Self {
            bytes: &bytes[..size],
        })
    }

    /// View bytes already known to hold exactly one valid value.
    pub(crate) const fn from_trusted(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    ///
    /// HEADER
    ///

    #[must_use]
    pub const fn header(&self) -> u8 {
        self.bytes[0]
    }

    #[must_use]
    pub const fn tiny(&self) -> u8 {
        self.header() & 0x0F
    }

    /// Wire tag. Construction guarantees the nibble is assigned.
    #[must_use]
    pub fn tag(&self) -> Tag {
        Tag::from_header(self.header()).unwrap_or(Tag::Special)
    }

    /// Total encoded length.
    #[must_use]
    pub const fn data_size(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self.tag() {
            Tag::Short | Tag::Int | Tag::Float => ValueType::Number,
            Tag::Special => match Special::from_tiny(self.tiny()) {
                Some(Special::False | Special::True) => ValueType::Boolean,
                Some(Special::Undefined) => ValueType::Undefined,
                Some(Special::Null) | None => ValueType::Null,
            },
            Tag::String => ValueType::String,
            Tag::Binary => ValueType::Data,
            Tag::Array => ValueType::Array,
            Tag::Dict => ValueType::Dict,
        }
    }

    ///
    /// SCALARS
    ///

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.special() == Some(Special::Null)
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        self.special() == Some(Special::Undefined)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.special()? {
            Special::True => Some(true),
            Special::False => Some(false),
            Special::Null | Special::Undefined => None,
        }
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self.tag(), Tag::Short | Tag::Int)
    }

    /// Whether this is a long int stored with the unsigned flag.
    #[must_use]
    pub fn is_unsigned(&self) -> bool {
        self.tag() == Tag::Int && self.tiny() & INT_UNSIGNED_FLAG != 0
    }

    /// Whether this is a 64-bit float.
    #[must_use]
    pub fn is_double(&self) -> bool {
        self.tag() == Tag::Float && self.tiny() & FLOAT_DOUBLE_FLAG != 0
    }

    /// Integer value, if this is an integer representable as `i64`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self.tag() {
            Tag::Short => Some(self.short_value()),
            Tag::Int => {
                let raw = self.long_bits();
                if self.is_unsigned() && raw < 0 {
                    None
                } else {
                    Some(raw)
                }
            }
            _ => None,
        }
    }

    /// Integer value, if this is a non-negative integer.
    #[must_use]
    pub fn as_unsigned(&self) -> Option<u64> {
        match self.tag() {
            Tag::Short => u64::try_from(self.short_value()).ok(),
            Tag::Int if self.is_unsigned() => Some(self.long_bits().cast_unsigned()),
            Tag::Int => u64::try_from(self.long_bits()).ok(),
            _ => None,
        }
    }

    /// Any number widened to `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_double(&self) -> Option<f64> {
        match self.tag() {
            Tag::Float if self.is_double() => {
                let mut le = [0u8; 8];
                le.copy_from_slice(&self.bytes[2..10]);
                Some(f64::from_le_bytes(le))
            }
            Tag::Float => {
                let mut le = [0u8; 4];
                le.copy_from_slice(&self.bytes[2..6]);
                Some(f64::from(f32::from_le_bytes(le)))
            }
            Tag::Int if self.is_unsigned() => Some(self.long_bits().cast_unsigned() as f64),
            Tag::Short | Tag::Int => self.as_int().map(|n| n as f64),
            _ => None,
        }
    }

    /// Any number narrowed to `f32`. Stored 32-bit floats are returned
    /// with their exact bits.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_float(&self) -> Option<f32> {
        if self.tag() == Tag::Float && !self.is_double() {
            let mut le = [0u8; 4];
            le.copy_from_slice(&self.bytes[2..6]);
            return Some(f32::from_le_bytes(le));
        }

        self.as_double().map(|d| d as f32)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        if self.tag() != Tag::String {
            return None;
        }

        std::str::from_utf8(self.payload()).ok()
    }

    #[must_use]
    pub fn as_data(&self) -> Option<&'a [u8]> {
        (self.tag() == Tag::Binary).then(|| self.payload())
    }

    ///
    /// CONTAINERS
    ///

    #[must_use]
    pub fn as_array(&self) -> Option<Array<'a>> {
        (self.tag() == Tag::Array).then(|| Array::new(*self))
    }

    #[must_use]
    pub fn as_dict(&self) -> Option<Dict<'a>> {
        (self.tag() == Tag::Dict).then(|| Dict::new(*self))
    }

    /// Checked form of [`Self::as_array`].
    pub fn expect_array(&self) -> Result<Array<'a>, CodecError> {
        self.as_array().ok_or(CodecError::KindMismatch {
            expected: Tag::Array.label(),
            found: self.tag().label(),
        })
    }

    /// Checked form of [`Self::as_dict`].
    pub fn expect_dict(&self) -> Result<Dict<'a>, CodecError> {
        self.as_dict().ok_or(CodecError::KindMismatch {
            expected: Tag::Dict.label(),
            found: self.tag().label(),
        })
    }

    ///
    /// INTERNALS
    ///

    fn special(&self) -> Option<Special> {
        (self.tag() == Tag::Special)
            .then(|| Special::from_tiny(self.tiny()))
            .flatten()
    }

    // 12-bit two's complement split across the tiny nibble and one byte.
    fn short_value(&self) -> i64 {
        let raw = (i64::from(self.tiny()) << 8) | i64::from(self.bytes[1]);
        if raw & 0x800 != 0 { raw - 0x1000 } else { raw }
    }

    fn long_bits(&self) -> i64 {
        let width = usize::from(self.tiny() & 0x07) + 1;
        varint::get_int_of_length(&self.bytes[1..], width, self.is_unsigned())
    }

    // Length-prefixed payload of a string or binary.
    fn payload(&self) -> &'a [u8] {
        let prefix = self.length_prefix_len();
        &self.bytes[1 + prefix..]
    }

    // Number of varint bytes after the header for string/binary/array/dict.
    pub(crate) fn length_prefix_len(&self) -> usize {
        if self.tiny() < TINY_LENGTH_SENTINEL {
            0
        } else {
            read_length(self.bytes, self.tiny()).map_or(0, |(_, prefix)| prefix)
        }
    }

    // Count (or length) stored inline or after the header.
    pub(crate) fn stored_length(&self) -> usize {
        read_length(self.bytes, self.tiny()).map_or(0, |(len, _)| len)
    }
}
