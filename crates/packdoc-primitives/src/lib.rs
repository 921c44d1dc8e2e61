//! Shared wire vocabulary for packed document values: the 4-bit tag table,
//! tiny-payload constants, and per-tag size rules.
//!
//! This crate has no dependencies so every layer (codec, heap, cursor, and
//! any external transport) agrees on one header layout.

#[macro_use]
mod macros;

///
/// CONSTANTS
///

/// Byte stored immediately before the header of every heap allocation.
pub const GUARD_BYTE: u8 = 0xFF;

/// Tiny nibble marking "length follows as a varint" for strings, binaries,
/// and collection counts.
pub const TINY_LENGTH_SENTINEL: u8 = 0x0F;

/// Largest value encoded inline as a 12-bit short int.
pub const SHORT_INT_MAX: i64 = 2047;

/// Smallest value encoded inline as a 12-bit short int.
///
/// -2048 fits in 12 bits but is deliberately routed to the long form.
pub const SHORT_INT_MIN: i64 = -2047;

/// Int tiny-payload flag marking an unsigned long int.
pub const INT_UNSIGNED_FLAG: u8 = 0x08;

/// Float tiny-payload flag marking a 64-bit float.
pub const FLOAT_DOUBLE_FLAG: u8 = 0x08;

/// Filler byte written between a float header and its little-endian payload.
pub const FLOAT_FILLER: u8 = 0x00;

///
/// Special
///
/// Tiny payloads of the `Special` tag.
///

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Special {
    Null = 0x0,
    False = 0x4,
    True = 0x8,
    Undefined = 0xC,
}

impl Special {
    #[must_use]
    pub const fn from_tiny(tiny: u8) -> Option<Self> {
        match tiny {
            0x0 => Some(Self::Null),
            0x4 => Some(Self::False),
            0x8 => Some(Self::True),
            0xC => Some(Self::Undefined),
            _ => None,
        }
    }

    #[must_use]
    pub const fn to_tiny(self) -> u8 {
        self as u8
    }

    /// Full one-byte encoding of this special value.
    #[must_use]
    pub const fn header(self) -> u8 {
        Tag::Special.header(self.to_tiny())
    }
}

///
/// Tag
///
/// 4-bit kind discriminator stored in the high nibble of every header byte.
///
/// IMPORTANT:
/// Nibble values are part of the wire format and must never be renumbered.
///

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Tag {
    Short = 0x0,
    Int = 0x1,
    Float = 0x2,
    Special = 0x3,
    String = 0x4,
    Binary = 0x5,
    Array = 0x6,
    Dict = 0x7,
}

impl Tag {
    /// Decode the tag from a header byte. Nibbles 8..=15 are unassigned.
    #[must_use]
    pub const fn from_header(header: u8) -> Option<Self> {
        tag_registry!(tag_from_nibble_registry, header >> 4)
    }

    /// Build a header byte from this tag and a tiny payload.
    #[must_use]
    pub const fn header(self, tiny: u8) -> u8 {
        ((self as u8) << 4) | (tiny & 0x0F)
    }

    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Return the full metadata descriptor for one tag.
    #[must_use]
    pub const fn metadata(self) -> TagMetadata {
        tag_registry!(metadata_from_registry, self)
    }

    /// Stable human-readable label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        self.metadata().label
    }

    #[must_use]
    pub const fn size_rule(self) -> SizeRule {
        self.metadata().size_rule
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.metadata().is_numeric
    }

    #[must_use]
    pub const fn is_collection(self) -> bool {
        self.metadata().is_collection
    }
}

/// Split a header byte into `(tag nibble, tiny nibble)`.
#[must_use]
pub const fn split_header(header: u8) -> (u8, u8) {
    (header >> 4, header & 0x0F)
}

///
/// TagMetadata
///
/// Per-tag layout metadata shared by the codec and heap layers.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TagMetadata {
    pub label: &'static str,
    pub size_rule: SizeRule,
    pub is_numeric: bool,
    pub is_collection: bool,
}

///
/// SizeRule
///
/// How the total encoded length of a value is recovered from its header.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SizeRule {
    /// Header plus a constant number of trailing bytes (total given).
    Fixed(usize),
    /// Header plus `(tiny & 0x07) + 1` little-endian integer bytes.
    IntWidth,
    /// Header, filler, then 4 or 8 bytes depending on the double flag.
    FloatWidth,
    /// Inline length or sentinel + varint length, then raw bytes.
    LengthPrefixed,
    /// Inline count or sentinel + varint count, then self-sized children.
    Counted,
}

/// Ordered list of all tags in registry order.
pub const ALL_TAGS: [Tag; 8] = tag_registry!(all_tags_from_registry);

///
/// TESTS
///
