use crate::value::{
    CodecError, Value,
    varint::{put_int_of_length, put_uvarint, uvarint_len},
};
use packdoc_primitives::{
    FLOAT_DOUBLE_FLAG, FLOAT_FILLER, INT_UNSIGNED_FLAG, SHORT_INT_MAX, SHORT_INT_MIN, Special,
    TINY_LENGTH_SENTINEL, Tag,
};

///
/// Scalar writers
///
/// Each writer appends exactly one encoded value to `out`. The matching
/// `encoded_len_*` helpers return the byte count without writing, so heap
/// allocations can be sized exactly up front.
///

pub fn write_special(out: &mut Vec<u8>, special: Special) {
    out.push(special.header());
}

pub fn write_null(out: &mut Vec<u8>) {
    write_special(out, Special::Null);
}

pub fn write_undefined(out: &mut Vec<u8>) {
    write_special(out, Special::Undefined);
}

pub fn write_bool(out: &mut Vec<u8>, value: bool) {
    write_special(out, if value { Special::True } else { Special::False });
}

pub fn write_int(out: &mut Vec<u8>, value: i64) {
    if (SHORT_INT_MIN..=SHORT_INT_MAX).contains(&value) {
        write_short(out, value);
    } else {
        write_long(out, value, false);
    }
}

pub fn write_uint(out: &mut Vec<u8>, value: u64) {
    match i64::try_from(value) {
        Ok(small) if small <= SHORT_INT_MAX => write_short(out, small),
        _ => write_long(out, value.cast_signed(), true),
    }
}

/// 32-bit float: header, one filler byte, 4 little-endian bytes.
pub fn write_float(out: &mut Vec<u8>, value: f32) {
    out.push(Tag::Float.header(0));
    out.push(FLOAT_FILLER);
    out.extend_from_slice(&value.to_le_bytes());
}

/// 64-bit float: header, one filler byte, 8 little-endian bytes.
pub fn write_double(out: &mut Vec<u8>, value: f64) {
    out.push(Tag::Float.header(FLOAT_DOUBLE_FLAG));
    out.push(FLOAT_FILLER);
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn write_string(out: &mut Vec<u8>, value: &str) {
    write_length_prefixed(out, Tag::String, value.as_bytes());
}

pub fn write_data(out: &mut Vec<u8>, value: &[u8]) {
    write_length_prefixed(out, Tag::Binary, value);
}

/// Header (and varint count, if needed) of an array or dict. For dicts,
/// `count` is the number of pairs.
pub fn write_collection_header(out: &mut Vec<u8>, tag: Tag, count: usize) {
    write_length_header(out, tag, count);
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn write_short(out: &mut Vec<u8>, value: i64) {
    out.push(Tag::Short.header(((value >> 8) & 0x0F) as u8));
    out.push((value & 0xFF) as u8);
}

#[allow(clippy::cast_possible_truncation)]
fn write_long(out: &mut Vec<u8>, bits: i64, is_unsigned: bool) {
    let mut buf = [0u8; 8];
    let width = put_int_of_length(&mut buf, bits, is_unsigned);
    let flag = if is_unsigned { INT_UNSIGNED_FLAG } else { 0 };

    out.push(Tag::Int.header((width - 1) as u8 | flag));
    out.extend_from_slice(&buf[..width]);
}

fn write_length_prefixed(out: &mut Vec<u8>, tag: Tag, payload: &[u8]) {
    write_length_header(out, tag, payload.len());
    out.extend_from_slice(payload);
}

#[allow(clippy::cast_possible_truncation)]
fn write_length_header(out: &mut Vec<u8>, tag: Tag, len: usize) {
    if len < usize::from(TINY_LENGTH_SENTINEL) {
        out.push(tag.header(len as u8));
    } else {
        out.push(tag.header(TINY_LENGTH_SENTINEL));
        put_uvarint(out, len as u64);
    }
}

///
/// Encoded lengths
///

#[must_use]
pub fn encoded_len_int(value: i64) -> usize {
    if (SHORT_INT_MIN..=SHORT_INT_MAX).contains(&value) {
        2
    } else {
        1 + put_int_of_length(&mut [0u8; 8], value, false)
    }
}

#[must_use]
pub fn encoded_len_uint(value: u64) -> usize {
    match i64::try_from(value) {
        Ok(small) if small <= SHORT_INT_MAX => 2,
        _ => 1 + put_int_of_length(&mut [0u8; 8], value.cast_signed(), true),
    }
}

#[must_use]
pub const fn encoded_len_string(len: usize) -> usize {
    encoded_len_data(len)
}

#[must_use]
pub const fn encoded_len_data(len: usize) -> usize {
    1 + length_prefix_len(len) + len
}

const fn length_prefix_len(len: usize) -> usize {
    if len < TINY_LENGTH_SENTINEL as usize {
        0
    } else {
        uvarint_len(len as u64)
    }
}

///
/// Encoder
///
/// Streaming builder for nested arrays and dicts. A container's header is
/// written when it is closed, once its child count is known.
///

#[derive(Debug, Default)]
pub struct Encoder {
    out: Vec<u8>,
    frames: Vec<Frame>,
}

#[derive(Debug)]
struct Frame {
    tag: Tag,
    start: usize,
    items: usize,
    awaiting_value: bool,
}

impl Encoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_null(&mut self) -> Result<&mut Self, CodecError> {
        self.scalar(write_null)
    }

    pub fn write_undefined(&mut self) -> Result<&mut Self, CodecError> {
        self.scalar(write_undefined)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<&mut Self, CodecError> {
        self.scalar(|out| write_bool(out, value))
    }

    pub fn write_int(&mut self, value: i64) -> Result<&mut Self, CodecError> {
        self.scalar(|out| write_int(out, value))
    }

    pub fn write_uint(&mut self, value: u64) -> Result<&mut Self, CodecError> {
        self.scalar(|out| write_uint(out, value))
    }

    pub fn write_float(&mut self, value: f32) -> Result<&mut Self, CodecError> {
        self.scalar(|out| write_float(out, value))
    }

    pub fn write_double(&mut self, value: f64) -> Result<&mut Self, CodecError> {
        self.scalar(|out| write_double(out, value))
    }

    pub fn write_string(&mut self, value: &str) -> Result<&mut Self, CodecError> {
        self.scalar(|out| write_string(out, value))
    }

    pub fn write_data(&mut self, value: &[u8]) -> Result<&mut Self, CodecError> {
        self.scalar(|out| write_data(out, value))
    }

    /// Copy an already-encoded value verbatim.
    pub fn write_value(&mut self, value: Value<'_>) -> Result<&mut Self, CodecError> {
        self.scalar(|out| out.extend_from_slice(value.as_bytes()))
    }

    /// Write the key of the next dict pair.
    pub fn write_key(&mut self, key: &str) -> Result<&mut Self, CodecError> {
        match self.frames.last_mut() {
            Some(frame) if frame.tag == Tag::Dict && !frame.awaiting_value => {
                frame.awaiting_value = true;
            }
            Some(frame) if frame.tag == Tag::Dict => {
                return Err(misuse("dict key written twice"));
            }
            _ => return Err(misuse("key written outside a dict")),
        }
        write_string(&mut self.out, key);

        Ok(self)
    }

    pub fn begin_array(&mut self) -> Result<&mut Self, CodecError> {
        self.begin(Tag::Array)
    }

    pub fn begin_dict(&mut self) -> Result<&mut Self, CodecError> {
        self.begin(Tag::Dict)
    }

    pub fn end_array(&mut self) -> Result<&mut Self, CodecError> {
        self.end(Tag::Array)
    }

    pub fn end_dict(&mut self) -> Result<&mut Self, CodecError> {
        self.end(Tag::Dict)
    }

    /// Return the single encoded root value.
    pub fn finish(self) -> Result<Vec<u8>, CodecError> {
        if !self.frames.is_empty() {
            return Err(misuse("container left open"));
        }
        if self.out.is_empty() {
            return Err(misuse("nothing was written"));
        }

        Ok(self.out)
    }

    fn scalar(&mut self, write: impl FnOnce(&mut Vec<u8>)) -> Result<&mut Self, CodecError> {
        self.before_value()?;
        write(&mut self.out);
        self.after_value();

        Ok(self)
    }

    fn begin(&mut self, tag: Tag) -> Result<&mut Self, CodecError> {
        self.before_value()?;
        self.frames.push(Frame {
            tag,
            start: self.out.len(),
            items: 0,
            awaiting_value: false,
        });

        Ok(self)
    }

    fn end(&mut self, tag: Tag) -> Result<&mut Self, CodecError> {
        let frame = match self.frames.pop() {
            Some(frame) if frame.tag == tag && !frame.awaiting_value => frame,
            Some(frame) if frame.tag == tag => {
                self.frames.push(frame);
                return Err(misuse("dict closed with a dangling key"));
            }
            Some(frame) => {
                self.frames.push(frame);
                return Err(misuse("mismatched container close"));
            }
            None => return Err(misuse("no open container")),
        };

        let mut header = Vec::with_capacity(1 + length_prefix_len(frame.items));
        write_collection_header(&mut header, frame.tag, frame.items);
        self.out.splice(frame.start..frame.start, header);
        self.after_value();

        Ok(self)
    }

    fn before_value(&self) -> Result<(), CodecError> {
        match self.frames.last() {
            Some(frame) if frame.tag == Tag::Dict && !frame.awaiting_value => {
                Err(misuse("dict value written without a key"))
            }
            Some(_) => Ok(()),
            None if self.out.is_empty() => Ok(()),
            None => Err(misuse("only one root value may be written")),
        }
    }

    fn after_value(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            if frame.tag == Tag::Dict {
                frame.awaiting_value = false;
            }
            frame.items += 1;
        }
    }
}

const fn misuse(reason: &'static str) -> CodecError {
    CodecError::EncoderMisuse { reason }
}
