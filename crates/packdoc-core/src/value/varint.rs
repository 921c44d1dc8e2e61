use crate::value::CodecError;

///
/// Variable-length integers
///
/// Unsigned LEB128 for lengths and counts, plus minimal-width little-endian
/// integers for the long `int` form.
///

/// Longest possible varint encoding of a `u64`.
pub const MAX_VARINT_LEN64: usize = 10;

/// Number of bytes `put_uvarint` writes for `n`.
#[must_use]
pub const fn uvarint_len(mut n: u64) -> usize {
    let mut len = 1;
    while n >= 0x80 {
        n >>= 7;
        len += 1;
    }

    len
}

/// Append `n` as an unsigned varint. Returns the number of bytes written.
#[allow(clippy::cast_possible_truncation)]
pub fn put_uvarint(out: &mut Vec<u8>, mut n: u64) -> usize {
    let start = out.len();
    while n >= 0x80 {
        out.push((n as u8) | 0x80);
        n >>= 7;
    }
    out.push(n as u8);

    out.len() - start
}

/// Read an unsigned varint from the front of `bytes`.
/// Returns the value and the number of bytes consumed.
pub fn get_uvarint(bytes: &[u8]) -> Result<(u64, usize), CodecError> {
    let mut value: u64 = 0;
    let mut shift = 0u32;

    for (idx, &byte) in bytes.iter().enumerate().take(MAX_VARINT_LEN64) {
        let low = u64::from(byte & 0x7F);
        if shift == 63 && low > 1 {
            return Err(CodecError::MalformedVarint);
        }
        value |= low << shift;

        if byte & 0x80 == 0 {
            return Ok((value, idx + 1));
        }
        shift += 7;
    }

    if bytes.len() < MAX_VARINT_LEN64 {
        Err(CodecError::Truncated {
            needed: bytes.len() + 1,
            available: bytes.len(),
        })
    } else {
        Err(CodecError::MalformedVarint)
    }
}

/// Write `n` little-endian into `buf` using the fewest bytes that still
/// decode to the same value. Returns the width (1..=8).
///
/// Signed widths keep the top bit of the last byte equal to the sign.
pub fn put_int_of_length(buf: &mut [u8; 8], n: i64, is_unsigned: bool) -> usize {
    *buf = n.to_le_bytes();
    let mut size = 8;

    if is_unsigned {
        while size > 1 && buf[size - 1] == 0 {
            size -= 1;
        }
    } else {
        let fill = if n < 0 { 0xFF } else { 0x00 };
        while size > 1 && buf[size - 1] == fill && (buf[size - 2] & 0x80) == (fill & 0x80) {
            size -= 1;
        }
    }

    size
}

/// Read a `width`-byte little-endian integer, sign-extending unless
/// `is_unsigned`. Returns the raw 64 bits.
#[must_use]
pub fn get_int_of_length(bytes: &[u8], width: usize, is_unsigned: bool) -> i64 {
    let width = width.clamp(1, 8).min(bytes.len());
    let negative = !is_unsigned && width > 0 && bytes[width - 1] & 0x80 != 0;
    let mut buf = if negative { [0xFF; 8] } else { [0x00; 8] };
    buf[..width].copy_from_slice(&bytes[..width]);

    i64::from_le_bytes(buf)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uvarint_boundaries_use_expected_widths() {
        for (n, len) in [
            (0u64, 1usize),
            (0x7F, 1),
            (0x80, 2),
            (0x3FFF, 2),
            (0x4000, 3),
            (u64::from(u32::MAX), 5),
            (u64::MAX, MAX_VARINT_LEN64),
        ] {
            let mut out = Vec::new();
            assert_eq!(put_uvarint(&mut out, n), len, "width of {n}");
            assert_eq!(uvarint_len(n), len);
            assert_eq!(get_uvarint(&out), Ok((n, len)));
        }
    }

    #[test]
    fn uvarint_decode_rejects_truncation_and_overflow() {
        assert_eq!(
            get_uvarint(&[0x80, 0x80]),
            Err(CodecError::Truncated {
                needed: 3,
                available: 2
            })
        );
        assert_eq!(get_uvarint(&[0xFF; 11]), Err(CodecError::MalformedVarint));
        assert_eq!(
            get_uvarint(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02]),
            Err(CodecError::MalformedVarint)
        );
    }

    #[test]
    fn int_of_length_trims_to_minimal_width() {
        let mut buf = [0u8; 8];
        assert_eq!(put_int_of_length(&mut buf, 2048, false), 2);
        assert_eq!(put_int_of_length(&mut buf, 127, false), 1);
        assert_eq!(put_int_of_length(&mut buf, 128, false), 2);
        assert_eq!(put_int_of_length(&mut buf, 128, true), 1);
        assert_eq!(put_int_of_length(&mut buf, -128, false), 1);
        assert_eq!(put_int_of_length(&mut buf, -129, false), 2);
        assert_eq!(put_int_of_length(&mut buf, i64::MIN, false), 8);
        assert_eq!(put_int_of_length(&mut buf, -1, true), 8);
    }

    #[test]
    fn int_of_length_sign_extends_signed_reads() {
        let mut buf = [0u8; 8];
        for n in [-129i64, -1, 0, 1, 300, i64::MAX, i64::MIN] {
            let width = put_int_of_length(&mut buf, n, false);
            assert_eq!(get_int_of_length(&buf, width, false), n);
        }

        let width = put_int_of_length(&mut buf, u64::MAX as i64, true);
        assert_eq!(get_int_of_length(&buf, width, true) as u64, u64::MAX);
    }
}
