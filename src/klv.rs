//! KLV framing: BER lengths, key/length headers on byte streams and fill items.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::types::Ul;

/// Key length in bytes.
pub const KEY_LEN: u64 = 16;

/// Maximum BER length field width (0x88 followed by 8 bytes).
pub const MAX_LLEN: u8 = 9;

/// Fill item key used by most writers (version byte 0x01).
pub const LEGACY_FILL_KEY: Ul = Ul::new([
    0x06, 0x0e, 0x2b, 0x34, 0x01, 0x01, 0x01, 0x01, 0x03, 0x01, 0x02, 0x10, 0x01, 0x00, 0x00, 0x00,
]);

/// Fill item key as registered in SMPTE RP 210 (version byte 0x02).
pub const COMPLIANT_FILL_KEY: Ul = Ul::new([
    0x06, 0x0e, 0x2b, 0x34, 0x01, 0x01, 0x01, 0x02, 0x03, 0x01, 0x02, 0x10, 0x01, 0x00, 0x00, 0x00,
]);

/// A decoded key and length, with the width of the length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kl {
    pub key: Ul,
    /// Width of the BER length field in bytes.
    pub llen: u8,
    /// Value length.
    pub len: u64,
}

impl Kl {
    /// Size of the key and length fields.
    #[must_use]
    pub fn header_size(&self) -> u64 {
        KEY_LEN + u64::from(self.llen)
    }

    /// Size of the whole KLV triple.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.header_size() + self.len
    }

    /// Size of the whole KLV triple, or `None` if it does not fit a u64.
    #[must_use]
    pub fn checked_total_size(&self) -> Option<u64> {
        self.header_size().checked_add(self.len)
    }
}

/// Check whether a key identifies a fill item, ignoring the version byte.
#[must_use]
pub fn is_fill_key(key: &Ul) -> bool {
    key.as_bytes()[..7] == LEGACY_FILL_KEY.as_bytes()[..7]
        && key.as_bytes()[8..] == LEGACY_FILL_KEY.as_bytes()[8..]
}

/// Minimal BER length field width for `len`.
#[must_use]
pub fn min_llen(len: u64) -> u8 {
    if len < 0x80 {
        1
    } else {
        let bytes = 8 - (len.leading_zeros() / 8) as u8;
        1 + bytes
    }
}

/// Length field width to use for `len` given a minimum width.
#[must_use]
pub fn llen_for(len: u64, min: u8) -> u8 {
    min_llen(len).max(min.min(MAX_LLEN))
}

/// Encode `len` into a BER length field of exactly `llen` bytes.
pub fn encode_ber_length(len: u64, llen: u8) -> Result<Vec<u8>> {
    if llen == 0 || llen > MAX_LLEN || min_llen(len) > llen {
        return Err(Error::LengthOverflow { len, llen });
    }
    if llen == 1 {
        return Ok(vec![len as u8]);
    }
    let count = usize::from(llen - 1);
    let mut out = Vec::with_capacity(usize::from(llen));
    out.push(0x80 | (llen - 1));
    out.extend_from_slice(&len.to_be_bytes()[8 - count..]);
    Ok(out)
}

/// Decode a BER length from the start of `data`, returning `(len, llen)`.
pub fn decode_ber_length(data: &[u8]) -> Result<(u64, u8)> {
    let Some(&first) = data.first() else {
        return Err(Error::InvalidBerLength("no data".into()));
    };
    if first < 0x80 {
        return Ok((u64::from(first), 1));
    }
    let count = first & 0x7f;
    if count == 0 {
        return Err(Error::InvalidBerLength("indefinite length not supported".into()));
    }
    if count > 8 {
        return Err(Error::InvalidBerLength(format!(
            "{count} length bytes exceeds 8"
        )));
    }
    let Some(bytes) = data.get(1..=usize::from(count)) else {
        return Err(Error::InvalidBerLength("not enough bytes".into()));
    };
    let len = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
    Ok((len, count + 1))
}

/// Read a 16-byte key from a stream.
pub fn read_key<R: Read>(reader: &mut R) -> Result<Ul> {
    let mut key = [0u8; 16];
    reader.read_exact(&mut key)?;
    Ok(Ul(key))
}

/// Read a BER length from a stream, returning `(len, llen)`.
pub fn read_ber_length<R: Read>(reader: &mut R) -> Result<(u64, u8)> {
    let first = reader.read_u8()?;
    if first < 0x80 {
        return Ok((u64::from(first), 1));
    }
    let count = first & 0x7f;
    if count == 0 || count > 8 {
        return Err(Error::InvalidBerLength(format!(
            "unsupported length prefix 0x{first:02x}"
        )));
    }
    let len = reader.read_uint::<BigEndian>(usize::from(count))?;
    Ok((len, count + 1))
}

/// Read a key and length from a stream.
pub fn read_kl<R: Read>(reader: &mut R) -> Result<Kl> {
    let key = read_key(reader)?;
    let (len, llen) = read_ber_length(reader)?;
    Ok(Kl { key, llen, len })
}

/// Write a key and a minimally encoded length.
pub fn write_kl<W: Write>(writer: &mut W, key: &Ul, len: u64) -> Result<u8> {
    let llen = min_llen(len);
    write_fixed_kl(writer, key, llen, len)?;
    Ok(llen)
}

/// Write a key and a length encoded in exactly `llen` bytes.
pub fn write_fixed_kl<W: Write>(writer: &mut W, key: &Ul, llen: u8, len: u64) -> Result<()> {
    if llen == 0 || llen > MAX_LLEN || min_llen(len) > llen {
        return Err(Error::LengthOverflow { len, llen });
    }
    writer.write_all(key.as_bytes())?;
    if llen == 1 {
        writer.write_u8(len as u8)?;
    } else {
        writer.write_u8(0x80 | (llen - 1))?;
        writer.write_uint::<BigEndian>(len, usize::from(llen - 1))?;
    }
    Ok(())
}

/// Read exactly `len` value bytes.
pub fn read_value<R: Read>(reader: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut value = Vec::new();
    let read = reader.by_ref().take(len).read_to_end(&mut value)?;
    if read as u64 != len {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated KLV value").into());
    }
    Ok(value)
}

/// Skip `len` value bytes.
pub fn skip<R: Read>(reader: &mut R, len: u64) -> Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(len), &mut io::sink())?;
    if skipped != len {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated KLV value").into());
    }
    Ok(())
}

/// Write a fill KLV occupying exactly `total_size` bytes.
///
/// The length field is at least `min` bytes wide, widened when needed.
pub fn write_fill<W: Write>(writer: &mut W, key: &Ul, total_size: u64, min: u8) -> Result<()> {
    for llen in min.max(1)..=MAX_LLEN {
        let Some(len) = total_size.checked_sub(KEY_LEN + u64::from(llen)) else {
            break;
        };
        if min_llen(len) <= llen {
            write_fixed_kl(writer, key, llen, len)?;
            io::copy(&mut io::repeat(0).take(len), writer)?;
            return Ok(());
        }
    }
    Err(Error::LengthOverflow {
        len: total_size,
        llen: min,
    })
}
