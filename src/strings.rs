//! String item codecs.
//!
//! UTF-16 strings are big-endian code units, UTF-8 and ISO-7 strings are bytes.
//! Stored strings may or may not carry a null terminator; decoding stops at the
//! first null and sizes always count a terminator, so a caller allocating from a
//! size has room for one.

use crate::error::{Error, Result};

/// Size in UTF-16 code units, including a null terminator.
#[must_use]
pub fn utf16_size(bytes: &[u8]) -> usize {
    let units = bytes.len() / 2;
    let end = bytes
        .chunks_exact(2)
        .position(|unit| unit == [0, 0])
        .unwrap_or(units);
    end + 1
}

/// Decode a big-endian UTF-16 string, stopping at the first null.
pub fn decode_utf16(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::InvalidString(format!(
            "odd UTF-16 byte length {}",
            bytes.len()
        )));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|unit| u16::from_be_bytes([unit[0], unit[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16(&units).map_err(|e| Error::InvalidString(e.to_string()))
}

/// Encode a big-endian UTF-16 string with a null terminator.
#[must_use]
pub fn encode_utf16(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity((s.len() + 1) * 2);
    for unit in s.encode_utf16().chain(std::iter::once(0)) {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

/// Decode a sequence of null-terminated UTF-16 strings.
///
/// A final string without a terminator is still returned.
pub fn decode_utf16_array(bytes: &[u8]) -> Result<Vec<String>> {
    if bytes.len() % 2 != 0 {
        return Err(Error::InvalidString(format!(
            "odd UTF-16 byte length {}",
            bytes.len()
        )));
    }
    let mut strings = Vec::new();
    let mut current = Vec::new();
    for unit in bytes.chunks_exact(2) {
        let unit = u16::from_be_bytes([unit[0], unit[1]]);
        if unit == 0 {
            strings.push(String::from_utf16(&current).map_err(|e| Error::InvalidString(e.to_string()))?);
            current.clear();
        } else {
            current.push(unit);
        }
    }
    if !current.is_empty() {
        strings.push(String::from_utf16(&current).map_err(|e| Error::InvalidString(e.to_string()))?);
    }
    Ok(strings)
}

/// Encode a sequence of strings, each with a null terminator.
#[must_use]
pub fn encode_utf16_array<S: AsRef<str>>(strings: &[S]) -> Vec<u8> {
    strings
        .iter()
        .flat_map(|s| encode_utf16(s.as_ref()))
        .collect()
}

/// Size in bytes of a UTF-8 or ISO-7 string, including a null terminator.
#[must_use]
pub fn byte_string_size(bytes: &[u8]) -> usize {
    bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len()) + 1
}

fn until_null(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

/// Decode a UTF-8 string, stopping at the first null.
pub fn decode_utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(until_null(bytes))
        .map(str::to_owned)
        .map_err(|e| Error::InvalidString(e.to_string()))
}

/// Encode a UTF-8 string with a null terminator.
#[must_use]
pub fn encode_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 1);
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    out
}

/// Decode an ISO-7 (7-bit ASCII) string, stopping at the first null.
///
/// Bytes outside the 7-bit range are replaced with `?`.
#[must_use]
pub fn decode_iso7(bytes: &[u8]) -> String {
    until_null(bytes)
        .iter()
        .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
        .collect()
}

/// Encode an ISO-7 string with a null terminator, replacing non-ASCII characters with `?`.
#[must_use]
pub fn encode_iso7(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
        .chain(std::iter::once(0))
        .collect()
}
