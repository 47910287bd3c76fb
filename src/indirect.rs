//! Indirect values: a byte-order marker, a type label and a payload.
//!
//! Avid files carry user attributes (TaggedValue) as indirect values. The type
//! label is stored half-swapped, and in little-endian values its leading
//! fields are byte-swapped as well.

use crate::error::{Error, Result};
use crate::strings;
use crate::types::Ul;

const BIG_ENDIAN_MARKER: u8 = 0x42;
const LITTLE_ENDIAN_MARKER: u8 = 0x4c;

/// Type label of a UTF-16 string payload, in its big-endian stored form.
pub const STRING_TYPE: Ul = Ul::new([
    0x01, 0x10, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x06, 0x0e, 0x2b, 0x34, 0x01, 0x04, 0x01, 0x01,
]);

/// Type label of an Int32 payload, in its big-endian stored form.
pub const INT32_TYPE: Ul = Ul::new([
    0x01, 0x01, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x06, 0x0e, 0x2b, 0x34, 0x01, 0x04, 0x01, 0x01,
]);

/// Byte order of an indirect payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl ByteOrder {
    /// Byte order selected by a leading marker byte.
    #[must_use]
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            BIG_ENDIAN_MARKER => Some(Self::BigEndian),
            LITTLE_ENDIAN_MARKER => Some(Self::LittleEndian),
            _ => None,
        }
    }
}

/// A decoded indirect value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indirect {
    pub byte_order: ByteOrder,
    /// Type label normalised to the big-endian stored form.
    pub type_ul: Ul,
    pub payload: Vec<u8>,
}

fn swap_type_ul(stored: &[u8; 16]) -> Ul {
    let mut ul = *stored;
    ul[..4].reverse();
    ul[4..6].reverse();
    ul[6..8].reverse();
    Ul(ul)
}

impl Indirect {
    /// Decode an indirect value, checking the byte-order marker.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 17 {
            return Err(Error::InvalidIndirect(format!(
                "{} bytes is too short",
                bytes.len()
            )));
        }
        let byte_order = ByteOrder::from_marker(bytes[0]).ok_or_else(|| {
            Error::InvalidIndirect(format!("unknown byte order marker 0x{:02x}", bytes[0]))
        })?;
        let mut stored = [0u8; 16];
        stored.copy_from_slice(&bytes[1..17]);
        let type_ul = match byte_order {
            ByteOrder::BigEndian => Ul(stored),
            ByteOrder::LittleEndian => swap_type_ul(&stored),
        };
        Ok(Self {
            byte_order,
            type_ul,
            payload: bytes[17..].to_vec(),
        })
    }

    /// Encode in big-endian form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(17 + self.payload.len());
        match self.byte_order {
            ByteOrder::BigEndian => {
                out.push(BIG_ENDIAN_MARKER);
                out.extend_from_slice(self.type_ul.as_bytes());
            }
            ByteOrder::LittleEndian => {
                out.push(LITTLE_ENDIAN_MARKER);
                out.extend_from_slice(swap_type_ul(self.type_ul.as_bytes()).as_bytes());
            }
        }
        out.extend_from_slice(&self.payload);
        out
    }

    /// Build a big-endian UTF-16 string value.
    #[must_use]
    pub fn from_string(s: &str) -> Self {
        Self {
            byte_order: ByteOrder::BigEndian,
            type_ul: STRING_TYPE,
            payload: strings::encode_utf16(s),
        }
    }

    /// Build a big-endian Int32 value.
    #[must_use]
    pub fn from_i32(value: i32) -> Self {
        Self {
            byte_order: ByteOrder::BigEndian,
            type_ul: INT32_TYPE,
            payload: value.to_be_bytes().to_vec(),
        }
    }

    /// Decode the payload as a string.
    pub fn as_string(&self) -> Result<String> {
        self.expect_type(&STRING_TYPE, "string")?;
        match self.byte_order {
            ByteOrder::BigEndian => strings::decode_utf16(&self.payload),
            ByteOrder::LittleEndian => {
                let swapped: Vec<u8> = self
                    .payload
                    .chunks(2)
                    .flat_map(|unit| unit.iter().rev().copied())
                    .collect();
                strings::decode_utf16(&swapped)
            }
        }
    }

    /// Decode the payload as an Int32.
    pub fn as_i32(&self) -> Result<i32> {
        self.expect_type(&INT32_TYPE, "Int32")?;
        let bytes: [u8; 4] = self.payload.as_slice().try_into().map_err(|_| {
            Error::InvalidIndirect(format!("Int32 payload of {} bytes", self.payload.len()))
        })?;
        Ok(match self.byte_order {
            ByteOrder::BigEndian => i32::from_be_bytes(bytes),
            ByteOrder::LittleEndian => i32::from_le_bytes(bytes),
        })
    }

    fn expect_type(&self, expected: &Ul, name: &str) -> Result<()> {
        if self.type_ul == *expected {
            Ok(())
        } else {
            Err(Error::InvalidIndirect(format!(
                "type {} is not {name}",
                self.type_ul
            )))
        }
    }
}
