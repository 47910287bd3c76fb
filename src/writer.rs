//! Binary writer for serializing KLV values.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Ul, Umid};

/// A binary writer for producing big-endian data.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    data: Vec<u8>,
}

impl Writer {
    /// Create a new empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create a new writer with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Get the current length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the writer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the written data.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Get a reference to the written data.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a big-endian u16.
    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a big-endian u32.
    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a big-endian i16.
    pub fn write_i16(&mut self, value: i16) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a big-endian i32.
    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a slice of bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write a 16-byte universal label.
    pub fn write_ul(&mut self, ul: &Ul) {
        self.data.extend_from_slice(ul.as_bytes());
    }

    /// Write a 16-byte UUID.
    pub fn write_uuid(&mut self, uuid: &Uuid) {
        self.data.extend_from_slice(uuid.as_bytes());
    }

    /// Write a 32-byte UMID.
    pub fn write_umid(&mut self, umid: &Umid) {
        self.data.extend_from_slice(umid.as_bytes());
    }

    /// Write an array/batch header.
    pub fn write_array_header(&mut self, count: u32, element_len: u32) {
        self.write_u32(count);
        self.write_u32(element_len);
    }

    /// Write a BER length using exactly `llen` bytes.
    pub fn write_ber_length(&mut self, len: u64, llen: u8) -> Result<()> {
        let encoded = crate::klv::encode_ber_length(len, llen)?;
        self.data.extend_from_slice(&encoded);
        Ok(())
    }

    /// Write a local set item header and value.
    pub fn write_local_item(&mut self, key: &Ul, tag: u16, value: &[u8]) -> Result<()> {
        let len = u16::try_from(value.len()).map_err(|_| Error::ItemTooLarge {
            key: *key,
            len: value.len(),
        })?;
        self.write_u16(tag);
        self.write_u16(len);
        self.write_bytes(value);
        Ok(())
    }
}
