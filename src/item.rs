//! Metadata items and array/batch value helpers.
//!
//! Array and batch values share one layout: an 8-byte header holding the
//! element count and element length, followed by the elements.

use std::iter::FusedIterator;

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::types::{FixedWire, Ul};
use crate::writer::Writer;

/// Length of the array/batch header.
pub const ARRAY_HEADER_LEN: usize = 8;

/// One local set item: a key, its local tag and the raw value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataItem {
    key: Ul,
    tag: u16,
    value: Vec<u8>,
    is_persistent: bool,
}

impl MetadataItem {
    /// Create an item that has not been read from or written to a file.
    #[must_use]
    pub fn new(key: Ul, tag: u16, value: Vec<u8>) -> Self {
        Self {
            key,
            tag,
            value,
            is_persistent: false,
        }
    }

    pub(crate) fn persistent(key: Ul, tag: u16, value: Vec<u8>) -> Self {
        Self {
            key,
            tag,
            value,
            is_persistent: true,
        }
    }

    /// Item key.
    #[must_use]
    pub fn key(&self) -> &Ul {
        &self.key
    }

    /// Local tag; 0 until one has been assigned.
    #[must_use]
    pub fn tag(&self) -> u16 {
        self.tag
    }

    /// Raw value bytes.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Value length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Check for an empty value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Whether the item was read from or written to a file unchanged.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.is_persistent
    }

    /// Size of the encoded local item (tag, length and value).
    #[must_use]
    pub fn encoded_len(&self) -> u64 {
        4 + self.value.len() as u64
    }

    pub(crate) fn set_value(&mut self, value: Vec<u8>) {
        self.value = value;
        self.is_persistent = false;
    }

    pub(crate) fn value_mut(&mut self) -> &mut Vec<u8> {
        self.is_persistent = false;
        &mut self.value
    }

    pub(crate) fn set_tag(&mut self, tag: u16) {
        self.tag = tag;
    }

    pub(crate) fn mark_persistent(&mut self) {
        self.is_persistent = true;
    }

    // ==== Arrays ====

    /// Array header as `(count, element_len)`, checked against the value length.
    pub fn array_header(&self) -> Result<(u32, u32)> {
        array_header(&self.value)
    }

    /// Iterate over array elements.
    ///
    /// Each call re-reads the header, so a new iterator always reflects the
    /// current value.
    pub fn array_elements(&self) -> Result<ArrayElements<'_>> {
        let (count, element_len) = self.array_header()?;
        Ok(ArrayElements {
            data: &self.value[ARRAY_HEADER_LEN..],
            element_len: element_len as usize,
            remaining: count as usize,
        })
    }

    /// Get one array element.
    pub fn array_element(&self, index: usize) -> Result<&[u8]> {
        let (count, element_len) = self.array_header()?;
        if index >= count as usize {
            return Err(Error::MalformedArray(format!(
                "element {index} out of range for {count} elements"
            )));
        }
        let start = ARRAY_HEADER_LEN + index * element_len as usize;
        Ok(&self.value[start..start + element_len as usize])
    }
}

/// Parse and check an array header.
///
/// Fails unless the value is exactly `8 + count * element_len` bytes long.
pub fn array_header(value: &[u8]) -> Result<(u32, u32)> {
    let mut reader = Reader::new(value);
    let (count, element_len) = reader.read_array_header().map_err(|_| {
        Error::MalformedArray(format!("{} bytes is too short for a header", value.len()))
    })?;
    let expected = ARRAY_HEADER_LEN as u64 + u64::from(count) * u64::from(element_len);
    if expected != value.len() as u64 {
        return Err(Error::MalformedArray(format!(
            "{count} elements of {element_len} bytes do not fill {} bytes",
            value.len()
        )));
    }
    Ok((count, element_len))
}

/// Decode an array of fixed size values.
pub fn decode_array<T: FixedWire>(value: &[u8]) -> Result<Vec<T>> {
    let (count, element_len) = array_header(value)?;
    if count > 0 && element_len as usize != T::LEN {
        return Err(Error::TypeMismatch {
            type_name: T::NAME,
            actual: element_len as usize,
        });
    }
    value[ARRAY_HEADER_LEN..]
        .chunks_exact(T::LEN)
        .map(T::decode)
        .collect()
}

/// Encode an array of fixed size values.
pub fn encode_array<T: FixedWire>(values: &[T]) -> Result<Vec<u8>> {
    let count = u32::try_from(values.len())
        .map_err(|_| Error::MalformedArray(format!("{} elements is too many", values.len())))?;
    let mut writer = Writer::with_capacity(ARRAY_HEADER_LEN + values.len() * T::LEN);
    writer.write_array_header(count, T::LEN as u32);
    for value in values {
        value.encode_to(&mut writer);
    }
    Ok(writer.into_inner())
}

/// Iterator over the elements of an array or batch value.
#[derive(Debug, Clone)]
pub struct ArrayElements<'a> {
    data: &'a [u8],
    element_len: usize,
    remaining: usize,
}

impl<'a> Iterator for ArrayElements<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let (element, rest) = self.data.split_at(self.element_len);
        self.data = rest;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ArrayElements<'_> {}

impl FusedIterator for ArrayElements<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(value: Vec<u8>) -> MetadataItem {
        MetadataItem::new(Ul::default(), 0x1001, value)
    }

    #[test]
    fn test_array_header_checked() {
        assert_eq!(array_header(&[0, 0, 0, 0, 0, 0, 0, 16]).unwrap(), (0, 16));
        assert_eq!(
            array_header(&[0, 0, 0, 2, 0, 0, 0, 1, 0xaa, 0xbb]).unwrap(),
            (2, 1)
        );
        // Count too large for the value
        assert!(array_header(&[0, 0, 0, 3, 0, 0, 0, 1, 0xaa, 0xbb]).is_err());
        // Trailing bytes
        assert!(array_header(&[0, 0, 0, 1, 0, 0, 0, 1, 0xaa, 0xbb]).is_err());
        assert!(array_header(&[0, 0, 0, 1]).is_err());
    }

    #[test]
    fn test_elements_iterate() {
        let item = item(vec![0, 0, 0, 3, 0, 0, 0, 2, 1, 2, 3, 4, 5, 6]);
        let elements = item.array_elements().unwrap();
        assert_eq!(elements.len(), 3);
        let collected: Vec<&[u8]> = elements.collect();
        assert_eq!(collected, vec![&[1u8, 2][..], &[3, 4], &[5, 6]]);
        // A fresh iterator restarts from the first element
        assert_eq!(item.array_elements().unwrap().next(), Some(&[1u8, 2][..]));
        assert_eq!(item.array_element(2).unwrap(), &[5, 6]);
        assert!(item.array_element(3).is_err());
    }

    #[test]
    fn test_zero_length_elements() {
        let item = item(vec![0, 0, 0, 2, 0, 0, 0, 0]);
        let collected: Vec<&[u8]> = item.array_elements().unwrap().collect();
        assert_eq!(collected, vec![&[] as &[u8], &[]]);
    }

    #[test]
    fn test_typed_arrays() {
        let encoded = encode_array(&[1u32, 0x0102_0304]).unwrap();
        assert_eq!(
            encoded,
            vec![0, 0, 0, 2, 0, 0, 0, 4, 0, 0, 0, 1, 1, 2, 3, 4]
        );
        assert_eq!(decode_array::<u32>(&encoded).unwrap(), vec![1, 0x0102_0304]);
        assert!(matches!(
            decode_array::<u16>(&encoded),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(decode_array::<u16>(&[0, 0, 0, 0, 0, 0, 0, 0]).unwrap().is_empty());
    }

    #[test]
    fn test_modification_clears_persistence() {
        let mut item = MetadataItem::persistent(Ul::default(), 1, vec![1]);
        assert!(item.is_persistent());
        item.set_value(vec![2]);
        assert!(!item.is_persistent());
        item.mark_persistent();
        item.value_mut().push(3);
        assert!(!item.is_persistent());
        assert_eq!(item.value(), &[2, 3]);
    }
}
