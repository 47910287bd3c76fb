//! Primer pack: the local tag to item key map of one header metadata instance.

use std::collections::HashMap;
use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::klv;
use crate::types::Ul;

/// Primer pack key.
pub const PRIMER_PACK_KEY: Ul = Ul::new([
    0x06, 0x0e, 0x2b, 0x34, 0x02, 0x05, 0x01, 0x01, 0x0d, 0x01, 0x02, 0x01, 0x01, 0x05, 0x01, 0x00,
]);

const ENTRY_LEN: u32 = 18;
const FIRST_DYNAMIC_TAG: u16 = 0xfffe;
const LAST_DYNAMIC_TAG: u16 = 0x8000;

/// One local tag to item key mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimerEntry {
    pub tag: u16,
    pub key: Ul,
}

/// Bidirectional map between 2-byte local tags and 16-byte item keys.
#[derive(Debug, Clone)]
pub struct PrimerPack {
    entries: Vec<PrimerEntry>,
    by_tag: HashMap<u16, Ul>,
    by_key: HashMap<Ul, u16>,
    next_tag: u16,
}

impl Default for PrimerPack {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimerPack {
    /// Create an empty primer pack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_tag: HashMap::new(),
            by_key: HashMap::new(),
            next_tag: FIRST_DYNAMIC_TAG,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the primer pack has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, PrimerEntry> {
        self.entries.iter()
    }

    /// Get the tag registered for a key.
    #[must_use]
    pub fn tag_for_key(&self, key: &Ul) -> Option<u16> {
        self.by_key.get(key).copied()
    }

    /// Get the key registered for a tag.
    #[must_use]
    pub fn key_for_tag(&self, tag: u16) -> Option<&Ul> {
        self.by_tag.get(&tag)
    }

    /// Register an item key, returning its tag.
    ///
    /// A key that is already registered keeps its tag. Otherwise the preferred
    /// tag is used when it is non-zero and free, and a dynamic tag is allocated
    /// from 0xfffe downwards when it is not.
    pub fn register_entry(&mut self, key: &Ul, preferred: Option<u16>) -> Result<u16> {
        if let Some(tag) = self.tag_for_key(key) {
            return Ok(tag);
        }

        let preferred = preferred.filter(|&tag| tag != 0 && tag != 0xffff);
        let tag = match preferred {
            Some(tag) if !self.by_tag.contains_key(&tag) => tag,
            Some(tag) => {
                log::warn!(
                    "Local tag 0x{tag:04x} for {key} already maps to {}, allocating a dynamic tag",
                    self.by_tag[&tag]
                );
                self.allocate_dynamic_tag()?
            }
            None => self.allocate_dynamic_tag()?,
        };

        self.insert(tag, *key);
        Ok(tag)
    }

    fn allocate_dynamic_tag(&mut self) -> Result<u16> {
        while self.next_tag >= LAST_DYNAMIC_TAG {
            let tag = self.next_tag;
            self.next_tag = self.next_tag.wrapping_sub(1);
            if !self.by_tag.contains_key(&tag) {
                return Ok(tag);
            }
        }
        Err(Error::PrimerExhausted)
    }

    fn insert(&mut self, tag: u16, key: Ul) {
        self.entries.push(PrimerEntry { tag, key });
        self.by_tag.insert(tag, key);
        self.by_key.entry(key).or_insert(tag);
    }

    // ==== Reading ====

    /// Read a primer pack value of `len` bytes.
    pub fn read<R: Read>(reader: &mut R, len: u64) -> Result<Self> {
        if len < 8 {
            return Err(Error::InvalidPrimerPack(format!("length {len} is too short")));
        }
        let count = reader.read_u32::<BigEndian>()?;
        let element_len = reader.read_u32::<BigEndian>()?;
        if element_len != ENTRY_LEN {
            return Err(Error::InvalidPrimerPack(format!(
                "entry length {element_len}, expected {ENTRY_LEN}"
            )));
        }
        if 8 + u64::from(count) * u64::from(ENTRY_LEN) != len {
            return Err(Error::InvalidPrimerPack(format!(
                "{count} entries do not fill {len} bytes"
            )));
        }

        let mut primer = Self::new();
        for _ in 0..count {
            let tag = reader.read_u16::<BigEndian>()?;
            let key = klv::read_key(reader)?;
            if let Some(existing) = primer.by_tag.get(&tag) {
                log::warn!("Duplicate primer tag 0x{tag:04x} ({existing} and {key}), keeping the first");
                continue;
            }
            primer.insert(tag, key);
        }
        Ok(primer)
    }

    // ==== Writing ====

    /// Length of the primer pack value.
    #[must_use]
    pub fn value_len(&self) -> u64 {
        8 + self.entries.len() as u64 * u64::from(ENTRY_LEN)
    }

    /// Size of the whole primer pack KLV with a length field of at least `min_llen` bytes.
    #[must_use]
    pub fn size(&self, min_llen: u8) -> u64 {
        let len = self.value_len();
        klv::KEY_LEN + u64::from(klv::llen_for(len, min_llen)) + len
    }

    /// Write the primer pack KLV, returning the number of bytes written.
    pub fn write<W: Write>(&self, writer: &mut W, min_llen: u8) -> Result<u64> {
        let len = self.value_len();
        let llen = klv::llen_for(len, min_llen);
        klv::write_fixed_kl(writer, &PRIMER_PACK_KEY, llen, len)?;
        writer.write_u32::<BigEndian>(self.entries.len() as u32)?;
        writer.write_u32::<BigEndian>(ENTRY_LEN)?;
        for entry in &self.entries {
            writer.write_u16::<BigEndian>(entry.tag)?;
            writer.write_all(entry.key.as_bytes())?;
        }
        Ok(klv::KEY_LEN + u64::from(llen) + len)
    }
}

impl<'a> IntoIterator for &'a PrimerPack {
    type Item = &'a PrimerEntry;
    type IntoIter = std::slice::Iter<'a, PrimerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
