//! Metadata sets: definition-checked collections of items.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::indirect;
use crate::item::{ARRAY_HEADER_LEN, ArrayElements, MetadataItem, decode_array, encode_array};
use crate::klv;
use crate::model::baseline::INSTANCE_UID;
use crate::model::{DataModel, ItemDef, LengthRule, SetDef};
use crate::primer::PrimerPack;
use crate::reader::Reader;
use crate::strings;
use crate::types::{FixedWire, ProductVersion, Rational, Timestamp, Ul, Umid, WireType};
use crate::value::ItemValue;
use crate::writer::Writer;

const MAX_ITEM_LEN: usize = u16::MAX as usize;

/// One node of the header metadata graph.
///
/// A set always carries an InstanceUID item matching [`MetadataSet::instance_uid`].
/// Items can only be added when the set's definition, or one of its
/// ancestors, defines them.
#[derive(Debug, Clone)]
pub struct MetadataSet {
    key: Ul,
    instance_uid: Uuid,
    items: Vec<MetadataItem>,
    data_model: Arc<DataModel>,
    fixed_space_allocation: u32,
}

impl MetadataSet {
    /// Create a set with a freshly generated InstanceUID.
    pub fn new(data_model: Arc<DataModel>, key: Ul) -> Result<Self> {
        Self::with_instance_uid(data_model, key, Uuid::new_v4())
    }

    /// Create a set with the given InstanceUID.
    pub fn with_instance_uid(data_model: Arc<DataModel>, key: Ul, instance_uid: Uuid) -> Result<Self> {
        data_model.set_def(&key)?;
        if instance_uid.is_nil() {
            return Err(Error::NullInstanceUid(key));
        }
        let tag = data_model
            .find_item_def(&INSTANCE_UID)
            .map_or(0, |def| def.local_tag);
        Ok(Self {
            key,
            instance_uid,
            items: vec![MetadataItem::new(INSTANCE_UID, tag, instance_uid.encode())],
            data_model,
            fixed_space_allocation: 0,
        })
    }

    /// Set key (class).
    #[must_use]
    pub fn key(&self) -> &Ul {
        &self.key
    }

    /// InstanceUID identifying this set within its header metadata.
    #[must_use]
    pub fn instance_uid(&self) -> Uuid {
        self.instance_uid
    }

    /// Data model the set is checked against.
    #[must_use]
    pub fn data_model(&self) -> &Arc<DataModel> {
        &self.data_model
    }

    pub(crate) fn set_data_model(&mut self, data_model: Arc<DataModel>) {
        self.data_model = data_model;
    }

    /// Definition of this set's class.
    pub fn set_def(&self) -> Result<&SetDef> {
        self.data_model.set_def(&self.key)
    }

    /// Find an item definition in this set's class or its ancestors.
    #[must_use]
    pub fn find_item_def(&self, item_key: &Ul) -> Option<&ItemDef> {
        let set_def = self.data_model.find_set_def(&self.key)?;
        self.data_model.find_item_def_in_set_def(item_key, set_def)
    }

    /// Check whether this set's class is `ancestor` or derives from it.
    #[must_use]
    pub fn is_subclass_of(&self, ancestor: &Ul) -> bool {
        self.data_model.is_subclass_of(&self.key, ancestor)
    }

    /// Fixed space allocation in bytes, 0 if the set is written at its natural size.
    #[must_use]
    pub fn fixed_space_allocation(&self) -> u32 {
        self.fixed_space_allocation
    }

    /// Reserve a fixed number of bytes for this set when written.
    ///
    /// Unused space is filled with a fill KLV.
    pub fn set_fixed_space_allocation(&mut self, size: u32) {
        self.fixed_space_allocation = size;
    }

    // ==== Items ====

    /// Items in insertion order.
    pub fn items(&self) -> std::slice::Iter<'_, MetadataItem> {
        self.items.iter()
    }

    pub(crate) fn items_mut(&mut self) -> std::slice::IterMut<'_, MetadataItem> {
        self.items.iter_mut()
    }

    /// Number of items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Check if an item is present.
    #[must_use]
    pub fn has_item(&self, key: &Ul) -> bool {
        self.get_item(key).is_some()
    }

    /// Get an item.
    #[must_use]
    pub fn get_item(&self, key: &Ul) -> Option<&MetadataItem> {
        self.items.iter().find(|item| item.key() == key)
    }

    /// Get an item, failing if it is absent.
    pub fn item(&self, key: &Ul) -> Result<&MetadataItem> {
        self.get_item(key).ok_or(Error::MissingItem {
            set: self.key,
            item: *key,
        })
    }

    fn item_mut(&mut self, key: &Ul) -> Result<&mut MetadataItem> {
        let set = self.key;
        self.items
            .iter_mut()
            .find(|item| item.key() == key)
            .ok_or(Error::MissingItem { set, item: *key })
    }

    /// Create or replace an item's raw value.
    pub fn set_item(&mut self, key: &Ul, value: Vec<u8>) -> Result<()> {
        if *key == INSTANCE_UID {
            return Err(Error::ReadOnlyItem(*key));
        }
        if value.len() > MAX_ITEM_LEN {
            return Err(Error::ItemTooLarge {
                key: *key,
                len: value.len(),
            });
        }
        let tag = self
            .find_item_def(key)
            .ok_or(Error::UnknownItemDef(*key))?
            .local_tag;

        match self.items.iter_mut().find(|item| item.key() == key) {
            Some(item) => item.set_value(value),
            None => self.items.push(MetadataItem::new(*key, tag, value)),
        }
        Ok(())
    }

    /// Remove an item, returning it if it was present.
    pub fn remove_item(&mut self, key: &Ul) -> Result<Option<MetadataItem>> {
        if *key == INSTANCE_UID {
            return Err(Error::ReadOnlyItem(*key));
        }
        Ok(self
            .items
            .iter()
            .position(|item| item.key() == key)
            .map(|idx| self.items.remove(idx)))
    }

    // ==== Typed access ====

    /// Decode an item as a wire type.
    pub fn get<T: WireType>(&self, key: &Ul) -> Result<T> {
        T::decode(self.item(key)?.value())
    }

    /// Encode a wire type into an item.
    pub fn set<T: WireType>(&mut self, key: &Ul, value: &T) -> Result<()> {
        self.set_item(key, value.encode())
    }

    /// Decode an item according to its declared type.
    ///
    /// Items without a definition are returned as [`ItemValue::Raw`].
    pub fn value(&self, key: &Ul) -> Result<ItemValue> {
        let item = self.item(key)?;
        match self.find_item_def(key) {
            Some(def) => ItemValue::decode(&self.data_model, def.type_id, item.value()),
            None => Ok(ItemValue::Raw(item.value().to_vec())),
        }
    }

    /// Encode a typed value into an item.
    pub fn set_value(&mut self, key: &Ul, value: &ItemValue) -> Result<()> {
        self.set_item(key, value.encode()?)
    }

    // ==== Strings ====

    /// Size of a UTF-16 string item in code units, including a terminator.
    pub fn utf16_string_size(&self, key: &Ul) -> Result<usize> {
        Ok(strings::utf16_size(self.item(key)?.value()))
    }

    /// Decode a UTF-16 string item.
    pub fn get_utf16_string(&self, key: &Ul) -> Result<String> {
        strings::decode_utf16(self.item(key)?.value())
    }

    /// Store a UTF-16 string item.
    pub fn set_utf16_string(&mut self, key: &Ul, value: &str) -> Result<()> {
        self.set_item(key, strings::encode_utf16(value))
    }

    /// Decode a UTF-16 string array item.
    pub fn get_utf16_string_array(&self, key: &Ul) -> Result<Vec<String>> {
        strings::decode_utf16_array(self.item(key)?.value())
    }

    /// Store a UTF-16 string array item.
    pub fn set_utf16_string_array<S: AsRef<str>>(&mut self, key: &Ul, values: &[S]) -> Result<()> {
        self.set_item(key, strings::encode_utf16_array(values))
    }

    /// Size of a UTF-8 string item in bytes, including a terminator.
    pub fn utf8_string_size(&self, key: &Ul) -> Result<usize> {
        Ok(strings::byte_string_size(self.item(key)?.value()))
    }

    /// Decode a UTF-8 string item.
    pub fn get_utf8_string(&self, key: &Ul) -> Result<String> {
        strings::decode_utf8(self.item(key)?.value())
    }

    /// Store a UTF-8 string item.
    pub fn set_utf8_string(&mut self, key: &Ul, value: &str) -> Result<()> {
        self.set_item(key, strings::encode_utf8(value))
    }

    /// Size of an ISO-7 string item in bytes, including a terminator.
    pub fn iso7_string_size(&self, key: &Ul) -> Result<usize> {
        Ok(strings::byte_string_size(self.item(key)?.value()))
    }

    /// Decode an ISO-7 string item.
    pub fn get_iso7_string(&self, key: &Ul) -> Result<String> {
        Ok(strings::decode_iso7(self.item(key)?.value()))
    }

    /// Store an ISO-7 string item.
    pub fn set_iso7_string(&mut self, key: &Ul, value: &str) -> Result<()> {
        self.set_item(key, strings::encode_iso7(value))
    }

    // ==== Arrays ====

    /// Number of elements in an array item.
    pub fn array_item_count(&self, key: &Ul) -> Result<u32> {
        Ok(self.item(key)?.array_header()?.0)
    }

    /// Element length of an array item.
    pub fn array_item_element_len(&self, key: &Ul) -> Result<u32> {
        Ok(self.item(key)?.array_header()?.1)
    }

    /// Iterate over the elements of an array item.
    pub fn array_item_elements(&self, key: &Ul) -> Result<ArrayElements<'_>> {
        self.item(key)?.array_elements()
    }

    /// Get one element of an array item.
    pub fn array_item_element(&self, key: &Ul, index: usize) -> Result<&[u8]> {
        self.item(key)?.array_element(index)
    }

    /// Replace an item with `count` zero-filled elements, returning the element bytes.
    pub fn alloc_array_item_elements(
        &mut self,
        key: &Ul,
        element_len: u32,
        count: u32,
    ) -> Result<&mut [u8]> {
        let len = array_len(key, element_len, count)?;
        let mut value = vec![0u8; len];
        value[..4].copy_from_slice(&count.to_be_bytes());
        value[4..8].copy_from_slice(&element_len.to_be_bytes());
        self.set_item(key, value)?;
        Ok(&mut self.item_mut(key)?.value_mut()[ARRAY_HEADER_LEN..])
    }

    /// Append `count` zero-filled elements, returning the new element bytes.
    ///
    /// Creates the item when it is absent. The element length must match an
    /// existing array.
    pub fn grow_array_item(&mut self, key: &Ul, element_len: u32, count: u32) -> Result<&mut [u8]> {
        let Some(existing) = self.get_item(key) else {
            return self.alloc_array_item_elements(key, element_len, count);
        };
        let (current, current_len) = existing.array_header()?;
        if current > 0 && current_len != element_len {
            return Err(Error::MalformedArray(format!(
                "cannot add {element_len}-byte elements to an array of {current_len}-byte elements"
            )));
        }
        if *key == INSTANCE_UID {
            return Err(Error::ReadOnlyItem(*key));
        }
        let total = current
            .checked_add(count)
            .ok_or_else(|| Error::MalformedArray("element count overflow".into()))?;
        let len = array_len(key, element_len, total)?;
        let start = ARRAY_HEADER_LEN + current as usize * element_len as usize;

        let value = self.item_mut(key)?.value_mut();
        value.resize(len, 0);
        value[..4].copy_from_slice(&total.to_be_bytes());
        value[4..8].copy_from_slice(&element_len.to_be_bytes());
        Ok(&mut value[start..])
    }

    /// Append one element to an array item, creating the item if needed.
    pub fn append_array_item_element(&mut self, key: &Ul, element: &[u8]) -> Result<()> {
        let element_len = u32::try_from(element.len()).map_err(|_| Error::ItemTooLarge {
            key: *key,
            len: element.len(),
        })?;
        self.grow_array_item(key, element_len, 1)?
            .copy_from_slice(element);
        Ok(())
    }

    /// Decode an array item of fixed size values.
    pub fn get_array<T: FixedWire>(&self, key: &Ul) -> Result<Vec<T>> {
        decode_array(self.item(key)?.value())
    }

    /// Store an array item of fixed size values.
    pub fn set_array<T: FixedWire>(&mut self, key: &Ul, values: &[T]) -> Result<()> {
        self.set_item(key, encode_array(values)?)
    }

    // ==== References ====

    /// Get a strong reference.
    pub fn get_strong_ref(&self, key: &Ul) -> Result<Uuid> {
        self.get(key)
    }

    /// Store a strong reference to `target`.
    pub fn set_strong_ref(&mut self, key: &Ul, target: Uuid) -> Result<()> {
        self.set(key, &target)
    }

    /// Get a strong reference array.
    pub fn get_strong_ref_array(&self, key: &Ul) -> Result<Vec<Uuid>> {
        self.get_array(key)
    }

    /// Append a strong reference to an array item.
    pub fn add_strong_ref(&mut self, key: &Ul, target: Uuid) -> Result<()> {
        self.append_array_item_element(key, target.as_bytes())
    }

    /// Get a weak reference.
    pub fn get_weak_ref(&self, key: &Ul) -> Result<Uuid> {
        self.get(key)
    }

    /// Store a weak reference to `target`.
    pub fn set_weak_ref(&mut self, key: &Ul, target: Uuid) -> Result<()> {
        self.set(key, &target)
    }

    /// Get a weak reference array.
    pub fn get_weak_ref_array(&self, key: &Ul) -> Result<Vec<Uuid>> {
        self.get_array(key)
    }

    /// Append a weak reference to an array item.
    pub fn add_weak_ref(&mut self, key: &Ul, target: Uuid) -> Result<()> {
        self.append_array_item_element(key, target.as_bytes())
    }

    // ==== Validation ====

    /// Check every defined item's length and the presence of required items.
    ///
    /// Returns a list of problems found; empty if valid.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        let model = &self.data_model;
        let Some(set_def) = model.find_set_def(&self.key) else {
            return vec![format!("set {} is not defined in the data model", self.key)];
        };

        let mut errors = Vec::new();
        for def in model
            .set_def_chain(set_def)
            .flat_map(|def| model.item_defs_of(def))
        {
            match self.get_item(&def.key) {
                Some(item) => {
                    if let Some(problem) = check_length(model.length_rule(def.type_id), item.value())
                    {
                        errors.push(format!("{}.{}: {problem}", set_def.name, def.name));
                    }
                }
                None if def.required => errors.push(format!(
                    "{}.{}: required item {} is missing",
                    set_def.name, def.name, def.key
                )),
                None => {}
            }
        }
        errors
    }

    /// Validate the set, optionally logging each problem. Returns true if valid.
    pub fn validate(&self, log_errors: bool) -> bool {
        let errors = self.validation_errors();
        if log_errors {
            for error in &errors {
                log::warn!("Set {} ({}) invalid: {error}", self.key, self.instance_uid);
            }
        }
        errors.is_empty()
    }

    /// Validate the set, returning an error listing every problem.
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors))
        }
    }

    // ==== Encoding ====

    /// Length of the local set value.
    #[must_use]
    pub fn value_len(&self) -> u64 {
        self.items.iter().map(MetadataItem::encoded_len).sum()
    }

    /// Size of the set KLV with a length field of at least `min_llen` bytes.
    #[must_use]
    pub fn klv_size(&self, min_llen: u8) -> u64 {
        let len = self.value_len();
        klv::KEY_LEN + u64::from(klv::llen_for(len, min_llen)) + len
    }

    /// Encode the set KLV using the items' current tags.
    pub(crate) fn encode(&self, min_llen: u8) -> Result<Vec<u8>> {
        let len = self.value_len();
        let llen = klv::llen_for(len, min_llen);
        let mut writer = Writer::with_capacity(16 + usize::from(llen) + len as usize);
        writer.write_ul(&self.key);
        writer.write_ber_length(len, llen)?;
        for item in &self.items {
            writer.write_local_item(item.key(), item.tag(), item.value())?;
        }
        Ok(writer.into_inner())
    }

    /// Parse a local set value.
    ///
    /// Items whose tag is missing from the primer or whose key the set's class
    /// does not define are skipped.
    pub(crate) fn decode(
        data_model: Arc<DataModel>,
        key: Ul,
        value: &[u8],
        primer: &PrimerPack,
    ) -> Result<Self> {
        let set_def = data_model.set_def(&key)?;
        let malformed = |reason: String| Error::MalformedLocalSet { key, reason };

        let mut items: Vec<MetadataItem> = Vec::new();
        let mut instance_uid = None;
        let mut reader = Reader::new(value);
        while !reader.is_empty() {
            let (tag, bytes) = read_local_item(&mut reader)
                .map_err(|e| malformed(format!("item at offset {}: {e}", reader.position())))?;

            let Some(item_key) = primer.key_for_tag(tag) else {
                log::warn!("Set {key}: local tag 0x{tag:04x} not in primer pack, skipping item");
                continue;
            };
            if data_model.find_item_def_in_set_def(item_key, set_def).is_none() {
                log::debug!("Set {key}: skipping unknown item {item_key}");
                continue;
            }
            if *item_key == INSTANCE_UID {
                let uid = Uuid::decode(bytes)
                    .map_err(|_| malformed(format!("InstanceUID of {} bytes", bytes.len())))?;
                instance_uid = Some(uid);
            }

            let item = MetadataItem::persistent(*item_key, tag, bytes.to_vec());
            match items.iter_mut().find(|existing| existing.key() == item_key) {
                Some(existing) => *existing = item,
                None => items.push(item),
            }
        }

        let instance_uid = instance_uid.ok_or(Error::MissingInstanceUid(key))?;
        if instance_uid.is_nil() {
            return Err(Error::NullInstanceUid(key));
        }
        Ok(Self {
            key,
            instance_uid,
            items,
            data_model,
            fixed_space_allocation: 0,
        })
    }
}

fn read_local_item<'a>(reader: &mut Reader<'a>) -> Result<(u16, &'a [u8])> {
    let tag = reader.read_u16()?;
    let len = reader.read_u16()?;
    let bytes = reader.read_bytes(usize::from(len))?;
    Ok((tag, bytes))
}

fn array_len(key: &Ul, element_len: u32, count: u32) -> Result<usize> {
    let len = ARRAY_HEADER_LEN as u64 + u64::from(element_len) * u64::from(count);
    if len > MAX_ITEM_LEN as u64 {
        return Err(Error::ItemTooLarge {
            key: *key,
            len: usize::try_from(len).unwrap_or(usize::MAX),
        });
    }
    Ok(len as usize)
}

fn check_length(rule: LengthRule, value: &[u8]) -> Option<String> {
    let len = value.len();
    match rule {
        LengthRule::Unchecked => None,
        LengthRule::Exact(expected) if len != expected => {
            Some(format!("length {len}, expected {expected}"))
        }
        LengthRule::Exact(_) => None,
        LengthRule::Array { element_len } => {
            if len < ARRAY_HEADER_LEN {
                return Some(format!("array length {len} is shorter than its header"));
            }
            if let Some(n) = element_len.filter(|&n| n > 0 && (len - ARRAY_HEADER_LEN) % n != 0) {
                return Some(format!(
                    "array length {len} is not a whole number of {n}-byte elements"
                ));
            }
            match crate::item::array_header(value) {
                Ok((count, header_len))
                    if count > 0 && element_len.is_some_and(|n| n != header_len as usize) =>
                {
                    Some(format!("array header declares {header_len}-byte elements"))
                }
                Ok(_) => None,
                Err(e) => Some(e.to_string()),
            }
        }
        LengthRule::Indirect => {
            if len < 17 {
                Some(format!("indirect value length {len} is shorter than 17"))
            } else if indirect::ByteOrder::from_marker(value[0]).is_none() {
                Some(format!("unknown indirect byte order marker 0x{:02x}", value[0]))
            } else {
                None
            }
        }
    }
}

macro_rules! typed_accessors {
    ($($get:ident, $set:ident => $ty:ty;)*) => {
        impl MetadataSet {
            $(
                #[doc = concat!("Get an item as `", stringify!($ty), "`.")]
                pub fn $get(&self, key: &Ul) -> Result<$ty> {
                    self.get(key)
                }

                #[doc = concat!("Set an item from a `", stringify!($ty), "`.")]
                pub fn $set(&mut self, key: &Ul, value: $ty) -> Result<()> {
                    self.set(key, &value)
                }
            )*
        }
    };
}

typed_accessors! {
    get_u8, set_u8 => u8;
    get_u16, set_u16 => u16;
    get_u32, set_u32 => u32;
    get_u64, set_u64 => u64;
    get_i8, set_i8 => i8;
    get_i16, set_i16 => i16;
    get_i32, set_i32 => i32;
    get_i64, set_i64 => i64;
    get_bool, set_bool => bool;
    get_uuid, set_uuid => Uuid;
    get_ul, set_ul => Ul;
    get_umid, set_umid => Umid;
    get_rational, set_rational => Rational;
    get_timestamp, set_timestamp => Timestamp;
    get_product_version, set_product_version => ProductVersion;
}
