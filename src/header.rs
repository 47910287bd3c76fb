//! Header metadata: the primer pack and the graph of metadata sets.
//!
//! Sets reference each other by InstanceUID. References are resolved by
//! looking the UUID up in the owning [`HeaderMetadata`], never stored as
//! pointers, so cyclic graphs are representable and removal needs no fix-up.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::item::encode_array;
use crate::klv::{self, Kl};
use crate::model::baseline::{GENERATION_UID, INSTANCE_UID, PREFACE};
use crate::model::{DataModel, RefKind};
use crate::primer::{PRIMER_PACK_KEY, PrimerPack};
use crate::set::MetadataSet;
use crate::types::{Ul, WireType};

/// Default minimum BER length width for set and primer pack lengths.
pub const DEFAULT_MIN_LLEN: u8 = 4;

/// Options controlling how header metadata is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Minimum width of the set and primer pack length fields.
    pub min_llen: u8,
    /// Key of fill KLVs padding fixed space allocations.
    pub fill_key: Ul,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            min_llen: DEFAULT_MIN_LLEN,
            fill_key: klv::LEGACY_FILL_KEY,
        }
    }
}

/// Hooks to skip or discard sets while reading.
///
/// Skipped and discarded sets still count towards the header byte count.
pub trait ReadFilter {
    /// Called after a set's KL is read. Return true to skip its value unread.
    fn before_set_read(&mut self, key: &Ul, llen: u8, len: u64) -> bool {
        let _ = (key, llen, len);
        false
    }

    /// Called after a set is parsed. Return true to discard it.
    fn after_set_read(&mut self, set: &MetadataSet) -> bool {
        let _ = set;
        false
    }
}

struct KeepAll;

impl ReadFilter for KeepAll {}

/// Position of the last successful [`HeaderMetadata::dereference_near`] lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetCursor {
    index: usize,
}

/// Header metadata of one MXF partition.
#[derive(Debug, Clone)]
pub struct HeaderMetadata {
    data_model: Arc<DataModel>,
    primer: PrimerPack,
    sets: Vec<MetadataSet>,
}

impl HeaderMetadata {
    /// Create empty header metadata.
    #[must_use]
    pub fn new(data_model: Arc<DataModel>) -> Self {
        Self {
            data_model,
            primer: PrimerPack::new(),
            sets: Vec::new(),
        }
    }

    /// Data model shared by all sets.
    #[must_use]
    pub fn data_model(&self) -> &Arc<DataModel> {
        &self.data_model
    }

    /// Primer pack.
    #[must_use]
    pub fn primer(&self) -> &PrimerPack {
        &self.primer
    }

    /// Sets in order.
    pub fn sets(&self) -> std::slice::Iter<'_, MetadataSet> {
        self.sets.iter()
    }

    /// Sets in order, mutably.
    pub fn sets_mut(&mut self) -> std::slice::IterMut<'_, MetadataSet> {
        self.sets.iter_mut()
    }

    /// Number of sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Check if there are no sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    // ==== Sets ====

    /// Create a set with a fresh InstanceUID and add it.
    pub fn create_set(&mut self, key: Ul) -> Result<&mut MetadataSet> {
        let set = MetadataSet::new(Arc::clone(&self.data_model), key)?;
        self.add_set(set)
    }

    /// Add a set, taking ownership of it.
    ///
    /// The set's item keys are registered in the primer pack.
    pub fn add_set(&mut self, mut set: MetadataSet) -> Result<&mut MetadataSet> {
        if set.instance_uid().is_nil() {
            return Err(Error::NullInstanceUid(*set.key()));
        }
        self.data_model.set_def(set.key())?;
        if self.dereference(&set.instance_uid()).is_some() {
            log::warn!(
                "Adding set {} with duplicate InstanceUID {}",
                set.key(),
                set.instance_uid()
            );
        }

        set.set_data_model(Arc::clone(&self.data_model));
        for item in set.items_mut() {
            let tag = self.primer.register_entry(item.key(), Some(item.tag()))?;
            item.set_tag(tag);
        }

        let index = self.sets.len();
        self.sets.push(set);
        Ok(&mut self.sets[index])
    }

    /// Remove a set by InstanceUID. References to it are left dangling.
    pub fn remove_set(&mut self, instance_uid: &Uuid) -> Option<MetadataSet> {
        let index = self.position(instance_uid)?;
        Some(self.sets.remove(index))
    }

    /// Sets whose key equals `key`.
    #[must_use]
    pub fn find_sets_by_key(&self, key: &Ul) -> Vec<&MetadataSet> {
        self.sets.iter().filter(|set| set.key() == key).collect()
    }

    /// The only set whose key equals `key`.
    pub fn find_singular_set_by_key(&self, key: &Ul) -> Result<&MetadataSet> {
        let index = self.singular_index(key)?;
        Ok(&self.sets[index])
    }

    /// The only set whose key equals `key`, mutably.
    pub fn find_singular_set_by_key_mut(&mut self, key: &Ul) -> Result<&mut MetadataSet> {
        let index = self.singular_index(key)?;
        Ok(&mut self.sets[index])
    }

    fn singular_index(&self, key: &Ul) -> Result<usize> {
        let mut matches = self
            .sets
            .iter()
            .enumerate()
            .filter(|(_, set)| set.key() == key)
            .map(|(index, _)| index);
        let first = matches.next().ok_or(Error::MissingSet(*key))?;
        let others = matches.count();
        if others > 0 {
            return Err(Error::AmbiguousSingularSet {
                key: *key,
                count: others + 1,
            });
        }
        Ok(first)
    }

    fn position(&self, instance_uid: &Uuid) -> Option<usize> {
        self.sets
            .iter()
            .position(|set| set.instance_uid() == *instance_uid)
    }

    // ==== Dereferencing ====

    /// Find the set with an InstanceUID.
    #[must_use]
    pub fn dereference(&self, instance_uid: &Uuid) -> Option<&MetadataSet> {
        self.position(instance_uid).map(|index| &self.sets[index])
    }

    /// Find the set with an InstanceUID, mutably.
    pub fn dereference_mut(&mut self, instance_uid: &Uuid) -> Option<&mut MetadataSet> {
        let index = self.position(instance_uid)?;
        Some(&mut self.sets[index])
    }

    /// Find the set with an InstanceUID, starting at the cursor.
    ///
    /// Scans forward from the last match, then wraps to the start. Returns the
    /// same result as [`HeaderMetadata::dereference`]; sets referenced in
    /// write order are found without a full scan. The cursor is left
    /// unchanged when nothing matches.
    pub fn dereference_near(&self, cursor: &mut SetCursor, instance_uid: &Uuid) -> Option<&MetadataSet> {
        let len = self.sets.len();
        if len == 0 {
            return None;
        }
        let start = cursor.index.min(len - 1);
        let index = (start..len)
            .chain(0..start)
            .find(|&index| self.sets[index].instance_uid() == *instance_uid)?;
        cursor.index = index;
        Some(&self.sets[index])
    }

    /// Resolve a strong reference item of `set`.
    ///
    /// A reference to a set that is not present is logged and returns `None`.
    pub fn strong_ref(&self, set: &MetadataSet, key: &Ul) -> Result<Option<&MetadataSet>> {
        let target = set.get_strong_ref(key)?;
        Ok(self.resolve(set, key, &target))
    }

    /// Resolve a weak reference item of `set`.
    pub fn weak_ref(&self, set: &MetadataSet, key: &Ul) -> Result<Option<&MetadataSet>> {
        let target = set.get_weak_ref(key)?;
        Ok(self.resolve(set, key, &target))
    }

    /// Resolve every element of a reference array item of `set`, skipping dangling references.
    pub fn resolve_refs(&self, set: &MetadataSet, key: &Ul) -> Result<Vec<&MetadataSet>> {
        let targets: Vec<Uuid> = set.get_array(key)?;
        let mut cursor = SetCursor::default();
        Ok(targets
            .iter()
            .filter_map(|target| {
                let found = self.dereference_near(&mut cursor, target);
                if found.is_none() {
                    log::warn!("Set {} item {key}: dangling reference to {target}", set.key());
                }
                found
            })
            .collect())
    }

    fn resolve(&self, set: &MetadataSet, key: &Ul, target: &Uuid) -> Option<&MetadataSet> {
        let found = self.dereference(target);
        if found.is_none() {
            log::warn!("Set {} item {key}: dangling reference to {target}", set.key());
        }
        found
    }

    // ==== Primer ====

    /// Register an item key in the primer pack with its default local tag.
    pub fn register_item(&mut self, key: &Ul) -> Result<u16> {
        let def = self.data_model.item_def(key)?;
        self.primer.register_entry(key, Some(def.local_tag))
    }

    /// Register every item a set class and its ancestors define.
    pub fn register_set_items(&mut self, set_key: &Ul) -> Result<()> {
        let model = Arc::clone(&self.data_model);
        let set_def = model.set_def(set_key)?;
        for def in model
            .set_def_chain(set_def)
            .flat_map(|set_def| model.item_defs_of(set_def))
        {
            self.primer.register_entry(&def.key, Some(def.local_tag))?;
        }
        Ok(())
    }

    fn prepare_primer(&mut self) -> Result<()> {
        for set in &mut self.sets {
            for item in set.items_mut() {
                let tag = self.primer.register_entry(item.key(), Some(item.tag()))?;
                item.set_tag(tag);
            }
        }
        Ok(())
    }

    // ==== Validation ====

    /// Validation problems of every set, prefixed with the set's InstanceUID.
    #[must_use]
    pub fn validation_errors(&self) -> Vec<String> {
        self.sets
            .iter()
            .flat_map(|set| {
                let uid = set.instance_uid();
                set.validation_errors()
                    .into_iter()
                    .map(move |error| format!("{uid}: {error}"))
            })
            .collect()
    }

    /// Validate every set, optionally logging each problem. Returns true if all are valid.
    pub fn validate(&self, log_errors: bool) -> bool {
        self.sets
            .iter()
            .fold(true, |valid, set| set.validate(log_errors) && valid)
    }

    // ==== Reading ====

    /// Read header metadata whose primer pack KL has already been read.
    ///
    /// `header_byte_count` covers the primer pack KLV, all set KLVs and fill.
    pub fn read<R: Read>(
        data_model: Arc<DataModel>,
        reader: &mut R,
        header_byte_count: u64,
        primer_kl: &Kl,
    ) -> Result<Self> {
        Self::read_with_filter(data_model, reader, header_byte_count, primer_kl, &mut KeepAll)
    }

    /// Read header metadata starting at the primer pack key.
    pub fn read_from<R: Read>(
        data_model: Arc<DataModel>,
        reader: &mut R,
        header_byte_count: u64,
    ) -> Result<Self> {
        let primer_kl = klv::read_kl(reader)?;
        Self::read(data_model, reader, header_byte_count, &primer_kl)
    }

    /// Read header metadata, consulting `filter` for each set.
    pub fn read_with_filter<R: Read>(
        data_model: Arc<DataModel>,
        reader: &mut R,
        header_byte_count: u64,
        primer_kl: &Kl,
        filter: &mut dyn ReadFilter,
    ) -> Result<Self> {
        if header_byte_count == 0 {
            return Err(Error::InvalidHeaderByteCount(header_byte_count));
        }
        if primer_kl.key != PRIMER_PACK_KEY {
            return Err(Error::UnexpectedKey {
                expected: PRIMER_PACK_KEY,
                found: primer_kl.key,
            });
        }
        let mut count = advance(0, primer_kl, header_byte_count)?;
        let primer = PrimerPack::read(reader, primer_kl.len)?;

        let mut sets = Vec::new();
        while count < header_byte_count {
            let kl = klv::read_kl(reader)?;
            let end = advance(count, &kl, header_byte_count)?;

            if klv::is_fill_key(&kl.key) {
                log::debug!("Skipping {} bytes of fill", kl.len);
                klv::skip(reader, kl.len)?;
            } else if filter.before_set_read(&kl.key, kl.llen, kl.len) {
                log::debug!("Read filter skipped set {}", kl.key);
                klv::skip(reader, kl.len)?;
            } else if data_model.find_set_def(&kl.key).is_none() {
                log::debug!("Skipping unknown set {} ({} bytes)", kl.key, kl.len);
                klv::skip(reader, kl.len)?;
            } else {
                let value = klv::read_value(reader, kl.len)?;
                let set = MetadataSet::decode(Arc::clone(&data_model), kl.key, &value, &primer)?;
                if filter.after_set_read(&set) {
                    log::debug!("Read filter discarded set {} {}", kl.key, set.instance_uid());
                } else {
                    sets.push(set);
                }
            }
            count = end;
        }

        if count != header_byte_count {
            return Err(Error::HeaderByteCountMismatch {
                expected: header_byte_count,
                actual: count,
            });
        }
        Ok(Self {
            data_model,
            primer,
            sets,
        })
    }

    // ==== Writing ====

    /// Write the primer pack and all sets with default options.
    ///
    /// Returns the header byte count.
    pub fn write<W: Write>(&mut self, writer: &mut W) -> Result<u64> {
        self.write_with_options(writer, &WriteOptions::default())
    }

    /// Write the primer pack, the Preface, then all other sets in order.
    ///
    /// Every item's key is registered in the primer pack first. Written items
    /// are marked persistent.
    pub fn write_with_options<W: Write>(&mut self, writer: &mut W, options: &WriteOptions) -> Result<u64> {
        self.prepare_primer()?;
        let order = self.write_order()?;

        let mut total = self.primer.write(writer, options.min_llen)?;
        for &index in &order {
            let set = &self.sets[index];
            let bytes = set.encode(options.min_llen)?;
            let slot = slot_size(set, bytes.len() as u64, options)?;
            writer.write_all(&bytes)?;
            if slot > bytes.len() as u64 {
                klv::write_fill(writer, &options.fill_key, slot - bytes.len() as u64, options.min_llen)?;
            }
            total += slot;
        }

        for set in &mut self.sets {
            for item in set.items_mut() {
                item.mark_persistent();
            }
        }
        Ok(total)
    }

    /// Number of bytes [`HeaderMetadata::write_with_options`] would write.
    ///
    /// Registers primer entries the same way writing does.
    pub fn size(&mut self, options: &WriteOptions) -> Result<u64> {
        self.prepare_primer()?;
        let order = self.write_order()?;

        let mut total = self.primer.size(options.min_llen);
        for &index in &order {
            let set = &self.sets[index];
            total += slot_size(set, set.klv_size(options.min_llen), options)?;
        }
        Ok(total)
    }

    fn write_order(&self) -> Result<Vec<usize>> {
        let preface = self.singular_index(&PREFACE)?;
        Ok(std::iter::once(preface)
            .chain((0..self.sets.len()).filter(|&index| index != preface))
            .collect())
    }

    // ==== Cloning ====

    /// Deep copy a set from `source` into this header metadata.
    ///
    /// Strongly referenced sets are cloned too and their references rewritten;
    /// weak references are dropped. Each source set is cloned once, so cyclic
    /// graphs terminate. On failure every set added by the call is removed
    /// and the primer pack is restored.
    /// Returns the InstanceUID of the copy.
    pub fn clone_set(&mut self, source: &HeaderMetadata, source_uid: &Uuid) -> Result<Uuid> {
        let start = self.sets.len();
        let primer = self.primer.clone();
        let mut cloned = HashMap::new();
        self.clone_set_inner(source, source_uid, &mut cloned)
            .inspect_err(|_| {
                self.sets.truncate(start);
                self.primer = primer;
            })
    }

    fn clone_set_inner(
        &mut self,
        source: &HeaderMetadata,
        source_uid: &Uuid,
        cloned: &mut HashMap<Uuid, Uuid>,
    ) -> Result<Uuid> {
        if let Some(uid) = cloned.get(source_uid) {
            return Ok(*uid);
        }
        let src = source
            .dereference(source_uid)
            .ok_or(Error::UnknownInstance(*source_uid))?;

        let uid = self.add_set(MetadataSet::new(Arc::clone(&self.data_model), *src.key())?)?
            .instance_uid();
        cloned.insert(*source_uid, uid);

        let mut values = Vec::new();
        for item in src.items() {
            let key = *item.key();
            if key == INSTANCE_UID || key == GENERATION_UID {
                continue;
            }
            let ref_kind = src
                .find_item_def(&key)
                .and_then(|def| src.data_model().ref_kind(def.type_id));
            let value = match ref_kind {
                Some(RefKind::Weak | RefKind::WeakArray) => {
                    log::warn!("Clone of set {} drops weak reference item {key}", src.key());
                    continue;
                }
                Some(RefKind::Strong) => {
                    let target = Uuid::decode(item.value())?;
                    if source.dereference(&target).is_none() {
                        log::warn!("Clone of set {} skips dangling reference {target}", src.key());
                        continue;
                    }
                    self.clone_set_inner(source, &target, cloned)?.encode()
                }
                Some(RefKind::StrongArray) => {
                    let targets: Vec<Uuid> = src.get_array(&key)?;
                    let mut copies = Vec::with_capacity(targets.len());
                    for target in &targets {
                        if source.dereference(target).is_none() {
                            log::warn!("Clone of set {} skips dangling reference {target}", src.key());
                            continue;
                        }
                        copies.push(self.clone_set_inner(source, target, cloned)?);
                    }
                    encode_array(&copies)?
                }
                None => item.value().to_vec(),
            };
            values.push((key, value));
        }

        let dest = self
            .dereference_mut(&uid)
            .ok_or(Error::UnknownInstance(uid))?;
        for (key, value) in values {
            if dest.find_item_def(&key).is_none() {
                log::warn!("Clone of set {} drops item {key} unknown to the destination", dest.key());
                continue;
            }
            dest.set_item(&key, value)?;
        }
        Ok(uid)
    }
}

/// Byte count after the KLV `kl` read at `count`, which must stay within the header.
fn advance(count: u64, kl: &Kl, header_byte_count: u64) -> Result<u64> {
    let end = kl
        .checked_total_size()
        .and_then(|size| count.checked_add(size))
        .ok_or_else(|| Error::InvalidBerLength(format!("length {} of {} overflows", kl.len, kl.key)))?;
    if end > header_byte_count {
        return Err(Error::HeaderByteCountMismatch {
            expected: header_byte_count,
            actual: end,
        });
    }
    Ok(end)
}

/// Bytes a set occupies when written, including fill for a fixed allocation.
fn slot_size(set: &MetadataSet, klv_size: u64, options: &WriteOptions) -> Result<u64> {
    let allocated = u64::from(set.fixed_space_allocation());
    if allocated == 0 || allocated == klv_size {
        return Ok(klv_size);
    }
    let min_fill = klv::KEY_LEN + u64::from(options.min_llen);
    if allocated < klv_size || allocated - klv_size < min_fill {
        return Err(Error::FixedSpaceExceeded {
            key: *set.key(),
            required: klv_size + min_fill,
            allocated,
        });
    }
    Ok(allocated)
}
