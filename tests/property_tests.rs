//! Property-based tests for header metadata invariants.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use proptest::prelude::*;

use mxfmeta::baseline::*;
use mxfmeta::klv;
use mxfmeta::{DataModel, HeaderMetadata, PrimerPack, SetCursor, Ul, Uuid};

fn baseline_model() -> Arc<DataModel> {
    Arc::new(DataModel::baseline().unwrap())
}

fn set_key(index: usize) -> Ul {
    let mut bytes = [0u8; 16];
    bytes[..4].copy_from_slice(&[0x06, 0x0e, 0x2b, 0x34]);
    bytes[8..16].copy_from_slice(&(index as u64).to_be_bytes());
    Ul(bytes)
}

/// Strategy for primer registrations: a key and an optional preferred tag.
fn registrations() -> impl Strategy<Value = Vec<([u8; 16], Option<u16>)>> {
    prop::collection::vec((any::<[u8; 16]>(), any::<Option<u16>>()), 1..64)
}

/// Strategy for a set hierarchy: entry `i` names the parent of set `i + 1`
/// as an index below it, or none.
fn hierarchy() -> impl Strategy<Value = Vec<Option<prop::sample::Index>>> {
    prop::collection::vec(any::<Option<prop::sample::Index>>(), 0..16)
}

proptest! {
    /// Registering a key again always returns its first tag.
    #[test]
    fn primer_registration_is_idempotent(entries in registrations()) {
        let mut primer = PrimerPack::new();
        let mut first: HashMap<Ul, u16> = HashMap::new();
        for (bytes, preferred) in &entries {
            let key = Ul(*bytes);
            let tag = primer.register_entry(&key, *preferred).unwrap();
            let expected = *first.entry(key).or_insert(tag);
            prop_assert_eq!(tag, expected);
        }
        for (key, tag) in &first {
            prop_assert_eq!(primer.register_entry(key, None).unwrap(), *tag);
            prop_assert_eq!(primer.key_for_tag(*tag), Some(key));
        }

        // Distinct keys never share a tag
        let tags: HashSet<u16> = first.values().copied().collect();
        prop_assert_eq!(tags.len(), first.len());
        prop_assert_eq!(primer.len(), first.len());
    }

    /// Subclass relations are reflexive and transitive.
    #[test]
    fn subclass_is_transitive(parents in hierarchy()) {
        let mut model = DataModel::new();
        model.register_set_def("Root", None, set_key(0)).unwrap();
        for (i, parent) in parents.iter().enumerate() {
            let index = i + 1;
            let parent_key = parent.as_ref().map(|p| set_key(p.index(index)));
            model.register_set_def(&format!("Set{index}"), parent_key, set_key(index)).unwrap();
        }

        let count = parents.len() + 1;
        for a in 0..count {
            prop_assert!(model.is_subclass_of(&set_key(a), &set_key(a)));
            for b in 0..count {
                if !model.is_subclass_of(&set_key(a), &set_key(b)) {
                    continue;
                }
                for c in 0..count {
                    if model.is_subclass_of(&set_key(b), &set_key(c)) {
                        prop_assert!(model.is_subclass_of(&set_key(a), &set_key(c)));
                    }
                }
            }
        }
    }

    /// BER lengths decode to the encoded value at every permitted width.
    #[test]
    fn ber_length_roundtrip(len in any::<u64>(), extra in 0u8..9) {
        let min = klv::min_llen(len);
        let llen = (min + extra).min(klv::MAX_LLEN);
        let encoded = klv::encode_ber_length(len, llen).unwrap();
        prop_assert_eq!(encoded.len(), usize::from(llen));
        prop_assert_eq!(klv::decode_ber_length(&encoded).unwrap(), (len, llen));

        if min > 1 {
            prop_assert!(klv::encode_ber_length(len, min - 1).is_err());
        }
    }

    /// Every reference resolves to the set carrying that InstanceUID,
    /// whichever lookup is used.
    #[test]
    fn dereference_finds_referenced_set(
        set_count in 1usize..24,
        targets in prop::collection::vec(any::<prop::sample::Index>(), 0..48),
    ) {
        let mut header = HeaderMetadata::new(baseline_model());
        let uids: Vec<Uuid> = (0..set_count)
            .map(|_| header.create_set(IDENTIFICATION).unwrap().instance_uid())
            .collect();

        let preface = header.create_set(PREFACE).unwrap();
        let referenced: Vec<Uuid> = targets.iter().map(|t| uids[t.index(set_count)]).collect();
        for uid in &referenced {
            preface.add_strong_ref(&PREFACE_IDENTIFICATIONS, *uid).unwrap();
        }

        let preface = header.find_singular_set_by_key(&PREFACE).unwrap();
        let resolved = header.resolve_refs(preface, &PREFACE_IDENTIFICATIONS).unwrap();
        prop_assert_eq!(resolved.len(), referenced.len());

        let mut cursor = SetCursor::default();
        for (uid, set) in referenced.iter().zip(&resolved) {
            prop_assert_eq!(set.instance_uid(), *uid);
            prop_assert_eq!(header.dereference(uid).unwrap().instance_uid(), *uid);
            prop_assert_eq!(header.dereference_near(&mut cursor, uid).unwrap().instance_uid(), *uid);
        }
    }

    /// Written header metadata reads back with the same sets and items.
    #[test]
    fn write_read_roundtrip(
        versions in prop::collection::vec(any::<u16>(), 1..8),
        names in prop::collection::vec("[a-zA-Z0-9 ]{0,24}", 0..8),
    ) {
        let model = baseline_model();
        let mut header = HeaderMetadata::new(Arc::clone(&model));
        header.create_set(PREFACE).unwrap().set_u16(&PREFACE_VERSION, versions[0]).unwrap();
        for name in &names {
            header
                .create_set(IDENTIFICATION)
                .unwrap()
                .set_utf16_string(&IDENTIFICATION_PRODUCT_NAME, name)
                .unwrap();
        }
        for version in &versions[1..] {
            header.create_set(TRACK).unwrap().set_u32(&TRACK_NUMBER, u32::from(*version)).unwrap();
        }

        let mut bytes = Vec::new();
        let count = header.write(&mut bytes).unwrap();
        let read = HeaderMetadata::read_from(model, &mut bytes.as_slice(), count).unwrap();

        prop_assert_eq!(read.len(), header.len());
        for set in header.sets() {
            let copy = read.dereference(&set.instance_uid()).unwrap();
            prop_assert_eq!(copy.key(), set.key());
            prop_assert_eq!(copy.item_count(), set.item_count());
            for item in set.items() {
                prop_assert_eq!(copy.get_item(item.key()).unwrap().value(), item.value());
            }
        }
    }
}
