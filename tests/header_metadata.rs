//! End-to-end header metadata scenarios: building, writing, reading back,
//! forward compatibility, validation and cloning.

use std::collections::HashMap;
use std::sync::Arc;

use mxfmeta::baseline::*;
use mxfmeta::klv::{self, LEGACY_FILL_KEY};
use mxfmeta::writer::Writer;
use mxfmeta::{
    DataModel, Error, HeaderMetadata, ItemTypeId, ItemValue, MetadataSet, PrimerPack, Rational,
    Timestamp, Ul, Umid, Uuid,
};

fn baseline_model() -> Arc<DataModel> {
    Arc::new(DataModel::baseline().unwrap())
}

fn write(header: &mut HeaderMetadata) -> (Vec<u8>, u64) {
    let mut bytes = Vec::new();
    let count = header.write(&mut bytes).unwrap();
    assert_eq!(count, bytes.len() as u64);
    (bytes, count)
}

fn read(model: Arc<DataModel>, bytes: &[u8], count: u64) -> mxfmeta::Result<HeaderMetadata> {
    let mut stream = bytes;
    HeaderMetadata::read_from(model, &mut stream, count)
}

/// Item key/value pairs of every set, keyed by InstanceUID.
fn snapshot(header: &HeaderMetadata) -> HashMap<Uuid, (Ul, Vec<(Ul, Vec<u8>)>)> {
    header
        .sets()
        .map(|set| {
            let mut items: Vec<(Ul, Vec<u8>)> = set
                .items()
                .map(|item| (*item.key(), item.value().to_vec()))
                .collect();
            items.sort();
            (set.instance_uid(), (*set.key(), items))
        })
        .collect()
}

fn sample_header(model: &Arc<DataModel>) -> HeaderMetadata {
    let mut header = HeaderMetadata::new(Arc::clone(model));

    let ident = header.create_set(IDENTIFICATION).unwrap();
    ident.set_utf16_string(&IDENTIFICATION_COMPANY_NAME, "Example Co").unwrap();
    ident.set_utf16_string(&IDENTIFICATION_PRODUCT_NAME, "mxfmeta").unwrap();
    ident.set_utf16_string(&IDENTIFICATION_VERSION_STRING, "0.1.0").unwrap();
    ident.set_uuid(&IDENTIFICATION_THIS_GENERATION_UID, Uuid::from_u128(0x42)).unwrap();
    ident.set_ul(&IDENTIFICATION_PRODUCT_UID, Ul([0x11; 16])).unwrap();
    ident.set_timestamp(&IDENTIFICATION_MODIFICATION_DATE, Timestamp::default()).unwrap();
    let ident_uid = ident.instance_uid();

    let sequence = header.create_set(SEQUENCE).unwrap();
    sequence.set_ul(&COMPONENT_DATA_DEFINITION, Ul([0x22; 16])).unwrap();
    sequence.set_i64(&COMPONENT_DURATION, 250).unwrap();
    sequence.alloc_array_item_elements(&SEQUENCE_STRUCTURAL_COMPONENTS, 16, 0).unwrap();
    let sequence_uid = sequence.instance_uid();

    let track = header.create_set(TRACK).unwrap();
    track.set_u32(&TRACK_ID, 1).unwrap();
    track.set_u32(&TRACK_NUMBER, 0x1501_0500).unwrap();
    track.set_rational(&TRACK_EDIT_RATE, Rational::new(25, 1)).unwrap();
    track.set_i64(&TRACK_ORIGIN, 0).unwrap();
    track.set_strong_ref(&TRACK_SEQUENCE, sequence_uid).unwrap();
    let track_uid = track.instance_uid();

    let package = header.create_set(MATERIAL_PACKAGE).unwrap();
    package.set_utf16_string(&PACKAGE_NAME, "Main").unwrap();
    package.set_umid(&PACKAGE_UID, Umid([0x44; 32])).unwrap();
    package.set_timestamp(&PACKAGE_CREATION_DATE, Timestamp::default()).unwrap();
    package.set_timestamp(&PACKAGE_MODIFIED_DATE, Timestamp::default()).unwrap();
    package.add_strong_ref(&PACKAGE_TRACKS, track_uid).unwrap();
    let package_uid = package.instance_uid();

    let storage = header.create_set(CONTENT_STORAGE).unwrap();
    storage.add_strong_ref(&CONTENT_STORAGE_PACKAGES, package_uid).unwrap();
    let storage_uid = storage.instance_uid();

    let preface = header.create_set(PREFACE).unwrap();
    preface.set_u16(&PREFACE_VERSION, 0x0102).unwrap();
    preface.set_timestamp(&PREFACE_LAST_MODIFIED_DATE, Timestamp::default()).unwrap();
    preface.add_strong_ref(&PREFACE_IDENTIFICATIONS, ident_uid).unwrap();
    preface.set_strong_ref(&PREFACE_CONTENT_STORAGE, storage_uid).unwrap();
    preface.set_weak_ref(&PREFACE_PRIMARY_PACKAGE, package_uid).unwrap();
    preface.set_ul(&PREFACE_OPERATIONAL_PATTERN, Ul([0x33; 16])).unwrap();
    preface.alloc_array_item_elements(&PREFACE_ESSENCE_CONTAINERS, 16, 0).unwrap();
    preface.alloc_array_item_elements(&PREFACE_DM_SCHEMES, 16, 0).unwrap();

    header
}

#[test]
fn test_round_trip_preserves_graph() {
    let model = baseline_model();
    let mut header = sample_header(&model);
    let (bytes, count) = write(&mut header);

    let read = read(Arc::clone(&model), &bytes, count).unwrap();
    assert_eq!(read.len(), header.len());
    assert_eq!(snapshot(&read), snapshot(&header));
    assert!(read.sets().all(|set| set.items().all(|item| item.is_persistent())));

    // The Preface is written first even though it was created last
    assert_eq!(read.sets().next().unwrap().key(), &PREFACE);

    // Writing the read graph again reproduces the same bytes
    let mut read = read;
    let (again, again_count) = write(&mut read);
    assert_eq!(again_count, count);
    assert_eq!(again, bytes);
}

#[test]
fn test_round_trip_references_resolve() {
    let model = baseline_model();
    let mut header = sample_header(&model);
    let (bytes, count) = write(&mut header);
    let read = read(model, &bytes, count).unwrap();

    let preface = read.find_singular_set_by_key(&PREFACE).unwrap();
    let storage = read.strong_ref(preface, &PREFACE_CONTENT_STORAGE).unwrap().unwrap();
    assert_eq!(storage.key(), &CONTENT_STORAGE);
    let packages = read.resolve_refs(storage, &CONTENT_STORAGE_PACKAGES).unwrap();
    assert_eq!(packages.len(), 1);
    assert!(packages[0].is_subclass_of(&GENERIC_PACKAGE));
    let primary = read.weak_ref(preface, &PREFACE_PRIMARY_PACKAGE).unwrap().unwrap();
    assert_eq!(primary.instance_uid(), packages[0].instance_uid());
    assert_eq!(
        primary.get_utf16_string(&PACKAGE_NAME).unwrap(),
        "Main"
    );
    assert!(read.validate(false), "{:?}", read.validation_errors());
}

#[test]
fn test_preface_identification_example() {
    let mut model = DataModel::new();
    model
        .register_set_def("InterchangeObject", None, INTERCHANGE_OBJECT)
        .unwrap();
    model
        .register_item_def(
            "InstanceUID",
            INTERCHANGE_OBJECT,
            INSTANCE_UID,
            0x3c0a,
            ItemTypeId::Uuid,
            true,
        )
        .unwrap();
    model
        .register_set_def("Preface", Some(INTERCHANGE_OBJECT), PREFACE)
        .unwrap();
    model
        .register_item_def("Version", PREFACE, PREFACE_VERSION, 0x3b05, ItemTypeId::UInt16, true)
        .unwrap();
    model
        .register_set_def("Identification", Some(INTERCHANGE_OBJECT), IDENTIFICATION)
        .unwrap();
    let model = Arc::new(model);

    let mut header = HeaderMetadata::new(Arc::clone(&model));
    header.create_set(PREFACE).unwrap().set_u16(&PREFACE_VERSION, 1).unwrap();
    header.create_set(IDENTIFICATION).unwrap();
    assert!(header.validate(true));

    let (bytes, count) = write(&mut header);
    let read = read(model, &bytes, count).unwrap();
    let preface = read.find_singular_set_by_key(&PREFACE).unwrap();
    assert_eq!(preface.get_u16(&PREFACE_VERSION).unwrap(), 1);
    assert_eq!(read.find_sets_by_key(&IDENTIFICATION).len(), 1);
}

#[test]
fn test_unknown_set_is_skipped() {
    let model = baseline_model();
    let mut header = HeaderMetadata::new(Arc::clone(&model));
    header.create_set(PREFACE).unwrap().set_u16(&PREFACE_VERSION, 7).unwrap();
    let (mut bytes, mut count) = write(&mut header);

    // Append a dark set and a fill KLV inside the header byte count
    let dark_key = Ul([
        0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0e, 0x7f, 0x01, 0x02, 0x03, 0x04, 0x05,
        0x06,
    ]);
    klv::write_kl(&mut bytes, &dark_key, 37).unwrap();
    bytes.extend_from_slice(&[0xab; 37]);
    klv::write_fill(&mut bytes, &LEGACY_FILL_KEY, 64, 4).unwrap();
    count += (16 + 1 + 37) + 64;
    assert_eq!(count, bytes.len() as u64);

    let read = read(model, &bytes, count).unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(
        read.find_singular_set_by_key(&PREFACE)
            .unwrap()
            .get_u16(&PREFACE_VERSION)
            .unwrap(),
        7
    );
}

#[test]
fn test_unknown_item_in_known_set_is_skipped() {
    let model = baseline_model();
    let unknown_key = Ul([0x06, 0x0e, 0x2b, 0x34, 0x01, 0x01, 0x01, 0x0e, 0x7f, 0, 0, 0, 0, 0, 0, 1]);
    let uid = Uuid::from_u128(0x1234);

    let mut primer = PrimerPack::new();
    primer.register_entry(&INSTANCE_UID, Some(0x3c0a)).unwrap();
    primer.register_entry(&PREFACE_VERSION, Some(0x3b05)).unwrap();
    primer.register_entry(&unknown_key, Some(0x8001)).unwrap();

    let mut value = Writer::new();
    value.write_local_item(&INSTANCE_UID, 0x3c0a, uid.as_bytes()).unwrap();
    value.write_local_item(&unknown_key, 0x8001, &[1, 2, 3, 4, 5]).unwrap();
    value.write_local_item(&PREFACE_VERSION, 0x3b05, &[0x01, 0x02]).unwrap();
    // Tag missing from the primer pack
    value.write_local_item(&unknown_key, 0x9999, &[9; 3]).unwrap();
    let value = value.into_inner();

    let mut bytes = Vec::new();
    primer.write(&mut bytes, 4).unwrap();
    klv::write_fixed_kl(&mut bytes, &PREFACE, 4, value.len() as u64).unwrap();
    bytes.extend_from_slice(&value);

    let read = read(model, &bytes, bytes.len() as u64).unwrap();
    let preface = read.find_singular_set_by_key(&PREFACE).unwrap();
    assert_eq!(preface.instance_uid(), uid);
    assert_eq!(preface.get_u16(&PREFACE_VERSION).unwrap(), 0x0102);
    assert!(!preface.has_item(&unknown_key));
    assert_eq!(preface.item_count(), 2);
}

#[test]
fn test_set_without_instance_uid_fails() {
    let model = baseline_model();
    let mut primer = PrimerPack::new();
    primer.register_entry(&PREFACE_VERSION, Some(0x3b05)).unwrap();

    let mut value = Writer::new();
    value.write_local_item(&PREFACE_VERSION, 0x3b05, &[0, 1]).unwrap();
    let value = value.into_inner();

    let mut bytes = Vec::new();
    primer.write(&mut bytes, 4).unwrap();
    klv::write_kl(&mut bytes, &PREFACE, value.len() as u64).unwrap();
    bytes.extend_from_slice(&value);

    assert!(matches!(
        read(model, &bytes, bytes.len() as u64),
        Err(Error::MissingInstanceUid(_))
    ));
}

#[test]
fn test_length_accounting() {
    let model = baseline_model();
    let mut header = sample_header(&model);
    let (bytes, count) = write(&mut header);

    assert_eq!(count, header.size(&Default::default()).unwrap());
    assert!(matches!(
        read(Arc::clone(&model), &bytes, count - 1),
        Err(Error::HeaderByteCountMismatch { .. })
    ));
    // Extra trailing bytes outside the header byte count are not consumed
    let mut padded = bytes.clone();
    padded.extend_from_slice(&[0; 32]);
    let mut stream = padded.as_slice();
    HeaderMetadata::read_from(Arc::clone(&model), &mut stream, count).unwrap();
    assert_eq!(stream.len(), 32);
    // A header byte count beyond the data runs out of input
    assert!(read(model, &bytes, count + 100).is_err());
}

#[test]
fn test_malformed_arrays_fail_validation() {
    let model = baseline_model();
    let mut preface = MetadataSet::new(Arc::clone(&model), PREFACE).unwrap();
    preface.set_u16(&PREFACE_VERSION, 0x0102).unwrap();
    preface.set_timestamp(&PREFACE_LAST_MODIFIED_DATE, Timestamp::default()).unwrap();
    preface.set_ul(&PREFACE_OPERATIONAL_PATTERN, Ul([1; 16])).unwrap();
    preface.set_strong_ref(&PREFACE_CONTENT_STORAGE, Uuid::from_u128(1)).unwrap();
    preface.alloc_array_item_elements(&PREFACE_IDENTIFICATIONS, 16, 1).unwrap();
    preface.alloc_array_item_elements(&PREFACE_DM_SCHEMES, 16, 0).unwrap();

    let malformed: Vec<Vec<u8>> = vec![
        // Shorter than the header
        vec![0, 0, 0, 1],
        // Count larger than the elements present
        [vec![0, 0, 0, 2, 0, 0, 0, 16], vec![0; 16]].concat(),
        // Elements not a multiple of 16 bytes
        [vec![0, 0, 0, 1, 0, 0, 0, 16], vec![0; 17]].concat(),
        // Header declares the wrong element length
        [vec![0, 0, 0, 2, 0, 0, 0, 8], vec![0; 16]].concat(),
    ];
    for value in malformed {
        preface.set_item(&PREFACE_ESSENCE_CONTAINERS, value.clone()).unwrap();
        assert!(!preface.validate(false), "accepted {value:?}");
        assert!(preface.get_array::<Ul>(&PREFACE_ESSENCE_CONTAINERS).is_err());
    }

    preface.alloc_array_item_elements(&PREFACE_ESSENCE_CONTAINERS, 16, 2).unwrap();
    assert!(preface.validate(false), "{:?}", preface.validation_errors());
}

#[test]
fn test_typed_value_view() {
    let model = baseline_model();
    let mut header = sample_header(&model);
    let track = header
        .sets_mut()
        .find(|set| set.key() == &TRACK)
        .unwrap();
    assert_eq!(
        track.value(&TRACK_EDIT_RATE).unwrap(),
        ItemValue::Rational(Rational::new(25, 1))
    );
    track
        .set_value(&TRACK_NAME, &ItemValue::Utf16String("V1".into()))
        .unwrap();
    assert_eq!(track.get_utf16_string(&TRACK_NAME).unwrap(), "V1");
    assert!(matches!(
        track.value(&TRACK_SEQUENCE).unwrap(),
        ItemValue::StrongRef(_)
    ));
}

#[test]
fn test_clone_follows_strong_refs() {
    let model = baseline_model();
    let source = sample_header(&model);
    let source_preface = source.find_singular_set_by_key(&PREFACE).unwrap();

    let mut dest = HeaderMetadata::new(Arc::clone(&model));
    let copy_uid = dest.clone_set(&source, &source_preface.instance_uid()).unwrap();
    assert_ne!(copy_uid, source_preface.instance_uid());

    // Every set is strongly reachable from the Preface
    assert_eq!(dest.len(), source.len());
    let copy = dest.dereference(&copy_uid).unwrap();
    assert_eq!(copy.get_u16(&PREFACE_VERSION).unwrap(), 0x0102);
    // Weak references are dropped
    assert!(!copy.has_item(&PREFACE_PRIMARY_PACKAGE));

    let storage = dest.strong_ref(copy, &PREFACE_CONTENT_STORAGE).unwrap().unwrap();
    let packages = dest.resolve_refs(storage, &CONTENT_STORAGE_PACKAGES).unwrap();
    assert_eq!(packages.len(), 1);
    let tracks = dest.resolve_refs(packages[0], &PACKAGE_TRACKS).unwrap();
    assert_eq!(tracks[0].get_u32(&TRACK_NUMBER).unwrap(), 0x1501_0500);
    assert!(source.dereference(&tracks[0].instance_uid()).is_none());
}

#[test]
fn test_clone_terminates_on_cycles() {
    let model = baseline_model();
    let mut source = HeaderMetadata::new(Arc::clone(&model));
    let a = source.create_set(SEQUENCE).unwrap().instance_uid();
    let b = source.create_set(SEQUENCE).unwrap().instance_uid();
    source
        .dereference_mut(&a)
        .unwrap()
        .add_strong_ref(&SEQUENCE_STRUCTURAL_COMPONENTS, b)
        .unwrap();
    source
        .dereference_mut(&b)
        .unwrap()
        .add_strong_ref(&SEQUENCE_STRUCTURAL_COMPONENTS, a)
        .unwrap();

    let mut dest = HeaderMetadata::new(Arc::clone(&model));
    let a_copy = dest.clone_set(&source, &a).unwrap();
    assert_eq!(dest.len(), 2);

    let a_set = dest.dereference(&a_copy).unwrap();
    let b_copy = a_set.get_strong_ref_array(&SEQUENCE_STRUCTURAL_COMPONENTS).unwrap()[0];
    let b_set = dest.dereference(&b_copy).unwrap();
    assert_eq!(
        b_set.get_strong_ref_array(&SEQUENCE_STRUCTURAL_COMPONENTS).unwrap(),
        vec![a_copy]
    );
}

#[test]
fn test_failed_clone_adds_nothing() {
    let model = baseline_model();
    let mut source = HeaderMetadata::new(Arc::clone(&model));
    let track = source.create_set(TRACK).unwrap();
    let track_uid = track.instance_uid();
    // Declared as a strong reference but not 16 bytes long
    track.set_item(&TRACK_SEQUENCE, vec![1, 2, 3]).unwrap();

    let mut dest = HeaderMetadata::new(Arc::clone(&model));
    assert!(dest.clone_set(&source, &track_uid).is_err());
    assert!(dest.is_empty());
    assert!(dest.primer().is_empty());
    assert!(matches!(
        dest.clone_set(&source, &Uuid::from_u128(5)),
        Err(Error::UnknownInstance(_))
    ));
}
