//! SMPTE ST 377-1 structural metadata baseline.
//!
//! Set and item keys for the core structural classes, and
//! [`DataModel::baseline`] which registers them. Extension schemas register
//! their own definitions on top of this.

use crate::error::Result;
use crate::model::data_model::DataModel;
use crate::model::item_type::ItemTypeId;
use crate::types::Ul;

const fn set_key(id: u8) -> Ul {
    Ul::new([
        0x06, 0x0e, 0x2b, 0x34, 0x02, 0x53, 0x01, 0x01, 0x0d, 0x01, 0x01, 0x01, 0x01, 0x01, id, 0x00,
    ])
}

const fn item_key(version: u8, rest: [u8; 8]) -> Ul {
    Ul::new([
        0x06, 0x0e, 0x2b, 0x34, 0x01, 0x01, 0x01, version, rest[0], rest[1], rest[2], rest[3],
        rest[4], rest[5], rest[6], rest[7],
    ])
}

// Sets

pub const INTERCHANGE_OBJECT: Ul = set_key(0x01);
pub const STRUCTURAL_COMPONENT: Ul = set_key(0x02);
pub const FILLER: Ul = set_key(0x09);
pub const SEQUENCE: Ul = set_key(0x0f);
pub const SOURCE_CLIP: Ul = set_key(0x11);
pub const CONTENT_STORAGE: Ul = set_key(0x18);
pub const ESSENCE_CONTAINER_DATA: Ul = set_key(0x23);
pub const GENERIC_DESCRIPTOR: Ul = set_key(0x24);
pub const FILE_DESCRIPTOR: Ul = set_key(0x25);
pub const PREFACE: Ul = set_key(0x2f);
pub const IDENTIFICATION: Ul = set_key(0x30);
pub const GENERIC_PACKAGE: Ul = set_key(0x34);
pub const MATERIAL_PACKAGE: Ul = set_key(0x36);
pub const SOURCE_PACKAGE: Ul = set_key(0x37);
pub const GENERIC_TRACK: Ul = set_key(0x38);
pub const TRACK: Ul = set_key(0x3b);
pub const TAGGED_VALUE: Ul = set_key(0x3f);

// InterchangeObject

pub const INSTANCE_UID: Ul = item_key(0x01, [0x01, 0x01, 0x15, 0x02, 0x00, 0x00, 0x00, 0x00]);
pub const GENERATION_UID: Ul = item_key(0x02, [0x05, 0x20, 0x07, 0x01, 0x08, 0x00, 0x00, 0x00]);

// Preface

pub const PREFACE_LAST_MODIFIED_DATE: Ul =
    item_key(0x02, [0x07, 0x02, 0x01, 0x10, 0x02, 0x04, 0x00, 0x00]);
pub const PREFACE_VERSION: Ul = item_key(0x02, [0x03, 0x01, 0x02, 0x01, 0x05, 0x00, 0x00, 0x00]);
pub const PREFACE_OBJECT_MODEL_VERSION: Ul =
    item_key(0x02, [0x03, 0x01, 0x02, 0x01, 0x04, 0x00, 0x00, 0x00]);
pub const PREFACE_PRIMARY_PACKAGE: Ul =
    item_key(0x04, [0x06, 0x01, 0x01, 0x04, 0x01, 0x08, 0x00, 0x00]);
pub const PREFACE_IDENTIFICATIONS: Ul =
    item_key(0x02, [0x06, 0x01, 0x01, 0x04, 0x06, 0x04, 0x00, 0x00]);
pub const PREFACE_CONTENT_STORAGE: Ul =
    item_key(0x02, [0x06, 0x01, 0x01, 0x04, 0x02, 0x01, 0x00, 0x00]);
pub const PREFACE_OPERATIONAL_PATTERN: Ul =
    item_key(0x05, [0x01, 0x02, 0x02, 0x03, 0x00, 0x00, 0x00, 0x00]);
pub const PREFACE_ESSENCE_CONTAINERS: Ul =
    item_key(0x05, [0x01, 0x02, 0x02, 0x10, 0x02, 0x01, 0x00, 0x00]);
pub const PREFACE_DM_SCHEMES: Ul = item_key(0x05, [0x01, 0x02, 0x02, 0x10, 0x02, 0x02, 0x00, 0x00]);

// Identification

pub const IDENTIFICATION_THIS_GENERATION_UID: Ul =
    item_key(0x02, [0x05, 0x20, 0x07, 0x01, 0x01, 0x00, 0x00, 0x00]);
pub const IDENTIFICATION_COMPANY_NAME: Ul =
    item_key(0x02, [0x05, 0x20, 0x07, 0x01, 0x02, 0x01, 0x00, 0x00]);
pub const IDENTIFICATION_PRODUCT_NAME: Ul =
    item_key(0x02, [0x05, 0x20, 0x07, 0x01, 0x03, 0x01, 0x00, 0x00]);
pub const IDENTIFICATION_PRODUCT_VERSION: Ul =
    item_key(0x02, [0x05, 0x20, 0x07, 0x01, 0x04, 0x00, 0x00, 0x00]);
pub const IDENTIFICATION_VERSION_STRING: Ul =
    item_key(0x02, [0x05, 0x20, 0x07, 0x01, 0x05, 0x01, 0x00, 0x00]);
pub const IDENTIFICATION_PRODUCT_UID: Ul =
    item_key(0x02, [0x05, 0x20, 0x07, 0x01, 0x07, 0x00, 0x00, 0x00]);
pub const IDENTIFICATION_MODIFICATION_DATE: Ul =
    item_key(0x02, [0x07, 0x02, 0x01, 0x10, 0x02, 0x03, 0x00, 0x00]);
pub const IDENTIFICATION_TOOLKIT_VERSION: Ul =
    item_key(0x02, [0x05, 0x20, 0x07, 0x01, 0x0a, 0x00, 0x00, 0x00]);
pub const IDENTIFICATION_PLATFORM: Ul =
    item_key(0x02, [0x05, 0x20, 0x07, 0x01, 0x06, 0x01, 0x00, 0x00]);

// ContentStorage

pub const CONTENT_STORAGE_PACKAGES: Ul =
    item_key(0x02, [0x06, 0x01, 0x01, 0x04, 0x05, 0x01, 0x00, 0x00]);
pub const CONTENT_STORAGE_ESSENCE_CONTAINER_DATA: Ul =
    item_key(0x02, [0x06, 0x01, 0x01, 0x04, 0x05, 0x02, 0x00, 0x00]);

// EssenceContainerData

pub const LINKED_PACKAGE_UID: Ul = item_key(0x02, [0x06, 0x01, 0x01, 0x06, 0x01, 0x00, 0x00, 0x00]);
pub const INDEX_SID: Ul = item_key(0x04, [0x01, 0x03, 0x04, 0x05, 0x00, 0x00, 0x00, 0x00]);
pub const BODY_SID: Ul = item_key(0x04, [0x01, 0x03, 0x04, 0x04, 0x00, 0x00, 0x00, 0x00]);

// GenericPackage

pub const PACKAGE_UID: Ul = item_key(0x01, [0x01, 0x01, 0x15, 0x10, 0x00, 0x00, 0x00, 0x00]);
pub const PACKAGE_NAME: Ul = item_key(0x01, [0x01, 0x03, 0x03, 0x02, 0x01, 0x00, 0x00, 0x00]);
pub const PACKAGE_CREATION_DATE: Ul =
    item_key(0x02, [0x07, 0x02, 0x01, 0x10, 0x01, 0x03, 0x00, 0x00]);
pub const PACKAGE_MODIFIED_DATE: Ul =
    item_key(0x02, [0x07, 0x02, 0x01, 0x10, 0x02, 0x05, 0x00, 0x00]);
pub const PACKAGE_TRACKS: Ul = item_key(0x02, [0x06, 0x01, 0x01, 0x04, 0x06, 0x05, 0x00, 0x00]);
pub const PACKAGE_USER_COMMENTS: Ul =
    item_key(0x02, [0x03, 0x02, 0x01, 0x02, 0x0c, 0x00, 0x00, 0x00]);

// SourcePackage

pub const SOURCE_PACKAGE_DESCRIPTOR: Ul =
    item_key(0x02, [0x06, 0x01, 0x01, 0x04, 0x02, 0x03, 0x00, 0x00]);

// GenericTrack / Track

pub const TRACK_ID: Ul = item_key(0x02, [0x01, 0x07, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00]);
pub const TRACK_NUMBER: Ul = item_key(0x02, [0x01, 0x04, 0x01, 0x03, 0x00, 0x00, 0x00, 0x00]);
pub const TRACK_NAME: Ul = item_key(0x02, [0x01, 0x07, 0x01, 0x02, 0x01, 0x00, 0x00, 0x00]);
pub const TRACK_SEQUENCE: Ul = item_key(0x02, [0x06, 0x01, 0x01, 0x04, 0x02, 0x04, 0x00, 0x00]);
pub const TRACK_EDIT_RATE: Ul = item_key(0x02, [0x05, 0x30, 0x04, 0x05, 0x00, 0x00, 0x00, 0x00]);
pub const TRACK_ORIGIN: Ul = item_key(0x02, [0x07, 0x02, 0x01, 0x03, 0x01, 0x03, 0x00, 0x00]);

// StructuralComponent / Sequence / SourceClip

pub const COMPONENT_DATA_DEFINITION: Ul =
    item_key(0x02, [0x04, 0x07, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
pub const COMPONENT_DURATION: Ul =
    item_key(0x02, [0x07, 0x02, 0x02, 0x01, 0x01, 0x03, 0x00, 0x00]);
pub const SEQUENCE_STRUCTURAL_COMPONENTS: Ul =
    item_key(0x02, [0x06, 0x01, 0x01, 0x04, 0x06, 0x09, 0x00, 0x00]);
pub const SOURCE_CLIP_START_POSITION: Ul =
    item_key(0x02, [0x07, 0x02, 0x01, 0x03, 0x01, 0x04, 0x00, 0x00]);
pub const SOURCE_CLIP_SOURCE_PACKAGE_ID: Ul =
    item_key(0x02, [0x06, 0x01, 0x01, 0x03, 0x01, 0x00, 0x00, 0x00]);
pub const SOURCE_CLIP_SOURCE_TRACK_ID: Ul =
    item_key(0x02, [0x06, 0x01, 0x01, 0x03, 0x02, 0x00, 0x00, 0x00]);

// GenericDescriptor / FileDescriptor

pub const DESCRIPTOR_LOCATORS: Ul =
    item_key(0x02, [0x06, 0x01, 0x01, 0x04, 0x06, 0x03, 0x00, 0x00]);
pub const FILE_DESCRIPTOR_LINKED_TRACK_ID: Ul =
    item_key(0x05, [0x06, 0x01, 0x01, 0x03, 0x05, 0x00, 0x00, 0x00]);
pub const FILE_DESCRIPTOR_SAMPLE_RATE: Ul =
    item_key(0x01, [0x04, 0x06, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00]);
pub const FILE_DESCRIPTOR_CONTAINER_DURATION: Ul =
    item_key(0x01, [0x04, 0x06, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00]);
pub const FILE_DESCRIPTOR_ESSENCE_CONTAINER: Ul =
    item_key(0x02, [0x06, 0x01, 0x01, 0x04, 0x01, 0x02, 0x00, 0x00]);

// TaggedValue

pub const TAGGED_VALUE_NAME: Ul = item_key(0x02, [0x03, 0x02, 0x01, 0x02, 0x09, 0x01, 0x00, 0x00]);
pub const TAGGED_VALUE_VALUE: Ul =
    item_key(0x02, [0x03, 0x02, 0x01, 0x02, 0x0a, 0x01, 0x00, 0x00]);

const SET_DEFS: &[(&str, Option<Ul>, Ul)] = &[
    ("InterchangeObject", None, INTERCHANGE_OBJECT),
    ("Preface", Some(INTERCHANGE_OBJECT), PREFACE),
    ("Identification", Some(INTERCHANGE_OBJECT), IDENTIFICATION),
    ("ContentStorage", Some(INTERCHANGE_OBJECT), CONTENT_STORAGE),
    ("EssenceContainerData", Some(INTERCHANGE_OBJECT), ESSENCE_CONTAINER_DATA),
    ("GenericPackage", Some(INTERCHANGE_OBJECT), GENERIC_PACKAGE),
    ("MaterialPackage", Some(GENERIC_PACKAGE), MATERIAL_PACKAGE),
    ("SourcePackage", Some(GENERIC_PACKAGE), SOURCE_PACKAGE),
    ("GenericTrack", Some(INTERCHANGE_OBJECT), GENERIC_TRACK),
    ("Track", Some(GENERIC_TRACK), TRACK),
    ("StructuralComponent", Some(INTERCHANGE_OBJECT), STRUCTURAL_COMPONENT),
    ("Sequence", Some(STRUCTURAL_COMPONENT), SEQUENCE),
    ("SourceClip", Some(STRUCTURAL_COMPONENT), SOURCE_CLIP),
    ("Filler", Some(STRUCTURAL_COMPONENT), FILLER),
    ("GenericDescriptor", Some(INTERCHANGE_OBJECT), GENERIC_DESCRIPTOR),
    ("FileDescriptor", Some(GENERIC_DESCRIPTOR), FILE_DESCRIPTOR),
    ("TaggedValue", Some(INTERCHANGE_OBJECT), TAGGED_VALUE),
];

type ItemRow = (&'static str, Ul, Ul, u16, ItemTypeId, bool);

const ITEM_DEFS: &[ItemRow] = &[
    ("InstanceUID", INTERCHANGE_OBJECT, INSTANCE_UID, 0x3c0a, ItemTypeId::Uuid, true),
    ("GenerationUID", INTERCHANGE_OBJECT, GENERATION_UID, 0x0102, ItemTypeId::Uuid, false),
    ("LastModifiedDate", PREFACE, PREFACE_LAST_MODIFIED_DATE, 0x3b02, ItemTypeId::Timestamp, true),
    ("Version", PREFACE, PREFACE_VERSION, 0x3b05, ItemTypeId::VersionType, true),
    ("ObjectModelVersion", PREFACE, PREFACE_OBJECT_MODEL_VERSION, 0x3b07, ItemTypeId::UInt32, false),
    ("PrimaryPackage", PREFACE, PREFACE_PRIMARY_PACKAGE, 0x3b08, ItemTypeId::WeakRef, false),
    ("Identifications", PREFACE, PREFACE_IDENTIFICATIONS, 0x3b06, ItemTypeId::StrongRefArray, true),
    ("ContentStorage", PREFACE, PREFACE_CONTENT_STORAGE, 0x3b03, ItemTypeId::StrongRef, true),
    ("OperationalPattern", PREFACE, PREFACE_OPERATIONAL_PATTERN, 0x3b09, ItemTypeId::Ul, true),
    ("EssenceContainers", PREFACE, PREFACE_ESSENCE_CONTAINERS, 0x3b0a, ItemTypeId::UlBatch, true),
    ("DMSchemes", PREFACE, PREFACE_DM_SCHEMES, 0x3b0b, ItemTypeId::UlBatch, true),
    ("ThisGenerationUID", IDENTIFICATION, IDENTIFICATION_THIS_GENERATION_UID, 0x3c09, ItemTypeId::Uuid, true),
    ("CompanyName", IDENTIFICATION, IDENTIFICATION_COMPANY_NAME, 0x3c01, ItemTypeId::Utf16String, true),
    ("ProductName", IDENTIFICATION, IDENTIFICATION_PRODUCT_NAME, 0x3c02, ItemTypeId::Utf16String, true),
    ("ProductVersion", IDENTIFICATION, IDENTIFICATION_PRODUCT_VERSION, 0x3c03, ItemTypeId::ProductVersion, false),
    ("VersionString", IDENTIFICATION, IDENTIFICATION_VERSION_STRING, 0x3c04, ItemTypeId::Utf16String, true),
    ("ProductUID", IDENTIFICATION, IDENTIFICATION_PRODUCT_UID, 0x3c05, ItemTypeId::Auid, true),
    ("ModificationDate", IDENTIFICATION, IDENTIFICATION_MODIFICATION_DATE, 0x3c06, ItemTypeId::Timestamp, true),
    ("ToolkitVersion", IDENTIFICATION, IDENTIFICATION_TOOLKIT_VERSION, 0x3c07, ItemTypeId::ProductVersion, false),
    ("Platform", IDENTIFICATION, IDENTIFICATION_PLATFORM, 0x3c08, ItemTypeId::Utf16String, false),
    ("Packages", CONTENT_STORAGE, CONTENT_STORAGE_PACKAGES, 0x1901, ItemTypeId::StrongRefBatch, true),
    (
        "EssenceContainerData",
        CONTENT_STORAGE,
        CONTENT_STORAGE_ESSENCE_CONTAINER_DATA,
        0x1902,
        ItemTypeId::StrongRefBatch,
        false,
    ),
    ("LinkedPackageUID", ESSENCE_CONTAINER_DATA, LINKED_PACKAGE_UID, 0x2701, ItemTypeId::PackageId, true),
    ("IndexSID", ESSENCE_CONTAINER_DATA, INDEX_SID, 0x3f06, ItemTypeId::UInt32, false),
    ("BodySID", ESSENCE_CONTAINER_DATA, BODY_SID, 0x3f07, ItemTypeId::UInt32, true),
    ("PackageUID", GENERIC_PACKAGE, PACKAGE_UID, 0x4401, ItemTypeId::PackageId, true),
    ("Name", GENERIC_PACKAGE, PACKAGE_NAME, 0x4402, ItemTypeId::Utf16String, false),
    ("PackageCreationDate", GENERIC_PACKAGE, PACKAGE_CREATION_DATE, 0x4405, ItemTypeId::Timestamp, true),
    ("PackageModifiedDate", GENERIC_PACKAGE, PACKAGE_MODIFIED_DATE, 0x4404, ItemTypeId::Timestamp, true),
    ("Tracks", GENERIC_PACKAGE, PACKAGE_TRACKS, 0x4403, ItemTypeId::StrongRefArray, true),
    ("UserComments", GENERIC_PACKAGE, PACKAGE_USER_COMMENTS, 0x4406, ItemTypeId::StrongRefArray, false),
    ("Descriptor", SOURCE_PACKAGE, SOURCE_PACKAGE_DESCRIPTOR, 0x4701, ItemTypeId::StrongRef, false),
    ("TrackID", GENERIC_TRACK, TRACK_ID, 0x4801, ItemTypeId::UInt32, false),
    ("TrackNumber", GENERIC_TRACK, TRACK_NUMBER, 0x4804, ItemTypeId::UInt32, true),
    ("TrackName", GENERIC_TRACK, TRACK_NAME, 0x4802, ItemTypeId::Utf16String, false),
    ("Sequence", GENERIC_TRACK, TRACK_SEQUENCE, 0x4803, ItemTypeId::StrongRef, true),
    ("EditRate", TRACK, TRACK_EDIT_RATE, 0x4b01, ItemTypeId::Rational, true),
    ("Origin", TRACK, TRACK_ORIGIN, 0x4b02, ItemTypeId::Position, true),
    ("DataDefinition", STRUCTURAL_COMPONENT, COMPONENT_DATA_DEFINITION, 0x0201, ItemTypeId::Ul, true),
    ("Duration", STRUCTURAL_COMPONENT, COMPONENT_DURATION, 0x0202, ItemTypeId::Length, false),
    (
        "StructuralComponents",
        SEQUENCE,
        SEQUENCE_STRUCTURAL_COMPONENTS,
        0x1001,
        ItemTypeId::StrongRefArray,
        true,
    ),
    ("StartPosition", SOURCE_CLIP, SOURCE_CLIP_START_POSITION, 0x1201, ItemTypeId::Position, true),
    ("SourcePackageID", SOURCE_CLIP, SOURCE_CLIP_SOURCE_PACKAGE_ID, 0x1101, ItemTypeId::PackageId, true),
    ("SourceTrackID", SOURCE_CLIP, SOURCE_CLIP_SOURCE_TRACK_ID, 0x1102, ItemTypeId::UInt32, true),
    ("Locators", GENERIC_DESCRIPTOR, DESCRIPTOR_LOCATORS, 0x2f01, ItemTypeId::StrongRefArray, false),
    ("LinkedTrackID", FILE_DESCRIPTOR, FILE_DESCRIPTOR_LINKED_TRACK_ID, 0x3006, ItemTypeId::UInt32, false),
    ("SampleRate", FILE_DESCRIPTOR, FILE_DESCRIPTOR_SAMPLE_RATE, 0x3001, ItemTypeId::Rational, true),
    ("ContainerDuration", FILE_DESCRIPTOR, FILE_DESCRIPTOR_CONTAINER_DURATION, 0x3002, ItemTypeId::Length, false),
    ("EssenceContainer", FILE_DESCRIPTOR, FILE_DESCRIPTOR_ESSENCE_CONTAINER, 0x3004, ItemTypeId::Ul, true),
    ("Name", TAGGED_VALUE, TAGGED_VALUE_NAME, 0x5001, ItemTypeId::Utf16String, true),
    ("Value", TAGGED_VALUE, TAGGED_VALUE_VALUE, 0x5003, ItemTypeId::Indirect, true),
];

/// Register the baseline set and item definitions.
pub fn register_baseline(model: &mut DataModel) -> Result<()> {
    for &(name, parent, key) in SET_DEFS {
        model.register_set_def(name, parent, key)?;
    }
    for &(name, set_key, key, tag, type_id, required) in ITEM_DEFS {
        model.register_item_def(name, set_key, key, tag, type_id, required)?;
    }
    Ok(())
}

impl DataModel {
    /// Create a data model with the baseline structural schema registered.
    pub fn baseline() -> Result<Self> {
        let mut model = Self::new();
        register_baseline(&mut model)?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_is_consistent() {
        let model = DataModel::baseline().unwrap();
        assert!(model.check().is_empty(), "{:?}", model.check());
        assert_eq!(model.set_defs().count(), SET_DEFS.len());
    }

    #[test]
    fn test_baseline_hierarchy() {
        let model = DataModel::baseline().unwrap();
        assert!(model.is_subclass_of(&MATERIAL_PACKAGE, &GENERIC_PACKAGE));
        assert!(model.is_subclass_of(&SOURCE_CLIP, &INTERCHANGE_OBJECT));
        assert!(!model.is_subclass_of(&SOURCE_CLIP, &GENERIC_PACKAGE));

        let track = model.find_set_def(&TRACK).unwrap();
        let instance = model.find_item_def_in_set_def(&INSTANCE_UID, track).unwrap();
        assert_eq!(instance.local_tag, 0x3c0a);
        assert!(instance.required);
        let sequence = model.find_item_def_in_set_def(&TRACK_SEQUENCE, track).unwrap();
        assert_eq!(sequence.type_id, ItemTypeId::StrongRef);
    }
}
