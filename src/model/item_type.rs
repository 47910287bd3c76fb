//! Item type identifiers, categories and validation length rules.

use std::fmt;

/// Identifier of an item's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemTypeId {
    // Basic
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Raw,

    // Array
    Utf16String,
    Utf16StringArray,
    Utf8String,
    Int8Array,
    Int16Array,
    Int32Array,
    Int64Array,
    UInt8Array,
    UInt16Array,
    UInt32Array,
    UInt64Array,
    Iso7String,
    Int8Batch,
    Int16Batch,
    Int32Batch,
    Int64Batch,
    UInt8Batch,
    UInt16Batch,
    UInt32Batch,
    UInt64Batch,
    AuidArray,
    UlArray,
    UlBatch,
    UuidArray,
    UuidBatch,
    StrongRefArray,
    StrongRefBatch,
    WeakRefArray,
    WeakRefBatch,
    RationalArray,
    RgbaLayout,
    Aes3FixedDataArray,
    J2kComponentSizingArray,
    ThreeColorPrimaries,

    // Compound
    Rational,
    Timestamp,
    ProductVersion,
    Indirect,
    RgbaLayoutComponent,
    J2kComponentSizing,
    ColorPrimary,

    // Interpret
    VersionType,
    Utf16,
    Utf8,
    Boolean,
    Iso7,
    Length,
    Position,
    RgbaCode,
    Stream,
    DataValue,
    Identifier,
    Opaque,
    Umid,
    Uid,
    Ul,
    Uuid,
    Auid,
    PackageId,
    StrongRef,
    WeakRef,
    Orientation,
    CodedContentType,
    Aes3FixedData,
    J2kExtendedCapabilities,

    /// A type registered by an extension schema.
    Extension(u32),
}

impl fmt::Display for ItemTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension(id) => write!(f, "Extension({id})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A member of a compound type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundMember {
    pub name: String,
    pub type_id: ItemTypeId,
}

/// How a type is built from other types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCategory {
    /// Fixed size integer or raw bytes (`size` 0 means variable).
    Basic { size: u8 },
    /// Homogeneous sequence; `fixed_size` 0 means variable.
    ///
    /// Variable arrays of character types are strings without a header, all
    /// other variable arrays carry an 8-byte count/length header.
    Array { element: ItemTypeId, fixed_size: u32 },
    /// Ordered members, at most [`MAX_COMPOUND_MEMBERS`].
    Compound { members: Vec<CompoundMember> },
    /// A new interpretation of another type.
    Interpret {
        base: ItemTypeId,
        fixed_array_size: u32,
    },
}

/// Maximum number of members in a compound type.
pub const MAX_COMPOUND_MEMBERS: usize = 15;

/// A registered item type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemType {
    pub id: ItemTypeId,
    pub name: String,
    pub category: TypeCategory,
}

/// Byte length constraint applied when validating an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthRule {
    /// Any length.
    Unchecked,
    /// Exactly this many bytes.
    Exact(usize),
    /// An 8-byte array header followed by elements; when known, the element
    /// length must divide the remainder.
    Array { element_len: Option<usize> },
    /// At least 17 bytes starting with a byte order marker.
    Indirect,
}

/// Whether a type holds references to other sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// A single strong reference.
    Strong,
    /// An array or batch of strong references.
    StrongArray,
    /// A single weak reference.
    Weak,
    /// An array or batch of weak references.
    WeakArray,
}

impl RefKind {
    /// Check for a strong (owning) reference.
    #[must_use]
    pub fn is_strong(self) -> bool {
        matches!(self, Self::Strong | Self::StrongArray)
    }
}

impl ItemTypeId {
    /// Length rule for built-in types, `None` for extension types.
    #[must_use]
    pub fn builtin_length_rule(self) -> Option<LengthRule> {
        use ItemTypeId::*;
        let rule = match self {
            Int8 | UInt8 | Utf8 | Boolean | Iso7 | RgbaCode | Orientation | CodedContentType => {
                LengthRule::Exact(1)
            }
            Int16 | UInt16 | VersionType | Utf16 | RgbaLayoutComponent => LengthRule::Exact(2),
            J2kComponentSizing => LengthRule::Exact(3),
            Int32 | UInt32 | ColorPrimary => LengthRule::Exact(4),
            Int64 | UInt64 | Rational | Timestamp | Length | Position => LengthRule::Exact(8),
            ProductVersion => LengthRule::Exact(10),
            ThreeColorPrimaries => LengthRule::Exact(12),
            RgbaLayout | Uid | Ul | Uuid | Auid | StrongRef | WeakRef => LengthRule::Exact(16),
            Umid | PackageId => LengthRule::Exact(32),
            Int8Array | UInt8Array | Int8Batch | UInt8Batch | Identifier | Aes3FixedDataArray => {
                LengthRule::Array { element_len: None }
            }
            Int16Array | UInt16Array | Int16Batch | UInt16Batch => {
                LengthRule::Array { element_len: Some(2) }
            }
            J2kComponentSizingArray => LengthRule::Array { element_len: Some(3) },
            Int32Array | UInt32Array | Int32Batch | UInt32Batch => {
                LengthRule::Array { element_len: Some(4) }
            }
            Int64Array | UInt64Array | Int64Batch | UInt64Batch | RationalArray => {
                LengthRule::Array { element_len: Some(8) }
            }
            AuidArray | UlArray | UlBatch | UuidArray | UuidBatch | StrongRefArray
            | StrongRefBatch | WeakRefArray | WeakRefBatch => {
                LengthRule::Array { element_len: Some(16) }
            }
            Indirect => LengthRule::Indirect,
            Raw | Utf16String | Utf16StringArray | Utf8String | Iso7String | Stream | DataValue
            | Opaque | Aes3FixedData | J2kExtendedCapabilities => LengthRule::Unchecked,
            Extension(_) => return None,
        };
        Some(rule)
    }

    /// Check for a character type (string arrays of these carry no header).
    #[must_use]
    pub fn is_character(self) -> bool {
        matches!(self, Self::Utf16 | Self::Utf8 | Self::Iso7)
    }
}

/// Definitions of the built-in types, registered into every data model.
#[must_use]
pub fn builtin_types() -> Vec<ItemType> {
    use ItemTypeId::*;

    fn basic(id: ItemTypeId, name: &str, size: u8) -> ItemType {
        ItemType {
            id,
            name: name.to_owned(),
            category: TypeCategory::Basic { size },
        }
    }
    fn array(id: ItemTypeId, name: &str, element: ItemTypeId, fixed_size: u32) -> ItemType {
        ItemType {
            id,
            name: name.to_owned(),
            category: TypeCategory::Array {
                element,
                fixed_size,
            },
        }
    }
    fn compound(id: ItemTypeId, name: &str, members: &[(&str, ItemTypeId)]) -> ItemType {
        ItemType {
            id,
            name: name.to_owned(),
            category: TypeCategory::Compound {
                members: members
                    .iter()
                    .map(|&(name, type_id)| CompoundMember {
                        name: name.to_owned(),
                        type_id,
                    })
                    .collect(),
            },
        }
    }
    fn interpret(id: ItemTypeId, name: &str, base: ItemTypeId, fixed_array_size: u32) -> ItemType {
        ItemType {
            id,
            name: name.to_owned(),
            category: TypeCategory::Interpret {
                base,
                fixed_array_size,
            },
        }
    }

    vec![
        basic(Int8, "Int8", 1),
        basic(Int16, "Int16", 2),
        basic(Int32, "Int32", 4),
        basic(Int64, "Int64", 8),
        basic(UInt8, "UInt8", 1),
        basic(UInt16, "UInt16", 2),
        basic(UInt32, "UInt32", 4),
        basic(UInt64, "UInt64", 8),
        basic(Raw, "Raw", 0),
        interpret(VersionType, "VersionType", UInt16, 0),
        interpret(Utf16, "UTF16", UInt16, 0),
        interpret(Utf8, "UTF8", UInt8, 0),
        interpret(Boolean, "Boolean", UInt8, 0),
        interpret(Iso7, "ISO7", UInt8, 0),
        interpret(Length, "Length", Int64, 0),
        interpret(Position, "Position", Int64, 0),
        interpret(RgbaCode, "RGBACode", UInt8, 0),
        interpret(Stream, "Stream", Raw, 0),
        interpret(DataValue, "DataValue", UInt8Array, 0),
        interpret(Identifier, "Identifier", UInt8Array, 0),
        interpret(Opaque, "Opaque", UInt8Array, 0),
        interpret(Umid, "UMID", UInt8Array, 32),
        interpret(Uid, "UID", UInt8Array, 16),
        interpret(Ul, "UL", UInt8Array, 16),
        interpret(Uuid, "UUID", UInt8Array, 16),
        interpret(Auid, "AUID", Ul, 16),
        interpret(PackageId, "PackageID", Umid, 32),
        interpret(StrongRef, "StrongRef", Uuid, 0),
        interpret(WeakRef, "WeakRef", Uuid, 0),
        interpret(Orientation, "Orientation", UInt8, 0),
        interpret(CodedContentType, "CodedContentType", UInt8, 0),
        interpret(Aes3FixedData, "AES3FixedData", UInt8Array, 24),
        interpret(J2kExtendedCapabilities, "J2KExtendedCapabilities", Raw, 0),
        compound(Rational, "Rational", &[("Numerator", Int32), ("Denominator", Int32)]),
        compound(
            Timestamp,
            "Timestamp",
            &[
                ("Year", Int16),
                ("Month", UInt8),
                ("Day", UInt8),
                ("Hour", UInt8),
                ("Minute", UInt8),
                ("Second", UInt8),
                ("QMSec", UInt8),
            ],
        ),
        compound(
            ProductVersion,
            "ProductVersion",
            &[
                ("Major", UInt16),
                ("Minor", UInt16),
                ("Patch", UInt16),
                ("Build", UInt16),
                ("Release", UInt16),
            ],
        ),
        compound(Indirect, "Indirect", &[("Type", Ul), ("Value", Raw)]),
        compound(RgbaLayoutComponent, "RGBALayoutComponent", &[("Code", RgbaCode), ("ComponentSize", UInt8)]),
        compound(
            J2kComponentSizing,
            "J2KComponentSizing",
            &[("Ssiz", UInt8), ("XRSiz", UInt8), ("YRSiz", UInt8)],
        ),
        compound(ColorPrimary, "ColorPrimary", &[("X", UInt16), ("Y", UInt16)]),
        array(Utf16String, "UTF16String", Utf16, 0),
        array(Utf16StringArray, "UTF16StringArray", Utf16String, 0),
        array(Utf8String, "UTF8String", Utf8, 0),
        array(Iso7String, "ISO7String", Iso7, 0),
        array(Int8Array, "Int8Array", Int8, 0),
        array(Int16Array, "Int16Array", Int16, 0),
        array(Int32Array, "Int32Array", Int32, 0),
        array(Int64Array, "Int64Array", Int64, 0),
        array(UInt8Array, "UInt8Array", UInt8, 0),
        array(UInt16Array, "UInt16Array", UInt16, 0),
        array(UInt32Array, "UInt32Array", UInt32, 0),
        array(UInt64Array, "UInt64Array", UInt64, 0),
        array(Int8Batch, "Int8Batch", Int8, 0),
        array(Int16Batch, "Int16Batch", Int16, 0),
        array(Int32Batch, "Int32Batch", Int32, 0),
        array(Int64Batch, "Int64Batch", Int64, 0),
        array(UInt8Batch, "UInt8Batch", UInt8, 0),
        array(UInt16Batch, "UInt16Batch", UInt16, 0),
        array(UInt32Batch, "UInt32Batch", UInt32, 0),
        array(UInt64Batch, "UInt64Batch", UInt64, 0),
        array(AuidArray, "AUIDArray", Auid, 0),
        array(UlArray, "ULArray", Ul, 0),
        array(UlBatch, "ULBatch", Ul, 0),
        array(UuidArray, "UUIDArray", Uuid, 0),
        array(UuidBatch, "UUIDBatch", Uuid, 0),
        array(StrongRefArray, "StrongRefArray", StrongRef, 0),
        array(StrongRefBatch, "StrongRefBatch", StrongRef, 0),
        array(WeakRefArray, "WeakRefArray", WeakRef, 0),
        array(WeakRefBatch, "WeakRefBatch", WeakRef, 0),
        array(RationalArray, "RationalArray", Rational, 0),
        array(RgbaLayout, "RGBALayout", RgbaLayoutComponent, 8),
        array(Aes3FixedDataArray, "AES3FixedDataArray", Aes3FixedData, 0),
        array(J2kComponentSizingArray, "J2KComponentSizingArray", J2kComponentSizing, 0),
        array(ThreeColorPrimaries, "ThreeColorPrimaries", ColorPrimary, 3),
    ]
}
