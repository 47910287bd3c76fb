//! Typed view of item values.
//!
//! [`ItemValue`] decodes an item's bytes according to the type declared by its
//! item definition. Types without a dedicated decoder come back as
//! [`ItemValue::Raw`], so every value can be inspected and written back.

use uuid::Uuid;

use crate::error::Result;
use crate::indirect::Indirect;
use crate::item::{decode_array, encode_array};
use crate::model::{DataModel, ItemTypeId, RefKind, TypeCategory};
use crate::strings;
use crate::types::{
    ColorPrimary, J2kComponentSizing, J2kExtendedCapabilities, ProductVersion, Rational,
    RgbaLayout, RgbaLayoutComponent, ThreeColorPrimaries, Timestamp, Ul, Umid, WireType,
};

/// A decoded item value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Boolean(bool),
    Rational(Rational),
    Timestamp(Timestamp),
    ProductVersion(ProductVersion),
    Ul(Ul),
    Uuid(Uuid),
    Umid(Umid),
    Utf16String(String),
    Utf8String(String),
    Iso7String(String),
    Utf16StringArray(Vec<String>),
    StrongRef(Uuid),
    WeakRef(Uuid),
    StrongRefArray(Vec<Uuid>),
    WeakRefArray(Vec<Uuid>),
    UlArray(Vec<Ul>),
    UuidArray(Vec<Uuid>),
    Int8Array(Vec<i8>),
    Int16Array(Vec<i16>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    UInt8Array(Vec<u8>),
    UInt16Array(Vec<u16>),
    UInt32Array(Vec<u32>),
    UInt64Array(Vec<u64>),
    RationalArray(Vec<Rational>),
    Indirect(Indirect),
    RgbaLayoutComponent(RgbaLayoutComponent),
    RgbaLayout(RgbaLayout),
    ColorPrimary(ColorPrimary),
    ThreeColorPrimaries(ThreeColorPrimaries),
    J2kComponentSizing(J2kComponentSizing),
    J2kComponentSizingArray(Vec<J2kComponentSizing>),
    J2kExtendedCapabilities(J2kExtendedCapabilities),
    /// Bytes of a type without a dedicated decoder.
    Raw(Vec<u8>),
}

impl ItemValue {
    /// Decode value bytes as the given item type.
    pub fn decode(model: &DataModel, type_id: ItemTypeId, bytes: &[u8]) -> Result<Self> {
        use ItemTypeId as T;

        let value = match type_id {
            T::Int8 => Self::Int8(i8::decode(bytes)?),
            T::Int16 => Self::Int16(i16::decode(bytes)?),
            T::Int32 => Self::Int32(i32::decode(bytes)?),
            T::Int64 | T::Length | T::Position => Self::Int64(i64::decode(bytes)?),
            T::UInt8 | T::Utf8 | T::Iso7 | T::RgbaCode | T::Orientation | T::CodedContentType => {
                Self::UInt8(u8::decode(bytes)?)
            }
            T::UInt16 | T::VersionType | T::Utf16 => Self::UInt16(u16::decode(bytes)?),
            T::UInt32 => Self::UInt32(u32::decode(bytes)?),
            T::UInt64 => Self::UInt64(u64::decode(bytes)?),
            T::Boolean => Self::Boolean(bool::decode(bytes)?),
            T::Rational => Self::Rational(Rational::decode(bytes)?),
            T::Timestamp => Self::Timestamp(Timestamp::decode(bytes)?),
            T::ProductVersion => Self::ProductVersion(ProductVersion::decode(bytes)?),
            T::Ul | T::Auid => Self::Ul(Ul::decode(bytes)?),
            T::Uuid | T::Uid => Self::Uuid(Uuid::decode(bytes)?),
            T::Umid | T::PackageId => Self::Umid(Umid::decode(bytes)?),
            T::Utf16String => Self::Utf16String(strings::decode_utf16(bytes)?),
            T::Utf8String => Self::Utf8String(strings::decode_utf8(bytes)?),
            T::Iso7String => Self::Iso7String(strings::decode_iso7(bytes)),
            T::Utf16StringArray => Self::Utf16StringArray(strings::decode_utf16_array(bytes)?),
            T::StrongRef => Self::StrongRef(Uuid::decode(bytes)?),
            T::WeakRef => Self::WeakRef(Uuid::decode(bytes)?),
            T::StrongRefArray | T::StrongRefBatch => Self::StrongRefArray(decode_array(bytes)?),
            T::WeakRefArray | T::WeakRefBatch => Self::WeakRefArray(decode_array(bytes)?),
            T::AuidArray | T::UlArray | T::UlBatch => Self::UlArray(decode_array(bytes)?),
            T::UuidArray | T::UuidBatch => Self::UuidArray(decode_array(bytes)?),
            T::Int8Array | T::Int8Batch => Self::Int8Array(decode_array(bytes)?),
            T::Int16Array | T::Int16Batch => Self::Int16Array(decode_array(bytes)?),
            T::Int32Array | T::Int32Batch => Self::Int32Array(decode_array(bytes)?),
            T::Int64Array | T::Int64Batch => Self::Int64Array(decode_array(bytes)?),
            T::UInt8Array | T::UInt8Batch => Self::UInt8Array(decode_array(bytes)?),
            T::UInt16Array | T::UInt16Batch => Self::UInt16Array(decode_array(bytes)?),
            T::UInt32Array | T::UInt32Batch => Self::UInt32Array(decode_array(bytes)?),
            T::UInt64Array | T::UInt64Batch => Self::UInt64Array(decode_array(bytes)?),
            T::RationalArray => Self::RationalArray(decode_array(bytes)?),
            T::Indirect => Self::Indirect(Indirect::decode(bytes)?),
            T::RgbaLayoutComponent => {
                Self::RgbaLayoutComponent(RgbaLayoutComponent::decode(bytes)?)
            }
            T::RgbaLayout => Self::RgbaLayout(RgbaLayout::decode(bytes)?),
            T::ColorPrimary => Self::ColorPrimary(ColorPrimary::decode(bytes)?),
            T::ThreeColorPrimaries => {
                Self::ThreeColorPrimaries(ThreeColorPrimaries::decode(bytes)?)
            }
            T::J2kComponentSizing => Self::J2kComponentSizing(J2kComponentSizing::decode(bytes)?),
            T::J2kComponentSizingArray => Self::J2kComponentSizingArray(decode_array(bytes)?),
            T::J2kExtendedCapabilities => {
                Self::J2kExtendedCapabilities(J2kExtendedCapabilities::decode(bytes)?)
            }
            T::Raw
            | T::Stream
            | T::DataValue
            | T::Identifier
            | T::Opaque
            | T::Aes3FixedData
            | T::Aes3FixedDataArray => Self::Raw(bytes.to_vec()),
            T::Extension(_) => return Self::decode_extension(model, type_id, bytes),
        };
        Ok(value)
    }

    fn decode_extension(model: &DataModel, type_id: ItemTypeId, bytes: &[u8]) -> Result<Self> {
        match model.ref_kind(type_id) {
            Some(RefKind::Strong) => return Ok(Self::StrongRef(Uuid::decode(bytes)?)),
            Some(RefKind::Weak) => return Ok(Self::WeakRef(Uuid::decode(bytes)?)),
            Some(RefKind::StrongArray) => return Ok(Self::StrongRefArray(decode_array(bytes)?)),
            Some(RefKind::WeakArray) => return Ok(Self::WeakRefArray(decode_array(bytes)?)),
            None => {}
        }
        match model.find_item_type(type_id).map(|t| &t.category) {
            Some(TypeCategory::Interpret { base, .. }) => Self::decode(model, *base, bytes),
            _ => Ok(Self::Raw(bytes.to_vec())),
        }
    }

    /// Encode back to value bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::Int8(v) => v.encode(),
            Self::Int16(v) => v.encode(),
            Self::Int32(v) => v.encode(),
            Self::Int64(v) => v.encode(),
            Self::UInt8(v) => v.encode(),
            Self::UInt16(v) => v.encode(),
            Self::UInt32(v) => v.encode(),
            Self::UInt64(v) => v.encode(),
            Self::Boolean(v) => v.encode(),
            Self::Rational(v) => v.encode(),
            Self::Timestamp(v) => v.encode(),
            Self::ProductVersion(v) => v.encode(),
            Self::Ul(v) => v.encode(),
            Self::Uuid(v) | Self::StrongRef(v) | Self::WeakRef(v) => v.encode(),
            Self::Umid(v) => v.encode(),
            Self::Utf16String(s) => strings::encode_utf16(s),
            Self::Utf8String(s) => strings::encode_utf8(s),
            Self::Iso7String(s) => strings::encode_iso7(s),
            Self::Utf16StringArray(v) => strings::encode_utf16_array(v),
            Self::StrongRefArray(v) | Self::WeakRefArray(v) | Self::UuidArray(v) => {
                encode_array(v)?
            }
            Self::UlArray(v) => encode_array(v)?,
            Self::Int8Array(v) => encode_array(v)?,
            Self::Int16Array(v) => encode_array(v)?,
            Self::Int32Array(v) => encode_array(v)?,
            Self::Int64Array(v) => encode_array(v)?,
            Self::UInt8Array(v) => encode_array(v)?,
            Self::UInt16Array(v) => encode_array(v)?,
            Self::UInt32Array(v) => encode_array(v)?,
            Self::UInt64Array(v) => encode_array(v)?,
            Self::RationalArray(v) => encode_array(v)?,
            Self::Indirect(v) => v.encode(),
            Self::RgbaLayoutComponent(v) => v.encode(),
            Self::RgbaLayout(v) => v.encode(),
            Self::ColorPrimary(v) => v.encode(),
            Self::ThreeColorPrimaries(v) => v.encode(),
            Self::J2kComponentSizing(v) => v.encode(),
            Self::J2kComponentSizingArray(v) => encode_array(v)?,
            Self::J2kExtendedCapabilities(v) => v.encode(),
            Self::Raw(bytes) => bytes.clone(),
        };
        Ok(bytes)
    }

    /// Referenced instance UIDs, for reference values.
    #[must_use]
    pub fn references(&self) -> &[Uuid] {
        match self {
            Self::StrongRef(uid) | Self::WeakRef(uid) => std::slice::from_ref(uid),
            Self::StrongRefArray(uids) | Self::WeakRefArray(uids) => uids,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_decode_by_type() {
        let model = DataModel::new();
        assert_eq!(
            ItemValue::decode(&model, ItemTypeId::VersionType, &[0x01, 0x02]).unwrap(),
            ItemValue::UInt16(0x0102)
        );
        assert_eq!(
            ItemValue::decode(&model, ItemTypeId::Position, &(-1i64).to_be_bytes()).unwrap(),
            ItemValue::Int64(-1)
        );
        assert_eq!(
            ItemValue::decode(&model, ItemTypeId::Utf16String, &[0, b'a', 0, b'b', 0, 0]).unwrap(),
            ItemValue::Utf16String("ab".into())
        );
        assert_eq!(
            ItemValue::decode(&model, ItemTypeId::Opaque, &[1, 2, 3]).unwrap(),
            ItemValue::Raw(vec![1, 2, 3])
        );
        assert!(matches!(
            ItemValue::decode(&model, ItemTypeId::UInt32, &[1, 2]),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_reference_arrays() {
        let model = DataModel::new();
        let uids = vec![Uuid::from_u128(1), Uuid::from_u128(2)];
        let bytes = ItemValue::StrongRefArray(uids.clone()).encode().unwrap();
        assert_eq!(bytes.len(), 8 + 32);
        let value = ItemValue::decode(&model, ItemTypeId::StrongRefBatch, &bytes).unwrap();
        assert_eq!(value.references(), uids.as_slice());
        assert!(ItemValue::UInt8(1).references().is_empty());
    }

    #[test]
    fn test_extension_types() {
        let mut model = DataModel::new();
        model
            .register_interpret_type("Counter", ItemTypeId::Extension(1), ItemTypeId::UInt32, 0)
            .unwrap();
        model
            .register_array_type("RefSet", ItemTypeId::Extension(2), ItemTypeId::StrongRef, 0)
            .unwrap();
        assert_eq!(
            ItemValue::decode(&model, ItemTypeId::Extension(1), &[0, 0, 0, 7]).unwrap(),
            ItemValue::UInt32(7)
        );
        let refs = ItemValue::StrongRefArray(vec![Uuid::from_u128(9)]).encode().unwrap();
        assert_eq!(
            ItemValue::decode(&model, ItemTypeId::Extension(2), &refs).unwrap(),
            ItemValue::StrongRefArray(vec![Uuid::from_u128(9)])
        );
        assert_eq!(
            ItemValue::decode(&model, ItemTypeId::Extension(3), &[5]).unwrap(),
            ItemValue::Raw(vec![5])
        );
    }
}
