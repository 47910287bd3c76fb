//! Primitive MXF wire types and their fixed big-endian encodings.
//!
//! Every type that can live in a metadata item implements [`WireType`]. Types
//! with a single fixed encoded size also implement [`FixedWire`], which lets
//! them be used as array/batch elements.

use std::fmt;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::writer::Writer;

/// A 16-byte SMPTE universal label.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Ul(pub [u8; 16]);

impl Ul {
    /// Create from raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Check if every byte is zero.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == [0; 16]
    }

    /// Get the version byte (offset 7).
    #[must_use]
    pub fn version(&self) -> u8 {
        self.0[7]
    }

    /// Compare two labels ignoring the version byte.
    #[must_use]
    pub fn eq_ignoring_version(&self, other: &Ul) -> bool {
        self.0[..7] == other.0[..7] && self.0[8..] == other.0[8..]
    }
}

impl fmt::Display for Ul {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Ul {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ul({self})")
    }
}

/// A 32-byte SMPTE unique material identifier (basic UMID).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Umid(pub [u8; 32]);

impl Umid {
    /// Get raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if every byte is zero.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == [0; 32]
    }
}

impl fmt::Debug for Umid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Umid(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        f.write_str(")")
    }
}

/// A value with a defined MXF byte encoding.
pub trait WireType: Sized {
    /// Name used in type mismatch errors.
    const NAME: &'static str;

    /// Decode from the complete item value.
    fn decode(bytes: &[u8]) -> Result<Self>;

    /// Append the encoding to a writer.
    fn encode_to(&self, writer: &mut Writer);

    /// Encode into a fresh buffer.
    fn encode(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.encode_to(&mut writer);
        writer.into_inner()
    }
}

/// A wire type with exactly one encoded size.
pub trait FixedWire: WireType {
    /// Encoded size in bytes.
    const LEN: usize;
}

fn exact<const N: usize>(bytes: &[u8], type_name: &'static str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| Error::TypeMismatch {
        type_name,
        actual: bytes.len(),
    })
}

fn expect_len(bytes: &[u8], len: usize, type_name: &'static str) -> Result<()> {
    if bytes.len() == len {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            type_name,
            actual: bytes.len(),
        })
    }
}

macro_rules! int_wire_types {
    ($($ty:ty => $name:literal, $len:literal;)*) => {
        $(
            impl WireType for $ty {
                const NAME: &'static str = $name;

                fn decode(bytes: &[u8]) -> Result<Self> {
                    exact::<$len>(bytes, Self::NAME).map(<$ty>::from_be_bytes)
                }

                fn encode_to(&self, writer: &mut Writer) {
                    writer.write_bytes(&self.to_be_bytes());
                }
            }

            impl FixedWire for $ty {
                const LEN: usize = $len;
            }
        )*
    };
}

int_wire_types! {
    u8 => "UInt8", 1;
    u16 => "UInt16", 2;
    u32 => "UInt32", 4;
    u64 => "UInt64", 8;
    i8 => "Int8", 1;
    i16 => "Int16", 2;
    i32 => "Int32", 4;
    i64 => "Int64", 8;
}

impl WireType for bool {
    const NAME: &'static str = "Boolean";

    fn decode(bytes: &[u8]) -> Result<Self> {
        exact::<1>(bytes, Self::NAME).map(|b| b[0] != 0)
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_u8(u8::from(*self));
    }
}

impl FixedWire for bool {
    const LEN: usize = 1;
}

impl WireType for Uuid {
    const NAME: &'static str = "UUID";

    fn decode(bytes: &[u8]) -> Result<Self> {
        exact::<16>(bytes, Self::NAME).map(Uuid::from_bytes)
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_uuid(self);
    }
}

impl FixedWire for Uuid {
    const LEN: usize = 16;
}

impl WireType for Ul {
    const NAME: &'static str = "UL";

    fn decode(bytes: &[u8]) -> Result<Self> {
        exact::<16>(bytes, Self::NAME).map(Ul)
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_ul(self);
    }
}

impl FixedWire for Ul {
    const LEN: usize = 16;
}

impl WireType for Umid {
    const NAME: &'static str = "UMID";

    fn decode(bytes: &[u8]) -> Result<Self> {
        exact::<32>(bytes, Self::NAME).map(Umid)
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_umid(self);
    }
}

impl FixedWire for Umid {
    const LEN: usize = 32;
}

/// A rational number (numerator, denominator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rational {
    pub numerator: i32,
    pub denominator: i32,
}

impl Rational {
    #[must_use]
    pub const fn new(numerator: i32, denominator: i32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

impl WireType for Rational {
    const NAME: &'static str = "Rational";

    fn decode(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, Self::LEN, Self::NAME)?;
        let mut reader = Reader::new(bytes);
        Ok(Self {
            numerator: reader.read_i32()?,
            denominator: reader.read_i32()?,
        })
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_i32(self.numerator);
        writer.write_i32(self.denominator);
    }
}

impl FixedWire for Rational {
    const LEN: usize = 8;
}

/// A date and time with quarter-millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Timestamp {
    pub year: i16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub min: u8,
    pub sec: u8,
    /// Quarter milliseconds (0..=249).
    pub qmsec: u8,
}

impl WireType for Timestamp {
    const NAME: &'static str = "Timestamp";

    fn decode(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, Self::LEN, Self::NAME)?;
        let mut reader = Reader::new(bytes);
        Ok(Self {
            year: reader.read_i16()?,
            month: reader.read_u8()?,
            day: reader.read_u8()?,
            hour: reader.read_u8()?,
            min: reader.read_u8()?,
            sec: reader.read_u8()?,
            qmsec: reader.read_u8()?,
        })
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_i16(self.year);
        writer.write_bytes(&[
            self.month, self.day, self.hour, self.min, self.sec, self.qmsec,
        ]);
    }
}

impl FixedWire for Timestamp {
    const LEN: usize = 8;
}

/// Product version: five u16 fields.
///
/// Some Avid files store `release` as a single byte, giving a 9-byte value;
/// decoding accepts both forms, encoding always produces the 10-byte form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProductVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub build: u16,
    pub release: u16,
}

impl WireType for ProductVersion {
    const NAME: &'static str = "ProductVersion";

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 10 && bytes.len() != 9 {
            return Err(Error::TypeMismatch {
                type_name: Self::NAME,
                actual: bytes.len(),
            });
        }
        let mut reader = Reader::new(bytes);
        let major = reader.read_u16()?;
        let minor = reader.read_u16()?;
        let patch = reader.read_u16()?;
        let build = reader.read_u16()?;
        let release = if bytes.len() == 9 {
            u16::from(reader.read_u8()?)
        } else {
            reader.read_u16()?
        };
        Ok(Self {
            major,
            minor,
            patch,
            build,
            release,
        })
    }

    fn encode_to(&self, writer: &mut Writer) {
        for field in [self.major, self.minor, self.patch, self.build, self.release] {
            writer.write_u16(field);
        }
    }
}

impl FixedWire for ProductVersion {
    const LEN: usize = 10;
}

/// One component of an RGBA layout: a component code and its bit depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RgbaLayoutComponent {
    pub code: u8,
    pub depth: u8,
}

impl WireType for RgbaLayoutComponent {
    const NAME: &'static str = "RGBALayoutComponent";

    fn decode(bytes: &[u8]) -> Result<Self> {
        let [code, depth] = exact::<2>(bytes, Self::NAME)?;
        Ok(Self { code, depth })
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_u8(self.code);
        writer.write_u8(self.depth);
    }
}

impl FixedWire for RgbaLayoutComponent {
    const LEN: usize = 2;
}

/// Pixel layout: eight components, unused ones have code 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RgbaLayout(pub [RgbaLayoutComponent; 8]);

impl WireType for RgbaLayout {
    const NAME: &'static str = "RGBALayout";

    fn decode(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, Self::LEN, Self::NAME)?;
        let mut layout = [RgbaLayoutComponent::default(); 8];
        for (component, chunk) in layout.iter_mut().zip(bytes.chunks_exact(2)) {
            *component = RgbaLayoutComponent::decode(chunk)?;
        }
        Ok(Self(layout))
    }

    fn encode_to(&self, writer: &mut Writer) {
        for component in &self.0 {
            component.encode_to(writer);
        }
    }
}

impl FixedWire for RgbaLayout {
    const LEN: usize = 16;
}

/// A CIE colour primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorPrimary {
    pub x: u16,
    pub y: u16,
}

impl WireType for ColorPrimary {
    const NAME: &'static str = "ColorPrimary";

    fn decode(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, Self::LEN, Self::NAME)?;
        let mut reader = Reader::new(bytes);
        Ok(Self {
            x: reader.read_u16()?,
            y: reader.read_u16()?,
        })
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_u16(self.x);
        writer.write_u16(self.y);
    }
}

impl FixedWire for ColorPrimary {
    const LEN: usize = 4;
}

/// The three display primaries of a mastering display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ThreeColorPrimaries(pub [ColorPrimary; 3]);

impl WireType for ThreeColorPrimaries {
    const NAME: &'static str = "ThreeColorPrimaries";

    fn decode(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, Self::LEN, Self::NAME)?;
        let mut primaries = [ColorPrimary::default(); 3];
        for (primary, chunk) in primaries.iter_mut().zip(bytes.chunks_exact(4)) {
            *primary = ColorPrimary::decode(chunk)?;
        }
        Ok(Self(primaries))
    }

    fn encode_to(&self, writer: &mut Writer) {
        for primary in &self.0 {
            primary.encode_to(writer);
        }
    }
}

impl FixedWire for ThreeColorPrimaries {
    const LEN: usize = 12;
}

/// JPEG 2000 component sizing (Ssiz, XRsiz, YRsiz).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct J2kComponentSizing {
    pub ssiz: u8,
    pub xrsiz: u8,
    pub yrsiz: u8,
}

impl WireType for J2kComponentSizing {
    const NAME: &'static str = "J2KComponentSizing";

    fn decode(bytes: &[u8]) -> Result<Self> {
        let [ssiz, xrsiz, yrsiz] = exact::<3>(bytes, Self::NAME)?;
        Ok(Self { ssiz, xrsiz, yrsiz })
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_bytes(&[self.ssiz, self.xrsiz, self.yrsiz]);
    }
}

impl FixedWire for J2kComponentSizing {
    const LEN: usize = 3;
}

/// JPEG 2000 extended capabilities: `p_cap` followed by one `c_cap` per set bit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct J2kExtendedCapabilities {
    pub p_cap: u32,
    pub c_cap: Vec<u16>,
}

impl WireType for J2kExtendedCapabilities {
    const NAME: &'static str = "J2KExtendedCapabilities";

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mismatch = || Error::TypeMismatch {
            type_name: Self::NAME,
            actual: bytes.len(),
        };
        let mut reader = Reader::new(bytes);
        let p_cap = reader.read_u32().map_err(|_| mismatch())?;
        let count = p_cap.count_ones() as usize;
        if reader.remaining() != count * 2 {
            return Err(mismatch());
        }
        let c_cap = (0..count)
            .map(|_| reader.read_u16())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { p_cap, c_cap })
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_u32(self.p_cap);
        for value in &self.c_cap {
            writer.write_u16(*value);
        }
    }
}

/// Video line map: the first line of each field, stored as a two element i32 array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VideoLineMap {
    pub first: i32,
    pub second: i32,
}

impl WireType for VideoLineMap {
    const NAME: &'static str = "VideoLineMap";

    fn decode(bytes: &[u8]) -> Result<Self> {
        expect_len(bytes, 16, Self::NAME)?;
        let mut reader = Reader::new(bytes);
        if reader.read_array_header()? != (2, 4) {
            return Err(Error::MalformedArray(
                "video line map must hold two 4-byte elements".into(),
            ));
        }
        Ok(Self {
            first: reader.read_i32()?,
            second: reader.read_i32()?,
        })
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_array_header(2, 4);
        writer.write_i32(self.first);
        writer.write_i32(self.second);
    }
}
