//! # mxfmeta
//!
//! MXF header metadata library with data-model driven read/write support.
//!
//! This crate reads, builds, validates and writes the header metadata of MXF
//! files: the primer pack and the graph of local sets that follows it. Which
//! sets and items exist is described by a [`DataModel`], built once from the
//! SMPTE baseline plus any extension schemas and shared between instances.
//! Partition framing and essence are left to the caller, who hands the engine
//! a byte stream and the header byte count.
//!
//! ## Features
//!
//! - KLV framing with BER lengths, fill KLVs and fixed-width length fields
//! - Data model registry with set inheritance and an item type registry
//! - Primer pack with static and dynamically allocated local tags
//! - Typed item access, array/batch helpers and a tagged value view
//! - Strong/weak reference resolution by InstanceUID
//! - Forward compatible reading: unknown sets and items are skipped
//! - Validation of item lengths and required items
//! - Deep cloning of set graphs between header metadata instances
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mxfmeta::{DataModel, HeaderMetadata, baseline};
//!
//! let model = Arc::new(DataModel::baseline()?);
//!
//! let mut header = HeaderMetadata::new(Arc::clone(&model));
//! header.create_set(baseline::PREFACE)?.set_u16(&baseline::PREFACE_VERSION, 0x0102)?;
//!
//! let mut bytes = Vec::new();
//! let header_byte_count = header.write(&mut bytes)?;
//!
//! let read = HeaderMetadata::read_from(model, &mut bytes.as_slice(), header_byte_count)?;
//! let preface = read.find_singular_set_by_key(&baseline::PREFACE)?;
//! assert_eq!(preface.get_u16(&baseline::PREFACE_VERSION)?, 0x0102);
//! ```

pub mod error;
pub mod header;
pub mod indirect;
pub mod item;
pub mod klv;
pub mod model;
pub mod primer;
pub mod reader;
pub mod set;
pub mod strings;
pub mod types;
pub mod value;
pub mod writer;

// Re-export main types
pub use error::{Error, ErrorKind, Result};
pub use header::{HeaderMetadata, ReadFilter, SetCursor, WriteOptions};
pub use item::{ArrayElements, MetadataItem};
pub use klv::Kl;
pub use primer::{PrimerEntry, PrimerPack};
pub use set::MetadataSet;
pub use value::ItemValue;

// Re-export the schema
pub use model::{DataModel, ItemDef, ItemTypeId, SetDef, baseline};

// Re-export wire types
pub use types::{
    ColorPrimary, FixedWire, J2kComponentSizing, J2kExtendedCapabilities, ProductVersion,
    Rational, RgbaLayout, RgbaLayoutComponent, ThreeColorPrimaries, Timestamp, Ul, Umid,
    VideoLineMap, WireType,
};
pub use uuid::Uuid;
