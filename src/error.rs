//! Error types for mxfmeta.

use thiserror::Error;
use uuid::Uuid;

use crate::types::Ul;

/// Result type alias for mxfmeta operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The underlying byte stream failed.
    Io,
    /// Malformed KLV framing, truncated values or bad indirect prefixes.
    Decode,
    /// An item's byte length does not fit the requested accessor.
    TypeMismatch,
    /// A set, item or type is unknown to (or conflicts within) the data model.
    Schema,
    /// The object graph is inconsistent.
    Graph,
    /// The primer pack ran out of dynamic local tags.
    Primer,
    /// A value cannot be represented on the wire.
    Encode,
    /// One or more validation checks failed.
    Validation,
}

/// Errors that can occur while reading, building or writing header metadata.
#[derive(Debug, Error)]
pub enum Error {
    /// Stream read or write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected end of data while reading an in-memory buffer.
    #[error("unexpected end of data at offset {offset}, needed {needed} bytes")]
    UnexpectedEof {
        /// Offset where the read was attempted.
        offset: usize,
        /// Number of bytes needed.
        needed: usize,
    },

    /// Invalid BER length encoding.
    #[error("invalid BER length: {0}")]
    InvalidBerLength(String),

    /// A KLV key other than the one required at this position.
    #[error("unexpected key {found}, expected {expected}")]
    UnexpectedKey {
        /// Key that was required.
        expected: Ul,
        /// Key that was found.
        found: Ul,
    },

    /// The header byte count is unusable.
    #[error("invalid header byte count {0}")]
    InvalidHeaderByteCount(u64),

    /// Bytes consumed while reading header metadata differ from the declared count.
    #[error("header byte count mismatch: expected {expected}, consumed {actual}")]
    HeaderByteCountMismatch {
        /// Declared header byte count.
        expected: u64,
        /// Bytes actually consumed.
        actual: u64,
    },

    /// A local set's items do not add up to its declared length.
    #[error("local set {key} is malformed: {reason}")]
    MalformedLocalSet {
        /// Key of the set being parsed.
        key: Ul,
        /// What went wrong.
        reason: String,
    },

    /// Invalid primer pack contents.
    #[error("invalid primer pack: {0}")]
    InvalidPrimerPack(String),

    /// Invalid array or batch header.
    #[error("malformed array: {0}")]
    MalformedArray(String),

    /// Invalid string value.
    #[error("invalid string value: {0}")]
    InvalidString(String),

    /// Invalid indirect value prefix or type.
    #[error("invalid indirect value: {0}")]
    InvalidIndirect(String),

    /// Byte length incompatible with the requested type.
    #[error("type mismatch: {type_name} cannot be decoded from {actual} bytes")]
    TypeMismatch {
        /// Name of the requested wire type.
        type_name: &'static str,
        /// Byte length of the stored value.
        actual: usize,
    },

    /// Set definition not registered in the data model.
    #[error("unknown set definition {0}")]
    UnknownSetDef(Ul),

    /// Item definition not registered (for the set, or at all).
    #[error("unknown item definition {0}")]
    UnknownItemDef(Ul),

    /// Item type not registered in the data model.
    #[error("unknown item type {0}")]
    UnknownItemType(String),

    /// Set definition registered twice.
    #[error("duplicate set definition {0}")]
    DuplicateSetDef(Ul),

    /// Item definition registered twice for the same set.
    #[error("duplicate item definition {item} in set {set}")]
    DuplicateItemDef {
        /// Set the item was registered under.
        set: Ul,
        /// Item key.
        item: Ul,
    },

    /// Item type registration rejected.
    #[error("invalid item type registration: {0}")]
    InvalidItemType(String),

    /// A recognised set lacks its InstanceUID item.
    #[error("set {0} has no InstanceUID item")]
    MissingInstanceUid(Ul),

    /// Attempt to attach or create a set with the null UUID.
    #[error("set {0} has a null InstanceUID")]
    NullInstanceUid(Ul),

    /// The item is maintained by the engine and cannot be set directly.
    #[error("item {0} cannot be modified directly")]
    ReadOnlyItem(Ul),

    /// A singular set lookup found no match.
    #[error("no set with key {0}")]
    MissingSet(Ul),

    /// A singular set lookup found more than one match.
    #[error("expected a single set with key {key}, found {count}")]
    AmbiguousSingularSet {
        /// Set key searched for.
        key: Ul,
        /// Number of matches.
        count: usize,
    },

    /// No set with the given InstanceUID.
    #[error("no set with InstanceUID {0}")]
    UnknownInstance(Uuid),

    /// Required item missing from a set.
    #[error("item {item} not present in set {set}")]
    MissingItem {
        /// Set key.
        set: Ul,
        /// Item key.
        item: Ul,
    },

    /// Dynamic local tags exhausted.
    #[error("primer pack has no free dynamic local tags")]
    PrimerExhausted,

    /// Length does not fit in a fixed BER length field.
    #[error("length {len} does not fit in a {llen}-byte BER length field")]
    LengthOverflow {
        /// Length to encode.
        len: u64,
        /// Width of the length field.
        llen: u8,
    },

    /// Item value longer than a local set item can carry.
    #[error("item {key} value of {len} bytes exceeds 65535")]
    ItemTooLarge {
        /// Item key.
        key: Ul,
        /// Requested length.
        len: usize,
    },

    /// A set does not fit its fixed space allocation.
    #[error("set {key} needs {required} bytes but only {allocated} are allocated")]
    FixedSpaceExceeded {
        /// Set key.
        key: Ul,
        /// Encoded size of the set.
        required: u64,
        /// Allocated size.
        allocated: u64,
    },

    /// Collected validation failures.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

impl Error {
    /// Get the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::UnexpectedEof { .. }
            | Self::InvalidBerLength(_)
            | Self::UnexpectedKey { .. }
            | Self::InvalidHeaderByteCount(_)
            | Self::HeaderByteCountMismatch { .. }
            | Self::MalformedLocalSet { .. }
            | Self::InvalidPrimerPack(_)
            | Self::MalformedArray(_)
            | Self::InvalidString(_)
            | Self::InvalidIndirect(_) => ErrorKind::Decode,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::UnknownSetDef(_)
            | Self::UnknownItemDef(_)
            | Self::UnknownItemType(_)
            | Self::DuplicateSetDef(_)
            | Self::DuplicateItemDef { .. }
            | Self::InvalidItemType(_) => ErrorKind::Schema,
            Self::MissingInstanceUid(_)
            | Self::NullInstanceUid(_)
            | Self::ReadOnlyItem(_)
            | Self::MissingSet(_)
            | Self::AmbiguousSingularSet { .. }
            | Self::UnknownInstance(_)
            | Self::MissingItem { .. } => ErrorKind::Graph,
            Self::PrimerExhausted => ErrorKind::Primer,
            Self::LengthOverflow { .. } | Self::ItemTooLarge { .. } | Self::FixedSpaceExceeded { .. } => {
                ErrorKind::Encode
            }
            Self::Validation(_) => ErrorKind::Validation,
        }
    }
}
