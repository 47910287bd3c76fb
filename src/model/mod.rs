//! Header metadata schema: set and item definitions and item types.

pub mod baseline;
mod data_model;
mod item_type;

pub use data_model::{DataModel, ItemDef, SetDef, SetDefChain};
pub use item_type::{
    CompoundMember, ItemType, ItemTypeId, LengthRule, MAX_COMPOUND_MEMBERS, RefKind, TypeCategory,
    builtin_types,
};
