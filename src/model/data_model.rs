//! Registry of set and item definitions.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::item_type::{
    CompoundMember, ItemType, ItemTypeId, LengthRule, MAX_COMPOUND_MEMBERS, RefKind, TypeCategory,
    builtin_types,
};
use crate::types::Ul;

/// Definition of a set class.
#[derive(Debug, Clone)]
pub struct SetDef {
    pub name: String,
    pub key: Ul,
    /// Parent class, `None` for the root class.
    pub parent_key: Option<Ul>,
    item_defs: Vec<usize>,
    item_lookup: HashMap<Ul, usize>,
}

/// Definition of an item within a set class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDef {
    pub name: String,
    /// Set class the item was registered under.
    pub set_key: Ul,
    pub key: Ul,
    /// Default local tag, 0 for a dynamically allocated tag.
    pub local_tag: u16,
    pub type_id: ItemTypeId,
    pub required: bool,
}

/// Schema of set and item definitions with their item types.
///
/// Built once by registering definitions (base schema first, then extensions)
/// and then shared immutably, typically behind an `Arc`.
#[derive(Debug, Clone)]
pub struct DataModel {
    set_defs: Vec<SetDef>,
    set_index: HashMap<Ul, usize>,
    item_defs: Vec<ItemDef>,
    types: HashMap<ItemTypeId, ItemType>,
}

impl Default for DataModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DataModel {
    /// Create a data model holding only the built-in item types.
    #[must_use]
    pub fn new() -> Self {
        let types = builtin_types()
            .into_iter()
            .map(|item_type| (item_type.id, item_type))
            .collect();
        Self {
            set_defs: Vec::new(),
            set_index: HashMap::new(),
            item_defs: Vec::new(),
            types,
        }
    }

    // ==== Registration ====

    /// Register a set definition. The parent must already be registered.
    pub fn register_set_def(&mut self, name: &str, parent_key: Option<Ul>, key: Ul) -> Result<()> {
        if self.set_index.contains_key(&key) {
            return Err(Error::DuplicateSetDef(key));
        }
        if let Some(parent) = parent_key.filter(|p| !self.set_index.contains_key(p)) {
            return Err(Error::UnknownSetDef(parent));
        }
        self.set_index.insert(key, self.set_defs.len());
        self.set_defs.push(SetDef {
            name: name.to_owned(),
            key,
            parent_key,
            item_defs: Vec::new(),
            item_lookup: HashMap::new(),
        });
        Ok(())
    }

    /// Register an item definition under an existing set definition.
    pub fn register_item_def(
        &mut self,
        name: &str,
        set_key: Ul,
        key: Ul,
        local_tag: u16,
        type_id: ItemTypeId,
        required: bool,
    ) -> Result<()> {
        if !self.types.contains_key(&type_id) {
            return Err(Error::UnknownItemType(type_id.to_string()));
        }
        let set_idx = *self
            .set_index
            .get(&set_key)
            .ok_or(Error::UnknownSetDef(set_key))?;
        let item_idx = self.item_defs.len();
        let set_def = &mut self.set_defs[set_idx];
        if set_def.item_lookup.contains_key(&key) {
            return Err(Error::DuplicateItemDef {
                set: set_key,
                item: key,
            });
        }
        set_def.item_lookup.insert(key, item_idx);
        set_def.item_defs.push(item_idx);
        self.item_defs.push(ItemDef {
            name: name.to_owned(),
            set_key,
            key,
            local_tag,
            type_id,
            required,
        });
        Ok(())
    }

    fn register_type(&mut self, item_type: ItemType, referenced: &[ItemTypeId]) -> Result<()> {
        if !matches!(item_type.id, ItemTypeId::Extension(_)) {
            return Err(Error::InvalidItemType(format!(
                "{} is a built-in type id",
                item_type.id
            )));
        }
        if self.types.contains_key(&item_type.id) {
            return Err(Error::InvalidItemType(format!(
                "{} is already registered",
                item_type.id
            )));
        }
        if let Some(missing) = referenced.iter().find(|id| !self.types.contains_key(id)) {
            return Err(Error::UnknownItemType(missing.to_string()));
        }
        self.types.insert(item_type.id, item_type);
        Ok(())
    }

    /// Register an extension basic type.
    pub fn register_basic_type(&mut self, name: &str, id: ItemTypeId, size: u8) -> Result<()> {
        self.register_type(
            ItemType {
                id,
                name: name.to_owned(),
                category: TypeCategory::Basic { size },
            },
            &[],
        )
    }

    /// Register an extension array type.
    pub fn register_array_type(
        &mut self,
        name: &str,
        id: ItemTypeId,
        element: ItemTypeId,
        fixed_size: u32,
    ) -> Result<()> {
        self.register_type(
            ItemType {
                id,
                name: name.to_owned(),
                category: TypeCategory::Array {
                    element,
                    fixed_size,
                },
            },
            &[element],
        )
    }

    /// Register an extension compound type.
    pub fn register_compound_type(
        &mut self,
        name: &str,
        id: ItemTypeId,
        members: Vec<CompoundMember>,
    ) -> Result<()> {
        if members.is_empty() || members.len() > MAX_COMPOUND_MEMBERS {
            return Err(Error::InvalidItemType(format!(
                "compound type {name} has {} members",
                members.len()
            )));
        }
        let referenced: Vec<ItemTypeId> = members.iter().map(|m| m.type_id).collect();
        self.register_type(
            ItemType {
                id,
                name: name.to_owned(),
                category: TypeCategory::Compound { members },
            },
            &referenced,
        )
    }

    /// Register an extension interpret type.
    pub fn register_interpret_type(
        &mut self,
        name: &str,
        id: ItemTypeId,
        base: ItemTypeId,
        fixed_array_size: u32,
    ) -> Result<()> {
        self.register_type(
            ItemType {
                id,
                name: name.to_owned(),
                category: TypeCategory::Interpret {
                    base,
                    fixed_array_size,
                },
            },
            &[base],
        )
    }

    // ==== Lookup ====

    /// Find a set definition by key.
    #[must_use]
    pub fn find_set_def(&self, key: &Ul) -> Option<&SetDef> {
        self.set_index.get(key).map(|&idx| &self.set_defs[idx])
    }

    /// Get a set definition, failing if it is not registered.
    pub fn set_def(&self, key: &Ul) -> Result<&SetDef> {
        self.find_set_def(key).ok_or(Error::UnknownSetDef(*key))
    }

    /// Find the first item definition registered with this key, in any set.
    #[must_use]
    pub fn find_item_def(&self, key: &Ul) -> Option<&ItemDef> {
        self.item_defs.iter().find(|def| def.key == *key)
    }

    /// Get an item definition, failing if it is not registered.
    pub fn item_def(&self, key: &Ul) -> Result<&ItemDef> {
        self.find_item_def(key).ok_or(Error::UnknownItemDef(*key))
    }

    /// Find an item definition in a set definition or its ancestors.
    #[must_use]
    pub fn find_item_def_in_set_def(&self, item_key: &Ul, set_def: &SetDef) -> Option<&ItemDef> {
        self.set_def_chain(set_def)
            .find_map(|def| def.item_lookup.get(item_key))
            .map(|&idx| &self.item_defs[idx])
    }

    /// Item definitions declared directly on a set definition.
    pub fn item_defs_of<'a>(&'a self, set_def: &'a SetDef) -> impl Iterator<Item = &'a ItemDef> + 'a {
        set_def.item_defs.iter().map(|&idx| &self.item_defs[idx])
    }

    /// The set definition followed by its ancestors.
    #[must_use]
    pub fn set_def_chain<'a>(&'a self, set_def: &'a SetDef) -> SetDefChain<'a> {
        SetDefChain {
            model: self,
            next: Some(set_def),
            remaining: self.set_defs.len().max(1),
        }
    }

    /// All set definitions in registration order.
    pub fn set_defs(&self) -> impl Iterator<Item = &SetDef> {
        self.set_defs.iter()
    }

    /// All item definitions in registration order.
    pub fn item_defs(&self) -> impl Iterator<Item = &ItemDef> {
        self.item_defs.iter()
    }

    /// Check whether `key` is `ancestor` or derives from it.
    #[must_use]
    pub fn is_subclass_of(&self, key: &Ul, ancestor: &Ul) -> bool {
        if key == ancestor {
            return true;
        }
        match self.find_set_def(key) {
            Some(set_def) => self.set_def_chain(set_def).any(|def| def.key == *ancestor),
            None => false,
        }
    }

    // ==== Types ====

    /// Find a registered item type.
    #[must_use]
    pub fn find_item_type(&self, id: ItemTypeId) -> Option<&ItemType> {
        self.types.get(&id)
    }

    /// Length rule used to validate items of this type.
    #[must_use]
    pub fn length_rule(&self, id: ItemTypeId) -> LengthRule {
        if let Some(rule) = id.builtin_length_rule() {
            return rule;
        }
        let Some(item_type) = self.types.get(&id) else {
            return LengthRule::Unchecked;
        };
        match &item_type.category {
            TypeCategory::Basic { size: 0 } => LengthRule::Unchecked,
            TypeCategory::Basic { size } => LengthRule::Exact(usize::from(*size)),
            TypeCategory::Array {
                element,
                fixed_size,
            } => {
                let element_len = self.fixed_len(*element);
                if *fixed_size > 0 {
                    element_len.map_or(LengthRule::Unchecked, |len| {
                        LengthRule::Exact(len * *fixed_size as usize)
                    })
                } else if self.is_character_type(*element) {
                    LengthRule::Unchecked
                } else {
                    LengthRule::Array { element_len }
                }
            }
            TypeCategory::Compound { members } => members
                .iter()
                .map(|m| self.fixed_len(m.type_id))
                .sum::<Option<usize>>()
                .map_or(LengthRule::Unchecked, LengthRule::Exact),
            TypeCategory::Interpret { base, .. } => self.length_rule(*base),
        }
    }

    fn fixed_len(&self, id: ItemTypeId) -> Option<usize> {
        match self.length_rule(id) {
            LengthRule::Exact(len) => Some(len),
            _ => None,
        }
    }

    fn is_character_type(&self, id: ItemTypeId) -> bool {
        if id.is_character() {
            return true;
        }
        match self.types.get(&id).map(|t| &t.category) {
            Some(TypeCategory::Interpret { base, .. }) => self.is_character_type(*base),
            _ => false,
        }
    }

    /// Reference kind of a type, `None` if it holds no set references.
    #[must_use]
    pub fn ref_kind(&self, id: ItemTypeId) -> Option<RefKind> {
        match id {
            ItemTypeId::StrongRef => return Some(RefKind::Strong),
            ItemTypeId::WeakRef => return Some(RefKind::Weak),
            _ => {}
        }
        match &self.types.get(&id)?.category {
            TypeCategory::Interpret { base, .. } => self.ref_kind(*base),
            TypeCategory::Array { element, .. } => match self.ref_kind(*element)? {
                RefKind::Strong => Some(RefKind::StrongArray),
                RefKind::Weak => Some(RefKind::WeakArray),
                RefKind::StrongArray | RefKind::WeakArray => None,
            },
            _ => None,
        }
    }

    // ==== Consistency ====

    /// Check item definitions for conflicting local tags and unknown types.
    ///
    /// Returns a list of problems found; empty if consistent.
    #[must_use]
    pub fn check(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut tag_by_key: HashMap<Ul, u16> = HashMap::new();
        let mut key_by_tag: HashMap<u16, Ul> = HashMap::new();

        for def in &self.item_defs {
            match tag_by_key.get(&def.key) {
                Some(&tag) if tag != def.local_tag => errors.push(format!(
                    "item {} ({}) registered with local tags 0x{tag:04x} and 0x{:04x}",
                    def.name, def.key, def.local_tag
                )),
                Some(_) => {}
                None => {
                    tag_by_key.insert(def.key, def.local_tag);
                }
            }
            if def.local_tag != 0 {
                match key_by_tag.get(&def.local_tag) {
                    Some(other) if *other != def.key => errors.push(format!(
                        "local tag 0x{:04x} used by {} and {}",
                        def.local_tag, other, def.key
                    )),
                    Some(_) => {}
                    None => {
                        key_by_tag.insert(def.local_tag, def.key);
                    }
                }
            }
            if !self.types.contains_key(&def.type_id) {
                errors.push(format!(
                    "item {} ({}) has unknown type {}",
                    def.name, def.key, def.type_id
                ));
            }
        }

        errors
    }

    /// Check consistency, returning an error if any problem is found.
    pub fn check_strict(&self) -> Result<()> {
        let errors = self.check();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors))
        }
    }
}

/// Iterator over a set definition and its ancestors.
#[derive(Debug, Clone)]
pub struct SetDefChain<'a> {
    model: &'a DataModel,
    next: Option<&'a SetDef>,
    remaining: usize,
}

impl<'a> Iterator for SetDefChain<'a> {
    type Item = &'a SetDef;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next?;
        self.next = current
            .parent_key
            .filter(|parent| *parent != current.key)
            .and_then(|parent| self.model.find_set_def(&parent));
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(last: u8) -> Ul {
        let mut bytes = [0u8; 16];
        bytes[0] = 0x06;
        bytes[15] = last;
        Ul(bytes)
    }

    fn sample_model() -> DataModel {
        let mut model = DataModel::new();
        model.register_set_def("Root", None, key(1)).unwrap();
        model.register_set_def("Middle", Some(key(1)), key(2)).unwrap();
        model.register_set_def("Leaf", Some(key(2)), key(3)).unwrap();
        model
            .register_item_def("Id", key(1), key(0x81), 0x3c0a, ItemTypeId::Uuid, true)
            .unwrap();
        model
            .register_item_def("Count", key(3), key(0x82), 0x1001, ItemTypeId::UInt32, false)
            .unwrap();
        model
    }

    #[test]
    fn test_registration_errors() {
        let mut model = sample_model();
        assert!(matches!(
            model.register_set_def("Orphan", Some(key(9)), key(10)),
            Err(Error::UnknownSetDef(_))
        ));
        assert!(matches!(
            model.register_set_def("Again", None, key(1)),
            Err(Error::DuplicateSetDef(_))
        ));
        assert!(matches!(
            model.register_item_def("Count", key(3), key(0x82), 0x1001, ItemTypeId::UInt32, false),
            Err(Error::DuplicateItemDef { .. })
        ));
        assert!(matches!(
            model.register_item_def("X", key(9), key(0x83), 0, ItemTypeId::UInt32, false),
            Err(Error::UnknownSetDef(_))
        ));
        assert!(matches!(
            model.register_item_def("X", key(3), key(0x83), 0, ItemTypeId::Extension(5), false),
            Err(Error::UnknownItemType(_))
        ));
    }

    #[test]
    fn test_find_item_def_walks_parents() {
        let model = sample_model();
        let leaf = model.find_set_def(&key(3)).unwrap();
        let def = model.find_item_def_in_set_def(&key(0x81), leaf).unwrap();
        assert_eq!(def.local_tag, 0x3c0a);

        let root = model.find_set_def(&key(1)).unwrap();
        assert!(model.find_item_def_in_set_def(&key(0x82), root).is_none());
        assert_eq!(model.set_def_chain(leaf).count(), 3);
    }

    #[test]
    fn test_is_subclass_of() {
        let model = sample_model();
        assert!(model.is_subclass_of(&key(3), &key(3)));
        assert!(model.is_subclass_of(&key(3), &key(1)));
        assert!(!model.is_subclass_of(&key(1), &key(3)));
        assert!(!model.is_subclass_of(&key(42), &key(1)));
    }

    #[test]
    fn test_check_detects_tag_conflicts() {
        let mut model = sample_model();
        assert!(model.check().is_empty());
        model
            .register_item_def("Clash", key(2), key(0x84), 0x1001, ItemTypeId::UInt8, false)
            .unwrap();
        model
            .register_item_def("Id", key(3), key(0x81), 0x3c0b, ItemTypeId::Uuid, false)
            .unwrap();
        let errors = model.check();
        assert_eq!(errors.len(), 2);
        assert!(model.check_strict().is_err());
    }

    #[test]
    fn test_extension_types() {
        let mut model = DataModel::new();
        let pair = ItemTypeId::Extension(1);
        let pairs = ItemTypeId::Extension(2);
        let text = ItemTypeId::Extension(3);
        let refs = ItemTypeId::Extension(4);
        model
            .register_compound_type(
                "Pair",
                pair,
                vec![
                    CompoundMember {
                        name: "A".into(),
                        type_id: ItemTypeId::UInt16,
                    },
                    CompoundMember {
                        name: "B".into(),
                        type_id: ItemTypeId::Int32,
                    },
                ],
            )
            .unwrap();
        model.register_array_type("Pairs", pairs, pair, 0).unwrap();
        model
            .register_array_type("Text", text, ItemTypeId::Utf16, 0)
            .unwrap();
        model
            .register_array_type("Refs", refs, ItemTypeId::StrongRef, 0)
            .unwrap();

        assert_eq!(model.length_rule(pair), LengthRule::Exact(6));
        assert_eq!(
            model.length_rule(pairs),
            LengthRule::Array {
                element_len: Some(6)
            }
        );
        assert_eq!(model.length_rule(text), LengthRule::Unchecked);
        assert_eq!(model.ref_kind(refs), Some(RefKind::StrongArray));
        assert_eq!(model.ref_kind(pairs), None);
        assert_eq!(
            model.ref_kind(ItemTypeId::WeakRefBatch),
            Some(RefKind::WeakArray)
        );

        assert!(model.register_basic_type("Dup", pair, 2).is_err());
        assert!(model.register_basic_type("Builtin", ItemTypeId::UInt8, 1).is_err());
        assert!(
            model
                .register_compound_type("Empty", ItemTypeId::Extension(9), Vec::new())
                .is_err()
        );
    }
}
