/// The object header: flags, slot storage, and the optional type-only
/// extension record, shared uniformly by plain objects, class instances,
/// prototypes, type objects, and function activation frames.
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::RwLock;

use crate::conf::Conf;
use crate::core::attr::{Attr, Trait};
use crate::core::name::Name;
use crate::core::slot::Slot;
use crate::core::table::PropertyTable;
use crate::core::value::{FunctionRef, ValueRef};
use crate::errors::{CoreError, CoreResult};

/// Shared handle to an object. Every reference into the object graph —
/// including a value's prototype pointer and a type's own `TypeRef` — is
/// one of these.
pub type ObjRef = Arc<RwLock<PropertyObject>>;

/// A `PropertyObject` used specifically as a type (its own slots are the
/// type's static members; `type_ext` carries the prototype and parent
/// links instances consult).
pub type TypeRef = ObjRef;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectFlags: u32 {
        /// New properties may be added at runtime (as opposed to a sealed
        /// object whose slot layout is fixed at compile time).
        const DYNAMIC       = 1 << 0;
        /// Backs a lexical block scope rather than a script-visible value.
        const BLOCK         = 1 << 1;
        /// Backs a function activation frame.
        const FRAME         = 1 << 2;
        /// Is itself a callable function object.
        const FUNCTION      = 1 << 3;
        /// Is a type's prototype object.
        const PROTOTYPE     = 1 << 4;
        /// Is a type object (has a populated `type_ext`).
        const TYPE          = 1 << 5;
        /// Scope lookups through this object stop here (do not continue to
        /// an enclosing scope).
        const SHORT_SCOPE   = 1 << 6;
        /// This instance never shares its type's slot table, even before
        /// its first write (always allocates its own).
        const SEPARATE_SLOTS = 1 << 7;
        /// This instance never shares its type's hash index.
        const SEPARATE_HASH = 1 << 8;
        /// Set while a JSON/clone traversal is visiting this object, to
        /// break reference cycles.
        const VISITED       = 1 << 9;
        /// `preventExtensions` has been called: no new properties.
        const NOT_EXTENSIBLE = 1 << 10;
        /// `seal` has been called: implies `NOT_EXTENSIBLE`, plus every
        /// existing slot is `FIXED`.
        const SEALED        = 1 << 11;
        /// `freeze` has been called: implies `SEALED`, plus every existing
        /// slot is also `READONLY`.
        const FROZEN        = 1 << 12;
    }
}

/// An object's slot table is either aliased from its type (the common case
/// for freshly-created non-dynamic instances) or privately owned, after a
/// write forced a copy-on-write split.
pub enum TableStorage {
    Shared(Arc<PropertyTable>),
    Owned(PropertyTable),
}

impl TableStorage {
    pub fn as_table(&self) -> &PropertyTable {
        match self {
            TableStorage::Shared(t) => t,
            TableStorage::Owned(t) => t,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, TableStorage::Shared(_))
    }
}

impl Default for TableStorage {
    fn default() -> Self {
        TableStorage::Owned(PropertyTable::new())
    }
}

/// Hooks a type object can install to customize cast/coercion behavior
/// without the core depending on any particular built-in type's identity.
#[derive(Clone, Default)]
pub struct TypeCapabilities {
    /// This type implements a meta-level `cast` override (consulted before
    /// the built-in Boolean/Number/String/global fallback in `core::coerce`).
    pub has_cast_override: bool,
    /// This type implements a `toLocaleString` override distinct from
    /// `toString`.
    pub has_locale_override: bool,
}

/// Metadata present only on objects used as types: the prototype instances
/// inherit from, the parent type in the inheritance chain, and whether
/// instances of this type may add properties beyond their declared slots.
pub struct TypeExt {
    pub name: Name,
    pub prototype: Option<ObjRef>,
    pub parent: Option<TypeRef>,
    pub mutable_instances: bool,
    pub capabilities: TypeCapabilities,
}

impl TypeExt {
    pub fn new(name: Name) -> Self {
        TypeExt {
            name,
            prototype: None,
            parent: None,
            mutable_instances: true,
            capabilities: TypeCapabilities::default(),
        }
    }
}

pub struct PropertyObject {
    pub obj_type: Option<TypeRef>,
    pub num_props: usize,
    pub flags: ObjectFlags,
    pub table: TableStorage,
    pub type_ext: Option<Arc<TypeExt>>,
}

impl PropertyObject {
    pub fn new(obj_type: Option<TypeRef>, flags: ObjectFlags) -> Self {
        PropertyObject {
            obj_type,
            num_props: 0,
            flags,
            table: TableStorage::default(),
            type_ext: None,
        }
    }

    /// Create an instance that shares its type's inline slot table, the
    /// way the type's own fixed (non-dynamic) declared slots are laid out
    /// once and reused by every instance until one of them writes.
    pub fn new_sharing(obj_type: TypeRef, shared: Arc<PropertyTable>, flags: ObjectFlags) -> Self {
        let num_props = shared.count();
        PropertyObject {
            obj_type: Some(obj_type),
            num_props,
            flags,
            table: TableStorage::Shared(shared),
            type_ext: None,
        }
    }

    pub fn new_type(name: Name, parent: Option<TypeRef>) -> Self {
        let mut obj = PropertyObject::new(None, ObjectFlags::TYPE | ObjectFlags::DYNAMIC);
        let mut ext = TypeExt::new(name);
        ext.parent = parent;
        obj.type_ext = Some(Arc::new(ext));
        obj
    }

    pub fn is_extensible(&self) -> bool {
        !self.flags.contains(ObjectFlags::NOT_EXTENSIBLE)
    }

    pub fn is_sealed(&self) -> bool {
        self.flags.contains(ObjectFlags::SEALED)
    }

    pub fn is_frozen(&self) -> bool {
        self.flags.contains(ObjectFlags::FROZEN)
    }

    /// Force this object's table out of `Shared` storage into a private
    /// `Owned` copy. A no-op if it is already owned. Triggered by any
    /// operation that mutates a slot in place (`set`, `set_trait`,
    /// `delete`, `define`) per spec §4.3.
    pub fn ensure_owned(&mut self, conf: &Conf) {
        if let TableStorage::Shared(shared) = &self.table {
            conf.trace(format_args!("copy-on-write table split ({} slots)", shared.count()));
            let owned = shared.as_ref().clone();
            self.table = TableStorage::Owned(owned);
        }
    }

    pub fn table(&self) -> &PropertyTable {
        self.table.as_table()
    }

    pub fn table_mut(&mut self, conf: &Conf) -> &mut PropertyTable {
        self.ensure_owned(conf);
        match &mut self.table {
            TableStorage::Owned(t) => t,
            TableStorage::Shared(_) => unreachable!("ensure_owned just ran"),
        }
    }

    pub fn lookup(&self, name: &Name) -> Option<usize> {
        self.table().lookup(name)
    }

    pub fn get_slot(&self, idx: usize) -> Option<&Slot> {
        self.table().get(idx)
    }

    pub fn get(&self, name: &Name) -> Option<&ValueRef> {
        self.lookup(name).and_then(|idx| self.table().get(idx)).map(|s| &s.value)
    }

    /// Define a property by qualified name (spec §4.3). Fails with
    /// `TypeError` if `GETTER`/`SETTER` is requested but `value` is not a
    /// function. If a slot with this exact qualified name already exists
    /// (including a `DELETED` tombstone), it is reused in place rather than
    /// appending a new one; otherwise a fresh slot is appended, which
    /// requires the object to be extensible.
    pub fn define(&mut self, conf: &Conf, name: Name, trait_: Trait, value: ValueRef) -> CoreResult<usize> {
        let wants_accessor = trait_.attributes.intersects(Attr::GETTER | Attr::SETTER);
        if wants_accessor && value.as_function().is_none() {
            return Err(CoreError::type_error("getter/setter value must be a function"));
        }

        let existing = self.table().find_any_by_name(&name);
        if let Some(idx) = existing {
            let slot = self.table().get(idx).expect("index from find_any_by_name");
            if !slot.trait_.attributes.is_configurable() {
                return Err(CoreError::not_configurable(&slot.name));
            }
            let existing_value = slot.value.clone();
            let (value, attributes) = if wants_accessor {
                let new_fn = value.as_function().expect("checked above").clone();
                let (merged_value, accessor_bits) = merge_accessor(
                    Some(&existing_value),
                    trait_.attributes.contains(Attr::GETTER),
                    trait_.attributes.contains(Attr::SETTER),
                    new_fn,
                );
                (merged_value, trait_.attributes.difference(Attr::GETTER | Attr::SETTER) | accessor_bits)
            } else {
                (value, trait_.attributes)
            };
            let declared_type = trait_.declared_type;
            let table = self.table_mut(conf);
            table.overwrite(idx, name, Trait::new(declared_type, attributes), value);
            self.num_props = table.count();
            return Ok(idx);
        }

        if !self.is_extensible() {
            return Err(CoreError::not_extendable());
        }
        let (value, attributes) = if wants_accessor {
            let new_fn = value.as_function().expect("checked above").clone();
            let (merged_value, accessor_bits) = merge_accessor(
                None,
                trait_.attributes.contains(Attr::GETTER),
                trait_.attributes.contains(Attr::SETTER),
                new_fn,
            );
            (merged_value, trait_.attributes.difference(Attr::GETTER | Attr::SETTER) | accessor_bits)
        } else {
            (value, trait_.attributes)
        };
        let slot = Slot::new(name, Trait::new(trait_.declared_type, attributes), value);
        let table = self.table_mut(conf);
        let idx = table.insert(conf, slot);
        self.num_props = table.count();
        Ok(idx)
    }

    pub fn delete_by_name(&mut self, conf: &Conf, name: &Name) -> CoreResult<()> {
        let idx = self.lookup(name).ok_or_else(|| CoreError::unknown_property(name.short()))?;
        self.delete(conf, idx)
    }

    /// Delete slot `idx` (spec §4.4): tombstones it in place rather than
    /// physically removing it. Fails with `TypeError` if the slot is
    /// `FIXED` (not configurable).
    pub fn delete(&mut self, conf: &Conf, idx: usize) -> CoreResult<()> {
        {
            let table = self.table();
            let slot = table.get(idx).ok_or_else(|| CoreError::slot_out_of_range(idx as i32))?;
            if !slot.trait_.attributes.is_configurable() {
                return Err(CoreError::not_configurable(&slot.name));
            }
        }
        let table = self.table_mut(conf);
        table.tombstone(idx);
        self.num_props = table.count();
        Ok(())
    }

    /// A shallow clone: new header, new private copy of the slot table,
    /// values themselves are not deep-copied (reference kinds stay
    /// shared), per spec §4.6.
    pub fn shallow_clone(&self) -> PropertyObject {
        PropertyObject {
            obj_type: self.obj_type.clone(),
            num_props: self.num_props,
            flags: self.flags & !ObjectFlags::VISITED,
            table: TableStorage::Owned(self.table().clone()),
            type_ext: self.type_ext.clone(),
        }
    }

    /// Names of own, enumerable properties, in slot order (spec §4.6/§4.7).
    /// `DELETED`/`INITIALIZER`/`MODULE_INITIALIZER` slots are always
    /// skipped; `HIDDEN` ones are skipped too unless `include_hidden` is
    /// set (used by reflection's `getOwnPropertyNames`, which sees
    /// everything but those three, vs. enumeration, which does not).
    pub fn own_names(&self, include_hidden: bool) -> Vec<Name> {
        self.table()
            .live_slots()
            .filter(|(_, s)| !s.trait_.attributes.is_compiler_internal())
            .filter(|(_, s)| include_hidden || s.trait_.attributes.is_enumerable())
            .map(|(_, s)| s.name.clone())
            .collect()
    }

    pub fn own_values(&self, include_hidden: bool) -> Vec<ValueRef> {
        self.table()
            .live_slots()
            .filter(|(_, s)| !s.trait_.attributes.is_compiler_internal())
            .filter(|(_, s)| include_hidden || s.trait_.attributes.is_enumerable())
            .map(|(_, s)| s.value.clone())
            .collect()
    }

    /// A deep clone (spec §4.5): like `shallow_clone`, but mutable-type
    /// instance values are recursed into and copied rather than shared.
    /// Functions, non-mutable-type instances, and already-copied slots
    /// (anything not itself `Object`) are shared as in the shallow case.
    /// Cycles are broken with `VISITED`: an object already being cloned is
    /// referenced directly rather than recursed into again.
    pub fn deep_clone(this: &ObjRef, conf: &Conf) -> ObjRef {
        let already_visited = {
            let mut guard = this.write();
            let visited = guard.flags.contains(ObjectFlags::VISITED);
            guard.flags |= ObjectFlags::VISITED;
            visited
        };
        if already_visited {
            return this.clone();
        }
        let cloned = {
            let guard = this.read();
            let is_mutable = guard
                .obj_type
                .as_ref()
                .and_then(|t| t.read().type_ext.as_ref().map(|ext| ext.mutable_instances))
                .unwrap_or(true);
            let mut header = guard.shallow_clone();
            if is_mutable {
                let table = header.table_mut(conf);
                for idx in 0..table.slots.len() {
                    let child = match &table.slots[idx].value {
                        ValueRef::Object(child) => Some(child.clone()),
                        _ => None,
                    };
                    if let Some(child) = child {
                        table.slots[idx].value = ValueRef::Object(PropertyObject::deep_clone(&child, conf));
                    }
                }
            }
            header
        };
        this.write().flags.remove(ObjectFlags::VISITED);
        Arc::new(RwLock::new(cloned))
    }
}

/// Apply spec §4.3's accessor-merge rule: combine whatever getter/setter
/// `existing` already represents with the newly supplied `new_fn` being
/// installed as a getter (`wants_getter`) and/or setter (`wants_setter`).
///
/// - Adding a setter to a slot holding a plain function treats that function
///   as the existing getter and attaches the setter alongside it.
/// - Adding a setter to a non-function value synthesizes a no-op getter
///   (represented as `get: None`) and attaches the setter.
/// - Adding a getter to a slot that already had both preserves the existing
///   setter on the new getter.
///
/// Returns the merged `ValueRef::Accessor` and the `GETTER`/`SETTER` bits it
/// implies.
pub(crate) fn merge_accessor(
    existing: Option<&ValueRef>,
    wants_getter: bool,
    wants_setter: bool,
    new_fn: Arc<FunctionRef>,
) -> (ValueRef, Attr) {
    let (mut get, mut set) = match existing {
        Some(ValueRef::Accessor { get, set }) => (get.clone(), set.clone()),
        Some(ValueRef::Function(f)) if wants_setter && !wants_getter => (Some(f.clone()), None),
        _ => (None, None),
    };
    if wants_getter {
        get = Some(new_fn.clone());
    }
    if wants_setter {
        set = Some(new_fn);
    }
    let mut bits = Attr::empty();
    if get.is_some() {
        bits |= Attr::GETTER;
    }
    if set.is_some() {
        bits |= Attr::SETTER;
    }
    (ValueRef::Accessor { get, set }, bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attr::Attr;

    #[test]
    fn fresh_object_is_extensible_and_unsealed() {
        let obj = PropertyObject::new(None, ObjectFlags::DYNAMIC);
        assert!(obj.is_extensible());
        assert!(!obj.is_sealed());
        assert!(!obj.is_frozen());
    }

    #[test]
    fn define_then_get_roundtrips() {
        let conf = Conf::default();
        let mut obj = PropertyObject::new(None, ObjectFlags::DYNAMIC);
        obj.define(&conf, Name::unspaced("x"), Trait::plain(), ValueRef::Number(1.0)).unwrap();
        assert_eq!(obj.get(&Name::unspaced("x")).unwrap().as_number(), Some(1.0));
    }

    #[test]
    fn define_on_non_extensible_object_fails() {
        let conf = Conf::default();
        let mut obj = PropertyObject::new(None, ObjectFlags::default());
        obj.flags |= ObjectFlags::NOT_EXTENSIBLE;
        let err = obj.define(&conf, Name::unspaced("x"), Trait::plain(), ValueRef::Number(1.0));
        assert!(err.is_err());
    }

    #[test]
    fn delete_of_fixed_slot_fails() {
        let conf = Conf::default();
        let mut obj = PropertyObject::new(None, ObjectFlags::DYNAMIC);
        let trait_ = Trait::new(None, Attr::FIXED);
        obj.define(&conf, Name::unspaced("x"), trait_, ValueRef::Number(1.0)).unwrap();
        let err = obj.delete_by_name(&conf, &Name::unspaced("x"));
        assert!(err.is_err());
    }

    #[test]
    fn shared_table_splits_to_owned_on_write() {
        let conf = Conf::default();
        let mut proto_table = PropertyTable::new();
        proto_table.insert(&conf, Slot::new(Name::unspaced("x"), Trait::plain(), ValueRef::Number(1.0)));
        let shared = Arc::new(proto_table);

        let type_obj = Arc::new(RwLock::new(PropertyObject::new_type(Name::unspaced("T"), None)));
        let mut instance = PropertyObject::new_sharing(type_obj, Arc::clone(&shared), ObjectFlags::DYNAMIC);
        assert!(instance.table.is_shared());

        instance
            .define(&conf, Name::unspaced("y"), Trait::plain(), ValueRef::Number(2.0))
            .unwrap();
        assert!(!instance.table.is_shared());
        assert_eq!(shared.count(), 1, "original shared table must be untouched");
    }

    #[test]
    fn shallow_clone_shares_reference_values() {
        let conf = Conf::default();
        let mut obj = PropertyObject::new(None, ObjectFlags::DYNAMIC);
        let arr = std::sync::Arc::new(RwLock::new(vec![ValueRef::Number(1.0)]));
        obj.define(&conf, Name::unspaced("a"), Trait::plain(), ValueRef::Array(arr.clone())).unwrap();
        let cloned = obj.shallow_clone();
        if let (Some(ValueRef::Array(a)), Some(ValueRef::Array(b))) =
            (obj.get(&Name::unspaced("a")), cloned.get(&Name::unspaced("a")))
        {
            assert!(std::sync::Arc::ptr_eq(a, b));
        } else {
            panic!("expected array values");
        }
    }
}
