/// The reflection/introspection surface: property descriptors, freeze/
/// seal/extensibility, own-property enumeration, and prototype-chain
/// queries. Everything here is read-mostly and layered entirely on top of
/// `core::oop`/`core::ops` — no new storage of its own.
use std::sync::Arc;

use crate::conf::Conf;
use crate::core::attr::{Attr, Trait};
use crate::core::name::Name;
use crate::core::oop::{merge_accessor, ObjRef, ObjectFlags};
use crate::core::value::{FunctionRef, ValueRef};
use crate::errors::{CoreError, CoreResult};

/// The descriptor shape returned by `getOwnPropertyDescriptor`, mirroring
/// the attribute predicates a script can observe. `get`/`set` are populated
/// from the slot's `Accessor` value when `is_getter`/`is_setter` are set;
/// `value` is the raw stored value in either case.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    pub name: Name,
    pub value: ValueRef,
    pub get: Option<Arc<FunctionRef>>,
    pub set: Option<Arc<FunctionRef>>,
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
    pub is_getter: bool,
    pub is_setter: bool,
}

fn descriptor_for(obj: &ObjRef, idx: usize) -> Option<PropertyDescriptor> {
    let guard = obj.read();
    let slot = guard.get_slot(idx)?;
    let (get, set) = match &slot.value {
        ValueRef::Accessor { get, set } => (get.clone(), set.clone()),
        _ => (None, None),
    };
    Some(PropertyDescriptor {
        name: slot.name.clone(),
        value: slot.value.clone(),
        get,
        set,
        writable: slot.trait_.attributes.is_writable(),
        enumerable: slot.trait_.attributes.is_enumerable(),
        configurable: slot.trait_.attributes.is_configurable(),
        is_getter: slot.trait_.attributes.contains(Attr::GETTER),
        is_setter: slot.trait_.attributes.contains(Attr::SETTER),
    })
}

/// Look up `name` (ambiguous short-name rule) and return its descriptor.
pub fn describe(obj: &ObjRef, name: &Name) -> Option<PropertyDescriptor> {
    let idx = obj.read().lookup(name)?;
    descriptor_for(obj, idx)
}

/// Look up `name` restricted to an ordered namespace list and return its
/// descriptor (spec §4.2 supplement).
pub fn describe_in(obj: &ObjRef, namespaces: &[Option<&str>], short_name: &str) -> Option<PropertyDescriptor> {
    let idx = obj.read().table().lookup_in(namespaces, short_name)?;
    descriptor_for(obj, idx)
}

/// `Object.defineProperty`: create the slot if absent, otherwise merge the
/// supplied attribute bits into the existing slot's (`configurable: false`
/// → `FIXED`, `enumerable: false` → `HIDDEN`, `writable: false` →
/// `READONLY`), never replacing bits the caller didn't ask to change. Fails
/// with `TypeError` if the existing slot is `FIXED`, and with `ArgError` if
/// `GETTER`/`SETTER` is requested but `value` is not a function. Requesting
/// an accessor merges with (rather than replaces) any getter/setter the
/// slot already carried, per spec §4.3's accessor-merge rule.
pub fn define_property(
    obj: &ObjRef,
    conf: &Conf,
    name: Name,
    value: ValueRef,
    attrs: Attr,
) -> CoreResult<()> {
    let wants_accessor = attrs.intersects(Attr::GETTER | Attr::SETTER);
    if wants_accessor && value.as_function().is_none() {
        return Err(CoreError::arg_error("defineProperty: get/set must be a function"));
    }

    let existing = obj.read().lookup(&name);
    match existing {
        Some(idx) => {
            let mut guard = obj.write();
            let (declared_type, prior_attrs, prior_value) = {
                let slot = guard.get_slot(idx).expect("index from prior lookup");
                if !slot.trait_.attributes.is_configurable() {
                    return Err(CoreError::not_configurable(&slot.name));
                }
                (slot.trait_.declared_type.clone(), slot.trait_.attributes, slot.value.clone())
            };
            let (final_value, merged_attrs) = if wants_accessor {
                let new_fn = value.as_function().expect("checked above").clone();
                let (merged_value, accessor_bits) = merge_accessor(
                    Some(&prior_value),
                    attrs.contains(Attr::GETTER),
                    attrs.contains(Attr::SETTER),
                    new_fn,
                );
                let attrs = (prior_attrs | attrs).difference(Attr::GETTER | Attr::SETTER) | accessor_bits;
                (merged_value, attrs)
            } else {
                (value, prior_attrs | attrs)
            };
            let table = guard.table_mut(conf);
            let slot = table.get_mut(idx).expect("index from prior lookup");
            slot.value = final_value;
            slot.trait_ = Trait::new(declared_type, merged_attrs);
            Ok(())
        }
        None => {
            let (final_value, final_attrs) = if wants_accessor {
                let new_fn = value.as_function().expect("checked above").clone();
                let (merged_value, accessor_bits) = merge_accessor(
                    None,
                    attrs.contains(Attr::GETTER),
                    attrs.contains(Attr::SETTER),
                    new_fn,
                );
                (merged_value, attrs.difference(Attr::GETTER | Attr::SETTER) | accessor_bits)
            } else {
                (value, attrs)
            };
            let mut guard = obj.write();
            guard.define(conf, name, Trait::new(None, final_attrs), final_value)?;
            Ok(())
        }
    }
}

/// `Object.preventExtensions`: block new property definitions, leaving
/// existing slots as-is.
pub fn prevent_extensions(obj: &ObjRef) {
    obj.write().flags |= ObjectFlags::NOT_EXTENSIBLE;
}

/// `Object.seal`: `preventExtensions` plus marking every existing slot
/// `FIXED` (not configurable).
pub fn seal(obj: &ObjRef, conf: &Conf) {
    let mut guard = obj.write();
    guard.flags |= ObjectFlags::NOT_EXTENSIBLE | ObjectFlags::SEALED;
    let table = guard.table_mut(conf);
    for (_, slot) in table.slots.iter_mut().enumerate().filter(|(_, s)| !s.is_empty()) {
        slot.trait_.attributes |= Attr::FIXED;
    }
}

/// `Object.freeze`: `seal` plus marking every existing slot `READONLY`.
pub fn freeze(obj: &ObjRef, conf: &Conf) {
    let mut guard = obj.write();
    guard.flags |= ObjectFlags::NOT_EXTENSIBLE | ObjectFlags::SEALED | ObjectFlags::FROZEN;
    let table = guard.table_mut(conf);
    for (_, slot) in table.slots.iter_mut().enumerate().filter(|(_, s)| !s.is_empty()) {
        slot.trait_.attributes |= Attr::FIXED | Attr::READONLY;
    }
}

pub fn is_extensible(obj: &ObjRef) -> bool {
    obj.read().is_extensible()
}

pub fn is_sealed(obj: &ObjRef) -> bool {
    obj.read().is_sealed()
}

pub fn is_frozen(obj: &ObjRef) -> bool {
    obj.read().is_frozen()
}

/// All own property names, including hidden ones (reflection sees
/// everything; only enumeration/JSON hide `HIDDEN` slots by default).
pub fn get_own_property_names(obj: &ObjRef) -> Vec<Name> {
    obj.read().own_names(true)
}

pub fn get_own_property_count(obj: &ObjRef) -> usize {
    get_own_property_names(obj).len()
}

pub fn has_own_property(obj: &ObjRef, name: &Name) -> bool {
    obj.read().lookup(name).is_some()
}

pub fn property_is_enumerable(obj: &ObjRef, name: &Name) -> bool {
    let guard = obj.read();
    match guard.lookup(name) {
        Some(idx) => guard.get_slot(idx).map(|s| s.trait_.attributes.is_enumerable()).unwrap_or(false),
        None => false,
    }
}

/// This object's type's prototype, or `None` for a type-less (raw) object.
pub fn get_own_prototype_of(obj: &ObjRef) -> Option<ObjRef> {
    let guard = obj.read();
    let type_obj = guard.obj_type.as_ref()?;
    let type_guard = type_obj.read();
    type_guard.type_ext.as_ref()?.prototype.clone()
}

/// Walks `obj`'s type and its ancestor types' prototypes looking for
/// `candidate`.
pub fn is_prototype_of(candidate: &ObjRef, obj: &ObjRef) -> bool {
    let mut current_type = obj.read().obj_type.clone();
    while let Some(type_ref) = current_type {
        let type_guard = type_ref.read();
        let Some(ext) = type_guard.type_ext.as_ref() else { break };
        if let Some(proto) = &ext.prototype {
            if std::sync::Arc::ptr_eq(proto, candidate) {
                return true;
            }
        }
        current_type = ext.parent.clone();
    }
    false
}

/// Enumerable own values, in slot order — the companion to
/// `get_own_property_names` used by `for..in`/`values()`-style iteration.
pub fn own_values(obj: &ObjRef) -> Vec<ValueRef> {
    obj.read().own_values(false)
}

pub fn own_names_enumerable(obj: &ObjRef) -> Vec<Name> {
    obj.read().own_names(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oop::PropertyObject;
    use std::sync::Arc;

    fn new_obj() -> ObjRef {
        Arc::new(parking_lot::RwLock::new(PropertyObject::new(None, ObjectFlags::DYNAMIC)))
    }

    #[test]
    fn define_property_creates_then_updates() {
        let conf = Conf::default();
        let obj = new_obj();
        define_property(&obj, &conf, Name::unspaced("x"), ValueRef::Number(1.0), Attr::empty()).unwrap();
        assert!(has_own_property(&obj, &Name::unspaced("x")));
        define_property(&obj, &conf, Name::unspaced("x"), ValueRef::Number(2.0), Attr::HIDDEN).unwrap();
        assert!(!property_is_enumerable(&obj, &Name::unspaced("x")));
    }

    #[test]
    fn freeze_blocks_further_definition_and_write() {
        let conf = Conf::default();
        let obj = new_obj();
        define_property(&obj, &conf, Name::unspaced("x"), ValueRef::Number(1.0), Attr::empty()).unwrap();
        freeze(&obj, &conf);
        assert!(is_frozen(&obj));
        assert!(is_sealed(&obj));
        assert!(!is_extensible(&obj));
        let desc = describe(&obj, &Name::unspaced("x")).unwrap();
        assert!(!desc.writable);
        assert!(!desc.configurable);
    }

    #[test]
    fn seal_does_not_imply_readonly() {
        let conf = Conf::default();
        let obj = new_obj();
        define_property(&obj, &conf, Name::unspaced("x"), ValueRef::Number(1.0), Attr::empty()).unwrap();
        seal(&obj, &conf);
        let desc = describe(&obj, &Name::unspaced("x")).unwrap();
        assert!(desc.writable);
        assert!(!desc.configurable);
    }

    #[test]
    fn get_own_property_names_includes_hidden() {
        let conf = Conf::default();
        let obj = new_obj();
        define_property(&obj, &conf, Name::unspaced("visible"), ValueRef::Number(1.0), Attr::empty()).unwrap();
        define_property(&obj, &conf, Name::unspaced("hidden"), ValueRef::Number(2.0), Attr::HIDDEN).unwrap();
        assert_eq!(get_own_property_names(&obj).len(), 2);
        assert_eq!(get_own_property_count(&obj), 2);
        assert_eq!(own_names_enumerable(&obj).len(), 1);
    }

    #[test]
    fn define_property_rejects_non_function_accessor() {
        let conf = Conf::default();
        let obj = new_obj();
        let err = define_property(&obj, &conf, Name::unspaced("x"), ValueRef::Number(1.0), Attr::GETTER);
        assert!(matches!(err, Err(CoreError::ArgError { .. })));
    }

    #[test]
    fn define_property_merges_setter_onto_existing_getter() {
        let conf = Conf::default();
        let obj = new_obj();
        let getter = ValueRef::Function(Arc::new(crate::core::value::FunctionRef::new(Some("get"), false, 1)));
        let setter = ValueRef::Function(Arc::new(crate::core::value::FunctionRef::new(Some("set"), false, 2)));
        define_property(&obj, &conf, Name::unspaced("x"), getter, Attr::GETTER).unwrap();
        define_property(&obj, &conf, Name::unspaced("x"), setter, Attr::SETTER).unwrap();

        let desc = describe(&obj, &Name::unspaced("x")).unwrap();
        assert!(desc.is_getter);
        assert!(desc.is_setter);
        assert!(desc.get.is_some());
        assert!(desc.set.is_some());
    }

    #[test]
    fn define_property_merges_attributes_instead_of_replacing() {
        let conf = Conf::default();
        let obj = new_obj();
        define_property(&obj, &conf, Name::unspaced("x"), ValueRef::Number(1.0), Attr::HIDDEN).unwrap();
        define_property(&obj, &conf, Name::unspaced("x"), ValueRef::Number(2.0), Attr::READONLY).unwrap();
        let desc = describe(&obj, &Name::unspaced("x")).unwrap();
        assert!(!desc.enumerable, "prior HIDDEN bit must survive an unrelated later call");
        assert!(!desc.writable);
    }

    #[test]
    fn prototype_chain_walk() {
        let conf = Conf::default();
        let proto = new_obj();
        let grandparent_proto = new_obj();
        {
            let mut g = proto.write();
            g.obj_type = None;
        }
        let parent_type = Arc::new(parking_lot::RwLock::new(PropertyObject::new_type(Name::unspaced("Parent"), None)));
        parent_type.write().type_ext = Some(Arc::new({
            let mut ext = crate::core::oop::TypeExt::new(Name::unspaced("Parent"));
            ext.prototype = Some(grandparent_proto.clone());
            ext
        }));
        let child_type = Arc::new(parking_lot::RwLock::new(PropertyObject::new_type(Name::unspaced("Child"), Some(parent_type.clone()))));
        child_type.write().type_ext = Some(Arc::new({
            let mut ext = crate::core::oop::TypeExt::new(Name::unspaced("Child"));
            ext.prototype = Some(proto.clone());
            ext.parent = Some(parent_type.clone());
            ext
        }));

        let instance = Arc::new(parking_lot::RwLock::new(PropertyObject::new(Some(child_type.clone()), ObjectFlags::DYNAMIC)));
        let own_proto = get_own_prototype_of(&instance).unwrap();
        assert!(Arc::ptr_eq(&own_proto, &proto));
        assert!(is_prototype_of(&proto, &instance));
        let _ = conf;
    }
}
