/// The slot-indexed operations API: the narrow surface an embedding VM's
/// bytecode dispatch loop actually calls on every property access. Each
/// function here takes a locked `ObjRef` and delegates to `PropertyObject`,
/// applying the copy-on-write and ordering rules from spec §4.3/§4.4 at the
/// boundary rather than inside the header type itself.
use crate::conf::Conf;
use crate::core::attr::Trait;
use crate::core::name::Name;
use crate::core::oop::ObjRef;
use crate::core::value::{Invoker, ValueRef};
use crate::errors::{CoreError, CoreResult};

/// Read the value at `idx`. Returns `ReferenceError` if `idx` is out of
/// range or tombstoned.
pub fn get(obj: &ObjRef, idx: usize) -> CoreResult<ValueRef> {
    let guard = obj.read();
    guard
        .get_slot(idx)
        .map(|s| s.value.clone())
        .ok_or_else(|| CoreError::slot_out_of_range(idx as i32))
}

/// Write the value at `idx` in place. Fails if the slot is `READONLY`.
/// Forces a copy-on-write split of a shared table before writing, so that
/// sibling instances sharing the same type never observe this write.
pub fn set(obj: &ObjRef, conf: &Conf, idx: usize, value: ValueRef) -> CoreResult<()> {
    let mut guard = obj.write();
    {
        let slot = guard
            .get_slot(idx)
            .ok_or_else(|| CoreError::slot_out_of_range(idx as i32))?;
        if !slot.trait_.attributes.is_writable() {
            return Err(CoreError::not_configurable(&slot.name));
        }
    }
    let table = guard.table_mut(conf);
    let slot = table.get_mut(idx).ok_or_else(|| CoreError::slot_out_of_range(idx as i32))?;
    slot.value = value;
    Ok(())
}

/// Name lookup by slot index, for reflection and error messages that need
/// to name a slot the caller already holds an index for.
pub fn get_name(obj: &ObjRef, idx: usize) -> CoreResult<Name> {
    let guard = obj.read();
    guard
        .get_slot(idx)
        .map(|s| s.name.clone())
        .ok_or_else(|| CoreError::slot_out_of_range(idx as i32))
}

/// Rename slot `idx`. Fails if the slot is `FIXED` (not configurable) or if
/// `new_name` collides with an existing slot.
pub fn set_name(obj: &ObjRef, conf: &Conf, idx: usize, new_name: Name) -> CoreResult<()> {
    let mut guard = obj.write();
    {
        let slot = guard
            .get_slot(idx)
            .ok_or_else(|| CoreError::slot_out_of_range(idx as i32))?;
        if !slot.trait_.attributes.is_configurable() {
            return Err(CoreError::not_configurable(&slot.name));
        }
    }
    if let Some(existing) = guard.lookup(&new_name) {
        if existing != idx {
            return Err(CoreError::type_error(format!(
                "property '{}' is already defined",
                new_name.short()
            )));
        }
    }
    let table = guard.table_mut(conf);
    let (old_trait, old_value) = {
        let slot = table.get(idx).expect("checked above");
        (slot.trait_.clone(), slot.value.clone())
    };
    table.overwrite(idx, new_name, old_trait, old_value);
    Ok(())
}

pub fn get_trait(obj: &ObjRef, idx: usize) -> CoreResult<Trait> {
    let guard = obj.read();
    guard
        .get_slot(idx)
        .map(|s| s.trait_.clone())
        .ok_or_else(|| CoreError::slot_out_of_range(idx as i32))
}

/// Replace slot `idx`'s trait (declared type and attribute bits). Fails if
/// the existing trait is `FIXED`.
pub fn set_trait(obj: &ObjRef, conf: &Conf, idx: usize, new_trait: Trait) -> CoreResult<()> {
    let mut guard = obj.write();
    {
        let slot = guard
            .get_slot(idx)
            .ok_or_else(|| CoreError::slot_out_of_range(idx as i32))?;
        if !slot.trait_.attributes.is_configurable() {
            return Err(CoreError::not_configurable(&slot.name));
        }
    }
    let table = guard.table_mut(conf);
    let slot = table.get_mut(idx).ok_or_else(|| CoreError::slot_out_of_range(idx as i32))?;
    slot.trait_ = new_trait;
    Ok(())
}

/// Define a brand-new named slot. Order of operations matches
/// `ejsObject.c`'s `defineObjectProperty`: the name is validated for
/// collision before anything is written, so a failure never leaves a
/// partially-defined slot.
pub fn define(
    obj: &ObjRef,
    conf: &Conf,
    name: Name,
    trait_: Trait,
    value: ValueRef,
) -> CoreResult<usize> {
    let mut guard = obj.write();
    guard.define(conf, name, trait_, value)
}

pub fn delete(obj: &ObjRef, conf: &Conf, idx: usize) -> CoreResult<()> {
    let mut guard = obj.write();
    guard.delete(conf, idx)
}

pub fn delete_by_name(obj: &ObjRef, conf: &Conf, name: &Name) -> CoreResult<()> {
    let mut guard = obj.write();
    guard.delete_by_name(conf, name)
}

/// Ambiguous (short-name) lookup.
pub fn lookup(obj: &ObjRef, name: &Name) -> Option<usize> {
    obj.read().lookup(name)
}

/// Named-property read: resolves `name` via ambiguous lookup, then — if the
/// slot holds an accessor — calls its getter through `invoker` rather than
/// handing back the accessor value itself. A setter-only accessor's no-op
/// getter reads as `undefined`. Plain slots behave exactly like `get`.
pub fn get_property(obj: &ObjRef, name: &Name, invoker: &dyn Invoker) -> CoreResult<ValueRef> {
    let idx = obj.read().lookup(name).ok_or_else(|| CoreError::unknown_property(name.short()))?;
    let value = get(obj, idx)?;
    match value {
        ValueRef::Accessor { get: Some(getter), .. } => {
            let receiver = ValueRef::Object(obj.clone());
            invoker.call_getter(&getter, &receiver).map_err(CoreError::type_error)
        }
        ValueRef::Accessor { get: None, .. } => Ok(ValueRef::Undefined),
        other => Ok(other),
    }
}

/// Named-property write: resolves `name` via ambiguous lookup, then — if the
/// slot holds an accessor — calls its setter through `invoker` instead of
/// overwriting the accessor itself. A getter-only accessor's write is a
/// no-op. Plain slots behave exactly like `set`.
pub fn set_property(
    obj: &ObjRef,
    conf: &Conf,
    name: &Name,
    value: ValueRef,
    invoker: &dyn Invoker,
) -> CoreResult<()> {
    let idx = obj.read().lookup(name).ok_or_else(|| CoreError::unknown_property(name.short()))?;
    let existing = get(obj, idx)?;
    match existing {
        ValueRef::Accessor { set: Some(setter), .. } => {
            let receiver = ValueRef::Object(obj.clone());
            invoker.call_setter(&setter, &receiver, &value).map_err(CoreError::type_error)
        }
        ValueRef::Accessor { set: None, .. } => Ok(()),
        _ => set(obj, conf, idx, value),
    }
}

/// Namespace-ordered lookup (spec §4.2 supplement).
pub fn lookup_in(obj: &ObjRef, namespaces: &[Option<&str>], short_name: &str) -> Option<usize> {
    obj.read().table().lookup_in(namespaces, short_name)
}

pub fn count(obj: &ObjRef) -> usize {
    obj.read().table().count()
}

/// Ensure the object's table has capacity for at least `required` live
/// properties, splitting out of shared storage first if necessary.
pub fn grow(obj: &ObjRef, conf: &Conf, required: usize) {
    let mut guard = obj.write();
    let table = guard.table_mut(conf);
    table.grow(conf, required);
}

/// A shallow clone of the object behind a fresh `ObjRef`, per spec §4.5.
pub fn clone_object(obj: &ObjRef) -> ObjRef {
    let guard = obj.read();
    std::sync::Arc::new(parking_lot::RwLock::new(guard.shallow_clone()))
}

/// `clone(obj, deep)`: a shallow clone shares every slot value as-is; a deep
/// clone (spec §4.5) recurses into mutable-type instance values, sharing
/// functions and immutable/non-mutable-type instances, and breaks cycles via
/// the `VISITED` flag.
pub fn clone(obj: &ObjRef, conf: &Conf, deep: bool) -> ObjRef {
    if deep {
        crate::core::oop::PropertyObject::deep_clone(obj, conf)
    } else {
        clone_object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attr::Attr;
    use crate::core::oop::{ObjectFlags, PropertyObject};
    use crate::core::value::FunctionRef;
    use std::sync::Arc;

    struct RecordingInvoker {
        getter_calls: std::sync::Mutex<Vec<usize>>,
        setter_calls: std::sync::Mutex<Vec<(usize, Option<f64>)>>,
    }

    impl RecordingInvoker {
        fn new() -> Self {
            RecordingInvoker { getter_calls: std::sync::Mutex::new(Vec::new()), setter_calls: std::sync::Mutex::new(Vec::new()) }
        }
    }

    impl Invoker for RecordingInvoker {
        fn call_getter(&self, getter: &FunctionRef, _receiver: &ValueRef) -> Result<ValueRef, String> {
            self.getter_calls.lock().unwrap().push(getter.handle());
            Ok(ValueRef::Number(42.0))
        }
        fn call_setter(&self, setter: &FunctionRef, _receiver: &ValueRef, value: &ValueRef) -> Result<(), String> {
            self.setter_calls.lock().unwrap().push((setter.handle(), value.as_number()));
            Ok(())
        }
        fn to_display_string(&self, _value: &ValueRef) -> Option<String> {
            None
        }
        fn call_replacer(&self, _replacer: &FunctionRef, _key: &str, value: &ValueRef) -> Result<ValueRef, String> {
            Ok(value.clone())
        }
    }

    fn new_obj() -> ObjRef {
        Arc::new(parking_lot::RwLock::new(PropertyObject::new(None, ObjectFlags::DYNAMIC)))
    }

    #[test]
    fn define_get_set_roundtrip() {
        let conf = Conf::default();
        let obj = new_obj();
        let idx = define(&obj, &conf, Name::unspaced("x"), Trait::plain(), ValueRef::Number(1.0)).unwrap();
        assert_eq!(get(&obj, idx).unwrap().as_number(), Some(1.0));
        set(&obj, &conf, idx, ValueRef::Number(2.0)).unwrap();
        assert_eq!(get(&obj, idx).unwrap().as_number(), Some(2.0));
    }

    #[test]
    fn set_on_readonly_slot_fails() {
        let conf = Conf::default();
        let obj = new_obj();
        let idx = define(&obj, &conf, Name::unspaced("x"), Trait::readonly(), ValueRef::Number(1.0)).unwrap();
        assert!(set(&obj, &conf, idx, ValueRef::Number(2.0)).is_err());
    }

    #[test]
    fn set_name_rejects_collision() {
        let conf = Conf::default();
        let obj = new_obj();
        define(&obj, &conf, Name::unspaced("a"), Trait::plain(), ValueRef::Number(1.0)).unwrap();
        let b = define(&obj, &conf, Name::unspaced("b"), Trait::plain(), ValueRef::Number(2.0)).unwrap();
        assert!(set_name(&obj, &conf, b, Name::unspaced("a")).is_err());
    }

    #[test]
    fn set_name_on_fixed_slot_fails() {
        let conf = Conf::default();
        let obj = new_obj();
        let idx = define(&obj, &conf, Name::unspaced("a"), Trait::new(None, Attr::FIXED), ValueRef::Number(1.0)).unwrap();
        assert!(set_name(&obj, &conf, idx, Name::unspaced("renamed")).is_err());
    }

    #[test]
    fn clone_object_is_independent() {
        let conf = Conf::default();
        let obj = new_obj();
        let idx = define(&obj, &conf, Name::unspaced("x"), Trait::plain(), ValueRef::Number(1.0)).unwrap();
        let cloned = clone_object(&obj);
        set(&cloned, &conf, idx, ValueRef::Number(9.0)).unwrap();
        assert_eq!(get(&obj, idx).unwrap().as_number(), Some(1.0));
        assert_eq!(get(&cloned, idx).unwrap().as_number(), Some(9.0));
    }

    #[test]
    fn shallow_clone_via_clone_shares_nested_object() {
        let conf = Conf::default();
        let outer = new_obj();
        let inner = new_obj();
        let inner_idx = define(&inner, &conf, Name::unspaced("v"), Trait::plain(), ValueRef::Number(1.0)).unwrap();
        let outer_idx =
            define(&outer, &conf, Name::unspaced("child"), Trait::plain(), ValueRef::Object(inner.clone())).unwrap();

        let cloned = clone(&outer, &conf, false);
        let cloned_inner = get(&cloned, outer_idx).unwrap().as_object().unwrap().clone();
        set(&cloned_inner, &conf, inner_idx, ValueRef::Number(9.0)).unwrap();
        assert_eq!(get(&inner, inner_idx).unwrap().as_number(), Some(9.0), "shallow clone shares nested object");
    }

    #[test]
    fn deep_clone_copies_nested_object() {
        let conf = Conf::default();
        let outer = new_obj();
        let inner = new_obj();
        let inner_idx = define(&inner, &conf, Name::unspaced("v"), Trait::plain(), ValueRef::Number(1.0)).unwrap();
        let outer_idx =
            define(&outer, &conf, Name::unspaced("child"), Trait::plain(), ValueRef::Object(inner.clone())).unwrap();

        let cloned = clone(&outer, &conf, true);
        let cloned_inner = get(&cloned, outer_idx).unwrap().as_object().unwrap().clone();
        set(&cloned_inner, &conf, inner_idx, ValueRef::Number(9.0)).unwrap();
        assert_eq!(get(&inner, inner_idx).unwrap().as_number(), Some(1.0), "deep clone must not alias the original");
    }

    #[test]
    fn deep_clone_breaks_self_cycle() {
        let conf = Conf::default();
        let obj = new_obj();
        let idx = define(&obj, &conf, Name::unspaced("self"), Trait::plain(), ValueRef::Undefined).unwrap();
        set(&obj, &conf, idx, ValueRef::Object(obj.clone())).unwrap();

        // Must terminate rather than recurse forever, and must leave VISITED
        // cleared afterward so the original object is unaffected.
        let cloned = clone(&obj, &conf, true);
        let looped = get(&cloned, idx).unwrap();
        assert!(
            matches!(looped.as_object(), Some(o) if Arc::ptr_eq(o, &obj)),
            "hitting an already-visited object shares the original reference instead of recursing"
        );
        assert!(!obj.read().flags.contains(ObjectFlags::VISITED), "VISITED must be cleared after cloning");
    }

    #[test]
    fn get_property_invokes_getter() {
        let conf = Conf::default();
        let obj = new_obj();
        let getter = Arc::new(FunctionRef::new(Some("g"), false, 7));
        define(
            &obj,
            &conf,
            Name::unspaced("x"),
            Trait::new(None, Attr::GETTER),
            ValueRef::Accessor { get: Some(getter), set: None },
        )
        .unwrap();

        let invoker = RecordingInvoker::new();
        let value = get_property(&obj, &Name::unspaced("x"), &invoker).unwrap();
        assert_eq!(value.as_number(), Some(42.0));
        assert_eq!(*invoker.getter_calls.lock().unwrap(), vec![7]);
    }

    #[test]
    fn set_property_invokes_setter() {
        let conf = Conf::default();
        let obj = new_obj();
        let setter = Arc::new(FunctionRef::new(Some("s"), false, 9));
        define(
            &obj,
            &conf,
            Name::unspaced("x"),
            Trait::new(None, Attr::SETTER),
            ValueRef::Accessor { get: None, set: Some(setter) },
        )
        .unwrap();

        let invoker = RecordingInvoker::new();
        set_property(&obj, &conf, &Name::unspaced("x"), ValueRef::Number(5.0), &invoker).unwrap();
        assert_eq!(*invoker.setter_calls.lock().unwrap(), vec![(9, Some(5.0))]);
    }

    #[test]
    fn get_set_property_fall_through_for_plain_slots() {
        let conf = Conf::default();
        let obj = new_obj();
        let idx = define(&obj, &conf, Name::unspaced("x"), Trait::plain(), ValueRef::Number(1.0)).unwrap();
        let invoker = RecordingInvoker::new();
        set_property(&obj, &conf, &Name::unspaced("x"), ValueRef::Number(2.0), &invoker).unwrap();
        assert_eq!(get(&obj, idx).unwrap().as_number(), Some(2.0));
        assert_eq!(get_property(&obj, &Name::unspaced("x"), &invoker).unwrap().as_number(), Some(2.0));
        assert!(invoker.getter_calls.lock().unwrap().is_empty());
        assert!(invoker.setter_calls.lock().unwrap().is_empty());
    }
}
