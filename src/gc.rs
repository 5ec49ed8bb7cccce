/// Garbage-collector boundary.
///
/// ARCHITECTURE:
///   The allocator, generations, and collection algorithm all live outside
///   this crate — the property/object core owns slot storage and
///   reflection, nothing else. What the core needs from its embedder is a
///   single hook: a way to report that an object reference is alive so a
///   real tracing collector can visit it.
///
/// DESIGN GOALS:
///   • The core never decides when to collect, never allocates raw memory,
///     and never owns an object's lifetime.
///   • Any GC (generational, mark-sweep, refcounting) can sit behind this
///     trait without the core changing.
use crate::core::oop::ObjRef;

/// What a `Tracer::manage` call is reporting about the object passed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManageFlag {
    /// The collector is marking reachable objects; visit this object's own
    /// references (its slot values, its type, its prototype) and mark them
    /// too.
    Mark,
    /// The object is about to be finalized; release any non-GC resource it
    /// holds (nothing the core itself allocates, but an embedder's object
    /// may carry native handles).
    Free,
}

/// The collector's side of the mark/sweep protocol. An embedding VM
/// implements this once; the core calls it for every object reference it
/// discovers during a traversal (shallow clone, JSON serialization,
/// iteration) so the real allocator stays aware of the object graph's
/// shape without this crate depending on its internals.
pub trait Tracer {
    fn manage(&self, obj: &ObjRef, flag: ManageFlag);
}

/// Walk every reference a `PropertyObject` directly owns — its slot
/// values, its type, and (if it is itself a type) its prototype and
/// parent — reporting each one to `tracer`. An embedder's mark phase calls
/// this once per live object instead of re-deriving the core's object
/// layout itself.
pub fn trace_references(obj: &ObjRef, tracer: &dyn Tracer, flag: ManageFlag) {
    let guard = obj.read();

    if let Some(type_ref) = &guard.obj_type {
        tracer.manage(type_ref, flag);
    }

    for (_, slot) in guard.table().live_slots() {
        if let crate::core::value::ValueRef::Object(child) = &slot.value {
            tracer.manage(child, flag);
        }
        if let Some(declared_type) = &slot.trait_.declared_type {
            tracer.manage(declared_type, flag);
        }
    }

    if let Some(ext) = &guard.type_ext {
        if let Some(proto) = &ext.prototype {
            tracer.manage(proto, flag);
        }
        if let Some(parent) = &ext.parent {
            tracer.manage(parent, flag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::Conf;
    use crate::core::attr::Trait;
    use crate::core::name::Name;
    use crate::core::oop::{ObjectFlags, PropertyObject};
    use crate::core::value::ValueRef;
    use parking_lot::{Mutex, RwLock};
    use std::sync::Arc;

    struct RecordingTracer {
        marked: Mutex<Vec<usize>>,
    }

    impl Tracer for RecordingTracer {
        fn manage(&self, obj: &ObjRef, _flag: ManageFlag) {
            self.marked.lock().push(Arc::as_ptr(obj) as usize);
        }
    }

    #[test]
    fn trace_visits_nested_object_values() {
        let conf = Conf::default();
        let mut child = PropertyObject::new(None, ObjectFlags::DYNAMIC);
        child.define(&conf, Name::unspaced("leaf"), Trait::plain(), ValueRef::Number(1.0)).unwrap();
        let child_ref: ObjRef = Arc::new(RwLock::new(child));

        let mut parent = PropertyObject::new(None, ObjectFlags::DYNAMIC);
        parent
            .define(&conf, Name::unspaced("child"), Trait::plain(), ValueRef::Object(child_ref.clone()))
            .unwrap();
        let parent_ref: ObjRef = Arc::new(RwLock::new(parent));

        let tracer = RecordingTracer { marked: Mutex::new(Vec::new()) };
        trace_references(&parent_ref, &tracer, ManageFlag::Mark);

        let marked = tracer.marked.lock();
        assert!(marked.contains(&(Arc::as_ptr(&child_ref) as usize)));
    }

    #[test]
    fn trace_visits_each_slots_declared_type() {
        let conf = Conf::default();
        let type_obj: ObjRef = Arc::new(RwLock::new(PropertyObject::new_type(Name::unspaced("Number"), None)));

        let mut obj = PropertyObject::new(None, ObjectFlags::DYNAMIC);
        obj.define(
            &conf,
            Name::unspaced("x"),
            Trait::new(Some(type_obj.clone()), crate::core::attr::Attr::empty()),
            ValueRef::Number(1.0),
        )
        .unwrap();
        let obj_ref: ObjRef = Arc::new(RwLock::new(obj));

        let tracer = RecordingTracer { marked: Mutex::new(Vec::new()) };
        trace_references(&obj_ref, &tracer, ManageFlag::Mark);

        let marked = tracer.marked.lock();
        assert!(marked.contains(&(Arc::as_ptr(&type_obj) as usize)));
    }
}
