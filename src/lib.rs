/// protocore
///
/// The object/property core of a dynamic scripting runtime: slot-indexed
/// property tables, namespace-qualified name resolution, prototype-sharing
/// object layout, and a reflection/introspection surface with JSON
/// serialization.
///
/// Module layout:
///   - conf   — tunable configuration (hash thresholds, growth rounding,
///              JSON defaults, debug tracing)
///   - errors — the `CoreError` taxonomy scripts observe out of this crate
///   - gc     — the `Tracer`/`manage` boundary a real collector hooks into
///   - core   — names, slots, the property table, the object header, and
///              the operations/reflection/JSON/coercion surfaces built on
///              top of them
pub mod conf;
pub mod core;
pub mod errors;
pub mod gc;

pub use conf::Conf;
pub use core::attr::{Attr, Trait};
pub use core::coerce::{cast, display_string, logical_not, operator, to_locale_string, CastTarget, Op};
pub use core::json::{to_json, JsonOptions};
pub use core::name::{InternedStr, Interner, Name};
pub use core::ops::{
    clone, clone_object, count, define, delete, delete_by_name, get, get_name, get_property,
    get_trait, grow, lookup, lookup_in, set, set_name, set_property, set_trait,
};
pub use core::oop::{ObjRef, ObjectFlags, PropertyObject, TableStorage, TypeExt, TypeRef};
pub use core::reflect::{
    define_property, describe, describe_in, freeze, get_own_prototype_of,
    get_own_property_count, get_own_property_names, has_own_property, is_extensible, is_frozen,
    is_prototype_of, own_names_enumerable, own_values, prevent_extensions, property_is_enumerable,
    seal, PropertyDescriptor,
};
pub use core::slot::Slot;
pub use core::table::{HashIndex, PropertyTable};
pub use core::value::{FunctionRef, Invoker, ValueRef};
pub use errors::{CoreError, CoreResult, Span};
pub use gc::{trace_references, ManageFlag, Tracer};
