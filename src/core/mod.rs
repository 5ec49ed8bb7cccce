/// Core value and object-model types: names, traits, slots, the property
/// table, the object header, and the operations/reflection/JSON/coercion
/// surfaces built on top of them.
pub mod name;
pub mod attr;
pub mod slot;
pub mod table;
pub mod value;
pub mod oop;
pub mod ops;
pub mod reflect;
pub mod json;
pub mod coerce;

pub use attr::{Attr, Trait};
pub use name::{InternedStr, Interner, Name};
pub use oop::{ObjRef, ObjectFlags, PropertyObject, TableStorage, TypeExt, TypeRef};
pub use slot::Slot;
pub use table::{HashIndex, PropertyTable};
pub use value::{FunctionRef, Invoker, ValueRef};
