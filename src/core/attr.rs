/// Slot attribute bits and the `{declared_type, attributes}` trait pair
/// attached to every slot alongside its name and value.
use bitflags::bitflags;

use crate::core::oop::TypeRef;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attr: u32 {
        /// The slot's value is a getter function, not a plain value.
        const GETTER            = 1 << 0;
        /// The slot's value is a setter function.
        const SETTER            = 1 << 1;
        /// The slot cannot be assigned (`writable: false`).
        const READONLY          = 1 << 2;
        /// The slot's attributes and declared type cannot change
        /// (`configurable: false`).
        const FIXED             = 1 << 3;
        /// The slot is excluded from `getOwnPropertyNames`/JSON emission
        /// unless explicitly requested (`enumerable: false`).
        const HIDDEN            = 1 << 4;
        /// The slot has been deleted (tombstoned): its value was cleared to
        /// `undefined` and its declared type dropped, but the index is kept
        /// and is only ever reused by a later `define` of the same
        /// qualified name, never by an unrelated `insert`.
        const DELETED           = 1 << 5;
        /// The slot holds a type/module initializer function.
        const INITIALIZER       = 1 << 6;
        /// The slot holds a module-level initializer.
        const MODULE_INITIALIZER = 1 << 7;
        /// The slot holds a constructor function.
        const CONSTRUCTOR       = 1 << 8;
        /// The slot holds a static method (looked up on the type object,
        /// not on instances).
        const STATIC_METHOD     = 1 << 9;
        /// The slot holds a function implemented outside the interpreter.
        const NATIVE_FUNCTION   = 1 << 10;
    }
}

impl Attr {
    pub fn is_accessor(&self) -> bool {
        self.intersects(Attr::GETTER | Attr::SETTER)
    }

    pub fn is_enumerable(&self) -> bool {
        !self.contains(Attr::HIDDEN)
    }

    pub fn is_writable(&self) -> bool {
        !self.contains(Attr::READONLY)
    }

    pub fn is_configurable(&self) -> bool {
        !self.contains(Attr::FIXED)
    }

    /// Slots carrying any of these bits never surface in enumeration
    /// (§4.6) or `getOwnPropertyNames` (§4.7), regardless of any
    /// "include hidden" option — they are compiler bookkeeping, not
    /// user-visible properties. `HIDDEN` alone is not one of these: it is
    /// still excludable/includable per caller intent.
    pub fn is_compiler_internal(&self) -> bool {
        self.intersects(Attr::DELETED | Attr::INITIALIZER | Attr::MODULE_INITIALIZER)
    }
}

/// A slot's declared type plus its attribute bits. Two slots with identical
/// `Trait`s are structurally interchangeable for reflection purposes.
#[derive(Clone, Default)]
pub struct Trait {
    pub declared_type: Option<TypeRef>,
    pub attributes: Attr,
}

impl Trait {
    pub fn new(declared_type: Option<TypeRef>, attributes: Attr) -> Self {
        Trait { declared_type, attributes }
    }

    pub fn plain() -> Self {
        Trait::default()
    }

    pub fn readonly() -> Self {
        Trait { declared_type: None, attributes: Attr::READONLY }
    }

    pub fn hidden() -> Self {
        Trait { declared_type: None, attributes: Attr::HIDDEN }
    }
}
