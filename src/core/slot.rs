/// A single property cell: the slot-indexed unit of storage that the
/// vector-plus-hash-chain `PropertyTable` is built from.
use crate::core::attr::Trait;
use crate::core::name::Name;
use crate::core::value::ValueRef;

/// Sentinel chain link meaning "not hashed" (a fresh or just-removed slot).
pub const CHAIN_UNHASHED: i32 = -1;
/// Sentinel chain link meaning "end of chain" (the last hashed slot in a
/// bucket).
pub const CHAIN_END: i32 = -2;

#[derive(Clone)]
pub struct Slot {
    pub name: Name,
    pub trait_: Trait,
    pub value: ValueRef,
    /// Index of the next slot in this name's hash bucket, or one of the
    /// `CHAIN_*` sentinels.
    pub hash_chain: i32,
}

impl Slot {
    pub fn new(name: Name, trait_: Trait, value: ValueRef) -> Self {
        Slot { name, trait_, value, hash_chain: CHAIN_UNHASHED }
    }

    /// An empty, reusable slot: the sentinel state `PropertyTable::grow`
    /// fills freshly-allocated capacity with.
    pub fn empty() -> Self {
        Slot {
            name: Name::empty(),
            trait_: Trait::plain(),
            value: ValueRef::Undefined,
            hash_chain: CHAIN_UNHASHED,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}
