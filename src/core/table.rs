/// The property table: a dense slot vector plus an optional hash index.
///
/// Small objects are scanned linearly; once `num_props` crosses
/// `Conf::min_hash_threshold` a hash index is built so that name lookup
/// stays close to O(1) as objects grow. The hash index buckets on the
/// short name only (namespaces never affect bucket choice — see
/// `core::name`), so a qualified lookup walks the bucket's chain comparing
/// full `Name`s and a short-name lookup stops at the first match, which is
/// the documented "ambiguous short-name" behavior in spec §4.2.
use crate::conf::Conf;
use crate::core::attr::{Attr, Trait};
use crate::core::name::{hash_code, Name};
use crate::core::slot::{Slot, CHAIN_END, CHAIN_UNHASHED};
use crate::core::value::ValueRef;

/// A slot counts as present for structural purposes (table.get, define's
/// reuse search) as soon as it has a name, tombstones included. `slot_is_live`
/// additionally excludes `DELETED` tombstones, which is what ordinary lookup
/// and hash-chain walks mean by "found".
fn slot_is_live(slot: &Slot) -> bool {
    !slot.is_empty() && !slot.trait_.attributes.contains(Attr::DELETED)
}

pub struct HashIndex {
    /// One bucket head per hash slot; `CHAIN_END` denotes an empty bucket.
    pub buckets: Vec<i32>,
    pub size: usize,
}

impl HashIndex {
    fn new(size: usize) -> Self {
        HashIndex { buckets: vec![CHAIN_END; size], size }
    }

    fn bucket_of(&self, name: &Name) -> usize {
        (hash_code(&name.name) as usize) % self.size
    }
}

#[derive(Default)]
pub struct PropertyTable {
    pub slots: Vec<Slot>,
    /// Number of live (non-deleted) slots. Always `<= slots.len()`.
    pub size: usize,
    pub hash: Option<HashIndex>,
}

impl PropertyTable {
    pub fn new() -> Self {
        PropertyTable { slots: Vec::new(), size: 0, hash: None }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, Slot::empty);
        PropertyTable { slots, size: 0, hash: None }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Grow the slot vector to hold at least `required` live properties,
    /// per the amortized growth policy in spec §4.1, then rebuild the hash
    /// index if one is warranted.
    pub fn grow(&mut self, conf: &Conf, required: usize) {
        let current = self.slots.len();
        if required <= current {
            return;
        }
        let target = conf.grow_size(current, required);
        conf.trace(format_args!("growing property table {} -> {}", current, target));
        self.slots.resize_with(target, Slot::empty);
        self.reindex(conf);
    }

    /// Rebuild the hash index from scratch (or tear it down if the table
    /// has shrunk below the threshold). Mirrors `ejsPot.c`'s
    /// `ejsIndexProperties`.
    pub fn reindex(&mut self, conf: &Conf) {
        if self.size <= conf.min_hash_threshold {
            self.hash = None;
            for slot in &mut self.slots {
                slot.hash_chain = CHAIN_UNHASHED;
            }
            return;
        }
        let hash_size = crate::conf::hash_size(self.slots.len());
        let mut index = HashIndex::new(hash_size);
        for slot in &mut self.slots {
            slot.hash_chain = CHAIN_UNHASHED;
        }
        for i in 0..self.slots.len() {
            if !slot_is_live(&self.slots[i]) {
                continue;
            }
            let bucket = index.bucket_of(&self.slots[i].name);
            self.slots[i].hash_chain = index.buckets[bucket];
            index.buckets[bucket] = i as i32;
        }
        self.hash = Some(index);
    }

    fn insert_into_hash(&mut self, slot_index: usize) {
        let Some(index) = self.hash.as_mut() else { return };
        let bucket = index.bucket_of(&self.slots[slot_index].name);
        self.slots[slot_index].hash_chain = index.buckets[bucket];
        index.buckets[bucket] = slot_index as i32;
    }

    fn remove_from_hash(&mut self, slot_index: usize) {
        let Some(index) = self.hash.as_mut() else { return };
        let bucket = index.bucket_of(&self.slots[slot_index].name);
        let mut cursor = index.buckets[bucket];
        if cursor == slot_index as i32 {
            index.buckets[bucket] = self.slots[slot_index].hash_chain;
            self.slots[slot_index].hash_chain = CHAIN_UNHASHED;
            return;
        }
        while cursor != CHAIN_END && cursor != CHAIN_UNHASHED {
            let next = self.slots[cursor as usize].hash_chain;
            if next == slot_index as i32 {
                self.slots[cursor as usize].hash_chain = self.slots[slot_index].hash_chain;
                self.slots[slot_index].hash_chain = CHAIN_UNHASHED;
                return;
            }
            cursor = next;
        }
    }

    /// Insert `slot` at the first empty index (or append), growing first
    /// if the table is full. Returns the slot's index.
    pub fn insert(&mut self, conf: &Conf, slot: Slot) -> usize {
        let idx = self.slots.iter().position(|s| s.is_empty());
        let idx = match idx {
            Some(idx) => idx,
            None => {
                self.grow(conf, self.slots.len() + 1);
                self.slots.len() - 1
            }
        };
        self.slots[idx] = slot;
        self.size += 1;
        if self.hash.is_none() && self.size > conf.min_hash_threshold {
            self.reindex(conf);
        } else {
            self.insert_into_hash(idx);
        }
        idx
    }

    /// Physically drop slot `idx`, emptying its name and reclaiming its
    /// index for a later `insert`. Compile-time only (spec §4.4) — unsafe
    /// once any slot index has been bound into compiled code. Runtime
    /// deletion goes through `tombstone` instead, via `PropertyObject::delete`.
    pub fn remove(&mut self, idx: usize) {
        if idx >= self.slots.len() || self.slots[idx].is_empty() {
            return;
        }
        self.remove_from_hash(idx);
        self.slots[idx] = Slot::empty();
        self.size = self.size.saturating_sub(1);
    }

    /// Mark slot `idx` deleted in place per spec §4.4: write `undefined`,
    /// clear the declared type, set `DELETED|HIDDEN`, and unlink it from the
    /// hash index. The slot keeps its name and its index — the index is
    /// never reused except by `define`'s redefine-by-name rule, and the live
    /// count (`size`) is not decremented.
    pub fn tombstone(&mut self, idx: usize) {
        if idx >= self.slots.len() || self.slots[idx].is_empty() {
            return;
        }
        self.remove_from_hash(idx);
        let slot = &mut self.slots[idx];
        slot.value = ValueRef::Undefined;
        slot.trait_.declared_type = None;
        slot.trait_.attributes |= Attr::DELETED | Attr::HIDDEN;
    }

    /// Find a slot by exact qualified name, including `DELETED` tombstones —
    /// distinct from `find_qualified`, which only ever matches a live slot.
    /// Used by `define`'s reuse-by-name rule: redefining a deleted name must
    /// revive the original slot index rather than append a new one.
    pub fn find_any_by_name(&self, name: &Name) -> Option<usize> {
        self.slots.iter().position(|s| !s.is_empty() && s.name.qualified_eq(name))
    }

    /// Overwrite slot `idx`'s name/trait/value in place and relink it into
    /// the hash index if one exists. Used to redefine a property — including
    /// reviving a tombstoned slot — without allocating a new index. Unlike
    /// `insert`, this never changes `size`.
    pub fn overwrite(&mut self, idx: usize, name: Name, trait_: Trait, value: ValueRef) {
        self.remove_from_hash(idx);
        self.slots[idx] = Slot::new(name, trait_, value);
        if self.hash.is_some() {
            self.insert_into_hash(idx);
        }
    }

    /// Drop tombstones, compacting live slots to the front and rebuilding
    /// the hash index. Only ever run during compile-time table
    /// construction, never while the object is live (per spec §4.1).
    pub fn compact(&mut self, conf: &Conf) {
        let mut live: Vec<Slot> = self
            .slots
            .drain(..)
            .filter(|s| !s.is_empty())
            .collect();
        for slot in &mut live {
            slot.hash_chain = CHAIN_UNHASHED;
        }
        self.slots = live;
        self.reindex(conf);
    }

    /// Ambiguity-aware lookup (spec §4.2): with a namespace given, this is a
    /// qualified lookup — the first matching slot wins. Without one, a
    /// short-name match only counts if it is unique among live slots; two or
    /// more slots sharing the short name report "not found" (ambiguous),
    /// the same as no match at all.
    pub fn lookup(&self, name: &Name) -> Option<usize> {
        if name.space.is_some() {
            return self.find_qualified(name);
        }
        if let Some(index) = &self.hash {
            let mut cursor = index.buckets[index.bucket_of(name)];
            let mut found = None;
            while cursor != CHAIN_END && cursor != CHAIN_UNHASHED {
                let slot = &self.slots[cursor as usize];
                if slot_is_live(slot) && slot.name.short_eq(name) {
                    if found.is_some() {
                        return None;
                    }
                    found = Some(cursor as usize);
                }
                cursor = slot.hash_chain;
            }
            return found;
        }
        let mut found = None;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot_is_live(slot) && slot.name.short_eq(name) {
                if found.is_some() {
                    return None;
                }
                found = Some(i);
            }
        }
        found
    }

    /// Qualified lookup restricted to an ordered list of namespaces: the
    /// first slot (in `namespaces` order, then table order) whose full
    /// qualified name matches. An empty `namespaces` list falls back to
    /// the ambiguous short-name rule used by `lookup`.
    pub fn lookup_in(&self, namespaces: &[Option<&str>], short_name: &str) -> Option<usize> {
        if namespaces.is_empty() {
            let probe = Name::unspaced(short_name);
            return self.lookup(&probe);
        }
        for space in namespaces {
            let candidate = Name::new(*space, short_name);
            if let Some(idx) = self.find_qualified(&candidate) {
                return Some(idx);
            }
        }
        None
    }

    fn find_qualified(&self, name: &Name) -> Option<usize> {
        if let Some(index) = &self.hash {
            let mut cursor = index.buckets[index.bucket_of(name)];
            while cursor != CHAIN_END && cursor != CHAIN_UNHASHED {
                let slot = &self.slots[cursor as usize];
                if slot_is_live(slot) && slot.name.qualified_eq(name) {
                    return Some(cursor as usize);
                }
                cursor = slot.hash_chain;
            }
            return None;
        }
        self.slots.iter().position(|s| slot_is_live(s) && s.name.qualified_eq(name))
    }

    /// A deleted (tombstoned) slot is still a valid index that reports
    /// `undefined` — only an index past the slot vector's length, or one
    /// that was never used, returns `None` here.
    pub fn get(&self, idx: usize) -> Option<&Slot> {
        self.slots.get(idx).filter(|s| !s.is_empty())
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Slot> {
        if self.slots.get(idx).map(|s| s.is_empty()).unwrap_or(true) {
            return None;
        }
        self.slots.get_mut(idx)
    }

    pub fn count(&self) -> usize {
        self.size
    }

    /// Named slots in table order, `DELETED` tombstones included — callers
    /// that enumerate own properties (`PropertyObject::own_names`/
    /// `own_values`, JSON emission) apply their own attribute filter on top
    /// of this.
    pub fn live_slots(&self) -> impl Iterator<Item = (usize, &Slot)> {
        self.slots.iter().enumerate().filter(|(_, s)| !s.is_empty())
    }
}

impl Clone for PropertyTable {
    fn clone(&self) -> Self {
        let conf = Conf::default();
        let mut table = PropertyTable {
            slots: self.slots.clone(),
            size: self.size,
            hash: None,
        };
        table.reindex(&conf);
        table
    }
}
