/// Namespace-qualified property names.
///
/// A `Name` is a `(space, name)` pair. Both components are interned string
/// handles; equality is pointer-identity first, falling back to a byte
/// compare only when the handles differ (kept for interners built outside
/// the canonical `Interner::intern` path). Hashing a `Name` only ever
/// touches the `name` component — the namespace participates in comparison,
/// never in the hash bucket choice.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

/// An interned string handle. Cloning is a reference-count bump, not a copy.
#[derive(Clone)]
pub struct InternedStr(Arc<str>);

impl InternedStr {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for InternedStr {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for InternedStr {}

impl std::hash::Hash for InternedStr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_ref().hash(state);
    }
}

impl fmt::Debug for InternedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for InternedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// String interner. The core treats this as an external collaborator (per
/// spec §9's design note); this crate ships one concrete implementation so
/// it is independently testable, but an embedding VM is free to supply its
/// own so long as equal strings produce equal handles.
pub struct Interner {
    table: RwLock<HashMap<Box<str>, InternedStr>>,
}

impl Interner {
    pub fn new() -> Self {
        Interner { table: RwLock::new(HashMap::new()) }
    }

    pub fn intern(&self, s: &str) -> InternedStr {
        if let Some(found) = self.table.read().get(s) {
            return found.clone();
        }
        let mut table = self.table.write();
        if let Some(found) = table.get(s) {
            return found.clone();
        }
        let handle = InternedStr(Arc::from(s));
        table.insert(s.into(), handle.clone());
        handle
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_INTERNER: Lazy<Interner> = Lazy::new(Interner::new);
static EMPTY_NAME: Lazy<InternedStr> = Lazy::new(|| GLOBAL_INTERNER.intern(""));

/// Intern `s` in the crate's default global interner.
pub fn intern(s: &str) -> InternedStr {
    GLOBAL_INTERNER.intern(s)
}

/// The interned empty string, used as the sentinel "no name" value for
/// unused slots.
pub fn empty_str() -> InternedStr {
    EMPTY_NAME.clone()
}

/// A namespace-qualified property name: `space` is `None` for an unspaced
/// (plain) name.
#[derive(Clone, PartialEq, Eq)]
pub struct Name {
    pub space: Option<InternedStr>,
    pub name: InternedStr,
}

impl Name {
    pub fn new(space: Option<&str>, name: &str) -> Self {
        Name { space: space.map(intern), name: intern(name) }
    }

    pub fn unspaced(name: &str) -> Self {
        Name { space: None, name: intern(name) }
    }

    pub fn interned(space: Option<InternedStr>, name: InternedStr) -> Self {
        Name { space, name }
    }

    pub fn empty() -> Self {
        Name { space: None, name: empty_str() }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn short(&self) -> &str {
        self.name.as_str()
    }

    /// Qualified equality: both the namespace and the short name must match.
    pub fn qualified_eq(&self, other: &Name) -> bool {
        self.space == other.space && self.name == other.name
    }

    /// Short-name equality: the namespace is ignored.
    pub fn short_eq(&self, other: &Name) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.space {
            Some(space) => write!(f, "{}::{}", space, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Paul Hsieh's SuperFastHash, operating over the short name's raw bytes
/// only. Deterministic and well-distributed across ASCII identifiers; the
/// empty name hashes to zero.
pub fn hash_code(name: &InternedStr) -> u32 {
    super_fast_hash(name.as_str().as_bytes())
}

pub fn super_fast_hash(data: &[u8]) -> u32 {
    if data.is_empty() {
        return 0;
    }
    let mut hash: u32 = data.len() as u32;
    let mut len = data.len();
    let mut i = 0usize;

    let rem = len & 3;
    len >>= 2;

    while len > 0 {
        let a = get16(data, i);
        hash = hash.wrapping_add(a);
        let b = get16(data, i + 2) << 11;
        let tmp = b ^ hash;
        hash = (hash << 16).wrapping_add(tmp);
        i += 4;
        hash = hash.wrapping_add(hash >> 11);
        len -= 1;
    }

    match rem {
        3 => {
            hash = hash.wrapping_add(get16(data, i));
            hash ^= hash << 16;
            hash ^= (data[i + 2] as u32) << 18;
            hash = hash.wrapping_add(hash >> 11);
        }
        2 => {
            hash = hash.wrapping_add(get16(data, i));
            hash ^= hash << 11;
            hash = hash.wrapping_add(hash >> 17);
        }
        1 => {
            hash = hash.wrapping_add(data[i] as u32);
            hash ^= hash << 10;
            hash = hash.wrapping_add(hash >> 1);
        }
        _ => {}
    }

    hash ^= hash << 3;
    hash = hash.wrapping_add(hash >> 5);
    hash ^= hash << 4;
    hash = hash.wrapping_add(hash >> 17);
    hash ^= hash << 25;
    hash = hash.wrapping_add(hash >> 6);
    hash
}

fn get16(data: &[u8], i: usize) -> u32 {
    (data[i] as u32) | ((data[i + 1] as u32) << 8)
}
