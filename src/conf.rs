/// Runtime configuration for the property/object core.
///
/// Mirrors the interpreter's documented-property-table style (see the
/// language toolchain's own `conf` module) but is narrowed to the handful of
/// constants the slot table and JSON serializer actually consult.

/// A single tunable, documented the way the rest of the toolchain documents
/// its configuration surface.
#[derive(Debug, Clone, Copy)]
pub struct PropDef {
    pub name: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

pub static ALL_PROPS: &[PropDef] = &[
    PropDef {
        name: "min_hash_threshold",
        default: "8",
        description: "Number of properties above which a PropertyTable builds a hash index instead of scanning linearly.",
    },
    PropDef {
        name: "lotsa",
        default: "256",
        description: "Slot-vector size above which growth is amortized in max(size/4, round) chunks instead of exact roundup.",
    },
    PropDef {
        name: "round",
        default: "16",
        description: "Rounding unit used both below and above the `lotsa` coarseness threshold.",
    },
    PropDef {
        name: "json_default_depth",
        default: "99",
        description: "Default recursion depth for toJSON when the caller does not specify one.",
    },
    PropDef {
        name: "debug",
        default: "off",
        description: "When on, slot growth, hash rebuilds, and copy-on-write table splits are traced to stderr.",
    },
];

/// Ascending prime hash-table sizes. `hash_size` picks the first entry that
/// is `>=` the requested property count.
pub static HASH_SIZES: &[usize] = &[
    19, 29, 59, 79, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613,
];

/// Smallest prime hash-table size `>= n`, or the largest prime if `n`
/// exceeds every entry in the table.
pub fn hash_size(n: usize) -> usize {
    for &candidate in HASH_SIZES {
        if candidate >= n {
            return candidate;
        }
    }
    *HASH_SIZES.last().expect("HASH_SIZES is non-empty")
}

#[derive(Debug, Clone, Copy)]
pub struct Conf {
    /// Build a hash index once `num_props` exceeds this.
    pub min_hash_threshold: usize,
    /// Slot-vector size above which growth is amortized.
    pub lotsa: usize,
    /// Rounding unit for slot-vector growth.
    pub round: usize,
    /// Default `depth` option for `toJSON` when unspecified.
    pub json_default_depth: u32,
    /// Trace slot growth / hash rebuild / copy-on-write splits to stderr.
    pub debug: bool,
}

impl Default for Conf {
    fn default() -> Self {
        Conf {
            min_hash_threshold: 8,
            lotsa: 256,
            round: 16,
            json_default_depth: 99,
            debug: false,
        }
    }
}

impl Conf {
    pub fn describe(name: &str) -> Option<&'static PropDef> {
        ALL_PROPS.iter().find(|p| p.name == name)
    }

    /// Round `required` up to a multiple of `self.round`, or for
    /// required sizes above `self.lotsa`, amortize the increment as
    /// `max(current / 4, round)` first. See spec §4.1.
    pub fn grow_size(&self, current: usize, required: usize) -> usize {
        if required <= current {
            return current;
        }
        let mut target = required;
        if target > self.lotsa {
            let factor = (current / 4).max(self.round);
            target = (target + factor - 1) / factor * factor;
        }
        let round = self.round.max(1);
        (target + round - 1) / round * round
    }

    pub(crate) fn trace(&self, message: std::fmt::Arguments<'_>) {
        if self.debug {
            eprintln!("[protocore] {}", message);
        }
    }
}
