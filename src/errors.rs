/// Core error taxonomy for the property/object runtime.
///
/// Every error a script can observe out of this crate is one of the four
/// kinds below, each carrying a `CORE_nnn` code in the same spirit as the
/// rest of the interpreter's `[AXM_nnn]`-tagged diagnostics.
use thiserror::Error;

use crate::core::name::Name;

/// A byte-offset span into a source file, carried through for callers that
/// want to attach position information to a thrown error. The core itself
/// never inspects a span's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub source_id: u32,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(source_id: u32, start: usize, end: usize) -> Self {
        Span { source_id, start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            source_id: self.source_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("[CORE_101] TypeError: {message}")]
    TypeError { message: String },

    #[error("[CORE_201] ReferenceError: {message}")]
    ReferenceError { message: String },

    #[error("[CORE_301] ArgError: {message}")]
    ArgError { message: String },

    #[error("[CORE_401] MemoryError: {message}")]
    MemoryError { message: String },
}

impl CoreError {
    pub fn type_error(message: impl Into<String>) -> Self {
        CoreError::TypeError { message: message.into() }
    }

    pub fn reference_error(message: impl Into<String>) -> Self {
        CoreError::ReferenceError { message: message.into() }
    }

    pub fn arg_error(message: impl Into<String>) -> Self {
        CoreError::ArgError { message: message.into() }
    }

    pub fn memory_error(message: impl Into<String>) -> Self {
        CoreError::MemoryError { message: message.into() }
    }

    pub fn not_configurable(name: &Name) -> Self {
        CoreError::TypeError {
            message: format!("property '{}' is not configurable", name.short()),
        }
    }

    pub fn not_extendable() -> Self {
        CoreError::ReferenceError { message: "object is not extendable".to_string() }
    }

    pub fn object_is_null() -> Self {
        CoreError::ReferenceError { message: "object is null".to_string() }
    }

    pub fn object_is_undefined() -> Self {
        CoreError::ReferenceError { message: "object is undefined".to_string() }
    }

    pub fn slot_out_of_range(slot: i32) -> Self {
        CoreError::ReferenceError { message: format!("slot {} is out of range", slot) }
    }

    pub fn unknown_property(name: &str) -> Self {
        CoreError::ReferenceError { message: format!("property '{}' does not exist", name) }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
