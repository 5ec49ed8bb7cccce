/// The value representation the property core stores inside a slot.
///
/// Everything that isn't an object graph node is kept deliberately opaque
/// here — the core's job is slot storage and reflection, not arithmetic or
/// string semantics, so `ValueRef` carries just enough structure for
/// equality, display, and the coercion rules in `core::coerce` to operate
/// on, while function bodies and native callables stay behind the
/// `Invoker` seam so the embedding VM owns them.
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::oop::ObjRef;

/// A function value. The core never executes one directly; it only ever
/// hands it to an `Invoker`, so the body is an opaque, embedder-supplied
/// handle rather than an AST or bytecode blob.
pub struct FunctionRef {
    pub name: Option<Arc<str>>,
    pub native: bool,
    handle: usize,
}

impl FunctionRef {
    pub fn new(name: Option<&str>, native: bool, handle: usize) -> Self {
        FunctionRef { name: name.map(Arc::from), native, handle }
    }

    /// Embedder-defined identity for this function (an index into whatever
    /// table the VM keeps real function bodies in).
    pub fn handle(&self) -> usize {
        self.handle
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<function {}>", name),
            None => write!(f, "<anonymous function>"),
        }
    }
}

impl PartialEq for FunctionRef {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

/// The value stored in a slot. `Object` and `Function` are reference kinds;
/// `Str`/`Array` share their backing storage on clone the way the rest of
/// the value graph does.
#[derive(Clone)]
pub enum ValueRef {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Arc<str>),
    Array(Arc<RwLock<Vec<ValueRef>>>),
    Object(ObjRef),
    Function(Arc<FunctionRef>),
    /// A merged getter/setter pair, per spec §4.3's accessor-merge rule.
    /// Either half may be absent: a setter-only accessor has `get: None`
    /// (a no-op getter) and a getter-only one has `set: None`.
    Accessor { get: Option<Arc<FunctionRef>>, set: Option<Arc<FunctionRef>> },
}

impl fmt::Debug for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRef::Undefined => write!(f, "undefined"),
            ValueRef::Null => write!(f, "null"),
            ValueRef::Bool(b) => write!(f, "{}", b),
            ValueRef::Number(n) => write!(f, "{}", n),
            ValueRef::Str(s) => write!(f, "{:?}", s),
            ValueRef::Array(a) => write!(f, "Array(len={})", a.read().len()),
            ValueRef::Object(_) => write!(f, "<object>"),
            ValueRef::Function(fun) => write!(f, "{:?}", fun),
            ValueRef::Accessor { get, set } => {
                write!(f, "<accessor get={} set={}>", get.is_some(), set.is_some())
            }
        }
    }
}

impl ValueRef {
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        ValueRef::Str(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ValueRef::Undefined => "undefined",
            ValueRef::Null => "null",
            ValueRef::Bool(_) => "boolean",
            ValueRef::Number(_) => "number",
            ValueRef::Str(_) => "string",
            ValueRef::Array(_) => "array",
            ValueRef::Object(_) => "object",
            ValueRef::Function(_) => "function",
            ValueRef::Accessor { .. } => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            ValueRef::Undefined | ValueRef::Null => false,
            ValueRef::Bool(b) => *b,
            ValueRef::Number(n) => *n != 0.0 && !n.is_nan(),
            ValueRef::Str(s) => !s.is_empty(),
            ValueRef::Array(_) => true,
            ValueRef::Object(_) => true,
            ValueRef::Function(_) => true,
            ValueRef::Accessor { .. } => true,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, ValueRef::Object(_))
    }

    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            ValueRef::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Arc<FunctionRef>> {
        match self {
            ValueRef::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ValueRef::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ValueRef::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Runs the script-level callbacks the property core needs but does not
/// implement itself: getters, setters, `toString`/`toLocaleString`, and
/// JSON `replacer` functions. An embedding interpreter supplies one
/// implementation; the core is otherwise free of any notion of calling
/// convention, stack frames, or bytecode.
pub trait Invoker {
    /// Call `getter` with no arguments and `this` bound to `receiver`.
    fn call_getter(&self, getter: &FunctionRef, receiver: &ValueRef) -> Result<ValueRef, String>;

    /// Call `setter` with `value` as its sole argument and `this` bound to
    /// `receiver`.
    fn call_setter(
        &self,
        setter: &FunctionRef,
        receiver: &ValueRef,
        value: &ValueRef,
    ) -> Result<(), String>;

    /// Produce the display string for a value whose type overrides
    /// `toString`/`toLocaleString`. Returns `None` to tell the caller to
    /// fall back to the core's built-in stringification.
    fn to_display_string(&self, value: &ValueRef) -> Option<String>;

    /// Run a JSON `replacer(key, value)` callback, returning the
    /// replacement value.
    fn call_replacer(
        &self,
        replacer: &FunctionRef,
        key: &str,
        value: &ValueRef,
    ) -> Result<ValueRef, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_common_coercion_rules() {
        assert!(!ValueRef::Undefined.is_truthy());
        assert!(!ValueRef::Null.is_truthy());
        assert!(!ValueRef::Number(0.0).is_truthy());
        assert!(!ValueRef::Number(f64::NAN).is_truthy());
        assert!(ValueRef::Number(1.0).is_truthy());
        assert!(!ValueRef::str("").is_truthy());
        assert!(ValueRef::str("x").is_truthy());
    }

    #[test]
    fn type_names_are_stable() {
        assert_eq!(ValueRef::Undefined.type_name(), "undefined");
        assert_eq!(ValueRef::Bool(true).type_name(), "boolean");
        assert_eq!(ValueRef::str("x").type_name(), "string");
    }

    #[test]
    fn function_ref_equality_is_by_handle() {
        let a = FunctionRef::new(Some("f"), false, 1);
        let b = FunctionRef::new(Some("f"), false, 1);
        let c = FunctionRef::new(Some("f"), false, 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
