/// Operator coercion and cast rules (spec §4.9).
///
/// `operator` implements the binary comparison/arithmetic coercions a
/// script-level `==`/`<`/`+`/etc. desugars to; `cast` implements the
/// built-in `Boolean`/`Number`/`String`/`global` cast targets plus the
/// meta-level override a type can install via `TypeCapabilities`; both
/// stay oblivious to any concrete type beyond the primitive `ValueRef`
/// variants, deferring to `Invoker` for anything script-defined.
use crate::core::value::{Invoker, ValueRef};
use crate::errors::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Ge,
    Gt,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    StrictEq,
    StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastTarget {
    Boolean,
    Number,
    String,
    Global,
}

fn to_number(value: &ValueRef) -> f64 {
    match value {
        ValueRef::Undefined => f64::NAN,
        ValueRef::Null => 0.0,
        ValueRef::Bool(b) => if *b { 1.0 } else { 0.0 },
        ValueRef::Number(n) => *n,
        ValueRef::Str(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        ValueRef::Array(arr) => {
            let items = arr.read();
            match items.len() {
                0 => 0.0,
                1 => to_number(&items[0]),
                _ => f64::NAN,
            }
        }
        ValueRef::Object(_) | ValueRef::Function(_) | ValueRef::Accessor { .. } => f64::NAN,
    }
}

/// Apply coercion rules and evaluate `op`. Structural equality (`==`/`!=`)
/// coerces operands to a common type before comparing; strict equality
/// (`===`/`!==`) never coerces and requires identical variant *and* type.
/// Arithmetic other than `+` always coerces both sides to `Number`; `+`
/// coerces to `String` if either side is already a string.
pub fn operator(op: Op, left: &ValueRef, right: &ValueRef) -> CoreResult<ValueRef> {
    match op {
        Op::StrictEq => Ok(ValueRef::Bool(strict_equals(left, right))),
        Op::StrictNe => Ok(ValueRef::Bool(!strict_equals(left, right))),
        Op::Eq => Ok(ValueRef::Bool(loose_equals(left, right))),
        Op::Ne => Ok(ValueRef::Bool(!loose_equals(left, right))),
        Op::Lt | Op::Le | Op::Ge | Op::Gt => compare(op, left, right),
        Op::Add => add(left, right),
        Op::Sub => Ok(ValueRef::Number(to_number(left) - to_number(right))),
        Op::Mul => Ok(ValueRef::Number(to_number(left) * to_number(right))),
        Op::Div => Ok(ValueRef::Number(to_number(left) / to_number(right))),
        Op::Mod => Ok(ValueRef::Number(to_number(left) % to_number(right))),
    }
}

fn add(left: &ValueRef, right: &ValueRef) -> CoreResult<ValueRef> {
    if matches!(left, ValueRef::Str(_)) || matches!(right, ValueRef::Str(_)) {
        let mut s = display_string(left, None)?;
        s.push_str(&display_string(right, None)?);
        return Ok(ValueRef::str(s));
    }
    Ok(ValueRef::Number(to_number(left) + to_number(right)))
}

fn compare(op: Op, left: &ValueRef, right: &ValueRef) -> CoreResult<ValueRef> {
    let ordering = if let (ValueRef::Str(a), ValueRef::Str(b)) = (left, right) {
        a.as_ref().partial_cmp(b.as_ref())
    } else {
        to_number(left).partial_cmp(&to_number(right))
    };
    let Some(ordering) = ordering else { return Ok(ValueRef::Bool(false)) };
    let result = match op {
        Op::Lt => ordering.is_lt(),
        Op::Le => ordering.is_le(),
        Op::Ge => ordering.is_ge(),
        Op::Gt => ordering.is_gt(),
        _ => unreachable!(),
    };
    Ok(ValueRef::Bool(result))
}

/// `===`: variants must match exactly; numbers and strings compare by
/// value, objects/functions/arrays by reference identity.
pub fn strict_equals(left: &ValueRef, right: &ValueRef) -> bool {
    match (left, right) {
        (ValueRef::Undefined, ValueRef::Undefined) => true,
        (ValueRef::Null, ValueRef::Null) => true,
        (ValueRef::Bool(a), ValueRef::Bool(b)) => a == b,
        (ValueRef::Number(a), ValueRef::Number(b)) => a == b,
        (ValueRef::Str(a), ValueRef::Str(b)) => a == b,
        (ValueRef::Array(a), ValueRef::Array(b)) => std::sync::Arc::ptr_eq(a, b),
        (ValueRef::Object(a), ValueRef::Object(b)) => std::sync::Arc::ptr_eq(a, b),
        (ValueRef::Function(a), ValueRef::Function(b)) => std::sync::Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// `==`: `Null`/`Undefined` are mutually loose-equal and equal only to each
/// other; everything else coerces through `Number` unless both sides are
/// already strings or already bools of the same kind.
pub fn loose_equals(left: &ValueRef, right: &ValueRef) -> bool {
    match (left, right) {
        (ValueRef::Undefined | ValueRef::Null, ValueRef::Undefined | ValueRef::Null) => true,
        (ValueRef::Str(a), ValueRef::Str(b)) => a == b,
        (ValueRef::Bool(a), ValueRef::Bool(b)) => a == b,
        (ValueRef::Array(a), ValueRef::Array(b)) => std::sync::Arc::ptr_eq(a, b),
        (ValueRef::Object(a), ValueRef::Object(b)) => std::sync::Arc::ptr_eq(a, b),
        (ValueRef::Function(a), ValueRef::Function(b)) => std::sync::Arc::ptr_eq(a, b),
        (ValueRef::Undefined | ValueRef::Null, _) | (_, ValueRef::Undefined | ValueRef::Null) => false,
        _ => to_number(left) == to_number(right),
    }
}

/// `!` — logical negation of the operand's truthiness.
pub fn logical_not(value: &ValueRef) -> ValueRef {
    ValueRef::Bool(!value.is_truthy())
}

/// Cast `value` to `target`. Types implementing `TypeCapabilities::
/// has_cast_override` should be intercepted by the caller before reaching
/// here (the core has no type-identity notion beyond `ValueRef::Object`);
/// this function only ever implements the built-in fallback targets.
pub fn cast(value: &ValueRef, target: CastTarget, invoker: Option<&dyn Invoker>) -> CoreResult<ValueRef> {
    match target {
        CastTarget::Boolean => Ok(ValueRef::Bool(value.is_truthy())),
        CastTarget::Number => Ok(ValueRef::Number(to_number(value))),
        CastTarget::String => Ok(ValueRef::str(display_string(value, invoker)?)),
        CastTarget::Global => match value {
            ValueRef::Object(_) => Ok(value.clone()),
            _ => Err(CoreError::type_error(format!(
                "cannot cast {} to global",
                value.type_name()
            ))),
        },
    }
}

/// `toString`/default display. Delegates to the `Invoker` for object and
/// function values so a script-defined `toString` override is honored;
/// falls back to a structural rendering when no invoker is supplied or the
/// invoker declines (returns `None`).
pub fn display_string(value: &ValueRef, invoker: Option<&dyn Invoker>) -> CoreResult<String> {
    if let Some(invoker) = invoker {
        if let Some(s) = invoker.to_display_string(value) {
            return Ok(s);
        }
    }
    Ok(match value {
        ValueRef::Undefined => "undefined".to_string(),
        ValueRef::Null => "null".to_string(),
        ValueRef::Bool(b) => b.to_string(),
        ValueRef::Number(n) => {
            if *n == n.floor() && n.is_finite() {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        ValueRef::Str(s) => s.to_string(),
        ValueRef::Array(arr) => {
            let items = arr.read();
            let parts: CoreResult<Vec<String>> =
                items.iter().map(|v| display_string(v, invoker)).collect();
            parts?.join(",")
        }
        ValueRef::Object(_) => "[object Object]".to_string(),
        ValueRef::Function(f) => format!("{:?}", f),
        ValueRef::Accessor { .. } => "[object Accessor]".to_string(),
    })
}

/// `toLocaleString`: defaults to `toString` unless the type overrides it,
/// which the caller signals by passing an `Invoker` whose
/// `to_display_string` already accounts for the locale-specific override.
pub fn to_locale_string(value: &ValueRef, invoker: Option<&dyn Invoker>) -> CoreResult<String> {
    display_string(value, invoker)
}
