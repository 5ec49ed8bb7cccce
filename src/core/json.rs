/// Cycle-safe, depth-bounded JSON serialization (spec §4.8).
///
/// Values are written directly into a `String` rather than through an
/// intermediate tree, the way the rest of the core favors hand-rolled
/// recursive formatters over building throwaway structures. Object
/// identity cycles are broken with the `VISITED` object flag rather than a
/// side-table, since every object already carries that bit.
use std::fmt::Write as _;

use crate::core::name::Name;
use crate::core::oop::{ObjRef, ObjectFlags};
use crate::core::value::{FunctionRef, Invoker, ValueRef};
use crate::errors::{CoreError, CoreResult};

#[derive(Clone)]
pub struct JsonOptions<'a> {
    pub pretty: bool,
    pub indent: usize,
    /// Include `HIDDEN` slots in the output.
    pub hidden: bool,
    /// Prefix each key with `namespace::` when the property is namespaced.
    pub namespaces: bool,
    /// Also emit non-shadowed slots inherited from the object's type's
    /// ancestor prototypes.
    pub base_classes: bool,
    pub depth: u32,
    pub replacer: Option<&'a FunctionRef>,
}

impl<'a> Default for JsonOptions<'a> {
    fn default() -> Self {
        JsonOptions {
            pretty: false,
            indent: 2,
            hidden: false,
            namespaces: false,
            base_classes: false,
            depth: 99,
            replacer: None,
        }
    }
}

struct Writer<'a> {
    opts: JsonOptions<'a>,
    invoker: Option<&'a dyn Invoker>,
    out: String,
}

pub fn to_json(
    value: &ValueRef,
    opts: JsonOptions<'_>,
    invoker: Option<&dyn Invoker>,
) -> CoreResult<String> {
    let mut writer = Writer { opts, invoker, out: String::new() };
    writer.write_value(value, 0)?;
    Ok(writer.out)
}

impl<'a> Writer<'a> {
    fn newline_indent(&mut self, level: usize) {
        if self.opts.pretty {
            self.out.push('\n');
            for _ in 0..(level * self.opts.indent) {
                self.out.push(' ');
            }
        }
    }

    fn write_value(&mut self, value: &ValueRef, level: usize) -> CoreResult<()> {
        if level as u32 > self.opts.depth {
            self.write_string(&crate::core::coerce::display_string(value, self.invoker)?);
            return Ok(());
        }
        match value {
            ValueRef::Undefined | ValueRef::Function(_) | ValueRef::Accessor { .. } => {
                self.out.push_str("null")
            }
            ValueRef::Null => self.out.push_str("null"),
            ValueRef::Bool(b) => {
                self.out.push_str(if *b { "true" } else { "false" });
            }
            ValueRef::Number(n) => {
                if n.is_finite() {
                    let _ = write!(self.out, "{}", n);
                } else {
                    self.out.push_str("null");
                }
            }
            ValueRef::Str(s) => self.write_string(s),
            ValueRef::Array(arr) => self.write_array(arr.as_ref(), level)?,
            ValueRef::Object(obj) => self.write_object(obj, level)?,
        }
        Ok(())
    }

    fn write_string(&mut self, s: &str) {
        self.out.push('"');
        for c in s.chars() {
            match c {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if (c as u32) < 0x20 => {
                    let _ = write!(self.out, "\\u{:04x}", c as u32);
                }
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }

    fn write_array(&mut self, arr: &parking_lot::RwLock<Vec<ValueRef>>, level: usize) -> CoreResult<()> {
        let items = arr.read();
        if items.is_empty() {
            self.out.push_str("[]");
            return Ok(());
        }
        self.out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline_indent(level + 1);
            self.write_value(item, level + 1)?;
        }
        self.newline_indent(level);
        self.out.push(']');
        Ok(())
    }

    fn key_string(&self, name: &Name) -> String {
        if self.opts.namespaces {
            if let Some(space) = &name.space {
                return format!("{}::{}", space, name.short());
            }
        }
        name.short().to_string()
    }

    fn write_object(&mut self, obj: &ObjRef, level: usize) -> CoreResult<()> {
        let already_visited = {
            let mut guard = obj.write();
            let visited = guard.flags.contains(ObjectFlags::VISITED);
            guard.flags |= ObjectFlags::VISITED;
            visited
        };
        if already_visited {
            // toJSON always terminates (spec §8): a cyclic reference renders
            // via the value's toString fallback rather than erroring.
            let rendered = crate::core::coerce::display_string(&ValueRef::Object(obj.clone()), self.invoker)?;
            self.write_string(&rendered);
            return Ok(());
        }
        let result = self.write_object_body(obj, level);
        obj.write().flags.remove(ObjectFlags::VISITED);
        result
    }

    fn write_object_body(&mut self, obj: &ObjRef, level: usize) -> CoreResult<()> {
        let mut entries: Vec<(Name, ValueRef)> = {
            let guard = obj.read();
            guard
                .table()
                .live_slots()
                .filter(|(_, s)| !s.trait_.attributes.is_compiler_internal())
                .filter(|(_, s)| self.opts.hidden || s.trait_.attributes.is_enumerable())
                .map(|(_, s)| (s.name.clone(), s.value.clone()))
                .collect()
        };

        if self.opts.base_classes {
            self.collect_base_class_entries(obj, &mut entries);
        }

        self.out.push('{');
        let mut first = true;
        for (name, value) in entries {
            let value = self.apply_replacer(&name, value)?;
            if !first {
                self.out.push(',');
            }
            first = false;
            self.newline_indent(level + 1);
            self.write_string(&self.key_string(&name));
            self.out.push(':');
            if self.opts.pretty {
                self.out.push(' ');
            }
            self.write_value(&value, level + 1)?;
        }
        if !first {
            self.newline_indent(level);
        }
        self.out.push('}');
        Ok(())
    }

    fn collect_base_class_entries(&self, obj: &ObjRef, entries: &mut Vec<(Name, ValueRef)>) {
        let mut seen: Vec<Name> = entries.iter().map(|(n, _)| n.clone()).collect();
        let mut current_type = obj.read().obj_type.clone();
        while let Some(type_ref) = current_type {
            let type_guard = type_ref.read();
            let Some(ext) = type_guard.type_ext.as_ref() else { break };
            if let Some(proto) = &ext.prototype {
                let proto_guard = proto.read();
                for (_, slot) in proto_guard.table().live_slots() {
                    if slot.trait_.attributes.is_compiler_internal() {
                        continue;
                    }
                    if !self.opts.hidden && !slot.trait_.attributes.is_enumerable() {
                        continue;
                    }
                    if seen.iter().any(|n| n.short_eq(&slot.name)) {
                        continue;
                    }
                    seen.push(slot.name.clone());
                    entries.push((slot.name.clone(), slot.value.clone()));
                }
            }
            current_type = ext.parent.clone();
        }
    }

    fn apply_replacer(&self, name: &Name, value: ValueRef) -> CoreResult<ValueRef> {
        match (self.opts.replacer, self.invoker) {
            (Some(replacer), Some(invoker)) => invoker
                .call_replacer(replacer, name.short(), &value)
                .map_err(CoreError::type_error),
            _ => Ok(value),
        }
    }
}
