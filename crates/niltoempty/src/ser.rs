//! Serde encoding for the value graph.
//!
//! Nil pointers, slices, maps and the untyped nil serialize as unit (`null`
//! in JSON); empty slices and maps as empty sequences and maps. Records
//! serialize as maps of their exported fields, with embedded records
//! flattened into the parent. Cyclic graphs cannot be serialized.

use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::value::{Field, Key, Number, Value};

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Number::I64(i) => serializer.serialize_i64(*i),
            Number::U64(u) => serializer.serialize_u64(*u),
            Number::F64(f) => serializer.serialize_f64(*f),
        }
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Ptr(ptr) => match ptr.target() {
                Some(target) => {
                    let target = target
                        .try_borrow()
                        .map_err(|_| S::Error::custom("pointer target is mutably borrowed"))?;
                    target.serialize(serializer)
                }
                None => serializer.serialize_unit(),
            },
            Value::Slice(slice) => match slice.items() {
                Some(items) => {
                    let items = items
                        .try_borrow()
                        .map_err(|_| S::Error::custom("slice is mutably borrowed"))?;
                    serialize_items(&items, serializer)
                }
                None => serializer.serialize_unit(),
            },
            Value::Map(map) => match map.entries() {
                Some(entries) => {
                    let entries = entries
                        .try_borrow()
                        .map_err(|_| S::Error::custom("map is mutably borrowed"))?;
                    let mut out = serializer.serialize_map(Some(entries.len()))?;
                    for (k, v) in entries.iter() {
                        out.serialize_entry(k, v)?;
                    }
                    out.end()
                }
                None => serializer.serialize_unit(),
            },
            Value::Dynamic(Some(inner)) => inner.serialize(serializer),
            Value::Dynamic(None) => serializer.serialize_unit(),
            Value::Array(array) => serialize_items(array.items(), serializer),
            Value::Record(record) => {
                let mut out = serializer.serialize_map(None)?;
                serialize_fields(record.fields(), &mut out)?;
                out.end()
            }
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
        }
    }
}

fn serialize_items<S: Serializer>(items: &[Value], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(items.len()))?;
    for item in items {
        seq.serialize_element(item)?;
    }
    seq.end()
}

fn serialize_fields<M: SerializeMap>(fields: &[Field], out: &mut M) -> Result<(), M::Error> {
    for field in fields.iter().filter(|f| f.is_exported()) {
        match field.value() {
            Value::Record(inner) if field.is_embedded() => serialize_fields(inner.fields(), out)?,
            value => out.serialize_entry(field.name(), value)?,
        }
    }
    Ok(())
}

#[cfg(feature = "json")]
pub fn to_json_value(value: &Value) -> crate::Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(feature = "json")]
pub fn to_json_string(value: &Value) -> crate::Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(feature = "json")]
pub fn to_json_string_pretty(value: &Value) -> crate::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
