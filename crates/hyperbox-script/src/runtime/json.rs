// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Conversion between script values and `serde_json` values.

use serde_json::{Map, Number};

use super::object::{ObjectKind, ObjectRef};
use super::value::Value;
use crate::error::{Error, Result};

/// Converts a script value to JSON.
///
/// Returns `None` for values JSON cannot represent at the top level
/// (`undefined`, functions). Inside objects those properties are omitted;
/// inside arrays they become `null`. Cycles are a `TypeError`.
pub fn to_json(value: &Value) -> Result<Option<serde_json::Value>> {
    let mut stack = Vec::new();
    convert(value, &mut stack)
}

fn convert(value: &Value, stack: &mut Vec<ObjectRef>) -> Result<Option<serde_json::Value>> {
    let json = match value {
        Value::Undefined => return Ok(None),
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Object(obj) => {
            if value.is_function() {
                return Ok(None);
            }
            if stack.iter().any(|seen| seen.ptr_eq(obj)) {
                return Err(Error::type_error("Converting circular structure to JSON"));
            }

            stack.push(obj.clone());
            let json = convert_object(obj, stack);
            stack.pop();
            json?
        }
    };
    Ok(Some(json))
}

fn convert_object(obj: &ObjectRef, stack: &mut Vec<ObjectRef>) -> Result<serde_json::Value> {
    if let Some(items) = obj.array_items() {
        let mut out = Vec::with_capacity(items.len());
        for item in &items {
            out.push(convert(item, stack)?.unwrap_or(serde_json::Value::Null));
        }
        return Ok(serde_json::Value::Array(out));
    }

    if let Some(bytes) = obj.byte_contents() {
        let mut map = Map::new();
        map.insert("type".into(), "Buffer".into());
        map.insert(
            "data".into(),
            serde_json::Value::Array(bytes.into_iter().map(serde_json::Value::from).collect()),
        );
        return Ok(serde_json::Value::Object(map));
    }

    let mut map = Map::new();
    if matches!(obj.borrow().kind, ObjectKind::Error) {
        return Ok(serde_json::Value::Object(map));
    }
    for key in obj.keys() {
        let value = obj.get_own(&key).unwrap_or_default();
        if let Some(json) = convert(&value, stack)? {
            map.insert(key, json);
        }
    }
    Ok(serde_json::Value::Object(map))
}

fn number_to_json(n: f64) -> serde_json::Value {
    if !n.is_finite() {
        return serde_json::Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Converts JSON into a fresh script value.
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::from(s.as_str()),
        serde_json::Value::Array(items) => {
            Value::Object(ObjectRef::array(items.iter().map(from_json).collect()))
        }
        serde_json::Value::Object(map) => {
            let obj = ObjectRef::ordinary();
            for (key, value) in map {
                obj.set(key, from_json(value));
            }
            Value::Object(obj)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::native_function;
    use serde_json::json;

    #[test]
    fn test_objects_keep_key_order() {
        let value = from_json(&json!({"z": 1, "a": [true, null, "s"]}));
        let back = to_json(&value).unwrap().unwrap();
        assert_eq!(back.to_string(), r#"{"z":1,"a":[true,null,"s"]}"#);
    }

    #[test]
    fn test_unrepresentable_values() {
        let obj = ObjectRef::ordinary();
        obj.set("f", native_function("f", |_, _, _| Ok(Value::Undefined)));
        obj.set("u", Value::Undefined);
        obj.set("n", Value::Number(f64::NAN));
        let arr = ObjectRef::array(vec![Value::Undefined]);
        obj.set("arr", Value::Object(arr));

        let json = to_json(&Value::Object(obj)).unwrap().unwrap();
        assert_eq!(json, json!({"n": null, "arr": [null]}));
        assert!(to_json(&Value::Undefined).unwrap().is_none());
    }

    #[test]
    fn test_cycles_are_type_errors() {
        let obj = ObjectRef::ordinary();
        obj.set("self", Value::Object(obj.clone()));
        let err = to_json(&Value::Object(obj.clone())).unwrap_err();
        assert!(err.to_string().contains("circular"));
        obj.delete("self");
    }

    #[test]
    fn test_shared_references_are_not_cycles() {
        let shared = Value::Object(ObjectRef::ordinary());
        let arr = ObjectRef::array(vec![shared.clone(), shared]);
        assert_eq!(to_json(&Value::Object(arr)).unwrap().unwrap(), json!([{}, {}]));
    }

    #[test]
    fn test_buffers_serialize_like_node() {
        let buf = Value::Object(ObjectRef::bytes(vec![1, 2]));
        assert_eq!(
            to_json(&buf).unwrap().unwrap(),
            json!({"type": "Buffer", "data": [1, 2]})
        );
    }
}
