// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The `Object` constructor and methods shared by every value.

use super::{define, method};
use crate::error::{Error, Result};
use crate::interpreter::{Interpreter, MethodSet};
use crate::runtime::{ObjectKind, ObjectRef, Value, arg, array_index, native_function};

pub(super) fn install(intrinsics: &ObjectRef) {
    let ctor = native_function("Object", |_, _, args| {
        Ok(match arg(args, 0) {
            value @ Value::Object(_) => value,
            _ => Value::Object(ObjectRef::ordinary()),
        })
    });
    let Value::Object(object) = &ctor else {
        return;
    };

    define(object, "keys", |_, _, args| {
        let keys = own_keys(&arg(args, 0))?;
        Ok(array(keys.into_iter().map(Value::from).collect()))
    });

    define(object, "values", |interp, _, args| {
        let target = arg(args, 0);
        let mut values = Vec::new();
        for key in own_keys(&target)? {
            values.push(interp.get_property(&target, &key)?);
        }
        Ok(array(values))
    });

    define(object, "entries", |interp, _, args| {
        let target = arg(args, 0);
        let mut entries = Vec::new();
        for key in own_keys(&target)? {
            let value = interp.get_property(&target, &key)?;
            entries.push(array(vec![Value::from(key), value]));
        }
        Ok(array(entries))
    });

    define(object, "assign", |interp, _, args| {
        let target = arg(args, 0);
        let Value::Object(obj) = &target else {
            return Err(Error::type_error("Cannot convert undefined or null to object"));
        };
        for source in args.iter().skip(1) {
            if source.is_nullish() {
                continue;
            }
            for key in own_keys(source)? {
                obj.set(&key, interp.get_property(source, &key)?);
            }
        }
        Ok(target)
    });

    define(object, "freeze", |_, _, args| {
        let target = arg(args, 0);
        if let Value::Object(obj) = &target {
            obj.freeze();
        }
        Ok(target)
    });

    define(object, "isFrozen", |_, _, args| {
        Ok(Value::Boolean(match arg(args, 0) {
            Value::Object(obj) => obj.is_frozen(),
            _ => true,
        }))
    });

    define(object, "create", |_, _, args| {
        let prototype = match arg(args, 0) {
            Value::Object(proto) => Some(proto),
            Value::Null => None,
            _ => {
                return Err(Error::type_error(
                    "Object prototype may only be an Object or null",
                ));
            }
        };
        Ok(Value::Object(ObjectRef::with_prototype(
            ObjectKind::Ordinary,
            prototype,
        )))
    });

    define(object, "getPrototypeOf", |_, _, args| {
        Ok(match arg(args, 0) {
            Value::Object(obj) => obj.prototype().map(Value::Object).unwrap_or(Value::Null),
            _ => Value::Null,
        })
    });

    intrinsics.set("Object", ctor);
}

pub(super) fn install_methods(interpreter: &Interpreter) {
    method(interpreter, MethodSet::Object, "hasOwnProperty", |_, this, args| {
        let key = arg(args, 0).to_property_key();
        Ok(Value::Boolean(match this {
            Value::Object(obj) => obj.has_own(&key),
            Value::String(s) => {
                key == "length" || array_index(&key).is_some_and(|i| i < s.chars().count())
            }
            _ => false,
        }))
    });

    method(interpreter, MethodSet::Object, "toString", |_, this, _| {
        Ok(Value::from(match this {
            Value::Object(obj) if matches!(obj.borrow().kind, ObjectKind::Ordinary) => {
                "[object Object]".to_string()
            }
            other => other.to_js_string(),
        }))
    });

    method(interpreter, MethodSet::Object, "valueOf", |_, this, _| Ok(this.clone()));
}

fn own_keys(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::Object(obj) => Ok(obj.keys()),
        Value::String(s) => Ok((0..s.chars().count()).map(|i| i.to_string()).collect()),
        Value::Undefined | Value::Null => Err(Error::type_error(
            "Cannot convert undefined or null to object",
        )),
        _ => Ok(Vec::new()),
    }
}

fn array(items: Vec<Value>) -> Value {
    Value::Object(ObjectRef::array(items))
}
