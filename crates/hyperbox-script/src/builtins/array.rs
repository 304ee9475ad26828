// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The `Array` constructor and array methods.

use std::cmp::Ordering;

use super::{define, method, relative_index};
use crate::error::{Error, Result};
use crate::interpreter::{Interpreter, MethodSet};
use crate::runtime::{ObjectKind, ObjectRef, Value, arg, native_function};

pub(super) fn install(intrinsics: &ObjectRef) {
    let ctor = native_function("Array", |_, _, args| {
        let items = match args {
            [Value::Number(len)] => {
                if *len < 0.0 || len.fract() != 0.0 || *len > u32::MAX as f64 {
                    return Err(Error::range_error("Invalid array length"));
                }
                vec![Value::Undefined; *len as usize]
            }
            _ => args.to_vec(),
        };
        Ok(Value::Object(ObjectRef::array(items)))
    });
    let Value::Object(array) = &ctor else {
        return;
    };

    define(array, "isArray", |_, _, args| Ok(Value::Boolean(arg(args, 0).is_array())));

    define(array, "of", |_, _, args| Ok(Value::Object(ObjectRef::array(args.to_vec()))));

    define(array, "from", |interp, _, args| {
        let source = arg(args, 0);
        let items = match &source {
            Value::String(s) => s.chars().map(|c| Value::from(c.to_string())).collect(),
            Value::Object(obj) => match &obj.borrow().kind {
                ObjectKind::Array(items) => items.clone(),
                ObjectKind::Bytes(bytes) => bytes.iter().map(|b| Value::Number(*b as f64)).collect(),
                _ => {
                    let len = obj.get("length").map(|l| l.to_number()).unwrap_or(0.0);
                    let len = if len.is_finite() && len > 0.0 { len as usize } else { 0 };
                    (0..len)
                        .map(|i| obj.get(&i.to_string()).unwrap_or_default())
                        .collect()
                }
            },
            _ => Vec::new(),
        };

        let mapper = arg(args, 1);
        if !mapper.is_function() {
            return Ok(Value::Object(ObjectRef::array(items)));
        }
        let mut mapped = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            mapped.push(interp.call(&mapper, &Value::Undefined, &[item, Value::from(index)])?);
        }
        Ok(Value::Object(ObjectRef::array(mapped)))
    });

    intrinsics.set("Array", ctor);
}

pub(super) fn install_methods(interpreter: &Interpreter) {
    method(interpreter, MethodSet::Array, "push", |_, this, args| {
        let obj = this_array(this)?;
        ensure_mutable(&obj)?;
        let len = with_items(&obj, |items| {
            items.extend_from_slice(args);
            items.len()
        });
        Ok(Value::from(len))
    });

    method(interpreter, MethodSet::Array, "pop", |_, this, _| {
        let obj = this_array(this)?;
        ensure_mutable(&obj)?;
        Ok(with_items(&obj, |items| items.pop()).unwrap_or_default())
    });

    method(interpreter, MethodSet::Array, "shift", |_, this, _| {
        let obj = this_array(this)?;
        ensure_mutable(&obj)?;
        Ok(with_items(&obj, |items| {
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        }))
    });

    method(interpreter, MethodSet::Array, "unshift", |_, this, args| {
        let obj = this_array(this)?;
        ensure_mutable(&obj)?;
        let len = with_items(&obj, |items| {
            items.splice(0..0, args.iter().cloned());
            items.len()
        });
        Ok(Value::from(len))
    });

    method(interpreter, MethodSet::Array, "slice", |_, this, args| {
        let items = items_of(this)?;
        let start = relative_index(&arg(args, 0), items.len(), 0);
        let end = relative_index(&arg(args, 1), items.len(), items.len());
        let slice = if start < end {
            items[start..end].to_vec()
        } else {
            Vec::new()
        };
        Ok(Value::Object(ObjectRef::array(slice)))
    });

    method(interpreter, MethodSet::Array, "splice", |_, this, args| {
        let obj = this_array(this)?;
        ensure_mutable(&obj)?;
        let removed = with_items(&obj, |items| {
            let len = items.len();
            let start = relative_index(&arg(args, 0), len, 0);
            let count = match args.get(1) {
                None => len - start,
                Some(count) => {
                    let n = count.to_number();
                    if n.is_nan() || n < 0.0 {
                        0
                    } else {
                        (n as usize).min(len - start)
                    }
                }
            };
            let inserted = args.iter().skip(2).cloned();
            items.splice(start..start + count, inserted).collect::<Vec<_>>()
        });
        Ok(Value::Object(ObjectRef::array(removed)))
    });

    method(interpreter, MethodSet::Array, "concat", |_, this, args| {
        let mut items = items_of(this)?;
        for value in args {
            match value.as_object().and_then(|obj| obj.array_items()) {
                Some(more) => items.extend(more),
                None => items.push(value.clone()),
            }
        }
        Ok(Value::Object(ObjectRef::array(items)))
    });

    method(interpreter, MethodSet::Array, "join", |_, this, args| {
        let items = items_of(this)?;
        let separator = match arg(args, 0) {
            Value::Undefined => ",".to_string(),
            sep => sep.to_js_string(),
        };
        let parts: Vec<String> = items
            .iter()
            .map(|item| {
                if item.is_nullish() {
                    String::new()
                } else {
                    item.to_js_string()
                }
            })
            .collect();
        Ok(Value::from(parts.join(&separator)))
    });

    method(interpreter, MethodSet::Array, "indexOf", |_, this, args| {
        let items = items_of(this)?;
        let needle = arg(args, 0);
        let start = relative_index(&arg(args, 1), items.len(), 0);
        let found = items
            .iter()
            .skip(start)
            .position(|item| item.strict_equals(&needle))
            .map(|i| (i + start) as f64)
            .unwrap_or(-1.0);
        Ok(Value::Number(found))
    });

    method(interpreter, MethodSet::Array, "lastIndexOf", |_, this, args| {
        let items = items_of(this)?;
        let needle = arg(args, 0);
        let found = items
            .iter()
            .rposition(|item| item.strict_equals(&needle))
            .map(|i| i as f64)
            .unwrap_or(-1.0);
        Ok(Value::Number(found))
    });

    method(interpreter, MethodSet::Array, "includes", |_, this, args| {
        let items = items_of(this)?;
        let needle = arg(args, 0);
        let nan = matches!(needle, Value::Number(n) if n.is_nan());
        Ok(Value::Boolean(items.iter().any(|item| {
            item.strict_equals(&needle) || (nan && matches!(item, Value::Number(n) if n.is_nan()))
        })))
    });

    method(interpreter, MethodSet::Array, "reverse", |_, this, _| {
        let obj = this_array(this)?;
        ensure_mutable(&obj)?;
        with_items(&obj, |items| items.reverse());
        Ok(this.clone())
    });

    method(interpreter, MethodSet::Array, "forEach", |interp, this, args| {
        each(interp, this, args, |_, _, _| Ok(true))?;
        Ok(Value::Undefined)
    });

    method(interpreter, MethodSet::Array, "map", |interp, this, args| {
        let mut out = Vec::new();
        each(interp, this, args, |_, _, result| {
            out.push(result);
            Ok(true)
        })?;
        Ok(Value::Object(ObjectRef::array(out)))
    });

    method(interpreter, MethodSet::Array, "filter", |interp, this, args| {
        let mut out = Vec::new();
        each(interp, this, args, |_, item, result| {
            if result.to_boolean() {
                out.push(item);
            }
            Ok(true)
        })?;
        Ok(Value::Object(ObjectRef::array(out)))
    });

    method(interpreter, MethodSet::Array, "some", |interp, this, args| {
        let mut found = false;
        each(interp, this, args, |_, _, result| {
            found = result.to_boolean();
            Ok(!found)
        })?;
        Ok(Value::Boolean(found))
    });

    method(interpreter, MethodSet::Array, "every", |interp, this, args| {
        let mut all = true;
        each(interp, this, args, |_, _, result| {
            all = result.to_boolean();
            Ok(all)
        })?;
        Ok(Value::Boolean(all))
    });

    method(interpreter, MethodSet::Array, "find", |interp, this, args| {
        let mut found = Value::Undefined;
        each(interp, this, args, |_, item, result| {
            if result.to_boolean() {
                found = item;
                return Ok(false);
            }
            Ok(true)
        })?;
        Ok(found)
    });

    method(interpreter, MethodSet::Array, "findIndex", |interp, this, args| {
        let mut found = -1.0;
        each(interp, this, args, |index, _, result| {
            if result.to_boolean() {
                found = index as f64;
                return Ok(false);
            }
            Ok(true)
        })?;
        Ok(Value::Number(found))
    });

    method(interpreter, MethodSet::Array, "reduce", |interp, this, args| {
        let items = items_of(this)?;
        let callback = callback_arg(args)?;
        let mut iter = items.into_iter().enumerate();
        let mut acc = match args.get(1) {
            Some(initial) => initial.clone(),
            None => match iter.next() {
                Some((_, first)) => first,
                None => {
                    return Err(Error::type_error(
                        "Reduce of empty array with no initial value",
                    ));
                }
            },
        };
        for (index, item) in iter {
            acc = interp.call(
                &callback,
                &Value::Undefined,
                &[acc, item, Value::from(index), this.clone()],
            )?;
        }
        Ok(acc)
    });

    method(interpreter, MethodSet::Array, "sort", |interp, this, args| {
        let obj = this_array(this)?;
        ensure_mutable(&obj)?;
        let comparator = arg(args, 0);
        let items = items_of(this)?;
        let sorted = merge_sort(items, &mut |a: &Value, b: &Value| {
            compare_items(interp, &comparator, a, b)
        })?;
        with_items(&obj, |items| *items = sorted);
        Ok(this.clone())
    });
}

fn this_array(this: &Value) -> Result<ObjectRef> {
    match this {
        Value::Object(obj) if this.is_array() => Ok(obj.clone()),
        _ => Err(Error::type_error("Array method called on a non-array")),
    }
}

fn items_of(this: &Value) -> Result<Vec<Value>> {
    this_array(this)?
        .array_items()
        .ok_or_else(|| Error::type_error("Array method called on a non-array"))
}

fn ensure_mutable(obj: &ObjectRef) -> Result<()> {
    if obj.is_frozen() {
        return Err(Error::type_error("Cannot modify a frozen array"));
    }
    Ok(())
}

fn with_items<R>(obj: &ObjectRef, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
    let mut inner = obj.borrow_mut();
    match &mut inner.kind {
        ObjectKind::Array(items) => f(items),
        _ => f(&mut Vec::new()),
    }
}

fn callback_arg(args: &[Value]) -> Result<Value> {
    let callback = arg(args, 0);
    if !callback.is_function() {
        return Err(Error::type_error(format!(
            "{} is not a function",
            callback.to_js_string()
        )));
    }
    Ok(callback)
}

/// Calls the callback for each element until `visit` returns false.
fn each<F>(interp: &Interpreter, this: &Value, args: &[Value], mut visit: F) -> Result<()>
where
    F: FnMut(usize, Value, Value) -> Result<bool>,
{
    let items = items_of(this)?;
    let callback = callback_arg(args)?;
    let this_arg = arg(args, 1);
    for (index, item) in items.into_iter().enumerate() {
        let result = interp.call(
            &callback,
            &this_arg,
            &[item.clone(), Value::from(index), this.clone()],
        )?;
        if !visit(index, item, result)? {
            break;
        }
    }
    Ok(())
}

fn compare_items(
    interp: &Interpreter,
    comparator: &Value,
    a: &Value,
    b: &Value,
) -> Result<Ordering> {
    match (a.is_undefined(), b.is_undefined()) {
        (true, true) => return Ok(Ordering::Equal),
        (true, false) => return Ok(Ordering::Greater),
        (false, true) => return Ok(Ordering::Less),
        _ => {}
    }
    if comparator.is_function() {
        let result = interp
            .call(comparator, &Value::Undefined, &[a.clone(), b.clone()])?
            .to_number();
        return Ok(result.partial_cmp(&0.0).unwrap_or(Ordering::Equal));
    }
    Ok(a.to_js_string().cmp(&b.to_js_string()))
}

/// Stable merge sort with a fallible comparator.
fn merge_sort<F>(items: Vec<Value>, compare: &mut F) -> Result<Vec<Value>>
where
    F: FnMut(&Value, &Value) -> Result<Ordering>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(left, compare)?;
    let right = merge_sort(right, compare)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        if compare(a, b)? == Ordering::Greater {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}
