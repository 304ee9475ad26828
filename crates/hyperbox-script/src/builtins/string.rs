// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! String methods.
//!
//! Indices count Unicode scalar values.

use super::{method, relative_index};
use crate::error::{Error, Result};
use crate::interpreter::{Interpreter, MethodSet};
use crate::runtime::{ObjectRef, Value, arg};

pub(super) fn install_methods(interpreter: &Interpreter) {
    let set = MethodSet::String;

    method(interpreter, set, "charAt", |_, this, args| {
        let chars = chars_of(this)?;
        let index = arg(args, 0).to_number();
        let index = if index.is_nan() { 0.0 } else { index.trunc() };
        Ok(Value::from(
            chars
                .get(index as usize)
                .filter(|_| index >= 0.0)
                .map(|c| c.to_string())
                .unwrap_or_default(),
        ))
    });

    method(interpreter, set, "charCodeAt", |_, this, args| {
        let chars = chars_of(this)?;
        let index = arg(args, 0).to_number();
        let index = if index.is_nan() { 0.0 } else { index.trunc() };
        Ok(Value::Number(
            chars
                .get(index as usize)
                .filter(|_| index >= 0.0)
                .map(|c| *c as u32 as f64)
                .unwrap_or(f64::NAN),
        ))
    });

    method(interpreter, set, "indexOf", |_, this, args| {
        let text = text_of(this)?;
        let needle = arg(args, 0).to_js_string();
        let from = relative_index(&arg(args, 1), text.chars().count(), 0);
        Ok(Value::Number(index_of(&text, &needle, from)))
    });

    method(interpreter, set, "lastIndexOf", |_, this, args| {
        let text = text_of(this)?;
        let needle = arg(args, 0).to_js_string();
        Ok(Value::Number(
            text.rfind(&needle)
                .map(|byte| text[..byte].chars().count() as f64)
                .unwrap_or(-1.0),
        ))
    });

    method(interpreter, set, "includes", |_, this, args| {
        let text = text_of(this)?;
        Ok(Value::Boolean(text.contains(&arg(args, 0).to_js_string())))
    });

    method(interpreter, set, "startsWith", |_, this, args| {
        let text = text_of(this)?;
        Ok(Value::Boolean(text.starts_with(&arg(args, 0).to_js_string())))
    });

    method(interpreter, set, "endsWith", |_, this, args| {
        let text = text_of(this)?;
        Ok(Value::Boolean(text.ends_with(&arg(args, 0).to_js_string())))
    });

    method(interpreter, set, "slice", |_, this, args| {
        let chars = chars_of(this)?;
        let start = relative_index(&arg(args, 0), chars.len(), 0);
        let end = relative_index(&arg(args, 1), chars.len(), chars.len());
        Ok(Value::from(if start < end {
            chars[start..end].iter().collect::<String>()
        } else {
            String::new()
        }))
    });

    method(interpreter, set, "substring", |_, this, args| {
        let chars = chars_of(this)?;
        let clamp = |value: &Value, default: usize| {
            if value.is_undefined() {
                return default;
            }
            let n = value.to_number();
            if n.is_nan() || n < 0.0 {
                0
            } else {
                (n as usize).min(chars.len())
            }
        };
        let a = clamp(&arg(args, 0), 0);
        let b = clamp(&arg(args, 1), chars.len());
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Ok(Value::from(chars[start..end].iter().collect::<String>()))
    });

    method(interpreter, set, "toUpperCase", |_, this, _| {
        Ok(Value::from(text_of(this)?.to_uppercase()))
    });

    method(interpreter, set, "toLowerCase", |_, this, _| {
        Ok(Value::from(text_of(this)?.to_lowercase()))
    });

    method(interpreter, set, "trim", |_, this, _| {
        Ok(Value::from(text_of(this)?.trim()))
    });

    method(interpreter, set, "trimStart", |_, this, _| {
        Ok(Value::from(text_of(this)?.trim_start()))
    });

    method(interpreter, set, "trimEnd", |_, this, _| {
        Ok(Value::from(text_of(this)?.trim_end()))
    });

    method(interpreter, set, "split", |_, this, args| {
        let text = text_of(this)?;
        let limit = match arg(args, 1) {
            Value::Undefined => usize::MAX,
            limit => limit.to_number().max(0.0) as usize,
        };
        let parts: Vec<Value> = match arg(args, 0) {
            Value::Undefined => vec![Value::from(text.as_str())],
            separator => {
                let separator = separator.to_js_string();
                if separator.is_empty() {
                    text.chars().map(|c| Value::from(c.to_string())).collect()
                } else {
                    text.split(separator.as_str()).map(Value::from).collect()
                }
            }
        };
        Ok(Value::Object(ObjectRef::array(
            parts.into_iter().take(limit).collect(),
        )))
    });

    method(interpreter, set, "replace", |interp, this, args| {
        let text = text_of(this)?;
        let needle = arg(args, 0).to_js_string();
        let Some(byte) = text.find(&needle) else {
            return Ok(Value::from(text));
        };
        let replacement = replacement_for(interp, &arg(args, 1), &needle, &text, byte)?;
        Ok(Value::from(format!(
            "{}{}{}",
            &text[..byte],
            replacement,
            &text[byte + needle.len()..]
        )))
    });

    method(interpreter, set, "replaceAll", |interp, this, args| {
        let text = text_of(this)?;
        let needle = arg(args, 0).to_js_string();
        if needle.is_empty() {
            return Ok(Value::from(text));
        }
        let mut out = String::new();
        let mut last = 0;
        for (byte, _) in text.match_indices(&needle) {
            out.push_str(&text[last..byte]);
            out.push_str(&replacement_for(interp, &arg(args, 1), &needle, &text, byte)?);
            last = byte + needle.len();
        }
        out.push_str(&text[last..]);
        Ok(Value::from(out))
    });

    method(interpreter, set, "repeat", |_, this, args| {
        let text = text_of(this)?;
        let count = arg(args, 0).to_number();
        if count < 0.0 || count.is_infinite() {
            return Err(Error::range_error(format!("Invalid count value: {}", count)));
        }
        let count = if count.is_nan() { 0 } else { count as usize };
        Ok(Value::from(text.repeat(count)))
    });

    method(interpreter, set, "padStart", |_, this, args| {
        let text = text_of(this)?;
        let padding = padding(&text, args);
        Ok(Value::from(padding + &text))
    });

    method(interpreter, set, "padEnd", |_, this, args| {
        let text = text_of(this)?;
        let padding = padding(&text, args);
        Ok(Value::from(text + &padding))
    });

    method(interpreter, set, "toString", |_, this, _| Ok(Value::from(text_of(this)?)));
}

fn text_of(this: &Value) -> Result<String> {
    match this {
        Value::String(s) => Ok(s.to_string()),
        Value::Undefined | Value::Null => Err(Error::type_error(
            "String method called on null or undefined",
        )),
        other => Ok(other.to_js_string()),
    }
}

fn chars_of(this: &Value) -> Result<Vec<char>> {
    Ok(text_of(this)?.chars().collect())
}

fn index_of(text: &str, needle: &str, from_char: usize) -> f64 {
    let from_byte = text
        .char_indices()
        .nth(from_char)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len());
    text[from_byte..]
        .find(needle)
        .map(|byte| text[..from_byte + byte].chars().count() as f64)
        .unwrap_or(-1.0)
}

fn replacement_for(
    interp: &Interpreter,
    replacement: &Value,
    matched: &str,
    text: &str,
    byte: usize,
) -> Result<String> {
    if replacement.is_function() {
        let position = text[..byte].chars().count();
        let result = interp.call(
            replacement,
            &Value::Undefined,
            &[Value::from(matched), Value::from(position), Value::from(text)],
        )?;
        return Ok(result.to_js_string());
    }
    Ok(replacement.to_js_string().replace("$&", matched))
}

fn padding(text: &str, args: &[Value]) -> String {
    let target = arg(args, 0).to_number();
    let fill = match arg(args, 1) {
        Value::Undefined => " ".to_string(),
        fill => fill.to_js_string(),
    };
    let len = text.chars().count();
    if target.is_nan() || target as usize <= len || fill.is_empty() {
        return String::new();
    }
    fill.chars().cycle().take(target as usize - len).collect()
}
