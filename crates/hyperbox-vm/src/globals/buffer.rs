// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `Buffer` class implementation
//!
//! Buffers are byte objects of the script engine. Instance methods live in
//! the interpreter's shared `Bytes` method table.

use base64::Engine as _;
use base64::prelude::BASE64_STANDARD;
use hyperbox_script::runtime::{ObjectKind, ObjectRef, Value, arg, native_function};
use hyperbox_script::{Error, Interpreter, MethodSet, Result};

/// Supported text encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8 (default)
    Utf8,
    /// Lowercase hexadecimal
    Hex,
    /// Standard base64 with padding
    Base64,
    /// One byte per code point below 256
    Latin1,
}

impl Encoding {
    /// Parse an encoding argument; `undefined` means UTF-8
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Undefined => Ok(Encoding::Utf8),
            other => Self::parse(&other.to_js_string()),
        }
    }

    /// Parse an encoding name
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "hex" => Ok(Encoding::Hex),
            "base64" => Ok(Encoding::Base64),
            "latin1" | "binary" => Ok(Encoding::Latin1),
            _ => Err(Error::type_error(format!("Unknown encoding: {}", name))),
        }
    }

    /// Encode text into bytes. Malformed hex or base64 yields no bytes.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Encoding::Utf8 => text.as_bytes().to_vec(),
            Encoding::Hex => hex::decode(text).unwrap_or_default(),
            Encoding::Base64 => BASE64_STANDARD.decode(text).unwrap_or_default(),
            Encoding::Latin1 => text.chars().map(|c| (c as u32 & 0xff) as u8).collect(),
        }
    }

    /// Decode bytes into text
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Hex => hex::encode(bytes),
            Encoding::Base64 => BASE64_STANDARD.encode(bytes),
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// Create the Buffer class for the script runtime
pub fn create_buffer_class() -> Value {
    let class = native_function("Buffer", |_, _, _| {
        Err(Error::type_error(
            "Buffer() is not supported; use Buffer.from or Buffer.alloc",
        ))
    });
    let Some(buffer) = class.as_object().cloned() else {
        return class;
    };

    buffer.set(
        "from",
        native_function("from", |_, _, args| {
            let bytes = match arg(args, 0) {
                Value::String(text) => Encoding::from_value(&arg(args, 1))?.encode(&text),
                Value::Object(obj) => bytes_from_object(&obj)?,
                other => {
                    return Err(Error::type_error(format!(
                        "The first argument must be a string, Buffer or Array, received {}",
                        other.type_of()
                    )));
                }
            };
            Ok(buffer_value(bytes))
        }),
    );

    buffer.set(
        "alloc",
        native_function("alloc", |_, _, args| {
            let size = arg(args, 0).to_number();
            if !size.is_finite() || size < 0.0 || size.fract() != 0.0 {
                return Err(Error::range_error(format!(
                    "The \"size\" argument is out of range: {}",
                    arg(args, 0).to_js_string()
                )));
            }
            let fill = match arg(args, 1) {
                Value::Undefined => 0,
                fill => fill.to_number() as u8,
            };
            Ok(buffer_value(vec![fill; size as usize]))
        }),
    );

    buffer.set(
        "byteLength",
        native_function("byteLength", |_, _, args| {
            Ok(Value::from(match arg(args, 0) {
                Value::Object(obj) => obj.byte_contents().map(|b| b.len()).unwrap_or(0),
                value => Encoding::from_value(&arg(args, 1))?
                    .encode(&value.to_js_string())
                    .len(),
            }))
        }),
    );

    buffer.set(
        "isBuffer",
        native_function("isBuffer", |_, _, args| {
            Ok(Value::Boolean(is_buffer(&arg(args, 0))))
        }),
    );

    buffer.set(
        "concat",
        native_function("concat", |_, _, args| {
            let list = match arg(args, 0) {
                Value::Object(obj) => obj.array_items(),
                _ => None,
            }
            .ok_or_else(|| Error::type_error("The \"list\" argument must be an Array"))?;

            let mut bytes = Vec::new();
            for item in &list {
                match item {
                    Value::Object(obj) if is_buffer(item) => {
                        bytes.extend(obj.byte_contents().unwrap_or_default());
                    }
                    _ => {
                        return Err(Error::type_error(
                            "The \"list\" argument must contain only Buffers",
                        ));
                    }
                }
            }
            Ok(buffer_value(bytes))
        }),
    );

    buffer.set("poolSize", Value::from(8192));
    buffer.freeze();
    class
}

/// Install `toString`, `slice` and `equals` on every buffer
pub fn install_methods(interpreter: &Interpreter) {
    interpreter.define_method(
        MethodSet::Bytes,
        "toString",
        native_function("toString", |_, this, args| {
            let bytes = this_bytes(this)?;
            Ok(Value::from(Encoding::from_value(&arg(args, 0))?.decode(&bytes)))
        }),
    );

    interpreter.define_method(
        MethodSet::Bytes,
        "slice",
        native_function("slice", |_, this, args| {
            let bytes = this_bytes(this)?;
            let start = relative(&arg(args, 0), bytes.len(), 0);
            let end = relative(&arg(args, 1), bytes.len(), bytes.len());
            Ok(buffer_value(if start < end {
                bytes[start..end].to_vec()
            } else {
                Vec::new()
            }))
        }),
    );

    interpreter.define_method(
        MethodSet::Bytes,
        "equals",
        native_function("equals", |_, this, args| {
            let bytes = this_bytes(this)?;
            let other = this_bytes(&arg(args, 0)).map_err(|_| {
                Error::type_error("The \"otherBuffer\" argument must be a Buffer")
            })?;
            Ok(Value::Boolean(bytes == other))
        }),
    );
}

/// Returns true if `value` is a buffer
pub fn is_buffer(value: &Value) -> bool {
    matches!(value, Value::Object(obj) if matches!(obj.borrow().kind, ObjectKind::Bytes(_)))
}

fn buffer_value(bytes: Vec<u8>) -> Value {
    Value::Object(ObjectRef::bytes(bytes))
}

fn this_bytes(this: &Value) -> Result<Vec<u8>> {
    this.as_object()
        .and_then(|obj| obj.byte_contents())
        .ok_or_else(|| Error::type_error("Buffer method called on a non-buffer"))
}

fn bytes_from_object(obj: &ObjectRef) -> Result<Vec<u8>> {
    if let Some(bytes) = obj.byte_contents() {
        return Ok(bytes);
    }
    let items = obj
        .array_items()
        .ok_or_else(|| Error::type_error("The first argument must be a string, Buffer or Array"))?;
    Ok(items
        .iter()
        .map(|item| {
            let n = item.to_number();
            if n.is_finite() {
                (n.trunc() as i64).rem_euclid(256) as u8
            } else {
                0
            }
        })
        .collect())
}

fn relative(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    if n < 0.0 {
        (len as f64 + n.trunc()).max(0.0) as usize
    } else {
        n.trunc().min(len as f64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodings() {
        assert_eq!(Encoding::Hex.decode(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
        assert_eq!(Encoding::Base64.decode(b"hello"), "aGVsbG8=");
        assert_eq!(Encoding::Base64.encode("aGVsbG8="), b"hello");
        assert_eq!(Encoding::Latin1.encode("\u{e9}"), vec![0xe9]);
        assert_eq!(Encoding::Utf8.encode("\u{e9}"), vec![0xc3, 0xa9]);
        assert!(Encoding::parse("utf16le").is_err());
    }

    #[test]
    fn test_relative() {
        assert_eq!(relative(&Value::from(-2), 5, 0), 3);
        assert_eq!(relative(&Value::Undefined, 5, 5), 5);
        assert_eq!(relative(&Value::from(9), 5, 0), 5);
    }
}
