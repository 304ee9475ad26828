// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `console` object backed by `tracing`
//!
//! Module output never writes to the host's stdout directly. Every call
//! becomes an event on the `hyperbox::console` target, so the host decides
//! where sandbox logs go.

use hyperbox_script::runtime::{ObjectKind, ObjectRef, Value, native_function, to_json};

/// Create the console object
pub fn create_console_object() -> Value {
    let console = ObjectRef::ordinary();

    console.set(
        "log",
        native_function("log", |_, _, args| {
            tracing::info!(target: "hyperbox::console", "{}", format_args(args));
            Ok(Value::Undefined)
        }),
    );
    console.set(
        "info",
        native_function("info", |_, _, args| {
            tracing::info!(target: "hyperbox::console", "{}", format_args(args));
            Ok(Value::Undefined)
        }),
    );
    console.set(
        "warn",
        native_function("warn", |_, _, args| {
            tracing::warn!(target: "hyperbox::console", "{}", format_args(args));
            Ok(Value::Undefined)
        }),
    );
    console.set(
        "error",
        native_function("error", |_, _, args| {
            tracing::error!(target: "hyperbox::console", "{}", format_args(args));
            Ok(Value::Undefined)
        }),
    );
    console.set(
        "debug",
        native_function("debug", |_, _, args| {
            tracing::debug!(target: "hyperbox::console", "{}", format_args(args));
            Ok(Value::Undefined)
        }),
    );
    console.set(
        "trace",
        native_function("trace", |_, _, args| {
            tracing::trace!(target: "hyperbox::console", "{}", format_args(args));
            Ok(Value::Undefined)
        }),
    );

    console.freeze();
    Value::Object(console)
}

/// Join arguments the way `console.log` prints them
pub fn format_args(args: &[Value]) -> String {
    args.iter().map(format_value).collect::<Vec<_>>().join(" ")
}

/// Format a single value for display
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        Value::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Function(function) => format!("[Function: {}]", function.name()),
            ObjectKind::Error => value.to_js_string(),
            ObjectKind::Bytes(bytes) => format!("<Buffer {}>", hex::encode(bytes)),
            ObjectKind::Ordinary | ObjectKind::Array(_) => match to_json(value) {
                Ok(Some(json)) => json.to_string(),
                _ => "[Circular]".to_string(),
            },
        },
        other => other.to_js_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_args() {
        let obj = ObjectRef::ordinary();
        obj.set("a", Value::from(1));
        let args = [Value::from("count:"), Value::from(3), Value::Object(obj)];
        assert_eq!(format_args(&args), r#"count: 3 {"a":1}"#);
    }

    #[test]
    fn test_format_buffer_and_null() {
        assert_eq!(format_value(&Value::Object(ObjectRef::bytes(vec![1, 255]))), "<Buffer 01ff>");
        assert_eq!(format_value(&Value::Null), "null");
    }
}
