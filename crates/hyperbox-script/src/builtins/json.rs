// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The `JSON` object.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use super::define;
use crate::error::Error;
use crate::runtime::{ObjectRef, Value, arg, from_json, to_json};

pub(super) fn install(intrinsics: &ObjectRef) {
    let json = ObjectRef::ordinary();

    define(&json, "stringify", |_, _, args| {
        let Some(document) = to_json(&arg(args, 0))? else {
            return Ok(Value::Undefined);
        };
        let indent = match arg(args, 2) {
            Value::Number(n) if n >= 1.0 => " ".repeat(n.min(10.0) as usize),
            Value::String(s) => s.chars().take(10).collect(),
            _ => String::new(),
        };
        if indent.is_empty() {
            return Ok(Value::from(document.to_string()));
        }
        Ok(Value::from(pretty(&document, &indent)?))
    });

    define(&json, "parse", |_, _, args| {
        let text = arg(args, 0).to_js_string();
        let document: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| Error::SyntaxError(format!("Unexpected token in JSON: {}", e)))?;
        Ok(from_json(&document))
    });

    intrinsics.set("JSON", Value::Object(json));
}

fn pretty(document: &serde_json::Value, indent: &str) -> crate::error::Result<String> {
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = Serializer::with_formatter(&mut out, formatter);
    document
        .serialize(&mut serializer)
        .map_err(|e| Error::type_error(e.to_string()))?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
