// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `Error` and its subclasses.

use crate::runtime::{ObjectKind, ObjectRef, Value, arg, native_function};

const SUBCLASSES: [&str; 4] = ["TypeError", "RangeError", "ReferenceError", "SyntaxError"];

pub(super) fn install(intrinsics: &ObjectRef) {
    let base = ObjectRef::ordinary();
    base.set("name", Value::from("Error"));
    base.set("message", Value::from(""));
    intrinsics.set("Error", constructor("Error", base.clone()));

    for name in SUBCLASSES {
        let prototype = ObjectRef::with_prototype(ObjectKind::Ordinary, Some(base.clone()));
        prototype.set("name", Value::from(name));
        intrinsics.set(name, constructor(name, prototype));
    }
}

fn constructor(name: &str, prototype: ObjectRef) -> Value {
    let proto = prototype.clone();
    let ctor_name = name.to_string();
    let ctor = native_function(name, move |_, _, args| {
        let error = ObjectRef::with_prototype(ObjectKind::Error, Some(proto.clone()));
        let message = arg(args, 0);
        let message = if message.is_undefined() {
            String::new()
        } else {
            message.to_js_string()
        };
        if !message.is_empty() {
            error.set("message", Value::from(message.as_str()));
        }
        if let Some(Value::Object(options)) = args.get(1) {
            if let Some(cause) = options.get("cause") {
                error.set("cause", cause);
            }
        }
        error.set("stack", Value::from(stack_text(&ctor_name, &message)));
        Ok(Value::Object(error))
    });

    if let Value::Object(obj) = &ctor {
        obj.set("prototype", Value::Object(prototype));
    }
    ctor
}

fn stack_text(name: &str, message: &str) -> String {
    if message.is_empty() {
        format!("{}\n    at <anonymous>", name)
    } else {
        format!("{}: {}\n    at <anonymous>", name, message)
    }
}

/// An error object without a constructor, used when the context's own
/// constructors are unavailable.
pub(crate) fn plain_error(name: &str, message: &str) -> Value {
    let error = ObjectRef::new(ObjectKind::Error);
    error.set("name", Value::from(name));
    error.set("message", Value::from(message));
    error.set("stack", Value::from(stack_text(name, message)));
    Value::Object(error)
}
