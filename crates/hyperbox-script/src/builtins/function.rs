// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The `Function` constructor and function methods.

use super::method;
use crate::error::Error;
use crate::interpreter::{Interpreter, MethodSet};
use crate::runtime::{ObjectRef, Value, arg, native_function};

pub(super) fn install(intrinsics: &ObjectRef) {
    intrinsics.set(
        "Function",
        native_function("Function", |_, _, _| {
            Err(Error::type_error(
                "Code generation from strings is not supported",
            ))
        }),
    );
}

pub(super) fn install_methods(interpreter: &Interpreter) {
    method(interpreter, MethodSet::Function, "call", |interp, this, args| {
        let rest = args.get(1..).unwrap_or_default();
        interp.call(this, &arg(args, 0), rest)
    });

    method(interpreter, MethodSet::Function, "apply", |interp, this, args| {
        let call_args = match arg(args, 1) {
            Value::Undefined | Value::Null => Vec::new(),
            Value::Object(obj) => obj
                .array_items()
                .ok_or_else(|| Error::type_error("CreateListFromArrayLike called on non-array"))?,
            _ => {
                return Err(Error::type_error(
                    "CreateListFromArrayLike called on non-object",
                ));
            }
        };
        interp.call(this, &arg(args, 0), &call_args)
    });

    method(interpreter, MethodSet::Function, "bind", |_, this, args| {
        if !this.is_function() {
            return Err(Error::type_error("Bind must be called on a function"));
        }
        let target = this.clone();
        let bound_this = arg(args, 0);
        let bound_args = args.get(1..).unwrap_or_default().to_vec();
        Ok(native_function("bound", move |interp, _, call_args| {
            let mut all = bound_args.clone();
            all.extend_from_slice(call_args);
            interp.call(&target, &bound_this, &all)
        }))
    });

    method(interpreter, MethodSet::Function, "toString", |_, this, _| {
        Ok(Value::from(this.to_js_string()))
    });
}
