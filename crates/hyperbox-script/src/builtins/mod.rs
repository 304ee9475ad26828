// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Built-in objects and methods.
//!
//! Intrinsics (`Object`, `JSON`, `Math`, error constructors, ...) are
//! created per [`Context`](crate::runtime::Context). Methods shared by
//! every value of a kind (`[].push`, `"".trim`) live in the interpreter's
//! method tables.

mod array;
pub(crate) mod error;
mod function;
mod global;
mod json;
mod math;
mod number;
mod object;
mod string;

use crate::error::Result;
use crate::interpreter::{Interpreter, MethodSet};
use crate::runtime::{ObjectRef, Value, native_function};

/// Builds a fresh set of intrinsics.
pub(crate) fn create_intrinsics() -> ObjectRef {
    let intrinsics = ObjectRef::ordinary();
    global::install(&intrinsics);
    object::install(&intrinsics);
    array::install(&intrinsics);
    function::install(&intrinsics);
    math::install(&intrinsics);
    json::install(&intrinsics);
    error::install(&intrinsics);
    intrinsics
}

/// Installs the shared method tables.
pub(crate) fn install_methods(interpreter: &Interpreter) {
    object::install_methods(interpreter);
    array::install_methods(interpreter);
    string::install_methods(interpreter);
    number::install_methods(interpreter);
    function::install_methods(interpreter);
}

/// Defines a native function property on `target`.
pub(crate) fn define<F>(target: &ObjectRef, name: &str, func: F)
where
    F: Fn(&Interpreter, &Value, &[Value]) -> Result<Value> + 'static,
{
    target.set(name, native_function(name, func));
}

/// Defines a shared method.
pub(crate) fn method<F>(interpreter: &Interpreter, set: MethodSet, name: &str, func: F)
where
    F: Fn(&Interpreter, &Value, &[Value]) -> Result<Value> + 'static,
{
    interpreter.define_method(set, name, native_function(name, func));
}

/// Resolves a relative index argument (`slice(-2)`) against `len`.
pub(crate) fn relative_index(value: &Value, len: usize, default: usize) -> usize {
    if value.is_undefined() {
        return default;
    }
    let n = value.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}
