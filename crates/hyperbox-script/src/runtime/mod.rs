// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime data structures: values, objects, functions, scopes and contexts.

mod context;
mod function;
mod json;
mod object;
mod scope;
mod value;

pub use context::Context;
pub use function::{FunctionKind, NativeFn, arg, native_function};
pub(crate) use function::script_function;
pub use json::{from_json, to_json};
pub use object::{JsObject, ObjectKind, ObjectRef};
pub(crate) use object::array_index;
pub use scope::Scope;
pub use value::{Value, number_to_string};
