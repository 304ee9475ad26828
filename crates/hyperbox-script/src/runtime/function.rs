// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Function objects: script closures and host-provided natives.

use std::fmt;
use std::rc::Rc;

use super::object::{ObjectKind, ObjectRef};
use super::scope::Scope;
use super::value::Value;
use crate::ast::FunctionNode;
use crate::error::Result;
use crate::interpreter::Interpreter;

/// Signature of a host function callable from script code.
///
/// Receives the interpreter (to call back into script code), `this` and
/// the call arguments.
pub type NativeFn = Rc<dyn Fn(&Interpreter, &Value, &[Value]) -> Result<Value>>;

/// The callable part of a function object.
#[derive(Clone)]
pub enum FunctionKind {
    /// A closure over the scope it was created in
    Script {
        /// The parsed function
        node: Rc<FunctionNode>,
        /// The captured scope
        scope: Scope,
    },
    /// A host function
    Native {
        /// The function name
        name: Rc<str>,
        /// The implementation
        func: NativeFn,
    },
}

impl FunctionKind {
    /// The function's name (empty for anonymous functions).
    pub fn name(&self) -> &str {
        match self {
            FunctionKind::Script { node, .. } => {
                node.id.as_ref().map(|id| id.name.as_str()).unwrap_or("")
            }
            FunctionKind::Native { name, .. } => name,
        }
    }

    /// The number of declared parameters.
    pub fn arity(&self) -> usize {
        match self {
            FunctionKind::Script { node, .. } => node.params.len(),
            FunctionKind::Native { .. } => 0,
        }
    }

    /// Returns true for arrow functions, which cannot be constructed.
    pub fn is_arrow(&self) -> bool {
        matches!(self, FunctionKind::Script { node, .. } if node.is_arrow)
    }

    pub(crate) fn source_text(&self) -> String {
        match self {
            FunctionKind::Script { .. } => format!("function {}() {{ [code] }}", self.name()),
            FunctionKind::Native { .. } => {
                format!("function {}() {{ [native code] }}", self.name())
            }
        }
    }
}

impl fmt::Debug for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.name())
    }
}

/// Creates a function value backed by a host closure.
///
/// # Example
///
/// ```rust
/// use hyperbox_script::runtime::{Value, native_function};
///
/// let double = native_function("double", |_, _, args| {
///     Ok(Value::from(args.first().map(|v| v.to_number()).unwrap_or(0.0) * 2.0))
/// });
/// assert!(double.is_function());
/// ```
pub fn native_function<F>(name: &str, func: F) -> Value
where
    F: Fn(&Interpreter, &Value, &[Value]) -> Result<Value> + 'static,
{
    Value::Object(ObjectRef::new(ObjectKind::Function(FunctionKind::Native {
        name: Rc::from(name),
        func: Rc::new(func),
    })))
}

/// Creates a closure value for a parsed function in `scope`.
pub(crate) fn script_function(node: Rc<FunctionNode>, scope: Scope) -> Value {
    Value::Object(ObjectRef::new(ObjectKind::Function(FunctionKind::Script {
        node,
        scope,
    })))
}

/// Returns the argument at `index`, or `undefined`.
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}
