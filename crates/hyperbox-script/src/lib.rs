// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # hyperbox-script
//!
//! A small tree-walking script engine used by `hyperbox-vm` to run
//! CommonJS-style modules.
//!
//! ## Overview
//!
//! This crate provides:
//! - Lexer and recursive-descent parser for an ES2015 subset
//! - A re-entrant interpreter with closures, exceptions and call-depth limits
//! - Per-[`Context`] global objects and intrinsics
//! - JSON interop through `serde_json`
//!
//! ## Quick Start
//!
//! ```rust
//! use hyperbox_script::{Context, Engine, Value};
//!
//! let engine = Engine::new();
//! let context = Context::new();
//! let result = engine.eval("1 + 2", &context).unwrap();
//! assert_eq!(result, Value::Number(3.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
mod builtins;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod runtime;

pub use error::{Error, Result};
pub use interpreter::{Interpreter, MethodSet};
pub use parser::Parser;
pub use runtime::{Context, ObjectKind, ObjectRef, Value};

/// The main script engine.
///
/// An engine owns the interpreter and its shared method tables. Global
/// state lives in [`Context`]s, so one engine can run code in any number
/// of isolated contexts.
pub struct Engine {
    interpreter: Interpreter,
}

impl Engine {
    /// Creates a new engine.
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    /// Evaluates source code as a program in `context`.
    ///
    /// Returns the value of the last expression statement.
    pub fn eval(&self, source: &str, context: &Context) -> Result<Value> {
        let program = Parser::new(source).parse_program()?;
        self.interpreter.run_program(&program, context)
    }

    /// Compiles `body` as the body of a function taking `params`, closed
    /// over the top level of `context`.
    ///
    /// Syntax errors name `filename`.
    pub fn compile_function(
        &self,
        params: &[&str],
        body: &str,
        filename: &str,
        context: &Context,
    ) -> Result<Value> {
        let node = Parser::new(body)
            .parse_function_body_source(params)
            .map_err(|err| match err {
                Error::SyntaxError(msg) => Error::SyntaxError(format!("{} in {}", msg, filename)),
                other => other,
            })?;
        Ok(self.interpreter.instantiate(node, context))
    }

    /// Calls a function value.
    pub fn call(&self, callee: &Value, this: &Value, args: &[Value]) -> Result<Value> {
        self.interpreter.call(callee, this, args)
    }

    /// The underlying interpreter.
    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_in_context() {
        let engine = Engine::new();
        let context = Context::new();
        engine.eval("var answer = 6 * 7;", &context).unwrap();
        assert_eq!(context.get("answer"), Some(Value::Number(42.0)));
    }

    #[test]
    fn test_compile_function_names_file() {
        let engine = Engine::new();
        let context = Context::new();
        let err = engine
            .compile_function(&["x"], "return (", "broken.js", &context)
            .unwrap_err();
        assert!(matches!(err, Error::SyntaxError(_)));
        assert!(err.to_string().ends_with("in broken.js"));
    }

    #[test]
    fn test_compile_function_allows_return() {
        let engine = Engine::new();
        let context = Context::new();
        let f = engine
            .compile_function(&["a", "b"], "return a + b;", "add.js", &context)
            .unwrap();
        let result = engine
            .call(&f, &Value::Undefined, &[Value::from(2), Value::from(3)])
            .unwrap();
        assert_eq!(result, Value::Number(5.0));
    }
}
