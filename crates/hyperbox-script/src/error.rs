// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Errors raised while parsing or executing script code.

use crate::runtime::Value;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during script execution.
#[derive(Debug, Error)]
pub enum Error {
    /// Syntax error during parsing
    #[error("SyntaxError: {0}")]
    SyntaxError(String),

    /// Type error during execution
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Reference error (undefined variable)
    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    /// Range error (call depth, invalid lengths)
    #[error("RangeError: {0}")]
    RangeError(String),

    /// A value thrown by script code and never caught
    #[error("Uncaught {}", describe_thrown(.0))]
    Thrown(Value),

    /// An error raised by a host binding while script code was running
    #[error("{0}")]
    Host(Box<dyn std::error::Error>),
}

impl Error {
    /// Create a new TypeError
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a new RangeError
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// Create a new ReferenceError
    pub fn reference_error(msg: impl Into<String>) -> Self {
        Self::ReferenceError(msg.into())
    }

    /// Wrap a host error so it can travel through script frames.
    pub fn host(err: impl std::error::Error + 'static) -> Self {
        Self::Host(Box::new(err))
    }

    /// The constructor name script code sees when this error is caught.
    pub fn name(&self) -> &'static str {
        match self {
            Error::SyntaxError(_) => "SyntaxError",
            Error::TypeError(_) => "TypeError",
            Error::ReferenceError(_) => "ReferenceError",
            Error::RangeError(_) => "RangeError",
            Error::Thrown(_) | Error::Host(_) => "Error",
        }
    }

    /// The message without the constructor-name prefix.
    pub fn message(&self) -> String {
        match self {
            Error::SyntaxError(msg)
            | Error::TypeError(msg)
            | Error::ReferenceError(msg)
            | Error::RangeError(msg) => msg.clone(),
            Error::Thrown(value) => describe_thrown(value),
            Error::Host(err) => err.to_string(),
        }
    }
}

/// Renders a thrown value the way an uncaught exception is reported:
/// `Name: message` for error-like objects, the string form otherwise.
fn describe_thrown(value: &Value) -> String {
    if let Value::Object(obj) = value {
        let message = obj.get("message");
        if let Some(message) = message.filter(|m| !m.is_undefined()) {
            let name = obj
                .get("name")
                .map(|n| n.to_js_string())
                .unwrap_or_else(|| "Error".to_string());
            return format!("{}: {}", name, message.to_js_string());
        }
    }
    value.to_js_string()
}
