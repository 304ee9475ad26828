// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the sandbox runtime

use thiserror::Error;

/// Result type for sandbox operations
pub type Result<T> = std::result::Result<T, VmError>;

/// Errors that can occur while loading or running modules
#[derive(Debug, Error)]
pub enum VmError {
    /// Invalid option combination or configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A module was loaded twice
    #[error("Module '{0}' has already been loaded")]
    AlreadyLoaded(String),

    /// The shared environment was used before `init_global_context`
    #[error(
        "The global context must be initialized with init_global_context before a module can use it"
    )]
    GlobalContextUninitialized,

    /// A dependency specifier that is not a non-empty string
    #[error("Invalid module specifier: {0}")]
    InvalidSpecifier(String),

    /// Module not found
    #[error("Cannot find module '{0}'")]
    ModuleNotFound(String),

    /// Error raised while compiling or running module code
    #[error("{0}")]
    Script(hyperbox_script::Error),

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Module code called `process.exit`
    #[error("process.exit({0}) called")]
    Exit(i32),
}

impl VmError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a module not found error
    pub fn module_not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound(module.into())
    }

    /// Whether this error is a structural misuse of the API rather than a
    /// failure of the code being run. Contract violations are never cached.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            VmError::Config(_)
                | VmError::AlreadyLoaded(_)
                | VmError::GlobalContextUninitialized
                | VmError::InvalidSpecifier(_)
        )
    }

    /// Converts this error for a trip through script frames.
    ///
    /// Script errors travel as themselves so `catch` sees the original
    /// value; everything else is boxed as a host error and recovered by
    /// [`From<hyperbox_script::Error>`] on the way out.
    pub fn into_script(self) -> hyperbox_script::Error {
        match self {
            VmError::Script(err) => err,
            other => hyperbox_script::Error::host(other),
        }
    }
}

impl From<hyperbox_script::Error> for VmError {
    fn from(err: hyperbox_script::Error) -> Self {
        match err {
            hyperbox_script::Error::Host(host) => match host.downcast::<VmError>() {
                Ok(vm) => *vm,
                Err(other) => VmError::Script(hyperbox_script::Error::Host(other)),
            },
            other => VmError::Script(other),
        }
    }
}
