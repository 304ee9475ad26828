// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Configuration loaded from TOML
//!
//! ```toml
//! cache_size = 500
//!
//! [runtime]
//! initializer_cache_size = 10000
//! process_env = ["NODE_ENV", "TZ"]
//!
//! [run]
//! use_global_context = true
//! prefer_cached_initializer = true
//!
//! [run.globals]
//! locale = "en-US"
//! ```

use crate::error::{Result, VmError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default capacity of the initializer cache
pub const INITIALIZER_CACHE_SIZE: usize = 10_000;

/// Process-wide loader settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of the initializer cache
    pub initializer_cache_size: usize,
    /// Host environment variables exposed through `process.env`
    pub process_env: Vec<String>,
    /// Whether the built-in `path` module is registered
    pub native_modules: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initializer_cache_size: INITIALIZER_CACHE_SIZE,
            process_env: vec!["NODE_ENV".to_string()],
            native_modules: true,
        }
    }
}

/// Default options for each execution service call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Reuse compiled initializers instead of memoizing exports
    pub prefer_cached_initializer: bool,
    /// Run against the shared environment
    pub use_global_context: bool,
    /// Extra bindings for the shared environment
    pub globals: serde_json::Map<String, serde_json::Value>,
}

/// Execution service settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Export cache capacity; unbounded when unset
    pub cache_size: Option<usize>,
    /// Loader settings
    pub runtime: RuntimeConfig,
    /// Run defaults
    pub run: RunConfig,
}

impl VmConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: VmConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Check option combinations that would fail on every run
    pub fn validate(&self) -> Result<()> {
        if self.run.use_global_context != self.run.prefer_cached_initializer {
            return Err(VmError::config(
                "run.use_global_context and run.prefer_cached_initializer must be set together",
            ));
        }
        if !self.run.globals.is_empty() && !self.run.use_global_context {
            return Err(VmError::config(
                "run.globals requires run.use_global_context",
            ));
        }
        Ok(())
    }
}
