// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Sandboxed execution service
//!
//! Runs named source blobs as module bodies and memoizes their exports by
//! a fingerprint of name and source.

use crate::config::{RunConfig, VmConfig};
use crate::environment::Bindings;
use crate::error::{Result, VmError};
use crate::lru::BoundedCache;
use crate::module_system::{Module, ModuleOptions, Runtime};
use hyperbox_script::runtime::{Value, from_json};
use sha1::{Digest, Sha1};
use std::cell::RefCell;
use tracing::debug;

/// Computes the export-cache key for `(name, source)`
pub type KeyFn = Box<dyn Fn(&str, &str) -> String>;

/// Supplies the parent module for a name
pub type EnvironmentFn = Box<dyn Fn(&str) -> Option<Module>>;

/// Options for [`Vm::new`]
#[derive(Default)]
pub struct VmOptions {
    /// Export cache capacity; unbounded when `None` or zero
    pub cache_size: Option<usize>,
    /// Custom fingerprint function
    pub get_key: Option<KeyFn>,
    /// Per-name parent module factory
    pub environment: Option<EnvironmentFn>,
}

impl VmOptions {
    /// Default options: unbounded cache, content-hash fingerprints
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the export cache
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }

    /// Use a custom fingerprint function
    pub fn with_get_key<F>(mut self, get_key: F) -> Self
    where
        F: Fn(&str, &str) -> String + 'static,
    {
        self.get_key = Some(Box::new(get_key));
        self
    }

    /// Derive each run's parent module from its name
    pub fn with_environment<F>(mut self, environment: F) -> Self
    where
        F: Fn(&str) -> Option<Module> + 'static,
    {
        self.environment = Some(Box::new(environment));
        self
    }
}

/// Options for one [`Vm::run`] call
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Reuse the cached initializer and skip the export cache
    pub prefer_cached_initializer: bool,
    /// Run against the shared environment
    pub use_global_context: bool,
    /// Extra bindings for the shared environment
    pub globals: Bindings,
}

impl RunOptions {
    /// Default options: ephemeral environment, export caching
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt into the shared environment and the initializer cache together
    pub fn shared() -> Self {
        Self::new()
            .with_use_global_context(true)
            .with_prefer_cached_initializer(true)
    }

    /// Set whether cached initializers are preferred
    pub fn with_prefer_cached_initializer(mut self, prefer: bool) -> Self {
        self.prefer_cached_initializer = prefer;
        self
    }

    /// Set whether the shared environment is used
    pub fn with_use_global_context(mut self, use_global: bool) -> Self {
        self.use_global_context = use_global;
        self
    }

    /// Add one extra binding
    pub fn with_global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.globals.insert(name.into(), value);
        self
    }
}

impl From<&RunConfig> for RunOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            prefer_cached_initializer: config.prefer_cached_initializer,
            use_global_context: config.use_global_context,
            globals: config
                .globals
                .iter()
                .map(|(name, value)| (name.clone(), from_json(value)))
                .collect(),
        }
    }
}

/// The default fingerprint: `name` plus the SHA-1 of `source`
pub fn default_key(name: &str, source: &str) -> String {
    format!("{}::{}", name, hex::encode(Sha1::digest(source.as_bytes())))
}

/// Execution service with an export cache
pub struct Vm {
    runtime: Runtime,
    exports_cache: RefCell<BoundedCache<String, Value>>,
    get_key: KeyFn,
    environment: Option<EnvironmentFn>,
}

impl Vm {
    /// Create a service on `runtime`
    pub fn new(runtime: Runtime, options: VmOptions) -> Self {
        Self {
            runtime,
            exports_cache: RefCell::new(BoundedCache::with_capacity(options.cache_size)),
            get_key: options.get_key.unwrap_or_else(|| Box::new(default_key)),
            environment: options.environment,
        }
    }

    /// Create a service and its runtime from configuration
    pub fn from_config(config: &VmConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Runtime::new(config.runtime.clone());
        let options = VmOptions {
            cache_size: config.cache_size,
            ..Default::default()
        };
        Ok(Self::new(runtime, options))
    }

    /// Run `source` as the module `name` and return its exports.
    ///
    /// Without `prefer_cached_initializer`, an identical `(name, source)`
    /// pair is served from the export cache without running anything.
    pub fn run(&self, name: &str, source: &str, options: &RunOptions) -> Result<Value> {
        if !options.globals.is_empty() && !options.use_global_context {
            return Err(VmError::config(
                "globals can only be supplied together with use_global_context",
            ));
        }

        let key = (self.get_key)(name, source);
        if !options.prefer_cached_initializer {
            if let Some(exports) = self.exports_cache.borrow_mut().get(&key) {
                debug!(name, key = %key, "export cache hit");
                return Ok(exports);
            }
        }

        let parent = self.environment.as_ref().and_then(|factory| factory(name));
        if options.use_global_context {
            self.runtime.init_global_context(&options.globals);
        }

        debug!(name, key = %key, "running module");
        let module = Module::new(
            &self.runtime,
            ModuleOptions::new(name)
                .with_parent(parent)
                .with_prefer_cached_initializer(options.prefer_cached_initializer)
                .with_use_global_context(options.use_global_context),
        )?;
        module.load(name)?;
        let exports = module.compile(source, name)?;

        if !options.prefer_cached_initializer {
            self.exports_cache.borrow_mut().set(key, exports.clone());
        }
        Ok(exports)
    }

    /// Number of memoized exports
    pub fn exports_cache_len(&self) -> usize {
        self.exports_cache.borrow().size()
    }

    /// Drop every memoized export
    pub fn reset(&self) {
        self.exports_cache.borrow_mut().reset();
    }

    /// The runtime this service loads modules with
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("runtime", &self.runtime)
            .field("exports", &self.exports_cache_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_key() {
        let a = default_key("a.js", "module.exports = 1;");
        assert!(a.starts_with("a.js::"));
        assert_eq!(a.len(), "a.js::".len() + 40);
        assert_eq!(a, default_key("a.js", "module.exports = 1;"));
        assert_ne!(a, default_key("a.js", "module.exports = 2;"));
        assert_ne!(a, default_key("b.js", "module.exports = 1;"));
    }

    #[test]
    fn test_run_options_from_config() {
        let mut config = RunConfig {
            use_global_context: true,
            prefer_cached_initializer: true,
            ..Default::default()
        };
        config
            .globals
            .insert("locale".to_string(), serde_json::json!("en-US"));

        let options = RunOptions::from(&config);
        assert!(options.use_global_context && options.prefer_cached_initializer);
        assert_eq!(options.globals.get("locale"), Some(&Value::from("en-US")));
    }

    #[test]
    fn test_globals_require_shared_context() {
        let vm = Vm::new(Runtime::default(), VmOptions::new());
        let err = vm
            .run(
                "a.js",
                "module.exports = 1;",
                &RunOptions::new().with_global("foo", Value::from("foo")),
            )
            .unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(vm.exports_cache_len(), 0);
    }
}
