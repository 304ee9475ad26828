// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Process-wide loader state

use super::extensions::{ExtensionHandler, ExtensionRegistry};
use super::module::{Module, ModuleOptions};
use super::resolver::{NodeResolver, absolute_dir, is_path_specifier, node_module_paths};
use super::store::{DiskStore, SourceStore};
use crate::config::RuntimeConfig;
use crate::environment::{Bindings, Environment};
use crate::error::{Result, VmError};
use crate::globals::Baseline;
use crate::globals::timers::TimerQueue;
use crate::lru::BoundedCache;
use hyperbox_script::Engine;
use hyperbox_script::runtime::Value;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

/// What a specifier resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Built-in native module
    Native(String),
    /// File module (canonical path)
    File(PathBuf),
}

impl Resolved {
    /// The id the module is cached under
    pub fn id(&self) -> String {
        match self {
            Resolved::Native(name) => name.clone(),
            Resolved::File(path) => path.to_string_lossy().into_owned(),
        }
    }
}

/// Builds a native module's exports
pub type NativeModuleFactory = Rc<dyn Fn(&Runtime) -> Value>;

struct NativeModule {
    factory: NativeModuleFactory,
    exports: Option<Value>,
}

struct RuntimeInner {
    config: RuntimeConfig,
    engine: Engine,
    resolver: NodeResolver<Rc<dyn SourceStore>>,
    extensions: RefCell<ExtensionRegistry>,
    initializers: RefCell<BoundedCache<String, Value>>,
    shared: RefCell<Option<Environment>>,
    baseline: Baseline,
    natives: RefCell<FxHashMap<String, NativeModule>>,
    timers: TimerQueue,
}

/// Loader state shared by every module it creates: the script engine,
/// the extension registry, the initializer cache, the shared environment
/// slot and the native-module registry.
///
/// Cloning yields another handle to the same runtime.
#[derive(Clone)]
pub struct Runtime(Rc<RuntimeInner>);

impl Runtime {
    /// Create a runtime reading sources from disk
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_store(config, DiskStore)
    }

    /// Create a runtime reading sources from `store`
    pub fn with_store(config: RuntimeConfig, store: impl SourceStore + 'static) -> Self {
        let engine = Engine::new();
        let timers = TimerQueue::new();
        let baseline = Baseline::new(engine.interpreter(), &config, &timers);
        let store: Rc<dyn SourceStore> = Rc::new(store);

        let runtime = Runtime(Rc::new(RuntimeInner {
            initializers: RefCell::new(BoundedCache::new(config.initializer_cache_size)),
            engine,
            resolver: NodeResolver::new(store),
            extensions: RefCell::new(ExtensionRegistry::new()),
            shared: RefCell::new(None),
            baseline,
            natives: RefCell::new(FxHashMap::default()),
            timers,
            config,
        }));

        if runtime.0.config.native_modules {
            crate::modules::register_defaults(&runtime);
        }
        runtime
    }

    /// The configuration this runtime was built with
    pub fn config(&self) -> &RuntimeConfig {
        &self.0.config
    }

    /// The script engine
    pub fn engine(&self) -> &Engine {
        &self.0.engine
    }

    /// The baseline bindings installed into every environment
    pub fn baseline(&self) -> &Baseline {
        &self.0.baseline
    }

    /// Create an ephemeral environment
    pub fn create_environment(&self, extra: &Bindings) -> Environment {
        Environment::create(&self.0.baseline, extra)
    }

    /// Initialize or reset the shared environment with `extra` bindings.
    ///
    /// Call before every execution that uses the shared environment so
    /// bindings from a previous execution do not bleed into the next.
    ///
    /// Timer callbacks still queued are dropped, so a shared execution
    /// always starts with an empty timer queue. Hosts that want queued
    /// callbacks to fire call [`Runtime::run_timers`] after each run.
    pub fn init_global_context(&self, extra: &Bindings) -> Environment {
        let dropped = self.0.timers.pending();
        if dropped > 0 {
            debug!(dropped, "dropping queued timers before shared execution");
            self.0.timers.clear_all();
        }

        let mut shared = self.0.shared.borrow_mut();
        match shared.as_ref() {
            Some(env) => {
                debug!("resetting shared environment");
                env.reset_shared(&self.0.baseline, extra);
                env.clone()
            }
            None => {
                debug!("creating shared environment");
                let env = Environment::create(&self.0.baseline, extra);
                *shared = Some(env.clone());
                env
            }
        }
    }

    /// The shared environment, if it has been initialized
    pub fn global_context(&self) -> Option<Environment> {
        self.0.shared.borrow().clone()
    }

    /// Drop every cached initializer
    pub fn clear_initializer_cache(&self) {
        self.0.initializers.borrow_mut().reset();
    }

    /// Number of cached initializers
    pub fn initializer_cache_len(&self) -> usize {
        self.0.initializers.borrow().size()
    }

    pub(crate) fn cached_initializer(&self, id: &str) -> Option<Value> {
        self.0.initializers.borrow_mut().get(&id.to_string())
    }

    pub(crate) fn cache_initializer(&self, id: &str, initializer: Value) {
        debug!(id, "caching initializer");
        self.0
            .initializers
            .borrow_mut()
            .set(id.to_string(), initializer);
    }

    /// Register or replace the compilation handler for an extension
    pub fn add_extension<F>(&self, ext: &str, handler: F)
    where
        F: Fn(&Module, &Path) -> Result<()> + 'static,
    {
        debug!(ext, "registering extension handler");
        self.0.extensions.borrow_mut().insert(ext, Rc::new(handler));
    }

    /// The handler used to compile `path`
    pub fn extension_for(&self, path: &Path) -> ExtensionHandler {
        self.0.extensions.borrow().handler_for(path)
    }

    /// Registered extensions, each with its dot
    pub fn extensions(&self) -> Vec<String> {
        self.0.extensions.borrow().extensions()
    }

    /// Register a native module. Its exports are built on first require
    /// and shared by every module of this runtime.
    pub fn register_native_module<F>(&self, name: &str, factory: F)
    where
        F: Fn(&Runtime) -> Value + 'static,
    {
        self.0.natives.borrow_mut().insert(
            name.to_string(),
            NativeModule {
                factory: Rc::new(factory),
                exports: None,
            },
        );
    }

    /// Returns true if `name` (optionally prefixed `node:`) is a native
    /// module
    pub fn is_native_module(&self, name: &str) -> bool {
        let name = name.strip_prefix("node:").unwrap_or(name);
        self.0.natives.borrow().contains_key(name)
    }

    /// The exports of a native module
    pub fn require_native(&self, name: &str) -> Result<Value> {
        let name = name.strip_prefix("node:").unwrap_or(name);
        let factory = {
            let natives = self.0.natives.borrow();
            let native = natives
                .get(name)
                .ok_or_else(|| VmError::module_not_found(name))?;
            if let Some(exports) = &native.exports {
                return Ok(exports.clone());
            }
            native.factory.clone()
        };

        debug!(name, "building native module");
        let exports = factory(self);
        if let Some(object) = exports.as_object() {
            object.freeze();
        }
        if let Some(native) = self.0.natives.borrow_mut().get_mut(name) {
            native.exports = Some(exports.clone());
        }
        Ok(exports)
    }

    /// Resolve `specifier` as required from `from` (or the working
    /// directory for a top-level load)
    pub fn resolve(&self, specifier: &str, from: Option<&Module>) -> Result<Resolved> {
        if specifier.is_empty() {
            return Err(VmError::InvalidSpecifier(
                "path must be a non-empty string".to_string(),
            ));
        }
        if !is_path_specifier(specifier) && self.is_native_module(specifier) {
            let name = specifier.strip_prefix("node:").unwrap_or(specifier);
            return Ok(Resolved::Native(name.to_string()));
        }

        let (dir, paths) = match from {
            Some(module) => {
                let paths = module.paths();
                let dir = module.dirname();
                let paths = if paths.is_empty() {
                    node_module_paths(&dir)
                } else {
                    paths
                };
                (dir, paths)
            }
            None => {
                let dir = absolute_dir(Path::new("."));
                let paths = node_module_paths(&dir);
                (dir, paths)
            }
        };

        let extensions = self.extensions();
        self.0
            .resolver
            .resolve(specifier, &dir, &paths, &extensions)
            .map(Resolved::File)
    }

    /// Read a module source through the runtime's store
    pub fn read_source(&self, path: &Path) -> Result<String> {
        debug!(path = %path.display(), "reading module source");
        self.0.resolver.store().read_to_string(path)
    }

    /// Create a root module for `id` and run `filename` through it
    pub fn load(&self, id: &str, filename: impl AsRef<Path>) -> Result<Module> {
        let filename = filename.as_ref();
        let module = Module::new(self, ModuleOptions::new(id))?;
        module.load(filename)?;
        module.run(filename)?;
        Ok(module)
    }

    /// Resolve and load `specifier`, returning its exports.
    ///
    /// A module already in `parent`'s load tree is returned as is. A new
    /// module is registered in the tree before it runs, so cyclic requires
    /// see its partial exports, and removed again if it fails.
    pub fn load_file(&self, specifier: &str, parent: Option<&Module>) -> Result<Value> {
        let resolved = self.resolve(specifier, parent)?;
        let id = resolved.id();

        if let Some(cached) = parent.and_then(|p| p.cache().get(&id)) {
            debug!(id = %id, "load-tree cache hit");
            return Ok(cached.exports());
        }

        let filename = match resolved {
            Resolved::Native(name) => return self.require_native(&name),
            Resolved::File(path) => path,
        };

        let module = match parent {
            Some(parent) => Module::child(id.as_str(), parent)?,
            None => Module::new(self, ModuleOptions::new(id.as_str()))?,
        };
        module.cache().insert(id.as_str(), module.clone());

        debug!(id = %id, "loading module");
        let result = module.load(&filename).and_then(|_| module.run(&filename));
        if let Err(err) = result {
            module.cache().remove(&id);
            warn!(id = %id, error = %err, "module failed to load; removed from load-tree cache");
            return Err(err);
        }

        Ok(module.exports())
    }

    /// Fire every queued timer callback once
    pub fn run_timers(&self) -> Result<usize> {
        Ok(self.0.timers.run(self.0.engine.interpreter())?)
    }

    /// Number of queued timer callbacks
    pub fn pending_timers(&self) -> usize {
        self.0.timers.pending()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.0.config)
            .field("extensions", &self.0.extensions.borrow())
            .field("initializers", &self.0.initializers.borrow().size())
            .field("shared", &self.0.shared.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_system::store::MemoryStore;

    fn runtime(files: &[(&str, &str)]) -> Runtime {
        let store = files
            .iter()
            .fold(MemoryStore::new(), |store, (path, source)| {
                store.with_file(path, *source)
            });
        Runtime::with_store(RuntimeConfig::default(), store)
    }

    #[test]
    fn test_native_modules() {
        let runtime = Runtime::default();
        assert!(runtime.is_native_module("path"));
        assert!(runtime.is_native_module("node:path"));
        assert!(!runtime.is_native_module("fs"));

        let a = runtime.require_native("path").unwrap();
        let b = runtime.require_native("node:path").unwrap();
        assert_eq!(a, b);
        assert!(a.as_object().unwrap().is_frozen());
    }

    #[test]
    fn test_native_modules_can_be_disabled() {
        let config = RuntimeConfig {
            native_modules: false,
            ..Default::default()
        };
        assert!(!Runtime::new(config).is_native_module("path"));
    }

    #[test]
    fn test_init_global_context_keeps_identity() {
        let runtime = Runtime::default();
        assert!(runtime.global_context().is_none());

        let first = runtime.init_global_context(&Bindings::new());
        let second = runtime.init_global_context(&Bindings::new());
        assert!(first.ptr_eq(&second));
        assert!(runtime.global_context().unwrap().ptr_eq(&first));
    }

    #[test]
    fn test_load_file_registers_and_returns_exports() {
        let runtime = runtime(&[("/app/a.js", "module.exports = { n: 1 };")]);
        let exports = runtime.load_file("/app/a.js", None).unwrap();
        assert_eq!(exports.as_object().unwrap().get("n"), Some(Value::from(1)));
    }

    #[test]
    fn test_load_file_missing() {
        let runtime = runtime(&[]);
        let err = runtime.load_file("/app/nope.js", None).unwrap_err();
        assert!(matches!(err, VmError::ModuleNotFound(_)));
        assert!(runtime.load_file("", None).unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_initializer_cache_len_and_clear() {
        let runtime = Runtime::default();
        runtime.cache_initializer("a", Value::Null);
        runtime.cache_initializer("b", Value::Null);
        assert_eq!(runtime.initializer_cache_len(), 2);
        assert_eq!(runtime.cached_initializer("a"), Some(Value::Null));

        runtime.clear_initializer_cache();
        assert_eq!(runtime.initializer_cache_len(), 0);
    }
}
