// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! A loaded code unit and its `require`

use super::cache::LoadTreeCache;
use super::resolver::absolute_dir;
use super::runtime::Runtime;
use crate::environment::{Bindings, Environment};
use crate::error::{Result, VmError};
use hyperbox_script::runtime::{ObjectRef, Value, arg, native_function};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use tracing::debug;

/// Parameters every module body is compiled with
pub const WRAPPER_PARAMS: [&str; 5] = ["exports", "require", "module", "__filename", "__dirname"];

/// Options for [`Module::new`]
#[derive(Debug, Clone)]
pub struct ModuleOptions {
    /// Module id, usually the resolved filename
    pub id: String,
    /// The module that triggered this load
    pub parent: Option<Module>,
    /// Reuse the initializer cached for this id
    pub prefer_cached_initializer: bool,
    /// Run against the shared environment
    pub use_global_context: bool,
    /// Run against this environment instead of the inherited one
    pub environment: Option<Environment>,
    /// Join this load-tree cache instead of the inherited one
    pub cache: Option<LoadTreeCache>,
}

impl ModuleOptions {
    /// Options for a root module with a fresh environment
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            prefer_cached_initializer: false,
            use_global_context: false,
            environment: None,
            cache: None,
        }
    }

    /// Set the parent module
    pub fn with_parent(mut self, parent: Option<Module>) -> Self {
        self.parent = parent;
        self
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

    /// Opt into the shared environment and the initializer cache together
    pub fn with_shared_context(self) -> Self {
        self.with_use_global_context(true)
            .with_prefer_cached_initializer(true)
    }

    /// Run against `environment`
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Join an existing load-tree cache
    pub fn with_cache(mut self, cache: LoadTreeCache) -> Self {
        self.cache = Some(cache);
        self
    }
}

struct ModuleInner {
    id: String,
    runtime: Runtime,
    handle: ObjectRef,
    cache: LoadTreeCache,
    parent: Option<Weak<ModuleInner>>,
    environment: Environment,
    filename: RefCell<Option<PathBuf>>,
    paths: RefCell<Vec<PathBuf>>,
    loaded: Cell<bool>,
    prefer_cached_initializer: bool,
    use_global_context: bool,
}

/// One loaded code unit.
///
/// Cloning yields another handle to the same module. Script code sees the
/// module as the `module` object passed to its initializer.
#[derive(Clone)]
pub struct Module(Rc<ModuleInner>);

impl Module {
    /// Create a module.
    ///
    /// Fails if `prefer_cached_initializer` and `use_global_context`
    /// differ, if the shared environment is requested before it has been
    /// initialized, or if an environment override is combined with the
    /// shared environment.
    pub fn new(runtime: &Runtime, options: ModuleOptions) -> Result<Self> {
        if options.prefer_cached_initializer != options.use_global_context {
            return Err(VmError::config(
                "prefer_cached_initializer and use_global_context must both be set or both be unset",
            ));
        }

        let environment = if options.use_global_context {
            if options.environment.is_some() {
                return Err(VmError::config(
                    "an explicit environment cannot be combined with use_global_context",
                ));
            }
            runtime
                .global_context()
                .ok_or(VmError::GlobalContextUninitialized)?
        } else {
            match (&options.environment, &options.parent) {
                (Some(env), _) => env.clone(),
                (None, Some(parent)) => parent.environment().clone(),
                (None, None) => runtime.create_environment(&Bindings::new()),
            }
        };

        let cache = match (&options.cache, &options.parent) {
            (Some(cache), _) => cache.clone(),
            (None, Some(parent)) => parent.cache().clone(),
            (None, None) => LoadTreeCache::new(),
        };

        let handle = ObjectRef::ordinary();
        handle.set("id", Value::from(options.id.as_str()));
        handle.set("exports", Value::Object(ObjectRef::ordinary()));
        handle.set("filename", Value::Null);
        handle.set("loaded", Value::Boolean(false));
        handle.set("paths", Value::Object(ObjectRef::array(Vec::new())));
        handle.set(
            "parent",
            options
                .parent
                .as_ref()
                .map(|p| Value::Object(p.handle().clone()))
                .unwrap_or(Value::Null),
        );

        let module = Module(Rc::new(ModuleInner {
            id: options.id,
            runtime: runtime.clone(),
            handle,
            cache,
            parent: options.parent.as_ref().map(|p| Rc::downgrade(&p.0)),
            environment,
            filename: RefCell::new(None),
            paths: RefCell::new(Vec::new()),
            loaded: Cell::new(false),
            prefer_cached_initializer: options.prefer_cached_initializer,
            use_global_context: options.use_global_context,
        }));
        module
            .0
            .handle
            .set("require", module.require_function());

        Ok(module)
    }

    /// Create a child of `parent`, inheriting its cache and environment
    pub fn child(id: impl Into<String>, parent: &Module) -> Result<Self> {
        Module::new(
            parent.runtime(),
            ModuleOptions::new(id).with_parent(Some(parent.clone())),
        )
    }

    /// Record `filename` and compute the search paths. Does not run code.
    pub fn load(&self, filename: impl AsRef<Path>) -> Result<()> {
        if self.is_loaded() {
            return Err(VmError::AlreadyLoaded(self.0.id.clone()));
        }

        let filename = filename.as_ref().to_path_buf();
        let paths = super::resolver::node_module_paths(&dirname_of(&filename));

        self.0
            .handle
            .set("filename", Value::from(filename.to_string_lossy().as_ref()));
        self.0.handle.set(
            "paths",
            Value::Object(ObjectRef::array(
                paths
                    .iter()
                    .map(|p| Value::from(p.to_string_lossy().as_ref()))
                    .collect(),
            )),
        );
        *self.0.filename.borrow_mut() = Some(filename);
        *self.0.paths.borrow_mut() = paths;
        Ok(())
    }

    /// Run the module: through its cached initializer when preferred and
    /// present, otherwise through the extension handler for `filename`.
    ///
    /// The module is marked loaded whether or not this succeeds.
    pub fn run(&self, filename: impl AsRef<Path>) -> Result<()> {
        let filename = filename.as_ref();
        let result = match self.cached_initializer() {
            Some(initializer) => {
                debug!(id = %self.0.id, "running cached initializer");
                self.run_initializer(&initializer).map(|_| ())
            }
            None => {
                let handler = self.0.runtime.extension_for(filename);
                handler(self, filename)
            }
        };
        self.mark_loaded();
        result
    }

    /// Compile `source` as a module body against this module's
    /// environment, run it, and return the resulting exports
    pub fn compile(&self, source: &str, filename: &str) -> Result<Value> {
        let initializer = match self.cached_initializer() {
            Some(initializer) => {
                debug!(id = %self.0.id, "initializer cache hit");
                initializer
            }
            None => {
                debug!(id = %self.0.id, filename, "compiling module");
                let initializer = self.0.runtime.engine().compile_function(
                    &WRAPPER_PARAMS,
                    source,
                    filename,
                    self.0.environment.context(),
                )?;
                if self.0.prefer_cached_initializer && self.0.use_global_context {
                    self.0
                        .runtime
                        .cache_initializer(&self.0.id, initializer.clone());
                }
                initializer
            }
        };

        self.run_initializer(&initializer)
    }

    fn cached_initializer(&self) -> Option<Value> {
        if !self.0.prefer_cached_initializer {
            return None;
        }
        self.0.runtime.cached_initializer(&self.0.id)
    }

    fn run_initializer(&self, initializer: &Value) -> Result<Value> {
        let exports = self.exports();
        let filename = self.filename_or_id();
        let dirname = dirname_of(Path::new(&filename));

        self.0.runtime.engine().call(
            initializer,
            &exports,
            &[
                exports.clone(),
                self.require_function(),
                Value::Object(self.0.handle.clone()),
                Value::from(filename.as_str()),
                Value::from(dirname.to_string_lossy().as_ref()),
            ],
        )?;

        Ok(self.exports())
    }

    /// Load a dependency of this module and return its exports
    pub fn require(&self, specifier: &str) -> Result<Value> {
        self.0.runtime.load_file(specifier, Some(self))
    }

    /// Resolve a dependency specifier without loading it
    pub fn resolve(&self, specifier: &str) -> Result<String> {
        Ok(self.0.runtime.resolve(specifier, Some(self))?.id())
    }

    /// The `require` function handed to script code
    fn require_function(&self) -> Value {
        let module = self.clone();
        let require = native_function("require", move |_, _, args| {
            let specifier = specifier_arg(args)?;
            module.require(&specifier).map_err(VmError::into_script)
        });

        if let Some(object) = require.as_object() {
            let module = self.clone();
            object.set(
                "resolve",
                native_function("resolve", move |_, _, args| {
                    let specifier = specifier_arg(args)?;
                    module
                        .resolve(&specifier)
                        .map(Value::from)
                        .map_err(VmError::into_script)
                }),
            );
        }
        require
    }

    fn mark_loaded(&self) {
        self.0.loaded.set(true);
        self.0.handle.set("loaded", Value::Boolean(true));
    }

    /// The module's current exports
    pub fn exports(&self) -> Value {
        self.0.handle.get_own("exports").unwrap_or_default()
    }

    /// Replace the module's exports
    pub fn set_exports(&self, exports: Value) {
        self.0.handle.set("exports", exports);
    }

    /// Module id
    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// Filename recorded by [`Module::load`]
    pub fn filename(&self) -> Option<PathBuf> {
        self.0.filename.borrow().clone()
    }

    fn filename_or_id(&self) -> String {
        self.filename()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.0.id.clone())
    }

    /// Absolute directory dependencies resolve against
    pub fn dirname(&self) -> PathBuf {
        absolute_dir(&dirname_of(Path::new(&self.filename_or_id())))
    }

    /// `node_modules` search paths computed by [`Module::load`]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.0.paths.borrow().clone()
    }

    /// Whether the module has been run
    pub fn is_loaded(&self) -> bool {
        self.0.loaded.get()
    }

    /// The environment this module's code runs against
    pub fn environment(&self) -> &Environment {
        &self.0.environment
    }

    /// The load-tree cache this module belongs to
    pub fn cache(&self) -> &LoadTreeCache {
        &self.0.cache
    }

    /// The module that triggered this load, if it is still alive
    pub fn parent(&self) -> Option<Module> {
        self.0.parent.as_ref().and_then(Weak::upgrade).map(Module)
    }

    /// The runtime this module was created by
    pub fn runtime(&self) -> &Runtime {
        &self.0.runtime
    }

    /// The script-visible `module` object
    pub fn handle(&self) -> &ObjectRef {
        &self.0.handle
    }

    /// Returns true if both handles refer to the same module
    pub fn ptr_eq(&self, other: &Module) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.0.id)
            .field("filename", &self.0.filename.borrow())
            .field("loaded", &self.0.loaded.get())
            .finish()
    }
}

fn specifier_arg(args: &[Value]) -> hyperbox_script::Result<String> {
    match arg(args, 0) {
        Value::String(s) if !s.is_empty() => Ok(s.to_string()),
        other => Err(VmError::InvalidSpecifier(format!(
            "path must be a non-empty string, got {}",
            other.type_of()
        ))
        .into_script()),
    }
}

fn dirname_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_system::store::MemoryStore;

    #[test]
    fn test_dirname_of() {
        assert_eq!(dirname_of(Path::new("/a/b.js")), PathBuf::from("/a"));
        assert_eq!(dirname_of(Path::new("b.js")), PathBuf::from("."));
        assert_eq!(dirname_of(Path::new("/")), PathBuf::from("."));
    }

    #[test]
    fn test_flags_must_match() {
        let runtime = Runtime::default();
        let err = Module::new(
            &runtime,
            ModuleOptions::new("a").with_use_global_context(true),
        )
        .unwrap_err();
        assert!(matches!(err, VmError::Config(_)));
    }

    #[test]
    fn test_shared_requires_init() {
        let runtime = Runtime::default();
        let err = Module::new(&runtime, ModuleOptions::new("a").with_shared_context()).unwrap_err();
        assert!(matches!(err, VmError::GlobalContextUninitialized));

        runtime.init_global_context(&Bindings::new());
        let module = Module::new(&runtime, ModuleOptions::new("a").with_shared_context()).unwrap();
        assert!(module
            .environment()
            .ptr_eq(&runtime.global_context().unwrap()));
    }

    #[test]
    fn test_child_inherits() {
        let runtime = Runtime::default();
        let parent = Module::new(&runtime, ModuleOptions::new("parent")).unwrap();
        let child = Module::child("child", &parent).unwrap();

        assert!(child.cache().ptr_eq(parent.cache()));
        assert!(child.environment().ptr_eq(parent.environment()));
        assert!(child.parent().unwrap().ptr_eq(&parent));
    }

    #[test]
    fn test_load_twice_fails() {
        let runtime = Runtime::with_store(
            Default::default(),
            Rc::new(MemoryStore::new().with_file("/m.js", "module.exports = 1;")),
        );
        let module = Module::new(&runtime, ModuleOptions::new("/m.js")).unwrap();
        module.load("/m.js").unwrap();
        module.run("/m.js").unwrap();
        assert_eq!(module.exports(), Value::from(1));
        assert!(module.is_loaded());

        let err = module.load("/m.js").unwrap_err();
        assert!(matches!(err, VmError::AlreadyLoaded(ref id) if id == "/m.js"));
    }

    #[test]
    fn test_compile_exposes_wrapper_arguments() {
        let runtime = Runtime::default();
        let module = Module::new(&runtime, ModuleOptions::new("/srv/app.js")).unwrap();
        module.load("/srv/app.js").unwrap();
        let exports = module
            .compile(
                "exports.file = __filename; exports.dir = __dirname; exports.same = this === exports; exports.id = module.id;",
                "/srv/app.js",
            )
            .unwrap();
        let exports = exports.as_object().unwrap();

        assert_eq!(exports.get("file"), Some(Value::from("/srv/app.js")));
        assert_eq!(exports.get("dir"), Some(Value::from("/srv")));
        assert_eq!(exports.get("same"), Some(Value::Boolean(true)));
        assert_eq!(exports.get("id"), Some(Value::from("/srv/app.js")));
    }
}
