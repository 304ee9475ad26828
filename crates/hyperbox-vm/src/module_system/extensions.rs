// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compilation handlers keyed by file extension

use super::module::Module;
use crate::error::Result;
use hyperbox_script::runtime::from_json;
use indexmap::IndexMap;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// Compiles and runs a file into a module. The handler is responsible for
/// calling [`Module::compile`] (or [`Module::set_exports`]).
pub type ExtensionHandler = Rc<dyn Fn(&Module, &Path) -> Result<()>>;

/// Registered handlers, in registration order
#[derive(Clone)]
pub struct ExtensionRegistry {
    handlers: IndexMap<String, ExtensionHandler>,
}

impl ExtensionRegistry {
    /// Create a registry with the `.js` and `.json` handlers
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: IndexMap::new(),
        };
        registry.insert(".js", Rc::new(js_handler));
        registry.insert(".json", Rc::new(json_handler));
        registry
    }

    /// Register or replace the handler for `ext` (with or without its dot)
    pub fn insert(&mut self, ext: &str, handler: ExtensionHandler) {
        let key = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{}", ext)
        };
        self.handlers.insert(key, handler);
    }

    /// The handler for `path`, falling back to the `.js` handler
    pub fn handler_for(&self, path: &Path) -> ExtensionHandler {
        path.extension()
            .and_then(|ext| self.handlers.get(&format!(".{}", ext.to_string_lossy())))
            .cloned()
            .unwrap_or_else(|| Rc::new(js_handler))
    }

    /// Registered extensions, each with its dot
    pub fn extensions(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

/// Read the file and compile it as a module body
pub fn js_handler(module: &Module, path: &Path) -> Result<()> {
    let source = module.runtime().read_source(path)?;
    module.compile(&source, &path.to_string_lossy())?;
    Ok(())
}

/// Read the file, parse it as JSON and export the result
pub fn json_handler(module: &Module, path: &Path) -> Result<()> {
    let source = module.runtime().read_source(path)?;
    let json: serde_json::Value = serde_json::from_str(strip_bom(&source))?;
    debug!(id = module.id(), "loaded JSON module");
    module.set_exports(from_json(&json));
    Ok(())
}

fn strip_bom(source: &str) -> &str {
    source.strip_prefix('\u{feff}').unwrap_or(source)
}
