// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-load-tree module cache

use super::module::Module;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Resolved id to module, shared by every module of one load tree.
///
/// Cloning yields another handle to the same cache.
#[derive(Clone, Default)]
pub struct LoadTreeCache {
    modules: Rc<RefCell<FxHashMap<String, Module>>>,
}

impl LoadTreeCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached module by id
    pub fn get(&self, id: &str) -> Option<Module> {
        self.modules.borrow().get(id).cloned()
    }

    /// Check if a module is cached
    pub fn has(&self, id: &str) -> bool {
        self.modules.borrow().contains_key(id)
    }

    /// Add a module to the cache
    pub fn insert(&self, id: impl Into<String>, module: Module) {
        self.modules.borrow_mut().insert(id.into(), module);
    }

    /// Remove a module from the cache
    pub fn remove(&self, id: &str) -> Option<Module> {
        self.modules.borrow_mut().remove(id)
    }

    /// Number of cached modules
    pub fn len(&self) -> usize {
        self.modules.borrow().len()
    }

    /// Returns true if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.modules.borrow().is_empty()
    }

    /// Cached ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.modules.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns true if both handles refer to the same cache
    pub fn ptr_eq(&self, other: &LoadTreeCache) -> bool {
        Rc::ptr_eq(&self.modules, &other.modules)
    }
}

impl std::fmt::Debug for LoadTreeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.ids()).finish()
    }
}
