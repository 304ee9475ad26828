// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS-style module system
//!
//! Implements:
//! - `require()` with a per-load-tree singleton cache and rollback
//! - Node.js file and `node_modules` resolution over a [`SourceStore`]
//! - Extension handlers for `.js` and `.json`
//! - The initializer cache and the shared environment slot

pub mod cache;
pub mod extensions;
pub mod module;
pub mod resolver;
pub mod runtime;
pub mod store;

pub use cache::LoadTreeCache;
pub use extensions::{ExtensionHandler, ExtensionRegistry};
pub use module::{Module, ModuleOptions, WRAPPER_PARAMS};
pub use resolver::NodeResolver;
pub use runtime::{NativeModuleFactory, Resolved, Runtime};
pub use store::{DiskStore, MemoryStore, SourceStore};
