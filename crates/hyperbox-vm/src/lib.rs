// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # Hyperbox VM
//!
//! A sandbox for running independently authored CommonJS bundles
//! repeatedly and cheaply.
//!
//! ## Features
//!
//! - **Isolation**: every top-level load gets a fresh environment unless the
//!   caller opts into the shared one
//! - **Module system**: `require()` with Node.js resolution, a singleton
//!   cache per load tree, rollback of failed loads and cyclic requires
//! - **Caching**: an LRU export cache keyed by a fingerprint of name and
//!   source, and an initializer cache for the shared environment
//! - **Ambient bindings**: `console`, `process`, `Buffer` and timers
//!
//! ## Quick Start
//!
//! ```rust
//! use hyperbox_vm::{RunOptions, Runtime, Vm, VmOptions};
//! use hyperbox_script::Value;
//!
//! let vm = Vm::new(Runtime::default(), VmOptions::new().with_cache_size(100));
//! let exports = vm.run("answer.js", "module.exports = 12;", &RunOptions::new()).unwrap();
//! assert_eq!(exports, Value::from(12));
//! assert_eq!(vm.exports_cache_len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod environment;
pub mod error;
pub mod globals;
pub mod lru;
pub mod module_system;
pub mod modules;
pub mod vm;

pub use config::{RunConfig, RuntimeConfig, VmConfig};
pub use environment::{Bindings, Environment};
pub use error::{Result, VmError};
pub use lru::BoundedCache;
pub use module_system::{
    DiskStore, LoadTreeCache, MemoryStore, Module, ModuleOptions, Runtime, SourceStore,
};
pub use vm::{RunOptions, Vm, VmOptions, default_key};

/// Hyperbox version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Node.js API version reported through `process.version`
pub const NODE_API_VERSION: &str = "20.0.0";
