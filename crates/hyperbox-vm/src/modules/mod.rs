// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Built-in native modules
//!
//! Native modules short-circuit resolution: `require('path')` and
//! `require('node:path')` never touch the source store.

pub mod path;

use crate::module_system::Runtime;

/// Register the default native modules on `runtime`
pub fn register_defaults(runtime: &Runtime) {
    runtime.register_native_module("path", |_| path::create_module());
}
