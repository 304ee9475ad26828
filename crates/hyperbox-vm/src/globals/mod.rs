// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Ambient bindings every environment starts with
//!
//! Implements:
//! - `process` - Process information
//! - `Buffer` - Binary data handling
//! - `console` - Logging through `tracing`
//! - `setTimeout`, `setInterval`, `setImmediate` - Timer functions
//! - `clearTimeout`, `clearInterval`, `clearImmediate` - Timer cancellation
//!
//! The self-aliases `global` and `globalThis` are added per environment.

pub mod buffer;
pub mod console;
pub mod process;
pub mod timers;

use crate::config::RuntimeConfig;
use hyperbox_script::runtime::{Context, Value};
use hyperbox_script::Interpreter;
use timers::TimerQueue;

/// Names that always read back as the environment itself
pub const SELF_ALIASES: [&str; 2] = ["global", "globalThis"];

/// The baseline bindings of a runtime.
///
/// Built once and installed by reference into every environment, so all
/// environments of one runtime share the same `process` and `Buffer`
/// objects, the way every sandbox context shares the host's.
#[derive(Clone)]
pub struct Baseline {
    bindings: Vec<(&'static str, Value)>,
}

impl Baseline {
    /// Create the baseline bindings and register buffer methods on
    /// `interpreter`
    pub fn new(interpreter: &Interpreter, config: &RuntimeConfig, timers: &TimerQueue) -> Self {
        buffer::install_methods(interpreter);

        let mut bindings = vec![
            ("Buffer", buffer::create_buffer_class()),
            ("console", console::create_console_object()),
            (
                "process",
                process::create_process_object(&config.process_env, timers),
            ),
        ];
        bindings.extend(timers::create_timer_functions(timers));

        Self { bindings }
    }

    /// Binding names, in installation order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.iter().map(|(name, _)| *name)
    }

    /// Install every baseline binding into `context`
    pub fn install(&self, context: &Context) {
        for (name, value) in &self.bindings {
            context.set(name, value.clone());
        }
    }
}

impl std::fmt::Debug for Baseline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
