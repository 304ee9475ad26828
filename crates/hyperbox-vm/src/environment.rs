// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Execution environments
//!
//! An environment is the bag of ambient bindings module code runs against.
//! Ephemeral environments are created per top-level load; the shared
//! environment is one long-lived instance that is reset, never recreated.

use crate::globals::{Baseline, SELF_ALIASES};
use hyperbox_script::runtime::{Context, Value};
use indexmap::IndexMap;

/// Extra bindings supplied by the caller
pub type Bindings = IndexMap<String, Value>;

/// A handle to an execution environment. Clones share the environment.
#[derive(Clone, Debug)]
pub struct Environment {
    context: Context,
}

impl Environment {
    /// Create a fresh environment holding the baseline bindings, `extra`,
    /// and the self-aliases
    pub fn create(baseline: &Baseline, extra: &Bindings) -> Self {
        let env = Self {
            context: Context::new(),
        };
        env.populate(baseline, extra);
        env
    }

    /// Clear every binding and repopulate with the baseline and `extra`.
    ///
    /// The environment keeps its identity, so initializers compiled
    /// against it stay valid. Nothing set before the reset survives it.
    pub fn reset_shared(&self, baseline: &Baseline, extra: &Bindings) {
        self.context.clear();
        self.populate(baseline, extra);
    }

    fn populate(&self, baseline: &Baseline, extra: &Bindings) {
        baseline.install(&self.context);
        for (name, value) in extra {
            self.context.set(name, value.clone());
        }
        for alias in SELF_ALIASES {
            self.context.alias_self(alias);
        }
    }

    /// The script context backing this environment
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The environment as a script value (what `global` reads back as)
    pub fn global_object(&self) -> Value {
        Value::Object(self.context.global().clone())
    }

    /// Read a binding
    pub fn get(&self, name: &str) -> Option<Value> {
        self.context.global().get_own(name)
    }

    /// Set a binding
    pub fn set(&self, name: &str, value: Value) {
        self.context.set(name, value);
    }

    /// Binding names, including aliases
    pub fn keys(&self) -> Vec<String> {
        self.context.global().keys()
    }

    /// Returns true if both handles refer to the same environment
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        self.context.ptr_eq(&other.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::globals::timers::TimerQueue;
    use hyperbox_script::Interpreter;

    fn baseline() -> Baseline {
        Baseline::new(&Interpreter::new(), &RuntimeConfig::default(), &TimerQueue::new())
    }

    fn extra(name: &str, value: Value) -> Bindings {
        let mut bindings = Bindings::new();
        bindings.insert(name.to_string(), value);
        bindings
    }

    #[test]
    fn test_create_has_baseline_and_aliases() {
        let baseline = baseline();
        let env = Environment::create(&baseline, &extra("foo", Value::from("foo")));

        for name in baseline.names() {
            assert!(env.get(name).is_some(), "{} missing", name);
        }
        assert_eq!(env.get("foo"), Some(Value::from("foo")));
        assert_eq!(env.get("global"), Some(env.global_object()));
        assert_eq!(env.get("globalThis"), Some(env.global_object()));
    }

    #[test]
    fn test_fresh_environments_are_distinct() {
        let baseline = baseline();
        let a = Environment::create(&baseline, &Bindings::new());
        let b = Environment::create(&baseline, &Bindings::new());
        a.set("leak", Value::from(1));

        assert!(!a.ptr_eq(&b));
        assert!(b.get("leak").is_none());
        assert_eq!(a.get("console"), b.get("console"));
    }

    #[test]
    fn test_reset_keeps_identity_and_drops_old_bindings() {
        let baseline = baseline();
        let env = Environment::create(&baseline, &extra("foo", Value::from(1)));
        let handle = env.clone();
        let before = env.global_object();
        env.set("stray", Value::from(true));

        env.reset_shared(&baseline, &extra("bar", Value::from(2)));
        env.reset_shared(&baseline, &extra("baz", Value::from(3)));

        assert!(handle.ptr_eq(&env));
        assert_eq!(env.global_object(), before);
        assert!(env.get("foo").is_none());
        assert!(env.get("bar").is_none());
        assert!(env.get("stray").is_none());
        assert_eq!(env.get("baz"), Some(Value::from(3)));

        let expected = baseline.names().count() + 1 + SELF_ALIASES.len();
        assert_eq!(env.keys().len(), expected);
    }
}
