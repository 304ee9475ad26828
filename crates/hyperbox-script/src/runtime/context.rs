// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Script contexts: a global object plus its own set of intrinsics.

use std::cell::RefCell;
use std::rc::Rc;

use super::object::ObjectRef;
use super::value::Value;
use crate::builtins;

struct ContextInner {
    global: ObjectRef,
    intrinsics: RefCell<ObjectRef>,
}

/// An isolated script context.
///
/// Code run in one context never observes bindings or intrinsic mutations
/// made in another. Cloning a `Context` yields another handle to the same
/// context.
#[derive(Clone)]
pub struct Context(Rc<ContextInner>);

impl Context {
    /// Creates a context with an empty global object and fresh intrinsics.
    pub fn new() -> Self {
        Self(Rc::new(ContextInner {
            global: ObjectRef::ordinary(),
            intrinsics: RefCell::new(builtins::create_intrinsics()),
        }))
    }

    /// The global object (the context's binding bag).
    pub fn global(&self) -> &ObjectRef {
        &self.0.global
    }

    /// Sets a global binding.
    pub fn set(&self, name: &str, value: Value) {
        self.0.global.set(name, value);
    }

    /// Makes `name` resolve to the global object itself.
    pub fn alias_self(&self, name: &str) {
        self.0.global.set_self_alias(name);
    }

    /// Resolves a name against the global object, then the intrinsics.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.0
            .global
            .get_own(name)
            .or_else(|| self.intrinsic(name))
    }

    /// Looks up an intrinsic (`Object`, `JSON`, `Error`, ...).
    pub fn intrinsic(&self, name: &str) -> Option<Value> {
        self.0.intrinsics.borrow().get_own(name)
    }

    /// Removes every global binding and alias and installs fresh intrinsics.
    /// The global object keeps its identity.
    pub fn clear(&self) {
        self.0.global.clear();
        *self.0.intrinsics.borrow_mut() = builtins::create_intrinsics();
    }

    /// Returns true if both handles refer to the same context.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("globals", &self.0.global.property_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_shadows_intrinsics() {
        let context = Context::new();
        assert!(context.get("JSON").is_some());
        context.set("JSON", Value::from(1));
        assert_eq!(context.get("JSON"), Some(Value::from(1)));
        assert!(context.intrinsic("JSON").is_some_and(|v| v.as_object().is_some()));
    }

    #[test]
    fn test_contexts_have_distinct_intrinsics() {
        let a = Context::new();
        let b = Context::new();
        let (Some(Value::Object(oa)), Some(Value::Object(ob))) = (a.get("Object"), b.get("Object"))
        else {
            panic!("Object intrinsic missing");
        };
        assert!(!oa.ptr_eq(&ob));
    }

    #[test]
    fn test_clear_keeps_identity_and_refreshes_intrinsics() {
        let context = Context::new();
        let global = context.global().clone();
        let before = context.intrinsic("Math");
        context.set("x", Value::from(1));
        context.alias_self("global");

        context.clear();

        assert!(context.global().ptr_eq(&global));
        assert!(context.get("x").is_none());
        assert!(context.get("global").is_none());
        assert_ne!(context.intrinsic("Math"), before);
    }
}
