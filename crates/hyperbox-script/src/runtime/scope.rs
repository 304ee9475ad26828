// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Lexical scopes (environment records).

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::context::Context;
use super::value::Value;
use crate::error::{Error, Result};

/// What kind of code a scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    /// Top level of a program; `var` declarations land on the global object
    Global,
    /// A function body; `var` declarations land here
    Function,
    /// A block, loop or catch clause; holds `let`/`const` only
    Block,
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    mutable: bool,
}

struct ScopeInner {
    kind: ScopeKind,
    bindings: RefCell<FxHashMap<String, Binding>>,
    parent: Option<Scope>,
    context: Context,
    /// `None` for arrow functions and blocks, which inherit `this`.
    this: Option<Value>,
}

/// A lexical scope, shared by every closure created inside it.
#[derive(Clone)]
pub struct Scope(Rc<ScopeInner>);

impl Scope {
    /// Creates the top-level scope of a program run in `context`.
    pub fn global(context: Context) -> Self {
        Self(Rc::new(ScopeInner {
            kind: ScopeKind::Global,
            bindings: RefCell::new(FxHashMap::default()),
            parent: None,
            context,
            this: Some(Value::Undefined),
        }))
    }

    /// Creates a function scope. Arrow functions pass `None` for `this`.
    pub fn function(parent: &Scope, this: Option<Value>) -> Self {
        Self::child(parent, ScopeKind::Function, this)
    }

    /// Creates a block scope.
    pub fn block(parent: &Scope) -> Self {
        Self::child(parent, ScopeKind::Block, None)
    }

    fn child(parent: &Scope, kind: ScopeKind, this: Option<Value>) -> Self {
        Self(Rc::new(ScopeInner {
            kind,
            bindings: RefCell::new(FxHashMap::default()),
            parent: Some(parent.clone()),
            context: parent.0.context.clone(),
            this,
        }))
    }

    /// The context whose global object backs this scope chain.
    pub fn context(&self) -> &Context {
        &self.0.context
    }

    /// Declares a binding in this scope (`let`, `const`, parameters).
    pub fn declare(&self, name: &str, value: Value, mutable: bool) {
        self.0
            .bindings
            .borrow_mut()
            .insert(name.to_string(), Binding { value, mutable });
    }

    /// Hoists a `var` declaration to the nearest function or global scope.
    pub fn declare_var(&self, name: &str) {
        let target = self.var_scope();
        match target.0.kind {
            ScopeKind::Global => {
                let global = target.0.context.global();
                if !global.has_own(name) {
                    global.set(name, Value::Undefined);
                }
            }
            _ => {
                let mut bindings = target.0.bindings.borrow_mut();
                bindings.entry(name.to_string()).or_insert(Binding {
                    value: Value::Undefined,
                    mutable: true,
                });
            }
        }
    }

    /// Defines a hoisted function declaration in this scope.
    pub fn define_function(&self, name: &str, value: Value) {
        match self.0.kind {
            ScopeKind::Global => self.0.context.global().set(name, value),
            _ => self.declare(name, value, true),
        }
    }

    fn var_scope(&self) -> Scope {
        let mut scope = self.clone();
        while scope.0.kind == ScopeKind::Block {
            match &scope.0.parent {
                Some(parent) => scope = parent.clone(),
                None => break,
            }
        }
        scope
    }

    /// Resolves an identifier: scopes, then the global object, then intrinsics.
    pub fn lookup(&self, name: &str) -> Result<Value> {
        self.try_lookup(name)
            .ok_or_else(|| Error::reference_error(format!("{} is not defined", name)))
    }

    /// Like [`Scope::lookup`] but returns `None` for unresolvable names.
    pub fn try_lookup(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(binding) = current.0.bindings.borrow().get(name) {
                return Some(binding.value.clone());
            }
            scope = current.0.parent.as_ref();
        }
        self.0.context.get(name)
    }

    /// Assigns to an existing binding, or creates a global property for an
    /// undeclared name.
    pub fn assign(&self, name: &str, value: Value) -> Result<()> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            let mut bindings = current.0.bindings.borrow_mut();
            if let Some(binding) = bindings.get_mut(name) {
                if !binding.mutable {
                    return Err(Error::type_error("Assignment to constant variable."));
                }
                binding.value = value;
                return Ok(());
            }
            drop(bindings);
            scope = current.0.parent.as_ref();
        }
        self.0.context.global().set(name, value);
        Ok(())
    }

    /// The `this` value, inherited through arrow functions and blocks.
    pub fn this(&self) -> Value {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(this) = &current.0.this {
                return this.clone();
            }
            scope = current.0.parent.as_ref();
        }
        Value::Undefined
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("kind", &self.0.kind)
            .field("bindings", &self.0.bindings.borrow().len())
            .finish()
    }
}
