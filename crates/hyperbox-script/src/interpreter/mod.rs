// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tree-walking evaluator.
//!
//! The interpreter is re-entrant: native functions receive `&Interpreter`
//! and may call back into script code, which is how `require` runs a
//! nested module from inside a module body.

mod operators;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::*;
use crate::builtins;
use crate::error::{Error, Result};
use crate::runtime::{
    Context, FunctionKind, ObjectKind, ObjectRef, Scope, Value, array_index, script_function,
};

/// Maximum nesting of script function calls.
pub const MAX_CALL_DEPTH: usize = 256;

/// Maximum nesting of statement and expression evaluation, across calls.
pub const MAX_EVAL_DEPTH: usize = MAX_CALL_DEPTH * 16;

/// Receiver categories that share built-in methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodSet {
    /// Every value (`hasOwnProperty`, `toString`)
    Object,
    /// Arrays
    Array,
    /// Strings
    String,
    /// Numbers
    Number,
    /// Functions (`call`, `apply`)
    Function,
    /// Byte buffers
    Bytes,
}

/// How a statement completed.
enum Completion {
    /// Fell through, with the value of the last expression statement
    Normal(Option<Value>),
    Return(Value),
    Break,
    Continue,
}

/// The script evaluator.
pub struct Interpreter {
    depth: Cell<usize>,
    nesting: Cell<usize>,
    methods: RefCell<FxHashMap<MethodSet, FxHashMap<String, Value>>>,
}

impl Interpreter {
    /// Creates an interpreter with the built-in method tables installed.
    pub fn new() -> Self {
        let interpreter = Self {
            depth: Cell::new(0),
            nesting: Cell::new(0),
            methods: RefCell::new(FxHashMap::default()),
        };
        builtins::install_methods(&interpreter);
        interpreter
    }

    /// Registers a method shared by every value of a receiver category.
    ///
    /// Method function objects are frozen so one context cannot tamper
    /// with what another context sees.
    pub fn define_method(&self, set: MethodSet, name: &str, method: Value) {
        if let Value::Object(obj) = &method {
            obj.freeze();
        }
        self.methods
            .borrow_mut()
            .entry(set)
            .or_default()
            .insert(name.to_string(), method);
    }

    fn method(&self, set: MethodSet, name: &str) -> Option<Value> {
        self.methods.borrow().get(&set)?.get(name).cloned()
    }

    /// Current script call depth.
    pub fn call_depth(&self) -> usize {
        self.depth.get()
    }

    /// Runs a parsed program in `context`, returning the value of the last
    /// expression statement.
    pub fn run_program(&self, program: &Program, context: &Context) -> Result<Value> {
        let scope = Scope::global(context.clone());
        self.hoist_declarations(&program.body, &scope);

        match self.exec_statements(&program.body, &scope)? {
            Completion::Normal(value) => Ok(value.unwrap_or_default()),
            Completion::Return(_) => Err(Error::SyntaxError("Illegal return statement".into())),
            Completion::Break | Completion::Continue => Err(Error::SyntaxError(
                "Illegal break or continue statement".into(),
            )),
        }
    }

    /// Creates a function value closed over the top level of `context`.
    pub fn instantiate(&self, node: Rc<FunctionNode>, context: &Context) -> Value {
        script_function(node, Scope::global(context.clone()))
    }

    // ---------------------------------------------------------------
    // Calls
    // ---------------------------------------------------------------

    /// Calls a function value.
    pub fn call(&self, callee: &Value, this: &Value, args: &[Value]) -> Result<Value> {
        let Some((obj, function)) = function_parts(callee) else {
            return Err(Error::type_error(format!(
                "{} is not a function",
                describe_value(callee)
            )));
        };

        let depth = self.depth.get();
        if depth >= MAX_CALL_DEPTH {
            return Err(Error::range_error("Maximum call stack size exceeded"));
        }
        self.depth.set(depth + 1);

        let result = match &function {
            FunctionKind::Native { func, .. } => func(self, this, args),
            FunctionKind::Script { node, scope } => self.call_script(&obj, node, scope, this, args),
        };

        self.depth.set(depth);
        result
    }

    fn call_script(
        &self,
        callee: &ObjectRef,
        node: &Rc<FunctionNode>,
        closure: &Scope,
        this: &Value,
        args: &[Value],
    ) -> Result<Value> {
        let scope = if node.is_arrow {
            Scope::function(closure, None)
        } else {
            Scope::function(closure, Some(this.clone()))
        };

        if !node.is_arrow {
            if let Some(id) = &node.id {
                scope.declare(&id.name, Value::Object(callee.clone()), true);
            }
            scope.declare(
                "arguments",
                Value::Object(ObjectRef::array(args.to_vec())),
                true,
            );
        }
        for (index, param) in node.params.iter().enumerate() {
            let value = args.get(index).cloned().unwrap_or_default();
            scope.declare(&param.name, value, true);
        }

        match &node.body {
            FunctionBody::Expression(expr) => self.eval(expr, &scope),
            FunctionBody::Block(body) => {
                self.hoist_declarations(body, &scope);
                match self.exec_statements(body, &scope)? {
                    Completion::Return(value) => Ok(value),
                    Completion::Normal(_) => Ok(Value::Undefined),
                    Completion::Break | Completion::Continue => Err(Error::SyntaxError(
                        "Illegal break or continue statement".into(),
                    )),
                }
            }
        }
    }

    /// Calls a function as a constructor (`new F(...)`).
    pub fn construct(&self, callee: &Value, args: &[Value]) -> Result<Value> {
        let Some((_, function)) = function_parts(callee) else {
            return Err(Error::type_error(format!(
                "{} is not a constructor",
                describe_value(callee)
            )));
        };

        match function {
            FunctionKind::Native { .. } => self.call(callee, &Value::Undefined, args),
            FunctionKind::Script { node, .. } if node.is_arrow => Err(Error::type_error(format!(
                "{} is not a constructor",
                describe_value(callee)
            ))),
            FunctionKind::Script { .. } => {
                let prototype = match self.get_property(callee, "prototype")? {
                    Value::Object(proto) => Some(proto),
                    _ => None,
                };
                let instance = ObjectRef::with_prototype(ObjectKind::Ordinary, prototype);
                let result = self.call(callee, &Value::Object(instance.clone()), args)?;
                match result {
                    Value::Object(_) => Ok(result),
                    _ => Ok(Value::Object(instance)),
                }
            }
        }
    }

    /// Creates an error object using `context`'s constructor named `name`.
    pub fn make_error(&self, context: &Context, name: &str, message: &str) -> Value {
        let ctor = context
            .intrinsic(name)
            .or_else(|| context.intrinsic("Error"));
        if let Some(ctor) = ctor {
            if let Ok(error @ Value::Object(_)) = self.construct(&ctor, &[Value::from(message)]) {
                return error;
            }
        }
        builtins::error::plain_error(name, message)
    }

    /// Converts an engine error into the value a `catch` clause receives.
    pub fn error_to_value(&self, context: &Context, error: Error) -> Value {
        match error {
            Error::Thrown(value) => value,
            other => self.make_error(context, other.name(), &other.message()),
        }
    }

    // ---------------------------------------------------------------
    // Property access
    // ---------------------------------------------------------------

    /// Reads `target[key]`, including built-in methods.
    pub fn get_property(&self, target: &Value, key: &str) -> Result<Value> {
        match target {
            Value::Undefined | Value::Null => Err(Error::type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                target.to_js_string(),
                key
            ))),
            Value::Boolean(_) => Ok(self.method(MethodSet::Object, key).unwrap_or_default()),
            Value::Number(_) => Ok(self
                .method(MethodSet::Number, key)
                .or_else(|| self.method(MethodSet::Object, key))
                .unwrap_or_default()),
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::from(s.chars().count()));
                }
                if let Some(index) = array_index(key) {
                    return Ok(s
                        .chars()
                        .nth(index)
                        .map(|c| Value::from(c.to_string()))
                        .unwrap_or_default());
                }
                Ok(self
                    .method(MethodSet::String, key)
                    .or_else(|| self.method(MethodSet::Object, key))
                    .unwrap_or_default())
            }
            Value::Object(obj) => {
                if let Some(value) = obj.get(key) {
                    return Ok(value);
                }

                let set = match &obj.borrow().kind {
                    ObjectKind::Array(_) => Some(MethodSet::Array),
                    ObjectKind::Bytes(_) => Some(MethodSet::Bytes),
                    ObjectKind::Function(_) => Some(MethodSet::Function),
                    _ => None,
                };

                if key == "prototype" && set == Some(MethodSet::Function) {
                    if let Some(proto) = lazy_prototype(obj) {
                        return Ok(proto);
                    }
                }

                Ok(set
                    .and_then(|set| self.method(set, key))
                    .or_else(|| self.method(MethodSet::Object, key))
                    .unwrap_or_default())
            }
        }
    }

    /// Writes `target[key] = value`. Writes to primitives are ignored.
    pub fn set_property(&self, target: &Value, key: &str, value: Value) -> Result<()> {
        match target {
            Value::Undefined | Value::Null => Err(Error::type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                target.to_js_string(),
                key
            ))),
            Value::Object(obj) => {
                obj.set(key, value);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Implements `value instanceof ctor`.
    pub fn instance_of(&self, value: &Value, ctor: &Value) -> Result<bool> {
        let Some((_, function)) = function_parts(ctor) else {
            return Err(Error::type_error(
                "Right-hand side of 'instanceof' is not callable",
            ));
        };
        let Value::Object(obj) = value else {
            return Ok(false);
        };

        if let FunctionKind::Native { name, .. } = &function {
            match &**name {
                "Object" => return Ok(true),
                "Array" => return Ok(value.is_array()),
                "Function" => return Ok(value.is_function()),
                _ => {}
            }
        }

        let Value::Object(prototype) = self.get_property(ctor, "prototype")? else {
            return Ok(false);
        };
        let mut current = obj.prototype();
        while let Some(proto) = current {
            if proto.ptr_eq(&prototype) {
                return Ok(true);
            }
            current = proto.prototype();
        }
        Ok(false)
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn hoist_declarations(&self, body: &[Statement], scope: &Scope) {
        for statement in body {
            hoist_vars(statement, scope);
        }
        self.hoist_functions(body, scope);
    }

    fn hoist_functions(&self, body: &[Statement], scope: &Scope) {
        for statement in body {
            if let Statement::FunctionDeclaration(node) = statement {
                if let Some(id) = &node.id {
                    scope.define_function(&id.name, script_function(node.clone(), scope.clone()));
                }
            }
        }
    }

    fn exec_statements(&self, body: &[Statement], scope: &Scope) -> Result<Completion> {
        let mut last = None;
        for statement in body {
            match self.exec_statement(statement, scope)? {
                Completion::Normal(Some(value)) => last = Some(value),
                Completion::Normal(None) => {}
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal(last))
    }

    fn exec_block(&self, body: &[Statement], scope: &Scope) -> Result<Completion> {
        if has_lexical_declarations(body) {
            let block = Scope::block(scope);
            self.hoist_functions(body, &block);
            self.exec_statements(body, &block)
        } else {
            self.hoist_functions(body, scope);
            self.exec_statements(body, scope)
        }
    }

    fn exec_statement(&self, statement: &Statement, scope: &Scope) -> Result<Completion> {
        let nesting = self.enter()?;
        let result = self.exec_statement_inner(statement, scope);
        self.nesting.set(nesting);
        result
    }

    fn exec_statement_inner(&self, statement: &Statement, scope: &Scope) -> Result<Completion> {
        match statement {
            Statement::VariableDeclaration(declaration) => {
                self.exec_declaration(declaration, scope)?;
                Ok(Completion::Normal(None))
            }
            Statement::FunctionDeclaration(_) | Statement::Empty => Ok(Completion::Normal(None)),
            Statement::Expression(expr) => Ok(Completion::Normal(Some(self.eval(expr, scope)?))),
            Statement::Block(body) => self.exec_block(body, scope),
            Statement::If(stmt) => {
                if self.eval(&stmt.test, scope)?.to_boolean() {
                    self.exec_statement(&stmt.consequent, scope)
                } else if let Some(alternate) = &stmt.alternate {
                    self.exec_statement(alternate, scope)
                } else {
                    Ok(Completion::Normal(None))
                }
            }
            Statement::While(stmt) => self.exec_while(stmt, scope),
            Statement::DoWhile(stmt) => self.exec_do_while(stmt, scope),
            Statement::For(stmt) => self.exec_for(stmt, scope),
            Statement::ForEach(stmt) => self.exec_for_each(stmt, scope),
            Statement::Return(argument) => {
                let value = match argument {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Statement::Break => Ok(Completion::Break),
            Statement::Continue => Ok(Completion::Continue),
            Statement::Throw(expr) => Err(Error::Thrown(self.eval(expr, scope)?)),
            Statement::Try(stmt) => self.exec_try(stmt, scope),
        }
    }

    fn exec_declaration(&self, declaration: &VariableDeclaration, scope: &Scope) -> Result<()> {
        for declarator in &declaration.declarations {
            let value = match &declarator.init {
                Some(init) => self.eval(init, scope)?,
                None if declaration.kind == VariableKind::Var => continue,
                None => Value::Undefined,
            };
            match declaration.kind {
                VariableKind::Var => scope.assign(&declarator.id.name, value)?,
                VariableKind::Let => scope.declare(&declarator.id.name, value, true),
                VariableKind::Const => scope.declare(&declarator.id.name, value, false),
            }
        }
        Ok(())
    }

    fn exec_while(&self, stmt: &WhileStatement, scope: &Scope) -> Result<Completion> {
        while self.eval(&stmt.test, scope)?.to_boolean() {
            match self.exec_statement(&stmt.body, scope)? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal(_) | Completion::Continue => {}
            }
        }
        Ok(Completion::Normal(None))
    }

    fn exec_do_while(&self, stmt: &WhileStatement, scope: &Scope) -> Result<Completion> {
        loop {
            match self.exec_statement(&stmt.body, scope)? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal(_) | Completion::Continue => {}
            }
            if !self.eval(&stmt.test, scope)?.to_boolean() {
                break;
            }
        }
        Ok(Completion::Normal(None))
    }

    fn exec_for(&self, stmt: &ForStatement, scope: &Scope) -> Result<Completion> {
        // `let` loop variables get a fresh binding per iteration so closures
        // created in the body capture that iteration's value.
        let per_iteration: Vec<&str> = match &stmt.init {
            Some(ForInit::Declaration(decl)) if decl.kind == VariableKind::Let => decl
                .declarations
                .iter()
                .map(|d| d.id.name.as_str())
                .collect(),
            _ => Vec::new(),
        };

        let mut iteration = Scope::block(scope);
        match &stmt.init {
            Some(ForInit::Declaration(decl)) => self.exec_declaration(decl, &iteration)?,
            Some(ForInit::Expression(expr)) => {
                self.eval(expr, &iteration)?;
            }
            None => {}
        }

        loop {
            if let Some(test) = &stmt.test {
                if !self.eval(test, &iteration)?.to_boolean() {
                    break;
                }
            }

            match self.exec_statement(&stmt.body, &iteration)? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal(_) | Completion::Continue => {}
            }

            if !per_iteration.is_empty() {
                let next = Scope::block(scope);
                for name in &per_iteration {
                    next.declare(name, iteration.lookup(name)?, true);
                }
                iteration = next;
            }

            if let Some(update) = &stmt.update {
                self.eval(update, &iteration)?;
            }
        }

        Ok(Completion::Normal(None))
    }

    fn exec_for_each(&self, stmt: &ForEachStatement, scope: &Scope) -> Result<Completion> {
        let target = self.eval(&stmt.right, scope)?;
        let items = match stmt.kind {
            ForEachKind::In => enumerate_keys(&target),
            ForEachKind::Of => iterate_values(&target)?,
        };

        for item in items {
            let body_scope = match stmt.declaration {
                Some(kind @ (VariableKind::Let | VariableKind::Const)) => {
                    let block = Scope::block(scope);
                    block.declare(&stmt.left.name, item, kind == VariableKind::Let);
                    block
                }
                _ => {
                    scope.assign(&stmt.left.name, item)?;
                    scope.clone()
                }
            };

            match self.exec_statement(&stmt.body, &body_scope)? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal(_) | Completion::Continue => {}
            }
        }

        Ok(Completion::Normal(None))
    }

    fn exec_try(&self, stmt: &TryStatement, scope: &Scope) -> Result<Completion> {
        let mut result = self.exec_block(&stmt.block, scope);

        if let Some(handler) = &stmt.handler {
            if let Err(error) = result {
                let value = self.error_to_value(scope.context(), error);
                let catch_scope = Scope::block(scope);
                if let Some(param) = &stmt.param {
                    catch_scope.declare(&param.name, value, true);
                }
                result = self.exec_block(handler, &catch_scope);
            }
        }

        if let Some(finalizer) = &stmt.finalizer {
            match self.exec_block(finalizer, scope)? {
                Completion::Normal(_) => {}
                abrupt => return Ok(abrupt),
            }
        }

        result
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    /// Evaluates an expression.
    pub fn eval(&self, expr: &Expression, scope: &Scope) -> Result<Value> {
        let nesting = self.enter()?;
        let result = self.eval_inner(expr, scope);
        self.nesting.set(nesting);
        result
    }

    /// Takes one evaluation level, returning the level to restore.
    fn enter(&self) -> Result<usize> {
        let nesting = self.nesting.get();
        if nesting >= MAX_EVAL_DEPTH {
            return Err(Error::range_error("Maximum call stack size exceeded"));
        }
        self.nesting.set(nesting + 1);
        Ok(nesting)
    }

    fn eval_inner(&self, expr: &Expression, scope: &Scope) -> Result<Value> {
        match expr {
            Expression::Literal(literal) => Ok(match literal {
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::from(s.as_str()),
                Literal::Boolean(b) => Value::Boolean(*b),
                Literal::Null => Value::Null,
            }),
            Expression::Identifier(id) => scope.lookup(&id.name),
            Expression::This => Ok(scope.this()),
            Expression::Array(elements) => {
                let items = self.eval_list(elements, scope)?;
                Ok(Value::Object(ObjectRef::array(items)))
            }
            Expression::Object(properties) => {
                let obj = ObjectRef::ordinary();
                for property in properties {
                    let value = self.eval(&property.value, scope)?;
                    obj.set(&property.key, value);
                }
                Ok(Value::Object(obj))
            }
            Expression::Function(node) => Ok(script_function(node.clone(), scope.clone())),
            Expression::Unary(unary) => self.eval_unary(unary, scope),
            Expression::Update(update) => self.eval_update(update, scope),
            Expression::Binary(binary) => self.eval_binary(binary, scope),
            Expression::Logical(logical) => {
                let left = self.eval(&logical.left, scope)?;
                let short_circuit = match logical.operator {
                    LogicalOperator::And => !left.to_boolean(),
                    LogicalOperator::Or => left.to_boolean(),
                    LogicalOperator::Coalesce => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(&logical.right, scope)
                }
            }
            Expression::Assignment(assignment) => self.eval_assignment(assignment, scope),
            Expression::Conditional(cond) => {
                if self.eval(&cond.test, scope)?.to_boolean() {
                    self.eval(&cond.consequent, scope)
                } else {
                    self.eval(&cond.alternate, scope)
                }
            }
            Expression::Call(call) => self.eval_call(call, scope),
            Expression::New(call) => {
                let callee = self.eval(&call.callee, scope)?;
                let args = self.eval_list(&call.arguments, scope)?;
                if !callee.is_function() {
                    return Err(Error::type_error(format!(
                        "{} is not a constructor",
                        describe_expression(&call.callee)
                    )));
                }
                self.construct(&callee, &args)
            }
            Expression::Member(member) => {
                let object = self.eval(&member.object, scope)?;
                let key = self.member_key(&member.property, scope)?;
                self.get_property(&object, &key)
            }
            Expression::Sequence(expressions) => {
                let mut last = Value::Undefined;
                for expr in expressions {
                    last = self.eval(expr, scope)?;
                }
                Ok(last)
            }
        }
    }

    fn eval_list(&self, expressions: &[Expression], scope: &Scope) -> Result<Vec<Value>> {
        expressions.iter().map(|e| self.eval(e, scope)).collect()
    }

    fn member_key(&self, property: &MemberProperty, scope: &Scope) -> Result<String> {
        match property {
            MemberProperty::Identifier(id) => Ok(id.name.clone()),
            MemberProperty::Expression(expr) => Ok(self.eval(expr, scope)?.to_property_key()),
        }
    }

    fn eval_unary(&self, unary: &UnaryExpression, scope: &Scope) -> Result<Value> {
        match (unary.operator, unary.argument.as_ref()) {
            (UnaryOperator::Typeof, Expression::Identifier(id)) => Ok(Value::from(
                scope
                    .try_lookup(&id.name)
                    .map(|v| v.type_of())
                    .unwrap_or("undefined"),
            )),
            (UnaryOperator::Delete, Expression::Member(member)) => {
                let object = self.eval(&member.object, scope)?;
                let key = self.member_key(&member.property, scope)?;
                match object {
                    Value::Object(obj) => Ok(Value::Boolean(obj.delete(&key))),
                    Value::Undefined | Value::Null => Err(Error::type_error(format!(
                        "Cannot convert undefined or null to object (deleting '{}')",
                        key
                    ))),
                    _ => Ok(Value::Boolean(true)),
                }
            }
            (UnaryOperator::Delete, Expression::Identifier(_)) => Ok(Value::Boolean(false)),
            (operator, argument) => {
                let value = self.eval(argument, scope)?;
                Ok(operators::unary(operator, &value))
            }
        }
    }

    fn eval_update(&self, update: &UpdateExpression, scope: &Scope) -> Result<Value> {
        let delta = match update.operator {
            UpdateOperator::Increment => 1.0,
            UpdateOperator::Decrement => -1.0,
        };

        let (old, new) = match update.argument.as_ref() {
            Expression::Identifier(id) => {
                let old = scope.lookup(&id.name)?.to_number();
                scope.assign(&id.name, Value::Number(old + delta))?;
                (old, old + delta)
            }
            Expression::Member(member) => {
                let object = self.eval(&member.object, scope)?;
                let key = self.member_key(&member.property, scope)?;
                let old = self.get_property(&object, &key)?.to_number();
                self.set_property(&object, &key, Value::Number(old + delta))?;
                (old, old + delta)
            }
            _ => {
                return Err(Error::SyntaxError(
                    "Invalid left-hand side expression in update operation".into(),
                ));
            }
        };

        Ok(Value::Number(if update.prefix { new } else { old }))
    }

    fn eval_binary(&self, binary: &BinaryExpression, scope: &Scope) -> Result<Value> {
        let left = self.eval(&binary.left, scope)?;
        let right = self.eval(&binary.right, scope)?;

        match binary.operator {
            BinaryOperator::InstanceOf => Ok(Value::Boolean(self.instance_of(&left, &right)?)),
            BinaryOperator::In => match &right {
                Value::Object(obj) => Ok(Value::Boolean(obj.has(&left.to_property_key()))),
                _ => Err(Error::type_error(format!(
                    "Cannot use 'in' operator to search for '{}' in {}",
                    left.to_js_string(),
                    right.to_js_string()
                ))),
            },
            operator => Ok(operators::binary(operator, &left, &right)),
        }
    }

    fn eval_assignment(&self, assignment: &AssignmentExpression, scope: &Scope) -> Result<Value> {
        let compound = assignment.operator.binary();

        match assignment.left.as_ref() {
            Expression::Identifier(id) => {
                let value = match compound {
                    Some(operator) => {
                        let current = scope.lookup(&id.name)?;
                        let right = self.eval(&assignment.right, scope)?;
                        operators::binary(operator, &current, &right)
                    }
                    None => self.eval(&assignment.right, scope)?,
                };
                scope.assign(&id.name, value.clone())?;
                Ok(value)
            }
            Expression::Member(member) => {
                let object = self.eval(&member.object, scope)?;
                let key = self.member_key(&member.property, scope)?;
                let value = match compound {
                    Some(operator) => {
                        let current = self.get_property(&object, &key)?;
                        let right = self.eval(&assignment.right, scope)?;
                        operators::binary(operator, &current, &right)
                    }
                    None => self.eval(&assignment.right, scope)?,
                };
                self.set_property(&object, &key, value.clone())?;
                Ok(value)
            }
            _ => Err(Error::SyntaxError(
                "Invalid left-hand side in assignment".into(),
            )),
        }
    }

    fn eval_call(&self, call: &CallExpression, scope: &Scope) -> Result<Value> {
        let (callee, this) = match call.callee.as_ref() {
            Expression::Member(member) => {
                let object = self.eval(&member.object, scope)?;
                let key = self.member_key(&member.property, scope)?;
                (self.get_property(&object, &key)?, object)
            }
            other => (self.eval(other, scope)?, Value::Undefined),
        };

        let args = self.eval_list(&call.arguments, scope)?;
        if !callee.is_function() {
            return Err(Error::type_error(format!(
                "{} is not a function",
                describe_expression(&call.callee)
            )));
        }
        self.call(&callee, &this, &args)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a callable value into its object and (cloned) callable part.
fn function_parts(value: &Value) -> Option<(ObjectRef, FunctionKind)> {
    let Value::Object(obj) = value else {
        return None;
    };
    let function = match &obj.borrow().kind {
        ObjectKind::Function(function) => function.clone(),
        _ => return None,
    };
    Some((obj.clone(), function))
}

/// Script functions get their `prototype` object on first access.
fn lazy_prototype(obj: &ObjectRef) -> Option<Value> {
    let constructible = matches!(
        &obj.borrow().kind,
        ObjectKind::Function(function @ FunctionKind::Script { .. }) if !function.is_arrow()
    );
    if !constructible || obj.is_frozen() {
        return None;
    }
    let prototype = Value::Object(ObjectRef::ordinary());
    obj.set("prototype", prototype.clone());
    Some(prototype)
}

fn hoist_vars(statement: &Statement, scope: &Scope) {
    match statement {
        Statement::VariableDeclaration(decl) if decl.kind == VariableKind::Var => {
            for declarator in &decl.declarations {
                scope.declare_var(&declarator.id.name);
            }
        }
        Statement::Block(body) => body.iter().for_each(|s| hoist_vars(s, scope)),
        Statement::If(stmt) => {
            hoist_vars(&stmt.consequent, scope);
            if let Some(alternate) = &stmt.alternate {
                hoist_vars(alternate, scope);
            }
        }
        Statement::While(stmt) | Statement::DoWhile(stmt) => hoist_vars(&stmt.body, scope),
        Statement::For(stmt) => {
            if let Some(ForInit::Declaration(decl)) = &stmt.init {
                if decl.kind == VariableKind::Var {
                    for declarator in &decl.declarations {
                        scope.declare_var(&declarator.id.name);
                    }
                }
            }
            hoist_vars(&stmt.body, scope);
        }
        Statement::ForEach(stmt) => {
            if stmt.declaration == Some(VariableKind::Var) {
                scope.declare_var(&stmt.left.name);
            }
            hoist_vars(&stmt.body, scope);
        }
        Statement::Try(stmt) => {
            let blocks = std::iter::once(&stmt.block)
                .chain(stmt.handler.as_ref())
                .chain(stmt.finalizer.as_ref());
            for block in blocks {
                block.iter().for_each(|s| hoist_vars(s, scope));
            }
        }
        _ => {}
    }
}

fn has_lexical_declarations(body: &[Statement]) -> bool {
    body.iter().any(|statement| {
        matches!(
            statement,
            Statement::VariableDeclaration(VariableDeclaration {
                kind: VariableKind::Let | VariableKind::Const,
                ..
            })
        )
    })
}

/// Keys visited by `for (k in value)`: own keys, then inherited ones.
fn enumerate_keys(value: &Value) -> Vec<Value> {
    match value {
        Value::Object(obj) => {
            let mut keys: Vec<String> = Vec::new();
            let mut current = Some(obj.clone());
            while let Some(object) = current {
                for key in object.keys() {
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
                current = object.prototype();
            }
            keys.into_iter().map(Value::from).collect()
        }
        Value::String(s) => (0..s.chars().count())
            .map(|i| Value::from(i.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Values visited by `for (v of value)`.
fn iterate_values(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::String(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
        Value::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Array(items) => Ok(items.clone()),
            ObjectKind::Bytes(bytes) => Ok(bytes.iter().map(|b| Value::Number(*b as f64)).collect()),
            _ => Err(Error::type_error(format!(
                "{} is not iterable",
                describe_value(value)
            ))),
        },
        _ => Err(Error::type_error(format!(
            "{} is not iterable",
            describe_value(value)
        ))),
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Object(_) if value.is_function() => "function".to_string(),
        Value::Object(_) if value.is_array() => "array".to_string(),
        Value::Object(_) => "object".to_string(),
        other => other.to_js_string(),
    }
}

/// Renders a callee expression for error messages (`obj.method`).
fn describe_expression(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(id) => id.name.clone(),
        Expression::This => "this".to_string(),
        Expression::Member(member) => match &member.property {
            MemberProperty::Identifier(id) => {
                format!("{}.{}", describe_expression(&member.object), id.name)
            }
            MemberProperty::Expression(_) => {
                format!("{}[...]", describe_expression(&member.object))
            }
        },
        Expression::Call(call) => format!("{}(...)", describe_expression(&call.callee)),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn run(source: &str) -> Result<Value> {
        let program = Parser::new(source).parse_program()?;
        Interpreter::new().run_program(&program, &Context::new())
    }

    #[test]
    fn test_completion_value() {
        assert_eq!(run("1 + 2; 'done'").unwrap(), Value::from("done"));
        assert_eq!(run("var x = 1").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_hoisting() {
        assert_eq!(run("f(); function f() { return 7 } f()").unwrap(), Value::from(7));
        assert_eq!(run("typeof later; var later = 1; typeof later").unwrap(), Value::from("number"));
    }

    #[test]
    fn test_closures_capture_scope() {
        let src = "function counter() { var n = 0; return () => ++n }
                   var c = counter(); c(); c(); c()";
        assert_eq!(run(src).unwrap(), Value::from(3));
    }

    #[test]
    fn test_let_per_iteration_binding() {
        let src = "var fns = []; for (let i = 0; i < 3; i++) { fns.push(() => i) }
                   fns[0]() + fns[1]() + fns[2]()";
        assert_eq!(run(src).unwrap(), Value::from(3));
    }

    #[test]
    fn test_try_catch_finally() {
        let src = "var log = ''; try { null.x } catch (e) { log += e.name } finally { log += '!' } log";
        assert_eq!(run(src).unwrap(), Value::from("TypeError!"));
    }

    #[test]
    fn test_finally_overrides_return() {
        let src = "function f() { try { return 1 } finally { return 2 } } f()";
        assert_eq!(run(src).unwrap(), Value::from(2));
    }

    #[test]
    fn test_uncaught_throw_carries_value() {
        match run("throw { code: 42 }") {
            Err(Error::Thrown(Value::Object(obj))) => assert_eq!(obj.get("code"), Some(Value::from(42))),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_reference_error() {
        assert!(matches!(run("missing + 1"), Err(Error::ReferenceError(_))));
        assert_eq!(run("typeof missing").unwrap(), Value::from("undefined"));
    }

    #[test]
    fn test_not_a_function_message() {
        let err = run("var o = {}; o.nope()").unwrap_err();
        assert_eq!(err.to_string(), "TypeError: o.nope is not a function");
    }

    #[test]
    fn test_constructors_and_instanceof() {
        let src = "function P(n) { this.n = n } P.prototype.get = function () { return this.n }
                   var p = new P(5); (p instanceof P) && p.get() === 5";
        assert_eq!(run(src).unwrap(), Value::from(true));
    }

    #[test]
    fn test_for_in_and_for_of() {
        assert_eq!(run("var s = ''; for (var k in {a: 1, b: 2}) s += k; s").unwrap(), Value::from("ab"));
        assert_eq!(run("var t = 0; for (const v of [1, 2, 3]) t += v; t").unwrap(), Value::from(6));
        assert!(matches!(run("for (var v of {}) {}"), Err(Error::TypeError(_))));
    }

    #[test]
    fn test_break_and_continue() {
        let src = "var n = 0; for (var i = 0; i < 10; i++) { if (i % 2) continue; if (i > 6) break; n += i } n";
        assert_eq!(run(src).unwrap(), Value::from(12));
    }

    #[test]
    fn test_call_depth_is_bounded() {
        // Deep recursion needs more stack than the default test thread has.
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(|| {
                let result = run("function f() { return f() } f()");
                matches!(result, Err(Error::RangeError(_)))
            })
            .unwrap();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_eval_depth_is_bounded() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(|| {
                let element = format!("{}f(n - 1){}", "[".repeat(20), "]".repeat(20));
                let src = format!("function f(n) {{ return n > 0 ? {} : 0 }} f(1000)", element);
                let interpreter = Interpreter::new();
                let context = Context::new();

                let program = Parser::new(&src).parse_program().unwrap();
                let deep = interpreter.run_program(&program, &context);
                let bounded = matches!(deep, Err(Error::RangeError(_)));

                let program = Parser::new("[[[4]]][0][0][0] + 1").parse_program().unwrap();
                let after = interpreter.run_program(&program, &context).unwrap();
                (bounded, interpreter.call_depth(), after.to_number())
            })
            .unwrap();

        let (bounded, depth, after) = handle.join().unwrap();
        assert!(bounded);
        assert_eq!(depth, 0);
        assert_eq!(after, 5.0);
    }
}
