// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The main parser implementation.

use std::rc::Rc;

use crate::Error;
use crate::ast::*;
use crate::lexer::{Scanner, Token, TokenKind};

/// Maximum nesting of statements and expressions in one source text.
///
/// Brackets, blocks, operator chains and nested operators each count as a
/// level. Deeper source is rejected with a `SyntaxError`.
pub const MAX_NESTING_DEPTH: usize = 256;

/// A recursive descent parser for the supported JavaScript subset.
pub struct Parser<'a> {
    source: &'a str,
    scanner: Scanner<'a>,
    current: Token,
    /// Set while parsing a `for` initializer, where `in` starts a for-in loop.
    no_in: bool,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            source,
            scanner,
            current,
            no_in: false,
            depth: 0,
        }
    }

    /// Parses the source code into a Program AST node.
    pub fn parse_program(&mut self) -> Result<Program, Error> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Program { body })
    }

    /// Parses the source code as the body of a function taking `params`.
    ///
    /// Unlike a program, `return` is allowed at the top level.
    pub fn parse_function_body_source(
        &mut self,
        params: &[&str],
    ) -> Result<Rc<FunctionNode>, Error> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Rc::new(FunctionNode {
            id: None,
            params: params.iter().map(|p| Identifier::new(*p)).collect(),
            body: FunctionBody::Block(body),
            is_arrow: false,
        }))
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, Error> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> Result<Statement, Error> {
        match &self.current.kind {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let declaration = self.parse_variable_declaration_no_semi()?;
                self.consume_semicolon()?;
                Ok(Statement::VariableDeclaration(declaration))
            }
            TokenKind::Function => self.parse_function_declaration(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => {
                self.advance();
                self.consume_semicolon()?;
                Ok(Statement::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.consume_semicolon()?;
                Ok(Statement::Continue)
            }
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::LeftBrace => Ok(Statement::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_variable_declaration_no_semi(&mut self) -> Result<VariableDeclaration, Error> {
        let kind = self.parse_variable_kind()?;
        let mut declarations = Vec::new();

        loop {
            let id = self.expect_identifier()?;
            let init = if self.check(&TokenKind::Equal) {
                self.advance();
                Some(self.parse_assignment()?)
            } else {
                None
            };
            if kind == VariableKind::Const && init.is_none() {
                return Err(self.error("Missing initializer in const declaration"));
            }
            declarations.push(VariableDeclarator { id, init });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(VariableDeclaration { kind, declarations })
    }

    fn parse_variable_kind(&mut self) -> Result<VariableKind, Error> {
        let kind = match &self.current.kind {
            TokenKind::Var => VariableKind::Var,
            TokenKind::Let => VariableKind::Let,
            TokenKind::Const => VariableKind::Const,
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok(kind)
    }

    fn parse_function_declaration(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'function'
        let id = self.expect_identifier()?;
        let node = self.parse_function_rest(Some(id))?;
        Ok(Statement::FunctionDeclaration(node))
    }

    /// Parses `(params) { body }` after the `function` keyword and name.
    fn parse_function_rest(&mut self, id: Option<Identifier>) -> Result<Rc<FunctionNode>, Error> {
        self.expect(&TokenKind::LeftParen)?;
        let params = self.parse_parameters()?;
        self.expect(&TokenKind::RightParen)?;
        let body = self.parse_block()?;

        Ok(Rc::new(FunctionNode {
            id,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
        }))
    }

    fn parse_parameters(&mut self) -> Result<Vec<Identifier>, Error> {
        let mut params = Vec::new();

        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        Ok(params)
    }

    /// Parses `{ statements }`.
    fn parse_block(&mut self) -> Result<Vec<Statement>, Error> {
        self.nested(Self::parse_block_inner)
    }

    fn parse_block_inner(&mut self) -> Result<Vec<Statement>, Error> {
        self.expect(&TokenKind::LeftBrace)?;
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut body = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        self.no_in = saved_no_in;
        self.expect(&TokenKind::RightBrace)?;
        Ok(body)
    }

    fn parse_if_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);

        let alternate = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement { test, body }))
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'do'
        let body = Box::new(self.parse_statement()?);
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
        Ok(Statement::DoWhile(WhileStatement { test, body }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'for'
        self.expect(&TokenKind::LeftParen)?;

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else if matches!(
            self.current.kind,
            TokenKind::Var | TokenKind::Let | TokenKind::Const
        ) {
            let kind = self.parse_variable_kind()?;
            let id = self.expect_identifier()?;
            if let Some(each) = self.for_each_kind() {
                return self.parse_for_each_rest(each, Some(kind), id);
            }

            self.no_in = true;
            let declaration = self.parse_declarators_after(kind, id);
            self.no_in = false;
            Some(ForInit::Declaration(declaration?))
        } else {
            if let TokenKind::Identifier(name) = &self.current.kind {
                let name = name.clone();
                let mut lookahead = self.scanner.clone();
                let next = lookahead.next_token().kind;
                let is_each = next == TokenKind::In
                    || matches!(&next, TokenKind::Identifier(word) if word == "of");
                if is_each {
                    self.advance();
                    let each = self.for_each_kind().ok_or_else(|| self.unexpected())?;
                    return self.parse_for_each_rest(each, None, Identifier::new(name));
                }
            }

            self.no_in = true;
            let expression = self.parse_expression();
            self.no_in = false;
            Some(ForInit::Expression(expression?))
        };
        self.expect(&TokenKind::Semicolon)?;

        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RightParen)?;

        let body = Box::new(self.parse_statement()?);

        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
        }))
    }

    /// Checks for `in` / `of` after a for-loop variable and consumes it.
    fn for_each_kind(&mut self) -> Option<ForEachKind> {
        let kind = match &self.current.kind {
            TokenKind::In => ForEachKind::In,
            TokenKind::Identifier(word) if word == "of" => ForEachKind::Of,
            _ => return None,
        };
        self.advance();
        Some(kind)
    }

    fn parse_for_each_rest(
        &mut self,
        kind: ForEachKind,
        declaration: Option<VariableKind>,
        left: Identifier,
    ) -> Result<Statement, Error> {
        let right = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(Statement::ForEach(ForEachStatement {
            kind,
            declaration,
            left,
            right,
            body,
        }))
    }

    /// Finishes a declaration whose kind and first name were already consumed.
    fn parse_declarators_after(
        &mut self,
        kind: VariableKind,
        first: Identifier,
    ) -> Result<VariableDeclaration, Error> {
        let mut declarations = Vec::new();
        let mut id = first;

        loop {
            let init = if self.check(&TokenKind::Equal) {
                self.advance();
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push(VariableDeclarator { id, init });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
            id = self.expect_identifier()?;
        }

        Ok(VariableDeclaration { kind, declarations })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'return'

        let argument = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.is_at_end()
            || self.current.newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.consume_semicolon()?;
        Ok(Statement::Return(argument))
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'throw'
        if self.current.newline_before {
            return Err(self.error("Illegal newline after throw"));
        }
        let argument = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::Throw(argument))
    }

    fn parse_try_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'try'
        let block = self.parse_block()?;

        let mut param = None;
        let handler = if self.check(&TokenKind::Catch) {
            self.advance();
            if self.check(&TokenKind::LeftParen) {
                self.advance();
                param = Some(self.expect_identifier()?);
                self.expect(&TokenKind::RightParen)?;
            }
            Some(self.parse_block()?)
        } else {
            None
        };

        let finalizer = if self.check(&TokenKind::Finally) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }

        Ok(Statement::Try(TryStatement {
            block,
            param,
            handler,
            finalizer,
        }))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, Error> {
        let expression = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::Expression(expression))
    }

    /// Parses an expression, including comma sequences.
    pub fn parse_expression(&mut self) -> Result<Expression, Error> {
        let first = self.parse_assignment()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut expressions = vec![first];
        while self.check(&TokenKind::Comma) {
            self.advance();
            expressions.push(self.parse_assignment()?);
        }
        Ok(Expression::Sequence(expressions))
    }

    fn parse_assignment(&mut self) -> Result<Expression, Error> {
        self.nested(Self::parse_assignment_inner)
    }

    fn parse_assignment_inner(&mut self) -> Result<Expression, Error> {
        if self.is_arrow_ahead() {
            return self.parse_arrow_function();
        }

        let expr = self.parse_conditional()?;

        let operator = match &self.current.kind {
            TokenKind::Equal => AssignmentOperator::Assign,
            TokenKind::PlusEqual => AssignmentOperator::AddAssign,
            TokenKind::MinusEqual => AssignmentOperator::SubtractAssign,
            TokenKind::StarEqual => AssignmentOperator::MultiplyAssign,
            TokenKind::SlashEqual => AssignmentOperator::DivideAssign,
            TokenKind::PercentEqual => AssignmentOperator::ModuloAssign,
            _ => return Ok(expr),
        };

        if !matches!(expr, Expression::Identifier(_) | Expression::Member(_)) {
            return Err(self.error("Invalid left-hand side in assignment"));
        }

        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expression::Assignment(AssignmentExpression {
            operator,
            left: Box::new(expr),
            right: Box::new(value),
        }))
    }

    /// Parse conditional (ternary) expression: test ? consequent : alternate
    fn parse_conditional(&mut self) -> Result<Expression, Error> {
        let test = self.parse_coalesce()?;

        if self.check(&TokenKind::Question) {
            self.advance(); // consume '?'
            let saved_no_in = std::mem::replace(&mut self.no_in, false);
            let consequent = self.parse_assignment();
            self.no_in = saved_no_in;
            let consequent = consequent?;
            self.expect(&TokenKind::Colon)?;
            let alternate = self.parse_assignment()?;

            return Ok(Expression::Conditional(ConditionalExpression {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            }));
        }

        Ok(test)
    }

    fn parse_coalesce(&mut self) -> Result<Expression, Error> {
        let depth = self.depth;
        let mut left = self.parse_logical_or()?;

        while self.check(&TokenKind::QuestionQuestion) {
            self.advance();
            self.deepen()?;
            let right = self.parse_logical_or()?;
            left = logical(LogicalOperator::Coalesce, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<Expression, Error> {
        let depth = self.depth;
        let mut left = self.parse_logical_and()?;

        while self.check(&TokenKind::PipePipe) {
            self.advance();
            self.deepen()?;
            let right = self.parse_logical_and()?;
            left = logical(LogicalOperator::Or, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, Error> {
        let depth = self.depth;
        let mut left = self.parse_equality()?;

        while self.check(&TokenKind::AmpersandAmpersand) {
            self.advance();
            self.deepen()?;
            let right = self.parse_equality()?;
            left = logical(LogicalOperator::And, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, Error> {
        let depth = self.depth;
        let mut left = self.parse_comparison()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                TokenKind::StrictEqual => BinaryOperator::StrictEqual,
                TokenKind::StrictNotEqual => BinaryOperator::StrictNotEqual,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_comparison()?;
            left = binary(operator, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression, Error> {
        let depth = self.depth;
        let mut left = self.parse_additive()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::LessThan => BinaryOperator::LessThan,
                TokenKind::LessThanEqual => BinaryOperator::LessThanEqual,
                TokenKind::GreaterThan => BinaryOperator::GreaterThan,
                TokenKind::GreaterThanEqual => BinaryOperator::GreaterThanEqual,
                TokenKind::Instanceof => BinaryOperator::InstanceOf,
                TokenKind::In if !self.no_in => BinaryOperator::In,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_additive()?;
            left = binary(operator, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, Error> {
        let depth = self.depth;
        let mut left = self.parse_multiplicative()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_multiplicative()?;
            left = binary(operator, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, Error> {
        let depth = self.depth;
        let mut left = self.parse_unary()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            self.deepen()?;
            let right = self.parse_unary()?;
            left = binary(operator, left, right);
        }

        self.depth = depth;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        let update = match &self.current.kind {
            TokenKind::PlusPlus => Some(UpdateOperator::Increment),
            TokenKind::MinusMinus => Some(UpdateOperator::Decrement),
            _ => None,
        };

        if let Some(operator) = update {
            self.advance();
            let argument = self.nested(Self::parse_unary)?;
            if !matches!(argument, Expression::Identifier(_) | Expression::Member(_)) {
                return Err(self.error("Invalid left-hand side expression in prefix operation"));
            }
            return Ok(Expression::Update(UpdateExpression {
                operator,
                argument: Box::new(argument),
                prefix: true,
            }));
        }

        let operator = match &self.current.kind {
            TokenKind::Bang => Some(UnaryOperator::LogicalNot),
            TokenKind::Minus => Some(UnaryOperator::Minus),
            TokenKind::Plus => Some(UnaryOperator::Plus),
            TokenKind::Typeof => Some(UnaryOperator::Typeof),
            TokenKind::Void => Some(UnaryOperator::Void),
            TokenKind::Delete => Some(UnaryOperator::Delete),
            _ => None,
        };

        if let Some(operator) = operator {
            self.advance();
            let argument = self.nested(Self::parse_unary)?;
            return Ok(Expression::Unary(UnaryExpression {
                operator,
                argument: Box::new(argument),
            }));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, Error> {
        let expr = self.parse_call()?;

        // A line break before ++/-- ends the statement instead.
        if self.current.newline_before {
            return Ok(expr);
        }

        let operator = match &self.current.kind {
            TokenKind::PlusPlus => UpdateOperator::Increment,
            TokenKind::MinusMinus => UpdateOperator::Decrement,
            _ => return Ok(expr),
        };

        if !matches!(expr, Expression::Identifier(_) | Expression::Member(_)) {
            return Err(self.error("Invalid left-hand side expression in postfix operation"));
        }

        self.advance();
        Ok(Expression::Update(UpdateExpression {
            operator,
            argument: Box::new(expr),
            prefix: false,
        }))
    }

    fn parse_call(&mut self) -> Result<Expression, Error> {
        let depth = self.depth;
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new_expression()?
        } else {
            self.parse_primary()?
        };

        loop {
            self.deepen()?;
            if self.check(&TokenKind::LeftParen) {
                self.advance();
                let arguments = self.parse_arguments()?;
                expr = Expression::Call(CallExpression {
                    callee: Box::new(expr),
                    arguments,
                });
            } else if let Some(property) = self.parse_member_suffix()? {
                expr = Expression::Member(MemberExpression {
                    object: Box::new(expr),
                    property,
                });
            } else {
                break;
            }
        }

        self.depth = depth;
        Ok(expr)
    }

    /// Parses `.name` or `[expr]` if present.
    fn parse_member_suffix(&mut self) -> Result<Option<MemberProperty>, Error> {
        if self.check(&TokenKind::Dot) {
            self.advance();
            let name = self.expect_property_name()?;
            return Ok(Some(MemberProperty::Identifier(Identifier::new(name))));
        }

        if self.check(&TokenKind::LeftBracket) {
            self.advance();
            let saved_no_in = std::mem::replace(&mut self.no_in, false);
            let property = self.nested(Self::parse_expression);
            self.no_in = saved_no_in;
            let property = property?;
            self.expect(&TokenKind::RightBracket)?;
            return Ok(Some(MemberProperty::Expression(Box::new(property))));
        }

        Ok(None)
    }

    /// Parses the argument list after `(`, consuming the closing `)`.
    fn parse_arguments(&mut self) -> Result<Vec<Expression>, Error> {
        self.deepen()?;
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut args = Vec::new();

        while !self.check(&TokenKind::RightParen) {
            args.push(self.parse_assignment()?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        self.no_in = saved_no_in;
        self.expect(&TokenKind::RightParen)?;
        Ok(args)
    }

    fn parse_new_expression(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume 'new'

        let depth = self.depth;
        let mut callee = if self.check(&TokenKind::New) {
            self.nested(Self::parse_new_expression)?
        } else {
            self.parse_primary()?
        };

        while let Some(property) = self.parse_member_suffix()? {
            self.deepen()?;
            callee = Expression::Member(MemberExpression {
                object: Box::new(callee),
                property,
            });
        }

        let arguments = if self.check(&TokenKind::LeftParen) {
            self.advance();
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        self.depth = depth;

        Ok(Expression::New(CallExpression {
            callee: Box::new(callee),
            arguments,
        }))
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        match &self.current.kind {
            TokenKind::Number(n) => {
                let value = *n;
                self.advance();
                Ok(Expression::Literal(Literal::Number(value)))
            }
            TokenKind::String(s) => {
                let value = s.clone();
                self.advance();
                Ok(Expression::Literal(Literal::String(value)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Literal(Literal::Null))
            }
            TokenKind::Identifier(name) => {
                let id = Identifier::new(name.clone());
                self.advance();
                Ok(Expression::Identifier(id))
            }
            TokenKind::This => {
                self.advance();
                Ok(Expression::This)
            }
            TokenKind::Function => {
                self.advance(); // consume 'function'
                let id = match &self.current.kind {
                    TokenKind::Identifier(name) => {
                        let id = Identifier::new(name.clone());
                        self.advance();
                        Some(id)
                    }
                    _ => None,
                };
                Ok(Expression::Function(self.parse_function_rest(id)?))
            }
            TokenKind::LeftParen => {
                self.advance();
                let saved_no_in = std::mem::replace(&mut self.no_in, false);
                let expr = self.nested(Self::parse_expression);
                self.no_in = saved_no_in;
                let expr = expr?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::LeftBracket => self.nested(Self::parse_array_literal),
            TokenKind::LeftBrace => self.nested(Self::parse_object_literal),
            _ => Err(self.unexpected()),
        }
    }

    /// Looks ahead for `ident =>` or `( ident, ... ) =>` without consuming.
    fn is_arrow_ahead(&self) -> bool {
        let mut lookahead = self.scanner.clone();
        match &self.current.kind {
            TokenKind::Identifier(_) => lookahead.next_token().kind == TokenKind::Arrow,
            TokenKind::LeftParen => {
                let mut expect_name = true;
                loop {
                    let token = lookahead.next_token();
                    match token.kind {
                        TokenKind::RightParen => break,
                        TokenKind::Identifier(_) if expect_name => expect_name = false,
                        TokenKind::Comma if !expect_name => expect_name = true,
                        _ => return false,
                    }
                }
                let arrow = lookahead.next_token();
                arrow.kind == TokenKind::Arrow && !arrow.newline_before
            }
            _ => false,
        }
    }

    fn parse_arrow_function(&mut self) -> Result<Expression, Error> {
        let params = if self.check(&TokenKind::LeftParen) {
            self.advance();
            let params = self.parse_parameters()?;
            self.expect(&TokenKind::RightParen)?;
            params
        } else {
            vec![self.expect_identifier()?]
        };
        self.expect(&TokenKind::Arrow)?;

        let body = if self.check(&TokenKind::LeftBrace) {
            FunctionBody::Block(self.parse_block()?)
        } else {
            FunctionBody::Expression(Box::new(self.parse_assignment()?))
        };

        Ok(Expression::Function(Rc::new(FunctionNode {
            id: None,
            params,
            body,
            is_arrow: true,
        })))
    }

    fn parse_array_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume '['
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut elements = Vec::new();

        while !self.check(&TokenKind::RightBracket) {
            elements.push(self.parse_assignment()?);
            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        self.no_in = saved_no_in;
        self.expect(&TokenKind::RightBracket)?;
        Ok(Expression::Array(elements))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume '{'
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let mut properties = Vec::new();

        while !self.check(&TokenKind::RightBrace) {
            let shorthand = matches!(self.current.kind, TokenKind::Identifier(_));
            let key = match &self.current.kind {
                TokenKind::String(s) => {
                    let key = s.clone();
                    self.advance();
                    key
                }
                TokenKind::Number(n) => {
                    let key = crate::runtime::number_to_string(*n);
                    self.advance();
                    key
                }
                _ => self.expect_property_name()?,
            };

            let value = if self.check(&TokenKind::Colon) {
                self.advance();
                self.parse_assignment()?
            } else if self.check(&TokenKind::LeftParen) {
                Expression::Function(self.parse_function_rest(Some(Identifier::new(key.clone())))?)
            } else if shorthand {
                Expression::Identifier(Identifier::new(key.clone()))
            } else {
                return Err(self.unexpected());
            };
            properties.push(Property { key, value });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        self.no_in = saved_no_in;
        self.expect(&TokenKind::RightBrace)?;
        Ok(Expression::Object(properties))
    }

    // Helper methods

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let depth = self.depth;
        self.deepen()?;
        let result = parse(self);
        self.depth = depth;
        result
    }

    fn deepen(&mut self) -> Result<(), Error> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("Maximum nesting depth exceeded"));
        }
        self.depth += 1;
        Ok(())
    }

    fn advance(&mut self) {
        self.current = self.scanner.next_token();
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "Expected {:?}, found {:?}",
                kind, self.current.kind
            )))
        }
    }

    fn expect_identifier(&mut self) -> Result<Identifier, Error> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let id = Identifier::new(name.clone());
            self.advance();
            Ok(id)
        } else {
            Err(self.error(format!(
                "Expected identifier, found {:?}",
                self.current.kind
            )))
        }
    }

    /// Identifiers and keywords are both valid after `.` and as object keys.
    fn expect_property_name(&mut self) -> Result<String, Error> {
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            kind => match kind.keyword_text() {
                Some(text) => text.to_string(),
                None => return Err(self.unexpected()),
            },
        };
        self.advance();
        Ok(name)
    }

    /// Automatic semicolon insertion: a `;` is optional before `}`, at the
    /// end of input, or after a line break.
    fn consume_semicolon(&mut self) -> Result<(), Error> {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            return Ok(());
        }
        if self.check(&TokenKind::RightBrace) || self.is_at_end() || self.current.newline_before {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn unexpected(&self) -> Error {
        match &self.current.kind {
            TokenKind::Eof => self.error("Unexpected end of input"),
            TokenKind::Invalid => self.error("Invalid or unexpected token"),
            kind => self.error(format!("Unexpected token {:?}", kind)),
        }
    }

    fn error(&self, message: impl AsRef<str>) -> Error {
        let offset = self.current.span.start.min(self.source.len());
        let line = self.source[..offset].matches('\n').count() + 1;
        Error::SyntaxError(format!("{} (line {})", message.as_ref(), line))
    }
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn logical(operator: LogicalOperator, left: Expression, right: Expression) -> Expression {
    Expression::Logical(LogicalExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to parse and get first statement
    fn parse_stmt(src: &str) -> Statement {
        let mut parser = Parser::new(src);
        let program = parser.parse_program().unwrap();
        program.body.into_iter().next().unwrap()
    }

    // Helper to parse and check it fails
    fn parse_err(src: &str) -> Error {
        let mut parser = Parser::new(src);
        parser.parse_program().unwrap_err()
    }

    fn parse_expr(src: &str) -> Expression {
        match parse_stmt(src) {
            Statement::Expression(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_variable_declaration() {
        match parse_stmt("let x = 42;") {
            Statement::VariableDeclaration(decl) => {
                assert_eq!(decl.kind, VariableKind::Let);
                assert_eq!(decl.declarations.len(), 1);
                assert_eq!(decl.declarations[0].id.name, "x");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_module_exports_assignment() {
        match parse_expr("module.exports = { a: 1, b }") {
            Expression::Assignment(assign) => {
                assert!(matches!(*assign.left, Expression::Member(_)));
                match *assign.right {
                    Expression::Object(props) => {
                        assert_eq!(props.len(), 2);
                        assert_eq!(props[1].key, "b");
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_asi_on_newline() {
        let mut parser = Parser::new("var a = 1\nvar b = 2\na + b");
        let program = parser.parse_program().unwrap();
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_return_newline_has_no_argument() {
        let mut parser = Parser::new("return\n42");
        let node = parser.parse_function_body_source(&[]).unwrap();
        match &node.body {
            FunctionBody::Block(body) => {
                assert_eq!(body[0], Statement::Return(None));
                assert_eq!(body.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_arrow_functions() {
        for src in ["x => x + 1", "(a, b) => { return a }", "() => 0"] {
            match parse_expr(src) {
                Expression::Function(node) => assert!(node.is_arrow),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_parenthesized_expression_is_not_arrow() {
        assert!(matches!(parse_expr("(a, b)"), Expression::Sequence(_)));
        assert!(matches!(parse_expr("(a)"), Expression::Identifier(_)));
    }

    #[test]
    fn test_parse_for_in_and_of() {
        match parse_stmt("for (var k in obj) {}") {
            Statement::ForEach(each) => {
                assert_eq!(each.kind, ForEachKind::In);
                assert_eq!(each.declaration, Some(VariableKind::Var));
            }
            other => panic!("unexpected {:?}", other),
        }
        match parse_stmt("for (x of list) {}") {
            Statement::ForEach(each) => {
                assert_eq!(each.kind, ForEachKind::Of);
                assert_eq!(each.declaration, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_classic_for() {
        match parse_stmt("for (let i = 0; i < 10; i++) {}") {
            Statement::For(stmt) => {
                assert!(matches!(stmt.init, Some(ForInit::Declaration(_))));
                assert!(stmt.test.is_some());
                assert!(stmt.update.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_try_catch_finally() {
        match parse_stmt("try { a() } catch (e) { b() } finally { c() }") {
            Statement::Try(stmt) => {
                assert_eq!(stmt.param, Some(Identifier::new("e")));
                assert!(stmt.handler.is_some());
                assert!(stmt.finalizer.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_keywords_as_property_names() {
        match parse_expr("obj.default = { new: 1 }.new") {
            Expression::Assignment(assign) => match *assign.left {
                Expression::Member(member) => assert_eq!(
                    member.property,
                    MemberProperty::Identifier(Identifier::new("default"))
                ),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_new_with_member_callee() {
        match parse_expr("new a.B(1)") {
            Expression::New(call) => {
                assert!(matches!(*call.callee, Expression::Member(_)));
                assert_eq!(call.arguments.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_logical_precedence() {
        match parse_expr("a || b && c") {
            Expression::Logical(expr) => {
                assert_eq!(expr.operator, LogicalOperator::Or);
                assert!(matches!(*expr.right, Expression::Logical(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors_report_line() {
        let err = parse_err("var a = 1;\nvar = 2;");
        assert!(err.to_string().contains("line 2"), "{}", err);
        assert!(matches!(parse_err("a b"), Error::SyntaxError(_)));
        assert!(matches!(parse_err("1 = 2"), Error::SyntaxError(_)));
        assert!(matches!(parse_err("try {}"), Error::SyntaxError(_)));
        assert!(matches!(parse_err("const x;"), Error::SyntaxError(_)));
    }

    fn nested(open: &str, inner: &str, close: &str, depth: usize) -> String {
        format!("{}{}{}", open.repeat(depth), inner, close.repeat(depth))
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        for src in [
            nested("(", "1", ")", 10_000),
            nested("[", "1", "]", 3_000),
            nested("{", "", "}", 10_000),
            nested("f(", "1", ")", 10_000),
            nested("a ? b : ", "c", "", 10_000),
            nested("!", "x", "", 10_000),
            nested("new ", "A", "", 10_000),
            format!("1{}", "+1".repeat(10_000)),
            format!("a{}", ".b".repeat(10_000)),
        ] {
            let err = parse_err(&src);
            assert!(matches!(err, Error::SyntaxError(_)), "{}", err);
            assert!(err.to_string().contains("Maximum nesting depth exceeded"), "{}", err);
        }
    }

    #[test]
    fn test_moderate_nesting_parses() {
        parse_expr(&nested("(", "1", ")", 40));
        parse_expr(&nested("[", "1", "]", 40));
        parse_expr(&format!("1{}", "+1".repeat(200)));
        parse_expr(&format!("a{}", ".b".repeat(200)));
        let _ = parse_stmt(&nested("if (a) ", "x()", "", 100));
    }
}
