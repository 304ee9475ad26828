// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Operator semantics that only depend on operand values.

use std::cmp::Ordering;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::runtime::Value;

/// Applies an arithmetic, comparison or equality operator.
///
/// `in` and `instanceof` need property access and are handled by the
/// interpreter; they evaluate to `undefined` here.
pub(crate) fn binary(operator: BinaryOperator, left: &Value, right: &Value) -> Value {
    match operator {
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOperator::Multiply => Value::Number(left.to_number() * right.to_number()),
        BinaryOperator::Divide => Value::Number(left.to_number() / right.to_number()),
        BinaryOperator::Modulo => Value::Number(left.to_number() % right.to_number()),
        BinaryOperator::Equal => Value::Boolean(left.loose_equals(right)),
        BinaryOperator::NotEqual => Value::Boolean(!left.loose_equals(right)),
        BinaryOperator::StrictEqual => Value::Boolean(left.strict_equals(right)),
        BinaryOperator::StrictNotEqual => Value::Boolean(!left.strict_equals(right)),
        BinaryOperator::LessThan => {
            Value::Boolean(compare(left, right) == Some(Ordering::Less))
        }
        BinaryOperator::LessThanEqual => Value::Boolean(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOperator::GreaterThan => {
            Value::Boolean(compare(left, right) == Some(Ordering::Greater))
        }
        BinaryOperator::GreaterThanEqual => Value::Boolean(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOperator::In | BinaryOperator::InstanceOf => Value::Undefined,
    }
}

/// Applies `! - + typeof void`. `delete` is handled by the interpreter.
pub(crate) fn unary(operator: UnaryOperator, value: &Value) -> Value {
    match operator {
        UnaryOperator::LogicalNot => Value::Boolean(!value.to_boolean()),
        UnaryOperator::Minus => Value::Number(-value.to_number()),
        UnaryOperator::Plus => Value::Number(value.to_number()),
        UnaryOperator::Typeof => Value::from(value.type_of()),
        UnaryOperator::Void => Value::Undefined,
        UnaryOperator::Delete => Value::Boolean(true),
    }
}

fn add(left: &Value, right: &Value) -> Value {
    let stringy = |v: &Value| matches!(v, Value::String(_) | Value::Object(_));
    if stringy(left) || stringy(right) {
        let mut out = left.to_js_string();
        out.push_str(&right.to_js_string());
        return Value::from(out);
    }
    Value::Number(left.to_number() + right.to_number())
}

/// Relational comparison. `None` when either side is NaN.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    let primitive = |v: &Value| match v {
        Value::Object(_) => Value::from(v.to_js_string()),
        other => other.clone(),
    };
    let (left, right) = (primitive(left), primitive(right));

    if let (Value::String(a), Value::String(b)) = (&left, &right) {
        return Some(a.cmp(b));
    }
    left.to_number().partial_cmp(&right.to_number())
}
