// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Global functions, constants and the primitive wrapper constructors.

use super::define;
use crate::runtime::{ObjectRef, Value, arg, native_function};

pub(super) fn install(intrinsics: &ObjectRef) {
    intrinsics.set("undefined", Value::Undefined);
    intrinsics.set("NaN", Value::Number(f64::NAN));
    intrinsics.set("Infinity", Value::Number(f64::INFINITY));

    define(intrinsics, "parseInt", |_, _, args| {
        let text = arg(args, 0).to_js_string();
        let radix = arg(args, 1);
        let radix = if radix.is_undefined() {
            0
        } else {
            radix.to_number() as u32
        };
        Ok(Value::Number(parse_int(&text, radix)))
    });

    define(intrinsics, "parseFloat", |_, _, args| {
        Ok(Value::Number(parse_float(&arg(args, 0).to_js_string())))
    });

    define(intrinsics, "isNaN", |_, _, args| {
        Ok(Value::Boolean(arg(args, 0).to_number().is_nan()))
    });

    define(intrinsics, "isFinite", |_, _, args| {
        Ok(Value::Boolean(arg(args, 0).to_number().is_finite()))
    });

    let string = native_function("String", |_, _, args| {
        Ok(match args.first() {
            Some(value) => Value::from(value.to_js_string()),
            None => Value::from(""),
        })
    });
    if let Value::Object(obj) = &string {
        define(obj, "fromCharCode", |_, _, args| {
            let text: String = args
                .iter()
                .filter_map(|v| char::from_u32(v.to_number() as u32))
                .collect();
            Ok(Value::from(text))
        });
    }
    intrinsics.set("String", string);

    let number = native_function("Number", |_, _, args| {
        Ok(Value::Number(args.first().map(|v| v.to_number()).unwrap_or(0.0)))
    });
    if let Value::Object(obj) = &number {
        obj.set("MAX_SAFE_INTEGER", Value::Number(9_007_199_254_740_991.0));
        obj.set("MIN_SAFE_INTEGER", Value::Number(-9_007_199_254_740_991.0));
        obj.set("EPSILON", Value::Number(f64::EPSILON));
        obj.set("NaN", Value::Number(f64::NAN));
        define(obj, "isInteger", |_, _, args| {
            Ok(Value::Boolean(matches!(
                arg(args, 0),
                Value::Number(n) if n.is_finite() && n.fract() == 0.0
            )))
        });
        define(obj, "isFinite", |_, _, args| {
            Ok(Value::Boolean(matches!(arg(args, 0), Value::Number(n) if n.is_finite())))
        });
        define(obj, "isNaN", |_, _, args| {
            Ok(Value::Boolean(matches!(arg(args, 0), Value::Number(n) if n.is_nan())))
        });
        define(obj, "parseFloat", |_, _, args| {
            Ok(Value::Number(parse_float(&arg(args, 0).to_js_string())))
        });
    }
    intrinsics.set("Number", number);

    define(intrinsics, "Boolean", |_, _, args| {
        Ok(Value::Boolean(arg(args, 0).to_boolean()))
    });
}

/// `parseInt`: the longest valid prefix in `radix` (0 = auto-detect).
pub(crate) fn parse_int(text: &str, radix: u32) -> f64 {
    let text = text.trim_start();
    let (negative, mut rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let mut radix = radix;
    if radix == 0 || radix == 16 {
        if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
            rest = hex;
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }

    let mut result = 0.0;
    let mut any = false;
    for c in rest.chars() {
        let Some(digit) = c.to_digit(radix) else {
            break;
        };
        result = result * radix as f64 + digit as f64;
        any = true;
    }

    match (any, negative) {
        (false, _) => f64::NAN,
        (true, true) => -result,
        (true, false) => result,
    }
}

/// `parseFloat`: the longest prefix that forms a decimal literal.
pub(crate) fn parse_float(text: &str) -> f64 {
    let text = text.trim_start();
    let unsigned = text.trim_start_matches(['+', '-']);
    if unsigned.starts_with("Infinity") {
        return if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let candidate: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        .collect();
    (1..=candidate.len())
        .rev()
        .find_map(|len| candidate[..len].parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}
