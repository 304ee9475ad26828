// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The `Math` object.

use uuid::Uuid;

use super::define;
use crate::runtime::{ObjectRef, Value, arg};

pub(super) fn install(intrinsics: &ObjectRef) {
    let math = ObjectRef::ordinary();

    for (name, value) in [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
    ] {
        math.set(name, Value::Number(value));
    }

    let unary: [(&str, fn(f64) -> f64); 17] = [
        ("abs", f64::abs),
        ("floor", f64::floor),
        ("ceil", f64::ceil),
        ("round", round),
        ("trunc", f64::trunc),
        ("sign", sign),
        ("sqrt", f64::sqrt),
        ("cbrt", f64::cbrt),
        ("log", f64::ln),
        ("log2", f64::log2),
        ("log10", f64::log10),
        ("exp", f64::exp),
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
        ("atan", f64::atan),
        ("asin", f64::asin),
    ];
    for (name, op) in unary {
        define(&math, name, move |_, _, args| {
            Ok(Value::Number(op(arg(args, 0).to_number())))
        });
    }

    define(&math, "pow", |_, _, args| {
        Ok(Value::Number(
            arg(args, 0).to_number().powf(arg(args, 1).to_number()),
        ))
    });

    define(&math, "atan2", |_, _, args| {
        Ok(Value::Number(
            arg(args, 0).to_number().atan2(arg(args, 1).to_number()),
        ))
    });

    define(&math, "hypot", |_, _, args| {
        Ok(Value::Number(
            args.iter()
                .map(|v| v.to_number().powi(2))
                .sum::<f64>()
                .sqrt(),
        ))
    });

    define(&math, "max", |_, _, args| {
        let mut result = f64::NEG_INFINITY;
        for value in args {
            let n = value.to_number();
            if n.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            result = result.max(n);
        }
        Ok(Value::Number(result))
    });

    define(&math, "min", |_, _, args| {
        let mut result = f64::INFINITY;
        for value in args {
            let n = value.to_number();
            if n.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            result = result.min(n);
        }
        Ok(Value::Number(result))
    });

    define(&math, "random", |_, _, _| Ok(Value::Number(random())));

    intrinsics.set("Math", Value::Object(math));
}

/// Rounds half up, like `Math.round` (`-2.5` rounds to `-2`).
fn round(n: f64) -> f64 {
    (n + 0.5).floor()
}

fn sign(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 { n } else { n.signum() }
}

/// A uniformly distributed number in `[0, 1)` from 53 random bits.
fn random() -> f64 {
    let bytes = Uuid::new_v4().into_bytes();
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    (u64::from_le_bytes(word) >> 11) as f64 / (1u64 << 53) as f64
}
