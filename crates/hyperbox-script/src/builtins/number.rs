// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Number methods.

use super::method;
use crate::error::{Error, Result};
use crate::interpreter::{Interpreter, MethodSet};
use crate::runtime::{Value, arg, number_to_string};

pub(super) fn install_methods(interpreter: &Interpreter) {
    method(interpreter, MethodSet::Number, "toFixed", |_, this, args| {
        let n = number_of(this)?;
        let digits = arg(args, 0).to_number();
        let digits = if digits.is_nan() { 0.0 } else { digits };
        if !(0.0..=100.0).contains(&digits) {
            return Err(Error::range_error("toFixed() digits argument must be between 0 and 100"));
        }
        if !n.is_finite() {
            return Ok(Value::from(number_to_string(n)));
        }
        Ok(Value::from(format!("{:.*}", digits as usize, n)))
    });

    method(interpreter, MethodSet::Number, "toString", |_, this, args| {
        let n = number_of(this)?;
        let radix = match arg(args, 0) {
            Value::Undefined => 10,
            radix => radix.to_number() as u32,
        };
        if !(2..=36).contains(&radix) {
            return Err(Error::range_error("toString() radix must be between 2 and 36"));
        }
        Ok(Value::from(to_radix(n, radix)))
    });

    method(interpreter, MethodSet::Number, "valueOf", |_, this, _| {
        Ok(Value::Number(number_of(this)?))
    });
}

fn number_of(this: &Value) -> Result<f64> {
    match this {
        Value::Number(n) => Ok(*n),
        _ => Err(Error::type_error("Number method called on a non-number")),
    }
}

/// Integer part in `radix`; fractions are only rendered in base 10.
fn to_radix(n: f64, radix: u32) -> String {
    if radix == 10 || !n.is_finite() || n.fract() != 0.0 {
        return number_to_string(n);
    }
    let negative = n < 0.0;
    let mut value = n.abs() as u128;
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = (value % radix as u128) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        value /= radix as u128;
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_radix() {
        assert_eq!(to_radix(255.0, 16), "ff");
        assert_eq!(to_radix(-5.0, 2), "-101");
        assert_eq!(to_radix(0.0, 8), "0");
        assert_eq!(to_radix(1.5, 2), "1.5");
    }
}
