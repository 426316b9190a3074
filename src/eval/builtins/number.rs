//! `Number.prototype` methods and numeric helpers shared with `Math`.

use super::{arg, to_integer};
use crate::eval::{
    evaluator::{EvalError, EvalResult},
    value::{number_to_string, Value},
};

pub const METHODS: &[&str] = &["toFixed", "toString", "valueOf"];

pub fn call_method(n: f64, name: &str, args: &[Value]) -> EvalResult<Value> {
    match name {
        "toFixed" => {
            let digits = to_integer(&arg(args, 0));
            if !(0.0..=100.0).contains(&digits) {
                return Err(EvalError::Range(
                    "toFixed() digits argument must be between 0 and 100".to_string(),
                ));
            }
            Ok(Value::from(to_fixed(n, digits as usize)))
        }
        "toString" => {
            let radix = match arg(args, 0) {
                Value::Undefined => 10.0,
                other => to_integer(&other),
            };
            if !(2.0..=36.0).contains(&radix) {
                return Err(EvalError::Range(
                    "toString() radix must be between 2 and 36".to_string(),
                ));
            }
            Ok(Value::from(to_radix_string(n, radix as u32)))
        }
        "valueOf" => Ok(Value::Number(n)),
        _ => Err(EvalError::Type(format!("number.{} is not a function", name))),
    }
}

/// `Number.prototype.toFixed`: ties round away from zero on the exact
/// binary value.
pub fn to_fixed(x: f64, digits: usize) -> String {
    if !x.is_finite() || x.abs() >= 1e21 {
        return number_to_string(x);
    }

    // enough extra digits that the first dropped one decides the rounding
    let exact = format!("{:.*}", digits + 30, x.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut kept: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().take(digits))
        .map(|b| b - b'0')
        .collect();
    let mut int_len = int_part.len();

    if frac_part.as_bytes().get(digits).is_some_and(|b| *b >= b'5') {
        let mut carry = true;
        for d in kept.iter_mut().rev() {
            if *d == 9 {
                *d = 0;
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            kept.insert(0, 1);
            int_len += 1;
        }
    }

    let digits_str: String = kept.iter().map(|d| char::from(b'0' + d)).collect();
    let (int_digits, frac_digits) = digits_str.split_at(int_len);
    let sign = if x < 0.0 { "-" } else { "" };
    if frac_digits.is_empty() {
        format!("{}{}", sign, int_digits)
    } else {
        format!("{}{}.{}", sign, int_digits, frac_digits)
    }
}

/// `Number.prototype.toString(radix)`
pub fn to_radix_string(x: f64, radix: u32) -> String {
    if radix == 10 || !x.is_finite() {
        return number_to_string(x);
    }

    let negative = x < 0.0;
    let x = x.abs();
    let mut int_part = x.trunc();
    let mut frac = x - int_part;

    let mut int_digits = Vec::new();
    loop {
        let d = (int_part % radix as f64) as u32;
        int_digits.push(std::char::from_digit(d, radix).unwrap_or('0'));
        int_part = (int_part / radix as f64).trunc();
        if int_part < 1.0 {
            break;
        }
    }
    int_digits.reverse();

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.extend(int_digits);

    if frac > 0.0 {
        out.push('.');
        for _ in 0..52 {
            frac *= radix as f64;
            let d = frac.trunc() as u32;
            out.push(std::char::from_digit(d, radix).unwrap_or('0'));
            frac -= d as f64;
            if frac <= 0.0 {
                break;
            }
        }
    }
    out
}

/// `**` and `Math.pow`
pub fn power(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// `Math.round`: ties go towards positive infinity.
pub fn round(x: f64) -> f64 {
    let r = x.round();
    if r - x == -0.5 {
        r + 1.0
    } else {
        r
    }
}
