// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::cmp::Ordering;
use core::fmt;

/// Result of coercing a value into the numeric domain.
///
/// Integer arithmetic that overflows is promoted to floating point, which is
/// what existing filters observe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Truncating conversion used by `%` and `int()`.
    pub fn as_i64(self) -> i64 {
        match self {
            Number::Int(i) => i,
            // `as` saturates and maps NaN to 0.
            Number::Float(f) => f as i64,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    /// Parses a string that is numeric in its entirety.
    ///
    /// Accepts leading whitespace, an optional sign, digits with an
    /// optional fraction and an optional exponent. Trailing whitespace makes
    /// the string non-numeric.
    pub fn parse_numeric(s: &str) -> Option<Number> {
        let trimmed = s.trim_start();
        match scan_numeric_prefix(trimmed) {
            Some((len, is_float)) if len == trimmed.len() => Some(Self::from_lexeme(trimmed, is_float)),
            _ => None,
        }
    }

    /// Parses the longest numeric prefix of a string; non-numeric strings are 0.
    pub fn parse_prefix(s: &str) -> Number {
        let trimmed = s.trim_start();
        match scan_numeric_prefix(trimmed) {
            Some((len, is_float)) => Self::from_lexeme(&trimmed[..len], is_float),
            None => Number::Int(0),
        }
    }

    fn from_lexeme(lexeme: &str, is_float: bool) -> Number {
        if !is_float {
            if let Ok(i) = lexeme.parse::<i64>() {
                return Number::Int(i);
            }
        }
        Number::Float(lexeme.parse::<f64>().unwrap_or(0.0))
    }

    pub fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => match a.checked_add(b) {
                Some(r) => Number::Int(r),
                None => Number::Float(a as f64 + b as f64),
            },
            (a, b) => Number::Float(a.as_f64() + b.as_f64()),
        }
    }

    pub fn sub(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => match a.checked_sub(b) {
                Some(r) => Number::Int(r),
                None => Number::Float(a as f64 - b as f64),
            },
            (a, b) => Number::Float(a.as_f64() - b.as_f64()),
        }
    }

    pub fn mul(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => match a.checked_mul(b) {
                Some(r) => Number::Int(r),
                None => Number::Float(a as f64 * b as f64),
            },
            (a, b) => Number::Float(a.as_f64() * b.as_f64()),
        }
    }

    /// Returns `None` on division by zero. Exact integer quotients stay integers.
    pub fn div(self, other: Number) -> Option<Number> {
        if other.is_zero() {
            return None;
        }
        Some(match (self, other) {
            (Number::Int(a), Number::Int(b)) if a.checked_rem(b) == Some(0) => {
                match a.checked_div(b) {
                    Some(q) => Number::Int(q),
                    None => Number::Float(a as f64 / b as f64),
                }
            }
            (a, b) => Number::Float(a.as_f64() / b.as_f64()),
        })
    }

    /// Integer remainder; both operands are truncated first. `None` when the
    /// truncated divisor is zero.
    pub fn rem(self, other: Number) -> Option<Number> {
        let b = other.as_i64();
        if b == 0 {
            return None;
        }
        Some(Number::Int(self.as_i64().wrapping_rem(b)))
    }

    pub fn pow(self, other: Number) -> Number {
        match (self, other) {
            (Number::Int(base), Number::Int(exp)) if exp >= 0 => {
                match u32::try_from(exp).ok().and_then(|e| base.checked_pow(e)) {
                    Some(r) => Number::Int(r),
                    None => Number::Float((base as f64).powf(exp as f64)),
                }
            }
            (a, b) => Number::Float(a.as_f64().powf(b.as_f64())),
        }
    }

    pub fn neg(self) -> Number {
        match self {
            Number::Int(i) => match i.checked_neg() {
                Some(r) => Number::Int(r),
                None => Number::Float(-(i as f64)),
            },
            Number::Float(f) => Number::Float(-f),
        }
    }

    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(v) => f.write_str(&format_float(*v)),
        }
    }
}

/// Renders a float the way filter authors see it in string contexts:
/// integral values without a fraction, very large or very small magnitudes
/// in `1.0E+25` notation.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "NAN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    let abs = v.abs();
    if abs != 0.0 && !(1e-4..1e15).contains(&abs) {
        let s = format!("{v:e}");
        // Rust renders `1e25` / `1.5e-7`; normalise to `1.0E+25` / `1.5E-7`.
        if let Some((mantissa, exp)) = s.split_once('e') {
            let mantissa = if mantissa.contains('.') {
                mantissa.to_string()
            } else {
                format!("{mantissa}.0")
            };
            let exp = match exp.strip_prefix('-') {
                Some(e) => format!("-{e}"),
                None => format!("+{exp}"),
            };
            return format!("{mantissa}E{exp}");
        }
        return s;
    }
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

// Returns the byte length of the numeric prefix and whether it denotes a float.
fn scan_numeric_prefix(s: &str) -> Option<(usize, bool)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut is_float = false;

    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if digits > 0 || j > frac_start {
            digits += j - frac_start;
            is_float = true;
            i = j;
        }
    }

    if digits == 0 {
        return None;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            is_float = true;
            i = j;
        }
    }

    Some((i, is_float))
}
