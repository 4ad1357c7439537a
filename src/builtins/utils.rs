// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::Span;
use crate::value::Value;

use anyhow::Result;

/// Validates the number of arguments passed to `fcn`.
pub fn ensure_args_count(
    span: &Span,
    fcn: &str,
    min: usize,
    max: Option<usize>,
    count: usize,
) -> Result<()> {
    if count == 0 && min > 0 {
        return Err(span.user_error("noparams", vec![Value::from(fcn)]));
    }
    if count < min {
        return Err(span.user_error(
            "notenoughargs",
            vec![Value::from(fcn), Value::from(min), Value::from(count)],
        ));
    }
    match max {
        Some(max) if count > max => Err(span.user_error(
            "toomanyargs",
            vec![Value::from(fcn), Value::from(max), Value::from(count)],
        )),
        _ => Ok(()),
    }
}

/// String form of the `idx`-th argument; missing arguments are empty.
pub fn string_arg(args: &[Value], idx: usize) -> String {
    args.get(idx).map(|v| v.to_af_string()).unwrap_or_default()
}

pub fn int_arg(args: &[Value], idx: usize) -> Option<i64> {
    args.get(idx).map(|v| v.to_int())
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the `idx`-th character, or the string length past the end.
pub fn char_to_byte(s: &str, idx: usize) -> usize {
    s.char_indices()
        .nth(idx)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}
