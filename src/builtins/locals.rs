// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::builtins::regex::RegexCache;
use crate::builtins::Builtin;
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;

/// Functions that bind a local variable. The interpreter performs the
/// binding; the call itself evaluates to the assigned value.
pub const SETTERS: &[&str] = &["set", "set_var"];

pub fn register(m: &mut HashMap<&'static str, Builtin>) {
    for name in SETTERS {
        m.insert(
            *name,
            Builtin {
                fcn: set_var,
                min_args: 2,
                max_args: Some(2),
            },
        );
    }
}

fn set_var(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(args[1].clone())
}
