// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::builtins::regex::RegexCache;
use crate::builtins::strings::ccnorm_str;
use crate::builtins::{Builtin, BuiltinFcn};
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;

pub fn register(m: &mut HashMap<&'static str, Builtin>) {
    let mut add = |name, fcn: BuiltinFcn| {
        m.insert(name, Builtin { fcn, min_args: 2, max_args: None });
    };
    add("contains_any", contains_any);
    add("contains_all", contains_all);
    add("ccnorm_contains_any", ccnorm_contains_any);
    add("ccnorm_contains_all", ccnorm_contains_all);
    add("equals_to_any", equals_to_any);
}

// Empty needles never match.
fn search(args: &[Value], normalize: bool, all: bool) -> bool {
    let prepare = |v: &Value| {
        let s = v.to_af_string();
        if normalize {
            ccnorm_str(&s)
        } else {
            s
        }
    };
    let haystack = prepare(&args[0]);
    let mut needles = args[1..].iter().map(prepare);
    let found = |n: &String| !n.is_empty() && haystack.contains(n.as_str());
    if all {
        needles.all(|n| found(&n))
    } else {
        needles.any(|n| found(&n))
    }
}

fn contains_any(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(search(args, false, false)))
}

fn contains_all(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(search(args, false, true)))
}

fn ccnorm_contains_any(
    _: &mut RegexCache,
    _: &Span,
    _: &[Ref<Expr>],
    args: &[Value],
) -> Result<Value> {
    Ok(Value::Bool(search(args, true, false)))
}

fn ccnorm_contains_all(
    _: &mut RegexCache,
    _: &Span,
    _: &[Ref<Expr>],
    args: &[Value],
) -> Result<Value> {
    Ok(Value::Bool(search(args, true, true)))
}

// Strict comparison against each candidate.
fn equals_to_any(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    let target = &args[0];
    Ok(Value::Bool(args[1..].iter().any(|c| c.strict_eq(target))))
}
