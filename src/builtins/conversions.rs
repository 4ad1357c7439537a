// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::builtins::regex::RegexCache;
use crate::builtins::{Builtin, BuiltinFcn};
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;

pub fn register(m: &mut HashMap<&'static str, Builtin>) {
    let mut add = |name, fcn: BuiltinFcn| {
        m.insert(name, Builtin { fcn, min_args: 1, max_args: Some(1) });
    };
    add("string", to_string);
    add("int", to_int);
    add("float", to_float);
    add("bool", to_bool);
}

fn to_string(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::from(args[0].to_af_string()))
}

fn to_int(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::Int(args[0].to_int()))
}

fn to_float(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::Float(args[0].to_float()))
}

fn to_bool(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(args[0].to_bool()))
}
