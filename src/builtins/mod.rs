// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod comparison;
pub mod conversions;
mod equivset;
pub mod keywords;
pub mod locals;
#[cfg(feature = "net")]
pub mod net;
pub mod regex;
pub mod strings;
pub mod utils;

use crate::ast::{Expr, Ref};
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;
use lazy_static::lazy_static;

use self::regex::RegexCache;

pub type BuiltinFcn = fn(&mut RegexCache, &Span, &[Ref<Expr>], &[Value]) -> Result<Value>;

/// A builtin function and the number of arguments it accepts.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub fcn: BuiltinFcn,
    pub min_args: usize,
    pub max_args: Option<usize>,
}

#[rustfmt::skip]
lazy_static! {
    pub static ref BUILTINS: HashMap<&'static str, Builtin> = {
	let mut m : HashMap<&'static str, Builtin> = HashMap::new();

	strings::register(&mut m);
	conversions::register(&mut m);
	comparison::register(&mut m);
	regex::register(&mut m);
	locals::register(&mut m);
	#[cfg(feature = "net")]
	net::register(&mut m);

	m
    };
}

/// Looks up `name` and validates the argument count.
pub fn lookup(span: &Span, name: &str, arg_count: usize) -> Result<&'static Builtin> {
    let Some(builtin) = BUILTINS.get(name) else {
        return Err(span.user_error("unknownfunction", vec![Value::from(name)]));
    };
    utils::ensure_args_count(
        span,
        name,
        builtin.min_args,
        builtin.max_args,
        arg_count,
    )?;
    Ok(builtin)
}
