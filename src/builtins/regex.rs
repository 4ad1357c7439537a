// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::builtins::utils::string_arg;
use crate::builtins::{Builtin, BuiltinFcn};
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::rc::Rc;

use anyhow::Result;
use lru::LruCache;
use regex::{Regex, RegexBuilder};

/// Compiled patterns keyed by source text and case sensitivity.
pub struct RegexCache {
    cache: LruCache<(String, bool), Rc<Regex>>,
}

impl RegexCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Compiles `pattern` or reports `regexfailure` at `span`.
    pub fn get(&mut self, span: &Span, pattern: &str, insensitive: bool) -> Result<Rc<Regex>> {
        let key = (pattern.to_string(), insensitive);
        if let Some(re) = self.cache.get(&key) {
            return Ok(re.clone());
        }
        let re = match RegexBuilder::new(pattern)
            .case_insensitive(insensitive)
            .build()
        {
            Ok(re) => Rc::new(re),
            Err(e) => {
                return Err(span.user_error(
                    "regexfailure",
                    vec![Value::from(e.to_string()), Value::from(pattern)],
                ))
            }
        };
        self.cache.put(key, re.clone());
        Ok(re)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

pub fn register(m: &mut HashMap<&'static str, Builtin>) {
    let mut add = |name, fcn: BuiltinFcn, min, max| {
        m.insert(name, Builtin { fcn, min_args: min, max_args: max });
    };
    add("rcount", rcount, 1, Some(2));
    add("get_matches", get_matches, 2, Some(2));
    add("str_replace_regexp", str_replace_regexp, 3, Some(3));
    add("rescape", rescape, 1, Some(1));
}

fn arg_span<'a>(span: &'a Span, params: &'a [Ref<Expr>], idx: usize) -> &'a Span {
    params.get(idx).map(|p| p.span()).unwrap_or(span)
}

// rcount(pattern, subject) counts regex matches; with a single argument it
// behaves like count().
fn rcount(
    cache: &mut RegexCache,
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
) -> Result<Value> {
    if args.len() == 1 {
        return Ok(match &args[0] {
            Value::Array(a) => Value::from(a.len()),
            v => Value::from(v.to_af_string().matches(',').count() + 1),
        });
    }
    let re = cache.get(arg_span(span, params, 0), &string_arg(args, 0), false)?;
    Ok(Value::from(re.find_iter(&string_arg(args, 1)).count()))
}

// Capture groups of the first match. Groups that did not participate, or all
// of them when nothing matched, are `false`.
fn get_matches(
    cache: &mut RegexCache,
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
) -> Result<Value> {
    let re = cache.get(arg_span(span, params, 0), &string_arg(args, 0), false)?;
    let subject = string_arg(args, 1);
    let mut groups = vec![Value::Bool(false); re.captures_len()];
    if let Some(caps) = re.captures(&subject) {
        for (i, m) in caps.iter().enumerate() {
            if let Some(m) = m {
                groups[i] = Value::from(m.as_str());
            }
        }
    }
    Ok(Value::from(groups))
}

/// Rewrites `\1` and `$1` group references into `${1}` form.
pub fn convert_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' | '$' if chars.peek().is_some_and(|d| d.is_ascii_digit()) => {
                let mut digits = String::new();
                while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                    digits.push(*d);
                    chars.next();
                }
                out.push_str(&format!("${{{digits}}}"));
            }
            '$' => out.push_str("$$"),
            _ => out.push(c),
        }
    }
    out
}

fn str_replace_regexp(
    cache: &mut RegexCache,
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
) -> Result<Value> {
    let subject = string_arg(args, 0);
    let re = cache.get(arg_span(span, params, 1), &string_arg(args, 1), false)?;
    let replacement = convert_replacement(&string_arg(args, 2));
    Ok(Value::from(
        re.replace_all(&subject, replacement.as_str()).into_owned(),
    ))
}

fn rescape(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::from(regex::escape(&string_arg(args, 0))))
}
