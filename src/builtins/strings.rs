// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::builtins::equivset;
use crate::builtins::regex::RegexCache;
use crate::builtins::utils::{char_len, char_to_byte, int_arg, string_arg};
use crate::builtins::{Builtin, BuiltinFcn};
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;

pub fn register(m: &mut HashMap<&'static str, Builtin>) {
    let mut add = |name, fcn: BuiltinFcn, min, max| {
        m.insert(name, Builtin { fcn, min_args: min, max_args: max });
    };
    add("lcase", lcase, 1, Some(1));
    add("ucase", ucase, 1, Some(1));
    add("length", length, 1, Some(1));
    add("strlen", length, 1, Some(1));
    add("norm", norm, 1, Some(1));
    add("ccnorm", ccnorm, 1, Some(1));
    add("specialratio", specialratio, 1, Some(1));
    add("rmspecials", rmspecials, 1, Some(1));
    add("rmdoubles", rmdoubles, 1, Some(1));
    add("rmwhitespace", rmwhitespace, 1, Some(1));
    add("count", count, 1, Some(2));
    add("substr", substr, 2, Some(3));
    add("strpos", strpos, 2, Some(3));
    add("str_replace", str_replace, 3, Some(3));
    add("sanitize", sanitize, 1, Some(1));
}

fn lcase(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::from(string_arg(args, 0).to_lowercase()))
}

fn ucase(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::from(string_arg(args, 0).to_uppercase()))
}

fn length(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(match &args[0] {
        Value::Array(a) => Value::from(a.len()),
        v => Value::from(char_len(&v.to_af_string())),
    })
}

pub fn ccnorm_str(s: &str) -> String {
    equivset::normalize(s)
}

pub fn rmspecials_str(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect()
}

pub fn rmdoubles_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev = None;
    for c in s.chars() {
        if prev != Some(c) {
            out.push(c);
        }
        prev = Some(c);
    }
    out
}

pub fn rmwhitespace_str(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn norm(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    let s = ccnorm_str(&string_arg(args, 0));
    let s = rmdoubles_str(&s);
    let s = rmspecials_str(&s);
    Ok(Value::from(rmwhitespace_str(&s)))
}

fn ccnorm(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::from(ccnorm_str(&string_arg(args, 0))))
}

fn specialratio(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0);
    let total = char_len(&s);
    if total == 0 {
        return Ok(Value::Float(0.0));
    }
    let specials = s
        .chars()
        .filter(|c| !(c.is_alphanumeric() || *c == '_'))
        .count();
    Ok(Value::Float(specials as f64 / total as f64))
}

fn rmspecials(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::from(rmspecials_str(&string_arg(args, 0))))
}

fn rmdoubles(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::from(rmdoubles_str(&string_arg(args, 0))))
}

fn rmwhitespace(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    Ok(Value::from(rmwhitespace_str(&string_arg(args, 0))))
}

// count(list) counts array elements or comma separated items;
// count(needle, haystack) counts non-overlapping occurrences.
fn count(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    if args.len() == 1 {
        return Ok(match &args[0] {
            Value::Array(a) => Value::from(a.len()),
            v => Value::from(v.to_af_string().matches(',').count() + 1),
        });
    }
    let needle = string_arg(args, 0);
    let haystack = string_arg(args, 1);
    if needle.is_empty() {
        return Ok(Value::Int(0));
    }
    Ok(Value::from(haystack.matches(needle.as_str()).count()))
}

fn substr(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0);
    let n = char_len(&s) as i64;
    let mut start = int_arg(args, 1).unwrap_or(0);
    if start < 0 {
        start = (n + start).max(0);
    }
    if start >= n {
        return Ok(Value::from(""));
    }
    let end = match int_arg(args, 2) {
        None => n,
        Some(len) if len < 0 => n + len,
        Some(len) => start.saturating_add(len).min(n),
    };
    if end <= start {
        return Ok(Value::from(""));
    }
    let (from, to) = (
        char_to_byte(&s, start as usize),
        char_to_byte(&s, end as usize),
    );
    Ok(Value::from(&s[from..to]))
}

// Character index of the first occurrence at or after the offset; -1 when absent.
fn strpos(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    let haystack = string_arg(args, 0);
    let needle = string_arg(args, 1);
    if needle.is_empty() {
        return Ok(Value::Int(-1));
    }
    let n = char_len(&haystack) as i64;
    let mut offset = int_arg(args, 2).unwrap_or(0);
    if offset < 0 {
        offset += n;
    }
    if offset < 0 || offset > n {
        return Ok(Value::Int(-1));
    }
    let from = char_to_byte(&haystack, offset as usize);
    Ok(match haystack[from..].find(needle.as_str()) {
        Some(b) => Value::from(offset + char_len(&haystack[from..from + b]) as i64),
        None => Value::Int(-1),
    })
}

fn str_replace(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    let subject = string_arg(args, 0);
    let search = string_arg(args, 1);
    if search.is_empty() {
        return Ok(Value::from(subject));
    }
    Ok(Value::from(subject.replace(&search, &string_arg(args, 2))))
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(num) = entity.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => return None,
    })
}

// Decodes HTML character references; unknown references are left alone.
fn sanitize(_: &mut RegexCache, _: &Span, _: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    let s = string_arg(args, 0);
    let mut out = String::with_capacity(s.len());
    let mut rest = s.as_str();
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        match tail.find(';') {
            Some(semi) if semi <= 10 => match decode_entity(&tail[..semi]) {
                Some(c) => {
                    out.push(c);
                    rest = &tail[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = tail;
                }
            },
            _ => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    Ok(Value::from(out))
}
