// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::net::IpAddr;

use crate::ast::{Expr, Ref};
use crate::builtins::regex::RegexCache;
use crate::builtins::utils::string_arg;
use crate::builtins::{Builtin, BuiltinFcn};
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;
use ipnet::IpNet;

pub fn register(m: &mut HashMap<&'static str, Builtin>) {
    let mut add = |name, fcn: BuiltinFcn, max| {
        m.insert(name, Builtin { fcn, min_args: 2, max_args: max });
    };
    add("ip_in_range", ip_in_range, Some(2));
    add("ip_in_ranges", ip_in_ranges, None);
}

/// A range as written by filter authors: CIDR, a single address, or
/// `start - end`.
#[derive(Debug, PartialEq)]
pub enum IpRange {
    Net(IpNet),
    Span(IpAddr, IpAddr),
}

impl IpRange {
    pub fn parse(text: &str) -> Option<IpRange> {
        let text = text.trim();
        if let Some((start, end)) = text.split_once('-') {
            let start = start.trim().parse::<IpAddr>().ok()?;
            let end = end.trim().parse::<IpAddr>().ok()?;
            return match (start, end) {
                (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                    Some(IpRange::Span(start, end))
                }
                _ => None,
            };
        }
        if text.contains('/') {
            // Host bits are allowed and ignored.
            return text.parse::<IpNet>().ok().map(|n| IpRange::Net(n.trunc()));
        }
        text.parse::<IpAddr>().ok().map(|a| IpRange::Span(a, a))
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        match self {
            IpRange::Net(net) => net.contains(ip),
            IpRange::Span(start, end) => start <= ip && ip <= end,
        }
    }
}

fn check_ranges(span: &Span, params: &[Ref<Expr>], args: &[Value]) -> Result<Value> {
    let ip = string_arg(args, 0).trim().parse::<IpAddr>().ok();
    let mut found = false;
    for (idx, range) in args.iter().enumerate().skip(1) {
        let text = range.to_af_string();
        let Some(parsed) = IpRange::parse(&text) else {
            let at = params.get(idx).map(|p| p.span()).unwrap_or(span);
            return Err(at.user_error("invalidiprange", vec![Value::from(text)]));
        };
        if ip.as_ref().is_some_and(|ip| parsed.contains(ip)) {
            found = true;
        }
    }
    Ok(Value::Bool(found))
}

fn ip_in_range(
    _: &mut RegexCache,
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
) -> Result<Value> {
    check_ranges(span, params, args)
}

fn ip_in_ranges(
    _: &mut RegexCache,
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
) -> Result<Value> {
    check_ranges(span, params, args)
}
