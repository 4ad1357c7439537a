// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::value::Value;
use crate::variables::{ComputeMethod, ReadMode, VarLookup};

use anyhow::{bail, Result};

fn var_param(vars: &mut VarLookup<'_>, params: &[Value], idx: usize) -> Result<Value> {
    match params.get(idx) {
        Some(Value::String(name)) => vars.get(name, ReadMode::Lax),
        Some(other) => bail!("lazy variable parameter {idx} must name a variable, got {other}"),
        None => bail!("lazy variable parameter {idx} is missing"),
    }
}

fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return vec![];
    }
    text.strip_suffix('\n').unwrap_or(text).split('\n').collect()
}

#[derive(Debug, PartialEq)]
enum DiffOp<'a> {
    Keep(&'a str),
    Remove(&'a str),
    Add(&'a str),
}

// Bound on the edit distance explored when splitting a region. Regions that
// differ by more are reported as fully replaced.
const MAX_DIFF_COST: usize = 1024;

// Line diff in linear space: trims the shared prefix and suffix, then splits
// the remainder at the middle snake of Myers' algorithm and recurses.
fn diff_lines<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<DiffOp<'a>> {
    let mut ops = Vec::with_capacity(old.len().max(new.len()));
    diff_region(old, new, &mut ops);
    ops
}

fn diff_region<'a>(old: &[&'a str], new: &[&'a str], ops: &mut Vec<DiffOp<'a>>) {
    let prefix = old.iter().zip(new.iter()).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    let (a, b) = (
        &old[prefix..old.len() - suffix],
        &new[prefix..new.len() - suffix],
    );

    ops.extend(old[..prefix].iter().map(|l| DiffOp::Keep(l)));
    match middle_snake(a, b) {
        Some((x, y)) if (x, y) != (0, 0) && (x, y) != (a.len(), b.len()) => {
            diff_region(&a[..x], &b[..y], ops);
            diff_region(&a[x..], &b[y..], ops);
        }
        _ => {
            ops.extend(a.iter().map(|l| DiffOp::Remove(l)));
            ops.extend(b.iter().map(|l| DiffOp::Add(l)));
        }
    }
    ops.extend(old[old.len() - suffix..].iter().map(|l| DiffOp::Keep(l)));
}

// Point where the forward and backward searches meet, or None when the
// sequences share nothing within the cost bound.
fn middle_snake(a: &[&str], b: &[&str]) -> Option<(usize, usize)> {
    let (n, m) = (a.len() as isize, b.len() as isize);
    if n == 0 || m == 0 {
        return None;
    }
    let max_d = (n + m + 1) / 2;
    let offset = max_d;
    let len = 2 * max_d + 2;
    let mut v1 = vec![-1isize; len as usize];
    let mut v2 = vec![-1isize; len as usize];
    v1[(offset + 1) as usize] = 0;
    v2[(offset + 1) as usize] = 0;
    let delta = n - m;
    let front = delta % 2 != 0;
    let (mut k1start, mut k1end, mut k2start, mut k2end) = (0, 0, 0, 0);

    for d in 0..max_d.min(MAX_DIFF_COST as isize) {
        let mut k1 = -d + k1start;
        while k1 <= d - k1end {
            let k1_offset = offset + k1;
            let mut x1 = if k1 == -d
                || (k1 != d && v1[(k1_offset - 1) as usize] < v1[(k1_offset + 1) as usize])
            {
                v1[(k1_offset + 1) as usize]
            } else {
                v1[(k1_offset - 1) as usize] + 1
            };
            let mut y1 = x1 - k1;
            while x1 < n && y1 < m && a[x1 as usize] == b[y1 as usize] {
                x1 += 1;
                y1 += 1;
            }
            v1[k1_offset as usize] = x1;
            if x1 > n {
                k1end += 2;
            } else if y1 > m {
                k1start += 2;
            } else if front {
                let k2_offset = offset + delta - k1;
                if (0..len).contains(&k2_offset) && v2[k2_offset as usize] != -1 {
                    let x2 = n - v2[k2_offset as usize];
                    if x1 >= x2 {
                        return Some((x1 as usize, y1 as usize));
                    }
                }
            }
            k1 += 2;
        }

        let mut k2 = -d + k2start;
        while k2 <= d - k2end {
            let k2_offset = offset + k2;
            let mut x2 = if k2 == -d
                || (k2 != d && v2[(k2_offset - 1) as usize] < v2[(k2_offset + 1) as usize])
            {
                v2[(k2_offset + 1) as usize]
            } else {
                v2[(k2_offset - 1) as usize] + 1
            };
            let mut y2 = x2 - k2;
            while x2 < n && y2 < m && a[(n - x2 - 1) as usize] == b[(m - y2 - 1) as usize] {
                x2 += 1;
                y2 += 1;
            }
            v2[k2_offset as usize] = x2;
            if x2 > n {
                k2end += 2;
            } else if y2 > m {
                k2start += 2;
            } else if !front {
                let k1_offset = offset + delta - k2;
                if (0..len).contains(&k1_offset) && v1[k1_offset as usize] != -1 {
                    let x1 = v1[k1_offset as usize];
                    let y1 = offset + x1 - k1_offset;
                    if x1 >= n - x2 {
                        return Some((x1 as usize, y1 as usize));
                    }
                }
            }
            k2 += 2;
        }
    }
    None
}

/// Unified style diff listing only changed lines, one hunk header per run.
pub fn unified_diff(old: &str, new: &str) -> String {
    let ops = diff_lines(&split_lines(old), &split_lines(new));
    let mut out = String::new();
    let (mut old_line, mut new_line) = (1usize, 1usize);
    let mut idx = 0;
    while idx < ops.len() {
        if let DiffOp::Keep(_) = ops[idx] {
            old_line += 1;
            new_line += 1;
            idx += 1;
            continue;
        }
        let run_end = ops[idx..]
            .iter()
            .position(|op| matches!(op, DiffOp::Keep(_)))
            .map(|p| idx + p)
            .unwrap_or(ops.len());
        let run = &ops[idx..run_end];
        let removed = run.iter().filter(|op| matches!(op, DiffOp::Remove(_))).count();
        let added = run.len() - removed;
        out.push_str(&format!("@@ -{old_line},{removed} +{new_line},{added} @@\n"));
        for op in run {
            match op {
                DiffOp::Remove(l) => out.push_str(&format!("-{l}\n")),
                DiffOp::Add(l) => out.push_str(&format!("+{l}\n")),
                DiffOp::Keep(_) => (),
            }
        }
        old_line += removed;
        new_line += added;
        idx = run_end;
    }
    out
}

fn diff_side(diff: &str, marker: char) -> Vec<Value> {
    diff.lines()
        .filter(|l| !l.starts_with("@@"))
        .filter_map(|l| l.strip_prefix(marker))
        .map(Value::from)
        .collect()
}

fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => (),
        }
    }
    out
}

fn as_string_list(v: &Value) -> Vec<String> {
    match v {
        Value::Array(a) => a.iter().map(|x| x.to_af_string()).collect(),
        Value::Undefined | Value::Null => vec![],
        other => vec![other.to_af_string()],
    }
}

fn link_difference(minuend: &Value, subtrahend: &Value) -> Value {
    let remove = as_string_list(subtrahend);
    Value::from(
        as_string_list(minuend)
            .into_iter()
            .filter(|l| !remove.contains(l))
            .collect::<Vec<_>>(),
    )
}

pub fn compute(vars: &mut VarLookup<'_>, method: &ComputeMethod, params: &[Value]) -> Result<Value> {
    Ok(match method {
        ComputeMethod::Diff => {
            let old = var_param(vars, params, 0)?.to_af_string();
            let new = var_param(vars, params, 1)?.to_af_string();
            Value::from(unified_diff(&old, &new))
        }
        ComputeMethod::DiffSplit => {
            let diff = var_param(vars, params, 0)?.to_af_string();
            let marker = match params.get(1).map(|p| p.to_af_string()).as_deref() {
                Some("removed") => '-',
                _ => '+',
            };
            Value::from(diff_side(&diff, marker))
        }
        ComputeMethod::Length => {
            let v = var_param(vars, params, 0)?;
            Value::from(v.to_af_string().chars().count())
        }
        ComputeMethod::SubtractInt => {
            let a = var_param(vars, params, 0)?.to_int();
            let b = var_param(vars, params, 1)?.to_int();
            Value::Int(a.saturating_sub(b))
        }
        ComputeMethod::LinkDiffAdded => {
            let old = var_param(vars, params, 0)?;
            let new = var_param(vars, params, 1)?;
            link_difference(&new, &old)
        }
        ComputeMethod::LinkDiffRemoved => {
            let old = var_param(vars, params, 0)?;
            let new = var_param(vars, params, 1)?;
            link_difference(&old, &new)
        }
        ComputeMethod::StripHtml => {
            Value::from(strip_html(&var_param(vars, params, 0)?.to_af_string()))
        }
        ComputeMethod::LinesOf => {
            let text = var_param(vars, params, 0)?.to_af_string();
            Value::from(split_lines(&text))
        }
        other => bail!("{other:?} is not computed by the core"),
    })
}
