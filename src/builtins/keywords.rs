// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::KeywordOp;
use crate::builtins::regex::RegexCache;
use crate::lexer::Span;
use crate::value::Value;

use anyhow::Result;
use globset::GlobBuilder;

/// Evaluates `lhs <op> rhs` for the keyword operators. `pattern_span` locates
/// the right operand for regex errors.
pub fn eval_keyword(
    cache: &mut RegexCache,
    pattern_span: &Span,
    op: KeywordOp,
    lhs: &Value,
    rhs: &Value,
) -> Result<bool> {
    let subject = lhs.to_af_string();
    let other = rhs.to_af_string();
    Ok(match op {
        KeywordOp::In => is_substring(&subject, &other),
        KeywordOp::Contains => is_substring(&other, &subject),
        KeywordOp::Like => glob_match(&other, &subject),
        KeywordOp::Rlike | KeywordOp::Irlike => {
            let re = cache.get(pattern_span, &other, op == KeywordOp::Irlike)?;
            re.is_match(&subject)
        }
    })
}

fn is_substring(needle: &str, haystack: &str) -> bool {
    !needle.is_empty() && !haystack.is_empty() && haystack.contains(needle)
}

// `*`, `?` and `[...]` over the whole subject; `*` crosses `/`.
fn glob_match(pattern: &str, subject: &str) -> bool {
    match GlobBuilder::new(pattern)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
    {
        Ok(glob) => glob.compile_matcher().is_match(subject),
        Err(_) => false,
    }
}
