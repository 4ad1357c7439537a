// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::builtins::locals::SETTERS;
use crate::builtins::regex::RegexCache;
use crate::builtins::{self};
use crate::error::{UserVisibleError, UserVisibleWarning};
use crate::lexer::{Source, Span};
use crate::parser;
use crate::value::Value;
use crate::variables::keywords;

use std::collections::BTreeMap;

use anyhow::Result;

/// Outcome of a syntax check. `error` is the first problem found, if any.
#[derive(Debug, Clone, Default)]
pub struct SyntaxResult {
    pub error: Option<UserVisibleError>,
    pub warnings: Vec<UserVisibleWarning>,
}

impl SyntaxResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
struct Local {
    pos: usize,
    used: bool,
}

/// Static checks over a parsed rule, without evaluating anything.
///
/// Every branch is visited, in evaluation order, so a local must be assigned
/// textually before it is read.
pub struct Analyzer {
    locals: BTreeMap<String, Local>,
    warnings: Vec<UserVisibleWarning>,
    regex: RegexCache,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            locals: BTreeMap::new(),
            warnings: vec![],
            regex: RegexCache::new(16),
        }
    }

    pub fn analyze(mut self, rule: &Rule) -> Result<Vec<UserVisibleWarning>> {
        self.visit(&rule.root)?;
        for (name, local) in &self.locals {
            if !local.used {
                self.warnings.push(UserVisibleWarning::new(
                    "unused-variable",
                    local.pos,
                    vec![Value::from(name.as_str())],
                ));
            }
        }
        self.warnings.sort_by_key(|w| w.position);
        Ok(self.warnings)
    }

    fn warn(&mut self, span: &Span, message_id: &'static str, params: Vec<Value>) {
        self.warnings
            .push(UserVisibleWarning::new(message_id, span.pos, params));
    }

    fn visit(&mut self, expr: &Ref<Expr>) -> Result<()> {
        match expr.as_ref() {
            Expr::Literal { .. } => Ok(()),
            Expr::Var { span, name } => self.visit_var(span, name),
            Expr::Array { items, .. } => self.visit_all(items),
            Expr::Unary { expr, .. } => self.visit(expr),
            Expr::Arith { lhs, rhs, .. }
            | Expr::Compare { lhs, rhs, .. }
            | Expr::Logic { lhs, rhs, .. } => {
                self.visit(lhs)?;
                self.visit(rhs)
            }
            Expr::Keyword { op, lhs, rhs, .. } => {
                self.visit(lhs)?;
                self.visit(rhs)?;
                if op.is_regex() {
                    self.check_regex(rhs, *op == KeywordOp::Irlike)?;
                }
                Ok(())
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
                ..
            } => {
                self.visit(cond)?;
                self.visit(then)?;
                match otherwise {
                    Some(e) => self.visit(e),
                    None => Ok(()),
                }
            }
            Expr::Call { span, name, args } => self.visit_call(span, name, args),
            Expr::Index { expr, index, .. } => {
                self.visit(expr)?;
                self.visit(index)
            }
            Expr::Assign { span, name, value } => {
                self.visit(value)?;
                self.assign(span, name)
            }
            Expr::IndexAssign {
                span,
                name,
                index,
                value,
            } => {
                if keywords::is_builtin(name) {
                    return Err(span.user_error("overridebuiltin", vec![Value::from(name.as_str())]));
                }
                if !self.locals.contains_key(name) {
                    return Err(span.user_error("unrecognisedvar", vec![Value::from(name.as_str())]));
                }
                if let Some(index) = index {
                    self.visit(index)?;
                }
                self.visit(value)
            }
            Expr::Sequence { stmts, .. } => self.visit_all(stmts),
        }
    }

    fn visit_all(&mut self, exprs: &[Ref<Expr>]) -> Result<()> {
        for e in exprs {
            self.visit(e)?;
        }
        Ok(())
    }

    fn visit_var(&mut self, span: &Span, name: &str) -> Result<()> {
        if let Some(local) = self.locals.get_mut(name) {
            local.used = true;
            return Ok(());
        }
        if keywords::is_disabled(name) {
            return Err(span.user_error("disabledvar", vec![Value::from(name)]));
        }
        if let Some(replacement) = keywords::deprecated_replacement(name) {
            self.warn(
                span,
                "deprecated-variable",
                vec![Value::from(name), Value::from(replacement)],
            );
            return Ok(());
        }
        if !keywords::is_builtin(name) {
            return Err(span.user_error("unrecognisedvar", vec![Value::from(name)]));
        }
        Ok(())
    }

    fn assign(&mut self, span: &Span, name: &str) -> Result<()> {
        if keywords::is_builtin(name) {
            return Err(span.user_error("overridebuiltin", vec![Value::from(name)]));
        }
        self.locals.entry(name.to_string()).or_insert(Local {
            pos: span.pos,
            used: false,
        });
        Ok(())
    }

    fn visit_call(&mut self, span: &Span, name: &str, args: &[Ref<Expr>]) -> Result<()> {
        builtins::lookup(span, name, args.len())?;

        if SETTERS.contains(&name) {
            let Some(var) = args[0].as_string_literal() else {
                return Err(args[0].span().user_error("variablevariable", vec![]));
            };
            let var = var.to_ascii_lowercase();
            self.visit(&args[1])?;
            return self.assign(args[0].span(), &var);
        }

        self.visit_all(args)?;
        let pattern = match name {
            "rcount" if args.len() == 2 => Some(&args[0]),
            "get_matches" => Some(&args[0]),
            "str_replace_regexp" => Some(&args[1]),
            _ => None,
        };
        if let Some(pattern) = pattern {
            self.check_regex(pattern, false)?;
        }
        Ok(())
    }

    // Only literal patterns can be checked ahead of evaluation.
    fn check_regex(&mut self, pattern: &Ref<Expr>, insensitive: bool) -> Result<()> {
        let Some(text) = pattern.as_string_literal() else {
            return Ok(());
        };
        let re = self.regex.get(pattern.span(), text, insensitive)?;
        if re.is_match("") {
            self.warn(pattern.span(), "match-empty-regex", vec![Value::from(text)]);
        }
        Ok(())
    }
}

/// Parses and statically checks `text`.
///
/// Problems in the filter are reported through the result; only internal
/// failures are returned as errors.
pub fn check_syntax(text: &str) -> Result<SyntaxResult> {
    let source = Source::from_contents("<filter>".to_string(), text.to_string())?;
    let outcome = parser::parse(&source).and_then(|rule| Analyzer::new().analyze(&rule));
    match outcome {
        Ok(warnings) => Ok(SyntaxResult {
            error: None,
            warnings,
        }),
        Err(e) => match e.downcast_ref::<UserVisibleError>() {
            Some(user) => Ok(SyntaxResult {
                error: Some(user.clone()),
                warnings: vec![],
            }),
            None => Err(e),
        },
    }
}
