// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::Span;
use crate::value::Value;

use core::{cmp, fmt, ops::Deref};
use std::rc::Rc;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
            ArithOp::Pow => "**",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BoolOp {
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

/// Operators spelled as keywords. `matches` parses as `Like`, `regex` as `Rlike`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum KeywordOp {
    In,
    Like,
    Contains,
    Rlike,
    Irlike,
}

impl KeywordOp {
    pub fn from_keyword(kw: &str) -> Option<KeywordOp> {
        Some(match kw {
            "in" => KeywordOp::In,
            "like" | "matches" => KeywordOp::Like,
            "contains" => KeywordOp::Contains,
            "rlike" | "regex" => KeywordOp::Rlike,
            "irlike" => KeywordOp::Irlike,
            _ => return None,
        })
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, KeywordOp::Rlike | KeywordOp::Irlike)
    }
}

pub struct NodeRef<T> {
    r: Rc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

// Structural equality: two parses of the same text compare equal.
impl<T: cmp::PartialEq> cmp::PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        *self.r == *other.r
    }
}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Rc::new(t) }
    }
}

pub type Ref<T> = NodeRef<T>;

// Spans compare by location only.
impl cmp::PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        (self.start, self.end, self.line, self.col) == (other.start, other.end, other.line, other.col)
    }
}

#[derive(Debug, PartialEq)]
pub enum Expr {
    Literal {
        span: Span,
        value: Value,
    },

    Var {
        span: Span,
        name: String,
    },

    Array {
        span: Span,
        items: Vec<Ref<Expr>>,
    },

    Unary {
        span: Span,
        op: UnaryOp,
        expr: Ref<Expr>,
    },

    Arith {
        span: Span,
        op: ArithOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    Compare {
        span: Span,
        op: BoolOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    Logic {
        span: Span,
        op: LogicOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    Keyword {
        span: Span,
        op: KeywordOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    // `c ? a : b` and `if c then a [else b] end`.
    Conditional {
        span: Span,
        cond: Ref<Expr>,
        then: Ref<Expr>,
        otherwise: Option<Ref<Expr>>,
    },

    Call {
        span: Span,
        name: String,
        args: Vec<Ref<Expr>>,
    },

    Index {
        span: Span,
        expr: Ref<Expr>,
        index: Ref<Expr>,
    },

    Assign {
        span: Span,
        name: String,
        value: Ref<Expr>,
    },

    // `x[i] := v`; `index` is None for `x[] := v`.
    IndexAssign {
        span: Span,
        name: String,
        index: Option<Ref<Expr>>,
        value: Ref<Expr>,
    },

    Sequence {
        span: Span,
        stmts: Vec<Ref<Expr>>,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Var { span, .. }
            | Expr::Array { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Arith { span, .. }
            | Expr::Compare { span, .. }
            | Expr::Logic { span, .. }
            | Expr::Keyword { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::Call { span, .. }
            | Expr::Index { span, .. }
            | Expr::Assign { span, .. }
            | Expr::IndexAssign { span, .. }
            | Expr::Sequence { span, .. } => span,
        }
    }

    /// Literal string value, if this node is one.
    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            Expr::Literal {
                value: Value::String(s),
                ..
            } => Some(s),
            _ => None,
        }
    }
}

/// A parsed rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub root: Ref<Expr>,
}

impl cmp::PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}
