// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::lexer::*;
use crate::value::Value;

use anyhow::Result;

/// Recursive descent parser for rule text.
///
/// Precedence, lowest first: statements, assignment, conditional, `|` `^`,
/// `&`, equality, relational, additive, multiplicative, `**`, unary and
/// keyword operators, postfix.
pub struct Parser {
    source: Source,
    tokens: Vec<Token>,
    idx: usize,
    end: u32,
}

impl Parser {
    pub fn new(source: &Source) -> Result<Self> {
        let tokens = tokenize(source)?;
        Ok(Self {
            source: source.clone(),
            tokens,
            idx: 0,
            end: 0,
        })
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    fn tok(&self) -> &Token {
        // tokenize always ends with Eof, and idx never moves past it.
        &self.tokens[self.idx.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.idx + n)
            .map(|t| t.0)
            .unwrap_or(TokenKind::Eof)
    }

    fn next_token(&mut self) {
        if self.tok().0 != TokenKind::Eof {
            self.end = self.tok().1.end;
            self.idx += 1;
        }
    }

    fn span_from(&self, start: &Span) -> Span {
        let mut span = start.clone();
        span.end = self.end.max(start.end);
        span
    }

    fn unexpected(&self) -> anyhow::Error {
        let tok = self.tok();
        tok.1.user_error(
            "unexpectedtoken",
            vec![Value::from(tok.0.name()), Value::from(tok.text())],
        )
    }

    fn expect_kind(&mut self, kind: TokenKind, text: &str) -> Result<()> {
        if self.tok().0 == kind {
            self.next_token();
            return Ok(());
        }
        Err(self.expected_not_found(kind.name(), text))
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<()> {
        if self.tok().is_keyword(kw) {
            self.next_token();
            return Ok(());
        }
        Err(self.expected_not_found(TokenKind::Keyword.name(), kw))
    }

    fn expect_op(&mut self, op: &str) -> Result<()> {
        if self.tok().is_op(op) {
            self.next_token();
            return Ok(());
        }
        Err(self.expected_not_found(TokenKind::Operator.name(), op))
    }

    fn expected_not_found(&self, kind: &str, text: &str) -> anyhow::Error {
        let tok = self.tok();
        tok.1.user_error(
            "expectednotfound",
            vec![
                Value::from(kind),
                Value::from(text),
                Value::from(tok.0.name()),
                Value::from(tok.text()),
            ],
        )
    }

    /// Parses a whole rule.
    pub fn parse(&mut self) -> Result<Rule> {
        let root = self.parse_statements(TokenKind::Eof)?;
        if self.tok().0 != TokenKind::Eof {
            let tok = self.tok();
            return Err(tok.1.user_error(
                "unexpectedatend",
                vec![Value::from(tok.0.name()), Value::from(tok.text())],
            ));
        }
        Ok(Rule { root })
    }

    // Statement list up to (not including) `terminator`.
    fn parse_statements(&mut self, terminator: TokenKind) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        let mut stmts = vec![];
        loop {
            match self.tok().0 {
                TokenKind::Semicolon => {
                    self.next_token();
                    continue;
                }
                k if k == terminator => break,
                TokenKind::Eof => break,
                _ => (),
            }
            stmts.push(self.parse_assignment()?);
            match self.tok().0 {
                TokenKind::Semicolon => self.next_token(),
                _ => break,
            }
        }

        if stmts.len() == 1 {
            return Ok(stmts.remove(0));
        }
        Ok(Ref::new(Expr::Sequence {
            span: self.span_from(&start),
            stmts,
        }))
    }

    fn parse_assignment(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        if self.tok().0 == TokenKind::Identifier {
            let name = self.tok().text().to_ascii_lowercase();
            match self.peek_kind(1) {
                TokenKind::Operator if self.tokens[self.idx + 1].is_op(":=") => {
                    self.next_token();
                    self.next_token();
                    let value = self.parse_assignment()?;
                    return Ok(Ref::new(Expr::Assign {
                        span: self.span_from(&start),
                        name,
                        value,
                    }));
                }
                TokenKind::LBracket => {
                    if let Some(expr) = self.try_parse_index_assignment(&start, name)? {
                        return Ok(expr);
                    }
                }
                _ => (),
            }
        }
        self.parse_conditional()
    }

    // `x[i] := v` or `x[] := v`. Restores the position and yields None when the
    // bracket is an ordinary index expression.
    fn try_parse_index_assignment(
        &mut self,
        start: &Span,
        name: String,
    ) -> Result<Option<Ref<Expr>>> {
        let (saved_idx, saved_end) = (self.idx, self.end);
        self.next_token();
        self.next_token();

        let index = if self.tok().0 == TokenKind::RBracket {
            None
        } else {
            match self.parse_assignment() {
                Ok(e) => Some(e),
                Err(_) => {
                    (self.idx, self.end) = (saved_idx, saved_end);
                    return Ok(None);
                }
            }
        };

        if self.tok().0 == TokenKind::RBracket
            && self
                .tokens
                .get(self.idx + 1)
                .is_some_and(|t| t.is_op(":="))
        {
            self.next_token();
            self.next_token();
            let value = self.parse_assignment()?;
            return Ok(Some(Ref::new(Expr::IndexAssign {
                span: self.span_from(start),
                name,
                index,
                value,
            })));
        }

        (self.idx, self.end) = (saved_idx, saved_end);
        Ok(None)
    }

    fn parse_conditional(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        if self.tok().is_keyword("if") {
            self.next_token();
            let cond = self.parse_or()?;
            self.expect_keyword("then")?;
            let then = self.parse_assignment()?;
            let otherwise = if self.tok().is_keyword("else") {
                self.next_token();
                Some(self.parse_assignment()?)
            } else {
                None
            };
            self.expect_keyword("end")?;
            return Ok(Ref::new(Expr::Conditional {
                span: self.span_from(&start),
                cond,
                then,
                otherwise,
            }));
        }

        let cond = self.parse_or()?;
        if !self.tok().is_op("?") {
            return Ok(cond);
        }
        self.next_token();
        let then = self.parse_conditional()?;
        self.expect_op(":")?;
        let otherwise = self.parse_conditional()?;
        Ok(Ref::new(Expr::Conditional {
            span: self.span_from(&start),
            cond,
            then,
            otherwise: Some(otherwise),
        }))
    }

    fn parse_or(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        let mut expr = self.parse_and()?;
        loop {
            let op = match self.tok() {
                t if t.is_op("|") => LogicOp::Or,
                t if t.is_op("^") => LogicOp::Xor,
                _ => return Ok(expr),
            };
            self.next_token();
            let rhs = self.parse_and()?;
            expr = Ref::new(Expr::Logic {
                span: self.span_from(&start),
                op,
                lhs: expr,
                rhs,
            });
        }
    }

    fn parse_and(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        let mut expr = self.parse_equality()?;
        while self.tok().is_op("&") {
            self.next_token();
            let rhs = self.parse_equality()?;
            expr = Ref::new(Expr::Logic {
                span: self.span_from(&start),
                op: LogicOp::And,
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        let mut expr = self.parse_relational()?;
        loop {
            let op = match self.tok() {
                t if t.is_op("==") || t.is_op("=") => BoolOp::Eq,
                t if t.is_op("!=") => BoolOp::Ne,
                t if t.is_op("===") => BoolOp::StrictEq,
                t if t.is_op("!==") => BoolOp::StrictNe,
                _ => return Ok(expr),
            };
            self.next_token();
            let rhs = self.parse_relational()?;
            expr = Ref::new(Expr::Compare {
                span: self.span_from(&start),
                op,
                lhs: expr,
                rhs,
            });
        }
    }

    fn parse_relational(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        let mut expr = self.parse_additive()?;
        loop {
            let op = match self.tok() {
                t if t.is_op("<") => BoolOp::Lt,
                t if t.is_op("<=") => BoolOp::Le,
                t if t.is_op(">") => BoolOp::Gt,
                t if t.is_op(">=") => BoolOp::Ge,
                _ => return Ok(expr),
            };
            self.next_token();
            let rhs = self.parse_additive()?;
            expr = Ref::new(Expr::Compare {
                span: self.span_from(&start),
                op,
                lhs: expr,
                rhs,
            });
        }
    }

    fn parse_additive(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.tok() {
                t if t.is_op("+") => ArithOp::Add,
                t if t.is_op("-") => ArithOp::Sub,
                _ => return Ok(expr),
            };
            self.next_token();
            let rhs = self.parse_multiplicative()?;
            expr = Ref::new(Expr::Arith {
                span: self.span_from(&start),
                op,
                lhs: expr,
                rhs,
            });
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        let mut expr = self.parse_power()?;
        loop {
            let op = match self.tok() {
                t if t.is_op("*") => ArithOp::Mul,
                t if t.is_op("/") => ArithOp::Div,
                t if t.is_op("%") => ArithOp::Mod,
                _ => return Ok(expr),
            };
            self.next_token();
            let rhs = self.parse_power()?;
            expr = Ref::new(Expr::Arith {
                span: self.span_from(&start),
                op,
                lhs: expr,
                rhs,
            });
        }
    }

    fn parse_power(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        let mut expr = self.parse_unary()?;
        while self.tok().is_op("**") {
            self.next_token();
            let rhs = self.parse_unary()?;
            expr = Ref::new(Expr::Arith {
                span: self.span_from(&start),
                op: ArithOp::Pow,
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        if self.tok().is_op("!") {
            self.next_token();
            let expr = self.parse_unary()?;
            return Ok(Ref::new(Expr::Unary {
                span: self.span_from(&start),
                op: UnaryOp::Not,
                expr,
            }));
        }
        self.parse_keyword_op()
    }

    fn parse_keyword_op(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        let lhs = self.parse_sign()?;
        let op = match self.tok().0 {
            TokenKind::Keyword => KeywordOp::from_keyword(&self.tok().text()),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(lhs);
        };
        self.next_token();
        let rhs = self.parse_sign()?;
        Ok(Ref::new(Expr::Keyword {
            span: self.span_from(&start),
            op,
            lhs,
            rhs,
        }))
    }

    fn parse_sign(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        let op = match self.tok() {
            t if t.is_op("-") => UnaryOp::Neg,
            t if t.is_op("+") => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.next_token();
        let expr = self.parse_sign()?;
        Ok(Ref::new(Expr::Unary {
            span: self.span_from(&start),
            op,
            expr,
        }))
    }

    fn parse_postfix(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        let mut expr = self.parse_primary()?;
        while self.tok().0 == TokenKind::LBracket {
            self.next_token();
            let index = self.parse_assignment()?;
            self.expect_kind(TokenKind::RBracket, "]")?;
            expr = Ref::new(Expr::Index {
                span: self.span_from(&start),
                expr,
                index,
            });
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Ref<Expr>> {
        let tok = self.tok().clone();
        let span = tok.1.clone();
        match tok.0 {
            TokenKind::IntLiteral | TokenKind::FloatLiteral | TokenKind::StringLiteral => {
                self.next_token();
                Ok(Ref::new(Expr::Literal { span, value: tok.2 }))
            }
            TokenKind::Keyword => {
                let value = match tok.text().as_str() {
                    "true" => Value::Bool(true),
                    "false" => Value::Bool(false),
                    "null" => Value::Null,
                    _ if KeywordOp::from_keyword(&tok.text()).is_some() => {
                        return Err(self.unexpected())
                    }
                    kw => {
                        return Err(span.user_error("unrecognisedkeyword", vec![Value::from(kw)]))
                    }
                };
                self.next_token();
                Ok(Ref::new(Expr::Literal { span, value }))
            }
            TokenKind::Identifier if self.peek_kind(1) == TokenKind::LParen => self.parse_call(),
            TokenKind::Identifier => {
                self.next_token();
                Ok(Ref::new(Expr::Var {
                    span,
                    name: tok.text().to_ascii_lowercase(),
                }))
            }
            TokenKind::LParen => {
                self.next_token();
                if self.tok().0 == TokenKind::RParen {
                    return Err(self.unexpected());
                }
                let expr = self.parse_statements(TokenKind::RParen)?;
                self.expect_kind(TokenKind::RParen, ")")?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_call(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        let name = self.tok().text().to_ascii_lowercase();
        self.next_token();
        self.next_token();

        let mut args = vec![];
        if self.tok().0 != TokenKind::RParen {
            loop {
                args.push(self.parse_assignment()?);
                if self.tok().0 != TokenKind::Comma {
                    break;
                }
                self.next_token();
            }
        }
        self.expect_kind(TokenKind::RParen, ")")?;
        Ok(Ref::new(Expr::Call {
            span: self.span_from(&start),
            name,
            args,
        }))
    }

    fn parse_array(&mut self) -> Result<Ref<Expr>> {
        let start = self.tok().1.clone();
        self.next_token();
        let mut items = vec![];
        if self.tok().0 != TokenKind::RBracket {
            loop {
                items.push(self.parse_assignment()?);
                if self.tok().0 != TokenKind::Comma {
                    break;
                }
                self.next_token();
            }
        }
        self.expect_kind(TokenKind::RBracket, "]")?;
        Ok(Ref::new(Expr::Array {
            span: self.span_from(&start),
            items,
        }))
    }
}

/// Parses a rule held in `source`.
pub fn parse(source: &Source) -> Result<Rule> {
    Parser::new(source)?.parse()
}
