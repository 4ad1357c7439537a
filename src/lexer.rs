// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::UserVisibleError;
use crate::value::Value;

use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;
use std::rc::Rc;

use anyhow::{bail, Result};

/// Keywords of the language. Matched case-insensitively.
pub const KEYWORDS: &[&str] = &[
    "in", "like", "matches", "contains", "rlike", "irlike", "regex", "true", "false", "null",
    "if", "then", "else", "end",
];

// Longest first within each length class.
const OPERATORS_3: &[&str] = &["!==", "==="];
const OPERATORS_2: &[&str] = &["!=", "**", ":=", "<=", ">=", "=="];
const OPERATORS_1: &[char] = &[
    '!', '*', '/', '+', '-', '%', '&', '|', '^', '?', ':', '<', '>', '=',
];

#[derive(Clone)]
struct SourceInternal {
    pub file: String,
    pub contents: String,
    pub lines: Vec<(u32, u32)>,
}

/// Rule text together with its line table.
#[derive(Clone)]
pub struct Source {
    src: Rc<SourceInternal>,
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.src.file.fmt(f)
    }
}

impl Source {
    pub fn from_contents(file: String, contents: String) -> Result<Source> {
        let max_size = u32::MAX as usize - 2;
        if contents.len() > max_size {
            bail!("{file} exceeds maximum allowed rule size {max_size}");
        }
        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0u32;
        let mut start = 0u32;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i as u32,
                };
                lines.push((start, end));
                start = i as u32 + 1;
            }
            prev_ch = ch;
            prev_pos = i as u32;
        }

        if (start as usize) < contents.len() {
            lines.push((start, contents.len() as u32));
        } else if contents.is_empty() {
            lines.push((0, 0));
        } else {
            let s = contents.len() as u32;
            lines.push((s, s));
        }
        Ok(Self {
            src: Rc::new(SourceInternal {
                file,
                contents,
                lines,
            }),
        })
    }

    pub fn file(&self) -> &String {
        &self.src.file
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }

    pub fn line(&self, idx: u32) -> &str {
        let idx = idx as usize;
        if idx < self.src.lines.len() {
            let (start, end) = self.src.lines[idx];
            &self.src.contents[start as usize..end as usize]
        } else {
            ""
        }
    }

    /// Caret snippet pointing at `line`:`col` (both 1-based).
    pub fn snippet(&self, line: u32, col: u32) -> String {
        if line == 0 || line as usize > self.src.lines.len() {
            return format!("\n--> {}: invalid line {} specified", self.src.file, line);
        }

        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = col.max(1) as usize - 1;

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
		{:<line_num_width$}| {}\n\
		{:<line_num_width$}| {:<col_spaces$}^",
            self.src.file,
            line,
            col,
            "",
            line,
            self.line(line - 1),
            "",
            "",
        )
    }

    pub fn user_error(
        &self,
        line: u32,
        col: u32,
        pos: usize,
        message_id: &'static str,
        params: Vec<Value>,
    ) -> anyhow::Error {
        UserVisibleError::new(message_id, pos, params)
            .with_rendered(self.snippet(line, col))
            .into()
    }
}

#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    /// Byte offsets into the rule text.
    pub start: u32,
    pub end: u32,
    /// 0-based character offset of `start`.
    pub pos: usize,
}

impl Span {
    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn user_error(&self, message_id: &'static str, params: Vec<Value>) -> anyhow::Error {
        self.source
            .user_error(self.line, self.col, self.pos, message_id, params)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let t = self.text().escape_debug().to_string();
        let max = 32;
        let (txt, trailer) = if t.chars().count() > max {
            (t.chars().take(max).collect::<String>(), "...")
        } else {
            (t, "")
        };

        f.write_fmt(format_args!(
            "{}:{}:{}:{}, \"{}{}\"",
            self.line, self.col, self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Operator,
    StringLiteral,
    IntLiteral,
    FloatLiteral,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Eof,
}

impl TokenKind {
    /// Name used in user-facing messages.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Keyword => "keyword",
            TokenKind::Operator => "operator",
            TokenKind::StringLiteral => "string",
            TokenKind::IntLiteral => "integer",
            TokenKind::FloatLiteral => "float",
            TokenKind::LParen | TokenKind::RParen => "parenthesis",
            TokenKind::LBracket | TokenKind::RBracket => "square bracket",
            TokenKind::Comma => "comma",
            TokenKind::Semicolon => "statement separator",
            TokenKind::Eof => "end of input",
        }
    }
}

/// A token, its location and, for literals, its decoded value.
#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span, pub Value);

impl Token {
    /// Text of the token; keywords are lower-cased.
    pub fn text(&self) -> String {
        match self.0 {
            TokenKind::Keyword => self.1.text().to_ascii_lowercase(),
            _ => self.1.text().to_string(),
        }
    }

    pub fn is_op(&self, op: &str) -> bool {
        self.0 == TokenKind::Operator && self.1.text() == op
    }

    pub fn is_keyword(&self, kw: &str) -> bool {
        self.0 == TokenKind::Keyword && self.1.text().eq_ignore_ascii_case(kw)
    }
}

#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
    line: u32,
    col: u32,
    pos: usize,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            iter: source.contents().char_indices().peekable(),
            line: 1,
            col: 1,
            pos: 0,
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn at_end(&mut self) -> bool {
        self.iter.peek().is_none()
    }

    fn bump(&mut self) -> char {
        match self.iter.next() {
            Some((_, '\n')) => {
                self.line += 1;
                self.col = 1;
                self.pos += 1;
                '\n'
            }
            Some((_, ch)) => {
                self.col += 1;
                self.pos += 1;
                ch
            }
            None => '\x00',
        }
    }

    fn span_from(&mut self, start: usize, line: u32, col: u32, pos: usize) -> Span {
        Span {
            source: self.source.clone(),
            line,
            col,
            start: start as u32,
            end: self.peek().0 as u32,
            pos,
        }
    }

    fn skip_ws(&mut self) -> Result<()> {
        loop {
            let ch = self.peek().1;
            if ch.is_whitespace() && !self.at_end() {
                self.bump();
            } else if ch == '/' && self.peekahead(1).1 == '*' {
                let (line, col, pos) = (self.line, self.col, self.pos);
                self.bump();
                self.bump();
                loop {
                    if self.at_end() {
                        return Err(self.source.user_error(line, col, pos, "unclosedcomment", vec![]));
                    }
                    if self.peek().1 == '*' && self.peekahead(1).1 == '/' {
                        self.bump();
                        self.bump();
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    // Scans `[0-9A-Fa-f]+(\.\d*)?|\.\d+` with an optional radix suffix. Returns
    // the number of chars consumed and the value, or None when the text does
    // not form a valid number and should be read as an identifier.
    fn scan_number(&self) -> Option<(usize, Value)> {
        let chars: Vec<char> = self.iter.clone().map(|(_, c)| c).take(512).collect();
        let mut i = 0;
        while i < chars.len() && chars[i].is_ascii_hexdigit() {
            i += 1;
        }
        let int_len = i;
        let mut has_dot = false;
        if i < chars.len() && chars[i] == '.' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            if int_len > 0 || j > i + 1 {
                has_dot = true;
                i = j;
            }
        }
        if i == 0 {
            return None;
        }
        let body: String = chars[..i].iter().collect();

        let mut base = 10;
        let mut len = i;
        if let Some(suffix) = chars.get(i) {
            let b = match suffix {
                'b' => 2,
                'o' => 8,
                'x' => 16,
                _ => 10,
            };
            if b != 10 {
                base = b;
                len += 1;
            }
        }
        if chars.get(len).is_some_and(|c| c.is_ascii_lowercase()) {
            return None;
        }
        // A trailing `b` is a hex digit and a binary suffix at once.
        let mut body = body;
        if base == 10
            && !has_dot
            && body.len() > 1
            && body.ends_with('b')
            && !body.chars().all(|c| c.is_ascii_digit())
        {
            body.pop();
            base = 2;
        }

        if has_dot {
            if base != 10 {
                return None;
            }
            let text = if body.starts_with('.') {
                format!("0{body}")
            } else {
                body
            };
            return text.parse::<f64>().ok().map(|f| (len, Value::Float(f)));
        }

        if !body.chars().all(|c| c.is_digit(base)) {
            return None;
        }
        let value = match i64::from_str_radix(&body, base) {
            Ok(n) => Value::Int(n),
            // Out of range integers become floats.
            Err(_) => Value::Float(
                body.chars()
                    .filter_map(|c| c.to_digit(base))
                    .fold(0.0, |acc, d| acc * base as f64 + d as f64),
            ),
        };
        Some((len, value))
    }

    fn read_number(&mut self, len: usize, value: Value) -> Token {
        let (start, _) = self.peek();
        let (line, col, pos) = (self.line, self.col, self.pos);
        for _ in 0..len {
            self.bump();
        }
        let kind = match value {
            Value::Float(_) => TokenKind::FloatLiteral,
            _ => TokenKind::IntLiteral,
        };
        Token(kind, self.span_from(start, line, col, pos), value)
    }

    fn read_ident(&mut self) -> Token {
        let (start, _) = self.peek();
        let (line, col, pos) = (self.line, self.col, self.pos);
        while {
            let ch = self.peek().1;
            ch.is_ascii_alphanumeric() || ch == '_'
        } {
            self.bump();
        }
        let span = self.span_from(start, line, col, pos);
        let lower = span.text().to_ascii_lowercase();
        let kind = if KEYWORDS.contains(&lower.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        Token(kind, span, Value::Undefined)
    }

    fn read_string(&mut self) -> Result<Token> {
        let (start, quote) = self.peek();
        let (line, col, pos) = (self.line, self.col, self.pos);
        self.bump();
        let mut text = String::new();
        loop {
            if self.at_end() {
                return Err(self.source.user_error(line, col, pos, "unclosedstring", vec![]));
            }
            let ch = self.peek().1;
            if ch == quote {
                self.bump();
                break;
            }
            if ch != '\\' {
                text.push(self.bump());
                continue;
            }

            let (esc_line, esc_col, esc_pos) = (self.line, self.col, self.pos);
            self.bump();
            if self.at_end() {
                return Err(self.source.user_error(line, col, pos, "unclosedstring", vec![]));
            }
            match self.bump() {
                '\\' => text.push('\\'),
                'n' => text.push('\n'),
                'r' => text.push('\r'),
                't' => text.push('\t'),
                '"' => text.push('"'),
                '\'' => text.push('\''),
                'x' => {
                    let (h1, h2) = (self.peek().1, self.peekahead(1).1);
                    let decoded = match (h1.to_digit(16), h2.to_digit(16)) {
                        (Some(a), Some(b)) => char::from_u32(a * 16 + b),
                        _ => None,
                    };
                    match decoded {
                        Some(c) => {
                            self.bump();
                            self.bump();
                            text.push(c);
                        }
                        None => {
                            return Err(self.source.user_error(
                                esc_line,
                                esc_col,
                                esc_pos,
                                "invalidescape",
                                vec![Value::from("\\x")],
                            ))
                        }
                    }
                }
                other => {
                    text.push('\\');
                    text.push(other);
                }
            }
        }
        let span = self.span_from(start, line, col, pos);
        Ok(Token(TokenKind::StringLiteral, span, Value::from(text)))
    }

    fn read_operator(&mut self) -> Option<Token> {
        let (start, c0) = self.peek();
        let c1 = self.peekahead(1).1;
        let c2 = self.peekahead(2).1;
        let three: String = [c0, c1, c2].iter().collect();
        let two: String = [c0, c1].iter().collect();
        let len = if OPERATORS_3.contains(&three.as_str()) {
            3
        } else if OPERATORS_2.contains(&two.as_str()) {
            2
        } else if OPERATORS_1.contains(&c0) {
            1
        } else {
            return None;
        };
        let (line, col, pos) = (self.line, self.col, self.pos);
        for _ in 0..len {
            self.bump();
        }
        Some(Token(
            TokenKind::Operator,
            self.span_from(start, line, col, pos),
            Value::Undefined,
        ))
    }

    fn punctuation(&mut self, kind: TokenKind) -> Token {
        let (start, _) = self.peek();
        let (line, col, pos) = (self.line, self.col, self.pos);
        self.bump();
        Token(kind, self.span_from(start, line, col, pos), Value::Undefined)
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws()?;

        let (start, chr) = self.peek();
        if self.at_end() {
            let (line, col, pos) = (self.line, self.col, self.pos);
            return Ok(Token(
                TokenKind::Eof,
                self.span_from(start, line, col, pos),
                Value::Undefined,
            ));
        }

        match chr {
            '(' => Ok(self.punctuation(TokenKind::LParen)),
            ')' => Ok(self.punctuation(TokenKind::RParen)),
            '[' => Ok(self.punctuation(TokenKind::LBracket)),
            ']' => Ok(self.punctuation(TokenKind::RBracket)),
            ',' => Ok(self.punctuation(TokenKind::Comma)),
            ';' => Ok(self.punctuation(TokenKind::Semicolon)),
            '"' | '\'' => self.read_string(),
            _ => {
                if chr.is_ascii_hexdigit() || chr == '.' {
                    if let Some((len, value)) = self.scan_number() {
                        return Ok(self.read_number(len, value));
                    }
                }
                if chr.is_ascii_alphanumeric() || chr == '_' {
                    return Ok(self.read_ident());
                }
                if let Some(tok) = self.read_operator() {
                    return Ok(tok);
                }
                Err(self.source.user_error(
                    self.line,
                    self.col,
                    self.pos,
                    "unrecognisedtoken",
                    vec![Value::from(chr.to_string())],
                ))
            }
        }
    }
}

/// Eagerly tokenizes a whole rule, including the trailing `Eof` token.
pub fn tokenize(source: &Source) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = vec![];
    loop {
        let tok = lexer.next_token()?;
        let done = tok.0 == TokenKind::Eof;
        tokens.push(tok);
        if done {
            return Ok(tokens);
        }
    }
}
