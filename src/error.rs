// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::value::Value;

use core::fmt;

use thiserror::Error;

/// An error in a filter that its author is expected to fix.
///
/// Produced by the lexer, the parser, the syntax checker and the evaluator.
/// `position` is the 0-based character offset into the rule text; `rendered`
/// holds the caret snippet pointing at that offset. Parameters are kept in
/// their rendered string form.
#[derive(Debug, Clone, Error)]
#[error("{}{rendered}", describe(.message_id, .params))]
pub struct UserVisibleError {
    pub message_id: &'static str,
    pub position: usize,
    pub params: Vec<String>,
    pub rendered: String,
}

impl UserVisibleError {
    pub fn new(message_id: &'static str, position: usize, params: Vec<Value>) -> Self {
        Self {
            message_id,
            position,
            params: render_params(params),
            rendered: String::new(),
        }
    }

    pub fn with_rendered(mut self, rendered: String) -> Self {
        self.rendered = rendered;
        self
    }

    /// Human readable text without the source snippet.
    pub fn description(&self) -> String {
        describe(self.message_id, &self.params)
    }
}

/// A non-fatal diagnostic collected alongside a syntax check or evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct UserVisibleWarning {
    pub message_id: &'static str,
    pub position: usize,
    pub params: Vec<String>,
}

impl UserVisibleWarning {
    pub fn new(message_id: &'static str, position: usize, params: Vec<Value>) -> Self {
        Self {
            message_id,
            position,
            params: render_params(params),
        }
    }
}

impl fmt::Display for UserVisibleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at character {})",
            describe(self.message_id, &self.params),
            self.position + 1
        )
    }
}

/// Defects in the engine or in its embedding. Never shown to filter authors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("circular computation of lazy variable `{0}`")]
    CircularComputation(String),
    #[error("consequence `{0}` was executed before its disabling precheck")]
    ConsequenceNotPrechecked(&'static str),
    #[error("no computation is available for method `{0}`")]
    UnknownComputeMethod(String),
    #[error("variable `{0}` is not set")]
    UnsetVariable(String),
}

fn render_params(params: Vec<Value>) -> Vec<String> {
    params.iter().map(Value::to_af_string).collect()
}

fn param(params: &[String], idx: usize) -> String {
    params.get(idx).cloned().unwrap_or_default()
}

/// English rendering of a message id and its parameters.
pub fn describe(message_id: &str, params: &[String]) -> String {
    let p = |i| param(params, i);
    match message_id {
        "unexpectedtoken" => format!("Unexpected token \"{}\" (of type {})", p(1), p(0)),
        "unclosedstring" => "Unclosed string".to_string(),
        "unclosedcomment" => "Unclosed comment".to_string(),
        "unrecognisedtoken" => format!("Unrecognised token \"{}\"", p(0)),
        "invalidescape" => format!("Invalid escape sequence \"{}\"", p(0)),
        "expectednotfound" => format!(
            "Expected a {} {}, but found {} \"{}\"",
            p(0),
            p(1),
            p(2),
            p(3)
        ),
        "unexpectedatend" => format!("Unexpected \"{}\" at end of input", p(0)),
        "unrecognisedkeyword" => format!("Unrecognised keyword \"{}\"", p(0)),
        "unrecognisedvar" => format!("Unrecognised variable \"{}\"", p(0)),
        "disabledvar" => format!("The variable \"{}\" is no longer available", p(0)),
        "overridebuiltin" => format!("Cannot overwrite the builtin variable \"{}\"", p(0)),
        "variablevariable" => {
            "The first argument of set and set_var must be a string literal".to_string()
        }
        "unknownfunction" => format!("Unknown function \"{}\"", p(0)),
        "noparams" => format!("Function \"{}\" requires arguments", p(0)),
        "notenoughargs" => format!(
            "Not enough arguments to function \"{}\": expected {}, got {}",
            p(0),
            p(1),
            p(2)
        ),
        "toomanyargs" => format!(
            "Too many arguments to function \"{}\": expected at most {}, got {}",
            p(0),
            p(1),
            p(2)
        ),
        "dividebyzero" => format!("Illegal attempt to divide {} by zero", p(0)),
        "arrayinarithmetic" => "An array cannot be used in an arithmetic context".to_string(),
        "notarray" => "Requested array index of a value that is not an array".to_string(),
        "negativeindex" => format!("Negative array index {}", p(0)),
        "outofbounds" => format!(
            "Requested index {} of an array with {} elements",
            p(0),
            p(1)
        ),
        "regexfailure" => format!("Error in regular expression \"{}\": {}", p(1), p(0)),
        "invalidiprange" => format!("Invalid IP range \"{}\"", p(0)),
        "match-empty-regex" => "This regular expression matches the empty string".to_string(),
        "unused-variable" => format!("The variable \"{}\" is assigned but never used", p(0)),
        "deprecated-variable" => format!(
            "The variable \"{}\" is deprecated, use \"{}\" instead",
            p(0),
            p(1)
        ),
        other => format!("{other} {}", params.join(", ")),
    }
}
