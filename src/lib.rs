// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod analyzer;
mod ast;
mod builtins;
pub mod config;
pub mod consequences;
mod engine;
pub mod error;
pub mod filter;
mod interpreter;
mod lexer;
mod number;
mod parser;
pub mod runner;
mod tags;
mod utils;
mod value;
pub mod variables;

pub use analyzer::{check_syntax, SyntaxResult};
pub use config::{ConditionLimitPolicy, EngineConfig, ErrorPolicy, RangeBlockSize};
pub use consequences::executor::{ConsequencesExecutor, ExecutionResult};
pub use consequences::parameters::ActionContext;
pub use consequences::sink::{ConsequenceSink, MemorySession, MemorySink, SessionStore};
pub use engine::{Engine, FilterRunOutcome, Host};
pub use error::{InternalError, UserVisibleError, UserVisibleWarning};
pub use filter::{ActionsSource, Filter, FilterFlags, FilterId, FilterSource, MemoryFilterSource};
pub use number::Number;
pub use runner::{FilterProfile, FilterRunner, MemoryVerdictCache, RunResult, VerdictCache};
pub use tags::TagCollector;
pub use utils::limits::{ConditionCounter, LimitError};
pub use value::Value;
pub use variables::dump::{load_var_dump, store_var_dump};
pub use variables::{
    ComputeMethod, NoSource, ReadMode, VarLookup, VariableHolder, VariableSource,
};

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::analyzer::Analyzer;
    pub use crate::ast::*;
    pub use crate::builtins::regex::RegexCache;
    pub use crate::interpreter::Interpreter;
    pub use crate::lexer::*;
    pub use crate::parser::*;
}
