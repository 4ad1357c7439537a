// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::analyzer::{self, SyntaxResult};
use crate::builtins::regex::RegexCache;
use crate::config::{ConditionLimitPolicy, EngineConfig};
use crate::consequences::executor::{ConsequencesExecutor, ExecutionResult};
use crate::consequences::parameters::ActionContext;
use crate::consequences::sink::{ConsequenceSink, SessionStore};
use crate::filter::{Filter, FilterId, FilterSource};
use crate::interpreter::Interpreter;
use crate::lexer::Source;
use crate::parser;
use crate::runner::{FilterRunner, RunResult, VerdictCache};
use crate::tags::TagCollector;
use crate::utils::limits::ConditionCounter;
use crate::value::Value;
use crate::variables::dump::store_var_dump;
use crate::variables::{NoSource, VariableHolder, VariableSource};

use anyhow::Result;
use log::error;

/// The collaborators a filter run needs from the host platform.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    pub filters: &'a dyn FilterSource,
    pub variables: &'a dyn VariableSource,
    pub sink: &'a dyn ConsequenceSink,
    pub session: &'a dyn SessionStore,
    pub cache: Option<&'a dyn VerdictCache>,
}

#[derive(Debug, Clone, Default)]
pub struct FilterRunOutcome {
    pub matched: Vec<FilterId>,
    pub run: RunResult,
    pub consequences: ExecutionResult,
}

impl FilterRunOutcome {
    pub fn vetoed(&self) -> bool {
        self.consequences.vetoed
    }
}

/// The abuse filter evaluation engine.
pub struct Engine {
    config: EngineConfig,
    regex: RegexCache,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let regex = RegexCache::new(config.regex_cache_size);
        Self { config, regex }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parses and statically checks a filter without evaluating it.
    pub fn check_syntax(&self, text: &str) -> Result<SyntaxResult> {
        analyzer::check_syntax(text)
    }

    /// Whether `text` matches the action described by `holder`.
    ///
    /// Errors in the filter are returned, including the condition limit.
    pub fn check_conditions(
        &mut self,
        text: &str,
        holder: &mut VariableHolder,
        source: &dyn VariableSource,
    ) -> Result<bool> {
        let rule = parser::parse(&Source::from_contents("<filter>".to_string(), text.to_string())?)?;
        let mut counter = ConditionCounter::new(self.config.condition_limit);
        Interpreter::new(holder, source, &mut counter, &mut self.regex).check(&rule)
    }

    /// Evaluates an expression with only the generic variables available.
    pub fn evaluate_expression(&mut self, text: &str) -> Result<Value> {
        let rule = parser::parse(&Source::from_contents("<expression>".to_string(), text.to_string())?)?;
        let mut holder = VariableHolder::generic(&self.config);
        let mut counter = ConditionCounter::unlimited();
        Interpreter::new(&mut holder, &NoSource, &mut counter, &mut self.regex).evaluate(&rule)
    }

    /// Runs the filters of `group` against one action and executes the
    /// consequences of those that matched.
    pub fn run_filters(
        &self,
        host: &Host<'_>,
        holder: &mut VariableHolder,
        group: &str,
        action: &ActionContext,
        tags: &mut TagCollector,
    ) -> Result<FilterRunOutcome> {
        let filters = host.filters.filters(group)?;
        let mut runner = FilterRunner::new(&self.config);
        if let Some(cache) = host.cache {
            runner = runner.with_cache(cache);
        }
        let run = runner.run(&filters, holder, host.variables, tags)?;

        let matched: Vec<&Filter> = run
            .matched
            .iter()
            .filter_map(|id| filters.iter().find(|f| f.id == Some(*id)))
            .collect();

        let var_dump = if matched.is_empty() {
            None
        } else {
            match store_var_dump(holder, host.variables, &self.config) {
                Ok(dump) => Some(dump),
                Err(e) => {
                    error!("could not dump the variables of the action: {e}");
                    None
                }
            }
        };

        let executor = ConsequencesExecutor::new(&self.config, host.sink, host.session);
        let mut consequences =
            executor.execute(&matched, host.filters, action, tags, var_dump.as_deref())?;
        if run.condition_limit_reached
            && self.config.condition_limit_policy == ConditionLimitPolicy::FailClosed
        {
            consequences.vetoed = true;
        }

        Ok(FilterRunOutcome {
            matched: run.matched.clone(),
            run,
            consequences,
        })
    }
}
