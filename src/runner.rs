// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins::regex::RegexCache;
use crate::config::{EngineConfig, ErrorPolicy};
use crate::error::UserVisibleError;
use crate::filter::{Filter, FilterId};
use crate::interpreter::Interpreter;
use crate::lexer::Source;
use crate::parser;
use crate::tags::TagCollector;
use crate::utils::limits::{ConditionCounter, ExecutionTimer, LimitError};
use crate::utils::stable_hash;
use crate::variables::{VariableHolder, VariableSource};

use core::time::Duration;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use anyhow::Result;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Why a filter produced no verdict. Only evaluation errors a filter author
/// can see are subject to the evaluation error policy; syntax errors and
/// engine defects never match.
enum FilterFailure {
    Syntax(anyhow::Error),
    Evaluation(anyhow::Error),
}

/// Timing and outcome of one filter within a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterProfile {
    pub elapsed: Duration,
    pub conditions: usize,
    pub matched: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult {
    /// Matching filters in evaluation order.
    pub matched: Vec<FilterId>,
    pub conditions: usize,
    pub profiles: BTreeMap<FilterId, FilterProfile>,
    pub condition_limit_reached: bool,
    pub time_limit_reached: bool,
    /// Set when the verdict came from a [`VerdictCache`].
    pub cached: bool,
}

/// Verdict persisted by a [`VerdictCache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedVerdict {
    pub matched: Vec<FilterId>,
    pub conditions: usize,
    pub condition_limit_reached: bool,
}

/// Hooks for reusing the verdict of an identical variable set and filter set.
pub trait VerdictCache {
    fn seek(&self, key: &str) -> Option<CachedVerdict>;
    fn store(&self, key: &str, verdict: &CachedVerdict);
}

#[derive(Debug, Default)]
pub struct MemoryVerdictCache {
    verdicts: Mutex<HashMap<String, CachedVerdict>>,
}

impl MemoryVerdictCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.verdicts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.lock().is_empty()
    }
}

impl VerdictCache for MemoryVerdictCache {
    fn seek(&self, key: &str) -> Option<CachedVerdict> {
        self.verdicts.lock().get(key).cloned()
    }

    fn store(&self, key: &str, verdict: &CachedVerdict) {
        self.verdicts.lock().insert(key.to_string(), verdict.clone());
    }
}

/// Cache key over the concrete variables and the rules of `filters`.
pub fn verdict_key(holder: &VariableHolder, filters: &[&Filter]) -> Result<String> {
    let vars = serde_json::to_string(&holder.values())?;
    let mut parts = vec![vars];
    for f in filters {
        if let Some(id) = f.id {
            parts.push(id.to_string());
            parts.push(f.rules.clone());
        }
    }
    Ok(stable_hash(parts.iter().map(String::as_str)))
}

/// Evaluates a batch of filters against one action.
pub struct FilterRunner<'a> {
    config: &'a EngineConfig,
    cache: Option<&'a dyn VerdictCache>,
}

impl<'a> FilterRunner<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: &'a dyn VerdictCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Runs every runnable filter in id order with one shared condition budget.
    pub fn run(
        &self,
        filters: &[Filter],
        holder: &mut VariableHolder,
        source: &dyn VariableSource,
        tags: &mut TagCollector,
    ) -> Result<RunResult> {
        let mut candidates: Vec<&Filter> = filters.iter().filter(|f| f.is_runnable()).collect();
        candidates.sort_by_key(|f| f.id);

        let key = match self.cache {
            Some(_) => Some(verdict_key(holder, &candidates)?),
            None => None,
        };
        if let (Some(cache), Some(key)) = (self.cache, key.as_deref()) {
            if let Some(verdict) = cache.seek(key) {
                debug!("verdict cache hit for {key}");
                if verdict.condition_limit_reached {
                    tags.add(&self.config.condition_limit_tag);
                }
                return Ok(RunResult {
                    matched: verdict.matched,
                    conditions: verdict.conditions,
                    condition_limit_reached: verdict.condition_limit_reached,
                    cached: true,
                    ..RunResult::default()
                });
            }
        }

        let mut counter = ConditionCounter::new(self.config.condition_limit);
        let mut regex = RegexCache::new(self.config.regex_cache_size);
        let timer = ExecutionTimer::new(self.config.runtime_limit_ms.map(Duration::from_millis));
        let slow = Duration::from_millis(self.config.slow_filter_threshold_ms);
        let mut result = RunResult::default();

        for filter in candidates {
            let Some(id) = filter.id else { continue };
            if let Err(e) = timer.check() {
                warn!("skipping remaining filters from {id} on: {e}");
                result.time_limit_reached = true;
                break;
            }

            let start = Instant::now();
            let before = counter.consumed();
            let outcome = self.eval_filter(filter, holder, source, &mut counter, &mut regex);

            let mut profile = FilterProfile::default();
            let mut stop = false;
            match outcome {
                Ok(matched) => profile.matched = matched,
                Err(FilterFailure::Syntax(e)) => {
                    warn!("filter {id} does not parse: {e}");
                    profile.error = Some(e.to_string());
                }
                Err(FilterFailure::Evaluation(e)) => {
                    if let Some(LimitError::ConditionLimitReached { limit }) =
                        e.downcast_ref::<LimitError>()
                    {
                        info!("condition limit {limit} reached in filter {id}");
                        result.condition_limit_reached = true;
                        tags.add(&self.config.condition_limit_tag);
                        stop = true;
                    } else if e.downcast_ref::<UserVisibleError>().is_some() {
                        warn!("filter {id} failed: {e}");
                        profile.matched = self.config.evaluation_error_policy == ErrorPolicy::Match;
                    } else {
                        error!("filter {id} failed internally: {e}");
                    }
                    profile.error = Some(e.to_string());
                }
            }
            profile.elapsed = start.elapsed();
            profile.conditions = counter.consumed() - before;
            if profile.elapsed > slow {
                warn!(
                    "filter {id} is slow: {}ms, {} conditions",
                    profile.elapsed.as_millis(),
                    profile.conditions
                );
            }
            if profile.matched {
                result.matched.push(id);
            }
            result.profiles.insert(id, profile);
            if stop {
                break;
            }
        }
        result.conditions = counter.consumed();

        if let (Some(cache), Some(key)) = (self.cache, key.as_deref()) {
            if !result.time_limit_reached {
                cache.store(
                    key,
                    &CachedVerdict {
                        matched: result.matched.clone(),
                        conditions: result.conditions,
                        condition_limit_reached: result.condition_limit_reached,
                    },
                );
            }
        }
        Ok(result)
    }

    // Parse errors surface before any lazy variable is computed.
    fn eval_filter(
        &self,
        filter: &Filter,
        holder: &mut VariableHolder,
        source: &dyn VariableSource,
        counter: &mut ConditionCounter,
        regex: &mut RegexCache,
    ) -> core::result::Result<bool, FilterFailure> {
        let file = match filter.id {
            Some(id) => format!("filter {id}"),
            None => "filter".to_string(),
        };
        let rule = Source::from_contents(file, filter.rules.clone())
            .and_then(|text| parser::parse(&text))
            .map_err(FilterFailure::Syntax)?;
        Interpreter::new(holder, source, counter, regex)
            .check(&rule)
            .map_err(FilterFailure::Evaluation)
    }
}
