// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::config::EngineConfig;
use crate::consequences::parameters::{ActionContext, Parameters};
use crate::consequences::sink::{AuditEntry, ConsequenceSink, SessionStore};
use crate::consequences::{Consequence, ConsequenceKind, ConsequenceMessage, ExecContext};
use crate::filter::{Actions, Filter, FilterId, FilterSource};
use crate::tags::TagCollector;

use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::Result;
use log::{debug, error};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    /// Messages of consequences that took effect, in execution order.
    pub messages: Vec<ConsequenceMessage>,
    /// The triggering action must not proceed.
    pub vetoed: bool,
    /// Consequences that took effect, per filter.
    pub taken: BTreeMap<FilterId, Vec<String>>,
    /// Consequences that failed, with the error.
    pub failures: Vec<(FilterId, String, String)>,
}

/// Runs the consequences of matched filters.
pub struct ConsequencesExecutor<'a> {
    config: &'a EngineConfig,
    sink: &'a dyn ConsequenceSink,
    session: &'a dyn SessionStore,
}

impl<'a> ConsequencesExecutor<'a> {
    pub fn new(
        config: &'a EngineConfig,
        sink: &'a dyn ConsequenceSink,
        session: &'a dyn SessionStore,
    ) -> Self {
        Self {
            config,
            sink,
            session,
        }
    }

    /// Executes the consequences of `matched` and records every filter in the
    /// audit log. A failing consequence never stops the others.
    pub fn execute(
        &self,
        matched: &[&Filter],
        filters: &dyn FilterSource,
        action: &ActionContext,
        tags: &mut TagCollector,
        var_dump: Option<&str>,
    ) -> Result<ExecutionResult> {
        let action = Rc::new(action.clone());
        let mut ctx = ExecContext {
            config: self.config,
            sink: self.sink,
            session: self.session,
            tags,
        };

        let mut pending = vec![];
        for filter in matched {
            let Some(id) = filter.id else { continue };
            let actions = match filter.actions(filters) {
                Ok(actions) => self.effective_actions(id, actions),
                Err(e) => {
                    error!("could not load the actions of filter {id}: {e}");
                    continue;
                }
            };
            let params = Parameters {
                filter: id,
                filter_name: filter.name.clone(),
                action: action.clone(),
            };
            let consequences = build_consequences(&actions, &params);
            pending.extend(precheck(consequences, &ctx));
        }
        keep_longest_block(&mut pending);
        pending.sort_by_key(|c| (c.sort(), c.params().filter));

        let mut result = ExecutionResult::default();
        for mut consequence in pending {
            let id = consequence.params().filter;
            match consequence.execute(&mut ctx) {
                Ok(true) => {
                    debug!("{} of filter {id} took effect", consequence.name());
                    if let Some(message) = consequence.message() {
                        result.messages.push(message);
                    }
                    if consequence.kind().is_hook_aborter() {
                        result.vetoed = true;
                    }
                    result
                        .taken
                        .entry(id)
                        .or_default()
                        .push(consequence.name().to_string());
                }
                Ok(false) => debug!("{} of filter {id} did not apply", consequence.name()),
                Err(e) => {
                    error!("{} of filter {id} failed: {e}", consequence.name());
                    result
                        .failures
                        .push((id, consequence.name().to_string(), e.to_string()));
                }
            }
        }

        for filter in matched {
            let Some(id) = filter.id else { continue };
            let entry = AuditEntry {
                filter: id,
                filter_name: filter.name.clone(),
                action: action.action.clone(),
                user_name: action.user_name.clone(),
                page: action.page.clone(),
                actions_taken: result.taken.get(&id).cloned().unwrap_or_default(),
                timestamp: chrono::Utc::now(),
                var_dump: var_dump.map(str::to_string),
            };
            if let Err(e) = self.sink.log_hit(&entry) {
                error!("could not log the hit of filter {id}: {e}");
            }
            if let Err(e) = self.sink.bump_hit_count(id) {
                error!("could not count the hit of filter {id}: {e}");
            }
        }
        Ok(result)
    }

    // Global filters may not take locally disabled actions. A block makes a
    // disallow of the same filter redundant.
    fn effective_actions(&self, id: FilterId, actions: &Actions) -> Actions {
        let mut actions = actions.clone();
        if id.global {
            actions.retain(|name, _| !self.config.locally_disabled_global_actions.contains(name));
        }
        if actions.contains_key("block") {
            actions.remove("disallow");
        }
        actions
    }
}

fn build_consequences(actions: &Actions, params: &Parameters) -> Vec<Consequence> {
    let mut consequences = vec![];
    for (name, args) in actions {
        match Consequence::build(name, args, params.clone()) {
            Ok(c) => consequences.push(c),
            Err(e) => error!("invalid {name} action of filter {}: {e}", params.filter),
        }
    }
    consequences.sort_by_key(Consequence::sort);
    consequences
}

// Disablers run first in priority order. Once one of them asks for it, every
// later consequence of the same filter is dropped, other disablers included.
fn precheck(consequences: Vec<Consequence>, ctx: &ExecContext<'_>) -> Vec<Consequence> {
    let mut kept = vec![];
    for mut c in consequences {
        if !c.kind().is_disabler() {
            kept.push(c);
            continue;
        }
        match c.should_disable_other_consequences(ctx) {
            Ok(true) => {
                debug!(
                    "{} of filter {} suppresses the remaining consequences",
                    c.name(),
                    c.params().filter
                );
                kept.retain(|k: &Consequence| k.kind().is_disabler());
                kept.push(c);
                return kept;
            }
            Ok(false) => kept.push(c),
            Err(e) => error!(
                "precheck of {} for filter {} failed: {e}",
                c.name(),
                c.params().filter
            ),
        }
    }
    kept
}

// Only the longest block across all filters is placed.
fn keep_longest_block(consequences: &mut Vec<Consequence>) {
    let mut longest: Option<usize> = None;
    for (idx, c) in consequences.iter().enumerate() {
        let Consequence::Block(block) = c else {
            continue;
        };
        let replace = match longest.map(|l| &consequences[l]) {
            Some(Consequence::Block(current)) => {
                block.outlasts(current)
                    || (!current.outlasts(block) && block.params.filter < current.params.filter)
            }
            _ => true,
        };
        if replace {
            longest = Some(idx);
        }
    }
    let mut idx = 0;
    consequences.retain(|c| {
        let keep = c.kind() != ConsequenceKind::Block || Some(idx) == longest;
        idx += 1;
        keep
    });
}
