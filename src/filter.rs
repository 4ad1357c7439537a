// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use std::cell::OnceCell;
use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a filter. Local filters order before global ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FilterId {
    pub global: bool,
    pub id: u64,
}

impl FilterId {
    pub fn local(id: u64) -> Self {
        Self { global: false, id }
    }

    pub fn global(id: u64) -> Self {
        Self { global: true, id }
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.global {
            write!(f, "global-{}", self.id)
        } else {
            write!(f, "{}", self.id)
        }
    }
}

/// Consequence name to its parameters, e.g. `"throttle" => ["7", "3,60", "user"]`.
pub type Actions = BTreeMap<String, Vec<String>>;

/// Where the actions of a filter come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionsSource {
    Loaded(Actions),
    /// Opaque handle passed back to [`FilterSource::load_actions`].
    Deferred(u64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterFlags {
    pub enabled: bool,
    pub deleted: bool,
    pub hidden: bool,
    pub suppressed: bool,
    pub protected: bool,
    pub global: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastEditInfo {
    pub user_name: String,
    pub timestamp: DateTime<Utc>,
}

/// An administrator authored rule and the consequences it declares.
#[derive(Debug, Clone)]
pub struct Filter {
    pub id: Option<FilterId>,
    pub name: String,
    pub rules: String,
    pub group: String,
    pub flags: FilterFlags,
    pub last_edit: Option<LastEditInfo>,
    actions: ActionsSource,
    resolved: OnceCell<Actions>,
}

impl Filter {
    /// An enabled local filter in the `default` group without actions.
    pub fn new(id: u64, rules: &str) -> Self {
        Self {
            id: Some(FilterId::local(id)),
            name: format!("Filter {id}"),
            rules: rules.to_string(),
            group: "default".to_string(),
            flags: FilterFlags {
                enabled: true,
                ..FilterFlags::default()
            },
            last_edit: None,
            actions: ActionsSource::Loaded(Actions::new()),
            resolved: OnceCell::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }

    pub fn with_flags(mut self, flags: FilterFlags) -> Self {
        self.flags = flags;
        if let Some(id) = self.id.as_mut() {
            id.global = flags.global;
        }
        self
    }

    pub fn with_action(mut self, name: &str, params: &[&str]) -> Self {
        let mut actions = match self.actions {
            ActionsSource::Loaded(a) => a,
            ActionsSource::Deferred(_) => Actions::new(),
        };
        actions.insert(
            name.to_string(),
            params.iter().map(|p| p.to_string()).collect(),
        );
        self.actions = ActionsSource::Loaded(actions);
        self.resolved = OnceCell::new();
        self
    }

    pub fn with_actions_source(mut self, actions: ActionsSource) -> Self {
        self.actions = actions;
        self.resolved = OnceCell::new();
        self
    }

    pub fn actions_source(&self) -> &ActionsSource {
        &self.actions
    }

    /// Whether the runner should evaluate this filter at all.
    pub fn is_runnable(&self) -> bool {
        self.id.is_some() && self.flags.enabled && !self.flags.deleted
    }

    /// The actions of this filter, loading deferred ones at most once.
    pub fn actions(&self, source: &dyn FilterSource) -> Result<&Actions> {
        if let Some(actions) = self.resolved.get() {
            return Ok(actions);
        }
        let actions = match &self.actions {
            ActionsSource::Loaded(a) => a.clone(),
            ActionsSource::Deferred(handle) => source.load_actions(self, *handle)?,
        };
        Ok(self.resolved.get_or_init(|| actions))
    }
}

/// Host store of filters.
pub trait FilterSource {
    /// Candidate filters of `group`. Order does not matter; the runner sorts by id.
    fn filters(&self, group: &str) -> Result<Vec<Filter>>;

    fn load_actions(&self, filter: &Filter, handle: u64) -> Result<Actions>;
}

/// Filters held in memory, grouped by [`Filter::group`].
#[derive(Debug, Default, Clone)]
pub struct MemoryFilterSource {
    filters: Vec<Filter>,
    deferred: BTreeMap<u64, Actions>,
}

impl MemoryFilterSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    /// Registers actions that filters refer to through [`ActionsSource::Deferred`].
    pub fn add_deferred(&mut self, handle: u64, actions: Actions) {
        self.deferred.insert(handle, actions);
    }
}

impl FilterSource for MemoryFilterSource {
    fn filters(&self, group: &str) -> Result<Vec<Filter>> {
        Ok(self
            .filters
            .iter()
            .filter(|f| f.group == group)
            .cloned()
            .collect())
    }

    fn load_actions(&self, filter: &Filter, handle: u64) -> Result<Actions> {
        match self.deferred.get(&handle) {
            Some(actions) => Ok(actions.clone()),
            None => anyhow::bail!("no actions stored for filter {:?} (handle {handle})", filter.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    struct CountingSource {
        loads: Cell<usize>,
    }

    impl FilterSource for CountingSource {
        fn filters(&self, _: &str) -> Result<Vec<Filter>> {
            Ok(vec![])
        }

        fn load_actions(&self, _: &Filter, _: u64) -> Result<Actions> {
            self.loads.set(self.loads.get() + 1);
            Ok(Actions::from([("tag".to_string(), vec!["spam".to_string()])]))
        }
    }

    #[test]
    fn ids_order_local_first() {
        let mut ids = vec![FilterId::global(1), FilterId::local(9), FilterId::local(2)];
        ids.sort();
        assert_eq!(
            ids,
            vec![FilterId::local(2), FilterId::local(9), FilterId::global(1)]
        );
        assert_eq!(FilterId::global(1).to_string(), "global-1");
    }

    #[test]
    fn deferred_actions_load_once() -> Result<()> {
        let source = CountingSource {
            loads: Cell::new(0),
        };
        let filter = Filter::new(1, "true").with_actions_source(ActionsSource::Deferred(5));
        assert_eq!(filter.actions(&source)?.len(), 1);
        assert_eq!(filter.actions(&source)?.len(), 1);
        assert_eq!(source.loads.get(), 1);
        Ok(())
    }
}
