// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod computer;
pub mod dump;
pub mod keywords;

use crate::config::EngineConfig;
use crate::error::InternalError;
use crate::value::Value;

use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};

/// How a lazy variable is produced.
///
/// The first group is computed from other variables of the same holder.
/// The rest is delegated to the host through [`VariableSource`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeMethod {
    /// `[old_var, new_var]`: line diff of two texts.
    Diff,
    /// `[diff_var, "added" | "removed"]`: one side of a diff as lines.
    DiffSplit,
    /// `[var]`: character length.
    Length,
    /// `[var_a, var_b]`: `int(a) - int(b)`.
    SubtractInt,
    /// `[old_links_var, new_links_var]`
    LinkDiffAdded,
    LinkDiffRemoved,
    /// `[var]`: markup with tags removed.
    StripHtml,
    /// `[var]`: text split into lines.
    LinesOf,

    LinksFromWikitext,
    LinksFromDatabase,
    ParseWikitext,
    LoadRecentAuthors,
    LoadFirstAuthor,
    PageRestrictions,
    UserBlock,
    UserAge,
    UserGroups,
    UserRights,
    PageAge,
    RevisionTextById,
    UserUnnamedIp,
    Custom(String),
}

impl ComputeMethod {
    pub fn is_intrinsic(&self) -> bool {
        matches!(
            self,
            ComputeMethod::Diff
                | ComputeMethod::DiffSplit
                | ComputeMethod::Length
                | ComputeMethod::SubtractInt
                | ComputeMethod::LinkDiffAdded
                | ComputeMethod::LinkDiffRemoved
                | ComputeMethod::StripHtml
                | ComputeMethod::LinesOf
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LazyVariable {
    pub method: ComputeMethod,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VarEntry {
    Value(Value),
    Lazy(LazyVariable),
}

/// Behaviour of reads for names the holder does not contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Missing variables are an error.
    Strict,
    /// Missing variables read as `Undefined`.
    Lax,
    /// Like `Lax`, after translating deprecated names.
    Bc,
}

/// Per-action mapping from lower-cased names to values or pending computations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableHolder {
    vars: BTreeMap<String, VarEntry>,
}

impl VariableHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_var(&mut self, name: &str, value: impl Into<Value>) {
        self.vars
            .insert(name.to_ascii_lowercase(), VarEntry::Value(value.into()));
    }

    pub fn set_lazy(&mut self, name: &str, method: ComputeMethod, params: Vec<Value>) {
        self.vars.insert(
            name.to_ascii_lowercase(),
            VarEntry::Lazy(LazyVariable { method, params }),
        );
    }

    /// Copies every entry of `other` into this holder, overwriting duplicates.
    pub fn add_holder(&mut self, other: &VariableHolder) {
        for (k, v) in other.vars.iter() {
            self.vars.insert(k.clone(), v.clone());
        }
    }

    pub fn get_entry(&self, name: &str) -> Option<&VarEntry> {
        self.vars.get(&name.to_ascii_lowercase())
    }

    pub fn has(&self, name: &str) -> bool {
        self.get_entry(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<VarEntry> {
        self.vars.remove(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VarEntry)> {
        self.vars.iter()
    }

    /// Concrete (already computed) variables.
    pub fn values(&self) -> BTreeMap<String, Value> {
        self.vars
            .iter()
            .filter_map(|(k, v)| match v {
                VarEntry::Value(v) => Some((k.clone(), v.clone())),
                VarEntry::Lazy(_) => None,
            })
            .collect()
    }

    /// Renames deprecated variables to their current names.
    pub fn translate_deprecated(&mut self) {
        let deprecated: Vec<String> = self
            .vars
            .keys()
            .filter(|k| keywords::deprecated_replacement(k).is_some())
            .cloned()
            .collect();
        for old in deprecated {
            if let Some(entry) = self.vars.remove(&old) {
                let new = keywords::translate(&old).to_string();
                self.vars.entry(new).or_insert(entry);
            }
        }
    }

    /// Variables available without any action context: `timestamp`,
    /// `wiki_name` and `wiki_language`.
    pub fn generic(config: &EngineConfig) -> Self {
        let mut holder = Self::new();
        holder.set_var("timestamp", chrono::Utc::now().timestamp().to_string());
        holder.set_var("wiki_name", config.wiki_name.as_str());
        holder.set_var("wiki_language", config.wiki_language.as_str());
        holder
    }
}

/// Host callback producing lazy variables the core cannot compute itself.
///
/// Implementations must be deterministic for a given action and may read
/// other variables through `vars`.
pub trait VariableSource {
    fn resolve(
        &self,
        method: &ComputeMethod,
        params: &[Value],
        vars: &mut VarLookup<'_>,
    ) -> Result<Value>;
}

/// A source that cannot compute anything; used when only concrete and
/// intrinsic variables are available.
pub struct NoSource;

impl VariableSource for NoSource {
    fn resolve(&self, method: &ComputeMethod, _: &[Value], _: &mut VarLookup<'_>) -> Result<Value> {
        Err(InternalError::UnknownComputeMethod(format!("{method:?}")).into())
    }
}

/// Read access to a holder that computes and memoizes lazy variables.
pub struct VarLookup<'a> {
    holder: &'a mut VariableHolder,
    source: &'a dyn VariableSource,
    in_progress: HashSet<String>,
}

impl<'a> VarLookup<'a> {
    pub fn new(holder: &'a mut VariableHolder, source: &'a dyn VariableSource) -> Self {
        Self {
            holder,
            source,
            in_progress: HashSet::new(),
        }
    }

    pub fn holder(&self) -> &VariableHolder {
        self.holder
    }

    pub fn get(&mut self, name: &str, mode: ReadMode) -> Result<Value> {
        let mut name = name.to_ascii_lowercase();
        if mode == ReadMode::Bc {
            name = keywords::translate(&name).to_string();
        }

        let lazy = match self.holder.vars.get(&name) {
            Some(VarEntry::Value(v)) => return Ok(v.clone()),
            Some(VarEntry::Lazy(lazy)) => lazy.clone(),
            None if mode == ReadMode::Strict => {
                return Err(InternalError::UnsetVariable(name).into())
            }
            None => return Ok(Value::Undefined),
        };

        if !self.in_progress.insert(name.clone()) {
            return Err(InternalError::CircularComputation(name).into());
        }
        debug!("computing variable {name} via {:?}", lazy.method);
        let result = self.compute(&lazy);
        self.in_progress.remove(&name);

        let value = result?;
        self.holder.set_var(&name, value.clone());
        Ok(value)
    }

    fn compute(&mut self, lazy: &LazyVariable) -> Result<Value> {
        if lazy.method.is_intrinsic() {
            return computer::compute(self, &lazy.method, &lazy.params);
        }
        let source = self.source;
        source.resolve(&lazy.method, &lazy.params, self)
    }
}
