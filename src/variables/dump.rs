// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Serialized variable dumps for audit logs and deferred replay.

use crate::config::EngineConfig;
use crate::value::Value;
use crate::variables::{ReadMode, VarEntry, VarLookup, VariableHolder, VariableSource};

use std::collections::BTreeMap;

use anyhow::Result;
use log::debug;

/// Serializes `holder` into a JSON object of native values.
///
/// Variables listed in `dump_computed_variables` are computed first; other
/// pending lazy variables are left out. Protected variables are replaced by
/// a flag telling whether they held a value.
pub fn store_var_dump(
    holder: &mut VariableHolder,
    source: &dyn VariableSource,
    config: &EngineConfig,
) -> Result<String> {
    {
        let mut lookup = VarLookup::new(holder, source);
        for name in &config.dump_computed_variables {
            if let Some(VarEntry::Lazy(_)) = lookup.holder().get_entry(name) {
                lookup.get(name, ReadMode::Lax)?;
            }
        }
    }

    let mut dump = BTreeMap::new();
    for (name, entry) in holder.iter() {
        let VarEntry::Value(value) = entry else {
            debug!("leaving uncomputed variable {name} out of the dump");
            continue;
        };
        let stored = if config.is_protected(name) {
            Value::Bool(value.to_bool())
        } else {
            value.clone()
        };
        dump.insert(name.clone(), stored);
    }
    Ok(serde_json::to_string(&dump)?)
}

/// Restores a holder from a dump, translating deprecated names.
pub fn load_var_dump(json: &str) -> Result<VariableHolder> {
    let dump: BTreeMap<String, Value> = serde_json::from_str(json)?;
    let mut holder = VariableHolder::new();
    for (name, value) in dump {
        holder.set_var(&name, value);
    }
    holder.translate_deprecated();
    Ok(holder)
}
