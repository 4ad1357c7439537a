// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// What happens to an action once its group exhausted the condition budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionLimitPolicy {
    /// The action proceeds; only the tag is recorded.
    #[default]
    FailOpen,
    /// The action is vetoed.
    FailClosed,
}

/// How a filter whose evaluation failed is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    #[default]
    NoMatch,
    Match,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RangeBlockSize {
    pub ipv4: u8,
    pub ipv6: u8,
}

impl Default for RangeBlockSize {
    fn default() -> Self {
        Self {
            ipv4: 16,
            ipv6: 19,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub condition_limit: usize,
    pub condition_limit_policy: ConditionLimitPolicy,
    pub evaluation_error_policy: ErrorPolicy,
    pub slow_filter_threshold_ms: u64,
    pub runtime_limit_ms: Option<u64>,
    pub regex_cache_size: usize,
    pub condition_limit_tag: String,
    pub locally_disabled_global_actions: Vec<String>,
    pub block_autopromote_duration_secs: u64,
    pub range_block_size: RangeBlockSize,
    pub protected_variables: Vec<String>,
    pub dump_computed_variables: Vec<String>,
    pub wiki_name: String,
    pub wiki_language: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            condition_limit: 1000,
            condition_limit_policy: ConditionLimitPolicy::FailOpen,
            evaluation_error_policy: ErrorPolicy::NoMatch,
            slow_filter_threshold_ms: 500,
            runtime_limit_ms: None,
            regex_cache_size: 128,
            condition_limit_tag: "abusefilter-condition-limit".to_string(),
            locally_disabled_global_actions: vec![],
            block_autopromote_duration_secs: 5 * 86400,
            range_block_size: RangeBlockSize::default(),
            protected_variables: vec!["user_unnamed_ip".to_string()],
            dump_computed_variables: vec!["old_wikitext".to_string(), "new_wikitext".to_string()],
            wiki_name: "wiki".to_string(),
            wiki_language: "en".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<EngineConfig> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<EngineConfig> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.protected_variables.iter().any(|p| p == name)
    }
}
