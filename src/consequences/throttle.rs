// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Rate limiting. Each hit is counted per group within the period. Once a
//! group has seen `count` hits, the throttle engages and the filter's other
//! actions are suppressed until the period runs out.

use crate::consequences::parameters::{range_of, Parameters};
use crate::consequences::ExecContext;
use crate::error::InternalError;
use crate::utils::stable_hash;

use core::time::Duration;

use anyhow::{bail, Result};
use log::debug;

const GROUP_PARTS: &[&str] = &[
    "ip",
    "user",
    "range",
    "creationdate",
    "editcount",
    "site",
    "page",
];

#[derive(Debug, Clone)]
pub struct Throttle {
    pub(crate) params: Parameters,
    throttle_id: String,
    count: i64,
    period: Duration,
    groups: Vec<String>,
    engaged: Option<bool>,
}

impl Throttle {
    /// `args` is `[id, "count,period", group...]` where a group is a comma
    /// joined list of the parts in `GROUP_PARTS`.
    pub fn new(params: Parameters, args: &[String]) -> Result<Self> {
        let [throttle_id, rate, groups @ ..] = args else {
            bail!("throttle needs an id and a rate, got {args:?}");
        };
        let Some((count, period)) = rate.split_once(',') else {
            bail!("invalid throttle rate `{rate}`");
        };
        let count: i64 = count.trim().parse()?;
        let period: u64 = period.trim().parse()?;
        if groups.is_empty() {
            bail!("throttle {throttle_id} has no groups");
        }
        for group in groups {
            for part in group.split(',') {
                if !GROUP_PARTS.contains(&part.trim()) {
                    bail!("unknown throttle group `{part}`");
                }
            }
        }
        Ok(Self {
            params,
            throttle_id: throttle_id.clone(),
            count,
            period: Duration::from_secs(period),
            groups: groups.to_vec(),
            engaged: None,
        })
    }

    fn identifier(&self, part: &str, ctx: &ExecContext<'_>) -> String {
        let action = &self.params.action;
        match part {
            "ip" => action
                .ip
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| action.user_name.clone()),
            "user" => action.user_id.to_string(),
            "range" => action
                .ip
                .map(|ip| range_of(ip, 16, 64))
                .unwrap_or_default(),
            "creationdate" => action.user_registration.clone().unwrap_or_default(),
            "editcount" => action.user_editcount.to_string(),
            "page" => action.page.clone(),
            _ => ctx.config.wiki_name.clone(),
        }
    }

    fn key(&self, group: &str, ctx: &ExecContext<'_>) -> String {
        let parts: Vec<String> = group
            .split(',')
            .map(|p| self.identifier(p.trim(), ctx))
            .collect();
        let joined = parts.join(",");
        format!(
            "abusefilter:throttle:{}:{}:{}",
            self.params.filter,
            self.throttle_id,
            stable_hash([group, joined.as_str()])
        )
    }

    pub fn should_disable_other_consequences(&mut self, ctx: &ExecContext<'_>) -> Result<bool> {
        let mut engaged = false;
        for group in &self.groups {
            let hits = ctx.sink.get(&self.key(group, ctx))?.unwrap_or(0);
            if hits >= self.count {
                engaged = true;
            }
        }
        debug!(
            "throttle {} of filter {} engaged: {engaged}",
            self.throttle_id, self.params.filter
        );
        self.engaged = Some(engaged);
        Ok(engaged)
    }

    /// Records the hit. Returns `false` when the throttle is engaged.
    pub fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<bool> {
        let Some(engaged) = self.engaged else {
            return Err(InternalError::ConsequenceNotPrechecked("throttle").into());
        };
        for group in &self.groups {
            let key = self.key(group, ctx);
            ctx.sink.incr_with_init(&key, self.period)?;
        }
        Ok(!engaged)
    }
}
