// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::config::EngineConfig;
use crate::consequences::parameters::{range_of, Parameters};
use crate::consequences::sink::BlockRequest;
use crate::consequences::ExecContext;

use core::time::Duration;

use anyhow::{bail, Result};

const RANGE_BLOCK_DURATION: Duration = Duration::from_secs(7 * 86400);

/// Parses `"infinite"`, `"3 days"`, `"1 hour"` and similar. `None` is indefinite.
pub fn parse_duration(text: &str) -> Result<Option<Duration>> {
    let text = text.trim().to_ascii_lowercase();
    if matches!(
        text.as_str(),
        "" | "infinite" | "indefinite" | "infinity" | "never"
    ) {
        return Ok(None);
    }
    let (amount, unit) = match text.split_once(char::is_whitespace) {
        Some((a, u)) => (a, u.trim()),
        None => (text.as_str(), "seconds"),
    };
    let amount: u64 = amount.parse()?;
    let seconds = match unit.trim_end_matches('s') {
        "second" | "sec" => 1,
        "minute" | "min" => 60,
        "hour" => 3600,
        "day" => 86400,
        "week" => 7 * 86400,
        "month" => 30 * 86400,
        "year" => 365 * 86400,
        _ => bail!("unknown duration unit `{unit}`"),
    };
    Ok(Some(Duration::from_secs(amount.saturating_mul(seconds))))
}

/// Blocks the acting user. `args` is `[talk, anon_expiry, user_expiry]`
/// where `talk` is `"blocktalk"` or empty; an empty list blocks indefinitely.
#[derive(Debug, Clone)]
pub struct Block {
    pub(crate) params: Parameters,
    pub(crate) expiry: Option<Duration>,
    block_talk: bool,
}

impl Block {
    pub fn new(params: Parameters, args: &[String]) -> Result<Self> {
        let (block_talk, expiry) = match args {
            [] => (false, None),
            [talk, anon, user] => {
                let expiry = if params.action.is_registered() { user } else { anon };
                (talk == "blocktalk", parse_duration(expiry)?)
            }
            _ => bail!("block expects no parameters or three, got {args:?}"),
        };
        Ok(Self {
            params,
            expiry,
            block_talk,
        })
    }

    /// Whether this block lasts longer than `other`.
    pub fn outlasts(&self, other: &Block) -> bool {
        match (self.expiry, other.expiry) {
            (None, Some(_)) => true,
            (Some(a), Some(b)) => a > b,
            _ => false,
        }
    }

    pub fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<bool> {
        ctx.sink.block(&BlockRequest {
            filter: self.params.filter,
            target: self.params.action.user_name.clone(),
            expiry: self.expiry,
            range: false,
            block_talk: self.block_talk,
            reason: self.params.filter_name.clone(),
        })
    }
}

/// Blocks the network of the acting address.
#[derive(Debug, Clone)]
pub struct RangeBlock {
    pub(crate) params: Parameters,
}

impl RangeBlock {
    pub fn new(params: Parameters) -> Self {
        Self { params }
    }

    pub fn target(&self, config: &EngineConfig) -> Option<String> {
        let size = &config.range_block_size;
        self.params
            .action
            .ip
            .map(|ip| range_of(ip, size.ipv4, size.ipv6))
    }

    pub fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<bool> {
        let Some(target) = self.target(ctx.config) else {
            return Ok(false);
        };
        ctx.sink.block(&BlockRequest {
            filter: self.params.filter,
            target,
            expiry: Some(RANGE_BLOCK_DURATION),
            range: true,
            block_talk: false,
            reason: self.params.filter_name.clone(),
        })
    }
}

/// Removes the acting user from every group.
#[derive(Debug, Clone)]
pub struct Degroup {
    pub(crate) params: Parameters,
}

impl Degroup {
    pub fn new(params: Parameters) -> Self {
        Self { params }
    }

    pub fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<bool> {
        if !self.params.action.is_registered() {
            return Ok(false);
        }
        ctx.sink.degroup(&self.params)
    }
}

/// Keeps a registered user from being promoted automatically for a while.
#[derive(Debug, Clone)]
pub struct BlockAutopromote {
    pub(crate) params: Parameters,
    duration: Option<Duration>,
}

impl BlockAutopromote {
    /// An optional first argument overrides the configured duration, in days.
    pub fn new(params: Parameters, args: &[String]) -> Result<Self> {
        let duration = match args.first() {
            Some(days) if !days.is_empty() => {
                let Some(secs) = days.trim().parse::<u64>()?.checked_mul(86400) else {
                    bail!("autopromotion block of {days} days is too long");
                };
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };
        Ok(Self { params, duration })
    }

    pub fn stash_key(user_id: u64) -> String {
        format!("abusefilter-block-autopromote:{user_id}")
    }

    pub fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<bool> {
        if !self.params.action.is_registered() {
            return Ok(false);
        }
        let ttl = self
            .duration
            .unwrap_or(Duration::from_secs(ctx.config.block_autopromote_duration_secs));
        ctx.sink
            .set(&Self::stash_key(self.params.action.user_id), 1, ttl)?;
        Ok(true)
    }
}
