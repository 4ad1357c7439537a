// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod block;
pub mod executor;
pub mod parameters;
pub mod simple;
pub mod sink;
pub mod throttle;
pub mod warn;

use crate::config::EngineConfig;
use crate::tags::TagCollector;

use block::{Block, BlockAutopromote, Degroup, RangeBlock};
use parameters::Parameters;
use simple::{Custom, Disallow, Tag};
use sink::{ConsequenceSink, SessionStore};
use throttle::Throttle;
use warn::Warn;

use anyhow::Result;
use serde::Serialize;

/// State a consequence may read during its precheck and change when executed.
pub struct ExecContext<'a> {
    pub config: &'a EngineConfig,
    pub sink: &'a dyn ConsequenceSink,
    pub session: &'a dyn SessionStore,
    pub tags: &'a mut TagCollector,
}

/// Message shown to the user for a consequence that took effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsequenceMessage {
    pub key: String,
    /// Filter name and filter id.
    pub params: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConsequenceKind {
    Throttle,
    Warn,
    Disallow,
    Block,
    RangeBlock,
    Degroup,
    BlockAutopromote,
    Tag,
    Custom,
}

impl ConsequenceKind {
    pub fn from_name(name: &str) -> ConsequenceKind {
        match name {
            "throttle" => Self::Throttle,
            "warn" => Self::Warn,
            "disallow" => Self::Disallow,
            "block" => Self::Block,
            "rangeblock" => Self::RangeBlock,
            "degroup" => Self::Degroup,
            "blockautopromote" => Self::BlockAutopromote,
            "tag" => Self::Tag,
            _ => Self::Custom,
        }
    }

    /// Execution priority, lower first.
    pub fn sort(&self) -> u32 {
        match self {
            Self::Throttle => 0,
            Self::Warn => 5,
            Self::Disallow => 10,
            Self::Block => 20,
            Self::RangeBlock => 25,
            Self::Degroup => 30,
            Self::BlockAutopromote => 35,
            Self::Tag => 40,
            Self::Custom => 50,
        }
    }

    /// Consequences whose precheck can suppress the others of their filter.
    pub fn is_disabler(&self) -> bool {
        matches!(self, Self::Throttle | Self::Warn)
    }

    /// Consequences that prevent the action once they took effect.
    pub fn is_hook_aborter(&self) -> bool {
        matches!(
            self,
            Self::Warn
                | Self::Disallow
                | Self::Block
                | Self::RangeBlock
                | Self::Degroup
                | Self::BlockAutopromote
        )
    }
}

#[derive(Debug, Clone)]
pub enum Consequence {
    Throttle(Throttle),
    Warn(Warn),
    Disallow(Disallow),
    Block(Block),
    RangeBlock(RangeBlock),
    Degroup(Degroup),
    BlockAutopromote(BlockAutopromote),
    Tag(Tag),
    Custom(Custom),
}

impl Consequence {
    /// Builds the consequence registered under `name`. Unknown names become
    /// [`Consequence::Custom`].
    pub fn build(name: &str, args: &[String], params: Parameters) -> Result<Consequence> {
        Ok(match ConsequenceKind::from_name(name) {
            ConsequenceKind::Throttle => Self::Throttle(Throttle::new(params, args)?),
            ConsequenceKind::Warn => Self::Warn(Warn::new(params, args)),
            ConsequenceKind::Disallow => Self::Disallow(Disallow::new(params, args)),
            ConsequenceKind::Block => Self::Block(Block::new(params, args)?),
            ConsequenceKind::RangeBlock => Self::RangeBlock(RangeBlock::new(params)),
            ConsequenceKind::Degroup => Self::Degroup(Degroup::new(params)),
            ConsequenceKind::BlockAutopromote => {
                Self::BlockAutopromote(BlockAutopromote::new(params, args)?)
            }
            ConsequenceKind::Tag => Self::Tag(Tag::new(params, args)),
            ConsequenceKind::Custom => Self::Custom(Custom::new(params, name, args)),
        })
    }

    pub fn kind(&self) -> ConsequenceKind {
        match self {
            Self::Throttle(_) => ConsequenceKind::Throttle,
            Self::Warn(_) => ConsequenceKind::Warn,
            Self::Disallow(_) => ConsequenceKind::Disallow,
            Self::Block(_) => ConsequenceKind::Block,
            Self::RangeBlock(_) => ConsequenceKind::RangeBlock,
            Self::Degroup(_) => ConsequenceKind::Degroup,
            Self::BlockAutopromote(_) => ConsequenceKind::BlockAutopromote,
            Self::Tag(_) => ConsequenceKind::Tag,
            Self::Custom(_) => ConsequenceKind::Custom,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Throttle(_) => "throttle",
            Self::Warn(_) => "warn",
            Self::Disallow(_) => "disallow",
            Self::Block(_) => "block",
            Self::RangeBlock(_) => "rangeblock",
            Self::Degroup(_) => "degroup",
            Self::BlockAutopromote(_) => "blockautopromote",
            Self::Tag(_) => "tag",
            Self::Custom(c) => &c.name,
        }
    }

    pub fn params(&self) -> &Parameters {
        match self {
            Self::Throttle(c) => &c.params,
            Self::Warn(c) => &c.params,
            Self::Disallow(c) => &c.params,
            Self::Block(c) => &c.params,
            Self::RangeBlock(c) => &c.params,
            Self::Degroup(c) => &c.params,
            Self::BlockAutopromote(c) => &c.params,
            Self::Tag(c) => &c.params,
            Self::Custom(c) => &c.params,
        }
    }

    pub fn sort(&self) -> u32 {
        self.kind().sort()
    }

    /// Read-only check run before anything executes. Always `false` for
    /// consequences that are not disablers.
    pub fn should_disable_other_consequences(&mut self, ctx: &ExecContext<'_>) -> Result<bool> {
        match self {
            Self::Throttle(t) => t.should_disable_other_consequences(ctx),
            Self::Warn(w) => w.should_disable_other_consequences(ctx),
            _ => Ok(false),
        }
    }

    /// Carries out the consequence. Returns whether it took effect.
    pub fn execute(&mut self, ctx: &mut ExecContext<'_>) -> Result<bool> {
        match self {
            Self::Throttle(t) => t.execute(ctx),
            Self::Warn(w) => w.execute(ctx),
            Self::Disallow(_) => Ok(true),
            Self::Block(b) => b.execute(ctx),
            Self::RangeBlock(r) => r.execute(ctx),
            Self::Degroup(d) => d.execute(ctx),
            Self::BlockAutopromote(b) => b.execute(ctx),
            Self::Tag(t) => t.execute(ctx),
            Self::Custom(c) => c.execute(ctx),
        }
    }

    pub fn message(&self) -> Option<ConsequenceMessage> {
        let key = match self {
            Self::Warn(w) => w.message.clone(),
            Self::Disallow(d) => d.message.clone(),
            Self::Block(_) | Self::RangeBlock(_) => "abusefilter-blocked-display".to_string(),
            Self::Degroup(_) => "abusefilter-degrouped".to_string(),
            Self::BlockAutopromote(_) => "abusefilter-autopromote-blocked".to_string(),
            Self::Throttle(_) | Self::Tag(_) | Self::Custom(_) => return None,
        };
        let params = self.params();
        Some(ConsequenceMessage {
            key,
            params: vec![params.filter_name.clone(), params.filter.to_string()],
        })
    }
}
