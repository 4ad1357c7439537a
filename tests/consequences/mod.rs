// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use abusefilter::consequences::parameters::Parameters;
use abusefilter::consequences::{Consequence, ExecContext};
use abusefilter::filter::Actions;
use abusefilter::*;

use abusefilter::consequences::sink::{AuditEntry, BlockRequest};

use core::time::Duration;
use std::rc::Rc;

use anyhow::{bail, Result};

fn anonymous_edit() -> ActionContext {
    ActionContext {
        action: "edit".to_string(),
        user_name: "192.0.2.7".to_string(),
        ip: "192.0.2.7".parse().ok(),
        page: "Sandbox".to_string(),
        ..ActionContext::default()
    }
}

fn registered_edit() -> ActionContext {
    ActionContext {
        action: "edit".to_string(),
        user_name: "Mallory".to_string(),
        user_id: 42,
        user_editcount: 7,
        page: "Sandbox".to_string(),
        ..ActionContext::default()
    }
}

struct Harness {
    config: EngineConfig,
    sink: MemorySink,
    session: MemorySession,
    store: MemoryFilterSource,
    tags: TagCollector,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self {
            config,
            sink: MemorySink::new(),
            session: MemorySession::new(),
            store: MemoryFilterSource::new(),
            tags: TagCollector::new(),
        }
    }

    fn execute(&mut self, matched: &[Filter], action: &ActionContext) -> Result<ExecutionResult> {
        let matched: Vec<&Filter> = matched.iter().collect();
        ConsequencesExecutor::new(&self.config, &self.sink, &self.session).execute(
            &matched,
            &self.store,
            action,
            &mut self.tags,
            None,
        )
    }
}

fn message_keys(result: &ExecutionResult) -> Vec<&str> {
    result.messages.iter().map(|m| m.key.as_str()).collect()
}

#[test]
fn consequences_run_in_priority_order() -> Result<()> {
    let mut h = Harness::new();
    let filters = vec![
        Filter::new(1, "true").with_action("disallow", &[]),
        Filter::new(2, "true").with_action("warn", &[]),
        Filter::new(3, "true").with_action("throttle", &["1", "5,60", "user"]),
    ];
    let result = h.execute(&filters, &anonymous_edit())?;

    assert_eq!(
        message_keys(&result),
        vec!["abusefilter-warning", "abusefilter-disallowed"]
    );
    assert!(result.vetoed);
    assert_eq!(result.taken[&FilterId::local(3)], vec!["throttle"]);
    assert!(result.failures.is_empty());
    Ok(())
}

#[test]
fn engaged_throttle_suppresses_other_consequences() -> Result<()> {
    let mut h = Harness::new();
    let action = anonymous_edit();

    // Two prior hits.
    let counting = vec![Filter::new(1, "true").with_action("throttle", &["7", "2,60", "ip"])];
    for _ in 0..2 {
        let result = h.execute(&counting, &action)?;
        assert_eq!(result.taken[&FilterId::local(1)], vec!["throttle"]);
    }

    let filters = vec![Filter::new(1, "true")
        .with_action("throttle", &["7", "2,60", "ip"])
        .with_action("warn", &[])
        .with_action("disallow", &[])];
    let result = h.execute(&filters, &action)?;

    assert!(result.messages.is_empty());
    assert!(!result.vetoed);
    assert!(!result.taken.contains_key(&FilterId::local(1)));
    assert!(!h.session.has_flag("abusefilter-warned-Sandbox-1"));
    Ok(())
}

#[test]
fn throttle_counts_users_separately() -> Result<()> {
    let mut h = Harness::new();
    let filters = vec![Filter::new(1, "true")
        .with_action("throttle", &["7", "1,60", "user"])
        .with_action("disallow", &[])];

    let first = h.execute(&filters, &registered_edit())?;
    assert!(first.vetoed);

    // One hit reaches the count for this user only.
    let second = h.execute(&filters, &registered_edit())?;
    assert!(!second.vetoed);

    let other = ActionContext {
        user_id: 43,
        ..registered_edit()
    };
    assert!(h.execute(&filters, &other)?.vetoed);
    Ok(())
}

#[test]
fn warning_is_shown_once() -> Result<()> {
    let mut h = Harness::new();
    let filters = vec![Filter::new(1, "true")
        .with_action("warn", &["custom-warning"])
        .with_action("disallow", &[])];
    let action = anonymous_edit();

    let first = h.execute(&filters, &action)?;
    assert_eq!(message_keys(&first), vec!["custom-warning"]);
    assert!(first.vetoed);
    assert!(h.session.has_flag("abusefilter-warned-Sandbox-1"));

    let second = h.execute(&filters, &action)?;
    assert_eq!(message_keys(&second), vec!["abusefilter-disallowed"]);
    assert!(!h.session.has_flag("abusefilter-warned-Sandbox-1"));
    Ok(())
}

#[test]
fn disablers_must_be_prechecked() -> Result<()> {
    let config = EngineConfig::default();
    let sink = MemorySink::new();
    let session = MemorySession::new();
    let mut tags = TagCollector::new();
    let mut ctx = ExecContext {
        config: &config,
        sink: &sink,
        session: &session,
        tags: &mut tags,
    };
    let params = Parameters {
        filter: FilterId::local(1),
        filter_name: "f".to_string(),
        action: Rc::new(anonymous_edit()),
    };

    for (name, args) in [
        ("throttle", vec!["1".to_string(), "2,60".to_string(), "ip".to_string()]),
        ("warn", vec![]),
    ] {
        let mut consequence = Consequence::build(name, &args, params.clone())?;
        let err = consequence.execute(&mut ctx).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InternalError>(),
            Some(InternalError::ConsequenceNotPrechecked(_))
        ));

        consequence.should_disable_other_consequences(&ctx)?;
        consequence.execute(&mut ctx)?;
    }
    Ok(())
}

#[test]
fn only_the_longest_block_is_placed() -> Result<()> {
    let mut h = Harness::new();
    let filters = vec![
        Filter::new(1, "true")
            .with_action("block", &["", "1 day", "1 week"])
            .with_action("disallow", &[]),
        Filter::new(2, "true").with_action("block", &["blocktalk", "infinite", "infinite"]),
        Filter::new(3, "true").with_action("block", &["", "2 hours", "2 hours"]),
    ];
    let result = h.execute(&filters, &anonymous_edit())?;

    let blocks = h.sink.blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].filter, FilterId::local(2));
    assert_eq!(blocks[0].expiry, None);
    assert!(blocks[0].block_talk);
    assert_eq!(blocks[0].target, "192.0.2.7");

    // The block replaces the disallow of filter 1.
    assert_eq!(message_keys(&result), vec!["abusefilter-blocked-display"]);
    assert!(result.vetoed);
    Ok(())
}

#[test]
fn range_blocks_use_the_configured_prefix() -> Result<()> {
    let mut h = Harness::new();
    let filters = vec![Filter::new(1, "true").with_action("rangeblock", &[])];
    h.execute(&filters, &anonymous_edit())?;

    let blocks = h.sink.blocks();
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].range);
    assert_eq!(blocks[0].target, "192.0.0.0/16");
    Ok(())
}

#[test]
fn registered_only_consequences() -> Result<()> {
    let mut h = Harness::new();
    let filters = vec![Filter::new(1, "true")
        .with_action("degroup", &[])
        .with_action("blockautopromote", &["3"])];

    let anon = h.execute(&filters, &anonymous_edit())?;
    assert!(anon.messages.is_empty());
    assert!(h.sink.degrouped().is_empty());

    let registered = h.execute(&filters, &registered_edit())?;
    assert_eq!(
        message_keys(&registered),
        vec!["abusefilter-degrouped", "abusefilter-autopromote-blocked"]
    );
    assert_eq!(h.sink.degrouped(), vec!["Mallory".to_string()]);
    Ok(())
}

#[test]
fn tags_and_custom_actions() -> Result<()> {
    let mut h = Harness::new();
    let filters = vec![Filter::new(1, "true")
        .with_action("tag", &["spam", "bot"])
        .with_action("notify", &["#abuse"])];
    let result = h.execute(&filters, &anonymous_edit())?;

    assert!(!result.vetoed);
    assert!(h.tags.contains("spam"));
    assert!(h.tags.contains("bot"));
    assert_eq!(
        h.sink.custom_actions(),
        vec![("notify".to_string(), vec!["#abuse".to_string()])]
    );
    assert_eq!(h.tags.flush(), vec!["bot".to_string(), "spam".to_string()]);
    Ok(())
}

#[test]
fn locally_disabled_actions_of_global_filters() -> Result<()> {
    let mut h = Harness::with_config(EngineConfig {
        locally_disabled_global_actions: vec!["block".to_string()],
        ..EngineConfig::default()
    });
    let global = FilterFlags {
        enabled: true,
        global: true,
        ..FilterFlags::default()
    };
    let filters = vec![
        Filter::new(1, "true")
            .with_flags(global)
            .with_action("block", &[])
            .with_action("tag", &["global"]),
        Filter::new(2, "true").with_action("block", &[]),
    ];
    let result = h.execute(&filters, &anonymous_edit())?;

    assert!(h.tags.contains("global"));
    let blocks = h.sink.blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].filter, FilterId::local(2));
    assert_eq!(result.taken[&FilterId::global(1)], vec!["tag"]);
    Ok(())
}

#[test]
fn deferred_actions_are_loaded() -> Result<()> {
    let mut h = Harness::new();
    let mut actions = Actions::new();
    actions.insert("disallow".to_string(), vec!["deferred-message".to_string()]);
    h.store.add_deferred(7, actions);

    let filters = vec![Filter::new(1, "true").with_actions_source(ActionsSource::Deferred(7))];
    let result = h.execute(&filters, &anonymous_edit())?;
    assert_eq!(message_keys(&result), vec!["deferred-message"]);
    Ok(())
}

#[test]
fn every_matched_filter_is_audited() -> Result<()> {
    let mut h = Harness::new();
    let filters = vec![
        Filter::new(1, "true").with_name("no actions"),
        Filter::new(2, "true")
            .with_name("broken")
            .with_action("throttle", &["1", "not a rate", "ip"]),
    ];
    h.execute(&filters, &registered_edit())?;

    let audit = h.sink.audit_log();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].filter_name, "no actions");
    assert!(audit[0].actions_taken.is_empty());
    assert_eq!(audit[1].user_name, "Mallory");
    assert_eq!(h.sink.hit_count(FilterId::local(1)), 1);
    assert_eq!(h.sink.hit_count(FilterId::local(2)), 1);
    Ok(())
}

/// Delegates to a `MemorySink` but cannot place blocks.
struct BlocklessSink {
    inner: MemorySink,
}

impl ConsequenceSink for BlocklessSink {
    fn incr_with_init(&self, key: &str, ttl: Duration) -> Result<i64> {
        self.inner.incr_with_init(key, ttl)
    }
    fn get(&self, key: &str) -> Result<Option<i64>> {
        self.inner.get(key)
    }
    fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<()> {
        self.inner.set(key, value, ttl)
    }
    fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key)
    }
    fn block(&self, request: &BlockRequest) -> Result<bool> {
        bail!("block store unavailable for {}", request.target)
    }
    fn degroup(&self, params: &Parameters) -> Result<bool> {
        self.inner.degroup(params)
    }
    fn custom(&self, name: &str, args: &[String], params: &Parameters) -> Result<bool> {
        self.inner.custom(name, args, params)
    }
    fn log_hit(&self, entry: &AuditEntry) -> Result<()> {
        self.inner.log_hit(entry)
    }
    fn bump_hit_count(&self, filter: FilterId) -> Result<()> {
        self.inner.bump_hit_count(filter)
    }
}

#[test]
fn failing_consequence_does_not_stop_the_others() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = EngineConfig::default();
    let sink = BlocklessSink {
        inner: MemorySink::new(),
    };
    let session = MemorySession::new();
    let store = MemoryFilterSource::new();
    let mut tags = TagCollector::new();
    let filters = [
        Filter::new(1, "true")
            .with_action("block", &[])
            .with_action("tag", &["blocked"]),
        Filter::new(2, "true").with_action("disallow", &[]),
    ];
    let matched: Vec<&Filter> = filters.iter().collect();
    let result = ConsequencesExecutor::new(&config, &sink, &session).execute(
        &matched,
        &store,
        &anonymous_edit(),
        &mut tags,
        None,
    )?;

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].0, FilterId::local(1));
    assert_eq!(result.failures[0].1, "block");
    assert!(tags.contains("blocked"));
    assert_eq!(message_keys(&result), vec!["abusefilter-disallowed"]);
    assert!(result.vetoed);

    let audit = sink.inner.audit_log();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].actions_taken, vec!["tag".to_string()]);
    assert_eq!(sink.inner.hit_count(FilterId::local(1)), 1);
    assert_eq!(sink.inner.hit_count(FilterId::local(2)), 1);
    Ok(())
}

#[test]
fn out_of_range_parameters_are_rejected() -> Result<()> {
    let params = Parameters {
        filter: FilterId::local(1),
        filter_name: "f".to_string(),
        action: Rc::new(registered_edit()),
    };
    assert!(
        Consequence::build("blockautopromote", &["300000000000000".to_string()], params).is_err()
    );

    // A throttle period no clock can represent leaves the rest of the filter alone.
    let mut h = Harness::new();
    let rate = format!("2,{}", u64::MAX);
    let filters = vec![Filter::new(1, "true")
        .with_action("throttle", &["1", rate.as_str(), "ip"])
        .with_action("disallow", &[])];
    let result = h.execute(&filters, &anonymous_edit())?;
    assert_eq!(message_keys(&result), vec!["abusefilter-disallowed"]);
    assert_eq!(h.sink.audit_log().len(), 1);
    Ok(())
}
