// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use abusefilter::*;
use anyhow::Result;

fn run(config: &EngineConfig, filters: &[Filter], tags: &mut TagCollector) -> Result<RunResult> {
    let mut holder = VariableHolder::new();
    holder.set_var("user_editcount", 5i64);
    FilterRunner::new(config).run(filters, &mut holder, &NoSource, tags)
}

#[test]
fn filters_run_in_id_order() -> Result<()> {
    let config = EngineConfig::default();
    let filters = vec![
        Filter::new(9, "user_editcount > 1"),
        Filter::new(2, "user_editcount > 1"),
        Filter::new(4, "user_editcount > 100"),
        Filter::new(3, "true").with_flags(FilterFlags {
            enabled: true,
            global: true,
            ..FilterFlags::default()
        }),
    ];
    let mut tags = TagCollector::new();
    let result = run(&config, &filters, &mut tags)?;
    assert_eq!(
        result.matched,
        vec![FilterId::local(2), FilterId::local(9), FilterId::global(3)]
    );
    assert_eq!(result.profiles.len(), 4);
    assert!(!result.profiles[&FilterId::local(4)].matched);
    assert!(tags.is_empty());
    Ok(())
}

#[test]
fn condition_budget_is_shared_and_enforced() -> Result<()> {
    // Each filter needs three conditions; the budget stops inside the second.
    let config = EngineConfig {
        condition_limit: 5,
        ..EngineConfig::default()
    };
    let filters = vec![
        Filter::new(1, "1 == 1 & 2 == 2"),
        Filter::new(2, "1 == 1 & 2 == 2"),
        Filter::new(3, "true"),
    ];
    let mut tags = TagCollector::new();
    let result = run(&config, &filters, &mut tags)?;

    assert!(result.condition_limit_reached);
    assert_eq!(result.conditions, 5);
    assert_eq!(result.matched, vec![FilterId::local(1)]);
    assert!(result.profiles.contains_key(&FilterId::local(2)));
    assert!(!result.profiles.contains_key(&FilterId::local(3)));
    assert!(tags.contains(&config.condition_limit_tag));
    Ok(())
}

#[test]
fn budget_one_short_of_a_filter() -> Result<()> {
    let config = EngineConfig {
        condition_limit: 2,
        ..EngineConfig::default()
    };
    let filters = vec![Filter::new(1, "1 == 1 & 2 == 2")];
    let mut tags = TagCollector::new();
    let result = run(&config, &filters, &mut tags)?;
    assert!(result.condition_limit_reached);
    assert_eq!(result.conditions, config.condition_limit);
    assert!(result.matched.is_empty());
    Ok(())
}

#[test]
fn evaluation_errors_can_count_as_matches() -> Result<()> {
    let config = EngineConfig {
        evaluation_error_policy: ErrorPolicy::Match,
        ..EngineConfig::default()
    };
    let filters = vec![Filter::new(1, "1 / 0")];
    let mut tags = TagCollector::new();
    let result = run(&config, &filters, &mut tags)?;
    assert_eq!(result.matched, vec![FilterId::local(1)]);
    assert!(result.profiles[&FilterId::local(1)].error.is_some());
    Ok(())
}

#[test]
fn verdicts_are_cached() -> Result<()> {
    let config = EngineConfig::default();
    let cache = MemoryVerdictCache::new();
    let filters = vec![Filter::new(1, "user_editcount == 5"), Filter::new(2, "false")];

    let mut holder = VariableHolder::new();
    holder.set_var("user_editcount", 5i64);
    let runner = FilterRunner::new(&config).with_cache(&cache);

    let mut tags = TagCollector::new();
    let first = runner.run(&filters, &mut holder.clone(), &NoSource, &mut tags)?;
    assert!(!first.cached);
    assert_eq!(cache.len(), 1);

    let second = runner.run(&filters, &mut holder.clone(), &NoSource, &mut tags)?;
    assert!(second.cached);
    assert_eq!(second.matched, first.matched);
    assert_eq!(second.conditions, first.conditions);

    // Different variables miss the cache.
    holder.set_var("user_editcount", 6i64);
    let third = runner.run(&filters, &mut holder, &NoSource, &mut tags)?;
    assert!(!third.cached);
    assert!(third.matched.is_empty());
    assert_eq!(cache.len(), 2);
    Ok(())
}

#[test]
fn only_evaluation_errors_follow_the_error_policy() -> Result<()> {
    let config = EngineConfig {
        evaluation_error_policy: ErrorPolicy::Match,
        ..EngineConfig::default()
    };
    let filters = vec![Filter::new(1, "1 =="), Filter::new(2, "new_size > 0")];
    let mut holder = VariableHolder::new();
    // Each size is computed from the other.
    holder.set_lazy("new_size", ComputeMethod::Length, vec![Value::from("old_size")]);
    holder.set_lazy("old_size", ComputeMethod::Length, vec![Value::from("new_size")]);
    let mut tags = TagCollector::new();
    let result = FilterRunner::new(&config).run(&filters, &mut holder, &NoSource, &mut tags)?;

    assert!(result.matched.is_empty());
    assert!(result.profiles[&FilterId::local(1)].error.is_some());
    let circular = result.profiles[&FilterId::local(2)]
        .error
        .clone()
        .unwrap_or_default();
    assert!(circular.contains("circular"), "{circular}");
    Ok(())
}

#[test]
fn runtime_limit_skips_remaining_filters() -> Result<()> {
    let config = EngineConfig {
        runtime_limit_ms: Some(0),
        ..EngineConfig::default()
    };
    let cache = MemoryVerdictCache::new();
    let filters = vec![
        Filter::new(1, "true"),
        Filter::new(2, "true"),
        Filter::new(3, "true"),
    ];
    let mut holder = VariableHolder::new();
    let mut tags = TagCollector::new();
    let result = FilterRunner::new(&config)
        .with_cache(&cache)
        .run(&filters, &mut holder, &NoSource, &mut tags)?;

    assert!(result.time_limit_reached);
    assert!(result.profiles.len() <= 1);
    assert!(result.matched.len() <= 1);
    // Partial verdicts are not cached.
    assert_eq!(cache.len(), 0);
    Ok(())
}

#[test]
fn slow_filters_are_still_profiled() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = EngineConfig {
        slow_filter_threshold_ms: 0,
        ..EngineConfig::default()
    };
    let filters = vec![Filter::new(1, "1 == 1 & 2 == 2")];
    let mut tags = TagCollector::new();
    let result = run(&config, &filters, &mut tags)?;

    assert_eq!(result.matched, vec![FilterId::local(1)]);
    let profile = &result.profiles[&FilterId::local(1)];
    assert_eq!(profile.conditions, 3);
    assert!(profile.error.is_none());
    Ok(())
}
