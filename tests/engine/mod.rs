// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use abusefilter::*;
use anyhow::Result;

const SPAM_RULE: &str = r#"user_editcount < 10 & "spam" in lcase(added_lines)"#;

fn spam_edit() -> VariableHolder {
    let mut vars = VariableHolder::new();
    vars.set_var("action", "edit");
    vars.set_var("user_name", "192.0.2.7");
    vars.set_var("user_editcount", 3i64);
    vars.set_var("page_prefixedtitle", "Sandbox");
    vars.set_var("added_lines", vec!["Buy SPAM now"]);
    vars
}

#[test]
fn syntax_check() -> Result<()> {
    let engine = Engine::default();
    assert!(engine.check_syntax("1==1")?.is_ok());

    let result = engine.check_syntax("1==")?;
    let Some(error) = result.error else {
        panic!("expected a syntax error");
    };
    assert_eq!(error.position, 3);
    Ok(())
}

#[test]
fn syntax_check_reports_warnings() -> Result<()> {
    let engine = Engine::default();
    let result = engine.check_syntax("x := 1; user_editcount < 10")?;
    assert!(result.is_ok());
    let ids: Vec<_> = result.warnings.iter().map(|w| w.message_id).collect();
    assert_eq!(ids, vec!["unused-variable"]);
    Ok(())
}

#[test]
fn spam_rule_matches() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = Engine::default();
    let mut vars = spam_edit();
    assert!(engine.check_conditions(SPAM_RULE, &mut vars, &NoSource)?);

    vars.set_var("user_editcount", 50i64);
    assert!(!engine.check_conditions(SPAM_RULE, &mut vars, &NoSource)?);
    Ok(())
}

#[test]
fn missing_variables_do_not_match() -> Result<()> {
    let mut engine = Engine::default();
    let mut vars = VariableHolder::new();
    assert!(!engine.check_conditions(SPAM_RULE, &mut vars, &NoSource)?);
    Ok(())
}

#[test]
fn condition_limit_is_an_error_for_single_rules() {
    let mut engine = Engine::new(EngineConfig {
        condition_limit: 2,
        ..EngineConfig::default()
    });
    let mut vars = spam_edit();
    let err = engine
        .check_conditions("1 == 1 & 2 == 2", &mut vars, &NoSource)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LimitError>(),
        Some(LimitError::ConditionLimitReached { limit: 2 })
    ));
}

#[test]
fn calculator_mode() -> Result<()> {
    let mut engine = Engine::default();
    assert!(engine
        .evaluate_expression("1 + 2 * 3")?
        .strict_eq(&Value::Int(7)));
    assert!(engine
        .evaluate_expression("ucase(wiki_name)")?
        .strict_eq(&Value::from("WIKI")));
    assert!(engine.evaluate_expression("user_name")?.is_undefined());
    Ok(())
}

#[test]
fn run_filters_executes_consequences() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let engine = Engine::default();

    let mut store = MemoryFilterSource::new();
    store.add(
        Filter::new(1, SPAM_RULE)
            .with_name("spam")
            .with_action("disallow", &[])
            .with_action("tag", &["spam"]),
    );
    store.add(Filter::new(2, "user_editcount > 1000").with_action("warn", &[]));
    store.add(Filter::new(3, "true").with_group("feedback").with_action("disallow", &[]));

    let sink = MemorySink::new();
    let session = MemorySession::new();
    let host = Host {
        filters: &store,
        variables: &NoSource,
        sink: &sink,
        session: &session,
        cache: None,
    };

    let mut vars = spam_edit();
    let action = ActionContext::from_vars(&vars, 0, None);
    let mut tags = TagCollector::new();
    let outcome = engine.run_filters(&host, &mut vars, "default", &action, &mut tags)?;

    assert_eq!(outcome.matched, vec![FilterId::local(1)]);
    assert!(outcome.vetoed());
    let keys: Vec<_> = outcome
        .consequences
        .messages
        .iter()
        .map(|m| m.key.as_str())
        .collect();
    assert_eq!(keys, vec!["abusefilter-disallowed"]);
    assert_eq!(outcome.consequences.messages[0].params, vec!["spam", "1"]);
    assert!(tags.contains("spam"));

    let audit = sink.audit_log();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].user_name, "192.0.2.7");
    assert_eq!(audit[0].page, "Sandbox");
    assert!(audit[0].var_dump.is_some());
    assert_eq!(sink.hit_count(FilterId::local(1)), 1);
    assert_eq!(sink.hit_count(FilterId::local(3)), 0);
    Ok(())
}

#[test]
fn fail_closed_condition_limit_vetoes() -> Result<()> {
    let engine = Engine::new(EngineConfig {
        condition_limit: 1,
        condition_limit_policy: ConditionLimitPolicy::FailClosed,
        ..EngineConfig::default()
    });
    let mut store = MemoryFilterSource::new();
    store.add(Filter::new(1, "1 == 1 & 2 == 2").with_action("disallow", &[]));

    let sink = MemorySink::new();
    let session = MemorySession::new();
    let host = Host {
        filters: &store,
        variables: &NoSource,
        sink: &sink,
        session: &session,
        cache: None,
    };
    let mut vars = spam_edit();
    let action = ActionContext::from_vars(&vars, 0, None);
    let mut tags = TagCollector::new();
    let outcome = engine.run_filters(&host, &mut vars, "default", &action, &mut tags)?;

    assert!(outcome.matched.is_empty());
    assert!(outcome.run.condition_limit_reached);
    assert!(outcome.vetoed());
    assert!(tags.contains("abusefilter-condition-limit"));
    assert!(sink.audit_log().is_empty());
    Ok(())
}

#[test]
fn fail_open_condition_limit_lets_the_action_through() -> Result<()> {
    let engine = Engine::new(EngineConfig {
        condition_limit: 1,
        ..EngineConfig::default()
    });
    let mut store = MemoryFilterSource::new();
    store.add(Filter::new(1, "1 == 1 & 2 == 2").with_action("disallow", &[]));

    let sink = MemorySink::new();
    let session = MemorySession::new();
    let host = Host {
        filters: &store,
        variables: &NoSource,
        sink: &sink,
        session: &session,
        cache: None,
    };
    let mut vars = spam_edit();
    let action = ActionContext::from_vars(&vars, 0, None);
    let mut tags = TagCollector::new();
    let outcome = engine.run_filters(&host, &mut vars, "default", &action, &mut tags)?;

    assert!(outcome.run.condition_limit_reached);
    assert!(!outcome.vetoed());
    assert!(tags.contains("abusefilter-condition-limit"));
    Ok(())
}

#[test]
fn registered_users_are_degrouped() -> Result<()> {
    let engine = Engine::default();
    let mut store = MemoryFilterSource::new();
    store.add(
        Filter::new(1, SPAM_RULE)
            .with_action("degroup", &[])
            .with_action("throttle", &["1", "1,60", "user"]),
    );

    let sink = MemorySink::new();
    let session = MemorySession::new();
    let host = Host {
        filters: &store,
        variables: &NoSource,
        sink: &sink,
        session: &session,
        cache: None,
    };
    let mut vars = spam_edit();
    vars.set_var("user_name", "Mallory");
    let action = ActionContext::from_vars(&vars, 42, None);
    let mut tags = TagCollector::new();
    engine.run_filters(&host, &mut vars, "default", &action, &mut tags)?;
    assert_eq!(sink.degrouped(), vec!["Mallory".to_string()]);

    // The throttle counted this account, not every registered user.
    let mut vars = spam_edit();
    vars.set_var("user_name", "Trudy");
    let other = ActionContext::from_vars(&vars, 43, None);
    engine.run_filters(&host, &mut vars, "default", &other, &mut tags)?;
    assert_eq!(sink.degrouped(), vec!["Mallory".to_string(), "Trudy".to_string()]);
    Ok(())
}
