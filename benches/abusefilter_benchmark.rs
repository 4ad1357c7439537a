// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::hint::black_box;

use abusefilter::*;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const SPAM_RULE: &str = r#"
    action == "edit" &
    user_editcount < 10 &
    (
        "spam" in lcase(added_lines) |
        added_lines irlike "buy\s+(now|cheap)" |
        ccnorm_contains_any(added_lines, "viagra", "casino")
    )
"#;

fn spam_edit() -> VariableHolder {
    let mut vars = VariableHolder::new();
    vars.set_var("action", "edit");
    vars.set_var("user_name", "192.0.2.7");
    vars.set_var("user_editcount", 3i64);
    vars.set_var("added_lines", vec!["Some text", "Buy cheap v1agra today"]);
    vars
}

fn single_rule(c: &mut Criterion) {
    c.bench_function("syntax check", |b| {
        let engine = Engine::default();
        b.iter(|| engine.check_syntax(black_box(SPAM_RULE)).unwrap())
    });

    c.bench_function("check conditions", |b| {
        let mut engine = Engine::default();
        let mut vars = spam_edit();
        b.iter(|| {
            let matched = engine
                .check_conditions(black_box(SPAM_RULE), &mut vars, &NoSource)
                .unwrap();
            assert!(matched);
        })
    });
}

fn filter_group(c: &mut Criterion) {
    let mut group = c.benchmark_group("run filters");
    for size in [16, 64, 256].iter() {
        group.bench_with_input(BenchmarkId::new("no match", size), size, |b, &size| {
            let config = EngineConfig {
                condition_limit: usize::MAX,
                ..EngineConfig::default()
            };
            let filters: Vec<Filter> = (0..size as u64)
                .map(|i| Filter::new(i, &format!("user_editcount == {} & {SPAM_RULE}", i + 1000)))
                .collect();
            let runner = FilterRunner::new(&config);
            b.iter(|| {
                let mut vars = spam_edit();
                let mut tags = TagCollector::new();
                let result = runner
                    .run(black_box(&filters), &mut vars, &NoSource, &mut tags)
                    .unwrap();
                assert!(result.matched.is_empty());
            })
        });
    }
    group.finish();
}

criterion_group!(benches, single_rule, filter_group);
criterion_main!(benches);
