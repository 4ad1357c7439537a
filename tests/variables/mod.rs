// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use abusefilter::*;

use std::cell::Cell;

use anyhow::{bail, Result};

/// Answers `user_age` and counts how often it was asked.
struct CountingSource {
    calls: Cell<usize>,
}

impl VariableSource for CountingSource {
    fn resolve(
        &self,
        method: &ComputeMethod,
        _: &[Value],
        _: &mut VarLookup<'_>,
    ) -> Result<Value> {
        self.calls.set(self.calls.get() + 1);
        match method {
            ComputeMethod::UserAge => Ok(Value::Int(86400)),
            other => bail!("unexpected computation {other:?}"),
        }
    }
}

#[test]
fn lazy_variable_is_computed_once() -> Result<()> {
    let mut engine = Engine::default();
    let source = CountingSource {
        calls: Cell::new(0),
    };
    let mut vars = VariableHolder::new();
    vars.set_lazy("user_age", ComputeMethod::UserAge, vec![]);

    assert!(engine.check_conditions("user_age > 3600 & user_age < 100000", &mut vars, &source)?);
    assert_eq!(source.calls.get(), 1);

    // The value stays in the holder for later filters.
    assert!(engine.check_conditions("user_age == 86400", &mut vars, &source)?);
    assert_eq!(source.calls.get(), 1);
    Ok(())
}

#[test]
fn unused_lazy_variables_are_not_computed() -> Result<()> {
    let mut engine = Engine::default();
    let source = CountingSource {
        calls: Cell::new(0),
    };
    let mut vars = VariableHolder::new();
    vars.set_lazy("user_age", ComputeMethod::UserAge, vec![]);

    assert!(!engine.check_conditions("false & user_age > 0", &mut vars, &source)?);
    assert_eq!(source.calls.get(), 0);
    Ok(())
}

#[test]
fn intrinsic_computations() -> Result<()> {
    let mut engine = Engine::default();
    let mut vars = VariableHolder::new();
    vars.set_var("old_wikitext", "line one\n");
    vars.set_var("new_wikitext", "line one\nspam link\n");
    vars.set_lazy(
        "new_size",
        ComputeMethod::Length,
        vec![Value::from("new_wikitext")],
    );
    vars.set_lazy(
        "old_size",
        ComputeMethod::Length,
        vec![Value::from("old_wikitext")],
    );
    vars.set_lazy(
        "edit_delta",
        ComputeMethod::SubtractInt,
        vec![Value::from("new_size"), Value::from("old_size")],
    );
    assert!(engine.check_conditions("edit_delta == 10", &mut vars, &NoSource)?);
    Ok(())
}

#[test]
fn var_dump_round_trip() -> Result<()> {
    let config = EngineConfig::default();
    let mut vars = VariableHolder::new();
    vars.set_var("user_name", "Mallory");
    vars.set_var("user_editcount", 12i64);
    vars.set_var("user_age", 1.5f64);
    vars.set_var("user_emailconfirm", true);
    vars.set_var(
        "user_groups",
        Value::from(vec![
            Value::from("*"),
            Value::from(vec![Value::from("nested"), Value::Int(1)]),
        ]),
    );
    vars.set_var("user_unnamed_ip", "192.0.2.7");
    vars.set_lazy("page_age", ComputeMethod::PageAge, vec![]);

    let dump = store_var_dump(&mut vars, &NoSource, &config)?;
    let restored = load_var_dump(&dump)?.values();

    let original = vars.values();
    for name in ["user_name", "user_editcount", "user_age", "user_emailconfirm", "user_groups"] {
        assert!(
            restored[name].strict_eq(&original[name]),
            "{name}: {:?} != {:?}",
            restored[name],
            original[name]
        );
    }
    // Protected variables only record whether they were set.
    assert!(restored["user_unnamed_ip"].strict_eq(&Value::Bool(true)));
    // Pending computations are left out.
    assert!(!restored.contains_key("page_age"));
    Ok(())
}

#[test]
fn var_dump_translates_deprecated_names() -> Result<()> {
    let holder = load_var_dump(r#"{ "article_text": "Sandbox", "old_size": 3 }"#)?;
    let values = holder.values();
    assert!(values["page_title"].strict_eq(&Value::from("Sandbox")));
    assert!(values["old_size"].strict_eq(&Value::Int(3)));
    assert!(!values.contains_key("article_text"));
    Ok(())
}
