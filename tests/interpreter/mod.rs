// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use abusefilter::unstable::*;
use abusefilter::*;

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::Deserialize;
use test_generator::test_resources;

const UNDEFINED: &str = "#undefined";
// A plain yaml null reads as a missing expectation.
const NULL: &str = "#null";

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    rule: String,
    #[serde(default)]
    vars: BTreeMap<String, Value>,
    want_result: Option<Value>,
    error: Option<String>,
    conditions: Option<usize>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn eval_case(case: &TestCase) -> Result<(Value, usize)> {
    let mut holder = VariableHolder::new();
    for (name, value) in &case.vars {
        holder.set_var(name, value.clone());
    }
    let source = Source::from_contents("<case>".to_string(), case.rule.clone())?;
    let rule = parse(&source)?;
    let mut counter = ConditionCounter::new(1000);
    let mut regex = RegexCache::new(16);
    let value = Interpreter::new(&mut holder, &NoSource, &mut counter, &mut regex).evaluate(&rule)?;
    Ok((value, counter.consumed()))
}

fn matches_expected(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::String(s) if &**s == UNDEFINED => actual.is_undefined(),
        Value::String(s) if &**s == NULL => actual.is_null(),
        _ => actual.strict_eq(expected),
    }
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("case {} ", case.note);
        match (eval_case(case), &case.want_result, &case.error) {
            (Ok((actual, conditions)), Some(expected), None) => {
                if !matches_expected(&actual, expected) {
                    bail!("{}: expected {expected:?}, got {actual:?}", case.note);
                }
                if let Some(want) = case.conditions {
                    if want != conditions {
                        bail!("{}: expected {want} conditions, got {conditions}", case.note);
                    }
                }
            }
            (Err(e), None, Some(id)) => {
                let Some(err) = e.downcast_ref::<UserVisibleError>() else {
                    bail!("{}: expected user error {id}, got {e}", case.note);
                };
                if err.message_id != id {
                    bail!("{}: expected {id}, got {}", case.note, err.message_id);
                }
            }
            (Ok((actual, _)), _, Some(id)) => {
                bail!("{}: expected error {id}, got {actual:?}", case.note)
            }
            (Err(e), _, _) => bail!("{}: unexpected error {e}", case.note),
            (Ok(_), None, None) => bail!("{}: case has no expectation", case.note),
        }
        println!("passed");
    }
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            println!();
            bail!("{file} failed: {e}");
        }
    }
}

#[test_resources("tests/interpreter/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
