// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use abusefilter::Value;
use anyhow::Result;
use core::cmp::Ordering;

fn s(text: &str) -> Value {
    Value::from(text)
}

#[test]
fn loose_equality() {
    assert!(s("10").loose_eq(&s("1e1")));
    assert!(s("abc").loose_eq(&Value::Int(0)));
    assert!(Value::Int(1).loose_eq(&Value::Float(1.0)));
    assert!(s("1").loose_eq(&Value::Bool(true)));
    assert!(Value::Null.loose_eq(&s("")));
    assert!(!Value::Null.loose_eq(&s("0")));
    assert!(!s("abc").loose_eq(&s("ABC")));
    assert!(s(" 1").loose_eq(&Value::Int(1)));
    assert!(s(" 10").loose_eq(&s("10")));
    assert!(!s("10 ").loose_eq(&s("10")));
}

#[test]
fn array_equality_is_element_wise() {
    let a = Value::from(vec![Value::Int(1), Value::Int(2)]);
    let b = Value::from(vec![Value::Int(1), Value::Int(2)]);
    let c = Value::from(vec![Value::Int(2), Value::Int(1)]);
    assert!(a.loose_eq(&b));
    assert!(!a.loose_eq(&c));
    assert!(a.strict_eq(&b));
}

#[test]
fn strict_equality_checks_types() {
    assert!(!Value::Int(1).strict_eq(&Value::Float(1.0)));
    assert!(!s("1").strict_eq(&Value::Int(1)));
    assert!(Value::Null.strict_eq(&Value::Null));
}

#[test]
fn ordering() {
    assert_eq!(s("9").loose_cmp(&s("10")), Some(Ordering::Less));
    assert_eq!(s("b").loose_cmp(&s("a")), Some(Ordering::Greater));
    assert_eq!(
        Value::from(vec![Value::Int(1)]).loose_cmp(&Value::Int(100)),
        Some(Ordering::Greater)
    );
    assert_eq!(Value::Float(f64::NAN).loose_cmp(&Value::Int(1)), None);
}

#[test]
fn truthiness() {
    assert!(!s("0").to_bool());
    assert!(s("0.0").to_bool());
    assert!(!s("").to_bool());
    assert!(!Value::new_array().to_bool());
    assert!(Value::Float(0.5).to_bool());
    assert!(!Value::Undefined.to_bool());
}

#[test]
fn string_conversion() {
    assert_eq!(Value::Float(2.0).to_af_string(), "2");
    assert_eq!(Value::Float(0.5).to_af_string(), "0.5");
    assert_eq!(Value::Bool(true).to_af_string(), "1");
    assert_eq!(Value::Bool(false).to_af_string(), "");
    assert_eq!(Value::from(vec!["a", "b"]).to_af_string(), "a\nb\n");
}

#[test]
fn numeric_conversion() {
    assert_eq!(s("12abc").to_int(), 12);
    assert_eq!(s("abc").to_int(), 0);
    assert_eq!(s("1.5").to_float(), 1.5);
    assert_eq!(Value::from(vec!["a", "b", "c"]).to_int(), 3);
    assert_eq!(s("12abc").to_arith_number().map(|n| n.as_i64()), Some(12));
    assert!(Value::new_array().to_arith_number().is_none());
}

#[test]
fn json_round_trip() -> Result<()> {
    let v = Value::from_json_str(r#"{"a": [1, 2.5, "x", true, null]}"#)?;
    let items = v.as_array()?;
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0],
        Value::from(vec![
            Value::Int(1),
            Value::Float(2.5),
            s("x"),
            Value::Bool(true),
            Value::Null
        ])
    );
    assert_eq!(Value::from_json_str(&v.to_json_str()?)?, v);
    Ok(())
}
