// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use abusefilter::unstable::*;
use abusefilter::{UserVisibleError, Value};
use anyhow::Result;

fn parse_text(text: &str) -> Result<Rule> {
    parse(&Source::from_contents("<test>".to_string(), text.to_string())?)
}

fn parse_error(text: &str) -> Option<UserVisibleError> {
    parse_text(text)
        .err()
        .and_then(|e| e.downcast_ref::<UserVisibleError>().cloned())
}

#[test]
fn parsing_is_deterministic() -> Result<()> {
    for text in [
        "user_editcount < 10 & \"spam\" in lcase(added_lines)",
        "x := [1, 2, 3]; x[] := 4; x[0] := 0; count(x) == 4",
        "if a then b else c end; d ? e : f",
        "!(1 + 2 * 3 ** 2 - -4 / 2 % 3 >= 7) ^ true | null",
    ] {
        assert_eq!(parse_text(text)?, parse_text(text)?, "{text}");
    }
    Ok(())
}

#[test]
fn and_binds_tighter_than_or() -> Result<()> {
    let rule = parse_text("a | b & c")?;
    let Expr::Logic { op, rhs, .. } = rule.root.as_ref() else {
        panic!("expected logic node: {:?}", rule.root);
    };
    assert_eq!(*op, LogicOp::Or);
    assert!(matches!(rhs.as_ref(), Expr::Logic { op: LogicOp::And, .. }));
    Ok(())
}

#[test]
fn power_is_left_associative() -> Result<()> {
    let rule = parse_text("2 ** 3 ** 2")?;
    let Expr::Arith { op, lhs, .. } = rule.root.as_ref() else {
        panic!("expected arithmetic node");
    };
    assert_eq!(*op, ArithOp::Pow);
    assert!(matches!(lhs.as_ref(), Expr::Arith { op: ArithOp::Pow, .. }));
    Ok(())
}

#[test]
fn not_applies_to_keyword_expression() -> Result<()> {
    let rule = parse_text("!\"a\" in b")?;
    let Expr::Unary { op, expr, .. } = rule.root.as_ref() else {
        panic!("expected unary node");
    };
    assert_eq!(*op, UnaryOp::Not);
    assert!(matches!(expr.as_ref(), Expr::Keyword { op: KeywordOp::In, .. }));
    Ok(())
}

#[test]
fn assignments_and_sequences() -> Result<()> {
    let rule = parse_text("x := 1; x[] := 2; x[0] := 3;")?;
    let Expr::Sequence { stmts, .. } = rule.root.as_ref() else {
        panic!("expected sequence");
    };
    assert_eq!(stmts.len(), 3);
    assert!(matches!(stmts[0].as_ref(), Expr::Assign { name, .. } if name == "x"));
    assert!(matches!(stmts[1].as_ref(), Expr::IndexAssign { index: None, .. }));
    assert!(matches!(stmts[2].as_ref(), Expr::IndexAssign { index: Some(_), .. }));

    let rule = parse_text("x[0] == 1")?;
    assert!(matches!(rule.root.as_ref(), Expr::Compare { .. }));
    Ok(())
}

#[test]
fn keywords_are_literals_or_operators() -> Result<()> {
    let rule = parse_text("TRUE")?;
    assert!(matches!(
        rule.root.as_ref(),
        Expr::Literal { value: Value::Bool(true), .. }
    ));
    let rule = parse_text("a MATCHES '*x*'")?;
    assert!(matches!(rule.root.as_ref(), Expr::Keyword { op: KeywordOp::Like, .. }));
    Ok(())
}

#[test]
fn empty_rule_is_empty_sequence() -> Result<()> {
    let rule = parse_text("  /* nothing */ ")?;
    assert!(matches!(rule.root.as_ref(), Expr::Sequence { stmts, .. } if stmts.is_empty()));
    Ok(())
}

#[test]
fn error_at_end_of_input() {
    let err = parse_error("1==").map(|e| (e.message_id, e.position));
    assert_eq!(err, Some(("unexpectedtoken", 3)));
}

#[test]
fn syntax_errors() {
    let id = |t| parse_error(t).map(|e| e.message_id);
    assert_eq!(id("(1"), Some("expectednotfound"));
    assert_eq!(id("1 2"), Some("unexpectedatend"));
    assert_eq!(id("()"), Some("unexpectedtoken"));
    assert_eq!(id("if 1 then 2"), Some("expectednotfound"));
    assert_eq!(id("then"), Some("unrecognisedkeyword"));
    assert_eq!(id("in b"), Some("unexpectedtoken"));
}

#[test]
fn errors_render_a_snippet() {
    let Some(err) = parse_error("a &\n  (b") else {
        panic!("expected an error");
    };
    let text = err.to_string();
    assert!(text.contains("Expected a"), "{text}");
    assert!(text.contains("  (b"), "{text}");
}
