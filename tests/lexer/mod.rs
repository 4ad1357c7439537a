// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use abusefilter::unstable::*;
use abusefilter::{UserVisibleError, Value};
use anyhow::Result;

fn lex(text: &str) -> Result<Vec<Token>> {
    tokenize(&Source::from_contents("<test>".to_string(), text.to_string())?)
}

fn kinds(text: &str) -> Result<Vec<TokenKind>> {
    Ok(lex(text)?.iter().map(|t| t.0).collect())
}

fn error_id(text: &str) -> Option<&'static str> {
    lex(text)
        .err()
        .and_then(|e| e.downcast_ref::<UserVisibleError>().map(|u| u.message_id))
}

#[test]
fn operators_use_longest_match() -> Result<()> {
    let tokens = lex("a !== b != !c === d == e := f ** g")?;
    let ops: Vec<String> = tokens
        .iter()
        .filter(|t| t.0 == TokenKind::Operator)
        .map(|t| t.text())
        .collect();
    assert_eq!(ops, vec!["!==", "!=", "!", "===", "==", ":=", "**"]);
    Ok(())
}

#[test]
fn punctuation_and_comments() -> Result<()> {
    assert_eq!(
        kinds("f( [1, 2] ) /* note */ ;")?,
        vec![
            TokenKind::Identifier,
            TokenKind::LParen,
            TokenKind::LBracket,
            TokenKind::IntLiteral,
            TokenKind::Comma,
            TokenKind::IntLiteral,
            TokenKind::RBracket,
            TokenKind::RParen,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
    Ok(())
}

#[test]
fn numbers_and_radix_suffixes() -> Result<()> {
    let values: Vec<Value> = lex("10 1.5 .5 101b 17o 1fx")?
        .into_iter()
        .filter(|t| t.0 != TokenKind::Eof)
        .map(|t| t.2)
        .collect();
    assert_eq!(
        values,
        vec![
            Value::Int(10),
            Value::Float(1.5),
            Value::Float(0.5),
            Value::Int(5),
            Value::Int(15),
            Value::Int(31),
        ]
    );
    Ok(())
}

#[test]
fn invalid_digits_lex_as_identifiers() -> Result<()> {
    assert_eq!(kinds("19o")?, vec![TokenKind::Identifier, TokenKind::Eof]);
    assert_eq!(kinds("added_lines")?, vec![TokenKind::Identifier, TokenKind::Eof]);
    Ok(())
}

#[test]
fn keywords_are_case_insensitive() -> Result<()> {
    let tokens = lex("A IN b LIKE c")?;
    assert_eq!(tokens[1].0, TokenKind::Keyword);
    assert_eq!(tokens[1].text(), "in");
    assert_eq!(tokens[3].text(), "like");
    Ok(())
}

#[test]
fn string_escapes() -> Result<()> {
    let tokens = lex(r#""a\nb" 'it\'s' "\x41\q""#)?;
    assert_eq!(tokens[0].2, Value::from("a\nb"));
    assert_eq!(tokens[1].2, Value::from("it's"));
    assert_eq!(tokens[2].2, Value::from("A\\q"));
    Ok(())
}

#[test]
fn lexical_errors() {
    assert_eq!(error_id("'abc"), Some("unclosedstring"));
    assert_eq!(error_id("1 /* open"), Some("unclosedcomment"));
    assert_eq!(error_id(r#""\xZZ""#), Some("invalidescape"));
    assert_eq!(error_id("a # b"), Some("unrecognisedtoken"));
}

#[test]
fn positions_count_characters() -> Result<()> {
    let tokens = lex("'é' == x")?;
    assert_eq!(tokens[1].1.pos, 4);
    assert_eq!(tokens[2].1.pos, 7);
    Ok(())
}
