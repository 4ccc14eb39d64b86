//! Identifier-safety layer.
//!
//! Caller-level field identifiers may contain characters the grammar's
//! bare-identifier syntax cannot carry (spaces, punctuation). This module
//! maps such fields to synthetic placeholder names (`X0`, `X1`, ...)
//! guaranteed not to already occur free-standing in the expression text,
//! rewrites the text, and hands the caller the mapping so binding keys
//! can be renamed before `eval`. Occurrences inside single- or
//! double-quoted literals are never rewritten.

use std::collections::HashMap;

use log::debug;
use regex::{Captures, Regex};

use crate::error::{Error, ParseError, ParseResult};
use crate::expression::Expression;
use crate::parser::Parser;

/// A valid bare identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Does `candidate` occur free-standing (outside quoted literals) in
/// `text`? Quote patterns come first in the alternation, so quoted
/// occurrences never reach the capture group.
fn occupied(text: &str, candidate: &str) -> bool {
    let pattern = format!(
        "\"[^\"]+\"|'[^']+'|(?P<var>{})",
        regex::escape(candidate)
    );
    let re = Regex::new(&pattern).expect("escaped candidate always forms a valid pattern");
    let found = re.captures_iter(text).any(|caps| caps.name("var").is_some());
    found
}

/// Builds a bijective mapping from the supplied field identifiers to
/// parser-safe names. Fields that already are valid bare identifiers map
/// to themselves; every other field maps to a fresh placeholder skipping
/// any candidate already occupied in `text`.
pub fn build_identifier_mapping(text: &str, fields: &[&str]) -> HashMap<String, String> {
    let mut mapping = HashMap::new();
    let mut counter = 0usize;
    for field in fields {
        if is_identifier(field) {
            mapping.insert(field.to_string(), field.to_string());
            continue;
        }
        let placeholder = loop {
            let candidate = format!("X{}", counter);
            counter += 1;
            if !occupied(text, &candidate) {
                break candidate;
            }
        };
        mapping.insert(field.to_string(), placeholder);
    }
    mapping
}

/// Applies an identifier mapping to the expression text, replacing only
/// free-standing occurrences of each mapped field.
pub fn rewrite(text: &str, mapping: &HashMap<String, String>) -> String {
    let mut out = text.to_string();
    for (field, placeholder) in mapping {
        if field == placeholder {
            continue;
        }
        let pattern = format!(
            "(\"[^\"]+\")|('[^']+')|({})",
            regex::escape(field)
        );
        let re = Regex::new(&pattern).expect("escaped field always forms a valid pattern");
        out = re
            .replace_all(&out, |caps: &Captures| match caps.get(3) {
                Some(_) => placeholder.clone(),
                None => caps[0].to_string(),
            })
            .into_owned();
    }
    if out != text {
        debug!("rewrote field identifiers: {:?} -> {:?}", text, out);
    }
    out
}

/// Engine-owned escape decoding for string literals.
///
/// Handles `\n \t \r \0 \\ \' \"`, `\xNN`, and `\uNNNN`; unknown escapes
/// are preserved verbatim. `column` is the literal's position in the
/// source text, reported on malformed numeric escapes.
pub fn unescape(raw: &str, column: usize) -> ParseResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => return Err(ParseError::new(column, "dangling escape in string literal")),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('x') => out.push(hex_escape(&mut chars, 2, column)?),
            Some('u') => out.push(hex_escape(&mut chars, 4, column)?),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, digits: usize, column: usize) -> ParseResult<char> {
    let mut code = 0u32;
    for _ in 0..digits {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| ParseError::new(column, "malformed escape in string literal"))?;
        code = code * 16 + digit;
    }
    char::from_u32(code)
        .ok_or_else(|| ParseError::new(column, "escape in string literal is not a character"))
}

/// The full field-safe parse pipeline: map, rewrite, parse, and eagerly
/// fold constants. Returns the expression and the original-to-placeholder
/// mapping the caller uses to rename its binding keys before `eval`.
pub fn parse_with_fields(
    parser: &Parser,
    text: &str,
    fields: &[&str],
) -> Result<(Expression, HashMap<String, String>), Error> {
    let mapping = build_identifier_mapping(text, fields);
    let rewritten = rewrite(text, &mapping);
    let expression = parser.parse(&rewritten)?;
    let expression = expression.simplify(&HashMap::new())?;
    Ok((expression, mapping))
}
