//! The LACON line grammar as one ordered rule list.
//!
//! Every pattern that classifies a cleaned (comment-stripped, trimmed) line
//! lives here, compiled once. [`classify`] tries the structural rules in the
//! fixed dispatch priority: variable definition, array open, multiline open,
//! block open, multi-key assignment. Lines matching none of them fall through
//! to the inline-pair fallback in the parser.

use once_cell::sync::Lazy;
use regex::Regex;

/// `$name value` / `$name = value`.
static VAR_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$([\p{L}0-9._-]+)\s*=?\s*(.+)$").unwrap());

/// `key [` / `key = [` opening an array block.
static ARRAY_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\p{L}0-9._-]+)\s*=?\s*\[\s*$").unwrap());

/// `key (` / `key @(` opening a quoted or raw multiline block.
static MULTILINE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\p{L}0-9._-]+)\s*=?\s*(@?\()\s*$").unwrap());

/// `key {` / `key1 > key2 {` opening an explicit scope.
static BLOCK_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\p{L}0-9._-]+)\s*(?:>\s*([\p{L}0-9._-]+)\s*)?=?\s*\{\s*$").unwrap()
});

/// `[a, b, c] = value` fan-out assignment.
static MULTI_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([\p{L}0-9\s,.*_-]+)\]\s*=?\s*(.+)$").unwrap());

/// `@import PATH`, path either double-quoted or bare.
static IMPORT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^@import\s+(=)?\s*(?:"([^"]+)"|([^\s"{}|\[\]]+))"#).unwrap());

/// `@export value` (the value may not be empty).
static EXPORT_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@export\s+(.+)$").unwrap());

/// `@export (` / `@export = @(` opening a multiline export.
static EXPORT_MULTILINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@export\s*=?\s*(@?\()\s*$").unwrap());

/// `@export [` opening an array export.
static EXPORT_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@export\s*=?\s*\[\s*$").unwrap());

/// `@export {` opening a block export.
static EXPORT_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@export\s*=?\s*\{\s*$").unwrap());

/// Key-start positions inside an inline-pair body: `identifier =`,
/// `[multi, key] =` or `@import...` followed by `=`, each preceded by start
/// of text or whitespace.
pub(crate) static KEY_POSITIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s+)([\p{L}0-9._-]+|\[[\p{L}0-9\s,.*_-]+\]|@import(?:\.\.\.)?)\s*=")
        .unwrap()
});

/// Integer or decimal numeral with optional leading minus.
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").unwrap());

/// Structural classification of one cleaned line.
#[derive(Debug, PartialEq)]
pub(crate) enum LineRule<'a> {
    VarDef { name: &'a str, value: &'a str },
    ArrayOpen { key: &'a str },
    MultilineOpen { key: &'a str, raw: bool },
    BlockOpen { key: &'a str, subkey: Option<&'a str> },
    MultiKey { keys: &'a str, value: &'a str },
}

/// `@export` line forms, tried only when the line starts with `@export`.
#[derive(Debug, PartialEq)]
pub(crate) enum ExportRule<'a> {
    Multiline { raw: bool },
    Array,
    Block,
    Value(&'a str),
}

/// Tries the structural rules in dispatch priority and returns the first
/// match. The order is part of the language contract, not an accident of
/// pattern overlap.
pub(crate) fn classify(line: &str) -> Option<LineRule<'_>> {
    if let Some(caps) = VAR_DEF.captures(line) {
        return Some(LineRule::VarDef {
            name: caps.get(1).unwrap().as_str(),
            value: caps.get(2).unwrap().as_str(),
        });
    }
    if let Some(caps) = ARRAY_OPEN.captures(line) {
        return Some(LineRule::ArrayOpen {
            key: caps.get(1).unwrap().as_str(),
        });
    }
    if let Some(caps) = MULTILINE_OPEN.captures(line) {
        return Some(LineRule::MultilineOpen {
            key: caps.get(1).unwrap().as_str(),
            raw: caps.get(2).unwrap().as_str().starts_with('@'),
        });
    }
    if let Some(caps) = BLOCK_OPEN.captures(line) {
        return Some(LineRule::BlockOpen {
            key: caps.get(1).unwrap().as_str(),
            subkey: caps.get(2).map(|m| m.as_str()),
        });
    }
    if let Some(caps) = MULTI_KEY.captures(line) {
        return Some(LineRule::MultiKey {
            keys: caps.get(1).unwrap().as_str(),
            value: caps.get(2).unwrap().as_str(),
        });
    }
    None
}

/// Classifies an `@export` line. `Value` is tried last: its pattern would
/// also match the opener forms.
pub(crate) fn classify_export(line: &str) -> Option<ExportRule<'_>> {
    if let Some(caps) = EXPORT_MULTILINE.captures(line) {
        return Some(ExportRule::Multiline {
            raw: caps.get(1).unwrap().as_str().starts_with('@'),
        });
    }
    if EXPORT_ARRAY.is_match(line) {
        return Some(ExportRule::Array);
    }
    if EXPORT_BLOCK.is_match(line) {
        return Some(ExportRule::Block);
    }
    if let Some(caps) = EXPORT_VALUE.captures(line) {
        return Some(ExportRule::Value(caps.get(1).unwrap().as_str()));
    }
    None
}

/// Extracts the path of an `@import` directive line, if well-formed.
pub(crate) fn import_line_path(line: &str) -> Option<&str> {
    let caps = IMPORT_LINE.captures(line)?;
    caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str())
}

pub(crate) fn is_numeric_literal(text: &str) -> bool {
    NUMBER.is_match(text)
}
