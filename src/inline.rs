//! Inline `key = value` bodies: single-line objects, navigation chains,
//! multi-key fan-out and the append operator.

use crate::error::LaconError;
use crate::grammar::{is_numeric_literal, KEY_POSITIONS};
use crate::resolver::{self, ImportStack};
use crate::utils::{is_balanced, unescape_string, unwrap_quotes};
use crate::value::{descend, ensure_object, merge_into_map, push_flattened, Map, Number, Value};
use crate::vars::{resolve_variables, VariableRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static EMPTY_OBJECT_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"=?\s*\{\}").unwrap());
static EMPTY_ARRAY_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"=?\s*\[\]").unwrap());

/// Everything a value expression needs to evaluate: the variable registry
/// for `$name` substitution and the import machinery for `@import` values.
pub(crate) struct ValueContext<'a> {
    pub vars: &'a VariableRegistry,
    pub base_dir: &'a Path,
    pub imports: &'a mut ImportStack,
}

impl ValueContext<'_> {
    /// Parses one value expression. Handles quoted and bare strings,
    /// booleans, `auto`, numbers, inline `{...}` objects, inline `[...]`
    /// arrays and `@import` / `@import...` forms.
    pub(crate) fn parse_value(&mut self, raw: &str) -> Result<Value, LaconError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Value::String(String::new()));
        }
        let resolved = resolve_variables(trimmed, self.vars);

        if let Some(rest) = resolved.strip_prefix("@import...") {
            let path_text = match resolved.find('=') {
                Some(eq) => &resolved[eq + 1..],
                None => rest,
            };
            let imported = self.resolve_import(path_text.trim())?;
            return Ok(Value::Spread(Box::new(imported)));
        }
        if let Some(rest) = resolved.strip_prefix("@import") {
            let path_text = match resolved.find('=') {
                Some(eq) => &resolved[eq + 1..],
                None => rest,
            };
            return self.resolve_import(path_text.trim());
        }

        if resolved.len() >= 2 && resolved.starts_with('"') && resolved.ends_with('"') {
            return Ok(Value::String(unescape_string(
                &resolved[1..resolved.len() - 1],
            )));
        }
        if resolved == "true" {
            return Ok(Value::Bool(true));
        }
        if resolved == "false" {
            return Ok(Value::Bool(false));
        }
        if resolved == "auto" {
            return Ok(Value::String("auto".to_string()));
        }

        if resolved.starts_with('{') && resolved.ends_with('}') {
            let mut object = Map::new();
            self.parse_inline_pairs(resolved[1..resolved.len() - 1].trim(), &mut object, false)?;
            return Ok(Value::Object(object));
        }
        if resolved.starts_with('[') && resolved.ends_with(']') {
            let inner = resolved[1..resolved.len() - 1].trim();
            if inner.is_empty() {
                return Ok(Value::Array(Vec::new()));
            }
            let mut items = Vec::new();
            for piece in split_array_items(inner) {
                let parsed = self.parse_value(piece)?;
                push_flattened(&mut items, parsed);
            }
            return Ok(Value::Array(items));
        }

        if is_numeric_literal(&resolved) {
            return Ok(Value::Number(
                Number::from_literal(&resolved)
                    .expect("numeral already vetted by is_numeric_literal"),
            ));
        }
        Ok(Value::String(unescape_string(&resolved)))
    }

    /// Parses a body holding one or more assignments into `target`.
    ///
    /// Key positions are located with [`KEY_POSITIONS`]; a candidate only
    /// counts when the text before it is bracket-balanced and outside any
    /// quoted span. Text before the first key opens a nested sub-target.
    /// Without any `=`, the body is either a bare boolean flag or a
    /// space-separated `key value` pair. `overwrite` guards only the flag
    /// rule: a flag never clobbers an existing container unless set.
    pub(crate) fn parse_inline_pairs(
        &mut self,
        text: &str,
        target: &mut Map,
        overwrite: bool,
    ) -> Result<(), LaconError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        if trimmed.starts_with("@import") {
            let imported = self.parse_value(trimmed)?;
            merge_into_map(target, imported);
            return Ok(());
        }

        if trimmed.ends_with("{}") {
            let key = EMPTY_OBJECT_KEY.replace(trimmed, "").trim().to_string();
            target.insert(key, Value::empty_object());
            return Ok(());
        }
        if trimmed.ends_with("[]") {
            let key = EMPTY_ARRAY_KEY.replace(trimmed, "").trim().to_string();
            target.insert(key, Value::Array(Vec::new()));
            return Ok(());
        }

        if trimmed.contains('=') {
            struct KeySpan<'t> {
                key: &'t str,
                start: usize,
                value_start: usize,
                is_multi: bool,
                is_import: bool,
            }
            let mut spans: Vec<KeySpan> = Vec::new();
            for caps in KEY_POSITIONS.captures_iter(trimmed) {
                let whole = caps.get(0).unwrap();
                let token = caps.get(1).unwrap();
                if !is_balanced(&trimmed[..token.start()]) {
                    continue;
                }
                let raw_key = token.as_str();
                let key = raw_key.strip_prefix('[').unwrap_or(raw_key);
                let key = key.strip_suffix(']').unwrap_or(key);
                spans.push(KeySpan {
                    key,
                    start: token.start(),
                    value_start: whole.end(),
                    is_multi: raw_key.starts_with('['),
                    is_import: raw_key.starts_with("@import"),
                });
            }

            if !spans.is_empty() {
                let head = trimmed[..spans[0].start].trim();
                let scoped: &mut Map = if head.is_empty() {
                    target
                } else {
                    ensure_object(target, head)
                };
                for i in 0..spans.len() {
                    let span = &spans[i];
                    let raw_val = match spans.get(i + 1) {
                        Some(next) => &trimmed[span.value_start..next.start],
                        None => &trimmed[span.value_start..],
                    }
                    .trim();

                    if span.is_import {
                        let command = format!("{}={}", span.key, raw_val);
                        let imported = self.parse_value(&command)?;
                        merge_into_map(scoped, imported);
                    } else if span.is_multi {
                        let keys: Vec<&str> = span.key.split(',').map(str::trim).collect();
                        self.assign_multi_values(&keys, raw_val, scoped)?;
                    } else {
                        match self.parse_value(raw_val)? {
                            Value::Spread(inner) => match *inner {
                                Value::Object(fields) => {
                                    merge_into_map(scoped, Value::Object(fields));
                                }
                                other => {
                                    scoped.insert(span.key.to_string(), other);
                                }
                            },
                            plain => {
                                scoped.insert(span.key.to_string(), plain);
                            }
                        }
                    }
                }
                return Ok(());
            }
        }

        match trimmed.find(char::is_whitespace) {
            None => {
                if !overwrite
                    && matches!(
                        target.get(trimmed),
                        Some(Value::Object(_)) | Some(Value::Array(_))
                    )
                {
                    return Ok(());
                }
                target.insert(trimmed.to_string(), Value::Bool(true));
            }
            Some(space) => {
                let key = &trimmed[..space];
                let remaining = trimmed[space..].trim();
                let is_multi_key = remaining.starts_with('[') && remaining.contains("]=");
                let has_assignment = remaining.contains('=') && !remaining.starts_with('"');
                let is_bracketed = remaining.starts_with('[') && remaining.ends_with(']');
                if (has_assignment || is_multi_key) && !is_bracketed {
                    let sub = ensure_object(target, key);
                    self.parse_inline_pairs(remaining, sub, overwrite)?;
                } else {
                    let parsed = self.parse_value(remaining)?.unwrap_spread();
                    target.insert(key.to_string(), parsed);
                }
            }
        }
        Ok(())
    }

    /// Dispatches a cleaned normal-mode line that reached the fallback
    /// rule: append (`+`), navigation (`>`), or a plain inline body.
    pub(crate) fn process_complex_line(
        &mut self,
        line: &str,
        scope: &mut Map,
    ) -> Result<(), LaconError> {
        if let Some(plus) = find_append_operator(line) {
            let key_path = line[..plus].trim();
            let value = line[plus + 1..].trim();
            if contains_unquoted(key_path, '>') {
                let parts = split_unquoted(key_path, '>');
                let leaf = descend(scope, &parts[..parts.len() - 1]);
                self.append_value(leaf, parts[parts.len() - 1], value)?;
            } else {
                self.append_value(scope, key_path, value)?;
            }
            return Ok(());
        }

        if contains_unquoted(line, '>') {
            let parts = split_unquoted(line, '>');
            let scoped = descend(scope, &parts[..parts.len() - 1]);
            let last = parts[parts.len() - 1];
            let overwrite = !last.ends_with("{}")
                && !last.ends_with("[]")
                && (last.contains('=') || last.contains(' '));
            self.parse_inline_pairs(last, scoped, overwrite)?;
            return Ok(());
        }

        self.parse_inline_pairs(line, scope, true)
    }

    /// Fans one parsed value out over a bracketed key list. An array value
    /// whose length matches the key count assigns element-wise; anything
    /// else is broadcast to every key. A key ending in `*` sets a running
    /// prefix applied to the bare suffixes after it.
    pub(crate) fn assign_multi_values(
        &mut self,
        keys: &[&str],
        raw_value: &str,
        target: &mut Map,
    ) -> Result<(), LaconError> {
        let parsed = self.parse_value(raw_value)?.unwrap_spread();

        let mut prefix = String::new();
        let mut expanded = Vec::with_capacity(keys.len());
        for raw_key in keys {
            let name = raw_key.trim();
            if let Some(stripped) = name.strip_suffix('*') {
                prefix = stripped.to_string();
                expanded.push(prefix.clone());
            } else if name.contains('*') {
                let mut pieces = name.split('*');
                let head = pieces.next().unwrap_or("");
                let tail = pieces.next().unwrap_or("");
                prefix = head.to_string();
                expanded.push(format!("{head}{tail}"));
            } else if !prefix.is_empty() {
                expanded.push(format!("{prefix}{name}"));
            } else {
                expanded.push(name.to_string());
            }
        }

        match parsed {
            Value::Array(items) if items.len() == expanded.len() => {
                for (key, item) in expanded.into_iter().zip(items) {
                    target.insert(key, item);
                }
            }
            value => {
                for key in expanded {
                    target.insert(key, value.clone());
                }
            }
        }
        Ok(())
    }

    /// `path + value`: push onto an array, newline-concatenate onto a
    /// non-empty string, otherwise assign.
    pub(crate) fn append_value(
        &mut self,
        target: &mut Map,
        key: &str,
        raw: &str,
    ) -> Result<(), LaconError> {
        let parsed = self.parse_value(raw)?;
        if !target.contains_key(key) {
            target.insert(key.to_string(), parsed.unwrap_spread());
            return Ok(());
        }
        match target.get_mut(key) {
            Some(Value::Array(items)) => push_flattened(items, parsed),
            Some(Value::String(existing)) => {
                let rendered = render_appended(parsed)?;
                if existing.is_empty() {
                    *existing = rendered;
                } else {
                    existing.push('\n');
                    existing.push_str(&rendered);
                }
            }
            Some(slot) => *slot = parsed.unwrap_spread(),
            None => {}
        }
        Ok(())
    }

    fn resolve_import(&mut self, raw_path: &str) -> Result<Value, LaconError> {
        let path = unwrap_quotes(raw_path);
        let full = resolver::resolve_path(self.base_dir, path);
        resolver::compile_file_inner(&full, self.imports)
    }
}

/// Text form a value takes when appended onto an existing string.
fn render_appended(value: Value) -> Result<String, LaconError> {
    Ok(match value.unwrap_spread() {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_json::to_string(&other)?,
    })
}

/// Splits inline array items at top-level commas, tracking bracket depth
/// and quoted spans.
fn split_array_items(inner: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut prev = '\0';
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        if c == '"' && prev != '\\' {
            in_quotes = !in_quotes;
        }
        if !in_quotes {
            match c {
                '[' | '{' => depth += 1,
                ']' | '}' => depth -= 1,
                ',' if depth == 0 => {
                    items.push(inner[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            }
        }
        prev = c;
    }
    items.push(inner[start..].trim());
    items
}

/// Position of the append operator, or `None`. A `+` counts only outside
/// quotes and only when the text before it is a single token or the `+`
/// is space-delimited.
fn find_append_operator(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut in_quotes = false;
    let mut prev = '\0';
    for (i, c) in line.char_indices() {
        if c == '"' && prev != '\\' {
            in_quotes = !in_quotes;
        }
        if !in_quotes && c == '+' {
            let prefix = line[..i].trim();
            let space_before = i > 0 && bytes[i - 1] == b' ';
            let space_after = bytes.get(i + 1) == Some(&b' ');
            if !prefix.contains(' ') || space_before || space_after {
                return Some(i);
            }
        }
        prev = c;
    }
    None
}

fn contains_unquoted(text: &str, needle: char) -> bool {
    let mut in_quotes = false;
    let mut prev = '\0';
    for c in text.chars() {
        if c == '"' && prev != '\\' {
            in_quotes = !in_quotes;
        } else if c == needle && !in_quotes {
            return true;
        }
        prev = c;
    }
    false
}

fn split_unquoted(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut prev = '\0';
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if c == '"' && prev != '\\' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            parts.push(text[start..i].trim());
            start = i + c.len_utf8();
        }
        prev = c;
    }
    parts.push(text[start..].trim());
    parts
}
