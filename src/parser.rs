//! Line-oriented scope engine.
//!
//! Each line is dispatched through one of four mutually exclusive modes
//! (normal, multiline, array, export block); normal-mode lines then run
//! through the structural grammar rules in a fixed priority before
//! falling back to inline-pair parsing.

use crate::error::LaconError;
use crate::grammar::{classify, classify_export, import_line_path, ExportRule, LineRule};
use crate::inline::ValueContext;
use crate::resolver::{self, ImportStack};
use crate::utils::{
    join_quoted_multiline, join_raw_multiline, leading_indent, strip_line_comment,
    unescape_string, unwrap_quotes,
};
use crate::value::{ensure_object, merge_into_map, push_flattened, Map, Value};
use crate::vars::{resolve_variables, VariableRegistry};
use std::mem;
use std::path::PathBuf;

/// A scope opened by a brace or by indentation. The frame owns its map
/// until it closes; attachment into the parent happens at pop time, which
/// always precedes any later sibling write, so insertion order in the
/// parent matches source order.
struct ScopeFrame {
    /// One segment for `key {`, two for `key > sub {`.
    path: Vec<String>,
    map: Map,
    indent: i64,
}

enum Mode {
    Normal,
    /// Collecting lines until a lone `)`. `key` is `None` when the value
    /// targets the export slot.
    Multiline {
        key: Option<String>,
        raw: bool,
        content: Vec<String>,
    },
    /// Collecting items until a lone `]`.
    Array {
        key: Option<String>,
        items: Vec<Value>,
    },
    /// `@export = { ... }`; interior lines accumulate here.
    Block { map: Map },
}

/// Single-document parse state. Created fresh per compile call and per
/// recursive import; only the import stack is shared down the graph.
pub(crate) struct Parser<'a> {
    base_dir: PathBuf,
    imports: &'a mut ImportStack,
    vars: VariableRegistry,
    root: Map,
    frames: Vec<ScopeFrame>,
    mode: Mode,
    export_value: Option<Value>,
    has_export: bool,
    in_comment_block: bool,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(base_dir: PathBuf, imports: &'a mut ImportStack) -> Self {
        Parser {
            base_dir,
            imports,
            vars: VariableRegistry::new(),
            root: Map::new(),
            frames: Vec::new(),
            mode: Mode::Normal,
            export_value: None,
            has_export: false,
            in_comment_block: false,
        }
    }

    /// Runs the whole document and returns its value together with the
    /// variable registry accumulated along the way.
    pub(crate) fn parse_document(
        mut self,
        text: &str,
    ) -> Result<(Value, VariableRegistry), LaconError> {
        let lines: Vec<&str> = text.split('\n').collect();

        for i in 0..lines.len() {
            let current = lines[i].replace('\r', "");
            let trimmed = current.trim();

            if trimmed.is_empty() && !matches!(self.mode, Mode::Multiline { .. }) {
                continue;
            }

            // Directive lines. Inside a block comment they are ordinary
            // comment text, so they are only recognized outside one.
            if !self.in_comment_block {
                if trimmed.starts_with("@import")
                    && !matches!(self.mode, Mode::Multiline { .. } | Mode::Array { .. })
                    && self.process_import_line(trimmed)?
                {
                    continue;
                }
                if matches!(self.mode, Mode::Normal) && trimmed.starts_with("@export") {
                    if let Some(rule) = classify_export(trimmed) {
                        self.open_export(rule)?;
                        continue;
                    }
                }
            }

            if matches!(self.mode, Mode::Multiline { .. }) {
                if trimmed == ")" {
                    self.finish_multiline();
                } else if let Mode::Multiline { content, .. } = &mut self.mode {
                    content.push(current);
                }
                continue;
            }

            if matches!(self.mode, Mode::Block { .. }) {
                if trimmed == "}" {
                    if let Mode::Block { map } = mem::replace(&mut self.mode, Mode::Normal) {
                        self.export_value = Some(Value::Object(map));
                    }
                } else {
                    let clean = strip_line_comment(trimmed).trim();
                    if !clean.is_empty() {
                        if let Mode::Block { map } = &mut self.mode {
                            let mut cx = ValueContext {
                                vars: &self.vars,
                                base_dir: &self.base_dir,
                                imports: &mut *self.imports,
                            };
                            cx.parse_inline_pairs(clean, map, true)?;
                        }
                    }
                }
                continue;
            }

            if matches!(self.mode, Mode::Array { .. }) {
                if trimmed == "]" {
                    self.finish_array();
                } else {
                    let clean = strip_line_comment(trimmed).trim();
                    let item = clean.strip_suffix(',').unwrap_or(clean).trim();
                    if !item.is_empty() {
                        let resolved = resolve_variables(item, &self.vars);
                        let mut cx = ValueContext {
                            vars: &self.vars,
                            base_dir: &self.base_dir,
                            imports: &mut *self.imports,
                        };
                        let parsed = cx.parse_value(&resolved)?;
                        if let Mode::Array { items, .. } = &mut self.mode {
                            push_flattened(items, parsed);
                        }
                    }
                }
                continue;
            }

            if !self.in_comment_block && trimmed.starts_with("/*") {
                if !trimmed.ends_with("*/") {
                    self.in_comment_block = true;
                }
                continue;
            }
            if self.in_comment_block {
                if trimmed.contains("*/") {
                    self.in_comment_block = false;
                }
                continue;
            }

            let clean = strip_line_comment(trimmed).trim();
            if clean.is_empty() {
                continue;
            }
            let indent = leading_indent(&current) as i64;

            // Dedent closes open scopes; an explicit `}` instead pops
            // exactly one regardless of column.
            if clean == "}" {
                if !self.frames.is_empty() {
                    self.pop_frame();
                }
                continue;
            }
            while self
                .frames
                .last()
                .is_some_and(|frame| indent <= frame.indent)
            {
                self.pop_frame();
            }

            match classify(clean) {
                Some(LineRule::VarDef { name, value }) => {
                    let stored = unescape_string(unwrap_quotes(value.trim()));
                    self.vars.insert(name.to_string(), stored);
                }
                Some(LineRule::ArrayOpen { key }) => {
                    self.mode = Mode::Array {
                        key: Some(key.to_string()),
                        items: Vec::new(),
                    };
                }
                Some(LineRule::MultilineOpen { key, raw }) => {
                    self.mode = Mode::Multiline {
                        key: Some(key.to_string()),
                        raw,
                        content: Vec::new(),
                    };
                }
                Some(LineRule::BlockOpen { key, subkey }) => {
                    let mut path = vec![key.to_string()];
                    if let Some(sub) = subkey {
                        path.push(sub.to_string());
                    }
                    self.frames.push(ScopeFrame {
                        path,
                        map: Map::new(),
                        indent,
                    });
                }
                Some(LineRule::MultiKey { keys, value }) => {
                    let list: Vec<&str> = keys.split(',').map(str::trim).collect();
                    let (scope, mut cx) = self.scope_context();
                    cx.assign_multi_values(&list, value, scope)?;
                }
                None => {
                    if self.try_open_implicit(clean, indent, &lines, i) {
                        continue;
                    }
                    let (scope, mut cx) = self.scope_context();
                    cx.process_complex_line(clean, scope)?;
                }
            }
        }

        while !self.frames.is_empty() {
            self.pop_frame();
        }
        let result = if self.has_export {
            self.export_value.take().unwrap_or_else(Value::empty_object)
        } else {
            Value::Object(self.root)
        };
        Ok((result, self.vars))
    }

    // === Directive handling ===

    /// Merges a well-formed `@import` line into the current scope (or the
    /// open export block). Returns false for malformed directives so the
    /// line falls through to ordinary parsing.
    fn process_import_line(&mut self, line: &str) -> Result<bool, LaconError> {
        let resolved = resolve_variables(line, &self.vars);
        let Some(raw_path) = import_line_path(&resolved) else {
            return Ok(false);
        };
        let full = resolver::resolve_path(&self.base_dir, raw_path);
        log::debug!("importing {}", full.display());
        let imported = resolver::compile_file_inner(&full, self.imports)?;
        let target = match &mut self.mode {
            Mode::Block { map } => map,
            _ => match self.frames.last_mut() {
                Some(frame) => &mut frame.map,
                None => &mut self.root,
            },
        };
        merge_into_map(target, imported);
        Ok(true)
    }

    fn open_export(&mut self, rule: ExportRule<'_>) -> Result<(), LaconError> {
        self.has_export = true;
        match rule {
            ExportRule::Block => {
                // The slot is primed immediately so an unterminated block
                // still exports an empty object.
                self.export_value = Some(Value::empty_object());
                self.mode = Mode::Block { map: Map::new() };
            }
            ExportRule::Array => {
                self.mode = Mode::Array {
                    key: None,
                    items: Vec::new(),
                };
            }
            ExportRule::Multiline { raw } => {
                self.mode = Mode::Multiline {
                    key: None,
                    raw,
                    content: Vec::new(),
                };
            }
            ExportRule::Value(text) => {
                let body = text.trim();
                let body = body.strip_prefix('=').map(str::trim).unwrap_or(body);
                let resolved = resolve_variables(body, &self.vars);
                let mut cx = ValueContext {
                    vars: &self.vars,
                    base_dir: &self.base_dir,
                    imports: &mut *self.imports,
                };
                let parsed = cx.parse_value(&resolved)?;
                self.export_value = Some(parsed);
            }
        }
        Ok(())
    }

    // === Mode terminators ===

    fn finish_multiline(&mut self) {
        let Mode::Multiline { key, raw, content } = mem::replace(&mut self.mode, Mode::Normal)
        else {
            return;
        };
        let joined = if raw {
            join_raw_multiline(&content)
        } else {
            join_quoted_multiline(&content)
        };
        let processed = unescape_string(&resolve_variables(&joined, &self.vars));
        match key {
            None => self.export_value = Some(Value::String(processed)),
            Some(k) => {
                let map = self.current_map();
                let appendable = matches!(map.get(&k), Some(Value::String(s)) if !s.is_empty());
                if appendable {
                    if let Some(Value::String(existing)) = map.get_mut(&k) {
                        existing.push('\n');
                        existing.push_str(&processed);
                    }
                } else {
                    map.insert(k, Value::String(processed));
                }
            }
        }
    }

    fn finish_array(&mut self) {
        let Mode::Array { key, items } = mem::replace(&mut self.mode, Mode::Normal) else {
            return;
        };
        match key {
            None => self.export_value = Some(Value::Array(items)),
            Some(k) => {
                self.current_map().insert(k, Value::Array(items));
            }
        }
    }

    // === Scope stack ===

    /// Bare identifier followed by a deeper-indented line opens an
    /// implicit scope keyed by that identifier.
    fn try_open_implicit(&mut self, clean: &str, indent: i64, lines: &[&str], i: usize) -> bool {
        if clean.contains('=') || clean.contains(' ') || clean.contains('>') {
            return false;
        }
        let mut next = i + 1;
        while next < lines.len() && lines[next].trim().is_empty() {
            next += 1;
        }
        let Some(next_line) = lines.get(next) else {
            return false;
        };
        if (leading_indent(next_line) as i64) > indent {
            self.frames.push(ScopeFrame {
                path: vec![clean.to_string()],
                map: Map::new(),
                indent,
            });
            return true;
        }
        false
    }

    fn pop_frame(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let parent = match self.frames.last_mut() {
            Some(above) => &mut above.map,
            None => &mut self.root,
        };
        let ScopeFrame { path, map, .. } = frame;
        let mut segments = path.into_iter();
        match (segments.next(), segments.next()) {
            (Some(key), None) => {
                parent.insert(key, Value::Object(map));
            }
            (Some(key), Some(sub)) => {
                ensure_object(parent, &key).insert(sub, Value::Object(map));
            }
            _ => {}
        }
    }

    fn current_map(&mut self) -> &mut Map {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.map,
            None => &mut self.root,
        }
    }

    fn scope_context(&mut self) -> (&mut Map, ValueContext<'_>) {
        let map = match self.frames.last_mut() {
            Some(frame) => &mut frame.map,
            None => &mut self.root,
        };
        let cx = ValueContext {
            vars: &self.vars,
            base_dir: &self.base_dir,
            imports: &mut *self.imports,
        };
        (map, cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> serde_json::Value {
        let mut imports = ImportStack::new();
        let parser = Parser::new(PathBuf::from("."), &mut imports);
        let (value, _) = parser.parse_document(text).unwrap();
        serde_json::to_value(value).unwrap()
    }

    #[test]
    fn variables_substitute_into_values() {
        let doc = "$greeting \"hi\"\nmsg $greeting world";
        assert_eq!(parse(doc), json!({"msg": "hi world"}));
    }

    #[test]
    fn array_mode_collects_items() {
        let doc = "tags [\n  red\n  blue\n]";
        assert_eq!(parse(doc), json!({"tags": ["red", "blue"]}));
    }

    #[test]
    fn array_items_drop_comments_and_trailing_commas() {
        let doc = "tags [\n  \"red\", // primary\n  \"blue\",\n]";
        assert_eq!(parse(doc), json!({"tags": ["red", "blue"]}));
    }

    #[test]
    fn braced_and_indented_scopes_mix() {
        let doc = "\
server {
  host = \"local\"
  limits {
    max = 10
  }
}
client
  retries = 3
timeout = 5";
        assert_eq!(
            parse(doc),
            json!({
                "server": {"host": "local", "limits": {"max": 10}},
                "client": {"retries": 3},
                "timeout": 5
            })
        );
    }

    #[test]
    fn block_header_with_navigation_opens_nested_scope() {
        let doc = "outer > inner {\n  x = 1\n}";
        assert_eq!(parse(doc), json!({"outer": {"inner": {"x": 1}}}));
    }

    #[test]
    fn dedent_closes_unbraced_scopes() {
        let doc = "a\n  b = 1\nc = 2";
        assert_eq!(parse(doc), json!({"a": {"b": 1}, "c": 2}));
    }

    #[test]
    fn stray_closers_are_tolerated() {
        let doc = "}\nx = 1\n}";
        assert_eq!(parse(doc), json!({"x": 1}));
    }

    #[test]
    fn quoted_multiline_joins_lines() {
        let doc = "desc (\n  \"line one\",\n  \"line two\"\n)";
        assert_eq!(parse(doc), json!({"desc": "line one\nline two"}));
    }

    #[test]
    fn raw_multiline_strips_common_indent() {
        let doc = "script @(\n    echo hi\n      echo deeper\n)";
        assert_eq!(
            parse(doc),
            json!({"script": "echo hi\n  echo deeper"})
        );
    }

    #[test]
    fn multiline_appends_to_existing_string() {
        let doc = "note \"head\"\nnote (\n  \"tail\"\n)";
        assert_eq!(parse(doc), json!({"note": "head\ntail"}));
    }

    #[test]
    fn export_value_overrides_document_root() {
        let doc = "x = 1\n@export 42\ny = 2";
        assert_eq!(parse(doc), json!(42));
        assert_eq!(parse("x = 1\n@export = 42"), json!(42));
    }

    #[test]
    fn export_block_collects_interior_lines() {
        let doc = "x = 1\n@export {\n  a = 2\n  b = \"z\"\n}\ny = 3";
        assert_eq!(parse(doc), json!({"a": 2, "b": "z"}));
    }

    #[test]
    fn export_array_collects_items() {
        let doc = "@export [\n  1\n  2\n]";
        assert_eq!(parse(doc), json!([1, 2]));
    }

    #[test]
    fn export_multiline_yields_a_string() {
        let doc = "@export (\n  \"only\"\n)";
        assert_eq!(parse(doc), json!("only"));
    }

    #[test]
    fn comments_are_stripped_and_blocks_swallow_directives() {
        let doc = "// leading\nx = 1 // trailing\n/*\n@export 5\n*/\ny = 2";
        assert_eq!(parse(doc), json!({"x": 1, "y": 2}));
    }

    #[test]
    fn single_line_block_comment_with_tail_opens_no_state() {
        let doc = "/* note */\nx = 1";
        assert_eq!(parse(doc), json!({"x": 1}));
    }

    #[test]
    fn multi_key_lines_fan_out() {
        assert_eq!(parse("[a, b] = [1, 2]"), json!({"a": 1, "b": 2}));
        assert_eq!(parse("[a, b] = 5"), json!({"a": 5, "b": 5}));
    }

    #[test]
    fn later_variable_definitions_win_for_later_lines() {
        let doc = "$v 1\nfirst $v\n$v 2\nsecond $v";
        assert_eq!(parse(doc), json!({"first": 1, "second": 2}));
    }

    #[test]
    fn undefined_variable_references_stay_literal() {
        assert_eq!(parse("x $missing"), json!({"x": "$missing"}));
    }

    #[test]
    fn empty_documents_compile_to_an_empty_object() {
        assert_eq!(parse(""), json!({}));
        assert_eq!(parse("// nothing\n\n"), json!({}));
    }

    #[test]
    fn reopened_scopes_replace_previous_contents() {
        let doc = "a {\n  x = 1\n}\na {\n  y = 2\n}";
        assert_eq!(parse(doc), json!({"a": {"y": 2}}));
    }

    #[test]
    fn sibling_written_after_scope_close_keeps_order() {
        let doc = "zebra {\n  x = 1\n}\nalpha = 2";
        let mut imports = ImportStack::new();
        let parser = Parser::new(PathBuf::from("."), &mut imports);
        let (value, _) = parser.parse_document(doc).unwrap();
        let rendered = serde_json::to_string(&value).unwrap();
        assert_eq!(rendered, r#"{"zebra":{"x":1},"alpha":2}"#);
    }
}
