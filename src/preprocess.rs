//! Document-level expansion pass run before parsing.
//!
//! Walks the raw text once, expanding `<emit: ...>` directives in place.
//! Every other line passes through untouched, so documents without
//! directives come out byte-identical.

use crate::emit;
use crate::utils::{leading_indent, unwrap_quotes};
use crate::vars::VariableRegistry;
use once_cell::sync::Lazy;
use regex::Regex;

/// `$name value` at the start of a line. The snapshot is taken over the
/// whole document before expansion, so later definitions win and directives
/// above them still see the final value.
static GLOBAL_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$(\w[\w-]+)\s+(.+)$").unwrap());

pub(crate) fn preprocess(text: &str) -> String {
    if !text.contains("<emit:") {
        return text.to_string();
    }
    let globals = collect_globals(text);
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_block_comment = false;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();
        if in_block_comment {
            out.push(line.to_string());
            if trimmed.contains("*/") {
                in_block_comment = false;
            }
            i += 1;
            continue;
        }
        if trimmed.starts_with("//") || trimmed.starts_with('*') {
            out.push(line.to_string());
            i += 1;
            continue;
        }
        if trimmed.starts_with("/*") {
            out.push(line.to_string());
            if !trimmed.contains("*/") {
                in_block_comment = true;
            }
            i += 1;
            continue;
        }
        if line.contains("<emit:") {
            if let Some(dir) = emit::parse_directive(line) {
                let indent = &line[..line.len() - line.trim_start().len()];
                if dir.block_body {
                    let base_indent = leading_indent(line);
                    let mut end = i + 1;
                    while end < lines.len() {
                        let candidate = lines[end];
                        if candidate.trim() == "}" && leading_indent(candidate) == base_indent {
                            break;
                        }
                        end += 1;
                    }
                    let body = &lines[i + 1..end];
                    log::trace!(
                        "expanding emit block over {} iterations ({} template lines)",
                        dir.end - dir.start,
                        body.len()
                    );
                    emit::expand_directive(&dir, indent, body, &globals, &mut out);
                    i = end + 1;
                } else {
                    log::trace!("expanding emit line over {} iterations", dir.end - dir.start);
                    emit::expand_directive(&dir, indent, &[], &globals, &mut out);
                    i += 1;
                }
                continue;
            }
        }
        out.push(line.to_string());
        i += 1;
    }
    out.join("\n")
}

fn collect_globals(text: &str) -> VariableRegistry {
    let mut vars = VariableRegistry::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("//") || trimmed.starts_with("/*") {
            continue;
        }
        if let Some(caps) = GLOBAL_VAR.captures(trimmed) {
            vars.insert(caps[1].to_string(), unwrap_quotes(caps[2].trim()).to_string());
        }
    }
    vars
}
