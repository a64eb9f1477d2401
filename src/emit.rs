//! `<emit: ...>` repetition directives.
//!
//! A directive drives a bounded counter loop; each iteration re-emits the
//! trailing line (or a captured `{ ... }` block template) with variable
//! references substituted and `@f(...)` calls evaluated against the
//! iteration counter.

use crate::format;
use crate::vars::VariableRegistry;
use once_cell::sync::Lazy;
use regex::Regex;

/// `<emit: START to SIGN COUNT [as local $VAR = EXPR] > REST`. Text before
/// `<emit:` on the same line is dropped.
static EMIT_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"<emit:\s*(.+?)\s+to\s+([+-])([0-9]+)(?:\s+as\s+local\s+\$([\w-]+)\s*=\s*(.+?))?>\s*(.*)$",
    )
    .unwrap()
});

/// Substitution inside expanded lines: `$name` with an optional consumed
/// `~` terminator.
static EMIT_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(\w[\w-]*)(~?)").unwrap());

#[derive(Debug, PartialEq)]
pub(crate) struct EmitDirective {
    pub start: i64,
    /// Exclusive upper bound of the iteration index space; the number of
    /// generated copies is `end - start`.
    pub end: i64,
    pub step: i64,
    pub start_is_hex: bool,
    pub local_var: Option<String>,
    pub local_expr: Option<String>,
    pub block_body: bool,
    pub rest: String,
}

/// Parses the directive on `line`, or `None` when the line is not a
/// well-formed directive (the caller then keeps it verbatim).
pub(crate) fn parse_directive(line: &str) -> Option<EmitDirective> {
    let cleaned = line.trim().replace('\r', "");
    let caps = EMIT_DIRECTIVE.captures(&cleaned)?;
    let start_token = caps.get(1).unwrap().as_str();
    let start_is_hex = start_token.starts_with("0x") || start_token.starts_with("0X");
    let start = if start_is_hex {
        i64::from_str_radix(&start_token[2..], 16).ok()?
    } else {
        start_token.parse::<i64>().ok()?
    };
    let step = if caps.get(2).unwrap().as_str() == "-" { -1 } else { 1 };
    let count = caps.get(3).unwrap().as_str().parse::<i64>().ok()?;
    let rest = caps.get(6).unwrap().as_str().to_string();
    Some(EmitDirective {
        start,
        end: start + count,
        step,
        start_is_hex,
        local_var: caps.get(4).map(|m| m.as_str().to_string()),
        local_expr: caps.get(5).map(|m| m.as_str().to_string()),
        block_body: rest.trim().ends_with('{'),
        rest,
    })
}

/// Emits every iteration of `dir` into `out`. `indent` is re-applied to the
/// directive's own line (and the synthesized `}` for block form); captured
/// `body` template lines keep their original indentation.
pub(crate) fn expand_directive(
    dir: &EmitDirective,
    indent: &str,
    body: &[&str],
    globals: &VariableRegistry,
    out: &mut Vec<String>,
) {
    for i in 0..(dir.end - dir.start) {
        let counter = dir.start + i * dir.step;
        let locals = bind_locals(dir, globals, counter);
        out.push(format!("{indent}{}", substitute(&dir.rest, &locals, counter)));
        if dir.block_body {
            for line in body {
                out.push(substitute(line, &locals, counter));
            }
            out.push(format!("{indent}}}"));
        }
    }
}

/// Clones the global snapshot and binds the iteration-local variable, if
/// declared.
fn bind_locals(dir: &EmitDirective, globals: &VariableRegistry, counter: i64) -> VariableRegistry {
    let mut locals = globals.clone();
    if let Some(name) = &dir.local_var {
        locals.insert(name.clone(), eval_local_expr(dir, counter, &locals));
    }
    locals
}

/// The local's per-iteration value. An empty or `@current` expression takes
/// the counter directly: four-digit uppercase hex when the start token was
/// hex-written, plain decimal otherwise. Anything else runs through the
/// `@f` formatter with the counter bound to `@current`.
fn eval_local_expr(dir: &EmitDirective, counter: i64, locals: &VariableRegistry) -> String {
    let expr = dir.local_expr.as_deref().unwrap_or("").trim();
    if expr.is_empty() || expr == "@current" {
        if dir.start_is_hex {
            format!("{counter:04X}")
        } else {
            counter.to_string()
        }
    } else {
        format::expand_calls(expr, locals, Some(counter))
    }
}

fn substitute(text: &str, locals: &VariableRegistry, counter: i64) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in EMIT_VAR.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        match locals.get(&caps[1]) {
            Some(value) => {
                out.push_str(&text[last..whole.start()]);
                out.push_str(value);
            }
            None => out.push_str(&text[last..whole.end()]),
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    format::expand_calls(&out, locals, Some(counter))
}
