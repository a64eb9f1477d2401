//! The `@f(format, arg)` numeric formatting mini-language.
//!
//! A call renders its argument through a format string holding `{}`
//! (verbatim substitution) and `{:[0][N][xX]}` (base-16, optionally
//! uppercase, optionally zero-padded to width `N`) placeholders. Calls that
//! cannot be parsed stay in the text verbatim.

use crate::vars::VariableRegistry;
use once_cell::sync::Lazy;
use regex::Regex;

static FORMAT_SPEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(:0?([0-9]+)?([xX]))?\}").unwrap());

/// Replaces every well-formed `@f(...)` call in `text`. `counter` backs the
/// `@current` argument inside emit expansion; outside of it the argument
/// stays literal.
pub(crate) fn expand_calls(text: &str, vars: &VariableRegistry, counter: Option<i64>) -> String {
    if !text.contains("@f(") {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("@f(") {
        out.push_str(&rest[..pos]);
        match parse_call(&rest[pos..]) {
            Some(call) => {
                let value = eval_arg(call.arg, vars, counter);
                out.push_str(&render(call.format, &value));
                rest = &rest[pos + call.len..];
            }
            None => {
                out.push_str("@f(");
                rest = &rest[pos + 3..];
            }
        }
    }
    out.push_str(rest);
    out
}

struct Call<'a> {
    format: &'a str,
    arg: &'a str,
    /// Byte length of the whole `@f(...)` span in the input.
    len: usize,
}

/// Parses one call at the start of `text` (which begins with `@f(`). The
/// format may be bare (`@f({:x}, v)`) or double-quoted (`@f("{:x}",v)`);
/// the argument runs to the first `)`.
fn parse_call(text: &str) -> Option<Call<'_>> {
    let body = &text[3..];
    let (format, after_format) = if body.trim_start().starts_with('"') {
        let open = body.find('"')?;
        let close_rel = body[open + 1..].find('"')?;
        let close = open + 1 + close_rel;
        let next = body[close + 1..].trim_start();
        if !next.starts_with(',') {
            return None;
        }
        let comma = close + 1 + (body.len() - close - 1 - next.len());
        (&body[open + 1..close], comma + 1)
    } else {
        let comma = body.find(',')?;
        let format = &body[..comma];
        if format.is_empty() || format.contains(')') {
            return None;
        }
        (format, comma + 1)
    };
    let close_rel = body[after_format..].find(')')?;
    let arg = body[after_format..after_format + close_rel].trim();
    if arg.is_empty() {
        return None;
    }
    Some(Call {
        format,
        arg,
        len: 3 + after_format + close_rel + 1,
    })
}

/// Argument evaluation: `@current` is the loop counter, `$name` looks the
/// variable up (falling back to the literal text), anything else is itself.
fn eval_arg(arg: &str, vars: &VariableRegistry, counter: Option<i64>) -> String {
    if arg == "@current" {
        return match counter {
            Some(c) => c.to_string(),
            None => arg.to_string(),
        };
    }
    if let Some(name) = arg.strip_prefix('$') {
        return vars.get(name).cloned().unwrap_or_else(|| arg.to_string());
    }
    arg.to_string()
}

/// Renders `value` through `format`. A non-numeric value degrades to the
/// bare value string with the format discarded.
fn render(format: &str, value: &str) -> String {
    let Some(num) = parse_numeric(value) else {
        return value.to_string();
    };
    let mut out = String::with_capacity(format.len());
    let mut last = 0;
    for caps in FORMAT_SPEC.captures_iter(format) {
        let whole = caps.get(0).unwrap();
        out.push_str(&format[last..whole.start()]);
        if caps.get(1).is_none() {
            out.push_str(value);
        } else {
            let upper = caps.get(3).map(|m| m.as_str()) == Some("X");
            let mut hex = to_hex(num, upper);
            if let Some(width) = caps.get(2).and_then(|m| m.as_str().parse::<usize>().ok()) {
                hex = pad_start(hex, width);
            }
            out.push_str(&hex);
        }
        last = whole.end();
    }
    out.push_str(&format[last..]);
    out
}

/// Numeric reading of an argument: `0x`/`0X` strings parse base-16, decimal
/// integers directly, and decimal fractions through their integer part.
fn parse_numeric(value: &str) -> Option<i64> {
    let text = value.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Ok(int) = text.parse::<i64>() {
        return Some(int);
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.trunc() as i64)
}

fn to_hex(num: i64, upper: bool) -> String {
    let (sign, magnitude) = if num < 0 {
        ("-", num.unsigned_abs())
    } else {
        ("", num as u64)
    };
    if upper {
        format!("{sign}{magnitude:X}")
    } else {
        format!("{sign}{magnitude:x}")
    }
}

fn pad_start(text: String, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        text
    } else {
        let mut out = "0".repeat(width - len);
        out.push_str(&text);
        out
    }
}
