//! Pure string helpers shared by the preprocessor and the parser.

/// Decodes the LACON escape sequences `\n \r \t \b \f \" \\ \$ \~` and
/// `\u{HEX}`. Unrecognized escapes (and malformed `\u{...}` bodies) are
/// left verbatim, backslash included.
pub(crate) fn unescape_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let consumed = match tail.chars().next() {
            Some('n') => {
                out.push('\n');
                1
            }
            Some('r') => {
                out.push('\r');
                1
            }
            Some('t') => {
                out.push('\t');
                1
            }
            Some('b') => {
                out.push('\u{0008}');
                1
            }
            Some('f') => {
                out.push('\u{000C}');
                1
            }
            Some('"') => {
                out.push('"');
                1
            }
            Some('\\') => {
                out.push('\\');
                1
            }
            Some('$') => {
                out.push('$');
                1
            }
            Some('~') => {
                out.push('~');
                1
            }
            Some('u') => match unicode_escape_body(&tail[1..]) {
                Some((decoded, body_len)) => {
                    out.push(decoded);
                    1 + body_len
                }
                None => {
                    out.push('\\');
                    0
                }
            },
            Some(other) => {
                out.push('\\');
                out.push(other);
                other.len_utf8()
            }
            None => {
                out.push('\\');
                0
            }
        };
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}

/// Parses `{HEX}` after a `\u`, returning the character and the number of
/// bytes consumed. `None` when the body is malformed or names an invalid
/// code point.
fn unicode_escape_body(text: &str) -> Option<(char, usize)> {
    let inner = text.strip_prefix('{')?;
    let end = inner.find('}')?;
    let digits = &inner[..end];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let code = u32::from_str_radix(digits, 16).ok()?;
    let decoded = char::from_u32(code)?;
    Some((decoded, end + 2))
}

/// Strips one pair of surrounding double quotes, if present.
pub(crate) fn unwrap_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Quote-aware bracket/brace balance check used to decide whether a `=`
/// belongs to a top-level key. A prefix ending inside an open quote or an
/// open bracket pair is not a key boundary. Heuristic on adversarial input.
pub(crate) fn is_balanced(text: &str) -> bool {
    let mut square = 0i32;
    let mut curly = 0i32;
    let mut in_quotes = false;
    let mut prev = '\0';
    for c in text.chars() {
        if c == '"' && prev != '\\' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            match c {
                '[' => square += 1,
                ']' => square -= 1,
                '{' => curly += 1,
                '}' => curly -= 1,
                _ => {}
            }
        }
        prev = c;
    }
    square == 0 && curly == 0 && !in_quotes
}

/// Cuts a `//` line comment, ignoring `//` inside double-quoted spans.
pub(crate) fn strip_line_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut prev = '\0';
    for (i, c) in line.char_indices() {
        if c == '"' && prev != '\\' {
            in_quotes = !in_quotes;
        } else if c == '/' && !in_quotes && line[i..].starts_with("//") {
            return &line[..i];
        }
        prev = c;
    }
    line
}

/// Number of leading whitespace characters, the unit of the indentation
/// discipline.
pub(crate) fn leading_indent(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn skip_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Joins the body of a raw `@( ... )` block: the minimum indentation among
/// non-blank lines is stripped from every line, preserving the interior
/// layout, then the result is trimmed at both ends.
pub(crate) fn join_raw_multiline(lines: &[String]) -> String {
    let min_indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| leading_indent(line))
        .min();
    let Some(min_indent) = min_indent else {
        return lines.join("\n").trim().to_string();
    };
    let stripped: Vec<&str> = lines
        .iter()
        .map(|line| {
            if line.chars().count() >= min_indent {
                skip_chars(line, min_indent)
            } else {
                line.trim()
            }
        })
        .collect();
    stripped.join("\n").trim().to_string()
}

/// Joins the body of a quoted `( ... )` block: blank lines are dropped and
/// each remaining line is trimmed, stripped of one trailing comma, and
/// quote-unwrapped before newline-joining.
pub(crate) fn join_quoted_multiline(lines: &[String]) -> String {
    let cleaned: Vec<&str> = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| {
            let line = match line.strip_suffix(',') {
                Some(rest) => rest.trim(),
                None => line,
            };
            unwrap_quotes(line)
        })
        .collect();
    cleaned.join("\n")
}
