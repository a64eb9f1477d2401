//! Variable registry and textual `$name` substitution.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered variable store. A definition line overwrites the value in place,
/// so a reference always sees the most recent definition above it.
pub type VariableRegistry = IndexMap<String, String>;

/// A reference is `$` followed by letters, digits, `.`, `_` or `-`, with an
/// optional `~` terminator delimiting it from adjacent word characters.
static VAR_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([\p{L}0-9._-]+)(~?)").unwrap());

/// Replaces every known `$name` reference in `text` with its registry
/// value, left to right. The `~` terminator is consumed together with the
/// reference. Undefined references and `\$`-escaped ones stay verbatim.
pub(crate) fn resolve_variables(text: &str, vars: &VariableRegistry) -> String {
    if !text.contains('$') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in VAR_REFERENCE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        if text[..whole.start()].ends_with('\\') {
            out.push_str(&text[last..whole.end()]);
            last = whole.end();
            continue;
        }
        match vars.get(&caps[1]) {
            Some(value) => {
                out.push_str(&text[last..whole.start()]);
                out.push_str(value);
            }
            None => out.push_str(&text[last..whole.end()]),
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(pairs: &[(&str, &str)]) -> VariableRegistry {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_known_references() {
        let vars = registry(&[("greeting", "hi")]);
        assert_eq!(resolve_variables("$greeting world", &vars), "hi world");
    }

    #[test]
    fn tilde_terminates_a_reference_and_is_consumed() {
        let vars = registry(&[("w", "ab")]);
        assert_eq!(resolve_variables("$w~x", &vars), "abx");
        assert_eq!(resolve_variables("$missing~x", &vars), "$missing~x");
    }

    #[test]
    fn undefined_references_stay_literal() {
        let vars = VariableRegistry::new();
        assert_eq!(resolve_variables("keep $later intact", &vars), "keep $later intact");
    }

    #[test]
    fn escaped_references_are_not_substituted() {
        let vars = registry(&[("name", "value")]);
        assert_eq!(resolve_variables(r"\$name", &vars), r"\$name");
        assert_eq!(resolve_variables(r"a \$name b $name", &vars), r"a \$name b value");
    }

    #[test]
    fn names_match_greedily_without_backtracking() {
        let vars = registry(&[("a", "short")]);
        // "a.b" is the longest name candidate; it is undefined, so the
        // reference stays literal even though "a" alone would resolve.
        assert_eq!(resolve_variables("$a.b", &vars), "$a.b");
    }

    #[test]
    fn unicode_names_resolve() {
        let vars = registry(&[("größe", "10")]);
        assert_eq!(resolve_variables("$größe px", &vars), "10 px");
    }
}
