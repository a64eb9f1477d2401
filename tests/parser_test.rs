// Language surface tests driven through the public compile API.
use lacon_core::compile;
use serde_json::json;

fn compile_json(source: &str) -> serde_json::Value {
    let result = compile(source, None)
        .unwrap_or_else(|err| panic!("compile failed: {err}\nsource:\n{source}"));
    serde_json::to_value(result.into_value()).unwrap()
}

#[test]
fn test_typed_and_untyped_scalars() {
    let source = "\
port = 8080
pi = 3.14
neg = -7
on = true
off = false
mode = auto
name server-1
title \"Spaced Out\"
forced = \"8080\"";
    assert_eq!(
        compile_json(source),
        json!({
            "port": 8080,
            "pi": 3.14,
            "neg": -7,
            "on": true,
            "off": false,
            "mode": "auto",
            "name": "server-1",
            "title": "Spaced Out",
            "forced": "8080"
        })
    );
}

#[test]
fn test_bare_keys_become_flags() {
    let source = "verbose\nx = 1";
    assert_eq!(compile_json(source), json!({"verbose": true, "x": 1}));
}

#[test]
fn test_inline_containers() {
    let source = "\
db = { host = \"localhost\" port = 5432 tags = [1, 2] }
empty = {}
list = [1, \"two\", true, [3, 4]]
none = []";
    assert_eq!(
        compile_json(source),
        json!({
            "db": {"host": "localhost", "port": 5432, "tags": [1, 2]},
            "empty": {},
            "list": [1, "two", true, [3, 4]],
            "none": []
        })
    );
}

#[test]
fn test_nested_scopes_mix_braces_and_indentation() {
    let source = "\
server {
  host = \"0.0.0.0\"
  tls {
    cert = \"a.pem\"
  }
}
worker
  threads = 4
  queue
    depth = 128
top = 1";
    assert_eq!(
        compile_json(source),
        json!({
            "server": {"host": "0.0.0.0", "tls": {"cert": "a.pem"}},
            "worker": {"threads": 4, "queue": {"depth": 128}},
            "top": 1
        })
    );
}

#[test]
fn test_navigation_assignments() {
    let source = "\
a > b > c = 5
a > b > d = 6
root > leaf = \"x\"";
    assert_eq!(
        compile_json(source),
        json!({
            "a": {"b": {"c": 5, "d": 6}},
            "root": {"leaf": "x"}
        })
    );
}

#[test]
fn test_multi_key_assignments() {
    let source = "\
[host, port] = [\"h\", 1]
[a, b] = 9
[net*, -ip, -mask] = [\"10.0.0.1\", \"255.255.255.0\", 24]";
    assert_eq!(
        compile_json(source),
        json!({
            "host": "h",
            "port": 1,
            "a": 9,
            "b": 9,
            "net": "10.0.0.1",
            "net-ip": "255.255.255.0",
            "net-mask": 24
        })
    );
}

#[test]
fn test_append_operator() {
    let source = "\
tags = [1]
tags + 2
tags + [3, 4]
log \"first\"
log + \"second\"
log + 3
fresh + \"start\"";
    assert_eq!(
        compile_json(source),
        json!({
            "tags": [1, 2, [3, 4]],
            "log": "first\nsecond\n3",
            "fresh": "start"
        })
    );
}

#[test]
fn test_comment_handling() {
    let source = "\
// full line
url = \"http://example.com\" // trailing
/*
hidden = 1
*/
path = \"a // b\"";
    assert_eq!(
        compile_json(source),
        json!({
            "url": "http://example.com",
            "path": "a // b"
        })
    );
}

#[test]
fn test_escape_sequences() {
    let source = "\
msg = \"line\\nnext\"
tab = \"a\\tb\"
quote = \"say \\\"hi\\\"\"
uni = \"\\u{41}\"";
    assert_eq!(
        compile_json(source),
        json!({
            "msg": "line\nnext",
            "tab": "a\tb",
            "quote": "say \"hi\"",
            "uni": "A"
        })
    );
}

#[test]
fn test_variable_substitution() {
    let source = "\
$host \"db.local\"
$port 5432
url $host~:$port
servers [
  $host
]";
    assert_eq!(
        compile_json(source),
        json!({
            "url": "db.local:5432",
            "servers": ["db.local"]
        })
    );
}

#[test]
fn test_multiline_blocks() {
    let source = "\
quoted (
  \"one\",
  \"two\"
)
raw @(
    keep
      deeper
)";
    assert_eq!(
        compile_json(source),
        json!({
            "quoted": "one\ntwo",
            "raw": "keep\n  deeper"
        })
    );
}

#[test]
fn test_emit_single_line_expansion() {
    let source = "<emit: 0x41 to +3 as local $code = @f(\"{:02X}\", @current)> key$code~ = $code";
    assert_eq!(
        compile_json(source),
        json!({"key41": 41, "key42": 42, "key43": 43})
    );
}

#[test]
fn test_emit_block_expansion() {
    let source = "\
<emit: 1 to +2 as local $n = @current> item$n~ {
  id = $n
}";
    assert_eq!(
        compile_json(source),
        json!({
            "item1": {"id": 1},
            "item2": {"id": 2}
        })
    );
}

#[test]
fn test_malformed_lines_degrade_to_literals() {
    let source = "\
key =
===
] ";
    assert_eq!(
        compile_json(source),
        json!({"key": "", "===": true, "]": true})
    );
}

#[test]
fn test_compilation_is_deterministic() {
    let source = "\
$v 1
a {
  b $v
}
c [
  2
]";
    let first = compile(source, None).unwrap().to_json().unwrap();
    let second = compile(source, None).unwrap().to_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_output_preserves_source_key_order() {
    let source = "\
zulu = 1
alpha {
  m = 2
}
yankee = 3";
    let json = compile(source, None).unwrap().to_json().unwrap();
    assert_eq!(
        json,
        "{\n  \"zulu\": 1,\n  \"alpha\": {\n    \"m\": 2\n  },\n  \"yankee\": 3\n}"
    );
}
