use lacon_core::{compile, compile_to_json};

#[test]
fn test_compile_result_round_trips_json() {
    let source = "\
name \"My App\"
version = 1.2
enabled = true
features [
  \"a\"
  \"b\"
]
config {
  host = \"localhost\"
  port = 8080
}";

    let expected = serde_json::json!({
        "name": "My App",
        "version": 1.2,
        "enabled": true,
        "features": ["a", "b"],
        "config": {
            "host": "localhost",
            "port": 8080,
        }
    });

    let result = compile(source, None).unwrap();
    let json = result.to_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, expected);
}

#[test]
fn test_compile_result_to_yaml() {
    let source = "name \"My App\"\nversion = 2\nflags [\n  \"a\"\n  \"b\"\n]";
    let expected = "name: My App\nversion: 2\nflags:\n- a\n- b\n";

    let result = compile(source, None).unwrap();
    assert_eq!(result.to_yaml().unwrap(), expected);
}

#[test]
fn test_compile_result_exposes_value_and_variables() {
    let source = "$region \"eu-west\"\nregion $region\ncount = 2";
    let result = compile(source, None).unwrap();

    let root = result.value().as_object().expect("root should be an object");
    assert_eq!(root.len(), 2);
    assert_eq!(
        result.variables().get("region").map(String::as_str),
        Some("eu-west")
    );
}

#[test]
fn test_compile_to_json_formats_with_two_space_indent() {
    let json = compile_to_json("greeting \"hello\"", None).unwrap();
    assert_eq!(json, "{\n  \"greeting\": \"hello\"\n}");
}

#[test]
fn test_compile_result_serializes_transparently() {
    let result = compile("a = 1", None).unwrap();
    let through_result = serde_json::to_value(&result).unwrap();
    assert_eq!(through_result, serde_json::json!({"a": 1}));
}

#[test]
fn test_expanded_macro_output_recompiles_identically() {
    let with_directive = "\
<emit: 0x0a to +2 as local $m = @current> mem$m~ = \"0x$m\"
limit = 4";
    let written_out = "\
mem000A = \"0x000A\"
mem000B = \"0x000B\"
limit = 4";

    let first = compile_to_json(with_directive, None).unwrap();
    let second = compile_to_json(written_out, None).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_integral_floats_collapse_in_output() {
    let json = compile_to_json("two = 2.0\nhalf = 0.5", None).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, serde_json::json!({"two": 2, "half": 0.5}));
}
