// Integration tests for lacon-core using test fixtures
use lacon_core::{compile, compile_file};
use serde_json::json;
use std::fs;
use std::path::PathBuf;

fn get_test_file_path(subdir: &str, filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join(subdir)
        .join(filename)
}

fn read_test_file(subdir: &str, filename: &str) -> String {
    let path = get_test_file_path(subdir, filename);
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to read test file: {:?}", path))
}

fn compile_fixture(subdir: &str, filename: &str) -> serde_json::Value {
    let source = read_test_file(subdir, filename);
    let result = compile(&source, Some(&get_test_file_path(subdir, filename)))
        .unwrap_or_else(|err| panic!("{filename} should compile: {err}"));
    serde_json::to_value(result.into_value()).unwrap()
}

// Fixtures that must compile and match their expected document
mod ok_tests {
    use super::*;

    #[test]
    fn test_primitives() {
        assert_eq!(
            compile_fixture("ok", "primitives.lacon"),
            json!({
                "count": 42,
                "ratio": 0.75,
                "active": true,
                "inactive": false,
                "mode": "auto",
                "label": "plain text",
                "host": "server-1",
                "quoted": "123"
            })
        );
    }

    #[test]
    fn test_scopes() {
        assert_eq!(
            compile_fixture("ok", "scopes.lacon"),
            json!({
                "app": {
                    "name": "demo",
                    "http": {"server": {"port": 8080}}
                },
                "db": {
                    "pool": {"size": 10},
                    "timeout": 30
                }
            })
        );
    }

    #[test]
    fn test_collections() {
        assert_eq!(
            compile_fixture("ok", "collections.lacon"),
            json!({
                "tags": ["alpha", "beta", 42],
                "inline": [1, [2, 3], {"k": "v"}],
                "matrix": [[1, 2], [3, 4]],
                "empty": []
            })
        );
    }

    #[test]
    fn test_variables() {
        assert_eq!(
            compile_fixture("ok", "variables.lacon"),
            json!({
                "service": "prod-api",
                "endpoint": "https://prod.example.com:9000",
                "msg": "hello world",
                "multi": ["prod", 9000]
            })
        );
    }

    #[test]
    fn test_multiline() {
        assert_eq!(
            compile_fixture("ok", "multiline.lacon"),
            json!({
                "description": "First line\nSecond line\nAppended",
                "script": "#!/bin/sh\necho run"
            })
        );
    }

    #[test]
    fn test_emit() {
        assert_eq!(
            compile_fixture("ok", "emit.lacon"),
            json!({
                "srv-1": 1,
                "srv-2": 2,
                "srv-3": 3,
                "mem0a": {"addr": "0a"},
                "mem0b": {"addr": "0b"}
            })
        );
    }

    #[test]
    fn test_exports() {
        assert_eq!(
            compile_fixture("ok", "exports.lacon"),
            json!({"value": 10, "doubled": 20})
        );
    }

    #[test]
    fn test_imports() {
        let path = get_test_file_path("ok", "imports/main.lacon");
        let value = compile_file(&path).unwrap_or_else(|err| panic!("should compile: {err}"));
        assert_eq!(
            serde_json::to_value(value).unwrap(),
            json!({
                "defaults": true,
                "name": "overridden",
                "app": {"deep": true}
            })
        );
    }

    #[test]
    fn test_kitchen_sink() {
        assert_eq!(
            compile_fixture("ok", "kitchen_sink.lacon"),
            json!({
                "meta": {
                    "name": "sinkhole",
                    "labels": {"team": "core", "tier": "backend"}
                },
                "deploy": {
                    "strategy": {
                        "kind": "rolling",
                        "max-surge": 1,
                        "max-unavailable": 0
                    }
                },
                "regions": ["eu-central", "us-east"],
                "limits": {"cpu": 4, "mem": "512Mi"},
                "notes": "first\nsecond",
                "shard1": {"replicas": 3},
                "shard2": {"replicas": 3},
                "banner": "hello\nworld",
                "flagged": true
            })
        );
    }

    #[test]
    fn test_kitchen_sink_key_order() {
        let source = read_test_file("ok", "kitchen_sink.lacon");
        let result = compile(&source, None).unwrap();
        let root = result.value().as_object().expect("root should be an object");
        let keys: Vec<&str> = root.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "meta", "deploy", "regions", "limits", "notes", "shard1", "shard2", "banner",
                "flagged"
            ]
        );
    }
}

// Fixtures whose import graphs must fail to compile
mod bad_tests {
    use super::*;

    #[test]
    fn test_cycle() {
        let path = get_test_file_path("bad", "cycle_a.lacon");
        let result = compile_file(&path);
        assert!(result.is_err(), "Expected a circular import error");
    }

    #[test]
    fn test_missing_import() {
        let path = get_test_file_path("bad", "missing.lacon");
        let result = compile_file(&path);
        assert!(result.is_err(), "Expected a file-not-found error");
    }
}
