mod common;

use common::{issue_json, TestEnv};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

fn load_schema(name: &str) -> Value {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let raw = fs::read_to_string(root.join("docs/contracts").join(name)).expect("read schema");
    serde_json::from_str(&raw).expect("parse schema")
}

fn validate(schema_name: &str, data: &Value) {
    let schema = load_schema(schema_name);
    let validator = JSONSchema::compile(&schema).expect("compile schema");
    let msgs: Vec<String> = match validator.validate(data) {
        Ok(()) => return,
        Err(errors) => errors.map(|e| e.to_string()).collect(),
    };
    panic!("schema validation failed: {}", msgs.join(" | "));
}

#[test]
fn contracts_check() {
    let env = TestEnv::new();
    env.seed_session("Asha", "asha@example.com");
    env.server
        .route("POST", "/issues", 201, issue_json("abc123"));
    env.server
        .route("GET", "/issues/abc123", 200, issue_json("abc123"));
    env.server.route(
        "GET",
        "/issues",
        200,
        serde_json::json!({ "issues": [issue_json("abc123")], "totalPages": 1, "page": 1 }),
    );

    let submit = env.run_json(&[
        "report",
        "--title",
        "Pothole on Main St",
        "--description",
        "Large pothole",
        "--category",
        "roads",
        "--address",
        "Main St",
        "--anonymous",
    ]);
    assert_eq!(submit["ok"], true);
    validate("submit-report.schema.json", &submit["data"]);

    let list = env.run_json(&["issues", "list"]);
    assert_eq!(list["ok"], true);
    validate("issues-page.schema.json", &list["data"]);

    let lang = env.run_json(&["lang", "show"]);
    assert_eq!(lang["ok"], true);
    validate("language.schema.json", &lang["data"]);

    let lang_set = env.run_json(&["lang", "set", "es"]);
    assert_eq!(lang_set["ok"], true);
    validate("language.schema.json", &lang_set["data"]);
}
