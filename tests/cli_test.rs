//! CLI integration tests for the jetschema binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("jetschema"))
}

// Helper to create a temp JSON file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_instance() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r#"{
                "type": "object",
                "required": ["name"],
                "properties": { "name": { "type": "string" } }
            }"#,
        );
        let instance = write_temp_file(&dir, "instance.json", r#"{ "name": "ok" }"#);

        cmd()
            .args([
                "validate",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Valid"));
    }

    #[test]
    fn invalid_instance_exits_one_and_lists_problems() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", r#"{ "maxItems": 2 }"#);
        let instance = write_temp_file(&dir, "instance.json", "[1, 2, 3]");

        cmd()
            .args([
                "validate",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Validation failed"))
            .stderr(predicate::str::contains("3 items, more than 2"));
    }

    #[test]
    fn json_output_for_automation() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", r#"{ "type": "number" }"#);
        let instance = write_temp_file(&dir, "instance.json", r#""not a number""#);

        cmd()
            .args([
                "validate",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
                "--json",
            ])
            .assert()
            .failure()
            .code(1)
            .stdout(predicate::str::contains(r#""valid":false"#))
            .stdout(predicate::str::contains(r#""keyword":"type""#));
    }

    #[test]
    fn quiet_suppresses_problem_listing() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", r#"{ "minItems": 5 }"#);
        let instance = write_temp_file(&dir, "instance.json", "[1]");

        cmd()
            .args([
                "validate",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
                "--quiet",
            ])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Validation failed"))
            .stderr(predicate::str::contains("fewer than").not());
    }

    #[test]
    fn missing_instance_file_exits_three() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", "true");

        cmd()
            .args([
                "validate",
                dir.path().join("missing.json").to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .failure()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn malformed_schema_exits_two() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", r#"{ "type": "int" }"#);
        let instance = write_temp_file(&dir, "instance.json", "1");

        cmd()
            .args([
                "validate",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("unknown type name"));
    }

    #[test]
    fn invalid_instance_json_exits_two() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", "true");
        let instance = write_temp_file(&dir, "instance.json", "{ not json");

        cmd()
            .args([
                "validate",
                instance.to_str().unwrap(),
                "--schema",
                schema.to_str().unwrap(),
            ])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }
}

mod check_command {
    use super::*;

    #[test]
    fn good_schema() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(
            &dir,
            "schema.json",
            r##"{
                "$defs": { "name": { "type": "string" } },
                "properties": { "name": { "$ref": "#/$defs/name" } }
            }"##,
        );

        cmd()
            .args(["check", schema.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("Schema OK"));
    }

    #[test]
    fn unresolved_ref_fails() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", r##"{ "$ref": "#/$defs/missing" }"##);

        cmd()
            .args(["check", schema.to_str().unwrap()])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("unresolved reference"));
    }

    #[test]
    fn circular_in_place_ref_fails() {
        let dir = TempDir::new().unwrap();
        let schema = write_temp_file(&dir, "schema.json", r##"{ "allOf": [{ "$ref": "#" }] }"##);

        cmd()
            .args(["check", schema.to_str().unwrap()])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("circular reference"));
    }
}
