use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

const SCHEMA_YAML: &str = r#"
root: Config
records:
  - name: Optimizer
    doc: Optimizer settings
    attributes:
      - { name: lr, type: float, default: 0.001 }
      - { name: kind, type: "choice(adam|sgd)", default: adam }
  - name: Config
    doc: Training configuration
    attributes:
      - { name: optimizer, type: Optimizer }
      - { name: epochs, type: int, default: 10, help: Number of passes }
      - { name: name, type: str }
      - { name: debug, type: bool, default: false }
"#;

fn write_schema(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("schema.yaml");
    fs::write(&path, SCHEMA_YAML).expect("failed to write schema");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_schema-args"))
        .args(args)
        .output()
        .expect("failed to run schema-args")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_parse_nested_schema() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&[
        "--schema",
        schema.to_str().unwrap(),
        "--",
        "--name",
        "run1",
        "--lr",
        "0.01",
        "--debug",
    ]);
    let value = stdout_json(&output);
    assert_eq!(
        value,
        serde_json::json!({
            "config": {
                "optimizer": {"lr": 0.01, "kind": "adam"},
                "epochs": 10,
                "name": "run1",
                "debug": true
            }
        })
    );
}

#[test]
fn test_repeated_destinations() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&[
        "--schema",
        schema.to_str().unwrap(),
        "--dest",
        "a",
        "--dest",
        "b",
        "--",
        "--name",
        "x",
        "y",
        "--epochs",
        "3",
    ]);
    let value = stdout_json(&output);
    assert_eq!(value["a"]["name"], "x");
    assert_eq!(value["b"]["name"], "y");
    assert_eq!(value["a"]["epochs"], 3);
    assert_eq!(value["b"]["epochs"], 3);
}

#[test]
fn test_defaults_file_and_yaml_output() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);
    let defaults = dir.path().join("defaults.json");
    fs::write(
        &defaults,
        r#"{"optimizer": {"lr": 0.5, "kind": "sgd"}, "name": "base"}"#,
    )
    .unwrap();

    let output = run(&[
        "--schema",
        schema.to_str().unwrap(),
        "--defaults",
        defaults.to_str().unwrap(),
        "--format",
        "yaml",
    ]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_yaml::from_slice(&output.stdout).unwrap();
    assert_eq!(value["config"]["optimizer"]["kind"], "sgd");
    assert_eq!(value["config"]["optimizer"]["lr"], 0.5);
    assert_eq!(value["config"]["name"], "base");
}

#[test]
fn test_explicit_conflicts_mode() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&[
        "--schema",
        schema.to_str().unwrap(),
        "--conflicts",
        "explicit",
        "--",
        "--config.name",
        "n",
        "--config.optimizer.kind",
        "sgd",
    ]);
    let value = stdout_json(&output);
    assert_eq!(value["config"]["optimizer"]["kind"], "sgd");
}

#[test]
fn test_show_help_lists_groups() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&["--schema", schema.to_str().unwrap(), "--show-help"]);
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("Training configuration"));
    assert!(help.contains("Optimizer ['config.optimizer']"));
    assert!(help.contains("Number of passes"));
}

#[test]
fn test_missing_required_argument_fails() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&["--schema", schema.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--name"));
}

#[test]
fn test_unknown_root_reports_error() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir);

    let output = run(&["--schema", schema.to_str().unwrap(), "--root", "Nope"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error: unknown record type 'Nope'"));
}

#[test]
fn test_missing_schema_file_reports_error() {
    let output = run(&["--schema", "/nonexistent/schema.yaml"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load"));
}
