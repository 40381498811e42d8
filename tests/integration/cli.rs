use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

/// Command with an isolated config file and no progress output.
fn bomsync(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bomsync").unwrap();
    cmd.arg("--config")
        .arg(dir.join("config.toml"))
        .arg("--no-progress")
        .env_remove("BOMSYNC_TOKEN")
        .env_remove("BOMSYNC_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn write_export(dir: &Path) -> PathBuf {
    let payload = json!({"items": [
        {"id": "g-root", "number": "ROOT", "name": "ROOT item", "category": "Rack", "bomLines": [
            {"child": {"id": "g-a", "number": "A"}, "quantity": 2},
            {"child": {"id": "g-b", "number": "B"}, "quantity": 1}
        ]},
        {"id": "g-a", "number": "A", "name": "A item", "category": "Chassis", "bomLines": [
            {"child": {"id": "g-c", "number": "C"}, "quantity": 3}
        ]},
        {"id": "g-b", "number": "B", "name": "B item", "category": "Chassis", "bomLines": []},
        {"id": "g-c", "number": "C", "name": "C item", "category": "Cable", "bomLines": []}
    ]});
    let path = dir.join("export.json");
    std::fs::write(&path, payload.to_string()).unwrap();
    path
}

#[test]
fn verbose_and_quiet_conflict() {
    let dir = TempDir::new().unwrap();
    bomsync(dir.path())
        .args(["--verbose", "--quiet", "config", "path"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn config_path_points_at_override() {
    let dir = TempDir::new().unwrap();
    bomsync(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains("does not exist yet"));
}

#[test]
fn config_init_then_show() {
    let dir = TempDir::new().unwrap();
    bomsync(dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config"));
    assert!(dir.path().join("config.toml").exists());

    bomsync(dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    bomsync(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://plm.example.com/api/v2"));
}

#[test]
fn config_show_masks_token() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[api]\nbase_url = \"https://plm.test/api\"\ntoken = \"very-secret-token\"\n",
    )
    .unwrap();

    bomsync(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains("very-secret-token").not());
}

#[test]
fn tree_from_export_file() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());

    bomsync(dir.path())
        .args(["tree", "ROOT", "--export"])
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("ROOT (ROOT item)"))
        .stdout(predicate::str::contains("C (C item)"))
        .stdout(predicate::str::contains("3 positions across 2 levels"));
}

#[test]
fn tree_respects_depth() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());

    bomsync(dir.path())
        .args(["tree", "ROOT", "--depth", "1", "--export"])
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("C (C item)").not())
        .stdout(predicate::str::contains("2 positions across 1 levels"));
}

#[test]
fn pull_writes_flat_lines() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());
    let output = dir.path().join("out").join("root.csv");

    bomsync(dir.path())
        .args(["pull", "ROOT", "--export"])
        .arg(&export)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let content = std::fs::read_to_string(&output).unwrap();
    let mut rows = content.lines();
    assert_eq!(rows.next(), Some("level,item_number,quantity"));
    let numbers: Vec<&str> = rows.filter_map(|row| row.split(',').nth(1)).collect();
    assert_eq!(numbers, vec!["A", "C", "B"]);
}

#[test]
fn pull_json_format_from_extension() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());
    let output = dir.path().join("root.json");

    bomsync(dir.path())
        .args(["pull", "ROOT", "--export"])
        .arg(&export)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let content = std::fs::read_to_string(&output).unwrap();
    let lines: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(lines[1]["item_number"], "C");
    assert_eq!(lines[1]["level"], 1);
    assert_eq!(lines[1]["quantity"], 3.0);
}

#[test]
fn consolidate_from_export_file() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());
    let surface = dir.path().join("hall.csv");
    std::fs::write(&surface, "ROOT,,ROOT\nempty,ROOT\n").unwrap();

    bomsync(dir.path())
        .args(["consolidate"])
        .arg(&surface)
        .args(["--assembly", "ROOT", "--format", "csv", "--export"])
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "level,item_number,name,category,quantity,resolved,sources",
        ))
        .stdout(predicate::str::contains("C,C item,Cable,"))
        .stdout(predicate::str::contains("hall"));
}

#[test]
fn consolidate_without_assemblies_fails() {
    let dir = TempDir::new().unwrap();
    let surface = dir.path().join("hall.csv");
    std::fs::write(&surface, "ROOT\n").unwrap();

    bomsync(dir.path())
        .arg("consolidate")
        .arg(&surface)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No assemblies to count"));
}

#[test]
fn unrecognized_export_is_reported() {
    let dir = TempDir::new().unwrap();
    let export = dir.path().join("export.json");
    std::fs::write(&export, r#"{"rows": [{"x": 1}]}"#).unwrap();

    bomsync(dir.path())
        .args(["tree", "ROOT", "--export"])
        .arg(&export)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unrecognized export format"))
        .stderr(predicate::str::contains("retrying will not help"));
}

#[test]
fn unknown_root_in_export() {
    let dir = TempDir::new().unwrap();
    let export = write_export(dir.path());

    bomsync(dir.path())
        .args(["tree", "NOPE", "--export"])
        .arg(&export)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Item NOPE not found in export"));
}
