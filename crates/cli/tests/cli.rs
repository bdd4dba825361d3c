use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_config(dir: &Path, modules: &str) -> PathBuf {
    let path = dir.join("run.json");
    let text = format!(
        r#"{{
            "seed": 7,
            "generations": 5,
            "populations": [{{ "name": "main_pop", "size": 0 }}],
            "organisms": [{{ "type": "BitsOrg", "name": "bits_org", "options": {{ "init_length": 20 }} }}],
            "modules": [{modules}],
            "inject": [{{ "population": "main_pop", "organism": "bits_org", "count": 20 }}]
        }}"#
    );
    fs::write(&path, text).unwrap();
    path
}

const NK_MODULES: &str = r#"
    { "type": "EvalNK", "name": "eval_nk", "options": { "N": 20, "K": 2 } },
    { "type": "SelectElite", "name": "elite", "options": { "top_k": 2, "copies_per_winner": 10 } }
"#;

#[test]
fn test_list_shows_builtin_types() {
    let mut cmd = Command::cargo_bin("mabe").unwrap();
    cmd.arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("BitsOrg"))
        .stdout(predicate::str::contains("EvalNK"))
        .stdout(predicate::str::contains("SelectElite"))
        .stdout(predicate::str::contains("copies_per_winner"));
}

#[test]
fn test_validate_accepts_nk_config() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path(), NK_MODULES);

    let mut cmd = Command::cargo_bin("mabe").unwrap();
    cmd.arg("validate")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("fitness <double>: owned by eval_nk"));
}

#[test]
fn test_validate_reports_missing_owner() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("bad.json");
    fs::write(
        &path,
        r#"{
            "populations": [{ "name": "main_pop" }],
            "modules": [{ "type": "EvalNK", "name": "eval_nk" }]
        }"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("mabe").unwrap();
    cmd.arg("validate")
        .arg("-c")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no owner for trait: bits"));
}

#[test]
fn test_validate_missing_file_fails() {
    let temp = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("mabe").unwrap();
    cmd.arg("validate")
        .arg("-c")
        .arg(temp.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_unknown_module_type_fails() {
    let temp = tempdir().unwrap();
    let config = write_config(
        temp.path(),
        r#"{ "type": "EvalMystery", "name": "mystery" }"#,
    );

    let mut cmd = Command::cargo_bin("mabe").unwrap();
    cmd.arg("run")
        .arg("-c")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("EvalMystery"));
}

#[test]
fn test_run_with_overrides_and_snapshot() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path(), NK_MODULES);
    let snapshot = temp.path().join("final.json");

    let mut cmd = Command::cargo_bin("mabe").unwrap();
    cmd.arg("-t")
        .arg("2")
        .arg("run")
        .arg("--config")
        .arg(&config)
        .arg("--seed")
        .arg("11")
        .arg("--generations")
        .arg("3")
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Random Seed: 11"))
        .stdout(predicate::str::contains("Generations run: 3"))
        .stdout(predicate::str::contains("Births: 60"))
        .stdout(predicate::str::contains("Best eval_nk"));

    let text = fs::read_to_string(&snapshot).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["population"], "main_pop");
    assert_eq!(json["generation"], 3);
    assert_eq!(json["records"].as_array().unwrap().len(), 20);
}
