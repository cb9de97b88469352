//! End-to-end tests driving the built `crucible` binary directly via `assert_cmd`.

use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn seed_zlib(root: &Path) {
    write(
        &root.join("specs/zlib.json"),
        r#"{"name":"zlib","version":"1.3.1","dag_hash":"abcdef0123456","dependencies":[],"external":false}"#,
    );
    write(
        &root.join("recipes/zlib/recipe.json"),
        r#"{
        "name": "zlib",
        "sanity_check_is_file": ["bin/fake"],
        "phases": []
        }"#,
    );
}

#[test]
fn install_with_fake_populates_a_stub_prefix_and_registers_it() {
    let tmp = tempfile::tempdir().unwrap();
    seed_zlib(tmp.path());

    let mut cmd = Command::cargo_bin("crucible").unwrap();
    cmd.current_dir(tmp.path())
        .arg("--install-root")
        .arg(tmp.path().join("opt"))
        .arg("install")
        .arg("zlib")
        .arg("--fake");

    cmd.assert().success().stdout(contains("installed"));

    let mut status = Command::cargo_bin("crucible").unwrap();
    status
        .current_dir(tmp.path())
        .arg("--install-root")
        .arg(tmp.path().join("opt"))
        .arg("status")
        .arg("zlib");
    status.assert().success().stdout(contains("installed at"));
}

#[test]
fn install_then_uninstall_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    seed_zlib(tmp.path());

    Command::cargo_bin("crucible")
        .unwrap()
        .current_dir(tmp.path())
        .args(["--install-root"])
        .arg(tmp.path().join("opt"))
        .args(["install", "zlib", "--fake"])
        .assert()
        .success();

    Command::cargo_bin("crucible")
        .unwrap()
        .current_dir(tmp.path())
        .arg("--install-root")
        .arg(tmp.path().join("opt"))
        .args(["uninstall", "zlib"])
        .assert()
        .success()
        .stdout(contains("uninstalled"));
}

#[test]
fn install_json_emits_a_single_structured_result_line() {
    let tmp = tempfile::tempdir().unwrap();
    seed_zlib(tmp.path());

    Command::cargo_bin("crucible")
        .unwrap()
        .current_dir(tmp.path())
        .arg("--install-root")
        .arg(tmp.path().join("opt"))
        .arg("--json")
        .args(["install", "zlib", "--fake"])
        .assert()
        .success()
        .stdout(contains("\"name\":\"zlib\""))
        .stdout(contains("\"prefix\""));
}

#[test]
fn install_unknown_package_fails_with_a_clear_message() {
    let tmp = tempfile::tempdir().unwrap();
    seed_zlib(tmp.path());

    Command::cargo_bin("crucible")
        .unwrap()
        .current_dir(tmp.path())
        .arg("--install-root")
        .arg(tmp.path().join("opt"))
        .args(["install", "does-not-exist"])
        .assert()
        .failure()
        .stderr(contains("no resolved spec"));
}

#[test]
fn config_command_prints_resolved_settings() {
    let tmp = tempfile::tempdir().unwrap();
    seed_zlib(tmp.path());

    Command::cargo_bin("crucible")
        .unwrap()
        .current_dir(tmp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(contains("install_root"));
}
