//! Integration tests for CLI parsing, configuration loading and `platform`

#![allow(deprecated)] // cargo_bin is deprecated in newer assert_cmd releases

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::CommandCargoExt;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use sphinxlab_testkit::temp_dir_in_workspace;

fn sphinxlab(root: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("sphinxlab").unwrap();
    cmd.current_dir(root)
        .env_remove("SPHINXLAB_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let temp = temp_dir_in_workspace();

    sphinxlab(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("platform"));
}

#[test]
fn test_platform_prints_classifier() {
    let temp = temp_dir_in_workspace();

    sphinxlab(temp.path())
        .arg("platform")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[a-z]+-[a-z0-9_]+\n$").unwrap());
}

#[test]
fn test_platform_json_honours_config_override() {
    let temp = temp_dir_in_workspace();
    fs::write(
        temp.path().join("sphinxlab.toml"),
        "[sphinx]\nplatform = \"windows-x86_64\"\n",
    )
    .unwrap();

    let output = sphinxlab(temp.path())
        .args(["platform", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["classifier"], "windows-x86_64");
    assert_eq!(json["os"], "windows");
    assert_eq!(json["arch"], "x86_64");
    assert_eq!(json["executable_suffix"], ".exe");
    assert_eq!(json["detected"], false);
}

#[test]
fn test_invalid_platform_override_fails() {
    let temp = temp_dir_in_workspace();
    fs::write(
        temp.path().join("sphinxlab.toml"),
        "[sphinx]\nplatform = \"beos-m68k\"\n",
    )
    .unwrap();

    sphinxlab(temp.path())
        .arg("platform")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid platform classifier"));
}

#[test]
fn test_malformed_config_fails() {
    let temp = temp_dir_in_workspace();
    fs::write(temp.path().join("sphinxlab.toml"), "[sphinx\nversion = ").unwrap();

    sphinxlab(temp.path())
        .arg("platform")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_PARSE_ERROR"));
}

#[test]
fn test_invalid_config_value_fails() {
    let temp = temp_dir_in_workspace();
    fs::write(
        temp.path().join("sphinxlab.toml"),
        "[network]\ntls_versions = [\"SSLv3\"]\n",
    )
    .unwrap();

    sphinxlab(temp.path())
        .arg("install")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_INVALID_VALUE"))
        .stderr(predicate::str::contains("network.tls_versions"));
}

#[test]
fn test_explicit_missing_config_fails() {
    let temp = temp_dir_in_workspace();

    sphinxlab(temp.path())
        .args(["--config", "missing.toml", "platform"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_NOT_FOUND"));
}

#[test]
fn test_explicit_config_path_is_used() {
    let temp = temp_dir_in_workspace();
    fs::create_dir(temp.path().join("conf")).unwrap();
    fs::write(
        temp.path().join("conf").join("docs.toml"),
        "[sphinx]\nplatform = \"osx-aarch_64\"\n",
    )
    .unwrap();

    sphinxlab(temp.path())
        .args(["platform", "--config", "conf/docs.toml"])
        .assert()
        .success()
        .stdout("osx-aarch_64\n");
}

#[test]
fn test_verbose_logs_platform_choice_to_stderr() {
    let temp = temp_dir_in_workspace();
    fs::write(
        temp.path().join("sphinxlab.toml"),
        "[sphinx]\nplatform = \"osx-aarch_64\"\n",
    )
    .unwrap();

    sphinxlab(temp.path())
        .args(["-v", "platform"])
        .assert()
        .success()
        .stdout("osx-aarch_64\n")
        .stderr(predicate::str::contains("Platform osx-aarch_64 (configured)"));

    sphinxlab(temp.path())
        .arg("platform")
        .assert()
        .success()
        .stderr(predicate::str::contains("Platform osx-aarch_64").not());
}
