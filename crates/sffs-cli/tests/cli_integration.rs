#![allow(deprecated)] // cargo_bin! macro doesn't exist yet in assert_cmd 2.1

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn sffs() -> Command {
    let mut cmd = Command::cargo_bin("sffs").unwrap();
    cmd.env_remove("SFFS_CONFIG").env_remove("RUST_LOG");
    cmd
}

/// A host folder with a small tree in it.
fn host_folder() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::create_dir(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs").join("notes.txt"), b"remember the milk\n").unwrap();
    fs::write(dir.path().join("docs").join(".hidden"), b"").unwrap();
    fs::create_dir(dir.path().join("docs").join("nested")).unwrap();
    for i in 0..20 {
        fs::write(dir.path().join(format!("file-{i:02}.txt")), format!("{i}")).unwrap();
    }
    dir
}

// ============================================================================
// ls
// ============================================================================

#[test]
fn test_ls_lists_names() {
    let host = host_folder();
    sffs()
        .arg("ls")
        .arg(host.path())
        .arg("docs")
        .assert()
        .success()
        .stdout(predicate::str::contains("notes.txt"))
        .stdout(predicate::str::contains("nested"))
        .stdout(predicate::str::contains(".hidden").not());
}

#[test]
fn test_ls_all_shows_dots() {
    let host = host_folder();
    sffs()
        .args(["ls", "-a"])
        .arg(host.path())
        .arg("docs")
        .assert()
        .success()
        .stdout(predicate::str::contains(".hidden"))
        .stdout(predicate::str::is_match(r"(?m)^\.\.$").unwrap());
}

#[test]
fn test_ls_small_buffer_sees_every_entry() {
    let host = host_folder();
    let output = sffs()
        .args(["ls", "--json", "--buffer-size", "280"])
        .arg(host.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = json["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 21);
    assert!(names.contains(&"docs"));
    assert!(names.contains(&"file-19.txt"));
    assert_eq!(json["readdir_calls"], 4);
}

#[test]
fn test_ls_buffer_below_one_record_is_usage_error() {
    let host = host_folder();
    sffs()
        .args(["ls", "--buffer-size", "32"])
        .arg(host.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--buffer-size"));
}

#[test]
fn test_ls_long_format() {
    let host = host_folder();
    sffs()
        .args(["ls", "-l"])
        .arg(host.path())
        .arg("docs")
        .assert()
        .success()
        .stdout(predicate::str::contains("-r--r--r--"))
        .stdout(predicate::str::contains("dr-xr-xr-x"));
}

#[test]
fn test_ls_on_file_fails() {
    let host = host_folder();
    sffs()
        .arg("ls")
        .arg(host.path())
        .arg("docs/notes.txt")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a directory"));
}

// ============================================================================
// cat / stat / pathconf
// ============================================================================

#[test]
fn test_cat_prints_contents() {
    let host = host_folder();
    sffs()
        .args(["cat", "--chunk-size", "4"])
        .arg(host.path())
        .arg("/docs/notes.txt")
        .assert()
        .success()
        .stdout("remember the milk\n");
}

#[test]
fn test_cat_missing_file_is_not_found() {
    let host = host_folder();
    sffs()
        .arg("cat")
        .arg(host.path())
        .arg("docs/missing.txt")
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_cat_directory_fails() {
    let host = host_folder();
    sffs()
        .arg("cat")
        .arg(host.path())
        .arg("docs")
        .assert()
        .failure();
}

#[test]
fn test_stat_json() {
    let host = host_folder();
    let output = sffs()
        .args(["stat", "--json"])
        .arg(host.path())
        .arg("docs/notes.txt")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["size"], 18);
    assert_eq!(json["nlink"], 1);
    assert_eq!(json["mode"], 0o100444);
}

#[test]
fn test_stat_table_for_root() {
    let host = host_folder();
    sffs()
        .arg("stat")
        .arg(host.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("File id"))
        .stdout(predicate::str::contains("dr-xr-xr-x"));
}

#[test]
fn test_pathconf_limits() {
    let host = host_folder();
    sffs()
        .arg("pathconf")
        .arg(host.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("65535"))
        .stdout(predicate::str::contains("255"))
        .stdout(predicate::str::contains("1024"));
}

// ============================================================================
// stats / config / errors
// ============================================================================

#[test]
fn test_stats_json_counts_provider_calls() {
    let host = host_folder();
    let output = sffs()
        .args(["stats", "--format", "json"])
        .arg(host.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["listings"].as_u64().unwrap() >= 3);
    assert_eq!(json["close_errors"], 0);
    assert_eq!(json["opens"], json["closes"]);
}

#[test]
fn test_config_file_sets_owner() {
    let host = host_folder();
    let config_dir = TempDir::new().unwrap();
    let config = config_dir.path().join("sffs.toml");
    fs::write(&config, "[mount]\nuid = 501\ngid = 20\nfile_mask = 0o077\n").unwrap();

    let output = sffs()
        .env("SFFS_CONFIG", &config)
        .args(["stat", "--json"])
        .arg(host.path())
        .arg("docs/notes.txt")
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["uid"], 501);
    assert_eq!(json["gid"], 20);
    assert_eq!(json["mode"], 0o100400);
}

#[test]
fn test_invalid_config_is_rejected() {
    let host = host_folder();
    let config_dir = TempDir::new().unwrap();
    let config = config_dir.path().join("sffs.toml");
    fs::write(&config, "[mount]\nsegment_size = 8\n").unwrap();

    sffs()
        .arg("--config")
        .arg(&config)
        .arg("ls")
        .arg(host.path())
        .assert()
        .code(4);
}

#[test]
fn test_missing_host_folder() {
    let host = TempDir::new().unwrap();
    sffs()
        .arg("ls")
        .arg(host.path().join("absent"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Cannot serve host folder"));
}

#[test]
fn test_quiet_suppresses_error_output() {
    let host = host_folder();
    sffs()
        .args(["-q", "cat"])
        .arg(host.path())
        .arg("nope")
        .assert()
        .failure()
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_help_shows_commands() {
    sffs()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ls"))
        .stdout(predicate::str::contains("pathconf"))
        .stdout(predicate::str::contains("stats"));
}
