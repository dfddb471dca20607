//! Integration tests for the command line front-end
//!
//! Drives the built binary against a temporary config and save directory.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Helper to create a config directory with one package
fn setup_test_configs() -> TempDir {
    let dir = TempDir::new().unwrap();
    let confdir = dir.path().join("config");
    fs::create_dir(&confdir).unwrap();
    fs::write(
        confdir.join("network"),
        r#"
config interface 'loopback'
	option proto 'static'
	option ipaddr '127.0.0.1'

config interface 'lan'
	option proto 'static'
	list dns '1.1.1.1'
	list dns '8.8.8.8'

config route
	option target '10.0.0.0'
"#,
    )
    .unwrap();
    dir
}

fn ucikit(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ucikit"))
        .arg("--confdir")
        .arg(dir.join("config"))
        .arg("--savedir")
        .arg(dir.join("save"))
        .args(args)
        .env_remove("UCI_CONFDIR")
        .env_remove("UCI_SAVEDIR")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_ucikit"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("commit"));
    assert!(text.contains("revert"));
}

#[test]
fn test_list_and_get() {
    let dir = setup_test_configs();

    let output = ucikit(dir.path(), &["list"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "network\n");

    let output = ucikit(dir.path(), &["get", "network.lan.proto"]);
    assert_eq!(stdout(&output), "static\n");

    let output = ucikit(dir.path(), &["get", "network.@interface[-1].dns"]);
    assert_eq!(stdout(&output), "1.1.1.1 8.8.8.8\n");

    let output = ucikit(dir.path(), &["get", "network.@route[0].target"]);
    assert_eq!(stdout(&output), "10.0.0.0\n");
}

#[test]
fn test_missing_entry_fails() {
    let dir = setup_test_configs();
    let output = ucikit(dir.path(), &["get", "network.lan.gateway"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Entry not found"), "stderr: {stderr}");
}

#[test]
fn test_set_stages_then_commit_writes() {
    let dir = setup_test_configs();

    let output = ucikit(dir.path(), &["set", "network.lan.proto=dhcp"]);
    assert!(output.status.success());
    let history = fs::read_to_string(dir.path().join("save/network")).unwrap();
    assert_eq!(history, "network.lan.proto='dhcp'\n");

    let output = ucikit(dir.path(), &["changes"]);
    assert!(stdout(&output).contains("network.lan.proto='dhcp'"));

    let output = ucikit(dir.path(), &["get", "network.lan.proto"]);
    assert_eq!(stdout(&output), "dhcp\n");
    let original = fs::read_to_string(dir.path().join("config/network")).unwrap();
    assert!(original.contains("option proto 'static'"));

    let output = ucikit(dir.path(), &["commit", "network"]);
    assert!(output.status.success());
    let committed = fs::read_to_string(dir.path().join("config/network")).unwrap();
    assert!(committed.contains("config 'interface' 'lan'\n\toption 'proto' 'dhcp'\n"));
    assert!(committed.contains("config 'route'\n"));
    assert_eq!(
        fs::read_to_string(dir.path().join("save/network")).unwrap(),
        ""
    );
}

#[test]
fn test_changes_json() {
    let dir = setup_test_configs();
    ucikit(dir.path(), &["delete", "network.loopback"]);
    let output = ucikit(dir.path(), &["changes", "network", "--json"]);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report[0]["package"], "network");
    assert_eq!(report[0]["changes"][0]["kind"], "remove");
    assert_eq!(report[0]["changes"][0]["section"], "loopback");
}

#[test]
fn test_revert_discards_staged_change() {
    let dir = setup_test_configs();
    ucikit(dir.path(), &["set", "network.lan.proto=dhcp"]);
    ucikit(dir.path(), &["set", "network.loopback.ipaddr=127.0.0.2"]);

    let output = ucikit(dir.path(), &["revert", "network.lan"]);
    assert!(output.status.success());

    let output = ucikit(dir.path(), &["get", "network.lan.proto"]);
    assert_eq!(stdout(&output), "static\n");
    let output = ucikit(dir.path(), &["get", "network.loopback.ipaddr"]);
    assert_eq!(stdout(&output), "127.0.0.2\n");
}

#[test]
fn test_add_prints_generated_name() {
    let dir = setup_test_configs();
    let output = ucikit(dir.path(), &["add", "network", "switch"]);
    assert!(output.status.success());
    let name = stdout(&output).trim().to_string();
    assert!(name.starts_with("cfg"));
    assert_eq!(name.len(), 9);

    let output = ucikit(dir.path(), &["get", &format!("network.{name}")]);
    assert_eq!(stdout(&output), "switch\n");
}

#[test]
fn test_export_and_import() {
    let dir = setup_test_configs();
    let output = ucikit(dir.path(), &["export", "network"]);
    assert!(output.status.success());
    let exported = stdout(&output);
    assert!(exported.starts_with("package 'network'\n"));

    let mut child = Command::new(env!("CARGO_BIN_EXE_ucikit"))
        .arg("--confdir")
        .arg(dir.path().join("config"))
        .arg("--savedir")
        .arg(dir.path().join("save"))
        .args(["import", "copy"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"config system main\n\toption hostname 'router'\n")
        .unwrap();
    assert!(child.wait().unwrap().success());

    let output = ucikit(dir.path(), &["get", "copy.main.hostname"]);
    assert_eq!(stdout(&output), "router\n");
}

#[test]
fn test_parse_error_rendering() {
    let dir = setup_test_configs();
    fs::write(dir.path().join("config/broken"), "config a b\noption x 'open\n").unwrap();
    let output = ucikit(dir.path(), &["show", "broken"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Parse error (unterminated ') at line 2"),
        "stderr: {stderr}"
    );
}
