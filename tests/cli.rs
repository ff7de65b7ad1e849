//! End-to-end tests for the cmdweave binary

#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

const FAKE_HELP: &str = "#!/bin/sh
echo 'Usage: fake [options] <url>'
echo '  -d, --data <data>      POST data'
echo '  -X, --request <verb>   Request method'
";

fn cmdweave() -> Command {
    Command::cargo_bin("cmdweave").unwrap()
}

fn fake_tool(dir: &TempDir) -> String {
    let path = dir.path().join("fake");
    fs::write(&path, FAKE_HELP).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_compose_with_positional_names() {
    cmdweave()
        .args([
            "compose",
            "ffmpeg",
            "--no-double-dash",
            "-a",
            "i=video.mp4",
            "-a",
            "vcodec=libx264",
            "-a",
            "y=out.avi",
        ])
        .assert()
        .success()
        .stdout("ffmpeg -i 'video.mp4' -vcodec 'libx264' -y 'out.avi'\n");
}

#[test]
fn test_compose_long_names() {
    cmdweave()
        .args(["compose", "ls", "-a", "color_test", "-a", "g", "--raw", "/tmp"])
        .assert()
        .success()
        .stdout("ls --color-test -g /tmp\n");
}

#[test]
fn test_run_prints_output() {
    cmdweave()
        .args(["run", "echo", "--raw", "hello"])
        .assert()
        .success()
        .stdout("hello\n");
}

#[test]
fn test_run_nonzero_exit_fails() {
    cmdweave()
        .args(["run", "ls", "--raw", "/not/a/path"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exited with an error"));
}

#[test]
fn test_run_timeout_fails() {
    cmdweave()
        .args(["run", "sleep", "--raw", "5", "--timeout", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Timeout error"));
}

#[test]
fn test_run_missing_binary_fails() {
    cmdweave()
        .args(["run", "nonexistent_command_12345"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be started"));
}

#[test]
fn test_help_and_safe_args_from_script() {
    let dir = TempDir::new().unwrap();
    let fake = fake_tool(&dir);

    cmdweave()
        .args(["help", "fake", "--bin", &fake])
        .assert()
        .success()
        .stdout(predicate::str::contains("-d, --data <data>      POST data"));

    cmdweave()
        .args(["safe-args", "fake", "--bin", &fake])
        .assert()
        .success()
        .stdout("--data\n--request\n-X\n-d\n");
}

#[test]
fn test_compose_safe_mode_drops_unknown_flags() {
    let dir = TempDir::new().unwrap();
    let fake = fake_tool(&dir);

    cmdweave()
        .args([
            "compose", "fake", "--bin", &fake, "--safe", "-a", "request=POST", "-a", "nope=1",
            "-a", "data=x",
        ])
        .assert()
        .success()
        .stdout(format!("{fake} --request 'POST' --data 'x'\n"));
}
