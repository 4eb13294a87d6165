#![cfg(unix)]

use std::ffi::OsStr;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, Output};

const SIGABRT: i32 = 6;

struct Sandbox {
    _root: tempfile::TempDir,
    home: std::path::PathBuf,
    workspace: std::path::PathBuf,
    bin: std::path::PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let home = root.path().join("home");
        let workspace = root.path().join("ws");
        let bin = root.path().join("bin");
        for d in [&home, &workspace, &bin] {
            fs::create_dir_all(d).unwrap();
        }
        fs::create_dir_all(workspace.join("public")).unwrap();
        Sandbox { _root: root, home, workspace, bin }
    }

    fn fake_rsync(&self, body: &str) {
        let path = self.bin.join("rsync");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn command(&self, inputs: &[(&str, &str)]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_rsync-deploy"));
        cmd.env_clear()
            .env("PATH", format!("{}:/usr/bin:/bin", self.bin.display()))
            .env("HOME", &self.home)
            .env("GITHUB_WORKSPACE", &self.workspace);
        for (k, v) in inputs {
            cmd.env(k, v);
        }
        cmd
    }
}

const VALID: &[(&str, &str)] = &[
    ("REMOTE_HOST", "host"),
    ("REMOTE_USER", "user"),
    ("SSH_PRIVATE_KEY", "SECRET-KEY-MATERIAL\n"),
    ("REMOTE_PATH", "/var/www/site"),
    ("SOURCE", "public/"),
];

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to spawn rsync-deploy")
}

fn key_file(home: &Path) -> std::path::PathBuf {
    home.join(".ssh").join("deploy_key")
}

#[test]
fn failed_transfer_aborts_with_diagnostics() {
    let sb = Sandbox::new();
    sb.fake_rsync("echo 'rsync error: some files could not be transferred' >&2\nexit 23");

    let out = run(&mut sb.command(VALID));
    assert_eq!(out.status.code(), None, "expected abnormal termination");
    assert_eq!(out.status.signal(), Some(SIGABRT));

    let stderr = text(&out.stderr);
    assert!(stderr.contains("some files could not be transferred"), "stderr: {}", stderr);
    assert!(stderr.contains("cmd: rsync --exclude=.git"), "stderr: {}", stderr);
    assert!(stderr.contains("user@host:/var/www/site/"), "stderr: {}", stderr);
    assert!(key_file(&sb.home).exists());
}

#[test]
fn successful_transfer_exits_cleanly() {
    let sb = Sandbox::new();
    sb.fake_rsync("echo 'sent 100 bytes'");

    let out = run(&mut sb.command(VALID));
    assert_eq!(out.status.code(), Some(0), "stderr: {}", text(&out.stderr));
    assert!(text(&out.stdout).contains("[rsync] completed"));
    assert!(text(&out.stderr).contains("sent 100 bytes"));
    assert_eq!(fs::read_to_string(key_file(&sb.home)).unwrap(), "SECRET-KEY-MATERIAL\n");
}

#[test]
fn missing_inputs_exit_with_error_before_side_effects() {
    let sb = Sandbox::new();
    sb.fake_rsync("exit 0");

    let out = run(&mut sb.command(&[("REMOTE_PATH", "/srv")]));
    assert_eq!(out.status.code(), Some(1));
    let stderr = text(&out.stderr);
    assert!(
        stderr.contains("Missing required inputs: REMOTE_HOST, REMOTE_USER, SSH_PRIVATE_KEY"),
        "stderr: {}",
        stderr
    );
    assert!(!sb.home.join(".ssh").exists());
}

#[test]
fn prefixed_inputs_are_accepted() {
    let sb = Sandbox::new();
    sb.fake_rsync("exit 0");
    let prefixed: Vec<(String, &str)> =
        VALID.iter().map(|(k, v)| (format!("INPUT_{}", k), *v)).collect();
    let prefixed: Vec<(&str, &str)> = prefixed.iter().map(|(k, v)| (k.as_str(), *v)).collect();

    let out = run(&mut sb.command(&prefixed));
    assert_eq!(out.status.code(), Some(0), "stderr: {}", text(&out.stderr));
}

#[test]
fn dry_run_prints_plan_without_side_effects() {
    let sb = Sandbox::new();
    let marker = sb.bin.join("ran");
    sb.fake_rsync(&format!("touch '{}'", marker.display()));

    let out = run(sb.command(VALID).arg("--dry-run"));
    assert_eq!(out.status.code(), Some(0), "stderr: {}", text(&out.stderr));

    let stdout = text(&out.stdout);
    let json_end = stdout.rfind('}').expect("json plan in stdout");
    let plan: serde_json::Value = serde_json::from_str(&stdout[..=json_end]).unwrap();
    assert_eq!(plan["destination"], "user@host:/var/www/site/");
    assert_eq!(plan["source"], format!("{}/public/", sb.workspace.display()));
    assert!(stdout.contains("--rsh"));
    assert!(!stdout.contains("SECRET-KEY-MATERIAL"));
    assert!(!sb.home.join(".ssh").exists());
    assert!(!marker.exists());
}

#[test]
fn missing_rsync_with_failing_installer_exits_with_error() {
    let sb = Sandbox::new();
    // only the sandbox bin on PATH, so no system rsync is found
    std::os::unix::fs::symlink("/bin/sh", sb.bin.join("sh")).unwrap();

    let mut cmd = sb.command(VALID);
    cmd.env("PATH", &sb.bin).args(["--install-command", "exit 7"]);
    let out = run(&mut cmd);

    assert_eq!(out.status.code(), Some(1), "stderr: {}", text(&out.stderr));
    let stderr = text(&out.stderr);
    assert!(stderr.contains("rsync install failed"), "stderr: {}", stderr);
    assert!(stderr.contains("exit 7"), "stderr: {}", stderr);
}

#[test]
fn non_utf8_bare_input_still_wins_over_prefixed() {
    let sb = Sandbox::new();
    let inputs: Vec<(&str, &str)> =
        VALID.iter().copied().filter(|(k, _)| *k != "REMOTE_HOST").collect();

    let mut cmd = sb.command(&inputs);
    cmd.env("REMOTE_HOST", OsStr::from_bytes(b"ho\xffst"))
        .env("INPUT_REMOTE_HOST", "other.example")
        .arg("--dry-run");
    let out = run(&mut cmd);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", text(&out.stderr));

    let stdout = text(&out.stdout);
    assert!(stdout.contains("user@ho\u{FFFD}st:/var/www/site/"), "stdout: {}", stdout);
    assert!(!stdout.contains("other.example"), "stdout: {}", stdout);
}
