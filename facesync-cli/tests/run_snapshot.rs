use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn facesync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("facesync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("RUST_LOG", "warn");
    cmd
}

/// One directory contact linked to an avatar, one with no counterpart.
fn write_snapshots(root: &Path, remote_has_photo: bool) -> Vec<String> {
    fs::create_dir_all(root.join("avatars")).expect("avatars dir");
    fs::write(
        root.join("directory.json"),
        format!(
            r#"[
                {{"id": "people/c1", "numbers": ["(555) 010-0"], "has_photo": {remote_has_photo}}},
                {{"id": "people/c2", "numbers": ["777"], "has_photo": false}}
            ]"#
        ),
    )
    .expect("directory contacts");
    fs::write(
        root.join("messaging.json"),
        r#"[{"id": "w1", "numbers": ["5550100"], "has_photo": true}]"#,
    )
    .expect("messaging contacts");
    fs::write(root.join("avatars").join("w1.jpg"), b"imgdata").expect("avatar");

    let arg = |p: PathBuf| p.display().to_string();
    vec![
        "--directory-contacts".into(),
        arg(root.join("directory.json")),
        "--directory-photos".into(),
        arg(root.join("uploaded")),
        "--messaging-contacts".into(),
        arg(root.join("messaging.json")),
        "--messaging-photos".into(),
        arg(root.join("avatars")),
    ]
}

fn events(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8(stdout.to_vec())
        .expect("stdout utf8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

#[test]
fn run_prints_progress_as_json_lines_and_uploads_photo() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let args = write_snapshots(work.path(), false);

    let assert = facesync_cmd(home.path())
        .arg("run")
        .args(&args)
        .assert()
        .success()
        .stderr(contains("synced"));

    let events = events(&assert.get_output().stdout);
    assert_eq!(events.len(), 3, "events: {events:?}");
    assert_eq!(events[0]["type"], "syncProgress");
    assert_eq!(events[0]["data"]["syncCount"], 1);
    assert_eq!(events[0]["data"]["totalContacts"], 2);
    assert!(events[0]["data"]["image"].is_string());
    assert!(events[1]["data"]["image"].is_null());
    assert_eq!(events[2]["data"]["progress"], 100.0);
    assert_eq!(events[2]["data"]["syncCount"], 1);

    let uploaded =
        fs::read(work.path().join("uploaded").join("people_2Fc1.jpg")).expect("uploaded photo");
    assert_eq!(uploaded, b"imgdata");
}

#[test]
fn keep_existing_skips_contacts_with_photos() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let args = write_snapshots(work.path(), true);

    let assert = facesync_cmd(home.path())
        .args(["run", "--keep-existing", "--json"])
        .args(&args)
        .assert()
        .success();

    let events = events(&assert.get_output().stdout);
    assert_eq!(events.len(), 2, "events: {events:?}");
    assert_eq!(events[0]["data"]["progress"], 50.0);
    assert_eq!(events[0]["data"]["syncCount"], 0);
    assert_eq!(events[1]["data"]["progress"], 100.0);

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).expect("stderr utf8");
    assert!(stderr.contains("\"skipped\": 1"), "stderr: {stderr}");
    assert!(!work.path().join("uploaded").join("people_2Fc1.jpg").exists());
}

#[test]
fn missing_snapshot_file_fails_with_context() {
    let home = TempDir::new().expect("home");
    let work = TempDir::new().expect("work");
    let mut args = write_snapshots(work.path(), false);
    args[5] = work.path().join("absent.json").display().to_string();

    facesync_cmd(home.path())
        .arg("run")
        .args(&args)
        .assert()
        .failure()
        .stderr(contains("failed to load snapshot files"))
        .stderr(contains("absent.json"));
}
