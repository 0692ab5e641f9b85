//! Integration tests for backup listing, restore and purge.

use assert_cmd::Command;
use filetime::FileTime;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const DAY: u64 = 86_400;
const QUARANTINE: &str = "wp-content/rootsweep-backups";

fn rootsweep(site: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rootsweep").unwrap();
    cmd.arg("--config")
        .arg(site.join("rootsweep.toml"))
        .arg("--root")
        .arg(site);
    cmd
}

fn write_aged(path: &Path, content: &str, days: u64) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    let when = SystemTime::now() - Duration::from_secs(days * DAY);
    filetime::set_file_mtime(path, FileTime::from_system_time(when)).unwrap();
}

/// A site whose old files have already been cleaned with backups.
fn create_cleaned_site() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    fs::write(root.join("rootsweep.toml"), "").unwrap();
    write_aged(&root.join("wp-content/uploads/2019/photo.jpg"), "jpeg bytes", 400);
    write_aged(&root.join("wp-content/upgrade/report.pdf"), "pdf", 90);

    rootsweep(root)
        .args(["clean", "old", "--force"])
        .assert()
        .success();
    assert!(!root.join("wp-content/uploads/2019/photo.jpg").exists());

    tmp
}

fn blob_named(site: &Path, suffix: &str) -> String {
    fs::read_dir(site.join(QUARANTINE))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .find(|n| n.ends_with(suffix))
        .unwrap()
}

#[test]
fn test_backups_list() {
    let tmp = create_cleaned_site();

    rootsweep(tmp.path())
        .args(["backups", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_photo.jpg"))
        .stdout(predicate::str::contains("wp-content/uploads/2019/photo.jpg"))
        .stdout(predicate::str::contains("_report.pdf"));
}

#[test]
fn test_backups_restore() {
    let tmp = create_cleaned_site();
    let root = tmp.path();
    let original = root.join("wp-content/uploads/2019/photo.jpg");
    let name = blob_named(root, "_photo.jpg");

    rootsweep(root)
        .args(["backups", "restore", name.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored"));

    assert_eq!(fs::read_to_string(&original).unwrap(), "jpeg bytes");
    let mtime = fs::metadata(&original).unwrap().modified().unwrap();
    let age = SystemTime::now().duration_since(mtime).unwrap();
    assert!(age > Duration::from_secs(399 * DAY));

    // a second restore would overwrite
    rootsweep(root)
        .args(["backups", "restore", name.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_backups_restore_unknown_name() {
    let tmp = create_cleaned_site();

    rootsweep(tmp.path())
        .args(["backups", "restore", "20200101-000000_0000000000000000_nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backup not found"));
}

#[test]
fn test_backups_size() {
    let tmp = create_cleaned_site();

    rootsweep(tmp.path())
        .args(["backups", "size"])
        .assert()
        .success()
        .stdout(predicate::str::contains("13 B in 2 backups"));
}

#[test]
fn test_backups_purge() {
    let tmp = create_cleaned_site();
    let root = tmp.path();

    rootsweep(root)
        .args(["backups", "purge"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Purged 0 backups"));

    std::thread::sleep(Duration::from_millis(20));
    rootsweep(root)
        .args(["backups", "purge", "--days", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Purged 2 backups"));

    assert!(root.join(QUARANTINE).join(".htaccess").exists());
    rootsweep(root)
        .args(["backups", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups"));
}

#[test]
fn test_backups_without_quarantine() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("rootsweep.toml"), "").unwrap();

    rootsweep(tmp.path())
        .args(["backups", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups"));
    assert!(!tmp.path().join(QUARANTINE).exists());
}
