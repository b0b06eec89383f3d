// Command-line behaviour of the dumpvault binary against a throwaway
// config directory. Nothing here talks to a database server.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const KEPT: &str = "mysql_backup_20250310_db1_shop.zip";
const EXPIRED: &str = "mysql_backup_20240110_db1_shop.zip";

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("config.json");
    fs::write(&path, body).unwrap();
    path
}

fn dumpvault(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dumpvault").unwrap();
    cmd.env_remove("DUMPVAULT_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config);
    cmd
}

fn seed_backups(dir: &Path) {
    let backups = dir.join("backups");
    fs::create_dir_all(&backups).unwrap();
    fs::write(backups.join(KEPT), b"PK kept").unwrap();
    fs::write(backups.join(EXPIRED), b"PK expired").unwrap();
    fs::write(backups.join("notes.txt"), b"not an artifact").unwrap();
}

#[test]
fn test_no_subcommand_prints_hint() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), "{}");

    dumpvault(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("dumpvault --help"));
}

#[test]
fn test_status_without_backups() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), r#"{"backup_dir": "backups"}"#);

    dumpvault(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups found."))
        .stdout(predicate::str::contains("Remote:           not configured"));
}

#[test]
fn test_status_shows_keep_reason() {
    let temp_dir = TempDir::new().unwrap();
    seed_backups(temp_dir.path());
    let config = write_config(temp_dir.path(), r#"{"backup_dir": "backups"}"#);

    dumpvault(&config)
        .args(["status", "--today", "2025-03-12"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(format!("2025-03-10  daily .*{KEPT}")).unwrap())
        .stdout(predicate::str::is_match(format!("2024-01-10  expired .*{EXPIRED}")).unwrap())
        .stdout(predicate::str::contains("notes.txt").not())
        .stdout(predicate::str::contains("Total: 2 backup(s)"));
}

#[test]
fn test_config_path_from_environment() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), r#"{"mysql_user": "from-env"}"#);

    Command::cargo_bin("dumpvault")
        .unwrap()
        .env("DUMPVAULT_CONFIG", &config)
        .env_remove("RUST_LOG")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("from-env@"));
}

#[test]
fn test_prune_without_force_is_dry_run() {
    let temp_dir = TempDir::new().unwrap();
    seed_backups(temp_dir.path());
    let config = write_config(temp_dir.path(), r#"{"backup_dir": "backups"}"#);

    dumpvault(&config)
        .args(["prune", "--today", "2025-03-12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("To be deleted: 1 local backup(s)"))
        .stdout(predicate::str::contains("--force"));

    assert!(temp_dir.path().join("backups").join(EXPIRED).exists());
}

#[test]
fn test_prune_force_deletes_local_and_remote() {
    let temp_dir = TempDir::new().unwrap();
    seed_backups(temp_dir.path());
    let remote = temp_dir.path().join("remote");
    fs::create_dir_all(&remote).unwrap();
    fs::write(remote.join(EXPIRED), b"PK expired").unwrap();
    fs::write(remote.join(KEPT), b"PK kept").unwrap();
    let config = write_config(
        temp_dir.path(),
        r#"{"backup_dir": "backups", "remote": {"dir": "remote"}}"#,
    );

    dumpvault(&config)
        .args(["prune", "--today", "2025-03-12", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 deleted, 1 kept"));

    let backups = temp_dir.path().join("backups");
    assert!(!backups.join(EXPIRED).exists());
    assert!(backups.join(KEPT).exists());
    assert!(backups.join("notes.txt").exists());
    assert!(!remote.join(EXPIRED).exists());
    assert!(remote.join(KEPT).exists());
}

#[test]
fn test_sync_mirrors_backup_directory() {
    let temp_dir = TempDir::new().unwrap();
    seed_backups(temp_dir.path());
    let remote = temp_dir.path().join("mirror").join("nested");
    fs::create_dir_all(&remote).unwrap();
    fs::write(remote.join("mysql_backup_20200101_db1_gone.zip"), b"PK old").unwrap();
    let config = write_config(
        temp_dir.path(),
        r#"{"backup_dir": "backups", "remote": {"dir": "mirror/nested"}}"#,
    );

    dumpvault(&config)
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 uploaded, 1 removed, 0 unchanged"));

    assert_eq!(fs::read(remote.join(KEPT)).unwrap(), b"PK kept");
    assert!(remote.join(EXPIRED).exists());
    assert!(!remote.join("notes.txt").exists());
    assert!(!remote.join("mysql_backup_20200101_db1_gone.zip").exists());
}

#[test]
fn test_sync_requires_remote_section() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), r#"{"backup_dir": "backups"}"#);

    dumpvault(&config)
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"remote\" section"));
}

#[test]
fn test_fetch_by_wildcard() {
    let temp_dir = TempDir::new().unwrap();
    let remote = temp_dir.path().join("remote");
    fs::create_dir_all(&remote).unwrap();
    fs::write(remote.join(KEPT), b"PK kept").unwrap();
    fs::write(remote.join(EXPIRED), b"PK expired").unwrap();
    let dest = temp_dir.path().join("restore-here");
    let config = write_config(
        temp_dir.path(),
        r#"{"backup_dir": "backups", "remote": {"dir": "remote"}}"#,
    );

    dumpvault(&config)
        .args(["fetch", "mysql_backup_2025*"])
        .arg("--dest")
        .arg(&dest)
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetched 1 file(s)"));

    assert_eq!(fs::read(dest.join(KEPT)).unwrap(), b"PK kept");
    assert!(!dest.join(EXPIRED).exists());
}

#[test]
fn test_fetch_unknown_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("remote")).unwrap();
    let config = write_config(
        temp_dir.path(),
        r#"{"backup_dir": "backups", "remote": {"dir": "remote"}}"#,
    );

    dumpvault(&config)
        .args(["fetch", "mysql_backup_20250101_db1_x.zip"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_config_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), "{ not json");

    dumpvault(&config)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load"));
}

#[test]
fn test_rejects_malformed_date() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), "{}");

    dumpvault(&config)
        .args(["prune", "--today", "12/03/2025"])
        .assert()
        .failure();
}
