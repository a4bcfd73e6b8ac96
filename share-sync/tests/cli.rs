use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{read_to_string, write};
use std::path::Path;
use tempfile::tempdir;

/// Line-format settings pointing at a closed local port; nothing may be
/// contacted as long as the upload folder holds no files.
fn write_settings(path: &Path, upload_dir: &Path) {
    write(
        path,
        format!(
            "hostname: 127.0.0.1\nport: 9\nusername: alice\npassword: secret\nrootPath: /remote.php/dav/files/alice/\nuploadFolder: {}\nOCSEndPoint: /ocs/v2.php/apps/files_sharing/api/v1/\n",
            upload_dir.display()
        ),
    )
    .expect("Writing temp config failed");
}

#[test]
fn missing_config_is_bootstrapped_and_run_stops() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("settings.conf");

    let mut cmd = Command::cargo_bin("share-sync").expect("Binary exists");
    cmd.arg("--config").arg(&config).env_remove("SHARE_SYNC_PASSWORD");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("placeholder"));
    assert!(read_to_string(&config).unwrap().contains("# hostname:"));
}

#[test]
fn invalid_config_fails_before_processing() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("settings.conf");
    write(&config, "port: 443\n").unwrap();

    let mut cmd = Command::cargo_bin("share-sync").expect("Binary exists");
    cmd.arg("--config").arg(&config);

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("Failed to parse line config"))
        .stderr(predicate::str::contains("hostname"));
}

#[test]
fn configured_log_file_receives_run_events() {
    let dir = tempdir().unwrap();
    let upload_dir = dir.path().join("Uploads");
    std::fs::create_dir(&upload_dir).unwrap();
    let log_file = dir.path().join("logs").join("share-sync.log");
    let config = dir.path().join("settings.yaml");
    write(
        &config,
        format!(
            "NextCloud:\n  Hostname: 127.0.0.1\n  Port: 9\n  Username: alice\n  Password: secret\n  RootPath: /remote.php/dav/files/alice/\n  UploadFolder: {}\n  OCSEndPoint: /ocs/v2.php/apps/files_sharing/api/v1/\nLogging:\n  Level: info\n  File: {}\n",
            upload_dir.display(),
            log_file.display()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("share-sync").expect("Binary exists");
    cmd.arg("--config").arg(&config);
    cmd.assert().success();

    let logged = read_to_string(&log_file).expect("log file written");
    assert!(logged.contains("Synchronisation complete"), "got: {logged}");
}

#[test]
fn missing_upload_folder_is_created_and_run_succeeds() {
    let dir = tempdir().unwrap();
    let upload_dir = dir.path().join("Uploads");
    let config = dir.path().join("settings.conf");
    write_settings(&config, &upload_dir);

    let mut cmd = Command::cargo_bin("share-sync").expect("Binary exists");
    cmd.arg("--config").arg(&config);
    cmd.assert().success();

    assert!(upload_dir.is_dir());

    // Second run over the now empty folder changes nothing.
    let mut cmd = Command::cargo_bin("share-sync").expect("Binary exists");
    cmd.arg("--config").arg(&config);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Synchronisation complete"));
    assert_eq!(std::fs::read_dir(&upload_dir).unwrap().count(), 0);
}

#[test]
fn transport_failure_aborts_with_error_and_keeps_file() {
    let dir = tempdir().unwrap();
    let upload_dir = dir.path().join("Uploads");
    std::fs::create_dir(&upload_dir).unwrap();
    write(upload_dir.join("report.pdf"), b"%PDF").unwrap();
    let config = dir.path().join("settings.conf");
    write_settings(&config, &upload_dir);

    let mut cmd = Command::cargo_bin("share-sync").expect("Binary exists");
    cmd.arg("--config").arg(&config);
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("Synchronisation aborted"));

    assert!(upload_dir.join("report.pdf").exists());
}
