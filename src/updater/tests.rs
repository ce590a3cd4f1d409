use super::*;
use crate::config::LauncherConfig;
use std::fs;
use std::io::Write;
use tempfile::TempDir;

const EXE: &str = "pos-test-exe";

fn make_config(temp: &TempDir) -> LauncherConfig {
    let mut config = LauncherConfig::default();
    config.app.name = "pos".to_string();
    config.app.executable = Some(EXE.to_string());
    config.release.owner = "acme".to_string();
    config.release.repo = "pos".to_string();
    config.paths.install_dir = Some(temp.path().join("install"));
    config.paths.temp_dir = Some(temp.path().join("downloads"));
    config
}

fn make_updater(temp: &TempDir) -> Updater {
    Updater::new(make_config(temp)).unwrap()
}

fn make_info(asset_name: &str) -> UpdateInfo {
    UpdateInfo {
        asset_id: 1,
        asset_name: asset_name.to_string(),
        version: Version::new(9, 9, 9),
        download_url: format!("https://example.com/{asset_name}"),
        changelog: String::new(),
        release_date: None,
        file_size: 0,
        checksum: None,
    }
}

/// Build a zip holding an executable and one nested data file.
fn write_test_zip(path: &Path, exe_content: &[u8]) {
    let file = fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    writer.start_file(EXE, options).unwrap();
    writer.write_all(exe_content).unwrap();
    writer.start_file("data/settings.toml", options).unwrap();
    writer.write_all(b"[pos]").unwrap();
    writer.finish().unwrap();
}

#[test]
fn test_initial_state_is_idle() {
    let temp = TempDir::new().unwrap();
    let updater = make_updater(&temp);
    assert_eq!(updater.state(), UpdateState::Idle);
    assert!(updater.update_info().is_none());
    assert!(updater.downloaded_file().is_none());
}

#[tokio::test]
async fn test_apply_without_download_fails() {
    let temp = TempDir::new().unwrap();
    let mut updater = make_updater(&temp);

    match updater.apply_update(true).await {
        Err(LauncherError::NoDownloadedFile) => {}
        other => panic!("Expected NoDownloadedFile, got {other:?}"),
    }
    assert_eq!(updater.state(), UpdateState::Failed(UpdateStage::Apply));
}

#[tokio::test]
async fn test_download_without_check_fails() {
    let temp = TempDir::new().unwrap();
    let mut updater = make_updater(&temp);

    match updater.download_update(None, |_, _| {}).await {
        Err(LauncherError::NoUpdateInfo) => {}
        other => panic!("Expected NoUpdateInfo, got {other:?}"),
    }
    assert_eq!(updater.state(), UpdateState::Failed(UpdateStage::Download));
}

#[tokio::test]
async fn test_apply_with_vanished_artifact_leaves_install_untouched() {
    let temp = TempDir::new().unwrap();
    let mut updater = make_updater(&temp);
    let config = make_config(&temp);

    // A previous apply left its artifact behind; the new download vanished
    fs::create_dir_all(config.install_dir()).unwrap();
    fs::write(config.install_dir().join("POS-Windows.zip"), b"old-zip").unwrap();

    updater.update_info = Some(make_info("POS-Windows.zip"));
    updater.downloaded_file = Some(config.temp_dir().join("POS-Windows.zip"));

    match updater.apply_update(true).await {
        Err(LauncherError::NoDownloadedFile) => {}
        other => panic!("Expected NoDownloadedFile, got {other:?}"),
    }

    assert_eq!(updater.state(), UpdateState::Failed(UpdateStage::Apply));
    // The existing artifact was never set aside
    assert_eq!(
        fs::read(config.install_dir().join("POS-Windows.zip")).unwrap(),
        b"old-zip"
    );
    assert!(!config.install_dir().join("POS-Windows.bak").exists());
}

#[tokio::test]
async fn test_apply_extracts_and_records_version() {
    let temp = TempDir::new().unwrap();
    let mut updater = make_updater(&temp);
    let config = make_config(&temp);

    let downloaded = config.temp_dir().join("POS-Windows.zip");
    fs::create_dir_all(config.temp_dir()).unwrap();
    write_test_zip(&downloaded, b"binary-v9");

    updater.update_info = Some(make_info("POS-Windows.zip"));
    updater.downloaded_file = Some(downloaded);

    updater.apply_update(true).await.unwrap();

    assert_eq!(updater.state(), UpdateState::Applied);
    let install = config.install_dir();
    assert_eq!(fs::read(install.join(EXE)).unwrap(), b"binary-v9");
    assert_eq!(fs::read(install.join("data/settings.toml")).unwrap(), b"[pos]");
    assert!(install.join("POS-Windows.zip").exists());
    assert_eq!(updater.installed_version(), Some(Version::new(9, 9, 9)));
}

#[tokio::test]
async fn test_apply_sets_previous_artifact_aside() {
    let temp = TempDir::new().unwrap();
    let mut updater = make_updater(&temp);
    let config = make_config(&temp);

    // A previous apply left its artifact in the install dir
    fs::create_dir_all(config.install_dir()).unwrap();
    fs::write(config.install_dir().join("POS-Windows.zip"), b"old-zip").unwrap();

    let downloaded = config.temp_dir().join("POS-Windows.zip");
    fs::create_dir_all(config.temp_dir()).unwrap();
    write_test_zip(&downloaded, b"binary-v9");

    updater.update_info = Some(make_info("POS-Windows.zip"));
    updater.downloaded_file = Some(downloaded);

    updater.apply_update(true).await.unwrap();

    // The new artifact replaced the old one and the .bak was consumed
    let artifact = config.install_dir().join("POS-Windows.zip");
    assert_ne!(fs::read(&artifact).unwrap(), b"old-zip");
    assert!(!config.install_dir().join("POS-Windows.bak").exists());
}

#[tokio::test]
async fn test_apply_invalid_archive_rolls_back() {
    let temp = TempDir::new().unwrap();
    let mut updater = make_updater(&temp);
    let config = make_config(&temp);

    fs::create_dir_all(config.install_dir()).unwrap();
    fs::write(config.install_dir().join("POS-Windows.zip"), b"old-zip").unwrap();

    let downloaded = config.temp_dir().join("POS-Windows.zip");
    fs::create_dir_all(config.temp_dir()).unwrap();
    fs::write(&downloaded, b"this is not a zip archive").unwrap();

    updater.update_info = Some(make_info("POS-Windows.zip"));
    updater.downloaded_file = Some(downloaded);

    match updater.apply_update(true).await {
        Err(LauncherError::InstallFailed {
            ..
        }) => {}
        other => panic!("Expected InstallFailed, got {other:?}"),
    }

    assert_eq!(updater.state(), UpdateState::Failed(UpdateStage::Apply));
    // The previous artifact is back in place
    assert_eq!(
        fs::read(config.install_dir().join("POS-Windows.zip")).unwrap(),
        b"old-zip"
    );
}

#[tokio::test]
async fn test_verify_download_mismatch_deletes_file() {
    let temp = TempDir::new().unwrap();
    let updater = make_updater(&temp);
    let config = make_config(&temp);

    fs::create_dir_all(config.temp_dir()).unwrap();
    let path = config.temp_dir().join("POS-Windows.zip");
    fs::write(&path, b"payload").unwrap();

    let mut info = make_info("POS-Windows.zip");
    info.checksum = Some(format!("sha256:{}", "0".repeat(64)));

    match updater.verify_download(&path, &info).await {
        Err(LauncherError::ChecksumMismatch {
            ..
        }) => {}
        other => panic!("Expected ChecksumMismatch, got {other:?}"),
    }
    assert!(!path.exists());
}

#[tokio::test]
async fn test_verify_download_accepts_matching_checksum() {
    let temp = TempDir::new().unwrap();
    let updater = make_updater(&temp);
    let config = make_config(&temp);

    fs::create_dir_all(config.temp_dir()).unwrap();
    let path = config.temp_dir().join("POS-Windows.zip");
    fs::write(&path, b"payload").unwrap();

    let mut info = make_info("POS-Windows.zip");
    info.checksum = Some(format!("sha256:{}", crate::verify::hash_file(&path).unwrap()));

    updater.verify_download(&path, &info).await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_verify_download_skips_unsupported_algorithm() {
    let temp = TempDir::new().unwrap();
    let updater = make_updater(&temp);
    let config = make_config(&temp);

    fs::create_dir_all(config.temp_dir()).unwrap();
    let path = config.temp_dir().join("POS-Windows.zip");
    fs::write(&path, b"payload").unwrap();

    let mut info = make_info("POS-Windows.zip");
    info.checksum = Some("sha512:deadbeef".to_string());

    updater.verify_download(&path, &info).await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_cleanup_removes_artifact_and_empty_temp_dir() {
    let temp = TempDir::new().unwrap();
    let mut updater = make_updater(&temp);
    let config = make_config(&temp);

    fs::create_dir_all(config.temp_dir()).unwrap();
    let path = config.temp_dir().join("POS-Windows.zip");
    fs::write(&path, b"payload").unwrap();
    updater.downloaded_file = Some(path.clone());

    updater.cleanup().await;

    assert!(!path.exists());
    assert!(!config.temp_dir().exists());
    assert!(updater.downloaded_file().is_none());
}

#[tokio::test]
async fn test_cleanup_preserves_non_empty_temp_dir() {
    let temp = TempDir::new().unwrap();
    let mut updater = make_updater(&temp);
    let config = make_config(&temp);

    fs::create_dir_all(config.temp_dir()).unwrap();
    let path = config.temp_dir().join("POS-Windows.zip");
    fs::write(&path, b"payload").unwrap();
    fs::write(config.temp_dir().join("other-run.partial"), b"x").unwrap();
    updater.downloaded_file = Some(path);

    updater.cleanup().await;

    assert!(config.temp_dir().exists());
    assert!(config.temp_dir().join("other-run.partial").exists());
}
