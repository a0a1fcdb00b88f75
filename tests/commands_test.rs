mod common;

use common::{create_project, write};
use fsbuild::build::BuildOptions;
use fsbuild::commands::{archive_matcher, info_report, install_command, uninstall_command, verify_command, verify_targets};
use fsbuild::config::BuildConfig;
use fsbuild::error::Error;

fn config_for(fs_folder: &std::path::Path) -> BuildConfig {
    let yml = format!("fs_folder: {}\ninstallations:\n  steam: /steam/fs\n", fs_folder.display());
    BuildConfig::new(serde_yaml::from_str(&yml).unwrap())
}

#[tokio::test]
async fn test_install_builds_and_copies() {
    let root = tempfile::tempdir().unwrap();
    let game = tempfile::tempdir().unwrap();
    let project = create_project(root.path());
    let config = config_for(game.path());

    let installed = install_command(&project, &config, BuildOptions::default()).await.unwrap();

    assert_eq!(installed, game.path().join("mods/Example.zip"));
    assert!(installed.is_file());
    assert!(root.path().join("Example.zip").is_file());

    let removed = uninstall_command(&project, &config).await.unwrap();
    assert_eq!(removed, vec![installed.clone()]);
    assert!(!installed.exists());
}

#[tokio::test]
async fn test_uninstall_removes_every_archive_variant() {
    let root = tempfile::tempdir().unwrap();
    let game = tempfile::tempdir().unwrap();
    let project = create_project(root.path());
    let mods = game.path().join("mods");
    for name in ["Example.zip", "Example_console_update.zip", "Example_beta2.zip", "Other.zip", "Example.txt"] {
        write(&mods, name, "zip");
    }

    let removed = uninstall_command(&project, &config_for(game.path())).await.unwrap();

    assert_eq!(
        removed,
        vec![mods.join("Example.zip"), mods.join("Example_beta2.zip"), mods.join("Example_console_update.zip")]
    );
    assert!(mods.join("Other.zip").exists());
    assert!(mods.join("Example.txt").exists());
}

#[test]
fn test_archive_matcher_escapes_base_name() {
    let root = tempfile::tempdir().unwrap();
    create_project(root.path());
    write(root.path(), "farmsim.yml", "name: Example\nzip_name: 'FS25_[Mod]'\n");
    let project = fsbuild::project::Project::load_file(&root.path().join("farmsim.yml")).unwrap();

    let matcher = archive_matcher(&project).unwrap();

    assert!(matcher.is_match("FS25_[Mod]_update.zip"));
    assert!(!matcher.is_match("FS25_M_update.zip"));
}

#[tokio::test]
async fn test_install_requires_fs_folder() {
    let root = tempfile::tempdir().unwrap();
    let project = create_project(root.path());

    let result = install_command(&project, &BuildConfig::default(), BuildOptions::default()).await;

    assert!(matches!(result, Err(Error::ConfigError(_))));
    assert!(!root.path().join("Example.zip").exists());
}

#[test]
fn test_info_report() {
    let root = tempfile::tempdir().unwrap();
    let project = create_project(root.path());

    let report = info_report(&project, &config_for(root.path()));

    assert!(report.contains("name:         Example"));
    assert!(report.contains("type:         gameplay"));
    assert!(report.contains("installation: steam = /steam/fs"));
    assert!(report.contains("debug = true"));
    assert!(report.contains("title = Example Mod"));
}

#[test]
fn test_verify_accepts_valid_project() {
    let root = tempfile::tempdir().unwrap();
    let project = create_project(root.path());

    let targets = verify_targets(&project).unwrap();
    assert_eq!(verify_command(&project).unwrap(), targets.len());
    // modDesc, data/vehicle.xml, store.xml and two translations
    assert_eq!(targets.len(), 5);
}

#[test_log::test]
fn test_verify_reports_broken_xml() {
    let root = tempfile::tempdir().unwrap();
    let project = create_project(root.path());
    write(root.path(), "data/broken.i3d", "<i3D><Scene></i3D>");

    assert!(matches!(verify_command(&project), Err(Error::ValidationError(_))));
}
