mod common;

use common::{create_project, write};
use fsbuild::error::Error;
use fsbuild::project::Project;
use fsbuild::stage::{copy_file, mirror_tree, stage_code, stage_icon, stage_resources, stage_translations};
use fsbuild::templates::TemplateSet;
use serde_yaml::Value;

#[tokio::test]
async fn test_resources_are_copied_verbatim() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let project = create_project(root.path());

    stage_resources(&project, scratch.path()).await.unwrap();

    assert!(!dir_diff::is_different(root.path().join("data"), scratch.path().join("data")).unwrap());
    assert!(scratch.path().join("data/empty").is_dir());
    assert_eq!(std::fs::read_to_string(scratch.path().join("store.xml")).unwrap(), "<store/>\n");
}

#[tokio::test]
async fn test_translations_are_copied_when_declared() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let project = create_project(root.path());

    stage_translations(&project, scratch.path()).await.unwrap();

    assert!(!dir_diff::is_different(
        root.path().join("translations"),
        scratch.path().join("translations")
    )
    .unwrap());
}

#[tokio::test]
async fn test_code_is_templated() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let expected = tempfile::tempdir().unwrap();
    let project = create_project(root.path());

    let mut templates = TemplateSet::default();
    templates.insert("debug", Value::Bool(false));
    templates.insert("title", Value::from("Test"));
    templates.insert("extra", Value::from(7));

    stage_code(&project, scratch.path(), &templates).await.unwrap();

    write(expected.path(), "src/main.lua", "DEBUG = false\nTITLE = \"Test\"\nEXTRA = 7\n");
    write(expected.path(), "src/debug/tools.lua", "-- debug helpers\n");
    assert!(!dir_diff::is_different(expected.path().join("src"), scratch.path().join("src")).unwrap());
}

#[tokio::test]
async fn test_missing_icon() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    write(root.path(), "farmsim.yml", "name: Example\nicon: store_icon.dds\n");
    let project = Project::load_file(&root.path().join("farmsim.yml")).unwrap();

    let result = stage_icon(&project, scratch.path()).await;

    assert!(matches!(result, Err(Error::MissingRequiredResourceError { path }) if path.ends_with("store_icon.dds")));
}

#[tokio::test]
async fn test_resource_outside_project_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    write(root.path(), "farmsim.yml", "name: Example\nresources: [../secret]\n");
    let project = Project::load_file(&root.path().join("farmsim.yml")).unwrap();

    let result = stage_resources(&project, scratch.path()).await;

    assert!(matches!(result, Err(Error::ValidationError(_))));
}

#[tokio::test]
async fn test_mirror_tree_creates_directories_before_files() {
    let source = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    for i in 0..20 {
        write(source.path(), format!("a/b{}/c/file{}.txt", i % 4, i), i.to_string());
    }

    mirror_tree(source.path(), &dest.path().join("out"), copy_file).await.unwrap();

    assert!(!dir_diff::is_different(source.path(), dest.path().join("out")).unwrap());
}
