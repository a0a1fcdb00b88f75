#![allow(dead_code)]

use fsbuild::project::Project;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const PROJECT_YML: &str = r#"
name: Example
version: 1.0.0.0
author: Jane
contributors: [Alex, Sam]
type: gameplay
code: src
resources:
  - data
  - store.xml
translations: true
templates:
  debug: true
  title: Example Mod
release:
  templates:
    debug: false
console:
  skip_files:
    - src/debug
  del_moddesc:
    - "extraSourceFiles.sourceFile[@filename=src/debug/tools.lua]"
"#;

pub const MOD_DESC: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="no"?>
<modDesc descVersion="38">
    <author>Original Author</author>
    <version>0.1.0.0</version>
    <extraSourceFiles>
        <sourceFile filename="src/main.lua"/>
        <sourceFile filename="src/debug/tools.lua"/>
    </extraSourceFiles>
</modDesc>
"#;

pub fn write<P: AsRef<Path>>(root: &Path, relative: P, content: impl AsRef<[u8]>) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// A complete mod project below `root`.
pub fn create_project(root: &Path) -> Project {
    write(root, "farmsim.yml", PROJECT_YML);
    write(root, "modDesc.xml", MOD_DESC);
    write(root, "icon.dds", [0u8, 1, 2, 3]);
    write(root, "src/main.lua", "DEBUG = {{debug}}\nTITLE = \"{{ title }}\"\nEXTRA = {{extra}}\n");
    write(root, "src/debug/tools.lua", "-- debug helpers\n");
    write(root, "data/vehicle.xml", "<vehicle/>\n");
    write(root, "data/textures/diffuse.dds", [9u8; 16]);
    fs::create_dir_all(root.join("data/empty")).unwrap();
    write(root, "store.xml", "<store/>\n");
    write(
        root,
        "translations/translation_en.xml",
        r#"<l10n><texts><text name="title" text="Example"/></texts></l10n>"#,
    );
    write(
        root,
        "translations/translation_de.xml",
        r#"<l10n><texts><text name="title" text="Beispiel"/></texts></l10n>"#,
    );

    Project::load_file(&root.join("farmsim.yml")).unwrap()
}

/// Names of leftover scratch directories below `root`.
pub fn scratch_dirs(root: &Path) -> Vec<String> {
    fs::read_dir(root)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".fsbuild-"))
        .collect()
}

pub fn archive_names(path: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect()
}

pub fn archive_text(path: &Path, name: &str) -> String {
    let mut archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut content = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut content).unwrap();
    content
}
