//! Project descriptor handling.
//! A mod project is described by a `farmsim.yml` next to its sources. All paths inside the
//! descriptor are relative to the descriptor's own directory.

use crate::constants::{DEFAULT_ICON, MOD_DESC_FILE, PROJECT_FILE, TRANSLATIONS_DIR};
use crate::error::{Error, Result};
use crate::templates::TemplateSet;
use log::{debug, warn};
use serde::Deserialize;
use serde_yaml::Mapping;
use std::path::{Path, PathBuf};

/// Raw contents of a project descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectData {
    pub name: String,
    pub version: Option<String>,
    pub author: Option<String>,
    pub contributors: Vec<String>,
    pub zip_name: Option<String>,
    #[serde(rename = "type")]
    pub mod_type: Option<String>,
    pub icon: Option<String>,
    pub code: Option<String>,
    pub scripts: Option<String>,
    pub resources: Vec<String>,
    pub translations: bool,
    pub templates: Mapping,
    pub release: ReleaseData,
    pub console: ConsoleData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReleaseData {
    pub templates: Mapping,
}

/// Rules for console builds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConsoleData {
    /// Path prefixes, relative to the archive root, left out of console builds
    pub skip_files: Vec<String>,
    /// Manifest node paths removed from console builds
    pub del_moddesc: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Project {
    path: PathBuf,
    folder: PathBuf,
    data: ProjectData,
}

impl Project {
    pub fn new<P: Into<PathBuf>>(path: P, data: ProjectData) -> Self {
        let path = path.into();
        let folder = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self { path, folder, data }
    }

    /// Loads the project from `explicit`, or from the nearest `farmsim.yml` above the
    /// working directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let cwd = std::env::current_dir()?;
                find_project_file(&cwd).ok_or_else(|| Error::ProjectNotFoundError {
                    search_root: cwd,
                    file_name: PROJECT_FILE.to_string(),
                })?
            }
        };

        Self::load_file(&path)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ProjectNotFoundError {
                search_root: path.to_path_buf(),
                file_name: PROJECT_FILE.to_string(),
            });
        }

        debug!("Loading project from {}", path.display());
        let load_error = |e: String| Error::ProjectLoadError { path: path.to_path_buf(), e };

        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let data: ProjectData =
            serde_yaml::from_str(&content).map_err(|e| load_error(e.to_string()))?;

        if data.name.trim().is_empty() {
            return Err(load_error("missing field `name`".to_string()));
        }
        if let Some(version) = &data.version {
            if !is_valid_mod_version(version) {
                warn!(
                    "Version '{}' of '{}' is not made of four numbers (e.g. 1.0.0.0)",
                    version, data.name
                );
            }
        }

        Ok(Self::new(path, data))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory containing the project descriptor.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn data(&self) -> &ProjectData {
        &self.data
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn version(&self) -> Option<&str> {
        self.data.version.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.data.author.as_deref()
    }

    pub fn contributors(&self) -> &[String] {
        &self.data.contributors
    }

    pub fn mod_type(&self) -> Option<&str> {
        self.data.mod_type.as_deref()
    }

    /// Resolves `relative` against the project directory, never the working directory.
    pub fn file_path<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        self.folder.join(relative)
    }

    pub fn mod_desc_path(&self) -> PathBuf {
        self.file_path(MOD_DESC_FILE)
    }

    /// Relative path of the mod icon.
    pub fn icon(&self) -> &str {
        self.data.icon.as_deref().unwrap_or(DEFAULT_ICON)
    }

    /// Relative path of the source tree that receives template substitution.
    pub fn code_dir(&self) -> Option<&str> {
        self.data.code.as_deref().or(self.data.scripts.as_deref())
    }

    pub fn resources(&self) -> &[String] {
        &self.data.resources
    }

    pub fn has_translations(&self) -> bool {
        self.data.translations
    }

    pub fn translations_dir(&self) -> PathBuf {
        self.file_path(TRANSLATIONS_DIR)
    }

    pub fn templates(&self) -> TemplateSet {
        TemplateSet::from_mapping(&self.data.templates)
    }

    pub fn release_templates(&self) -> TemplateSet {
        TemplateSet::from_mapping(&self.data.release.templates)
    }

    pub fn console_skip_files(&self) -> &[String] {
        &self.data.console.skip_files
    }

    pub fn console_del_moddesc(&self) -> &[String] {
        &self.data.console.del_moddesc
    }

    /// Base name of the archive, without suffixes or extension.
    pub fn zip_base_name(&self) -> &str {
        self.data.zip_name.as_deref().unwrap_or(&self.data.name)
    }

    /// File name of the archive: `<base>[_console][_update].zip`.
    pub fn zip_name(&self, update: bool, console: bool) -> String {
        let mut name = self.zip_base_name().to_string();
        if console {
            name.push_str("_console");
        }
        if update {
            name.push_str("_update");
        }
        name.push_str(".zip");
        name
    }
}

/// Searches `start` and each of its ancestors for a project descriptor.
pub fn find_project_file(start: &Path) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join(PROJECT_FILE)).find(|candidate| candidate.is_file())
}

/// Whether `version` has the four numeric components the game expects.
pub fn is_valid_mod_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 4 && parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_mod_version() {
        assert!(is_valid_mod_version("1.0.0.0"));
        assert!(is_valid_mod_version("12.3.45.6"));
        assert!(!is_valid_mod_version("1.0.0"));
        assert!(!is_valid_mod_version("1.0.0.a"));
        assert!(!is_valid_mod_version("1..0.0"));
    }

    #[test]
    fn test_folder_of_bare_file_name() {
        let project = Project::new("farmsim.yml", ProjectData::default());
        assert_eq!(project.folder(), Path::new("."));
    }
}
