//! Removal of console-excluded paths from a staged build.

use crate::error::Result;
use crate::project::Project;
use crate::walk::{Walk, WalkEntry};
use log::{debug, warn};
use std::path::Path;
use tokio::fs;

/// Path prefixes, relative to the staging root, that are removed before packaging.
#[derive(Debug, Clone, Default)]
pub struct ConsoleFilter {
    prefixes: Vec<String>,
}

impl ConsoleFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefixes = prefixes
            .into_iter()
            .filter_map(|prefix| {
                let prefix = prefix.as_ref().trim().trim_start_matches("./");
                if prefix.is_empty() {
                    warn!("Ignoring empty console skip prefix");
                    None
                } else {
                    Some(prefix.to_string())
                }
            })
            .collect();
        Self { prefixes }
    }

    pub fn from_project(project: &Project) -> Self {
        Self::new(project.console_skip_files())
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether the `/`-separated relative name is excluded.
    pub fn is_excluded(&self, relative_name: &str) -> bool {
        self.prefixes.iter().any(|prefix| relative_name.starts_with(prefix.as_str()))
    }

    /// Whether a walked entry is excluded. Directories are also checked under the
    /// `name/` form the archive stores them with.
    pub fn excludes(&self, entry: &WalkEntry) -> bool {
        let name = entry.relative_name();
        self.is_excluded(&name) || (entry.is_dir() && self.is_excluded(&format!("{}/", name)))
    }

    /// Deletes every excluded entry under `scratch` and returns how many were removed.
    ///
    /// Entries are removed in reverse walk order, so the contents of a directory are
    /// gone before the directory itself.
    pub async fn apply(&self, scratch: &Path) -> Result<usize> {
        if self.prefixes.is_empty() {
            return Ok(0);
        }

        let matched: Vec<WalkEntry> = Walk::new(scratch)
            .collect()
            .await?
            .into_iter()
            .filter(|entry| self.excludes(entry))
            .collect();

        for entry in matched.iter().rev() {
            debug!("Excluding {} from console build", entry.relative_name());
            if entry.is_dir() {
                fs::remove_dir(&entry.path).await?;
            } else {
                fs::remove_file(&entry.path).await?;
            }
        }

        Ok(matched.len())
    }
}
