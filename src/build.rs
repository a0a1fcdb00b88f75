//! Build orchestration.
//!
//! A build moves through `Init -> Staging -> Manifest -> Templating -> Resources ->
//! ConsoleFilter -> Packaging -> Done`, or ends in `Failed` from any stage. The scratch
//! directory is created in `Init` and removed exactly once when the build ends, whatever
//! the outcome.

use crate::archive::{pack, PackSummary};
use crate::config::BuildConfig;
use crate::constants::{SCRATCH_PREFIX, TRANSLATIONS_DIR};
use crate::error::{Error, Result};
use crate::filter::ConsoleFilter;
use crate::manifest::{mutate_manifest, staged_manifest_path};
use crate::project::Project;
use crate::stage;
use crate::templates::resolve;
use crate::translations::check_translations;
use log::{debug, error, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Variant switches of a build. All combinations are valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Use release template values and check translations
    pub release: bool,
    /// Only changes the archive name
    pub update: bool,
    /// Strip console-excluded files and manifest nodes
    pub console: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Init,
    Staging,
    Manifest,
    Templating,
    Resources,
    ConsoleFilter,
    Packaging,
    Done,
    Failed,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::Init => "init",
            BuildStage::Staging => "staging",
            BuildStage::Manifest => "manifest",
            BuildStage::Templating => "templating",
            BuildStage::Resources => "resources",
            BuildStage::ConsoleFilter => "console filter",
            BuildStage::Packaging => "packaging",
            BuildStage::Done => "done",
            BuildStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State of one build. Owns the scratch directory.
pub struct BuildContext<'a> {
    project: &'a Project,
    config: &'a BuildConfig,
    options: BuildOptions,
    scratch: TempDir,
    stage: BuildStage,
}

impl<'a> BuildContext<'a> {
    /// Creates a uniquely named scratch directory inside the project directory.
    pub fn create(project: &'a Project, config: &'a BuildConfig, options: BuildOptions) -> Result<Self> {
        let scratch = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir_in(project.folder())?;
        debug!("Created scratch directory {}", scratch.path().display());

        Ok(Self { project, config, options, scratch, stage: BuildStage::Init })
    }

    pub fn scratch(&self) -> &Path {
        self.scratch.path()
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    /// Path of the archive this build produces.
    pub fn output_path(&self) -> PathBuf {
        self.project.file_path(self.project.zip_name(self.options.update, self.options.console))
    }

    fn enter(&mut self, stage: BuildStage) {
        debug!("Build stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    /// Runs every stage in order, stopping at the first failure.
    pub async fn run(&mut self) -> Result<PackSummary> {
        let project = self.project;
        let options = self.options;
        let scratch = self.scratch.path().to_path_buf();

        self.enter(BuildStage::Staging);
        stage::stage_icon(project, &scratch).await?;

        self.enter(BuildStage::Manifest);
        let manifest = project.mod_desc_path();
        if !manifest.is_file() {
            return Err(Error::MissingRequiredResourceError { path: manifest });
        }
        mutate_manifest(&manifest, &staged_manifest_path(&scratch), project, options.console)?;

        if project.code_dir().is_some() {
            self.enter(BuildStage::Templating);
            let templates = resolve(project, self.config, options.release);
            stage::stage_code(project, &scratch, &templates).await?;
        }

        self.enter(BuildStage::Resources);
        tokio::try_join!(
            stage::stage_translations(project, &scratch),
            stage::stage_resources(project, &scratch),
        )?;

        if options.release && project.has_translations() {
            let gaps = check_translations(&scratch.join(TRANSLATIONS_DIR)).await?;
            if gaps > 0 {
                warn!("Release build of '{}' has {} missing translations", project.name(), gaps);
            }
        }

        if options.console {
            self.enter(BuildStage::ConsoleFilter);
            let removed = ConsoleFilter::from_project(project).apply(&scratch).await?;
            debug!("Removed {} console-excluded entries", removed);
        }

        self.enter(BuildStage::Packaging);
        pack(&scratch, &self.output_path()).await
    }

    /// Removes the scratch directory. Failures are logged and never replace a build error.
    pub fn cleanup(self) {
        let path = self.scratch.path().to_path_buf();
        if let Err(e) = self.scratch.close() {
            let e = Error::CleanupError { path, e: e.to_string() };
            error!("{}", e);
        } else {
            debug!("Removed scratch directory {}", path.display());
        }
    }
}

/// Builds `project` into its archive and returns what was packed.
///
/// # Arguments
/// * `project` - Project to build
/// * `config` - Resolved configuration, only consulted for non-release template values
/// * `options` - Release, update and console switches
///
/// # Returns
/// * `Result<PackSummary>` - The archive path and entry counts, or the first stage error
pub async fn build(project: &Project, config: &BuildConfig, options: BuildOptions) -> Result<PackSummary> {
    info!("Building '{}' ({:?})", project.name(), options);
    let mut context = BuildContext::create(project, config, options)?;

    let result = context.run().await;
    match &result {
        Ok(_) => context.enter(BuildStage::Done),
        Err(e) => {
            debug!("Build failed during {}: {}", context.stage(), e);
            context.enter(BuildStage::Failed);
        }
    }

    context.cleanup();
    result
}
