//! Handlers behind each subcommand.
//! They resolve paths and options, call into the pipeline, and report results.

use crate::archive::PackSummary;
use crate::build::{build, BuildOptions};
use crate::config::{parse_cli_value, update_local_config, BuildConfig};
use crate::constants::{MODS_DIR, TRANSLATIONS_DIR};
use crate::error::{Error, Result};
use crate::project::Project;
use crate::stage::checked_relative;
use crate::templates::resolve;
use globset::{GlobBuilder, GlobMatcher};
use log::{debug, error, info, warn};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use xmltree::Element;

/// Builds the project and returns the archive path.
///
/// # Returns
/// * `Result<PathBuf>` - The written archive, next to the project descriptor
pub async fn build_command(project: &Project, config: &BuildConfig, options: BuildOptions) -> Result<PathBuf> {
    let PackSummary { output, files, directories } = build(project, config, options).await?;
    info!("Built {} ({} files, {} directories)", output.display(), files, directories);
    Ok(output)
}

fn mods_dir(config: &BuildConfig) -> Result<PathBuf> {
    config.fs_folder().map(|folder| folder.join(MODS_DIR)).ok_or_else(|| {
        Error::ConfigError("'fs_folder' is not set in any .fsbuild.yml".to_string())
    })
}

/// Copies the archive into the game's mods folder, building it first when missing.
///
/// # Arguments
/// * `project` - Project to install
/// * `config` - Resolved configuration; must set `fs_folder`
/// * `options` - Variant to install, which also selects the archive name
///
/// # Returns
/// * `Result<PathBuf>` - Path of the installed archive inside `<fs_folder>/mods`
pub async fn install_command(project: &Project, config: &BuildConfig, options: BuildOptions) -> Result<PathBuf> {
    let mods = mods_dir(config)?;
    let file_name = project.zip_name(options.update, options.console);

    let archive = project.file_path(&file_name);
    let archive = if tokio::fs::try_exists(&archive).await? {
        debug!("Reusing existing archive {}", archive.display());
        archive
    } else {
        build_command(project, config, options).await?
    };

    tokio::fs::create_dir_all(&mods).await?;
    let target = mods.join(&file_name);
    tokio::fs::copy(&archive, &target).await?;
    info!("Installed {}", target.display());
    Ok(target)
}

/// Matcher for every archive of the project: `<zip base>*.zip`.
pub fn archive_matcher(project: &Project) -> Result<GlobMatcher> {
    let pattern = format!("{}*.zip", escape_glob(project.zip_base_name()));
    let glob = GlobBuilder::new(&pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map_err(|e| Error::ConfigError(format!("bad archive name pattern '{}': {}", pattern, e)))?;
    Ok(glob.compile_matcher())
}

fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '{' | '}' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Removes every `<zip base>*.zip` file from the mods folder.
///
/// # Returns
/// * `Result<Vec<PathBuf>>` - The removed paths, sorted
pub async fn uninstall_command(project: &Project, config: &BuildConfig) -> Result<Vec<PathBuf>> {
    let mods = mods_dir(config)?;
    let matcher = archive_matcher(project)?;
    let mut removed = Vec::new();

    if tokio::fs::try_exists(&mods).await? {
        let mut entries = tokio::fs::read_dir(&mods).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() && matcher.is_match(entry.file_name()) {
                removed.push(entry.path());
            }
        }
    }
    removed.sort();

    for target in &removed {
        tokio::fs::remove_file(target).await?;
        info!("Removed {}", target.display());
    }

    if removed.is_empty() {
        warn!("'{}' is not installed in {}", project.name(), mods.display());
    }
    Ok(removed)
}

/// Human-readable overview of the project, its configuration and its template values.
pub fn info_report(project: &Project, config: &BuildConfig) -> String {
    let mut out = String::new();
    let unset = "-";

    let _ = writeln!(out, "Project");
    let _ = writeln!(out, "  name:         {}", project.name());
    let _ = writeln!(out, "  version:      {}", project.version().unwrap_or(unset));
    let _ = writeln!(out, "  author:       {}", project.author().unwrap_or(unset));
    let _ = writeln!(out, "  type:         {}", project.mod_type().unwrap_or(unset));
    let _ = writeln!(out, "  archive:      {}", project.zip_name(false, false));
    let _ = writeln!(out, "  path:         {}", project.path().display());

    let _ = writeln!(out, "Config");
    let fs_folder = config.fs_folder().map(|p| p.display().to_string());
    let _ = writeln!(out, "  fs_folder:    {}", fs_folder.as_deref().unwrap_or(unset));
    for (name, path) in config.installations() {
        let _ = writeln!(out, "  installation: {} = {}", name, path.display());
    }

    let _ = writeln!(out, "Templates");
    let templates = resolve(project, config, false);
    for (name, _) in templates.iter() {
        let value = templates.get_str(name).unwrap_or_default();
        let _ = writeln!(out, "  {} = {}", name, value);
    }

    out
}

/// The resolved value of template `name`.
pub fn config_get(config: &BuildConfig, name: &str) -> Result<String> {
    config
        .templates()
        .get_str(name)
        .ok_or_else(|| Error::ConfigError(format!("template '{}' is not set", name)))
}

/// Writes `NAME=VALUE` into the templates of `dir`'s `.fsbuild.yml`.
pub fn config_set(dir: &Path, assignment: &str) -> Result<()> {
    let (name, value) = assignment
        .split_once('=')
        .filter(|(name, _)| !name.trim().is_empty())
        .ok_or_else(|| Error::ConfigError(format!("expected NAME=VALUE, got '{}'", assignment)))?;

    let path = format!("templates.{}", name.trim());
    let value = parse_cli_value(value);
    update_local_config(dir, |config| config.set(&path, value))
}

/// Removes template `name` from `dir`'s `.fsbuild.yml`. Returns whether it was set.
pub fn config_unset(dir: &Path, name: &str) -> Result<bool> {
    let path = format!("templates.{}", name.trim());
    let mut removed = false;
    update_local_config(dir, |config| removed = config.unset(&path).is_some())?;
    Ok(removed)
}

/// XML files checked by `verify`: the manifest, `.xml`/`.i3d` files among the declared
/// resources, and the translations.
pub fn verify_targets(project: &Project) -> Result<Vec<PathBuf>> {
    let mut targets = vec![project.mod_desc_path()];

    let mut roots = Vec::new();
    for resource in project.resources() {
        roots.push(project.file_path(checked_relative(resource)?));
    }
    if project.has_translations() {
        roots.push(project.file_path(TRANSLATIONS_DIR));
    }

    for root in roots {
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::ValidationError(e.to_string()))?;
            let is_xml = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("xml") || ext.eq_ignore_ascii_case("i3d"));
            if entry.file_type().is_file() && is_xml {
                targets.push(entry.into_path());
            }
        }
    }

    Ok(targets)
}

/// Parses every file from [`verify_targets`] and fails if any is not well-formed XML.
pub fn verify_command(project: &Project) -> Result<usize> {
    let targets = verify_targets(project)?;
    let mut failures = 0;

    for path in &targets {
        let parsed = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|content| Element::parse(content.as_slice()).map_err(|e| e.to_string()));
        match parsed {
            Ok(_) => debug!("{} is valid", path.display()),
            Err(e) => {
                error!("{}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        return Err(Error::ValidationError(format!(
            "{} of {} XML files are invalid",
            failures,
            targets.len()
        )));
    }

    info!("Verified {} XML files", targets.len());
    Ok(targets.len())
}
