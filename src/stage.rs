//! Staging of project files into a build's scratch directory.
//! Declared resources and translations are copied as they are; the code tree is copied
//! with template tokens substituted.

use crate::error::{Error, Result};
use crate::project::Project;
use crate::templates::TemplateSet;
use crate::walk::{EntryKind, Walk};
use futures_util::future::try_join_all;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use log::debug;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::pin;
use tokio::fs;

/// Upper bound on file writes in flight within one tree.
const MAX_CONCURRENT_WRITES: usize = 32;

/// Copies the project icon into the scratch directory.
///
/// The icon is mandatory: without it the build fails before anything else is staged.
pub async fn stage_icon(project: &Project, scratch: &Path) -> Result<()> {
    let relative = checked_relative(project.icon())?;
    let source = project.file_path(relative);
    if !fs::try_exists(&source).await? {
        return Err(Error::MissingRequiredResourceError { path: source });
    }

    copy_file(source, scratch.join(relative)).await
}

/// Copies the translations directory when the project declares translations.
pub async fn stage_translations(project: &Project, scratch: &Path) -> Result<()> {
    if !project.has_translations() {
        return Ok(());
    }

    let source = project.translations_dir();
    if !fs::try_exists(&source).await? {
        return Err(Error::MissingRequiredResourceError { path: source });
    }

    let dest = scratch.join(crate::constants::TRANSLATIONS_DIR);
    mirror_tree(&source, &dest, copy_file).await
}

/// Copies every declared resource, file or directory, to the same relative path.
/// Resources are copied concurrently.
pub async fn stage_resources(project: &Project, scratch: &Path) -> Result<()> {
    let copies = project.resources().iter().map(|resource| async move {
        let relative = checked_relative(resource)?;
        let source = project.file_path(relative);
        let dest = scratch.join(relative);

        let metadata = match fs::metadata(&source).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::MissingRequiredResourceError { path: source });
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Copying resource {}", resource);
        if metadata.is_dir() {
            mirror_tree(&source, &dest, copy_file).await
        } else {
            copy_file(source, dest).await
        }
    });

    try_join_all(copies).await?;
    Ok(())
}

/// Copies the project's code tree with every template token substituted.
/// Does nothing for projects without a code directory.
///
/// # Arguments
/// * `project` - Project whose `code` (or `scripts`) directory is copied
/// * `scratch` - Staging root; the tree lands at the same relative path
/// * `templates` - Values substituted for `{{name}}` placeholders
///
/// # Errors
/// * `Error::TemplateSubstitutionError` if a file is not UTF-8 or cannot be read or written
pub async fn stage_code(project: &Project, scratch: &Path, templates: &TemplateSet) -> Result<()> {
    let Some(code) = project.code_dir() else {
        return Ok(());
    };

    let relative = checked_relative(code)?;
    let source = project.file_path(relative);
    let dest = scratch.join(relative);

    debug!("Templating {} with {} values", source.display(), templates.len());
    mirror_tree(&source, &dest, |from, to| template_file(from, to, templates)).await
}

/// Recreates the tree below `source` at `dest`, passing each file to `write_file`.
///
/// Directories are created as the walk reaches them; file writes only start once every
/// directory exists, then run concurrently.
///
/// # Arguments
/// * `source` - Root of the tree to copy
/// * `dest` - Root of the copy, created if missing
/// * `write_file` - Produces the file at its second path from the one at its first
pub async fn mirror_tree<F, Fut>(source: &Path, dest: &Path, write_file: F) -> Result<()>
where
    F: Fn(PathBuf, PathBuf) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    fs::create_dir_all(dest).await?;

    let mut entries = pin!(Walk::new(source).entries());
    let mut writes = Vec::new();

    while let Some(entry) = entries.try_next().await? {
        let target = dest.join(&entry.relative);
        match entry.kind {
            EntryKind::Dir => fs::create_dir_all(&target).await?,
            EntryKind::File => writes.push(write_file(entry.path, target)),
        }
    }

    stream::iter(writes)
        .buffer_unordered(MAX_CONCURRENT_WRITES)
        .try_collect::<Vec<()>>()
        .await?;
    Ok(())
}

/// Copies a single file, creating its parent directories.
pub async fn copy_file(source: PathBuf, dest: PathBuf) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::copy(&source, &dest).await?;
    Ok(())
}

/// Writes `source` to `dest` with every template token substituted.
pub async fn template_file(source: PathBuf, dest: PathBuf, templates: &TemplateSet) -> Result<()> {
    let substitution_error = |e: String| Error::TemplateSubstitutionError { path: source.clone(), e };

    let bytes = fs::read(&source).await.map_err(|e| substitution_error(e.to_string()))?;
    let content = String::from_utf8(bytes).map_err(|_| substitution_error("not valid UTF-8".to_string()))?;
    let output = templates.substitute(&content);

    fs::write(&dest, output.as_bytes()).await.map_err(|e| substitution_error(e.to_string()))
}

/// Rejects project paths that would leave the project or scratch directory.
///
/// # Returns
/// * `Result<&Path>` - `path` unchanged, or `Error::ValidationError` for `..`, absolute
///   or empty paths
pub fn checked_relative(path: &str) -> Result<&Path> {
    let relative = Path::new(path);
    let escapes = relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));

    if escapes || path.trim().is_empty() {
        return Err(Error::ValidationError(format!(
            "'{}' must be a path inside the project directory",
            path
        )));
    }
    Ok(relative)
}
