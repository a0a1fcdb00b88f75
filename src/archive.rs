//! Packaging of a staged build into the mod archive.

use crate::error::{Error, Result};
use crate::walk::{Walk, WalkEntry};
use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Summary of a written archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSummary {
    pub output: PathBuf,
    pub files: usize,
    pub directories: usize,
}

/// Writes every entry below `scratch` into a zip archive at `output`.
///
/// Directories get their own entries so empty ones survive. The archive is written next
/// to `output` and only renamed into place once it has been finished and synced; on
/// failure `output` is left untouched.
pub async fn pack(scratch: &Path, output: &Path) -> Result<PackSummary> {
    let packaging_error =
        |e: String| Error::ArchivePackagingError { output: output.to_path_buf(), e };

    let entries = Walk::new(scratch)
        .collect()
        .await
        .map_err(|e| packaging_error(e.to_string()))?;

    let target = output.to_path_buf();
    tokio::task::spawn_blocking(move || write_archive(&entries, &target))
        .await
        .map_err(|e| packaging_error(e.to_string()))?
        .map_err(|e| packaging_error(e.to_string()))
}

fn write_archive(entries: &[WalkEntry], output: &Path) -> zip::result::ZipResult<PackSummary> {
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(parent)?;

    let file_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    let dir_options = file_options.unix_permissions(0o755);

    let mut files = 0;
    let mut directories = 0;
    {
        let mut zip = ZipWriter::new(BufWriter::new(staged.as_file_mut()));

        for entry in entries {
            let name = entry.relative_name();
            if entry.is_dir() {
                zip.add_directory(format!("{}/", name), dir_options)?;
                directories += 1;
            } else {
                zip.start_file(name, file_options)?;
                let mut source = File::open(&entry.path)?;
                io::copy(&mut source, &mut zip)?;
                files += 1;
            }
        }

        let mut writer = zip.finish()?;
        writer.flush()?;
    }

    staged.as_file().sync_all()?;
    staged.persist(output).map_err(|e| e.error)?;
    debug!("Packed {} files and {} directories into {}", files, directories, output.display());

    Ok(PackSummary { output: output.to_path_buf(), files, directories })
}
