//! Error handling for fsbuild.
//! Defines the error taxonomy of the build pipeline and the result type used throughout.

use std::path::PathBuf;
use thiserror::Error;

/// Error types for fsbuild operations.
///
/// Every fatal variant aborts the remaining build stages; the scratch directory is still
/// removed before the error reaches the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] std::io::Error),

    /// A single configuration layer could not be read. Never fatal: the layer is skipped.
    #[error("Failed to load config file '{}': {message}.", path.display())]
    ConfigLoadError { path: PathBuf, message: String },

    /// No project descriptor was given and none was found in any ancestor directory
    #[error("Could not find project file '{file_name}' in '{}' or any parent directory.", search_root.display())]
    ProjectNotFoundError { search_root: PathBuf, file_name: String },

    /// The project descriptor could not be read or parsed
    #[error("Failed to load project file '{}'. Original error: {e}", path.display())]
    ProjectLoadError { path: PathBuf, e: String },

    /// A required file (icon, manifest or declared resource) is absent; no archive is produced.
    #[error("Missing required resource '{}'.", path.display())]
    MissingRequiredResourceError { path: PathBuf },

    /// A code file could not be templated; partial output is never packaged
    #[error("Failed to substitute templates in '{}'. Original error: {e}", path.display())]
    TemplateSubstitutionError { path: PathBuf, e: String },

    /// The manifest could not be parsed or written
    #[error("Failed to process manifest '{}'. Original error: {e}", path.display())]
    ManifestError { path: PathBuf, e: String },

    /// Writing the archive failed; no partial archive is left behind
    #[error("Failed to write archive '{}'. Original error: {e}", output.display())]
    ArchivePackagingError { output: PathBuf, e: String },

    /// Removing the scratch directory failed. Logged, never returned in place of a build error.
    #[error("Failed to remove scratch directory '{}'. Original error: {e}", path.display())]
    CleanupError { path: PathBuf, e: String },

    /// Invalid `config` command input or missing configuration values
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// Represents validation failures in project paths or verified files
    #[error("Validation error: {0}.")]
    ValidationError(String),
}

/// Convenience type alias for Results with fsbuild's Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{}", err);
    std::process::exit(1);
}
