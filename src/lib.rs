//! fsbuild builds Farming Simulator mods.
//! It stages a mod project into a scratch directory, patches its `modDesc.xml`, applies
//! template values to its scripts, and packs the result into the archive the game loads.

/// Packing a staged build into the mod archive
pub mod archive;

/// Build orchestration and the scratch directory lifecycle
pub mod build;

/// Command-line interface module for the fsbuild application
pub mod cli;

/// Subcommand handlers
pub mod commands;

/// Layered `.fsbuild.yml` configuration
pub mod config;

pub mod constants;

/// Error types and handling for the fsbuild application
pub mod error;

/// Console build exclusions
pub mod filter;

pub mod logger;

/// `modDesc.xml` editing
pub mod manifest;

/// The `farmsim.yml` project descriptor
pub mod project;

/// Copying and templating project files into the scratch directory
pub mod stage;

/// Template values and `{{name}}` substitution
pub mod templates;

/// Translation coverage checks
pub mod translations;

/// Asynchronous directory walking
pub mod walk;
