//! Command-line interface implementation for fsbuild.
//! Provides argument parsing and help text formatting using clap.

use crate::build::BuildOptions;
use clap::{error::ErrorKind, Args as ClapArgs, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments structure for fsbuild.
#[derive(Parser, Debug)]
#[command(author, version, about = "fsbuild: build and package Farming Simulator mods", long_about = None)]
pub struct Args {
    /// Path to the project file (defaults to the nearest farmsim.yml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the mod archive
    Build(BuildArgs),

    /// Build the mod if needed and copy it into the game's mods folder
    Install(BuildArgs),

    /// Remove the mod's archives from the game's mods folder
    Uninstall,

    /// Show project, configuration and template values
    Info,

    /// Read or edit template values in the local .fsbuild.yml
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Check that the manifest, resources and translations are well-formed XML
    Verify,
}

#[derive(ClapArgs, Debug, Clone, Copy, Default)]
pub struct BuildArgs {
    /// Build a release: use release templates and check translations
    #[arg(short, long)]
    pub release: bool,

    /// Build an update archive (`_update` suffix)
    #[arg(short, long)]
    pub update: bool,

    /// Build for consoles: strip excluded files and manifest nodes
    #[arg(short, long)]
    pub console: bool,
}

impl From<BuildArgs> for BuildOptions {
    fn from(args: BuildArgs) -> Self {
        BuildOptions { release: args.release, update: args.update, console: args.console }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Print the resolved value of a template
    Get {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Set a template value, written as NAME=VALUE
    Set {
        #[arg(value_name = "NAME=VALUE")]
        assignment: String,
    },

    /// Remove a template value
    Unset {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 and the help text if no subcommand is given
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if matches!(
                e.kind(),
                ErrorKind::MissingSubcommand
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
