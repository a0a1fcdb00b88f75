//! fsbuild's main application entry point.
//! Parses the command line, loads configuration and project, and dispatches to the
//! subcommand handlers.

use fsbuild::{
    cli::{get_args, Args, Command, ConfigCommand},
    commands,
    config::BuildConfig,
    error::{default_error_handler, Result},
    logger::init_logger,
    project::Project,
};

/// Main application entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = get_args();
    init_logger(args.verbose, args.quiet);

    if let Err(err) = run(args).await {
        default_error_handler(err);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = BuildConfig::load()?;

    if let Command::Config(command) = &args.command {
        let cwd = std::env::current_dir()?;
        match command {
            ConfigCommand::Get { name } => println!("{}", commands::config_get(&config, name)?),
            ConfigCommand::Set { assignment } => commands::config_set(&cwd, assignment)?,
            ConfigCommand::Unset { name } => {
                if !commands::config_unset(&cwd, name)? {
                    log::warn!("Template '{}' was not set in {}", name, cwd.display());
                }
            }
        }
        return Ok(());
    }

    let project = Project::load(args.file.as_deref())?;

    match args.command {
        Command::Build(build) => {
            commands::build_command(&project, &config, build.into()).await?;
        }
        Command::Install(build) => {
            commands::install_command(&project, &config, build.into()).await?;
        }
        Command::Uninstall => {
            commands::uninstall_command(&project, &config).await?;
        }
        Command::Info => print!("{}", commands::info_report(&project, &config)),
        Command::Verify => {
            commands::verify_command(&project)?;
        }
        Command::Config(_) => {}
    }

    Ok(())
}
