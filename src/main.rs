#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;

use pcc_vm::cli::{Cli, Commands, ConfigCommands, TemplateCommands, VmCommands};
use pcc_vm::config::Config;
use pcc_vm::{commands, logging};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Handle commands that don't need a loaded configuration
    match &cli.command {
        Commands::Version => {
            commands::version::execute()?;
            return Ok(());
        }
        Commands::Config {
            command: ConfigCommands::Validate,
        } => {
            commands::config::validate(cli.config.as_deref())?;
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load(cli.config.as_deref())?.with_cli_overrides(&cli);

    match &cli.command {
        Commands::Template { command } => match command {
            TemplateCommands::List => commands::template::list::execute(&config)?,
        },
        Commands::Vm { command } => match command {
            VmCommands::List { folder } => {
                commands::vm::list::execute(&config, folder.as_deref())?
            }
            VmCommands::Delete { name } => commands::vm::delete::execute(&config, name)?,
            VmCommands::Clone(args) => commands::vm::clone::execute(&config, args)?,
        },
        Commands::Config { .. } => commands::config::show(&config)?,
        Commands::Version => {}
    }

    Ok(())
}
