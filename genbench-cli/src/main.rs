use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use genbench_cli::cli::{Cli, Commands, ConfigCommands};
use genbench_cli::commands::{self, Completion, RunOverrides};
use genbench_logging::{init_logging, LoggingGuard};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(completion) => ExitCode::from(completion.exit_code()),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Completion> {
    let config = commands::load_config(cli.config.as_ref())?;
    let _guard: LoggingGuard = init_logging(&config.logging, cli.log_level.as_deref())?;

    info!("genbench {} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(Commands::Run {
            runs,
            budget,
            output,
            endpoint,
            skip_existing,
            catalog,
        }) => {
            let overrides = RunOverrides {
                runs,
                budget,
                output,
                endpoint,
                skip_existing,
                catalog,
            };
            commands::handle_run(config, &overrides).await
        }
        Some(Commands::RunOne {
            endpoint,
            run,
            budget,
            output,
        }) => {
            let overrides = RunOverrides {
                budget,
                output,
                ..RunOverrides::default()
            };
            commands::handle_run_one(config, endpoint, run, &overrides).await
        }
        Some(Commands::Report {
            results,
            merge_manual,
        }) => commands::handle_report(&config, results, merge_manual).await,
        Some(Commands::Collect { results }) => commands::handle_collect(&config, results).await,
        Some(Commands::Config { config_cmd }) => {
            match config_cmd {
                ConfigCommands::Validate { config_file } => {
                    commands::handle_config_validate(&config_file)?
                }
                ConfigCommands::Generate { output, force } => {
                    commands::handle_config_generate(&output, force)?
                }
                ConfigCommands::Show { format } => commands::handle_config_show(&config, &format)?,
            }
            Ok(Completion::Done)
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(Completion::Done)
        }
    }
}
