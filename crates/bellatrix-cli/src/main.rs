mod auth;
mod cli;
mod commands;
mod config;
mod observability;
mod output;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands, ConfigCommands};
use config::Overrides;
use output::print_error;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        // A missing .env file is fine
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    let (file_settings, source) = config::load_settings(cli.config.as_deref())?;
    let state_file = match &cli.command {
        Commands::Sync(args) => args.state_file.clone(),
        _ => None,
    };
    let settings = config::resolve(
        Overrides {
            debug: cli.debug_enabled(),
            dry_run: cli.dry_run_enabled(),
            instance_prefix: cli.instance_prefix.clone(),
            state_file,
        },
        file_settings,
        source,
    );

    observability::init_tracing(settings.debug);
    tracing::debug!(?settings, "Resolved settings");

    match &cli.command {
        Commands::Sync(_) => {
            let Some(state_file) = settings.state_file.as_deref() else {
                anyhow::bail!(
                    "No state file given. Pass it as an argument, set STATE_FILE, or add state_file to the settings file"
                );
            };
            commands::sync::sync(state_file, &settings, format).await?;
        }
        Commands::Token(args) => {
            commands::token::token(args).await?;
        }
        Commands::Version => {
            commands::version::version();
        }
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => {
                if matches!(format, cli::OutputFormat::Json) {
                    println!("{}", serde_json::to_string_pretty(&settings)?);
                    return Ok(());
                }
                let source = settings
                    .source
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(none)".to_string());
                let state_file = settings
                    .state_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string());
                println!("{}: {}", "Settings file".cyan(), source);
                println!("{}: {:?}", "Instance prefix".cyan(), settings.instance_prefix);
                println!("{}: {}", "State file".cyan(), state_file);
                println!("{}: {}", "Dry run".cyan(), settings.dry_run);
                println!("{}: {}", "Debug".cyan(), settings.debug);
                println!("{}: {}s", "Timeout".cyan(), settings.timeout_secs);
                println!("{}: {}", "Page size".cyan(), settings.page_size);
            }
        },
    }

    Ok(())
}
