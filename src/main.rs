use anyhow::Result;
use clap::Parser;

use rootsweep::cli::{Cli, Command};
use rootsweep::commands;
use rootsweep::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        commands::completions::run(args.shell);
        return Ok(());
    }

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(root) = &cli.root {
        config.paths.boundary_root = root.clone();
    }

    tracing::debug!(?config, "Loaded configuration");

    // Dispatch to subcommand
    match cli.command {
        Command::Scan(args) => {
            tracing::info!(?args, "Starting scan");
            commands::scan::run(config, args, cli.quiet)?;
        }
        Command::Clean(args) => {
            tracing::info!(?args, "Starting clean");
            commands::clean::run(config, args, cli.quiet)?;
        }
        Command::Backups(action) => {
            tracing::info!(?action, "Managing backups");
            commands::backups::run(config, action)?;
        }
        Command::Completions(_) => {}
    }

    Ok(())
}

fn init_logging(verbosity: u8, quiet: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if quiet {
        "warn"
    } else {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rootsweep={}", level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
