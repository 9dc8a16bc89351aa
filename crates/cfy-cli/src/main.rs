//! cfy binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cfy_cli::cli::{Cli, Commands};
use cfy_cli::commands::{EventsCommand, ExecutionsCommand, ResolveCommand};
use cfy_cli::{CliError, Config, OutputFormat};
use cfy_rest::RestClient;

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose))
        .with_writer(io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_suppressed() => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins over `-v`.
fn env_filter(verbose: u8) -> EnvFilter {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?.with_cli(cli);
    let verbose = cli.verbose > 0;
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Commands::Executions { command } => {
            let client = RestClient::new(config.rest_client_config())?;
            let cmd = ExecutionsCommand::new(&client, &config).verbose(verbose);
            cmd.execute(&mut stdout, command)?;
        }
        Commands::Events { command } => {
            let client = RestClient::new(config.rest_client_config())?;
            let cmd = EventsCommand::new(&client, &config).verbose(verbose);
            cmd.execute(&mut stdout, command)?;
        }
        Commands::ResolveImport(args) => {
            let cmd = ResolveCommand::new(&config);
            cmd.execute(&mut stdout, &OutputFormat::default(), args)?;
        }
    }

    Ok(())
}
