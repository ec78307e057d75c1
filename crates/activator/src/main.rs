mod activate;
mod api;
mod cmd;
mod config;
mod error;
mod netconf;
mod records;
mod username;
mod validation;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "activator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the activation API (checks host prerequisites first)
    Serve(cmd::ConfigArgs),
    /// Report prerequisite and network configuration problems
    Check(cmd::ConfigArgs),
    /// Create missing VLAN sub-interfaces from the network configuration
    SetupVlans(cmd::ConfigArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Serve(args) => cmd::run_serve(args).await.map(|()| ExitCode::SUCCESS),
        Command::Check(args) => cmd::run_check(args).await,
        Command::SetupVlans(args) => cmd::run_setup_vlans(args).await.map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
