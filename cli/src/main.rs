use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use forge_console::Console;
use forge_core::StdioClientFactory;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

mod commands;

use commands::SessionArgs;

#[derive(Parser)]
#[command(name = "hve-forge", version)]
#[command(about = "HVE Forge CLI", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Review GitHub statistics for the repository using GitHub Copilot with MCP servers
    #[command(visible_alias = "github-stats")]
    Stats(SessionArgs),

    /// Run a team retrospective using GitHub Copilot with MCP servers
    Retrospective(SessionArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Only log to stderr and filter out less important messages
    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    info!("Starting HVE Forge CLI");

    let factory = Arc::new(StdioClientFactory);
    match cli.command {
        Some(Commands::Stats(args)) => commands::stats::run(args, factory, Arc::new(Console::stdout())).await,
        Some(Commands::Retrospective(args)) => {
            commands::retrospective::run(args, factory, Arc::new(Console::stdout())).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
