//! hover - build desktop Flutter applications

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hover_cli::cmd;
use hover_cli::{Cli, Commands, EngineCommands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Commands::Engine { command } => match command {
            EngineCommands::Path => cmd::engine::path(&global),
            EngineCommands::Update => cmd::engine::update(&global).await,
            EngineCommands::Clean => cmd::engine::clean(&global),
        },
        Commands::Aot => cmd::aot::aot(&global).await,
        Commands::Env => cmd::env::env(&global),
        Commands::Build {
            target_os,
            skip_engine_download,
        } => cmd::build::build(&global, target_os, skip_engine_download).await,
    }
}
