//! Tripwire CLI
//!
//! Runs a file-backed rule engine locally: inspect nodes, validate
//! configuration documents and execute rules against JSON inputs.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};
use tripwire_config_file::FileConfigProvider;
use tripwire_engine::Engine;

/// Tripwire CLI: evaluate rule sets from a configuration directory.
#[derive(Parser, Debug)]
#[command(name = "tripwire", version, about)]
struct Cli {
    /// Directory holding `<revision>.json` / `<revision>.yaml` documents.
    #[arg(
        long,
        env = "TRIPWIRE_CONFIG_DIR",
        default_value = "./config",
        global = true
    )]
    config_dir: PathBuf,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Describe the registered nodes.
    Nodes(commands::nodes::NodesArgs),
    /// Check a configuration document without loading it.
    Validate(commands::validate::ValidateArgs),
    /// Inspect and save stored configuration revisions.
    Config(commands::config::ConfigArgs),
    /// Execute a rule set or a single rule.
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let engine = Engine::builder()
        .provider(Arc::new(FileConfigProvider::new(&cli.config_dir)))
        .build()?;

    match cli.command {
        Command::Nodes(args) => commands::nodes::run(&engine, &args, &cli.format),
        Command::Validate(args) => commands::validate::run(&engine, &args, &cli.format),
        Command::Config(args) => commands::config::run(&engine, &args, &cli.format).await,
        Command::Run(args) => commands::run::run(&engine, &args, &cli.format).await,
    }
}
