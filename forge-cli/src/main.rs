use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod context;

#[derive(Parser)]
#[command(name = "forge", about = "Turn scene notes into video-model prompts")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage provider API keys
    Auth(commands::auth::AuthArgs),
    /// Enhance one scene description into a prompt
    Generate(commands::generate::GenerateArgs),
    /// Enhance a file of scenes into structured JSON
    Batch(commands::batch::BatchArgs),
    /// Show per-provider usage
    Usage(commands::usage::UsageArgs),
    /// Inspect and check target video model profiles
    Profiles(commands::profiles::ProfilesArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Auth(args) => commands::auth::run(args).await,
        Commands::Generate(args) => commands::generate::run(args).await,
        Commands::Batch(args) => commands::batch::run(args).await,
        Commands::Usage(args) => commands::usage::run(args).await,
        Commands::Profiles(args) => commands::profiles::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
