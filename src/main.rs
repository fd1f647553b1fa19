use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod commands;
mod config;

use commands::{
    ConfigCommand, DeleteCommand, LoadCommand, MediaCommand, MigrateCommand, SaveCommand,
    StatusCommand, UpdateCommand, WatchCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "educonnect")]
#[command(version)]
#[command(about = "School network data sync with a local fallback", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Use an in-process remote store instead of the hosted project
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load all collections from the remote store
    Load(LoadCommand),

    /// Save a new document
    Save(SaveCommand),

    /// Merge fields into a document by its id
    Update(UpdateCommand),

    /// Delete a document by its id
    Delete(DeleteCommand),

    /// Copy local data into an empty remote store
    Migrate(MigrateCommand),

    /// Print a line whenever a collection changes
    Watch(WatchCommand),

    /// Show remote connection and local mirror status
    Status(StatusCommand),

    /// Upload or delete post attachments
    Media(MediaCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "educonnect=info,educonnect_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Save config path for init command
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;

    let offline = cli.offline;
    let coordinator = || app::start(&config, offline);

    match &cli.command {
        Some(Commands::Load(cmd)) => cmd.run(&coordinator()).await?,
        Some(Commands::Save(cmd)) => cmd.run(&coordinator()).await?,
        Some(Commands::Update(cmd)) => cmd.run(&coordinator()).await?,
        Some(Commands::Delete(cmd)) => cmd.run(&coordinator()).await?,
        Some(Commands::Migrate(cmd)) => cmd.run(&coordinator()).await?,
        Some(Commands::Watch(cmd)) => cmd.run(&coordinator()).await?,
        Some(Commands::Status(cmd)) => cmd.run(&coordinator(), &config).await?,
        Some(Commands::Media(cmd)) => {
            let store = app::object_store(&config, offline)?;
            cmd.run(store).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config, cli_config_path)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
