use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# educonnect configuration

# Directory for the local mirror (default: platform data dir + educonnect)
# data_dir: ~/.local/share/educonnect

# Hosted project settings
remote:
  # api_key: your-web-api-key
  # auth_domain: your-project.firebaseapp.com
  # project_id: your-project
  # storage_bucket: your-project.appspot.com
  # messaging_sender_id: "000000000000"
  # app_id: 1:000000000000:web:0000000000000000

sync:
  # How long an operation waits for the remote store
  ready_timeout_ms: 10000
  # How often `educonnect watch` re-reads a collection
  snapshot_interval_ms: 2000
"#;

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        println!(
                            "remote.project_id: {}",
                            config.remote.project_id.as_deref().unwrap_or("(not set)")
                        );
                        println!(
                            "remote.storage_bucket: {}",
                            config
                                .remote
                                .storage_bucket
                                .as_deref()
                                .unwrap_or("(not set)")
                        );
                        println!(
                            "remote.api_key: {}",
                            if config.remote.api_key.is_some() {
                                "(set)"
                            } else {
                                "(not set)"
                            }
                        );
                        println!();

                        println!("sync.ready_timeout_ms: {}", config.sync.ready_timeout_ms.value);
                        println!("  source: {}", config.sync.ready_timeout_ms.source);
                        println!(
                            "sync.snapshot_interval_ms: {}",
                            config.sync.snapshot_interval_ms.value
                        );
                        println!("  source: {}", config.sync.snapshot_interval_ms.source);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = cli_config_path.unwrap_or_else(Config::default_config_path);

                // Check if config already exists
                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'educonnect config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nFill in the remote settings to connect.");
                Ok(())
            }
        }
    }
}
