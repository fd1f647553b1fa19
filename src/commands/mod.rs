mod config_cmd;
mod data;
mod media;
mod migrate;
mod status;
mod watch;

use clap::ValueEnum;
use educonnect_core::Document;
use serde_json::Value;
use std::path::PathBuf;

pub use config_cmd::ConfigCommand;
pub use data::{DeleteCommand, LoadCommand, SaveCommand, UpdateCommand};
pub use media::MediaCommand;
pub use migrate::MigrateCommand;
pub use status::StatusCommand;
pub use watch::WatchCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parses a logical id: JSON literals (`42`, `"abc"`) as-is, anything else
/// as a string.
pub fn parse_logical_id(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Reads a JSON object from `--data` or from `--file`.
pub fn read_document(
    data: Option<&str>,
    file: Option<&PathBuf>,
) -> Result<Document, Box<dyn std::error::Error>> {
    let raw = match (data, file) {
        (Some(data), _) => data.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => return Err("either --data or --file is required".into()),
    };
    let value: Value = serde_json::from_str(&raw)?;
    Document::from_value(value).ok_or_else(|| "document must be a JSON object".into())
}
