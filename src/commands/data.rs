use clap::Args;
use educonnect_core::{ApplicationState, CollectionName, SyncCoordinator};
use std::path::PathBuf;

use super::{parse_logical_id, read_document, OutputFormat};

#[derive(Args)]
pub struct LoadCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl LoadCommand {
    pub async fn run(&self, coordinator: &SyncCoordinator) -> Result<(), Box<dyn std::error::Error>> {
        let state = coordinator.load_all().await;

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&state)?);
            }
            OutputFormat::Text => {
                print_counts(&state);
                println!("\nPhase: {:?}", coordinator.phase());
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct SaveCommand {
    /// Collection to save into
    pub collection: CollectionName,

    /// Document as a JSON object
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,

    /// Read the document from a JSON file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl SaveCommand {
    pub async fn run(&self, coordinator: &SyncCoordinator) -> Result<(), Box<dyn std::error::Error>> {
        let doc = read_document(self.data.as_deref(), self.file.as_ref())?;

        coordinator
            .context()
            .state
            .write()
            .await
            .upsert_local(self.collection, doc.clone());

        match coordinator.save(self.collection, &doc).await? {
            Some(doc_id) => println!("Saved to {}: {}", self.collection, doc_id),
            None => println!(
                "Remote unavailable; saved to {} in the local mirror only",
                self.collection
            ),
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct UpdateCommand {
    /// Collection holding the document
    pub collection: CollectionName,

    /// Value of the document's `id` field
    pub id: String,

    /// Fields to merge, as a JSON object
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,

    /// Read the fields from a JSON file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl UpdateCommand {
    pub async fn run(&self, coordinator: &SyncCoordinator) -> Result<(), Box<dyn std::error::Error>> {
        let patch = read_document(self.data.as_deref(), self.file.as_ref())?;
        let logical_id = parse_logical_id(&self.id);

        {
            let mut state = coordinator.context().state.write().await;
            if let Some(local) = state
                .collection_mut(self.collection)
                .iter_mut()
                .find(|d| d.logical_id() == Some(&logical_id))
            {
                local.merge(&patch);
            }
        }

        if coordinator.update(self.collection, &logical_id, &patch).await {
            println!("Updated {} in {}", logical_id, self.collection);
        } else {
            println!(
                "Remote not updated for {} in {} (see log)",
                logical_id, self.collection
            );
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct DeleteCommand {
    /// Collection holding the document
    pub collection: CollectionName,

    /// Value of the document's `id` field
    pub id: String,
}

impl DeleteCommand {
    pub async fn run(&self, coordinator: &SyncCoordinator) -> Result<(), Box<dyn std::error::Error>> {
        let logical_id = parse_logical_id(&self.id);

        coordinator
            .context()
            .state
            .write()
            .await
            .remove_local(self.collection, &logical_id);

        if coordinator.delete(self.collection, &logical_id).await {
            println!("Deleted {} from {}", logical_id, self.collection);
        } else {
            println!(
                "Remote not updated for {} in {} (see log)",
                logical_id, self.collection
            );
        }
        Ok(())
    }
}

pub fn print_counts(state: &ApplicationState) {
    for (name, count) in state.counts() {
        println!("{:<14} {}", name.as_str(), count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app;
    use crate::config::{Config, ConfigSource, ConfigValue};
    use educonnect_core::RemoteConfig;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_records_doc_id_in_mirror() {
        let temp_dir = tempdir().unwrap();
        let mut config = Config::load(Some(temp_dir.path().join("missing.yaml"))).unwrap();
        config.data_dir = ConfigValue::new(temp_dir.path().to_path_buf(), ConfigSource::File);
        config.remote = RemoteConfig::default();
        let coordinator = app::start(&config, true);

        let cmd = SaveCommand {
            collection: CollectionName::Posts,
            data: Some(r#"{"id": 3, "title": "Feria"}"#.to_string()),
            file: None,
        };
        cmd.run(&coordinator).await.unwrap();

        let state = coordinator.context().state.read().await;
        let post = state.find(CollectionName::Posts, &json!(3)).unwrap();
        assert!(post.doc_id.is_some());

        let mirrored = coordinator.mirror().restore().unwrap();
        assert_eq!(mirrored.posts.len(), 1);
        assert_eq!(mirrored.posts[0].doc_id, post.doc_id);
    }
}
