use clap::Args;
use educonnect_core::{MigrationReport, SyncCoordinator};

#[derive(Args)]
pub struct MigrateCommand {}

impl MigrateCommand {
    pub async fn run(&self, coordinator: &SyncCoordinator) -> Result<(), Box<dyn std::error::Error>> {
        match coordinator.migrate_from_mirror().await? {
            MigrationReport::NothingToMigrate => {
                println!("No local data to migrate.");
            }
            MigrationReport::RemoteAlreadyPopulated => {
                println!("Remote store already has data; nothing was copied.");
            }
            MigrationReport::Migrated(counts) => {
                println!("Migrated local data to the remote store:");
                for (name, count) in counts {
                    println!("  {:<14} {}", name.as_str(), count);
                }
                println!("\nPrevious local data kept as a backup.");
            }
        }
        Ok(())
    }
}
