use clap::Args;
use educonnect_core::{ReadinessState, SyncCoordinator};

use super::data::print_counts;
use crate::config::Config;

#[derive(Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn run(
        &self,
        coordinator: &SyncCoordinator,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let gate = &coordinator.context().gate;
        gate.await_ready(coordinator.options().ready_timeout).await;

        println!("Remote");
        println!("======\n");
        match &config.remote.project_id {
            Some(project) => println!("Project: {}", project),
            None => println!("Project: (not configured)"),
        }
        let state = match gate.state() {
            ReadinessState::NotStarted => "not ready (timed out)",
            ReadinessState::Ready => "ready",
            ReadinessState::Failed => "failed",
        };
        println!("Connection: {}", state);
        println!();

        println!("Local mirror");
        println!("============\n");
        println!("Directory: {}", config.data_dir.value.display());
        match coordinator.mirror().restore() {
            Some(mirrored) => print_counts(&mirrored),
            None => println!("(empty)"),
        }
        if let Ok(Some(_)) = coordinator.mirror().restore_backup() {
            println!("\nMigration backup present.");
        }
        Ok(())
    }
}
