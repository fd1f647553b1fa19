use clap::Args;
use educonnect_core::{CollectionName, SyncCoordinator};
use tokio::sync::mpsc;

enum Event {
    Snapshot(usize),
    Failed(String),
}

#[derive(Args)]
pub struct WatchCommand {
    /// Collection to watch
    pub collection: CollectionName,

    /// Stop after this many snapshots
    #[arg(long)]
    pub count: Option<usize>,
}

impl WatchCommand {
    pub async fn run(&self, coordinator: &SyncCoordinator) -> Result<(), Box<dyn std::error::Error>> {
        let timeout = coordinator.options().ready_timeout;
        if !coordinator.context().gate.await_ready(timeout).await {
            return Err("remote store is not available".into());
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let errors = tx.clone();
        let _subscription = coordinator.subscribe(
            self.collection,
            move |docs| {
                let _ = tx.send(Event::Snapshot(docs.len()));
            },
            move |e| {
                let _ = errors.send(Event::Failed(e.to_string()));
            },
        );

        println!("Watching {} (Ctrl-C to stop)", self.collection);
        let mut seen = 0;
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(Event::Snapshot(len)) => {
                        seen += 1;
                        println!("{}: {} document(s)", self.collection, len);
                        if self.count.is_some_and(|limit| seen >= limit) {
                            break;
                        }
                    }
                    Some(Event::Failed(message)) => return Err(message.into()),
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        Ok(())
    }
}
