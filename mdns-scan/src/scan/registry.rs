use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use shared::types::{merge_registry, Registry};

/// Commands sent to the aggregator task
#[derive(Debug)]
pub enum RegistryCommand {
    Merge(Registry),
}

/// Handle to the task that owns the scan's result registry.
///
/// Workers only ever send fragments; the aggregator unions them, so merge order
/// between workers does not matter. The registry is handed back through the
/// task's `JoinHandle` once every handle has been dropped.
#[derive(Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    pub fn spawn() -> (Self, JoinHandle<Registry>) {
        let (tx, mut rx) = mpsc::channel::<RegistryCommand>(256);

        let task = tokio::spawn(async move {
            let mut registry = Registry::new();
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    RegistryCommand::Merge(fragment) => merge_registry(&mut registry, fragment),
                }
            }
            tracing::debug!("Registry aggregator finished with {} devices", registry.len());
            registry
        });

        (Self { tx }, task)
    }

    /// Union a fragment into the registry
    pub async fn merge(&self, fragment: Registry) -> Result<()> {
        self.tx.send(RegistryCommand::Merge(fragment)).await?;
        Ok(())
    }
}
