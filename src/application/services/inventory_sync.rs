use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::application::ports::addon_inventory::{AddonInventory, InventoryDiff};
use crate::application::services::group_repository::{GroupRepository, GroupRepositoryError};

/// Tracks the last seen inventory and reconciles the repository whenever the
/// inventory reports a change.
pub struct InventorySync {
    repo: Arc<GroupRepository>,
    inventory: Arc<dyn AddonInventory>,
    known: Mutex<HashSet<String>>,
}

impl InventorySync {
    pub fn new(repo: Arc<GroupRepository>, inventory: Arc<dyn AddonInventory>) -> Self {
        let known = inventory.known_ids();
        Self {
            repo,
            inventory,
            known: Mutex::new(known),
        }
    }

    pub async fn on_inventory_changed(&self) -> Result<InventoryDiff, GroupRepositoryError> {
        let mut known = self.known.lock().await;
        let diff = self.inventory.diff_since(&known);
        if !diff.removed.is_empty() {
            let mut removed: Vec<String> = diff.removed.iter().cloned().collect();
            removed.sort();
            self.repo.erase_removed_extensions(&removed).await?;
        }
        self.repo.process_install_waited_list().await?;
        known.extend(diff.added.iter().cloned());
        known.retain(|id| !diff.removed.contains(id));
        if !diff.is_empty() {
            tracing::debug!(
                added = diff.added.len(),
                removed = diff.removed.len(),
                "inventory_reconciled"
            );
        }
        Ok(diff)
    }

    /// Reconciles on every change notification until the task is aborted or
    /// the inventory's channel closes. A lagged receiver re-polls once.
    pub fn spawn_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        let mut changes = self.inventory.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        if let Err(err) = sync.on_inventory_changed().await {
                            tracing::error!(error = ?err, "inventory_reconcile_failed");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
