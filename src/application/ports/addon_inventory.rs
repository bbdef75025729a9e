use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::groups::addon::AddonRef;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryDiff {
    pub added: HashSet<String>,
    pub removed: HashSet<String>,
}

impl InventoryDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[async_trait]
pub trait AddonInventory: Send + Sync {
    fn list_all(&self) -> Vec<AddonRef>;

    fn known_ids(&self) -> HashSet<String> {
        self.list_all().into_iter().map(|a| a.id).collect()
    }

    fn diff_since(&self, previous: &HashSet<String>) -> InventoryDiff {
        let current = self.known_ids();
        InventoryDiff {
            added: current.difference(previous).cloned().collect(),
            removed: previous.difference(&current).cloned().collect(),
        }
    }

    // Ok(true) when installation was started/completed, Ok(false) when declined
    async fn request_install(&self, addon_id: &str) -> anyhow::Result<bool>;

    // Fired whenever the installed set may have changed; receivers must re-poll
    fn subscribe(&self) -> broadcast::Receiver<()>;
}
