use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::broadcast;

use crate::application::ports::addon_inventory::AddonInventory;
use crate::domain::groups::addon::AddonRef;

/// In-memory inventory fed by the host.
///
/// `request_install` only records the request; the host reports completion
/// through [`StaticInventory::install`], which fires a change notification.
pub struct StaticInventory {
    addons: RwLock<IndexMap<String, AddonRef>>,
    requested: RwLock<Vec<String>>,
    accept_installs: AtomicBool,
    changes: broadcast::Sender<()>,
}

impl StaticInventory {
    pub fn new(addons: impl IntoIterator<Item = AddonRef>) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            addons: RwLock::new(addons.into_iter().map(|a| (a.id.clone(), a)).collect()),
            requested: RwLock::new(Vec::new()),
            accept_installs: AtomicBool::new(true),
            changes,
        }
    }

    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ids.into_iter().map(|id| {
            let id = id.into();
            AddonRef::new(id.clone(), id)
        }))
    }

    pub fn set_accept_installs(&self, accept: bool) {
        self.accept_installs.store(accept, Ordering::SeqCst);
    }

    pub fn install(&self, addon: AddonRef) {
        match self.addons.write() {
            Ok(mut addons) => {
                addons.insert(addon.id.clone(), addon);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(addon.id.clone(), addon);
            }
        }
        let _ = self.changes.send(());
    }

    pub fn uninstall(&self, addon_id: &str) -> bool {
        let removed = match self.addons.write() {
            Ok(mut addons) => addons.shift_remove(addon_id).is_some(),
            Err(poisoned) => poisoned.into_inner().shift_remove(addon_id).is_some(),
        };
        if removed {
            let _ = self.changes.send(());
        }
        removed
    }

    pub fn install_requests(&self) -> Vec<String> {
        match self.requested.read() {
            Ok(requested) => requested.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl AddonInventory for StaticInventory {
    fn list_all(&self) -> Vec<AddonRef> {
        match self.addons.read() {
            Ok(addons) => addons.values().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().values().cloned().collect(),
        }
    }

    async fn request_install(&self, addon_id: &str) -> anyhow::Result<bool> {
        if let Ok(mut requested) = self.requested.write() {
            requested.push(addon_id.to_string());
        }
        let installed = self.known_ids().contains(addon_id);
        Ok(!installed && self.accept_installs.load(Ordering::SeqCst))
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}
