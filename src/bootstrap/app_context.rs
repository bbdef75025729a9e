use std::sync::Arc;

use tokio::sync::broadcast;

use crate::application::ports::addon_inventory::AddonInventory;
use crate::application::ports::group_event_publisher::GroupChange;
use crate::application::ports::key_value_store::KeyValueStore;
use crate::application::services::group_repository::GroupRepository;
use crate::application::services::inventory_sync::InventorySync;
use crate::bootstrap::config::Config;
use crate::infrastructure::events::BroadcastGroupEventPublisher;
use crate::infrastructure::inventory::DirectoryInventory;
use crate::infrastructure::storage::JsonFileStore;

#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    services: Arc<AppServices>,
}

pub struct AppServices {
    store: Arc<dyn KeyValueStore>,
    inventory: Arc<DirectoryInventory>,
    repo: Arc<GroupRepository>,
    sync: Arc<InventorySync>,
    group_events: broadcast::Sender<GroupChange>,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        inventory: Arc<DirectoryInventory>,
        repo: Arc<GroupRepository>,
        sync: Arc<InventorySync>,
        group_events: broadcast::Sender<GroupChange>,
    ) -> Self {
        Self {
            store,
            inventory,
            repo,
            sync,
            group_events,
        }
    }
}

impl AppContext {
    pub fn new(cfg: Config, services: AppServices) -> Self {
        Self {
            cfg,
            services: Arc::new(services),
        }
    }

    /// Wires the file store, the extensions directory and the repository.
    pub fn from_config(cfg: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&cfg.state_file)?);
        let inventory = Arc::new(DirectoryInventory::new(
            &cfg.extensions_dir,
            cfg.builtin_prefix.clone(),
            cfg.install_command.clone(),
        )?);
        let dyn_inventory: Arc<dyn AddonInventory> = inventory.clone();

        let repo = Arc::new(
            GroupRepository::new(store.clone(), dyn_inventory.clone())
                .with_install_wait_ttl(cfg.install_wait_ttl()),
        );
        let (group_events, _) = broadcast::channel(64);
        repo.add_listener(Arc::new(BroadcastGroupEventPublisher::new(
            group_events.clone(),
        )));
        let sync = Arc::new(InventorySync::new(repo.clone(), dyn_inventory));

        tracing::info!(
            state_file = %cfg.state_file.display(),
            extensions_dir = %cfg.extensions_dir.display(),
            "app_context_ready"
        );
        Ok(Self::new(
            cfg,
            AppServices::new(store, inventory, repo, sync, group_events),
        ))
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.services.store.clone()
    }

    pub fn inventory(&self) -> Arc<DirectoryInventory> {
        self.services.inventory.clone()
    }

    pub fn repo(&self) -> Arc<GroupRepository> {
        self.services.repo.clone()
    }

    pub fn sync(&self) -> Arc<InventorySync> {
        self.services.sync.clone()
    }

    pub fn subscribe_group_events(&self) -> broadcast::Receiver<GroupChange> {
        self.services.group_events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> Config {
        Config {
            state_file: temp.path().join("state.json"),
            extensions_dir: temp.path().join("extensions"),
            builtin_prefix: "vscode.".into(),
            install_command: None,
            install_wait_ttl_secs: None,
        }
    }

    #[tokio::test]
    async fn wires_repository_to_file_store_and_events() {
        let temp = TempDir::new().unwrap();
        let ctx = AppContext::from_config(config(&temp)).unwrap();
        let mut events = ctx.subscribe_group_events();

        assert!(ctx.repo().create_group("Work").await.unwrap());
        assert!(matches!(events.recv().await.unwrap(), GroupChange::Created { .. }));

        let reopened = JsonFileStore::open(temp.path().join("state.json")).unwrap();
        assert_eq!(
            reopened.read(crate::application::services::group_repository::GROUP_MAP_STORAGE_KEY),
            Some(json!({"Work": []}))
        );
    }
}
