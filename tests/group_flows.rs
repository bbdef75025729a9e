use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use addon_groups::application::ports::addon_inventory::AddonInventory;
use addon_groups::application::ports::key_value_store::KeyValueStore;
use addon_groups::application::services::group_repository::{
    GROUP_MAP_STORAGE_KEY, GroupRepository, IMPORT_MERGE, IMPORT_OVERWRITE,
};
use addon_groups::application::services::inventory_sync::InventorySync;
use addon_groups::application::use_cases::groups::export_groups::{EXPORT_ALL, ExportGroups};
use addon_groups::application::use_cases::groups::import_groups_from_file::{
    IMPORT_ALL, ImportGroupsError, ImportGroupsFromFile,
};
use addon_groups::domain::groups::addon::AddonRef;
use addon_groups::domain::groups::group_file::{FORMAT_KEY, FORMAT_VERSION};
use addon_groups::infrastructure::inventory::StaticInventory;
use addon_groups::infrastructure::prompt::AutoPrompt;
use addon_groups::infrastructure::storage::{JsonFileStore, MemoryStore};

fn file_repo(path: &std::path::Path, inventory: Arc<StaticInventory>) -> GroupRepository {
    let store = Arc::new(JsonFileStore::open(path).unwrap());
    GroupRepository::new(store, inventory)
}

async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn export_then_import_into_fresh_state() {
    let temp = TempDir::new().unwrap();
    let export_path = temp.path().join("groups.json");
    let inventory = Arc::new(StaticInventory::with_ids(["a", "b", "c"]));

    let source = file_repo(&temp.path().join("one.json"), inventory.clone());
    source.create_group("Work").await.unwrap();
    source.add_members("Work", &["b".into(), "a".into()]).await.unwrap();
    source.create_group("Play").await.unwrap();
    source.add_members("Play", &["c".into()]).await.unwrap();

    let prompt = AutoPrompt::new().prefer(EXPORT_ALL).save_path(&export_path);
    let exported = ExportGroups {
        repo: &source,
        prompt: &prompt,
    }
    .execute()
    .await
    .unwrap();
    assert_eq!(exported, Some(2));

    let text = std::fs::read_to_string(&export_path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc[FORMAT_KEY], json!(FORMAT_VERSION));

    let target = file_repo(&temp.path().join("two.json"), inventory);
    let prompt = AutoPrompt::new().prefer(IMPORT_ALL).open_path(&export_path);
    let report = ImportGroupsFromFile {
        repo: &target,
        prompt: &prompt,
    }
    .execute()
    .await
    .unwrap()
    .unwrap();
    assert_eq!(report.imported, vec!["Work", "Play"]);
    assert_eq!(target.export_snapshot().await, source.export_snapshot().await);

    // Survives a reload from disk
    let reopened = JsonFileStore::open(temp.path().join("two.json")).unwrap();
    assert_eq!(
        reopened.read(GROUP_MAP_STORAGE_KEY),
        Some(json!({"Work": ["b", "a"], "Play": ["c"]}))
    );
}

#[tokio::test]
async fn malformed_import_changes_nothing() {
    let temp = TempDir::new().unwrap();
    let bad = temp.path().join("bad.json");
    std::fs::write(&bad, r#"{"Work": ["a", 3]}"#).unwrap();

    let store = Arc::new(MemoryStore::with_value(GROUP_MAP_STORAGE_KEY, json!({"Work": ["a"]})));
    let inventory = Arc::new(StaticInventory::with_ids(["a"]));
    let repo = GroupRepository::new(store.clone(), inventory);

    let prompt = AutoPrompt::new()
        .prefer(IMPORT_ALL)
        .prefer(IMPORT_OVERWRITE)
        .open_path(&bad);
    let result = ImportGroupsFromFile {
        repo: &repo,
        prompt: &prompt,
    }
    .execute()
    .await;
    assert!(matches!(result, Err(ImportGroupsError::Parse(_))));
    assert_eq!(store.read(GROUP_MAP_STORAGE_KEY), Some(json!({"Work": ["a"]})));

    let missing = AutoPrompt::new()
        .prefer(IMPORT_ALL)
        .open_path(temp.path().join("nope.json"));
    let result = ImportGroupsFromFile {
        repo: &repo,
        prompt: &missing,
    }
    .execute()
    .await;
    assert!(matches!(result, Err(ImportGroupsError::Read(_))));
}

#[tokio::test]
async fn imported_member_links_after_install_completes() {
    let store = Arc::new(MemoryStore::new());
    let inventory = Arc::new(StaticInventory::with_ids(["ext.a"]));
    let repo = Arc::new(GroupRepository::new(store.clone(), inventory.clone()));
    let sync = Arc::new(InventorySync::new(repo.clone(), inventory.clone()));
    let listener = sync.spawn_listener();

    let defs = [("G".to_string(), vec!["ext.a".to_string(), "ext.b".to_string()])]
        .into_iter()
        .collect();
    let report = repo.import_groups(defs, &AutoPrompt::new()).await.unwrap();
    assert_eq!(report.install_requested, vec!["ext.b"]);
    assert_eq!(inventory.install_requests(), vec!["ext.b"]);
    assert_eq!(store.read(GROUP_MAP_STORAGE_KEY), Some(json!({"G": ["ext.a"]})));

    inventory.install(AddonRef::new("ext.b", "B"));
    eventually(|| {
        let repo = repo.clone();
        async move { repo.install_waiting().await.is_empty() }
    })
    .await;
    assert_eq!(
        store.read(GROUP_MAP_STORAGE_KEY),
        Some(json!({"G": ["ext.a", "ext.b"]}))
    );
    listener.abort();
}

#[tokio::test]
async fn uninstall_erases_members_everywhere() {
    let store = Arc::new(MemoryStore::with_value(
        GROUP_MAP_STORAGE_KEY,
        json!({"Work": ["a", "b"], "Play": ["b"], "Misc": ["c"]}),
    ));
    let inventory = Arc::new(StaticInventory::with_ids(["a", "b", "c"]));
    let repo = Arc::new(GroupRepository::new(store.clone(), inventory.clone()));
    let sync = Arc::new(InventorySync::new(repo.clone(), inventory.clone()));
    let listener = sync.spawn_listener();

    inventory.uninstall("b");
    eventually(|| {
        let store = store.clone();
        async move {
            store.read(GROUP_MAP_STORAGE_KEY)
                == Some(json!({"Work": ["a"], "Play": [], "Misc": ["c"]}))
        }
    })
    .await;
    assert!(!inventory.known_ids().contains("b"));
    listener.abort();
}

#[tokio::test]
async fn conflicting_import_merges_when_asked() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("groups.json");
    std::fs::write(&file, r#"{"$format": "addon-groups/v1", "Work": ["b", "a"]}"#).unwrap();

    let store = Arc::new(MemoryStore::with_value(GROUP_MAP_STORAGE_KEY, json!({"Work": ["a"]})));
    let inventory = Arc::new(StaticInventory::with_ids(["a", "b"]));
    let repo = GroupRepository::new(store.clone(), inventory);

    let prompt = AutoPrompt::new()
        .prefer(IMPORT_ALL)
        .prefer(IMPORT_MERGE)
        .open_path(&file);
    let report = ImportGroupsFromFile {
        repo: &repo,
        prompt: &prompt,
    }
    .execute()
    .await
    .unwrap()
    .unwrap();
    assert_eq!(report.imported, vec!["Work"]);
    assert_eq!(store.read(GROUP_MAP_STORAGE_KEY), Some(json!({"Work": ["a", "b"]})));
}
