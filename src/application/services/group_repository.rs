use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::application::ports::addon_inventory::AddonInventory;
use crate::application::ports::group_event_publisher::{GroupChange, GroupEventPublisher};
use crate::application::ports::key_value_store::KeyValueStore;
use crate::application::ports::prompt_port::PromptPort;
use crate::domain::groups::addon::AddonRef;
use crate::domain::groups::group::Group;
use crate::domain::groups::group_file::{
    GroupDefinitions, definitions_from_value, definitions_to_value,
};
use crate::domain::groups::install_wait::InstallWaitEntry;

pub const GROUP_MAP_STORAGE_KEY: &str = "addon-groups.group-map";

pub const IMPORT_SKIP: &str = "Skip";
pub const IMPORT_OVERWRITE: &str = "Overwrite";
pub const IMPORT_MERGE: &str = "Merge";
pub const IMPORT_RENAME: &str = "Rename and import";

/// Choices offered when an imported group name already exists, in display order.
pub const IMPORT_CONFLICT_CHOICES: [&str; 4] =
    [IMPORT_SKIP, IMPORT_OVERWRITE, IMPORT_MERGE, IMPORT_RENAME];

#[derive(thiserror::Error, Debug)]
pub enum GroupRepositoryError {
    #[error("failed to persist group map")]
    Persist(#[source] anyhow::Error),
    #[error("failed to prompt for import conflict")]
    Prompt(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub skipped: Vec<String>,
    pub install_requested: Vec<String>,
    pub install_declined: Vec<String>,
}

enum ImportMode {
    Replace,
    Merge,
}

struct RepositoryState {
    groups: IndexMap<String, Group>,
    install_waiting: Vec<InstallWaitEntry>,
}

/// Owns the group-name to member-id mapping and the install-waiting list.
///
/// Every mutation is applied to a copy of the map, written through to the
/// store, and only then swapped in, so a failed write leaves both sides as
/// they were. The state lock is held across the store write but never across
/// a user prompt; per-group locks serialize mutations of one group name,
/// including an import entry's prompt and commit.
pub struct GroupRepository {
    store: Arc<dyn KeyValueStore>,
    inventory: Arc<dyn AddonInventory>,
    state: Mutex<RepositoryState>,
    group_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
    listeners: RwLock<Vec<Arc<dyn GroupEventPublisher>>>,
    install_wait_ttl: Option<chrono::Duration>,
}

impl GroupRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, inventory: Arc<dyn AddonInventory>) -> Self {
        let groups = Self::load_groups(store.as_ref(), inventory.as_ref());
        Self {
            store,
            inventory,
            state: Mutex::new(RepositoryState {
                groups,
                install_waiting: Vec::new(),
            }),
            group_locks: std::sync::Mutex::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
            install_wait_ttl: None,
        }
    }

    pub fn with_install_wait_ttl(mut self, ttl: Option<chrono::Duration>) -> Self {
        self.install_wait_ttl = ttl;
        self
    }

    // Persisted ids are kept as-is, including ones not installed right now;
    // reads resolve against the inventory.
    fn load_groups(
        store: &dyn KeyValueStore,
        inventory: &dyn AddonInventory,
    ) -> IndexMap<String, Group> {
        let raw = store.read_or(GROUP_MAP_STORAGE_KEY, serde_json::json!({}));
        let defs = match definitions_from_value(raw) {
            Ok(defs) => defs,
            Err(e) => {
                tracing::error!(
                    error = ?e,
                    key = GROUP_MAP_STORAGE_KEY,
                    "group_map_corrupt_using_empty"
                );
                GroupDefinitions::new()
            }
        };

        let known = inventory.known_ids();
        let mut groups = IndexMap::with_capacity(defs.len());
        for (name, ids) in defs {
            let group = Group::create(name.clone(), ids);
            let unresolved = group.len() - group.resolved_ids(&known).len();
            if unresolved > 0 {
                tracing::debug!(group = %name, unresolved, "group_members_not_installed");
            }
            groups.insert(name, group);
        }
        tracing::debug!(count = groups.len(), "group_map_loaded");
        groups
    }

    pub fn add_listener(&self, listener: Arc<dyn GroupEventPublisher>) {
        match self.listeners.write() {
            Ok(mut guard) => guard.push(listener),
            Err(poisoned) => poisoned.into_inner().push(listener),
        }
    }

    async fn notify(&self, change: GroupChange) {
        let listeners = match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for listener in listeners {
            if let Err(e) = listener.publish(&change).await {
                tracing::warn!(error = ?e, ?change, "group_change_publish_failed");
            }
        }
    }

    async fn lock_group(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.group_locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks.entry(name.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    // Acquires in sorted order so two callers never wait on each other
    async fn lock_groups(&self, names: &[&str]) -> Vec<OwnedMutexGuard<()>> {
        let mut sorted: Vec<&str> = names.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut guards = Vec::with_capacity(sorted.len());
        for name in sorted {
            guards.push(self.lock_group(name).await);
        }
        guards
    }

    async fn commit(
        &self,
        state: &mut RepositoryState,
        next: IndexMap<String, Group>,
    ) -> Result<(), GroupRepositoryError> {
        let value = definitions_to_value(&Self::definitions_of(&next));
        self.store
            .write(GROUP_MAP_STORAGE_KEY, value)
            .await
            .map_err(GroupRepositoryError::Persist)?;
        state.groups = next;
        Ok(())
    }

    fn definitions_of(groups: &IndexMap<String, Group>) -> GroupDefinitions {
        groups
            .iter()
            .map(|(name, group)| (name.clone(), group.member_ids().to_vec()))
            .collect()
    }

    pub async fn get_group_list(&self) -> Vec<Group> {
        self.state.lock().await.groups.values().cloned().collect()
    }

    pub async fn group_names(&self) -> Vec<String> {
        self.state.lock().await.groups.keys().cloned().collect()
    }

    pub async fn get_group(&self, name: &str) -> Option<Group> {
        self.state.lock().await.groups.get(name).cloned()
    }

    pub async fn resolve_group(&self, name: &str) -> Option<Vec<AddonRef>> {
        let group = self.get_group(name).await?;
        Some(group.resolve(&self.inventory.list_all()))
    }

    /// Name to member ids for every group, in map order.
    pub async fn export_snapshot(&self) -> GroupDefinitions {
        Self::definitions_of(&self.state.lock().await.groups)
    }

    pub async fn install_waiting(&self) -> Vec<InstallWaitEntry> {
        self.state.lock().await.install_waiting.clone()
    }

    pub fn inventory(&self) -> &Arc<dyn AddonInventory> {
        &self.inventory
    }

    /// Inserts an empty group. Returns `false` when the name is taken.
    pub async fn create_group(&self, name: &str) -> Result<bool, GroupRepositoryError> {
        let _guard = self.lock_group(name).await;
        {
            let mut state = self.state.lock().await;
            if state.groups.contains_key(name) {
                return Ok(false);
            }
            let mut next = state.groups.clone();
            next.insert(name.to_string(), Group::create(name, Vec::<String>::new()));
            self.commit(&mut state, next).await?;
        }
        self.notify(GroupChange::Created {
            name: name.to_string(),
        })
        .await;
        Ok(true)
    }

    /// Full replacement of the group keyed by `group.name()`; keeps the
    /// existing position when the key is already present.
    pub async fn update_group(&self, group: Group) -> Result<(), GroupRepositoryError> {
        let name = group.name().to_string();
        let _guard = self.lock_group(&name).await;
        {
            let mut state = self.state.lock().await;
            let mut next = state.groups.clone();
            next.insert(name.clone(), group);
            self.commit(&mut state, next).await?;
        }
        self.notify(GroupChange::Updated { name }).await;
        Ok(())
    }

    /// Renames a group. Unknown `old_name`, an unchanged name, or a name
    /// already used by another group leave everything untouched.
    pub async fn rename_group(
        &self,
        old_name: &str,
        new_name: &str,
    ) -> Result<bool, GroupRepositoryError> {
        if old_name == new_name {
            return Ok(false);
        }
        let _guards = self.lock_groups(&[old_name, new_name]).await;
        {
            let mut state = self.state.lock().await;
            if !state.groups.contains_key(old_name) {
                return Ok(false);
            }
            if state.groups.contains_key(new_name) {
                tracing::warn!(from = %old_name, to = %new_name, "group_rename_target_exists");
                return Ok(false);
            }
            let mut next = state.groups.clone();
            let Some(mut group) = next.shift_remove(old_name) else {
                return Ok(false);
            };
            group.rename(new_name);
            next.insert(new_name.to_string(), group);
            self.commit(&mut state, next).await?;

            for entry in state.install_waiting.iter_mut() {
                if entry.group == old_name {
                    entry.group = new_name.to_string();
                }
            }
        }
        self.notify(GroupChange::Renamed {
            from: old_name.to_string(),
            to: new_name.to_string(),
        })
        .await;
        Ok(true)
    }

    pub async fn remove_group(&self, name: &str) -> Result<bool, GroupRepositoryError> {
        let _guard = self.lock_group(name).await;
        {
            let mut state = self.state.lock().await;
            if !state.groups.contains_key(name) {
                return Ok(false);
            }
            let mut next = state.groups.clone();
            next.shift_remove(name);
            self.commit(&mut state, next).await?;
            state.install_waiting.retain(|entry| entry.group != name);
        }
        self.notify(GroupChange::Removed {
            name: name.to_string(),
        })
        .await;
        Ok(true)
    }

    /// Appends ids not already present. Returns the ids actually added; an
    /// unknown group yields an empty list.
    pub async fn add_members(
        &self,
        name: &str,
        ids: &[String],
    ) -> Result<Vec<String>, GroupRepositoryError> {
        let _guard = self.lock_group(name).await;
        let added = {
            let mut state = self.state.lock().await;
            let mut next = state.groups.clone();
            let Some(group) = next.get_mut(name) else {
                return Ok(Vec::new());
            };
            let added = group.add_members(ids.iter().cloned());
            if added.is_empty() {
                return Ok(added);
            }
            self.commit(&mut state, next).await?;
            added
        };
        self.notify(GroupChange::Updated {
            name: name.to_string(),
        })
        .await;
        Ok(added)
    }

    pub async fn remove_member(
        &self,
        name: &str,
        addon_id: &str,
    ) -> Result<bool, GroupRepositoryError> {
        let _guard = self.lock_group(name).await;
        {
            let mut state = self.state.lock().await;
            let mut next = state.groups.clone();
            let Some(group) = next.get_mut(name) else {
                return Ok(false);
            };
            if !group.remove_member(addon_id) {
                return Ok(false);
            }
            self.commit(&mut state, next).await?;
        }
        self.notify(GroupChange::Updated {
            name: name.to_string(),
        })
        .await;
        Ok(true)
    }

    /// Drops each removed id from every group. Returns the names of groups
    /// that changed.
    pub async fn erase_removed_extensions(
        &self,
        removed_ids: &[String],
    ) -> Result<Vec<String>, GroupRepositoryError> {
        if removed_ids.is_empty() {
            return Ok(Vec::new());
        }
        let removed: HashSet<String> = removed_ids.iter().cloned().collect();
        let changed = {
            let mut state = self.state.lock().await;
            let mut next = state.groups.clone();
            let mut changed = Vec::new();
            for (name, group) in next.iter_mut() {
                if group.erase(&removed) {
                    changed.push(name.clone());
                }
            }
            if changed.is_empty() {
                return Ok(changed);
            }
            self.commit(&mut state, next).await?;
            changed
        };
        tracing::debug!(groups = ?changed, removed = ?removed_ids, "removed_addons_erased");
        self.notify(GroupChange::MembersErased {
            addon_ids: removed_ids.to_vec(),
        })
        .await;
        Ok(changed)
    }

    /// Links every waiting add-on that the inventory now knows to its target
    /// group and drains those entries. Entries past the configured TTL are
    /// dropped; the rest stay queued.
    pub async fn process_install_waited_list(
        &self,
    ) -> Result<Vec<InstallWaitEntry>, GroupRepositoryError> {
        let known = self.inventory.known_ids();
        let now = Utc::now();
        let (linked, touched) = {
            let mut state = self.state.lock().await;
            if state.install_waiting.is_empty() {
                return Ok(Vec::new());
            }

            let mut next = state.groups.clone();
            let mut linked = Vec::new();
            let mut remaining = Vec::new();
            let mut touched: Vec<String> = Vec::new();
            for entry in state.install_waiting.iter() {
                if known.contains(&entry.addon_id) {
                    match next.get_mut(&entry.group) {
                        Some(group) => {
                            group.add_members([entry.addon_id.clone()]);
                            if !touched.contains(&entry.group) {
                                touched.push(entry.group.clone());
                            }
                            linked.push(entry.clone());
                        }
                        None => {
                            tracing::debug!(
                                addon_id = %entry.addon_id,
                                group = %entry.group,
                                "install_wait_target_missing"
                            );
                        }
                    }
                } else if entry.is_expired(self.install_wait_ttl, now) {
                    tracing::warn!(
                        addon_id = %entry.addon_id,
                        group = %entry.group,
                        requested_at = %entry.requested_at,
                        "install_wait_expired"
                    );
                } else {
                    remaining.push(entry.clone());
                }
            }

            if !linked.is_empty() {
                self.commit(&mut state, next).await?;
            }
            state.install_waiting = remaining;
            (linked, touched)
        };

        for entry in &linked {
            tracing::info!(
                addon_id = %entry.addon_id,
                group = %entry.group,
                "installed_addon_linked"
            );
        }
        for name in touched {
            self.notify(GroupChange::Updated { name }).await;
        }
        Ok(linked)
    }

    /// Drops every waiting entry for `addon_id`. Returns how many were dropped.
    pub async fn cancel_install_wait(&self, addon_id: &str) -> usize {
        let mut state = self.state.lock().await;
        let before = state.install_waiting.len();
        state.install_waiting.retain(|entry| entry.addon_id != addon_id);
        before - state.install_waiting.len()
    }

    /// Imports external group definitions.
    ///
    /// A name that already exists is resolved through `prompt` with
    /// [`IMPORT_CONFLICT_CHOICES`]; a dismissed choice skips the entry. Each
    /// resolved entry replaces its group in full. Ids not currently installed
    /// are requested from the inventory and linked once they show up.
    pub async fn import_groups<P>(
        &self,
        external: GroupDefinitions,
        prompt: &P,
    ) -> Result<ImportReport, GroupRepositoryError>
    where
        P: PromptPort + ?Sized,
    {
        let mut report = ImportReport::default();
        for (name, ids) in external {
            let Some((target, pending)) = self.import_entry(&name, ids, prompt).await? else {
                tracing::info!(group = %name, "import_group_skipped");
                report.skipped.push(name);
                continue;
            };
            tracing::info!(group = %target, pending = pending.len(), "group_imported");
            self.notify(GroupChange::Imported {
                name: target.clone(),
            })
            .await;

            for addon_id in pending {
                if self.request_install_for(&addon_id, &target).await? {
                    report.install_requested.push(addon_id);
                } else {
                    report.install_declined.push(addon_id);
                }
            }
            report.imported.push(target);
        }
        Ok(report)
    }

    // Resolves and commits one import entry. Returns the target name and the
    // ids that still need installing, or None when the entry is skipped.
    async fn import_entry<P>(
        &self,
        name: &str,
        ids: Vec<String>,
        prompt: &P,
    ) -> Result<Option<(String, Vec<String>)>, GroupRepositoryError>
    where
        P: PromptPort + ?Sized,
    {
        let guard = self.lock_group(name).await;
        let exists = self.state.lock().await.groups.contains_key(name);
        if !exists {
            let pending = self.commit_import(name, &ids, ImportMode::Replace).await?;
            return Ok(Some((name.to_string(), pending)));
        }

        let title = format!("Group \"{name}\" already exists");
        let options: Vec<String> = IMPORT_CONFLICT_CHOICES.iter().map(|c| c.to_string()).collect();
        let choice = prompt
            .prompt_choice(&title, &options)
            .await
            .map_err(GroupRepositoryError::Prompt)?;

        match choice.as_deref() {
            Some(IMPORT_OVERWRITE) => {
                let pending = self.commit_import(name, &ids, ImportMode::Replace).await?;
                Ok(Some((name.to_string(), pending)))
            }
            Some(IMPORT_MERGE) => {
                let pending = self.commit_import(name, &ids, ImportMode::Merge).await?;
                Ok(Some((name.to_string(), pending)))
            }
            Some(IMPORT_RENAME) => {
                let Some(new_name) = self.prompt_new_name(name, prompt).await? else {
                    return Ok(None);
                };
                drop(guard);
                let _target_guard = self.lock_group(&new_name).await;
                // Taken while the name prompt was open
                if self.state.lock().await.groups.contains_key(&new_name) {
                    tracing::warn!(group = %name, to = %new_name, "import_rename_target_exists");
                    return Ok(None);
                }
                let pending = self
                    .commit_import(&new_name, &ids, ImportMode::Replace)
                    .await?;
                Ok(Some((new_name, pending)))
            }
            _ => Ok(None),
        }
    }

    // Asks until the answer is non-empty, differs from `original` and is not
    // already a group name. None when the user cancels.
    async fn prompt_new_name<P>(
        &self,
        original: &str,
        prompt: &P,
    ) -> Result<Option<String>, GroupRepositoryError>
    where
        P: PromptPort + ?Sized,
    {
        let mut title = format!("New name for imported group \"{original}\"");
        loop {
            let answer = prompt
                .prompt_text(&title, Some(original))
                .await
                .map_err(GroupRepositoryError::Prompt)?;
            let Some(candidate) = answer else {
                return Ok(None);
            };
            let candidate = candidate.trim();
            if candidate.is_empty() || candidate == original {
                continue;
            }
            if self.state.lock().await.groups.contains_key(candidate) {
                title = format!(
                    "Group \"{candidate}\" already exists. New name for imported group \"{original}\""
                );
                continue;
            }
            return Ok(Some(candidate.to_string()));
        }
    }

    // Writes the group with its installed members and returns the ids that
    // are not installed yet. Merge reads the group's members at commit time.
    async fn commit_import(
        &self,
        name: &str,
        ids: &[String],
        mode: ImportMode,
    ) -> Result<Vec<String>, GroupRepositoryError> {
        let known = self.inventory.known_ids();
        let mut state = self.state.lock().await;

        let mut group = match (&mode, state.groups.get(name)) {
            (ImportMode::Merge, Some(existing)) => existing.clone(),
            _ => Group::create(name, Vec::<String>::new()),
        };
        let mut pending: Vec<String> = Vec::new();
        for id in ids {
            if pending.contains(id) {
                continue;
            }
            if known.contains(id) {
                group.add_members([id.clone()]);
            } else {
                pending.push(id.clone());
            }
        }

        let mut next = state.groups.clone();
        next.insert(name.to_string(), group);
        self.commit(&mut state, next).await?;
        Ok(pending)
    }

    // Registers the wait entry before asking for the install so an inventory
    // change that lands mid-request still finds it.
    async fn request_install_for(
        &self,
        addon_id: &str,
        group: &str,
    ) -> Result<bool, GroupRepositoryError> {
        {
            let mut state = self.state.lock().await;
            let already = state
                .install_waiting
                .iter()
                .any(|e| e.addon_id == addon_id && e.group == group);
            if already {
                return Ok(true);
            }
            state
                .install_waiting
                .push(InstallWaitEntry::new(addon_id, group));
        }

        let accepted = match self.inventory.request_install(addon_id).await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(
                    addon_id = %addon_id,
                    group = %group,
                    error = ?e,
                    "install_request_failed"
                );
                false
            }
        };

        // Installed since the commit took its inventory snapshot
        if !accepted && self.inventory.known_ids().contains(addon_id) {
            tracing::info!(addon_id = %addon_id, group = %group, "install_already_present");
            self.process_install_waited_list().await?;
            return Ok(true);
        }

        if !accepted {
            tracing::warn!(addon_id = %addon_id, group = %group, "install_request_declined");
            let mut state = self.state.lock().await;
            if let Some(pos) = state
                .install_waiting
                .iter()
                .position(|e| e.addon_id == addon_id && e.group == group)
            {
                state.install_waiting.remove(pos);
            }
            return Ok(false);
        }

        tracing::info!(addon_id = %addon_id, group = %group, "install_requested");
        self.process_install_waited_list().await?;
        Ok(true)
    }
}
