use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::Context;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::application::ports::addon_inventory::AddonInventory;
use crate::domain::groups::addon::AddonRef;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageManifest {
    publisher: Option<String>,
    name: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    icon: Option<String>,
}

/// Inventory backed by an editor extensions directory.
///
/// Each sub-directory holding a `package.json` with `publisher` and `name` is
/// one add-on with id `publisher.name`. Ids starting with the built-in prefix
/// are hidden. Installs run an external command template where `{id}` is
/// replaced with the add-on id, then rescan.
pub struct DirectoryInventory {
    root: PathBuf,
    builtin_prefix: String,
    install_command: Option<String>,
    addons: RwLock<Vec<AddonRef>>,
    changes: broadcast::Sender<()>,
}

impl DirectoryInventory {
    pub fn new(
        root: impl Into<PathBuf>,
        builtin_prefix: impl Into<String>,
        install_command: Option<String>,
    ) -> anyhow::Result<Self> {
        let root = root.into();
        let builtin_prefix = builtin_prefix.into();
        let addons = scan_extensions_dir(&root, &builtin_prefix)?;
        tracing::debug!(root = %root.display(), count = addons.len(), "extensions_dir_scanned");
        let (changes, _) = broadcast::channel(16);
        Ok(Self {
            root,
            builtin_prefix,
            install_command,
            addons: RwLock::new(addons),
            changes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rescans the directory and notifies subscribers if the id set changed.
    /// The scan runs on the blocking pool.
    pub async fn refresh(&self) -> anyhow::Result<bool> {
        let root = self.root.clone();
        let builtin_prefix = self.builtin_prefix.clone();
        let fresh = tokio::task::spawn_blocking(move || scan_extensions_dir(&root, &builtin_prefix))
            .await
            .context("extensions dir scan task failed")??;
        let fresh_ids: HashSet<&str> = fresh.iter().map(|a| a.id.as_str()).collect();
        let mut addons = match self.addons.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let old_ids: HashSet<&str> = addons.iter().map(|a| a.id.as_str()).collect();
        let changed = old_ids != fresh_ids;
        *addons = fresh;
        drop(addons);
        if changed {
            let _ = self.changes.send(());
        }
        Ok(changed)
    }

    fn install_argv(&self, addon_id: &str) -> Option<Vec<String>> {
        let template = self.install_command.as_deref()?;
        let argv: Vec<String> = template
            .split_whitespace()
            .map(|part| part.replace("{id}", addon_id))
            .collect();
        if argv.is_empty() { None } else { Some(argv) }
    }
}

fn scan_extensions_dir(root: &Path, builtin_prefix: &str) -> anyhow::Result<Vec<AddonRef>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .with_context(|| format!("failed to read extensions dir {}", root.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.path())
        .collect();
    // Later version directories sort after earlier ones and win
    dirs.sort();

    let mut by_id: IndexMap<String, AddonRef> = IndexMap::new();
    for dir in dirs {
        let manifest_path = dir.join("package.json");
        let Ok(text) = std::fs::read_to_string(&manifest_path) else {
            continue;
        };
        let manifest: PackageManifest = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(
                    path = %manifest_path.display(),
                    error = %e,
                    "extension_manifest_unreadable"
                );
                continue;
            }
        };
        let (Some(publisher), Some(name)) = (manifest.publisher, manifest.name) else {
            continue;
        };
        let id = format!("{publisher}.{name}");
        if !builtin_prefix.is_empty() && id.starts_with(builtin_prefix) {
            continue;
        }
        let addon = AddonRef {
            display_name: manifest.display_name.unwrap_or_else(|| name.clone()),
            description: manifest.description,
            icon_path: manifest
                .icon
                .map(|icon| dir.join(icon).to_string_lossy().into_owned()),
            id: id.clone(),
        };
        by_id.insert(id, addon);
    }
    Ok(by_id.into_values().collect())
}

#[async_trait]
impl AddonInventory for DirectoryInventory {
    fn list_all(&self) -> Vec<AddonRef> {
        match self.addons.read() {
            Ok(addons) => addons.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn request_install(&self, addon_id: &str) -> anyhow::Result<bool> {
        if self.known_ids().contains(addon_id) {
            return Ok(false);
        }
        let Some(argv) = self.install_argv(addon_id) else {
            tracing::warn!(addon_id = %addon_id, "install_command_not_configured");
            return Ok(false);
        };

        tracing::info!(addon_id = %addon_id, command = ?argv, "running_install_command");
        let status = tokio::process::Command::new(&argv[0])
            .args(&argv[1..])
            .status()
            .await
            .with_context(|| format!("failed to spawn install command `{}`", argv[0]))?;
        if !status.success() {
            anyhow::bail!("install command for {addon_id} exited with {status}");
        }
        self.refresh().await?;
        Ok(true)
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}
