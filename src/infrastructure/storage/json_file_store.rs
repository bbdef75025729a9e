use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tokio::sync::Mutex;

use crate::application::ports::key_value_store::KeyValueStore;

/// Key-value store kept in a single JSON object file.
///
/// The whole object is cached in memory for synchronous reads. Writes go to a
/// temp file next to the target and are renamed over it, so readers see
/// either the old or the new file, never a partial one.
pub struct JsonFileStore {
    path: PathBuf,
    cache: RwLock<JsonMap<String, JsonValue>>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let cache = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read state file {}", path.display()))?;
            if text.trim().is_empty() {
                JsonMap::new()
            } else {
                match serde_json::from_str::<JsonValue>(&text)
                    .with_context(|| format!("corrupt state file {}", path.display()))?
                {
                    JsonValue::Object(obj) => obj,
                    _ => anyhow::bail!("state file {} is not a JSON object", path.display()),
                }
            }
        } else {
            JsonMap::new()
        };
        tracing::debug!(path = %path.display(), keys = cache.len(), "state_file_opened");
        Ok(Self {
            path,
            cache: RwLock::new(cache),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot(&self) -> JsonMap<String, JsonValue> {
        match self.cache.read() {
            Ok(cache) => cache.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    async fn persist(&self, contents: &JsonMap<String, JsonValue>) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(contents)?;
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state.json".into());
        let temp = self
            .path
            .with_file_name(format!("{file_name}.tmp.{}", std::process::id()));

        tokio::fs::write(&temp, json.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", temp.display()))?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e).with_context(|| format!("failed to replace {}", self.path.display()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    fn read(&self, key: &str) -> Option<JsonValue> {
        match self.cache.read() {
            Ok(cache) => cache.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    async fn write(&self, key: &str, value: JsonValue) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut next = self.snapshot();
        next.insert(key.to_string(), value);
        self.persist(&next).await?;
        match self.cache.write() {
            Ok(mut cache) => *cache = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp.path().join("state.json")).unwrap();
        assert_eq!(store.read("anything"), None);
        assert_eq!(store.read_or("anything", json!({})), json!({}));
    }

    #[tokio::test]
    async fn write_persists_and_reloads() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("state.json");
        let store = JsonFileStore::open(&path).unwrap();
        store
            .write("groups", json!({"Work": ["a", "b"]}))
            .await
            .unwrap();
        store.write("other", json!(1)).await.unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.read("groups"), Some(json!({"Work": ["a", "b"]})));
        assert_eq!(reopened.read("other"), Some(json!(1)));

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn corrupt_file_fails_to_open() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(JsonFileStore::open(&path).is_err());

        std::fs::write(&path, "[1,2]").unwrap();
        assert!(JsonFileStore::open(&path).is_err());
    }
}
