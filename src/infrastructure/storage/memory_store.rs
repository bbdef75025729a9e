use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::application::ports::key_value_store::KeyValueStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, JsonValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: JsonValue) -> Self {
        let store = Self::default();
        if let Ok(mut values) = store.values.write() {
            values.insert(key.to_string(), value);
        }
        store
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Option<JsonValue> {
        match self.values.read() {
            Ok(values) => values.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    async fn write(&self, key: &str, value: JsonValue) -> anyhow::Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
