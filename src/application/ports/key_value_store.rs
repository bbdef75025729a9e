use async_trait::async_trait;
use serde_json::Value as JsonValue;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> Option<JsonValue>;

    fn read_or(&self, key: &str, default: JsonValue) -> JsonValue {
        self.read(key).unwrap_or(default)
    }

    // Durable once resolved; a failed write leaves the previous value intact
    async fn write(&self, key: &str, value: JsonValue) -> anyhow::Result<()>;
}
