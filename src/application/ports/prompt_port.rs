use std::path::PathBuf;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickPickItem {
    pub key: String,
    pub label: String,
    pub description: Option<String>,
}

impl QuickPickItem {
    pub fn plain(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            key: label.clone(),
            label,
            description: None,
        }
    }
}

/// User-facing prompts. Every method reports a dismissed dialog as `Ok(None)`.
#[async_trait]
pub trait PromptPort: Send + Sync {
    async fn prompt_choice(&self, title: &str, options: &[String])
    -> anyhow::Result<Option<String>>;

    async fn prompt_text(
        &self,
        title: &str,
        initial_value: Option<&str>,
    ) -> anyhow::Result<Option<String>>;

    async fn prompt_multi_select(
        &self,
        title: &str,
        options: &[QuickPickItem],
    ) -> anyhow::Result<Option<Vec<QuickPickItem>>>;

    async fn open_file_for_read(&self) -> anyhow::Result<Option<PathBuf>>;

    async fn save_text_to_new_file(&self, default_name: &str, content: &str)
    -> anyhow::Result<()>;
}
