use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

use crate::application::ports::prompt_port::{PromptPort, QuickPickItem};

/// Non-interactive answers for scripted runs.
///
/// Choice prompts pick the first preferred answer offered; text prompts are
/// dismissed; multi-selects take every option; file dialogs use the
/// configured paths.
#[derive(Debug, Clone, Default)]
pub struct AutoPrompt {
    preferred_choices: Vec<String>,
    open_path: Option<PathBuf>,
    save_path: Option<PathBuf>,
}

impl AutoPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefer(mut self, choice: impl Into<String>) -> Self {
        self.preferred_choices.push(choice.into());
        self
    }

    pub fn open_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.open_path = Some(path.into());
        self
    }

    pub fn save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }
}

#[async_trait]
impl PromptPort for AutoPrompt {
    async fn prompt_choice(
        &self,
        _title: &str,
        options: &[String],
    ) -> anyhow::Result<Option<String>> {
        Ok(self
            .preferred_choices
            .iter()
            .find(|pref| options.contains(pref))
            .cloned())
    }

    async fn prompt_text(
        &self,
        _title: &str,
        _initial_value: Option<&str>,
    ) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn prompt_multi_select(
        &self,
        _title: &str,
        options: &[QuickPickItem],
    ) -> anyhow::Result<Option<Vec<QuickPickItem>>> {
        Ok(Some(options.to_vec()))
    }

    async fn open_file_for_read(&self) -> anyhow::Result<Option<PathBuf>> {
        Ok(self.open_path.clone())
    }

    async fn save_text_to_new_file(&self, default_name: &str, content: &str) -> anyhow::Result<()> {
        let path = self
            .save_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_name));
        tokio::fs::write(&path, content.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn picks_first_offered_preference() {
        let prompt = AutoPrompt::new().prefer("Merge").prefer("Skip");
        let options = vec!["Skip".to_string(), "Overwrite".to_string(), "Merge".to_string()];
        assert_eq!(
            prompt.prompt_choice("t", &options).await.unwrap().as_deref(),
            Some("Merge")
        );
        let other = vec!["Yes".to_string()];
        assert_eq!(prompt.prompt_choice("t", &other).await.unwrap(), None);
        assert_eq!(prompt.prompt_text("t", Some("x")).await.unwrap(), None);
    }
}
