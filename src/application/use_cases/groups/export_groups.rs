use crate::application::ports::prompt_port::PromptPort;
use crate::application::services::group_repository::GroupRepository;
use crate::application::use_cases::groups::select_groups::select_all_or_some;
use crate::domain::groups::group_file::{DEFAULT_EXPORT_FILE_NAME, render_group_file};

pub const EXPORT_ALL: &str = "Export all groups";
pub const EXPORT_SELECTED: &str = "Select groups to export";

#[derive(thiserror::Error, Debug)]
pub enum ExportGroupsError {
    #[error("prompt failed")]
    Prompt(#[source] anyhow::Error),
    #[error("failed to save exported groups")]
    Save(#[source] anyhow::Error),
}

pub struct ExportGroups<'a, P: PromptPort + ?Sized> {
    pub repo: &'a GroupRepository,
    pub prompt: &'a P,
}

impl<'a, P: PromptPort + ?Sized> ExportGroups<'a, P> {
    // Returns the number of exported groups; None when cancelled
    pub async fn execute(&self) -> Result<Option<usize>, ExportGroupsError> {
        let snapshot = self.repo.export_snapshot().await;
        let Some(selected) = select_all_or_some(
            self.prompt,
            "Export extension groups",
            EXPORT_ALL,
            EXPORT_SELECTED,
            snapshot,
        )
        .await
        .map_err(ExportGroupsError::Prompt)?
        else {
            return Ok(None);
        };

        let content = render_group_file(&selected);
        self.prompt
            .save_text_to_new_file(DEFAULT_EXPORT_FILE_NAME, &content)
            .await
            .map_err(ExportGroupsError::Save)?;
        tracing::info!(count = selected.len(), "groups_exported");
        Ok(Some(selected.len()))
    }
}
