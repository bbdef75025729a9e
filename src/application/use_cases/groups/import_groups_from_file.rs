use crate::application::ports::prompt_port::PromptPort;
use crate::application::services::group_repository::{
    GroupRepository, GroupRepositoryError, ImportReport,
};
use crate::application::use_cases::groups::select_groups::select_all_or_some;
use crate::domain::groups::group_file::{GroupFileError, parse_group_file};

pub const IMPORT_ALL: &str = "Import all groups";
pub const IMPORT_SELECTED: &str = "Select groups to import";

#[derive(thiserror::Error, Debug)]
pub enum ImportGroupsError {
    #[error("prompt failed")]
    Prompt(#[source] anyhow::Error),
    #[error("failed to read group file")]
    Read(#[source] std::io::Error),
    #[error(transparent)]
    Parse(#[from] GroupFileError),
    #[error(transparent)]
    Repository(#[from] GroupRepositoryError),
}

pub struct ImportGroupsFromFile<'a, P: PromptPort + ?Sized> {
    pub repo: &'a GroupRepository,
    pub prompt: &'a P,
}

impl<'a, P: PromptPort + ?Sized> ImportGroupsFromFile<'a, P> {
    /// Asks for a file, parses it completely, lets the user narrow the
    /// selection, then imports. Nothing is written unless the file parses.
    pub async fn execute(&self) -> Result<Option<ImportReport>, ImportGroupsError> {
        let Some(path) = self
            .prompt
            .open_file_for_read()
            .await
            .map_err(ImportGroupsError::Prompt)?
        else {
            return Ok(None);
        };
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(ImportGroupsError::Read)?;
        let defs = parse_group_file(&text)?;
        tracing::info!(path = %path.display(), count = defs.len(), "group_file_parsed");

        let Some(selected) = select_all_or_some(
            self.prompt,
            "Import extension groups",
            IMPORT_ALL,
            IMPORT_SELECTED,
            defs,
        )
        .await
        .map_err(ImportGroupsError::Prompt)?
        else {
            return Ok(None);
        };

        let report = self.repo.import_groups(selected, self.prompt).await?;
        Ok(Some(report))
    }
}
