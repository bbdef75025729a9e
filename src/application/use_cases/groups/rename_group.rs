use crate::application::ports::prompt_port::PromptPort;
use crate::application::services::group_repository::GroupRepository;
use crate::application::use_cases::groups::command_error::GroupCommandError;

pub struct RenameGroup<'a, P: PromptPort + ?Sized> {
    pub repo: &'a GroupRepository,
    pub prompt: &'a P,
}

impl<'a, P: PromptPort + ?Sized> RenameGroup<'a, P> {
    pub async fn execute(&self, name: &str) -> Result<bool, GroupCommandError> {
        let answer = self
            .prompt
            .prompt_text("Rename extension group name.", Some(name))
            .await
            .map_err(GroupCommandError::Prompt)?;
        let Some(new_name) = answer.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
            return Ok(false);
        };
        Ok(self.repo.rename_group(name, &new_name).await?)
    }
}
