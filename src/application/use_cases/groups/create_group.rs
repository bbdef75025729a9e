use crate::application::ports::prompt_port::PromptPort;
use crate::application::services::group_repository::GroupRepository;
use crate::application::use_cases::groups::command_error::GroupCommandError;

pub struct CreateGroup<'a, P: PromptPort + ?Sized> {
    pub repo: &'a GroupRepository,
    pub prompt: &'a P,
}

impl<'a, P: PromptPort + ?Sized> CreateGroup<'a, P> {
    // Returns the new group's name; None when cancelled or the name is taken
    pub async fn execute(&self) -> Result<Option<String>, GroupCommandError> {
        let answer = self
            .prompt
            .prompt_text("Input new extension group name.", None)
            .await
            .map_err(GroupCommandError::Prompt)?;
        let Some(name) = answer.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
            return Ok(None);
        };
        if self.repo.create_group(&name).await? {
            Ok(Some(name))
        } else {
            tracing::warn!(group = %name, "group_already_exists");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::inventory::StaticInventory;
    use crate::infrastructure::prompt::TerminalPrompt;
    use crate::infrastructure::storage::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn creates_trimmed_name_once() {
        let repo = GroupRepository::new(
            Arc::new(MemoryStore::new()),
            Arc::new(StaticInventory::with_ids(["a"])),
        );
        let prompt = TerminalPrompt::new(&b"  Work  \nWork\n\n"[..], Vec::new());
        let create = CreateGroup {
            repo: &repo,
            prompt: &prompt,
        };
        assert_eq!(create.execute().await.unwrap().as_deref(), Some("Work"));
        assert_eq!(create.execute().await.unwrap(), None);
        assert_eq!(create.execute().await.unwrap(), None);
        assert_eq!(repo.group_names().await, vec!["Work"]);
    }
}
