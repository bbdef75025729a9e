use crate::application::ports::prompt_port::{PromptPort, QuickPickItem};
use crate::application::services::group_repository::GroupRepository;
use crate::application::use_cases::groups::command_error::GroupCommandError;

pub struct AddAddonsViaPicker<'a, P: PromptPort + ?Sized> {
    pub repo: &'a GroupRepository,
    pub prompt: &'a P,
}

impl<'a, P: PromptPort + ?Sized> AddAddonsViaPicker<'a, P> {
    /// Offers installed add-ons that are not yet members of `group`.
    /// Returns the ids added, or None when the picker was dismissed.
    pub async fn execute(&self, group: &str) -> Result<Option<Vec<String>>, GroupCommandError> {
        let Some(current) = self.repo.get_group(group).await else {
            return Ok(None);
        };
        let candidates: Vec<QuickPickItem> = self
            .repo
            .inventory()
            .list_all()
            .into_iter()
            .filter(|addon| !current.contains(&addon.id))
            .map(|addon| QuickPickItem {
                label: addon.label().to_string(),
                description: addon.description.clone(),
                key: addon.id,
            })
            .collect();

        let picked = self
            .prompt
            .prompt_multi_select(&format!("Add extensions to \"{group}\""), &candidates)
            .await
            .map_err(GroupCommandError::Prompt)?;
        let Some(picked) = picked else {
            return Ok(None);
        };
        let ids: Vec<String> = picked.into_iter().map(|item| item.key).collect();
        Ok(Some(self.repo.add_members(group, &ids).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::group_repository::GROUP_MAP_STORAGE_KEY;
    use crate::infrastructure::inventory::StaticInventory;
    use crate::infrastructure::prompt::TerminalPrompt;
    use crate::infrastructure::storage::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn offers_only_non_members() {
        let repo = GroupRepository::new(
            Arc::new(MemoryStore::with_value(GROUP_MAP_STORAGE_KEY, json!({"Work": ["a"]}))),
            Arc::new(StaticInventory::with_ids(["a", "b", "c"])),
        );
        // Options are b, c; pick the second
        let prompt = TerminalPrompt::new(&b"2\n"[..], Vec::new());
        let added = AddAddonsViaPicker {
            repo: &repo,
            prompt: &prompt,
        }
        .execute("Work")
        .await
        .unwrap();
        assert_eq!(added, Some(vec!["c".to_string()]));

        let (_, out) = prompt.into_inner();
        let out = String::from_utf8(out).unwrap();
        assert!(!out.contains(") a\n"));
        assert_eq!(repo.get_group("Work").await.unwrap().member_ids(), ["a", "c"]);
    }
}
