use crate::application::services::group_repository::{GroupRepository, GroupRepositoryError};

pub struct RemoveAddonFromGroup<'a> {
    pub repo: &'a GroupRepository,
}

impl<'a> RemoveAddonFromGroup<'a> {
    pub async fn execute(&self, group: &str, addon_id: &str) -> Result<bool, GroupRepositoryError> {
        self.repo.remove_member(group, addon_id).await
    }
}
