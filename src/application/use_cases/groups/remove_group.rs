use crate::application::services::group_repository::{GroupRepository, GroupRepositoryError};

pub struct RemoveGroup<'a> {
    pub repo: &'a GroupRepository,
}

impl<'a> RemoveGroup<'a> {
    pub async fn execute(&self, name: &str) -> Result<bool, GroupRepositoryError> {
        self.repo.remove_group(name).await
    }
}
