use crate::application::services::group_repository::{GroupRepository, GroupRepositoryError};

pub struct DropAddonsOnGroup<'a> {
    pub repo: &'a GroupRepository,
}

impl<'a> DropAddonsOnGroup<'a> {
    /// Adds dropped add-ons to `group`, skipping ids already present and ids
    /// the inventory does not know. Returns the ids added.
    pub async fn execute(
        &self,
        group: &str,
        addon_ids: &[String],
    ) -> Result<Vec<String>, GroupRepositoryError> {
        let known = self.repo.inventory().known_ids();
        let ids: Vec<String> = addon_ids
            .iter()
            .filter(|id| known.contains(*id))
            .cloned()
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.repo.add_members(group, &ids).await
    }
}
