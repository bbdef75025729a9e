use std::collections::HashMap;

use crate::application::services::group_repository::{GroupRepository, GroupRepositoryError};
use crate::application::use_cases::groups::drop_addons_on_group::DropAddonsOnGroup;
use crate::presentation::tree::TreeNode;

pub const GROUP_VIEW_MIME: &str = "application/vnd.code.tree.extension-group-view";

#[derive(thiserror::Error, Debug)]
pub enum DropError {
    #[error("invalid drag payload")]
    Payload(#[source] serde_json::Error),
    #[error(transparent)]
    Repository(#[from] GroupRepositoryError),
}

/// Mime-keyed payloads carried from a drag source to a drop target.
#[derive(Debug, Clone, Default)]
pub struct DataTransfer {
    items: HashMap<String, String>,
}

impl DataTransfer {
    pub fn set(&mut self, mime: &str, value: String) {
        self.items.insert(mime.to_string(), value);
    }

    pub fn get(&self, mime: &str) -> Option<&str> {
        self.items.get(mime).map(String::as_str)
    }
}

/// Puts the dragged add-on ids on the transfer. Group nodes are not draggable.
pub fn handle_drag(source: &[TreeNode], transfer: &mut DataTransfer) -> Result<(), DropError> {
    let ids: Vec<&str> = source
        .iter()
        .filter_map(|node| match node {
            TreeNode::Addon { addon, .. } => Some(addon.id.as_str()),
            TreeNode::Group { .. } => None,
        })
        .collect();
    let payload = serde_json::to_string(&ids).map_err(DropError::Payload)?;
    transfer.set(GROUP_VIEW_MIME, payload);
    Ok(())
}

/// Adds the dragged add-ons to the group under `target`. Dropping outside any
/// node, or a transfer without our mime type, does nothing.
pub async fn handle_drop(
    repo: &GroupRepository,
    target: Option<&TreeNode>,
    transfer: &DataTransfer,
) -> Result<Vec<String>, DropError> {
    let Some(group) = target.and_then(TreeNode::drop_group) else {
        return Ok(Vec::new());
    };
    let Some(payload) = transfer.get(GROUP_VIEW_MIME) else {
        return Ok(Vec::new());
    };
    let ids: Vec<String> = serde_json::from_str(payload).map_err(DropError::Payload)?;
    Ok(DropAddonsOnGroup { repo }.execute(group, &ids).await?)
}
