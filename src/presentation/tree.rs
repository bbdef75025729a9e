//! View models for the two tree views: every installed add-on, and the user's
//! groups with their resolved members.

use crate::application::ports::addon_inventory::AddonInventory;
use crate::application::services::group_repository::GroupRepository;
use crate::domain::groups::addon::AddonRef;

pub const CONTEXT_ADDON: &str = "ExtensionEntry";
pub const CONTEXT_GROUP: &str = "ExtensionGroup";
pub const CONTEXT_GROUPED_ADDON: &str = "GroupedExtension";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Addon {
        addon: AddonRef,
        // Owning group when the node sits under a group
        parent: Option<String>,
    },
    Group {
        name: String,
        members: Vec<AddonRef>,
    },
}

impl TreeNode {
    pub fn label(&self) -> &str {
        match self {
            TreeNode::Addon { addon, .. } => addon.label(),
            TreeNode::Group { name, .. } => name,
        }
    }

    pub fn children(&self) -> Vec<TreeNode> {
        match self {
            TreeNode::Addon { .. } => Vec::new(),
            TreeNode::Group { name, members } => members
                .iter()
                .map(|addon| TreeNode::Addon {
                    addon: addon.clone(),
                    parent: Some(name.clone()),
                })
                .collect(),
        }
    }

    pub fn context_tag(&self) -> &'static str {
        match self {
            TreeNode::Addon { parent: None, .. } => CONTEXT_ADDON,
            TreeNode::Addon { parent: Some(_), .. } => CONTEXT_GROUPED_ADDON,
            TreeNode::Group { .. } => CONTEXT_GROUP,
        }
    }

    pub fn is_collapsible(&self) -> bool {
        matches!(self, TreeNode::Group { .. })
    }

    /// Group a drop on this node lands in; a grouped add-on drops into its parent.
    pub fn drop_group(&self) -> Option<&str> {
        match self {
            TreeNode::Group { name, .. } => Some(name),
            TreeNode::Addon { parent, .. } => parent.as_deref(),
        }
    }
}

pub fn installed_tree<I: AddonInventory + ?Sized>(inventory: &I) -> Vec<TreeNode> {
    inventory
        .list_all()
        .into_iter()
        .map(|addon| TreeNode::Addon {
            addon,
            parent: None,
        })
        .collect()
}

pub async fn group_tree(repo: &GroupRepository) -> Vec<TreeNode> {
    let known = repo.inventory().list_all();
    repo.get_group_list()
        .await
        .into_iter()
        .map(|group| TreeNode::Group {
            members: group.resolve(&known),
            name: group.name().to_string(),
        })
        .collect()
}
