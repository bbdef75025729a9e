pub mod add_addons_via_picker;
pub mod command_error;
pub mod create_group;
pub mod drop_addons_on_group;
pub mod export_groups;
pub mod import_groups_from_file;
pub mod remove_addon_from_group;
pub mod remove_group;
pub mod rename_group;
pub mod select_groups;
