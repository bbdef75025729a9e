pub mod addon;
pub mod group;
pub mod group_file;
pub mod install_wait;
