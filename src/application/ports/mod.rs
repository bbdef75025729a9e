pub mod addon_inventory;
pub mod group_event_publisher;
pub mod key_value_store;
pub mod prompt_port;
