mod event_publisher_broadcast;
pub use event_publisher_broadcast::*;
