pub mod events;
pub mod inventory;
pub mod prompt;
pub mod storage;
