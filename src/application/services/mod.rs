pub mod group_repository;
pub mod inventory_sync;
