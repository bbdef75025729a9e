mod directory_inventory;
mod static_inventory;
pub use directory_inventory::*;
pub use static_inventory::*;
