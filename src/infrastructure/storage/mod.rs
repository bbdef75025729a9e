mod json_file_store;
mod memory_store;
pub use json_file_store::*;
pub use memory_store::*;
