pub mod cli;
pub mod drag_drop;
pub mod tree;
