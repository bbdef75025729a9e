mod auto_prompt;
mod terminal_prompt;
pub use auto_prompt::*;
pub use terminal_prompt::*;
