//! Engine module: CLI surface, progress reporting, path helpers

pub mod arg_parser;
pub mod cli;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::handle_run;
pub use tools::{numbered_path, path_relative_to, path_to_id};
