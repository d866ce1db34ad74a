pub mod config;
pub mod logger;
pub mod repobook_toml;

pub use config::*;
pub use logger::{report_artifact, setup_logging};
