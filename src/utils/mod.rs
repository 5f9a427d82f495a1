pub mod config;
pub mod env;
pub mod logger;
pub mod spriteflow_toml;

pub use config::*;
pub use env::http_timeout_from_env;
pub use logger::setup_logging;
pub use spriteflow_toml::{SpriteflowToml, apply_file_to_config, load_spriteflow_toml};
