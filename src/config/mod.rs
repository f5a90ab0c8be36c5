//! Configuration module
//!
//! Provides configuration types and loading:
//! - [`Config`]: root configuration structure
//! - [`load_config`] / [`load_config_with_env`]: file loading with
//!   validation and environment overrides

pub mod loader;
pub mod types;

pub use loader::{create_default_config, load_config, load_config_str, load_config_with_env};
pub use types::{Config, LogConfig, KNOWN_RENDERERS};
