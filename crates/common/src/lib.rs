//! NetBox Provider Common Library
//!
//! Shared error type, connection configuration and NetBox API wire types.

pub mod config;
pub mod error;
pub mod types;

pub use config::ProviderConfig;
pub use error::{Error, Result};
pub use types::*;

/// Provider version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default config file path
pub fn default_config_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".netbox")
        .join("provider.toml")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
