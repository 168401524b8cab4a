//! Command-line parsing and configuration

pub mod args;
pub mod config;

pub use args::Args;
pub use config::{
    default_config_path, ConfigError, FileConfig, OutputSettings, ReaperSettings, StoreSettings,
};

#[cfg(test)]
mod tests;
