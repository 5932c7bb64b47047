//! Configuration management for isa-tool
//!
//! Configuration priority (highest to lowest):
//! 1. Command line arguments
//! 2. --config specified file
//! 3. ~/.isalens/config.toml
//! 4. ./isalens.toml

pub mod settings;

pub use settings::{Config, LogLevel};
