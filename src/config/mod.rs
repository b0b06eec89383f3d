//! Configuration module for dumpvault
//!
//! This module provides configuration management including:
//! - Config file resolution
//! - JSON settings with defaults for every field

pub mod paths;
pub mod settings;

pub use paths::{resolve_config_path, CONFIG_ENV};
pub use settings::{RemoteSettings, Settings};
