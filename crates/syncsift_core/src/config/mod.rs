//! Configuration management for the sync filter.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Defaults for every missing field on load
//!
//! # Example
//!
//! ```no_run
//! use syncsift_core::config::ConfigManager;
//!
//! // Create manager and load (or create default) config
//! let mut config = ConfigManager::new(".config/syncsift.toml");
//! config.load_or_create().unwrap();
//!
//! // Read settings
//! println!("Output folder: {}", config.settings().paths.output_folder);
//!
//! // Modify a setting and save the whole file atomically
//! config.settings_mut().scheduler.max_workers = 4;
//! config.save().unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ExtractSettings, FilterSettings, LoggingSettings, OracleSettings, PathSettings,
    PlannerSettings, SchedulerSettings, Settings,
};
