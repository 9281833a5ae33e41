//! Configuration management module
//!
//! This module handles loading, saving, and managing the persisted icon
//! settings. Configuration is stored as JSON with atomic writes to prevent
//! corruption.

pub mod manager;
pub mod models;

pub use manager::ConfigManager;
pub use models::{EngineConfig, IconPreferences};
