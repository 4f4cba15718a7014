//! CLI command implementations
//!
//! - `serve` - Web server command
//! - `extract` - One-off statement extraction
//! - `categorize` - Category/merchant lookup for a description
//! - `config` - Resolved configuration and override location

pub mod categorize;
pub mod config;
pub mod extract;
pub mod serve;

// Re-export command functions for main.rs
pub use categorize::*;
pub use config::*;
pub use extract::*;
pub use serve::*;

use std::path::Path;

use anyhow::{Context, Result};
use sensei_core::SenseiConfig;

/// Resolve embedded defaults, override file and environment
pub fn load_config(path: Option<&Path>) -> Result<SenseiConfig> {
    SenseiConfig::load(path).context("Failed to load configuration")
}

/// Truncate a string for table output, respecting char boundaries
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
