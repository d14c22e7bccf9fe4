//! Configuration Management
//!
//! Handles persistent configuration storage for al1-finder.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Last used AWS profile
    #[serde(default)]
    pub profile: Option<String>,
    /// Last used output format
    #[serde(default)]
    pub output: Option<String>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("al1-finder").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective profile (CLI > config > AWS_PROFILE env)
    pub fn effective_profile(&self) -> Option<String> {
        self.profile
            .clone()
            .or_else(|| std::env::var("AWS_PROFILE").ok())
    }

    /// Set profile and save
    pub fn set_profile(&mut self, profile: &str) -> Result<()> {
        self.profile = Some(profile.to_string());
        self.save()
    }

    /// Get effective output format (CLI > config)
    pub fn effective_output(&self) -> Option<String> {
        self.output.clone()
    }

    /// Set output format and save
    pub fn set_output(&mut self, output: &str) -> Result<()> {
        self.output = Some(output.to_string());
        self.save()
    }
}
