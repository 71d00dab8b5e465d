//! Kernel configuration
//!
//! Resource limits and machine parameters. Every field has a default that
//! matches the reference test programs, so an empty JSON object is a
//! valid configuration.

use crate::vfs::MAX_NAME_LEN;
use serde::Deserialize;
use std::path::Path;

/// Console slots reserved at process start (stdin, stdout)
pub const CONSOLE_SLOTS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for a kernel instance
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Descriptor table capacity per process, console slots included
    pub max_open_files: usize,
    /// Longest accepted filename or argument, in bytes
    pub max_name_len: usize,
    /// Live (running or zombie) process records
    pub max_processes: usize,
    /// Physical pages in the machine
    pub phys_pages: usize,
    /// Stack pages given to every process
    pub stack_pages: usize,
    /// Page size, also the chunk size for read/write transfers
    pub page_size: usize,
    /// Required suffix of executable image names
    pub image_suffix: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_open_files: 16,
            max_name_len: MAX_NAME_LEN,
            max_processes: 64,
            phys_pages: 256,
            stack_pages: 8,
            page_size: 1024,
            image_suffix: ".coff".to_string(),
        }
    }
}

impl KernelConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: KernelConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_open_files <= CONSOLE_SLOTS {
            return Err(ConfigError::Invalid(format!(
                "max_open_files must exceed the {} console slots",
                CONSOLE_SLOTS
            )));
        }
        if self.max_name_len == 0 || self.max_name_len > MAX_NAME_LEN {
            return Err(ConfigError::Invalid(format!(
                "max_name_len must be in 1..={}",
                MAX_NAME_LEN
            )));
        }
        if self.max_processes == 0 {
            return Err(ConfigError::Invalid("max_processes must be non-zero".into()));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be non-zero".into()));
        }
        if self.phys_pages <= self.stack_pages {
            return Err(ConfigError::Invalid(
                "phys_pages must exceed stack_pages".into(),
            ));
        }
        Ok(())
    }

    /// Pages a process running an image of `image_pages` pages occupies
    pub fn pages_for(&self, image_pages: usize) -> usize {
        // One extra page holds the argument vector
        image_pages + self.stack_pages + 1
    }
}
