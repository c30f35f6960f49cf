//! Machine configuration.
//!
//! Configuration is resolved in priority order:
//! 1. Environment variables (`SIMCPU_MEMORY_SIZE`, `SIMCPU_REGISTERS`)
//! 2. An explicit TOML file
//! 3. Built-in defaults
//!
//! # Config File Format
//!
//! ```toml
//! # simcpu.toml
//! memory_size = 256
//! register_count = 4
//! validate_on_load = true
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of memory words.
pub const DEFAULT_MEMORY_SIZE: usize = 256;

/// Default number of general purpose registers.
pub const DEFAULT_REGISTER_COUNT: usize = 4;

/// Sizing and load behaviour for a [`Machine`](crate::Machine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Words of memory, addressed `0..memory_size`.
    pub memory_size: usize,
    /// General purpose registers, `R0..R{register_count - 1}`.
    pub register_count: usize,
    /// Run the dry-run validation pass after loading.
    pub validate_on_load: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            register_count: DEFAULT_REGISTER_COUNT,
            validate_on_load: true,
        }
    }
}

impl MachineConfig {
    /// Parse a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        log::info!("Loaded config from {}", path.display());
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no program could run on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_size == 0 {
            return Err(ConfigError::Invalid("memory_size must be at least 1".to_string()));
        }
        if self.register_count == 0 {
            return Err(ConfigError::Invalid("register_count must be at least 1".to_string()));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(size) = env_usize("SIMCPU_MEMORY_SIZE") {
            log::info!("Using SIMCPU_MEMORY_SIZE from environment: {}", size);
            self.memory_size = size;
        }
        if let Some(count) = env_usize("SIMCPU_REGISTERS") {
            log::info!("Using SIMCPU_REGISTERS from environment: {}", count);
            self.register_count = count;
        }
    }

    /// Sample config file content.
    pub fn sample_config() -> String {
        r#"# simcpu configuration

# Words of memory
memory_size = 256

# General purpose registers (R0..R3)
register_count = 4

# Dry-run every instruction once after loading
validate_on_load = true
"#
        .to_string()
    }
}

fn env_usize(key: &str) -> Option<usize> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not an unsigned integer", key, raw);
            None
        }
    }
}
