//! Signal configuration.
//!
//! Configuration is plain data with serde support so it can be embedded in
//! an application's own TOML file or loaded standalone:
//!
//! ```toml
//! capacity = 128
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Default per-subscriber buffer size.
pub const DEFAULT_CAPACITY: usize = 64;

/// Tunables for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignalConfig {
    /// Number of values buffered per subscriber before `emit` suspends.
    pub capacity: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl SignalConfig {
    /// Config with the given per-subscriber capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Checks that every field is in range.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Invalid` if `capacity` is zero
    pub fn validate(&self) -> ConfigResult<()> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "capacity".to_string(),
                value: self.capacity.to_string(),
                expected: "at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), capacity = config.capacity, "Loaded signal config");
        Ok(config)
    }
}
