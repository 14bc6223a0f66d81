//! Engine configuration
//!
//! ```toml
//! parallel = true
//! plan_cache_capacity = 256
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Default number of cached operation plans
pub const DEFAULT_PLAN_CACHE_CAPACITY: u64 = 1024;

/// Runtime settings for a [`crate::Crane`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CraneConfig {
    /// Run independent configuration groups on the rayon pool
    pub parallel: bool,

    /// Maximum number of resolved plans kept in the cache
    pub plan_cache_capacity: u64,
}

impl CraneConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set parallel group execution
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set plan cache capacity
    #[must_use]
    pub fn with_plan_cache_capacity(mut self, capacity: u64) -> Self {
        self.plan_cache_capacity = capacity;
        self
    }

    /// Parse configuration from a TOML string; absent keys keep defaults
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] on malformed TOML or when the
    /// plan cache capacity is zero.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] when the plan cache capacity is zero.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.plan_cache_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "plan_cache_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CraneConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            plan_cache_capacity: DEFAULT_PLAN_CACHE_CAPACITY,
        }
    }
}
