//! Configuration loading and representation.

use serde::Deserialize;
use tracing::warn;

/// Environment variable overriding [`CascadeConfig::max_write_attempts`].
pub const MAX_WRITE_ATTEMPTS_ENV: &str = "BAKEHOUSE_CASCADE_MAX_WRITE_ATTEMPTS";

const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 3;

/// Tuning for version-guarded rewrites (bag cascades and catalog updates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CascadeConfig {
    /// Attempts per document before a concurrent-modification conflict is reported.
    /// Always at least 1.
    pub max_write_attempts: u32,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}

impl CascadeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset, unparsable or zero values fall back
    /// to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(MAX_WRITE_ATTEMPTS_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => config.max_write_attempts = n,
                _ => warn!(
                    key = MAX_WRITE_ATTEMPTS_ENV,
                    value = %raw,
                    default = DEFAULT_MAX_WRITE_ATTEMPTS,
                    "invalid cascade attempt count; using default"
                ),
            }
        }
        config
    }

    pub fn with_max_write_attempts(max_write_attempts: u32) -> Self {
        Self {
            max_write_attempts: max_write_attempts.max(1),
        }
    }
}
