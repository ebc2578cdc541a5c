//! Configuration settings and validation.

use crate::{Error, Result};
use std::time::Duration;

/// Default ceiling for file content loaded into a listing.
const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Default quiet interval before a change event is propagated.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Default wall-clock budget for a full scan.
const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(300);

/// Engine configuration.
///
/// All values are supplied by the surrounding application; the engine never
/// computes them itself.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum file size in bytes; larger files are listed but skipped.
    pub max_file_size: u64,

    /// Number of walker threads used by a scan.
    pub scan_threads: usize,

    /// Quiet interval a path must stay silent before a change is propagated.
    pub debounce: Duration,

    /// Wall-clock budget for a single scan.
    pub scan_timeout: Duration,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            scan_threads: std::thread::available_parallelism()
                .map(|n| n.get().min(8))
                .unwrap_or(4),
            debounce: DEFAULT_DEBOUNCE,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 {
            return Err(Error::config("max_file_size cannot be 0"));
        }

        if self.scan_threads == 0 {
            return Err(Error::config("scan_threads cannot be 0"));
        }

        if self.scan_threads > 64 {
            return Err(Error::config("scan_threads cannot exceed 64"));
        }

        if self.debounce.is_zero() {
            return Err(Error::config("debounce cannot be zero"));
        }

        if self.debounce >= self.scan_timeout {
            return Err(Error::config(
                "debounce must be shorter than scan_timeout",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_file_size, 1024 * 1024);
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_max_file_size() {
        let config = Config {
            max_file_size: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_file_size"));
    }

    #[test]
    fn test_validate_zero_threads() {
        let config = Config {
            scan_threads: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scan_threads"));
    }

    #[test]
    fn test_validate_too_many_threads() {
        let config = Config {
            scan_threads: 128,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("64"));
    }

    #[test]
    fn test_validate_zero_debounce() {
        let config = Config {
            debounce: Duration::ZERO,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("debounce"));
    }

    #[test]
    fn test_validate_debounce_longer_than_timeout() {
        let config = Config {
            debounce: Duration::from_secs(600),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scan_timeout"));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = Config {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log level"));
    }

    #[test]
    fn test_all_log_levels_valid() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let config = Config {
                log_level: level.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_ok(), "Level '{level}' should be valid");
        }
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let config = Config {
            log_level: "WARN".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
