//! Scheduler configuration with explicit optionality.
//!
//! Every knob is an `Option`: an omitted field falls back to its default,
//! while an explicit value -- including zero -- is honored as written. Zero
//! is a legitimate setting for `max_catch_up` (never emit ticks) and
//! `wait_ms` (run passes back-to-back), so this module deliberately does
//! not treat zero as "use the default".
//!
//! The one place zero is rejected is the tick rate: a zero rate has no
//! meaningful interval, and a rate above 1000 would derive a zero-width
//! interval. Both fail fast with [`ConfigError::InvalidRate`].

use std::path::Path;

use serde::Deserialize;

/// Default target rate when `ticks_per_second` is omitted.
pub const DEFAULT_TICKS_PER_SECOND: u32 = 60;

/// Default catch-up bound when `max_catch_up` is omitted.
pub const DEFAULT_MAX_CATCH_UP: u32 = 10;

/// Default inter-pass wait when `wait_ms` is omitted.
pub const DEFAULT_WAIT_MS: u64 = 0;

/// Highest accepted tick rate. Anything above this would floor the derived
/// millisecond interval to zero.
pub const MAX_TICKS_PER_SECOND: u32 = 1000;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The tick rate is outside the accepted range.
    #[error("invalid tick rate {rate}: must be 1..={MAX_TICKS_PER_SECOND} so the tick interval is at least 1ms")]
    InvalidRate {
        /// The rejected rate value.
        rate: u32,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Scheduler configuration.
///
/// All fields are optional; see the module docs for the omitted-versus-zero
/// distinction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Target simulation rate in ticks per second (default 60).
    #[serde(default)]
    pub ticks_per_second: Option<u32>,

    /// Maximum ticks emitted in a single catch-up pass (default 10).
    #[serde(default)]
    pub max_catch_up: Option<u32>,

    /// Delay between scheduling passes in milliseconds (default 0, meaning
    /// yield to the host once and resume immediately).
    #[serde(default)]
    pub wait_ms: Option<u64>,
}

impl SchedulerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&contents)?)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Resolve the effective tick rate, validating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRate`] if the rate is zero or above
    /// [`MAX_TICKS_PER_SECOND`]. An omitted rate resolves to the default
    /// and always validates.
    pub fn effective_ticks_per_second(&self) -> Result<u32, ConfigError> {
        let rate = self.ticks_per_second.unwrap_or(DEFAULT_TICKS_PER_SECOND);
        validate_rate(rate)?;
        Ok(rate)
    }

    /// Resolve the effective catch-up bound. Explicit zero is honored.
    pub const fn effective_max_catch_up(&self) -> u32 {
        match self.max_catch_up {
            Some(value) => value,
            None => DEFAULT_MAX_CATCH_UP,
        }
    }

    /// Resolve the effective inter-pass wait. Explicit zero is honored.
    pub const fn effective_wait_ms(&self) -> u64 {
        match self.wait_ms {
            Some(value) => value,
            None => DEFAULT_WAIT_MS,
        }
    }
}

/// Validate a tick rate against the accepted `1..=1000` range.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidRate`] for zero or out-of-range rates.
pub const fn validate_rate(rate: u32) -> Result<(), ConfigError> {
    if rate == 0 || rate > MAX_TICKS_PER_SECOND {
        return Err(ConfigError::InvalidRate { rate });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_mapping_resolves_to_defaults() {
        let config = SchedulerConfig::parse("{}").unwrap();
        assert_eq!(config.effective_ticks_per_second().unwrap(), 60);
        assert_eq!(config.effective_max_catch_up(), 10);
        assert_eq!(config.effective_wait_ms(), 0);
    }

    #[test]
    fn explicit_fields_parse() {
        let config = SchedulerConfig::parse(
            "ticks_per_second: 50\nmax_catch_up: 5\nwait_ms: 5\n",
        )
        .unwrap();
        assert_eq!(config.ticks_per_second, Some(50));
        assert_eq!(config.max_catch_up, Some(5));
        assert_eq!(config.wait_ms, Some(5));
    }

    #[test]
    fn explicit_zero_is_honored_for_catch_up_and_wait() {
        let config = SchedulerConfig::parse("max_catch_up: 0\nwait_ms: 0\n").unwrap();
        assert_eq!(config.effective_max_catch_up(), 0);
        assert_eq!(config.effective_wait_ms(), 0);
    }

    #[test]
    fn zero_rate_is_rejected() {
        let config = SchedulerConfig {
            ticks_per_second: Some(0),
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            config.effective_ticks_per_second(),
            Err(ConfigError::InvalidRate { rate: 0 })
        ));
    }

    #[test]
    fn rate_above_one_thousand_is_rejected() {
        let config = SchedulerConfig {
            ticks_per_second: Some(1001),
            ..SchedulerConfig::default()
        };
        assert!(config.effective_ticks_per_second().is_err());
    }

    #[test]
    fn rate_of_exactly_one_thousand_is_accepted() {
        let config = SchedulerConfig {
            ticks_per_second: Some(1000),
            ..SchedulerConfig::default()
        };
        assert_eq!(config.effective_ticks_per_second().unwrap(), 1000);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = SchedulerConfig::from_file(Path::new("/nonexistent/cadence.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let result = SchedulerConfig::parse("ticks_per_second: [not a number");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }
}
