//! Engine configuration.
//!
//! Policy knobs that are not part of the clinic's data: fallback caps,
//! minimums and rest periods, the per-day shift limit, the weekly
//! working-day limit, the solver strategy and an optional time limit.
//! Loaded from TOML.
//!
//! # Examples
//!
//! ```
//! use u_roster::config::RosterConfig;
//! use std::time::Duration;
//!
//! let config = RosterConfig::from_toml_str(r#"
//!     [defaults]
//!     max_shifts_per_period = 20
//!     min_rest_hours = 12
//!     max_shifts_per_day = 2
//!     max_work_days_per_week = 5
//!
//!     [solver]
//!     strategy = "greedy"
//!     time_limit_seconds = 30
//! "#).unwrap();
//!
//! assert_eq!(config.defaults.min_rest_hours, 12);
//! assert_eq!(config.defaults.max_work_days_per_week, Some(5));
//! assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
//! ```
//!
//! Fall back to defaults when the file is missing:
//!
//! ```
//! use u_roster::config::RosterConfig;
//!
//! let config = RosterConfig::load("roster.toml").unwrap_or_default();
//! assert_eq!(config.defaults.min_rest_hours, 11);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RosterConfig {
    /// Fallback workload policy.
    #[serde(default)]
    pub defaults: PolicyDefaults,

    /// Solver selection and limits.
    #[serde(default)]
    pub solver: SolverSettings,
}

/// Workload policy used when neither the employee nor its role says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PolicyDefaults {
    /// Per-period shift cap. `None` = unlimited.
    pub max_shifts_per_period: Option<u32>,
    /// Per-ISO-week shift cap. `None` = unlimited.
    pub max_shifts_per_week: Option<u32>,
    /// Minimum rest between consecutive shifts.
    pub min_rest_hours: u32,
    /// Maximum shifts one employee may work on a calendar day. `None` = unlimited.
    pub max_shifts_per_day: Option<u32>,
    /// Target minimum shifts per period. Reported, not enforced.
    pub min_shifts_per_period: Option<u32>,
    /// Target minimum shifts per full ISO week. Reported, not enforced.
    pub min_shifts_per_week: Option<u32>,
    /// Maximum distinct working days per ISO week. `None` = unlimited.
    pub max_work_days_per_week: Option<u32>,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            max_shifts_per_period: None,
            max_shifts_per_week: None,
            min_rest_hours: 11,
            max_shifts_per_day: None,
            min_shifts_per_period: None,
            min_shifts_per_week: None,
            max_work_days_per_week: None,
        }
    }
}

/// Solver selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct SolverSettings {
    /// Assignment strategy.
    pub strategy: SolverStrategy,
    /// Wall-clock budget; remaining seats are reported unmet once exceeded.
    pub time_limit_seconds: Option<u64>,
}

/// Available assignment strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStrategy {
    /// Single forward greedy pass, no backtracking.
    #[default]
    Greedy,
}

impl RosterConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist, contains invalid TOML,
    /// or fails [`validate`](Self::validate).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make every run degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solver.time_limit_seconds == Some(0) {
            return Err(ConfigError::Invalid(
                "solver.time_limit_seconds must be positive".to_string(),
            ));
        }
        if self.defaults.max_shifts_per_day == Some(0) {
            return Err(ConfigError::Invalid(
                "defaults.max_shifts_per_day must be positive".to_string(),
            ));
        }
        if let Some(days) = self.defaults.max_work_days_per_week {
            if !(1..=7).contains(&days) {
                return Err(ConfigError::Invalid(format!(
                    "defaults.max_work_days_per_week must be between 1 and 7, got {days}"
                )));
            }
        }
        Ok(())
    }

    /// Sets the per-day shift limit.
    pub fn with_max_shifts_per_day(mut self, limit: u32) -> Self {
        self.defaults.max_shifts_per_day = Some(limit);
        self
    }

    /// Sets the weekly working-day limit.
    pub fn with_max_work_days_per_week(mut self, days: u32) -> Self {
        self.defaults.max_work_days_per_week = Some(days);
        self
    }

    /// Sets the fallback minimum rest.
    pub fn with_min_rest_hours(mut self, hours: u32) -> Self {
        self.defaults.min_rest_hours = hours;
        self
    }

    /// Sets the fallback per-period cap.
    pub fn with_max_shifts_per_period(mut self, cap: u32) -> Self {
        self.defaults.max_shifts_per_period = Some(cap);
        self
    }

    /// Sets the solver time limit.
    pub fn with_time_limit_seconds(mut self, seconds: u64) -> Self {
        self.solver.time_limit_seconds = Some(seconds);
        self
    }

    /// Returns the solver time limit, if configured.
    pub fn time_limit(&self) -> Option<Duration> {
        self.solver.time_limit_seconds.map(Duration::from_secs)
    }
}
