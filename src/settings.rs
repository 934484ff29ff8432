//! Strongly-typed sequencer settings using Figment.
//!
//! Settings are loaded from a TOML file with environment-variable overrides
//! (prefixed with `ALDSEQ_`):
//!
//! ```text
//! ALDSEQ_APPLICATION_LOG_LEVEL=debug
//! ALDSEQ_SEQUENCE_COUNT_TIME_S=0.01
//! ```
//!
//! Every field has a default, so a missing file yields a usable
//! configuration.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{AldError, AldResult};

/// Top-level sequencer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Application-level settings.
    #[serde(default)]
    pub application: ApplicationSettings,
    /// Cycle-sequence settings.
    #[serde(default)]
    pub sequence: SequenceSettings,
    /// Hardware initialization settings.
    #[serde(default)]
    pub hardware: HardwareSettings,
}

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Cycle-sequence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSettings {
    /// Acquisition duration per cycle, in seconds.
    ///
    /// The acquisition only has to trigger the hardware, so the default is a
    /// minimal 1 ms.
    #[serde(default = "default_count_time_s")]
    pub count_time_s: f64,
}

impl SequenceSettings {
    /// Acquisition duration as a [`Duration`].
    pub fn count_time(&self) -> Duration {
        Duration::from_secs_f64(self.count_time_s)
    }
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            count_time_s: default_count_time_s(),
        }
    }
}

/// Hardware initialization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareSettings {
    /// Auxiliary GPIO axes initialized in addition to the controller's used
    /// axes. Reserved for the vacuum valves.
    #[serde(default = "default_aux_valve_axes")]
    pub aux_valve_axes: Vec<u32>,
}

impl Default for HardwareSettings {
    fn default() -> Self {
        Self {
            aux_valve_axes: default_aux_valve_axes(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_count_time_s() -> f64 {
    0.001
}

fn default_aux_valve_axes() -> Vec<u32> {
    vec![13, 15, 16]
}

impl Settings {
    /// Load settings from a TOML file plus `ALDSEQ_`-prefixed environment
    /// overrides, then validate.
    ///
    /// # Errors
    ///
    /// Returns [`AldError::Config`] if the file cannot be loaded and
    /// [`AldError::Configuration`] if validation fails.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AldResult<Self> {
        // Section and field are separated at the first underscore only, so
        // snake_case field names like count_time_s survive the mapping.
        let settings: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(
                Env::prefixed("ALDSEQ_")
                    .map(|key| key.as_str().to_ascii_lowercase().replacen('_', ":", 1).into())
                    .split(":"),
            )
            .extract()
            .map_err(AldError::Config)?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings after loading.
    ///
    /// Checks:
    /// - log level is one of trace, debug, info, warn, error
    /// - acquisition count time is positive and finite
    pub fn validate(&self) -> AldResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(AldError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if !self.sequence.count_time_s.is_finite() || self.sequence.count_time_s <= 0.0 {
            return Err(AldError::Configuration(format!(
                "Invalid count_time_s {}. Must be a positive number of seconds",
                self.sequence.count_time_s
            )));
        }

        Ok(())
    }
}
