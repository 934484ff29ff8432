//! Custom error types for the sequencer.
//!
//! This module defines the primary error type, `AldError`, for the whole
//! crate. Using the `thiserror` crate, it provides a centralized way to
//! handle the failure modes of a sequence run:
//!
//! - **`MissingBinding`**: a required environment key (controller name,
//!   measurement-group name, remote door name) is not bound. Propagated to
//!   the caller, never recovered locally.
//! - **`Device`**: an external device could not be resolved or a device I/O
//!   call failed. Propagated unmodified.
//! - **`SequenceFailed`**: a trigger gate was found off-nominal after a
//!   cycle. Raised after the per-gate diagnostic report has been logged.
//! - **`Config` / `Configuration`**: settings-file load and semantic
//!   validation failures.
//!
//! Device trait methods return `anyhow::Result`, so typed errors surface via
//! `downcast_ref::<AldError>()` where callers need to distinguish them.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AldResult<T> = std::result::Result<T, AldError>;

/// Error type covering all sequencer failure modes.
#[derive(Error, Debug)]
pub enum AldError {
    /// A required environment key is not bound.
    #[error("Missing environment binding: {0}")]
    MissingBinding(String),

    /// A device could not be resolved, or device I/O failed.
    #[error("Device '{device}' unavailable: {message}")]
    Device {
        /// Name of the device that failed to resolve or respond.
        device: String,
        /// Human-readable failure description.
        message: String,
    },

    /// Settings file could not be loaded or parsed.
    #[error("Configuration load error: {0}")]
    Config(#[from] figment::Error),

    /// Settings parsed but failed semantic validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// A trigger gate went off-nominal during the run.
    #[error("ald sequence failed")]
    SequenceFailed,
}

impl AldError {
    /// Shorthand for a [`AldError::Device`] error.
    pub fn device(device: impl Into<String>, message: impl Into<String>) -> Self {
        AldError::Device {
            device: device.into(),
            message: message.into(),
        }
    }
}
