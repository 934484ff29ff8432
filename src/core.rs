//! Core device abstractions for the ALD sequencer.
//!
//! The host control system hands the sequencer a set of named devices: a
//! trigger-gate controller, a measurement group, the trigger gates inside
//! that group, a GPIO board, and (optionally) a remote door that can execute
//! macros on a peer system. This module defines the trait seams for all of
//! them so the sequencing logic stays hardware-agnostic.
//!
//! # Architecture
//!
//! - [`Environment`]: name-keyed string store holding the well-known
//!   bindings ([`ENV_TG_CONTROLLER`], [`ENV_MEAS_GROUP`], [`ENV_REMOTE_DOOR`]).
//! - [`DeviceRegistry`]: resolves device names to live handles.
//! - [`TriggerGate`], [`MeasurementGroup`], [`Controller`], [`Gpio`],
//!   [`Door`]: capability traits for the individual device kinds.
//!
//! # Thread Safety
//!
//! All traits require `Send + Sync`; device handles are shared as
//! `Arc<dyn Trait>` and implementations use interior mutability where they
//! need runtime state.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Environment key naming the trigger-gate controller.
pub const ENV_TG_CONTROLLER: &str = "ALDTGCtrl";
/// Environment key naming the measurement group driving acquisitions.
pub const ENV_MEAS_GROUP: &str = "ALDMeasGrp";
/// Environment key naming the remote door for post-cycle jobs.
pub const ENV_REMOTE_DOOR: &str = "RemoteDoor";

// =============================================================================
// Gate state
// =============================================================================

/// Observable state of a trigger-gate device.
///
/// Mirrors the hardware state model of the underlying device server. During
/// an acquisition every gate is expected to hold [`GateState::On`]; anything
/// else is treated as off-nominal by the cycle runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    /// Gate is armed and generating triggers.
    On,
    /// Gate is idle.
    Off,
    /// Gate is changing state.
    Moving,
    /// Gate raised a hardware alarm.
    Alarm,
    /// Gate is in a fault condition.
    Fault,
    /// State could not be determined.
    Unknown,
}

impl GateState {
    /// Whether this is the nominal in-run state.
    pub fn is_nominal(self) -> bool {
        matches!(self, GateState::On)
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateState::On => "ON",
            GateState::Off => "OFF",
            GateState::Moving => "MOVING",
            GateState::Alarm => "ALARM",
            GateState::Fault => "FAULT",
            GateState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Lookup seams
// =============================================================================

/// Name-keyed store of persistent string bindings.
///
/// The host runtime owns this store; the sequencer only reads it. A missing
/// key must fail with [`crate::error::AldError::MissingBinding`].
pub trait Environment: Send + Sync {
    /// Look up the value bound to `key`.
    fn get(&self, key: &str) -> Result<String>;
}

/// Resolves device names to live device handles.
///
/// Each accessor fails with a device error if the name cannot be resolved,
/// except [`DeviceRegistry::trigger_gate`]: an element that is not a trigger
/// gate resolves to `None`, which callers treat as intentional filtering.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Resolve a trigger-gate controller by name.
    async fn controller(&self, name: &str) -> Result<Arc<dyn Controller>>;

    /// Resolve a measurement group by name.
    async fn measurement_group(&self, name: &str) -> Result<Arc<dyn MeasurementGroup>>;

    /// Resolve a trigger gate by name; `None` if the name does not belong to
    /// a trigger gate.
    async fn trigger_gate(&self, name: &str) -> Option<Arc<dyn TriggerGate>>;

    /// Resolve a GPIO device by name.
    async fn gpio(&self, name: &str) -> Result<Arc<dyn Gpio>>;

    /// Resolve a remote door by name.
    async fn door(&self, name: &str) -> Result<Arc<dyn Door>>;
}

// =============================================================================
// Device capability traits
// =============================================================================

/// A trigger-gate device monitored as a post-cycle health check.
#[async_trait]
pub trait TriggerGate: Send + Sync {
    /// Device name.
    fn name(&self) -> &str;

    /// Current hardware state.
    async fn state(&self) -> Result<GateState>;

    /// Free-text status line from the device.
    async fn status(&self) -> Result<String>;
}

/// A group of hardware channels that can be triggered together for a timed
/// acquisition.
#[async_trait]
pub trait MeasurementGroup: Send + Sync {
    /// Group name.
    fn name(&self) -> &str;

    /// Ordered names of the elements in the group.
    async fn element_list(&self) -> Result<Vec<String>>;

    /// Run one timed acquisition; returns once the acquisition completes.
    async fn count(&self, integration: Duration) -> Result<()>;
}

/// The trigger-gate controller holding the sequence configuration and the
/// set of hardware axes in use.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Controller name.
    fn name(&self) -> &str;

    /// Read a string attribute.
    async fn read_attribute(&self, attr: &str) -> Result<String>;

    /// Write a string attribute.
    async fn write_attribute(&self, attr: &str, value: &str) -> Result<()>;

    /// Hardware axis numbers currently in use by the controller.
    async fn used_axes(&self) -> Result<Vec<u32>>;

    /// Read a controller configuration property.
    async fn property(&self, name: &str) -> Result<String>;
}

/// A GPIO-capable device exposing one boolean attribute per pin function.
#[async_trait]
pub trait Gpio: Send + Sync {
    /// Write a boolean pin attribute (e.g. `pin13_output`).
    async fn write_pin(&self, attr: &str, value: bool) -> Result<()>;
}

/// A remote macro-execution endpoint.
#[async_trait]
pub trait Door: Send + Sync {
    /// Door name.
    fn name(&self) -> &str;

    /// Run a named macro on the remote side, blocking until it completes.
    async fn run_macro(&self, macro_name: &str, args: &[String]) -> Result<()>;
}
