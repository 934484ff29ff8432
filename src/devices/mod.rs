//! Device implementations.
//!
//! Real deployments bind the [`crate::core`] traits to the host control
//! system's device proxies; this crate ships scripted mocks for tests and
//! for exercising the sequencer without hardware.

pub mod mock;
