//! Sequencer for Atomic Layer Deposition (ALD) runs.
//!
//! This library orchestrates an ALD sequence against devices owned by the
//! host control system: it repeats a timed acquisition on a measurement
//! group, runs caller-supplied post-cycle hooks, and checks a set of
//! trigger-gate devices for alarm conditions after every cycle. All device
//! access goes through the trait seams in [`core`], so the sequencing logic
//! is independent of the concrete hardware transport.

pub mod conf;
pub mod core;
pub mod devices;
pub mod error;
pub mod hooks;
pub mod init;
pub mod remote;
pub mod runner;
pub mod settings;
