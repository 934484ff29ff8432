//! The ALD cycle runner.
//!
//! [`SequenceRunner`] executes the deposition sequence described by the
//! configuration file set with [`crate::conf::set_conf`]: a configurable
//! number of repetitions, each of which triggers a timed acquisition on the
//! measurement group, runs the registered post-cycle hooks, waits, and then
//! checks that every trigger gate in the group is still nominal.
//!
//! Acquisitions and hook-driven external actions are real hardware side
//! effects; there is no rollback. A gate found off-nominal terminates the
//! run: the remaining repetitions are skipped, every resolved gate is
//! reported with its state and status, and the run fails with
//! [`AldError::SequenceFailed`].

use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::conf;
use crate::core::{DeviceRegistry, Environment, MeasurementGroup, TriggerGate, ENV_MEAS_GROUP};
use crate::error::AldError;
use crate::hooks::{CycleContext, CycleHook, HookRegistry};
use crate::settings::Settings;

/// Executes ALD cycle sequences against the bound measurement group.
///
/// One runner instance can perform multiple runs; gates and the measurement
/// group are re-resolved at the start of each run. The runner assumes
/// exclusive access to the hardware for the duration of a run.
pub struct SequenceRunner {
    env: Arc<dyn Environment>,
    registry: Arc<dyn DeviceRegistry>,
    hooks: HookRegistry,
    count_time: Duration,
}

impl SequenceRunner {
    /// Create a runner with no hooks attached.
    pub fn new(env: Arc<dyn Environment>, registry: Arc<dyn DeviceRegistry>, settings: &Settings) -> Self {
        Self {
            env,
            registry,
            hooks: HookRegistry::new(),
            count_time: settings.sequence.count_time(),
        }
    }

    /// Attach a post-cycle hook; hooks run in registration order.
    pub fn register_hook(&mut self, hook: Box<dyn CycleHook>) {
        self.hooks.register(hook);
    }

    /// Resolve the trigger gates inside the measurement group.
    ///
    /// Elements that are not trigger gates are skipped without a warning;
    /// the group routinely contains timer and counter channels.
    async fn resolve_gates(&self, elements: &[String]) -> Vec<Arc<dyn TriggerGate>> {
        let mut gates = Vec::new();
        for elem in elements {
            if let Some(gate) = self.registry.trigger_gate(elem).await {
                gates.push(gate);
            }
        }
        gates
    }

    /// Log one diagnostic line per resolved gate.
    ///
    /// Off-nominal gates are reported as warnings, nominal ones as plain
    /// output, so the operator sees the full picture and not only the gate
    /// that tripped.
    async fn report_gates(&self, gates: &[Arc<dyn TriggerGate>]) -> Result<()> {
        for gate in gates {
            let state = gate.state().await?;
            let status = gate.status().await?;
            if state.is_nominal() {
                info!("{} state: {state}; status: {status}", gate.name());
            } else {
                warn!("{} state: {state}; status: {status}", gate.name());
            }
        }
        Ok(())
    }

    /// Execute the ALD sequence.
    ///
    /// Performs `repeats` cycles (expected to be at least 1), pausing
    /// `wait_time` after each cycle's hooks. A zero `wait_time` still goes
    /// through the sleep call. Returns [`AldError::SequenceFailed`] if any
    /// trigger gate is found off-nominal, after reporting all gates.
    pub async fn run(&self, repeats: usize, wait_time: Duration) -> Result<()> {
        let grp_name = self.env.get(ENV_MEAS_GROUP)?;
        let meas_grp = self.registry.measurement_group(&grp_name).await?;
        let elements = meas_grp.element_list().await?;
        let gates = self.resolve_gates(&elements).await;

        let conf_file = conf::get_conf(self.env.as_ref(), self.registry.as_ref()).await?;
        info!("Configuration: {conf_file}");

        let mut alarm = false;
        for i in 0..repeats {
            let ctx = CycleContext {
                cycle_nb: i,
                repeats,
            };
            info!("Running {} repetition", i + 1);
            meas_grp.count(self.count_time).await?;
            self.hooks.run_all(&ctx).await?;
            tokio::time::sleep(wait_time).await;
            for gate in &gates {
                if !gate.state().await?.is_nominal() {
                    alarm = true;
                    break;
                }
            }
            if alarm {
                break;
            }
        }

        if alarm {
            self.report_gates(&gates).await?;
            return Err(AldError::SequenceFailed.into());
        }
        info!("Done");
        Ok(())
    }
}
