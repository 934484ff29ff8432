//! Post-cycle job delegation to a remote door.
//!
//! [`RemoteCycleJob`] is the reference post-cycle hook: it serializes the
//! current cycle number as JSON and asks the remote door (e.g. the beamline)
//! to execute its `ald_post_cycle_job` macro, waiting until the remote side
//! acknowledges completion. Attach it to the cycle runner's post-cycle hook
//! place.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde_json::json;
use std::sync::Arc;

use crate::core::{DeviceRegistry, Door, Environment, ENV_REMOTE_DOOR};
use crate::hooks::{CycleContext, CycleHook};

/// Name of the macro executed on the remote door after each cycle.
pub const REMOTE_JOB_MACRO: &str = "ald_post_cycle_job";

/// Hook running the post-cycle job on the remote door.
pub struct RemoteCycleJob {
    env: Arc<dyn Environment>,
    registry: Arc<dyn DeviceRegistry>,
}

impl RemoteCycleJob {
    /// Create a hook resolving the door from [`ENV_REMOTE_DOOR`] at each
    /// invocation.
    pub fn new(env: Arc<dyn Environment>, registry: Arc<dyn DeviceRegistry>) -> Self {
        Self { env, registry }
    }
}

#[async_trait]
impl CycleHook for RemoteCycleJob {
    fn name(&self) -> &str {
        "remote-cycle-job"
    }

    async fn run(&self, ctx: &CycleContext) -> Result<()> {
        let door_name = self.env.get(ENV_REMOTE_DOOR)?;
        debug!("Executing {REMOTE_JOB_MACRO} on {door_name}");
        let door = self.registry.door(&door_name).await?;
        let info = json!({ "cycle_nb": ctx.cycle_nb }).to_string();
        door.run_macro(REMOTE_JOB_MACRO, &[info]).await
    }
}
