//! Configuration-file path accessor.
//!
//! The ALD sequence itself is described by a configuration file interpreted
//! by the trigger-gate controller; this crate never parses it. These
//! passthrough operations store and retrieve the file path on the
//! controller's `ConfigurationFile` attribute, with no validation and no
//! caching.

use anyhow::Result;

use crate::core::{Controller, DeviceRegistry, Environment, ENV_TG_CONTROLLER};

/// Controller attribute holding the configuration-file path.
pub const CONFIGURATION_FILE_ATTR: &str = "ConfigurationFile";

/// Default configuration-file path on the control host.
pub const DEFAULT_CONF_PATH: &str = "/home/operatorstm/ald_seq_conf.py";

async fn resolve_controller(
    env: &dyn Environment,
    registry: &dyn DeviceRegistry,
) -> Result<std::sync::Arc<dyn Controller>> {
    let ctrl_name = env.get(ENV_TG_CONTROLLER)?;
    registry.controller(&ctrl_name).await
}

/// Set the path to the ALD configuration file.
///
/// The file must be accessible on the host where the controller runs.
pub async fn set_conf(
    env: &dyn Environment,
    registry: &dyn DeviceRegistry,
    path: &str,
) -> Result<()> {
    let ctrl = resolve_controller(env, registry).await?;
    ctrl.write_attribute(CONFIGURATION_FILE_ATTR, path).await
}

/// Get the currently configured ALD configuration-file path.
pub async fn get_conf(env: &dyn Environment, registry: &dyn DeviceRegistry) -> Result<String> {
    let ctrl = resolve_controller(env, registry).await?;
    ctrl.read_attribute(CONFIGURATION_FILE_ATTR).await
}
