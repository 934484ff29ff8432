//! ALD hardware initialization.
//!
//! Sets the GPIO output pins: every axis the trigger-gate controller has in
//! use, plus the auxiliary vacuum-valve axes, is switched to output mode on
//! the controller's GPIO device. Errors from any write propagate unhandled.

use anyhow::Result;
use log::info;

use crate::core::{Controller, DeviceRegistry, Environment, Gpio, ENV_TG_CONTROLLER};
use crate::settings::HardwareSettings;

/// Controller property naming its GPIO device.
pub const GPIO_DEVICE_PROPERTY: &str = "device";

fn output_pin_attr(axis: u32) -> String {
    format!("pin{axis}_output")
}

/// Initialize the GPIO output pins for an ALD run.
///
/// Resolves the controller bound to [`ENV_TG_CONTROLLER`], extends its used
/// axes with the auxiliary valve axes from `hardware`, and writes the
/// per-axis output attribute on the controller's GPIO device, in order.
pub async fn init_pins(
    env: &dyn Environment,
    registry: &dyn DeviceRegistry,
    hardware: &HardwareSettings,
) -> Result<()> {
    let ctrl_name = env.get(ENV_TG_CONTROLLER)?;
    let ctrl = registry.controller(&ctrl_name).await?;

    let mut axes = ctrl.used_axes().await?;
    axes.extend_from_slice(&hardware.aux_valve_axes); // vacuum valves

    let gpio_name = ctrl.property(GPIO_DEVICE_PROPERTY).await?;
    let gpio = registry.gpio(&gpio_name).await?;

    for axis in axes {
        info!("Setting PIN {axis} to output");
        gpio.write_pin(&output_pin_attr(axis), true).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_pin_attr_format() {
        assert_eq!(output_pin_attr(13), "pin13_output");
    }
}
