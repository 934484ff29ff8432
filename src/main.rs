//! CLI for exercising the ALD sequencer against mock hardware.
//!
//! Exposes the four sequencer operations (`run`, `set-conf`, `get-conf`,
//! `init`) wired to the scripted mock devices, so the sequencing logic can
//! be driven without a beamline.

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ald_sequencer::conf::{self, CONFIGURATION_FILE_ATTR, DEFAULT_CONF_PATH};
use ald_sequencer::core::{
    DeviceRegistry, Environment, ENV_MEAS_GROUP, ENV_REMOTE_DOOR, ENV_TG_CONTROLLER,
};
use ald_sequencer::devices::mock::{
    MockController, MockDoor, MockEnvironment, MockGpio, MockMeasurementGroup, MockRegistry,
    MockTriggerGate,
};
use ald_sequencer::init::init_pins;
use ald_sequencer::remote::RemoteCycleJob;
use ald_sequencer::runner::SequenceRunner;
use ald_sequencer::settings::Settings;

#[derive(Parser)]
#[command(name = "ald_sequencer", about = "ALD sequence runner (mock rig)")]
struct Cli {
    /// Path to a TOML settings file.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute the ALD sequence.
    Run {
        /// Number of repetitions.
        #[arg(long, default_value_t = 1)]
        repeats: usize,
        /// Wait time (s) between repetitions.
        #[arg(long, default_value_t = 0.0)]
        wait_time: f64,
        /// Attach the remote post-cycle job hook.
        #[arg(long)]
        remote_job: bool,
    },
    /// Set the path to the ALD configuration file.
    SetConf {
        /// Full path to the configuration file.
        #[arg(default_value = DEFAULT_CONF_PATH)]
        file: String,
    },
    /// Get the path to the ALD configuration file.
    GetConf,
    /// Initialize ALD hardware (GPIO output pins).
    Init,
}

/// Build the mock rig: environment bindings plus one controller, one
/// measurement group with two gates and a timer channel, a GPIO board, and
/// a remote door.
fn demo_rig() -> (Arc<dyn Environment>, Arc<MockRegistry>) {
    let env = MockEnvironment::new()
        .with(ENV_TG_CONTROLLER, "ald_tg_ctrl")
        .with(ENV_MEAS_GROUP, "ald_mg")
        .with(ENV_REMOTE_DOOR, "beamline/door/01");

    let controller = MockController::new("ald_tg_ctrl")
        .with_attribute(CONFIGURATION_FILE_ATTR, DEFAULT_CONF_PATH)
        .with_property("device", "ald/gpio/1")
        .with_axes([1, 2, 3]);

    let group = MockMeasurementGroup::new("ald_mg", ["tg_precursor", "tg_purge", "timer01"]);

    let registry = MockRegistry::new()
        .with_controller("ald_tg_ctrl", Arc::new(controller))
        .with_group("ald_mg", Arc::new(group))
        .with_gate("tg_precursor", Arc::new(MockTriggerGate::nominal("tg_precursor")))
        .with_gate("tg_purge", Arc::new(MockTriggerGate::nominal("tg_purge")))
        .with_gpio("ald/gpio/1", Arc::new(MockGpio::new()))
        .with_door("beamline/door/01", Arc::new(MockDoor::new("beamline/door/01")));

    (Arc::new(env), Arc::new(registry))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => Settings::load_from(path)?,
        None => Settings::default(),
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&settings.application.log_level),
    )
    .init();

    let (env, registry) = demo_rig();
    let registry: Arc<dyn DeviceRegistry> = registry;

    match cli.command {
        Command::Run {
            repeats,
            wait_time,
            remote_job,
        } => {
            if wait_time < 0.0 {
                anyhow::bail!("wait_time must be non-negative");
            }
            let mut runner = SequenceRunner::new(Arc::clone(&env), Arc::clone(&registry), &settings);
            if remote_job {
                runner.register_hook(Box::new(RemoteCycleJob::new(
                    Arc::clone(&env),
                    Arc::clone(&registry),
                )));
            }
            runner
                .run(repeats, Duration::from_secs_f64(wait_time))
                .await?;
        }
        Command::SetConf { file } => {
            conf::set_conf(env.as_ref(), registry.as_ref(), &file).await?;
            info!("Configuration file set to {file}");
        }
        Command::GetConf => {
            let file = conf::get_conf(env.as_ref(), registry.as_ref()).await?;
            println!("{file}");
        }
        Command::Init => {
            init_pins(env.as_ref(), registry.as_ref(), &settings.hardware).await?;
        }
    }
    Ok(())
}
