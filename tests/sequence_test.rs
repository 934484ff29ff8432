//! End-to-end tests for the cycle runner and its satellite operations,
//! driven entirely through the mock device rig.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ald_sequencer::conf;
use ald_sequencer::core::{
    Controller, DeviceRegistry, Environment, GateState, TriggerGate, ENV_MEAS_GROUP,
    ENV_REMOTE_DOOR, ENV_TG_CONTROLLER,
};
use ald_sequencer::devices::mock::{
    MockController, MockDoor, MockEnvironment, MockGpio, MockMeasurementGroup, MockRegistry,
    MockTriggerGate,
};
use ald_sequencer::error::AldError;
use ald_sequencer::hooks::{CycleContext, CycleHook};
use ald_sequencer::init::init_pins;
use ald_sequencer::remote::RemoteCycleJob;
use ald_sequencer::runner::SequenceRunner;
use ald_sequencer::settings::Settings;

/// Hook recording the cycle index of every invocation.
struct RecordingHook {
    tag: &'static str,
    seen: Arc<Mutex<Vec<(&'static str, usize)>>>,
}

#[async_trait]
impl CycleHook for RecordingHook {
    fn name(&self) -> &str {
        self.tag
    }

    async fn run(&self, ctx: &CycleContext) -> Result<()> {
        self.seen
            .lock()
            .map_err(|_| anyhow::anyhow!("seen poisoned"))?
            .push((self.tag, ctx.cycle_nb));
        Ok(())
    }
}

/// Hook failing on every invocation.
struct FailingHook;

#[async_trait]
impl CycleHook for FailingHook {
    fn name(&self) -> &str {
        "failing"
    }

    async fn run(&self, _ctx: &CycleContext) -> Result<()> {
        Err(anyhow::anyhow!("beamline unreachable"))
    }
}

struct Rig {
    env: Arc<dyn Environment>,
    registry: Arc<dyn DeviceRegistry>,
    group: Arc<MockMeasurementGroup>,
    controller: Arc<MockController>,
}

/// Standard rig: controller with a configured file path, a measurement
/// group listing the given elements, and the given gates registered.
fn rig(elements: &[&'static str], gates: Vec<Arc<MockTriggerGate>>) -> Rig {
    let env = MockEnvironment::new()
        .with(ENV_TG_CONTROLLER, "ald_tg_ctrl")
        .with(ENV_MEAS_GROUP, "ald_mg");

    let controller = Arc::new(
        MockController::new("ald_tg_ctrl")
            .with_attribute("ConfigurationFile", "/tmp/ald_seq_conf.py"),
    );
    let group = Arc::new(MockMeasurementGroup::new("ald_mg", elements.iter().copied()));

    let mut registry = MockRegistry::new()
        .with_controller("ald_tg_ctrl", Arc::clone(&controller))
        .with_group("ald_mg", Arc::clone(&group));
    for gate in gates {
        let name = gate.name().to_string();
        registry = registry.with_gate(&name, gate);
    }

    Rig {
        env: Arc::new(env),
        registry: Arc::new(registry),
        group,
        controller,
    }
}

#[tokio::test]
async fn run_performs_exactly_repeats_acquisitions_and_hook_rounds() {
    let gate = Arc::new(MockTriggerGate::nominal("tg1"));
    let rig = rig(&["tg1"], vec![Arc::clone(&gate)]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut runner = SequenceRunner::new(
        Arc::clone(&rig.env),
        Arc::clone(&rig.registry),
        &Settings::default(),
    );
    runner.register_hook(Box::new(RecordingHook {
        tag: "a",
        seen: Arc::clone(&seen),
    }));

    runner.run(3, Duration::ZERO).await.unwrap();

    assert_eq!(rig.group.count_calls().await, 3);
    // Cycle index increases by one per iteration, starting at zero.
    assert_eq!(
        seen.lock().unwrap().clone(),
        vec![("a", 0), ("a", 1), ("a", 2)]
    );
    // One state poll per iteration, none for diagnostics.
    assert_eq!(gate.state_calls(), 3);
    assert_eq!(gate.status_calls(), 0);
}

#[tokio::test]
async fn hooks_run_in_registration_order_every_cycle() {
    let gate = Arc::new(MockTriggerGate::nominal("tg1"));
    let rig = rig(&["tg1"], vec![gate]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut runner = SequenceRunner::new(
        Arc::clone(&rig.env),
        Arc::clone(&rig.registry),
        &Settings::default(),
    );
    runner.register_hook(Box::new(RecordingHook {
        tag: "first",
        seen: Arc::clone(&seen),
    }));
    runner.register_hook(Box::new(RecordingHook {
        tag: "second",
        seen: Arc::clone(&seen),
    }));

    runner.run(2, Duration::ZERO).await.unwrap();

    assert_eq!(
        seen.lock().unwrap().clone(),
        vec![("first", 0), ("second", 0), ("first", 1), ("second", 1)]
    );
}

#[tokio::test]
async fn alarm_on_iteration_two_stops_the_run() {
    // Nominal on the first poll, faulted from the second poll onwards.
    let failing = Arc::new(
        MockTriggerGate::scripted("tg1", [GateState::On, GateState::Fault])
            .with_status("Interlock tripped"),
    );
    let healthy = Arc::new(MockTriggerGate::nominal("tg2"));
    let rig = rig(
        &["tg1", "tg2"],
        vec![Arc::clone(&failing), Arc::clone(&healthy)],
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut runner = SequenceRunner::new(
        Arc::clone(&rig.env),
        Arc::clone(&rig.registry),
        &Settings::default(),
    );
    runner.register_hook(Box::new(RecordingHook {
        tag: "a",
        seen: Arc::clone(&seen),
    }));

    let err = runner.run(5, Duration::ZERO).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AldError>(),
        Some(AldError::SequenceFailed)
    ));

    // Exactly two acquisitions and two hook rounds before the abort.
    assert_eq!(rig.group.count_calls().await, 2);
    assert_eq!(seen.lock().unwrap().len(), 2);

    // The diagnostic report covers every resolved gate, nominal ones
    // included.
    assert_eq!(failing.status_calls(), 1);
    assert_eq!(healthy.status_calls(), 1);
}

#[tokio::test]
async fn first_failing_gate_short_circuits_the_iteration_check() {
    let failing = Arc::new(MockTriggerGate::scripted("tg1", [GateState::Alarm]));
    let never_polled = Arc::new(MockTriggerGate::nominal("tg2"));
    let rig = rig(
        &["tg1", "tg2"],
        vec![Arc::clone(&failing), Arc::clone(&never_polled)],
    );

    let runner = SequenceRunner::new(
        Arc::clone(&rig.env),
        Arc::clone(&rig.registry),
        &Settings::default(),
    );
    let err = runner.run(1, Duration::ZERO).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AldError>(),
        Some(AldError::SequenceFailed)
    ));

    // tg1 trips the alarm, so the per-iteration check never reaches tg2;
    // its only state poll comes from the diagnostic report.
    assert_eq!(never_polled.state_calls(), 1);
    assert_eq!(never_polled.status_calls(), 1);
}

#[tokio::test]
async fn non_gate_elements_are_silently_skipped() {
    // timer01 is in the measurement group but is not a trigger gate.
    let gate = Arc::new(MockTriggerGate::nominal("tg1"));
    let rig = rig(&["tg1", "timer01"], vec![Arc::clone(&gate)]);

    let runner = SequenceRunner::new(
        Arc::clone(&rig.env),
        Arc::clone(&rig.registry),
        &Settings::default(),
    );
    runner.run(2, Duration::ZERO).await.unwrap();
    assert_eq!(rig.group.count_calls().await, 2);
    assert_eq!(gate.state_calls(), 2);
}

#[tokio::test]
async fn acquisition_uses_configured_count_time() {
    let gate = Arc::new(MockTriggerGate::nominal("tg1"));
    let rig = rig(&["tg1"], vec![gate]);

    let mut settings = Settings::default();
    settings.sequence.count_time_s = 0.25;
    let runner = SequenceRunner::new(Arc::clone(&rig.env), Arc::clone(&rig.registry), &settings);
    runner.run(1, Duration::ZERO).await.unwrap();

    assert_eq!(
        rig.group.count_durations().await,
        vec![Duration::from_millis(250)]
    );
}

#[tokio::test]
async fn missing_measurement_group_binding_fails_typed() {
    let env = MockEnvironment::new().with(ENV_TG_CONTROLLER, "ald_tg_ctrl");
    let registry = MockRegistry::new();

    let runner = SequenceRunner::new(
        Arc::new(env),
        Arc::new(registry),
        &Settings::default(),
    );
    let err = runner.run(1, Duration::ZERO).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AldError>(),
        Some(AldError::MissingBinding(key)) if key == ENV_MEAS_GROUP
    ));
}

#[tokio::test]
async fn hook_failure_aborts_without_gate_report() {
    let gate = Arc::new(MockTriggerGate::nominal("tg1"));
    let rig = rig(&["tg1"], vec![Arc::clone(&gate)]);

    let mut runner = SequenceRunner::new(
        Arc::clone(&rig.env),
        Arc::clone(&rig.registry),
        &Settings::default(),
    );
    runner.register_hook(Box::new(FailingHook));

    let err = runner.run(3, Duration::ZERO).await.unwrap_err();
    assert!(err.to_string().contains("beamline unreachable"));

    // One acquisition happened, then the hook failed; no alarm check and no
    // diagnostic report followed.
    assert_eq!(rig.group.count_calls().await, 1);
    assert_eq!(gate.state_calls(), 0);
    assert_eq!(gate.status_calls(), 0);
}

#[tokio::test]
async fn conf_roundtrip_through_controller_attribute() {
    let rig = rig(&[], vec![]);

    conf::set_conf(rig.env.as_ref(), rig.registry.as_ref(), "/data/ald/run42.py")
        .await
        .unwrap();
    let path = conf::get_conf(rig.env.as_ref(), rig.registry.as_ref())
        .await
        .unwrap();
    assert_eq!(path, "/data/ald/run42.py");
    assert_eq!(
        rig.controller
            .read_attribute("ConfigurationFile")
            .await
            .unwrap(),
        "/data/ald/run42.py"
    );
}

#[tokio::test]
async fn init_pins_sets_used_and_aux_axes_in_order() {
    let env = MockEnvironment::new().with(ENV_TG_CONTROLLER, "ald_tg_ctrl");
    let controller = Arc::new(
        MockController::new("ald_tg_ctrl")
            .with_property("device", "ald/gpio/1")
            .with_axes([1, 2]),
    );
    let gpio = Arc::new(MockGpio::new());
    let registry = MockRegistry::new()
        .with_controller("ald_tg_ctrl", controller)
        .with_gpio("ald/gpio/1", Arc::clone(&gpio));

    init_pins(
        &env,
        &registry,
        &Settings::default().hardware,
    )
    .await
    .unwrap();

    let expected: Vec<(String, bool)> = [1u32, 2, 13, 15, 16]
        .iter()
        .map(|axis| (format!("pin{axis}_output"), true))
        .collect();
    assert_eq!(gpio.writes().await, expected);
}

#[tokio::test]
async fn remote_cycle_job_sends_cycle_number_and_awaits_completion() {
    let env: Arc<dyn Environment> = Arc::new(
        MockEnvironment::new().with(ENV_REMOTE_DOOR, "beamline/door/01"),
    );
    let door = Arc::new(MockDoor::new("beamline/door/01"));
    let registry: Arc<dyn DeviceRegistry> = Arc::new(
        MockRegistry::new().with_door("beamline/door/01", Arc::clone(&door)),
    );

    let hook = RemoteCycleJob::new(env, registry);
    let ctx = CycleContext {
        cycle_nb: 4,
        repeats: 10,
    };
    hook.run(&ctx).await.unwrap();

    assert_eq!(
        door.invocations().await,
        vec![(
            "ald_post_cycle_job".to_string(),
            vec!["{\"cycle_nb\":4}".to_string()]
        )]
    );
}
