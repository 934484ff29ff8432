//! Scripted mock devices.
//!
//! Each mock implements one of the [`crate::core`] traits with in-memory
//! state and records the calls it receives, so tests can assert on
//! acquisition counts, GPIO writes, and remote macro invocations. Gate
//! states can be scripted as a sequence that plays out over successive
//! polls.

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::core::{
    Controller, DeviceRegistry, Door, Environment, GateState, Gpio, MeasurementGroup, TriggerGate,
};
use crate::error::AldError;

// =============================================================================
// Environment
// =============================================================================

/// In-memory environment store.
#[derive(Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `value`.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

impl Environment for MockEnvironment {
    fn get(&self, key: &str) -> Result<String> {
        self.vars
            .get(key)
            .cloned()
            .ok_or_else(|| AldError::MissingBinding(key.to_string()).into())
    }
}

// =============================================================================
// Trigger gate
// =============================================================================

/// Trigger gate whose state plays back a scripted sequence.
///
/// Each poll consumes one entry of the script until a single entry remains;
/// that final state then repeats forever. Polls of state and status are
/// counted for test assertions.
pub struct MockTriggerGate {
    name: String,
    status: String,
    states: Mutex<VecDeque<GateState>>,
    state_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl MockTriggerGate {
    /// Gate that stays nominal forever.
    pub fn nominal(name: &str) -> Self {
        Self::scripted(name, [GateState::On])
    }

    /// Gate whose state follows `states` over successive polls.
    pub fn scripted(name: &str, states: impl IntoIterator<Item = GateState>) -> Self {
        Self {
            name: name.to_string(),
            status: "The device is in its nominal state".to_string(),
            states: Mutex::new(states.into_iter().collect()),
            state_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Replace the free-text status line.
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    /// Number of times `state()` was polled.
    pub fn state_calls(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }

    /// Number of times `status()` was polled.
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TriggerGate for MockTriggerGate {
    fn name(&self) -> &str {
        &self.name
    }

    async fn state(&self) -> Result<GateState> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        let mut states = self.states.lock().await;
        let state = if states.len() > 1 {
            states.pop_front().unwrap_or(GateState::Unknown)
        } else {
            states.front().copied().unwrap_or(GateState::Unknown)
        };
        Ok(state)
    }

    async fn status(&self) -> Result<String> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.status.clone())
    }
}

// =============================================================================
// Measurement group
// =============================================================================

/// Measurement group recording every acquisition it performs.
pub struct MockMeasurementGroup {
    name: String,
    elements: Vec<String>,
    counts: Mutex<Vec<Duration>>,
}

impl MockMeasurementGroup {
    /// Group with the given ordered element names.
    pub fn new(name: &str, elements: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            name: name.to_string(),
            elements: elements.into_iter().map(str::to_string).collect(),
            counts: Mutex::new(Vec::new()),
        }
    }

    /// Number of acquisitions performed so far.
    pub async fn count_calls(&self) -> usize {
        self.counts.lock().await.len()
    }

    /// Durations of the acquisitions performed so far.
    pub async fn count_durations(&self) -> Vec<Duration> {
        self.counts.lock().await.clone()
    }
}

#[async_trait]
impl MeasurementGroup for MockMeasurementGroup {
    fn name(&self) -> &str {
        &self.name
    }

    async fn element_list(&self) -> Result<Vec<String>> {
        Ok(self.elements.clone())
    }

    async fn count(&self, integration: Duration) -> Result<()> {
        debug!("Mock acquisition on '{}' for {integration:?}", self.name);
        self.counts.lock().await.push(integration);
        Ok(())
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Trigger-gate controller with an in-memory attribute store.
pub struct MockController {
    name: String,
    attributes: Mutex<HashMap<String, String>>,
    properties: HashMap<String, String>,
    axes: Vec<u32>,
}

impl MockController {
    /// Controller with no attributes, properties, or axes.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Mutex::new(HashMap::new()),
            properties: HashMap::new(),
            axes: Vec::new(),
        }
    }

    /// Pre-set an attribute value.
    pub fn with_attribute(mut self, attr: &str, value: &str) -> Self {
        self.attributes
            .get_mut()
            .insert(attr.to_string(), value.to_string());
        self
    }

    /// Set a configuration property.
    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the axes in use.
    pub fn with_axes(mut self, axes: impl IntoIterator<Item = u32>) -> Self {
        self.axes = axes.into_iter().collect();
        self
    }
}

#[async_trait]
impl Controller for MockController {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_attribute(&self, attr: &str) -> Result<String> {
        self.attributes.lock().await.get(attr).cloned().ok_or_else(|| {
            AldError::device(&self.name, format!("no such attribute '{attr}'")).into()
        })
    }

    async fn write_attribute(&self, attr: &str, value: &str) -> Result<()> {
        self.attributes
            .lock()
            .await
            .insert(attr.to_string(), value.to_string());
        Ok(())
    }

    async fn used_axes(&self) -> Result<Vec<u32>> {
        Ok(self.axes.clone())
    }

    async fn property(&self, name: &str) -> Result<String> {
        self.properties.get(name).cloned().ok_or_else(|| {
            AldError::device(&self.name, format!("no such property '{name}'")).into()
        })
    }
}

// =============================================================================
// GPIO
// =============================================================================

/// GPIO device recording every pin write.
#[derive(Default)]
pub struct MockGpio {
    writes: Mutex<Vec<(String, bool)>>,
}

impl MockGpio {
    /// Create a GPIO device with no recorded writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin writes in the order they were received.
    pub async fn writes(&self) -> Vec<(String, bool)> {
        self.writes.lock().await.clone()
    }
}

#[async_trait]
impl Gpio for MockGpio {
    async fn write_pin(&self, attr: &str, value: bool) -> Result<()> {
        info!("Mock GPIO write {attr} = {value}");
        self.writes.lock().await.push((attr.to_string(), value));
        Ok(())
    }
}

// =============================================================================
// Door
// =============================================================================

/// Remote door recording every macro invocation.
pub struct MockDoor {
    name: String,
    invocations: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockDoor {
    /// Create a door with no recorded invocations.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Macro invocations in the order they were received.
    pub async fn invocations(&self) -> Vec<(String, Vec<String>)> {
        self.invocations.lock().await.clone()
    }
}

#[async_trait]
impl Door for MockDoor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_macro(&self, macro_name: &str, args: &[String]) -> Result<()> {
        debug!("Mock door '{}' running macro '{macro_name}'", self.name);
        self.invocations
            .lock()
            .await
            .push((macro_name.to_string(), args.to_vec()));
        Ok(())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Registry resolving names against fixed maps of mock devices.
#[derive(Default)]
pub struct MockRegistry {
    controllers: HashMap<String, Arc<MockController>>,
    groups: HashMap<String, Arc<MockMeasurementGroup>>,
    gates: HashMap<String, Arc<MockTriggerGate>>,
    gpios: HashMap<String, Arc<MockGpio>>,
    doors: HashMap<String, Arc<MockDoor>>,
}

impl MockRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller.
    pub fn with_controller(mut self, name: &str, ctrl: Arc<MockController>) -> Self {
        self.controllers.insert(name.to_string(), ctrl);
        self
    }

    /// Register a measurement group.
    pub fn with_group(mut self, name: &str, group: Arc<MockMeasurementGroup>) -> Self {
        self.groups.insert(name.to_string(), group);
        self
    }

    /// Register a trigger gate.
    pub fn with_gate(mut self, name: &str, gate: Arc<MockTriggerGate>) -> Self {
        self.gates.insert(name.to_string(), gate);
        self
    }

    /// Register a GPIO device.
    pub fn with_gpio(mut self, name: &str, gpio: Arc<MockGpio>) -> Self {
        self.gpios.insert(name.to_string(), gpio);
        self
    }

    /// Register a remote door.
    pub fn with_door(mut self, name: &str, door: Arc<MockDoor>) -> Self {
        self.doors.insert(name.to_string(), door);
        self
    }
}

#[async_trait]
impl DeviceRegistry for MockRegistry {
    async fn controller(&self, name: &str) -> Result<Arc<dyn Controller>> {
        let ctrl = self
            .controllers
            .get(name)
            .cloned()
            .ok_or_else(|| AldError::device(name, "no such controller"))?;
        Ok(ctrl)
    }

    async fn measurement_group(&self, name: &str) -> Result<Arc<dyn MeasurementGroup>> {
        let group = self
            .groups
            .get(name)
            .cloned()
            .ok_or_else(|| AldError::device(name, "no such measurement group"))?;
        Ok(group)
    }

    async fn trigger_gate(&self, name: &str) -> Option<Arc<dyn TriggerGate>> {
        self.gates
            .get(name)
            .cloned()
            .map(|gate| gate as Arc<dyn TriggerGate>)
    }

    async fn gpio(&self, name: &str) -> Result<Arc<dyn Gpio>> {
        let gpio = self
            .gpios
            .get(name)
            .cloned()
            .ok_or_else(|| AldError::device(name, "no such GPIO device"))?;
        Ok(gpio)
    }

    async fn door(&self, name: &str) -> Result<Arc<dyn Door>> {
        let door = self
            .doors
            .get(name)
            .cloned()
            .ok_or_else(|| AldError::device(name, "no such door"))?;
        Ok(door)
    }
}
