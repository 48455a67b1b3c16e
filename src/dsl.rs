/// Fluent builder for simulation setup.
///
/// Hides the boilerplate of creating a simulation, registering devices
/// and seeding external events, while keeping the result deterministic:
/// events are seeded in the order they were added.

use crate::config::SimConfig;
use crate::device::{
    BatchServer, ClosureKind, Device, DeviceId, DeviceRuntime, Downtime, DowntimeId, DowntimeKind,
    DowntimePolicy, FlowProcessor, ProcessBehavior,
};
use crate::error::{SimError, SimResult};
use crate::event::ProcessTarget;
use crate::simulation::Simulation;

// ── SimulationBuilder ─────────────────────────────────────────────────

/// Fluent builder for a `Simulation` + `DeviceRuntime` pair.
///
/// Event times are simulation seconds.
///
/// # Example
/// ```rust
/// use procsim::dsl::SimulationBuilder;
/// use procsim::device::{ClosureKind, DowntimePolicy};
///
/// let (sim, rt, processed) = SimulationBuilder::new()
///     .with_event_log()
///     .batch_server(1, "press", 3, 10.0)
///     .threshold(1, "door", ClosureKind::Immediate)
///     .start(1, 0.0)
///     .close(1, "door", 4.0)
///     .open(1, "door", 20.0)
///     .maintenance(1, 1, DowntimePolicy::Forced, 5.0, 25.0)
///     .run()
///     .unwrap();
/// assert!(processed > 0);
/// ```
pub struct SimulationBuilder {
    config: SimConfig,
    devices: Vec<Device>,
    events: Vec<(f64, ProcessTarget)>,
    error: Option<SimError>,
}

impl SimulationBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        SimulationBuilder {
            config: SimConfig::default(),
            devices: Vec::new(),
            events: Vec::new(),
            error: None,
        }
    }

    // ── Config ────────────────────────────────────────────────

    /// Replace the whole configuration.
    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the clock resolution.
    pub fn ticks_per_second(mut self, ticks_per_second: f64) -> Self {
        self.config.ticks_per_second = ticks_per_second;
        self
    }

    /// Record fired events.
    pub fn with_event_log(mut self) -> Self {
        self.config.record_events = true;
        self
    }

    /// Trace every device entry point.
    pub fn with_device_trace(mut self) -> Self {
        self.config.trace_devices = true;
        self
    }

    // ── Devices ───────────────────────────────────────────────

    /// Register a fully built device.
    pub fn device(mut self, device: Device) -> Self {
        self.devices.push(device);
        self
    }

    /// Register a device with a custom behavior.
    pub fn behavior(self, id: u64, name: &str, behavior: impl ProcessBehavior + 'static) -> Self {
        self.device(Device::new(DeviceId::new(id), name, behavior))
    }

    /// Register a `BatchServer`.
    pub fn batch_server(self, id: u64, name: &str, units: u64, service_time: f64) -> Self {
        self.behavior(id, name, BatchServer::new(units, service_time))
    }

    /// Register a `FlowProcessor`.
    pub fn flow_processor(self, id: u64, name: &str, batches: u64, batch_size: f64, rate: f64) -> Self {
        self.behavior(id, name, FlowProcessor::new(batches, batch_size, rate))
    }

    /// Declare a threshold on an already added device. An unknown id makes
    /// `build` fail with [`SimError::DeviceNotFound`].
    pub fn threshold(mut self, id: u64, name: &str, kind: ClosureKind) -> Self {
        let id = DeviceId::new(id);
        match self.devices.iter_mut().rev().find(|d| d.id() == id) {
            Some(device) => device.declare_threshold(name, kind),
            None => {
                self.error.get_or_insert(SimError::DeviceNotFound(id));
            }
        }
        self
    }

    // ── Events ────────────────────────────────────────────────

    /// Schedule a raw target at `at` seconds.
    pub fn event(mut self, at: f64, target: ProcessTarget) -> Self {
        self.events.push((at, target));
        self
    }

    /// Kick a device into its first step.
    pub fn start(self, id: u64, at: f64) -> Self {
        self.event(at, ProcessTarget::StartStep { device: DeviceId::new(id) })
    }

    /// Close a threshold.
    pub fn close(self, id: u64, threshold: &str, at: f64) -> Self {
        self.set_threshold(id, threshold, false, at)
    }

    /// Open a threshold.
    pub fn open(self, id: u64, threshold: &str, at: f64) -> Self {
        self.set_threshold(id, threshold, true, at)
    }

    fn set_threshold(self, id: u64, threshold: &str, open: bool, at: f64) -> Self {
        self.event(
            at,
            ProcessTarget::SetThreshold {
                device: DeviceId::new(id),
                threshold: threshold.into(),
                open,
            },
        )
    }

    /// Request a maintenance downtime.
    pub fn maintenance(self, id: u64, downtime: u64, policy: DowntimePolicy, duration: f64, at: f64) -> Self {
        self.downtime(id, DowntimeKind::Maintenance, downtime, policy, duration, at)
    }

    /// Request a breakdown downtime.
    pub fn breakdown(self, id: u64, downtime: u64, policy: DowntimePolicy, duration: f64, at: f64) -> Self {
        self.downtime(id, DowntimeKind::Breakdown, downtime, policy, duration, at)
    }

    fn downtime(
        self,
        id: u64,
        kind: DowntimeKind,
        downtime: u64,
        policy: DowntimePolicy,
        duration: f64,
        at: f64,
    ) -> Self {
        self.event(
            at,
            ProcessTarget::RequestDowntime {
                device: DeviceId::new(id),
                downtime: Downtime::new(DowntimeId::new(downtime), kind, policy, duration),
            },
        )
    }

    /// Abandon a device's step and recompute it.
    pub fn reset_process(self, id: u64, at: f64) -> Self {
        self.event(at, ProcessTarget::ResetProcess { device: DeviceId::new(id) })
    }

    // ── Build ─────────────────────────────────────────────────

    /// Build and return `(Simulation, DeviceRuntime)`.
    ///
    /// Fails on a threshold declared for an unknown device, an invalid
    /// configuration, a duplicate device id or an invalid event time.
    pub fn build(self) -> SimResult<(Simulation, DeviceRuntime)> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut sim = Simulation::with_config(self.config.clone())?;
        let mut rt = DeviceRuntime::from_config(&self.config);

        for device in self.devices {
            rt.register(device)?;
        }
        rt.early_init();

        for (at, target) in self.events {
            sim.schedule_at_secs(at, target)?;
        }

        Ok((sim, rt))
    }

    /// Build, run to completion, return `(Simulation, DeviceRuntime, u64)`.
    /// The `u64` is the number of events processed.
    pub fn run(self) -> SimResult<(Simulation, DeviceRuntime, u64)> {
        let (mut sim, mut rt) = self.build()?;
        let n = sim.run(&mut rt)?;
        Ok((sim, rt, n))
    }
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceState;
    use crate::time::Tick;

    #[test]
    fn test_builder_basic() {
        let (mut sim, mut rt) = SimulationBuilder::new()
            .batch_server(1, "press", 2, 5.0)
            .start(1, 0.0)
            .build()
            .unwrap();

        sim.run(&mut rt).unwrap();

        let server = rt.behavior::<BatchServer>(DeviceId::new(1)).unwrap();
        assert_eq!(server.completed, 2);
        assert_eq!(sim.current_time(), Tick::new(10_000_000));
    }

    #[test]
    fn test_builder_threshold_pause() {
        let (sim, rt, n) = SimulationBuilder::new()
            .with_event_log()
            .batch_server(1, "press", 1, 10.0)
            .threshold(1, "door", ClosureKind::Immediate)
            .start(1, 0.0)
            .close(1, "door", 4.0)
            .open(1, "door", 20.0)
            .run()
            .unwrap();

        assert!(n > 0);
        assert_eq!(sim.event_log().unwrap().len() as u64, n);
        assert_eq!(sim.now_secs(), 26.0);
        let dev = rt.device(DeviceId::new(1)).unwrap();
        assert_eq!(dev.thresholds().len(), 1);
        assert_eq!(dev.state_times().total(DeviceState::Stopped, 26.0), 16.0);
    }

    #[test]
    fn test_builder_downtime() {
        let (sim, rt, _) = SimulationBuilder::new()
            .batch_server(1, "press", 2, 10.0)
            .start(1, 0.0)
            .breakdown(1, 1, DowntimePolicy::Immediate, 5.0, 3.0)
            .run()
            .unwrap();

        assert_eq!(sim.now_secs(), 25.0);
        let dev = rt.device(DeviceId::new(1)).unwrap();
        assert_eq!(dev.state_times().total(DeviceState::Breakdown, 25.0), 5.0);
    }

    #[test]
    fn test_builder_flow_processor_with_trace() {
        let (_, rt, _) = SimulationBuilder::new()
            .with_device_trace()
            .flow_processor(3, "pump", 2, 10.0, 2.5)
            .start(3, 1.0)
            .run()
            .unwrap();

        let flow = rt.behavior::<FlowProcessor>(DeviceId::new(3)).unwrap();
        assert_eq!(flow.processed(), 20.0);
        assert!(!rt.trace.is_empty());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let err = SimulationBuilder::new()
            .ticks_per_second(0.0)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn test_builder_rejects_duplicate_device() {
        let err = SimulationBuilder::new()
            .batch_server(1, "a", 1, 1.0)
            .batch_server(1, "b", 1, 1.0)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::DeviceAlreadyRegistered(_)));
    }

    #[test]
    fn test_builder_rejects_threshold_on_unknown_device() {
        let err = SimulationBuilder::new()
            .threshold(9, "door", ClosureKind::Normal)
            .batch_server(1, "a", 1, 1.0)
            .threshold(1, "gate", ClosureKind::Immediate)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::DeviceNotFound(id) if id == DeviceId::new(9)));
    }

    #[test]
    fn test_builder_rejects_negative_time() {
        let err = SimulationBuilder::new()
            .batch_server(1, "a", 1, 1.0)
            .start(1, -1.0)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::InvalidTime(_)));
    }
}
