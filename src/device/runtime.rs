//! `DeviceRuntime`: owns all devices and dispatches events to them.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::event::{Event, ProcessTarget};
use crate::simulation::{EventHandler, SimulationContext, DEFAULT_PRIORITY};

use super::behavior::ProcessBehavior;
use super::downtime::Downtime;
use super::id::DeviceId;
use super::machine::Device;
use super::trace::TraceEntry;

/// Manages a set of devices and dispatches process targets to them.
///
/// Implements [`EventHandler`] so it can be passed directly to
/// [`Simulation::run`](crate::simulation::Simulation::run). `Noop` and
/// `Log` targets reach no device.
///
/// The runtime is also a minimal downtime controller. A `RequestDowntime`
/// latches the request on the device and queues it; after every dispatch
/// each queued downtime whose device can start it begins, with its
/// `EndDowntime` scheduled after the downtime's duration.
pub struct DeviceRuntime {
    pub(crate) devices: BTreeMap<DeviceId, Device>,
    pending_downtimes: Vec<(DeviceId, Downtime)>,
    trace_devices: bool,
    /// Append-only trace of device entry points, when tracing is enabled.
    pub trace: Vec<TraceEntry>,
}

impl DeviceRuntime {
    /// Create a runtime with tracing off.
    pub fn new() -> Self {
        DeviceRuntime {
            devices: BTreeMap::new(),
            pending_downtimes: Vec::new(),
            trace_devices: false,
            trace: Vec::new(),
        }
    }

    /// Create a runtime that honors `config.trace_devices`.
    pub fn from_config(config: &SimConfig) -> Self {
        DeviceRuntime {
            trace_devices: config.trace_devices,
            ..Self::new()
        }
    }

    /// Register a device. Fails if its id is taken.
    pub fn register(&mut self, mut device: Device) -> SimResult<()> {
        let id = device.id();
        if self.devices.contains_key(&id) {
            return Err(SimError::DeviceAlreadyRegistered(id));
        }
        if self.trace_devices {
            device.set_tracing(true);
        }
        debug!(device = %id, name = device.name(), "device registered");
        self.devices.insert(id, device);
        Ok(())
    }

    /// Number of registered devices.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// All registered device IDs in sorted order.
    pub fn all_device_ids(&self) -> Vec<DeviceId> {
        self.devices.keys().copied().collect()
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.get_mut(&id)
    }

    /// Downcast a device's behavior for inspection.
    ///
    /// Returns `None` if the device is not registered or has a wrong type.
    pub fn behavior<T: ProcessBehavior + 'static>(&self, id: DeviceId) -> Option<&T> {
        self.devices.get(&id)?.behavior::<T>()
    }

    /// Downcast a device's behavior mutably.
    pub fn behavior_mut<T: ProcessBehavior + 'static>(&mut self, id: DeviceId) -> Option<&mut T> {
        self.devices.get_mut(&id)?.behavior_mut::<T>()
    }

    /// Downtime requests waiting for their device to go idle.
    pub fn pending_downtimes(&self) -> &[(DeviceId, Downtime)] {
        &self.pending_downtimes
    }

    /// Reset every device and drop queued downtime requests and the trace.
    pub fn early_init(&mut self) {
        for device in self.devices.values_mut() {
            device.early_init();
        }
        self.pending_downtimes.clear();
        self.trace.clear();
    }

    fn dispatch(&mut self, ctx: &mut SimulationContext, target: &ProcessTarget) -> SimResult<()> {
        let Some(id) = target.device() else {
            if let ProcessTarget::Log(msg) = target {
                info!(now = %ctx.now(), "{msg}");
            }
            return Ok(());
        };
        let device = self.devices.get_mut(&id).ok_or(SimError::DeviceNotFound(id))?;

        match target {
            ProcessTarget::StartStep { .. } => device.start_step(ctx),
            ProcessTarget::EndStep { .. } => device.end_step(ctx),
            ProcessTarget::UnscheduledUpdate { .. } => device.unscheduled_update(ctx),
            ProcessTarget::PerformUnscheduledUpdate { .. } => device.perform_unscheduled_update(ctx),
            ProcessTarget::ResetProcess { .. } => device.reset_process(ctx),
            ProcessTarget::SetThreshold {
                threshold, open, ..
            } => device.set_threshold(ctx, threshold, *open),
            ProcessTarget::RequestDowntime { downtime, .. } => {
                device.prepare_for_downtime(ctx, downtime)?;
                self.pending_downtimes.push((id, downtime.clone()));
                Ok(())
            }
            ProcessTarget::EndDowntime { downtime, .. } => {
                device.end_downtime(ctx, *downtime)?;
                // Requests still queued for this device latch against the
                // resumed step.
                for (_, waiting) in self.pending_downtimes.iter().filter(|(d, _)| *d == id) {
                    device.prepare_for_downtime(ctx, waiting)?;
                }
                Ok(())
            }
            ProcessTarget::Noop | ProcessTarget::Log(_) => Ok(()),
        }
    }

    /// Start every queued downtime whose device can take it, in request
    /// order.
    fn start_ready_downtimes(&mut self, ctx: &mut SimulationContext) -> SimResult<()> {
        let mut i = 0;
        while i < self.pending_downtimes.len() {
            let id = self.pending_downtimes[i].0;
            let device = self.devices.get_mut(&id).ok_or(SimError::DeviceNotFound(id))?;
            if !device.can_start_downtime(&self.pending_downtimes[i].1) {
                i += 1;
                continue;
            }

            let (id, downtime) = self.pending_downtimes.remove(i);
            if downtime.duration.is_nan() || downtime.duration == f64::INFINITY {
                return Err(SimError::InvalidDuration {
                    device: id,
                    operation: "start_downtime",
                    duration: downtime.duration,
                });
            }
            let ticks = ctx.resolution().secs_to_nearest_tick(downtime.duration);
            let delay = u64::try_from(ticks).map_err(|_| SimError::NegativeDuration {
                device: id,
                operation: "start_downtime",
                duration: downtime.duration,
            })?;

            device.start_downtime(ctx, &downtime);
            ctx.schedule_ticks(
                delay,
                DEFAULT_PRIORITY,
                true,
                ProcessTarget::EndDowntime {
                    device: id,
                    downtime: downtime.id,
                },
                None,
            )?;
        }
        Ok(())
    }

    fn collect_trace(&mut self) {
        if !self.trace_devices {
            return;
        }
        for device in self.devices.values_mut() {
            self.trace.extend(device.take_trace());
        }
    }
}

impl Default for DeviceRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for DeviceRuntime {
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event) -> SimResult<()> {
        let dispatched = self.dispatch(ctx, &event.target);
        self.collect_trace();
        dispatched?;
        self.start_ready_downtimes(ctx)?;
        self.collect_trace();
        Ok(())
    }
}
