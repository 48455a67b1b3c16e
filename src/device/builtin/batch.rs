//! `BatchServer`: serves a fixed number of units, one per step.

use crate::event::ProcessTarget;
use crate::simulation::SimulationContext;

use crate::device::behavior::ProcessBehavior;
use crate::device::id::DeviceId;

/// Serves `units` units with a fixed service time each.
///
/// A unit cut short by an interruption resumes its remaining time; a new
/// unit starts only after a full completion. Every state change wakes the
/// devices listed in `notify` with a debounced re-evaluation.
#[derive(Debug, Clone)]
pub struct BatchServer {
    pub service_time: f64,
    pub units: u64,
    pub remaining_units: u64,
    pub completed: u64,
    /// Seconds of service delivered, including partial units.
    pub work_done: f64,
    /// Number of times the device formally stopped.
    pub stops: u64,
    pub notify: Vec<DeviceId>,
}

impl BatchServer {
    pub fn new(units: u64, service_time: f64) -> Self {
        BatchServer {
            service_time,
            units,
            remaining_units: units,
            completed: 0,
            work_done: 0.0,
            stops: 0,
            notify: Vec::new(),
        }
    }

    /// Wake `device` whenever this server changes state.
    pub fn notifying(mut self, device: DeviceId) -> Self {
        self.notify.push(device);
        self
    }
}

impl ProcessBehavior for BatchServer {
    fn start_processing(&mut self, _ctx: &mut SimulationContext) -> anyhow::Result<bool> {
        Ok(self.remaining_units > 0)
    }

    fn step_duration(&mut self, _ctx: &mut SimulationContext) -> anyhow::Result<f64> {
        Ok(self.service_time)
    }

    fn update_progress(&mut self, dt: f64) -> anyhow::Result<()> {
        self.work_done += dt;
        Ok(())
    }

    fn process_step(&mut self, _ctx: &mut SimulationContext) -> anyhow::Result<bool> {
        self.remaining_units = self.remaining_units.saturating_sub(1);
        self.completed += 1;
        Ok(true)
    }

    fn process_changed(&mut self, ctx: &mut SimulationContext) -> anyhow::Result<()> {
        for &device in &self.notify {
            ctx.schedule_after(0, ProcessTarget::PerformUnscheduledUpdate { device })?;
        }
        Ok(())
    }

    fn set_process_stopped(&mut self, _ctx: &mut SimulationContext) -> anyhow::Result<()> {
        self.stops += 1;
        Ok(())
    }

    fn early_init(&mut self) {
        self.remaining_units = self.units;
        self.completed = 0;
        self.work_done = 0.0;
        self.stops = 0;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
