//! `FlowProcessor`: moves batches of material at a constant rate.

use anyhow::bail;

use crate::integrator::Integrator;
use crate::simulation::SimulationContext;

use crate::device::behavior::ProcessBehavior;

/// Processes `batches` batches of `batch_size` units each at `rate`
/// units per second.
///
/// Each step moves what is left of the current batch, so its duration is
/// `remaining / rate`. Processed quantity is integrated over working time
/// by an [`Integrator`] and tracks elapsed time exactly across
/// interruptions.
#[derive(Debug, Clone)]
pub struct FlowProcessor {
    pub rate: f64,
    pub batch_size: f64,
    pub batches: u64,
    pub remaining_batches: u64,
    pub completed_batches: u64,
    /// Quantity left in the current batch.
    pub remaining: f64,
    working_time: f64,
    processed: Integrator,
}

impl FlowProcessor {
    pub fn new(batches: u64, batch_size: f64, rate: f64) -> Self {
        FlowProcessor {
            rate,
            batch_size,
            batches,
            remaining_batches: batches,
            completed_batches: 0,
            remaining: 0.0,
            working_time: 0.0,
            processed: Integrator::new(0.0),
        }
    }

    /// Total quantity processed so far.
    pub fn processed(&self) -> f64 {
        self.processed.value()
    }

    /// Total seconds spent processing.
    pub fn working_time(&self) -> f64 {
        self.working_time
    }
}

impl ProcessBehavior for FlowProcessor {
    fn start_processing(&mut self, _ctx: &mut SimulationContext) -> anyhow::Result<bool> {
        if self.remaining_batches == 0 {
            return Ok(false);
        }
        self.remaining = self.batch_size;
        Ok(true)
    }

    fn step_duration(&mut self, _ctx: &mut SimulationContext) -> anyhow::Result<f64> {
        if self.rate < 0.0 {
            bail!("flow rate must not be negative, got {}", self.rate);
        }
        Ok(self.remaining / self.rate)
    }

    fn update_progress(&mut self, dt: f64) -> anyhow::Result<()> {
        self.working_time += dt;
        self.processed.update(self.working_time, self.rate);
        self.remaining -= self.rate * dt;
        Ok(())
    }

    fn process_step(&mut self, _ctx: &mut SimulationContext) -> anyhow::Result<bool> {
        self.remaining_batches = self.remaining_batches.saturating_sub(1);
        self.completed_batches += 1;
        self.remaining = 0.0;
        Ok(true)
    }

    fn early_init(&mut self) {
        self.remaining_batches = self.batches;
        self.completed_batches = 0;
        self.remaining = 0.0;
        self.working_time = 0.0;
        self.processed.early_init();
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
