//! `ProcessBehavior`: the per-kind hooks a [`Device`](super::Device) calls
//! through.

use crate::simulation::SimulationContext;

// ── ProcessBehavior ───────────────────────────────────────────────────

/// What a concrete device kind computes for each step.
///
/// The device owns the step bookkeeping (busy flag, remaining duration,
/// completion event) and calls these hooks at the matching points of the
/// state machine. Hooks that touch the model receive the simulation
/// context and may schedule follow-up events, which is how a device
/// notifies the devices that depend on it.
///
/// # Contract
///
/// Implementations **must**:
/// - Be deterministic for equal inputs.
/// - Route all side effects on other devices through `ctx`.
/// - Return an error instead of panicking; the device adds its id and the
///   failing operation before the run halts.
///
/// # Example
///
/// ```rust
/// use procsim::device::ProcessBehavior;
/// use procsim::simulation::SimulationContext;
///
/// struct Oven { bakes_left: u32 }
///
/// impl ProcessBehavior for Oven {
///     fn start_processing(&mut self, _ctx: &mut SimulationContext) -> anyhow::Result<bool> {
///         Ok(self.bakes_left > 0)
///     }
///     fn step_duration(&mut self, _ctx: &mut SimulationContext) -> anyhow::Result<f64> {
///         Ok(600.0)
///     }
///     fn process_step(&mut self, _ctx: &mut SimulationContext) -> anyhow::Result<bool> {
///         self.bakes_left -= 1;
///         Ok(true)
///     }
///     fn as_any(&self) -> &dyn std::any::Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
/// }
/// ```
pub trait ProcessBehavior {
    /// Begin a new step. Returning `false` declines it and the device stops.
    fn start_processing(&mut self, ctx: &mut SimulationContext) -> anyhow::Result<bool>;

    /// Full duration in seconds of the step just started.
    fn step_duration(&mut self, ctx: &mut SimulationContext) -> anyhow::Result<f64>;

    /// Apply `dt` seconds of elapsed work.
    fn update_progress(&mut self, _dt: f64) -> anyhow::Result<()> {
        Ok(())
    }

    /// The step ran to completion. Returning `false` stops the chain: the
    /// device does not try to start another step.
    fn process_step(&mut self, ctx: &mut SimulationContext) -> anyhow::Result<bool>;

    /// The device's state changed; notify dependents.
    fn process_changed(&mut self, _ctx: &mut SimulationContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Whether the next step starts fresh given how the last one ended.
    ///
    /// The default restarts only after a full completion, so a cut-short
    /// step resumes its remaining duration.
    fn is_new_step_reqd(&self, completed: bool) -> bool {
        completed
    }

    /// The device has formally stopped.
    fn set_process_stopped(&mut self, _ctx: &mut SimulationContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Reset to the start-of-run state.
    fn early_init(&mut self) {}

    /// Downcast support, required for `Device::behavior::<T>()`.
    fn as_any(&self) -> &dyn std::any::Any;
    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
