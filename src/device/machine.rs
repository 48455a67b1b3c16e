//! `Device`: the per-entity process-step controller.
//!
//! A device runs one step at a time. Starting a step asks the behavior for
//! its duration and schedules an `EndStep` on the device's completion
//! handle; the completion reconciles elapsed time and chains into the next
//! step. Threshold closures and downtime requests interrupt the chain
//! through zero-delay reschedules of that same handle, never through
//! direct recursion.

use tracing::{debug, info, trace, warn};

use crate::error::{SimError, SimResult};
use crate::event::{Priority, ProcessTarget};
use crate::handle::EventHandle;
use crate::simulation::SimulationContext;
use crate::time::Tick;

use super::behavior::ProcessBehavior;
use super::downtime::{Downtime, DowntimeId, DowntimeKind};
use super::id::DeviceId;
use super::state::{DeviceState, StateTimes};
use super::threshold::{ClosureKind, ThresholdSet};
use super::trace::{TraceEntry, TraceFlags, TraceOp};

/// Priority of step-completion events.
pub const STEP_COMPLETION_PRIORITY: Priority = 5;
/// Priority of debounced re-evaluation requests. Runs after completions
/// due at the same tick.
pub const UNSCHEDULED_UPDATE_PRIORITY: Priority = 10;

fn behavior_err(device: DeviceId, operation: &'static str) -> impl FnOnce(anyhow::Error) -> SimError {
    move |source| SimError::Behavior {
        device,
        operation,
        source,
    }
}

/// A simulated resource that processes work one step at a time.
pub struct Device {
    id: DeviceId,
    name: String,

    // Step bookkeeping
    last_update_time: f64,
    duration: f64,
    end_tick: Tick,
    forced_downtime_pending: bool,
    immediate_downtime_pending: bool,
    step_completed: bool,
    busy: bool,

    end_step_handle: EventHandle,
    unscheduled_update_handle: EventHandle,

    thresholds: ThresholdSet,
    downtimes: Vec<(DowntimeId, DowntimeKind)>,
    state: StateTimes,
    trace: Option<Vec<TraceEntry>>,

    behavior: Box<dyn ProcessBehavior>,
}

impl Device {
    /// Create a device in its start-of-run state.
    pub fn new(id: DeviceId, name: impl Into<String>, behavior: impl ProcessBehavior + 'static) -> Self {
        Device {
            id,
            name: name.into(),
            last_update_time: 0.0,
            duration: 0.0,
            end_tick: Tick::ZERO,
            forced_downtime_pending: false,
            immediate_downtime_pending: false,
            step_completed: true,
            busy: false,
            end_step_handle: EventHandle::new(),
            unscheduled_update_handle: EventHandle::new(),
            thresholds: ThresholdSet::new(),
            downtimes: Vec::new(),
            state: StateTimes::new(),
            trace: None,
            behavior: Box::new(behavior),
        }
    }

    /// Declare a threshold this device observes.
    pub fn with_threshold(mut self, name: impl Into<String>, kind: ClosureKind) -> Self {
        self.declare_threshold(name, kind);
        self
    }

    pub fn declare_threshold(&mut self, name: impl Into<String>, kind: ClosureKind) {
        self.thresholds.declare(name, kind);
    }

    /// Record a [`TraceEntry`] for every entry point.
    pub fn with_trace(mut self) -> Self {
        self.set_tracing(true);
        self
    }

    pub(crate) fn set_tracing(&mut self, on: bool) {
        match (on, self.trace.is_some()) {
            (true, false) => self.trace = Some(Vec::new()),
            (false, true) => self.trace = None,
            _ => {}
        }
    }

    /// Remove and return the trace recorded so far.
    pub(crate) fn take_trace(&mut self) -> Vec<TraceEntry> {
        self.trace.as_mut().map(std::mem::take).unwrap_or_default()
    }

    // ── State machine ─────────────────────────────────────────────────

    /// Try to make progress.
    ///
    /// No-op while a step is in flight. Stops the device if it is
    /// unavailable or a latched downtime is waiting; otherwise starts (or
    /// resumes) a step and schedules its completion.
    pub fn start_step(&mut self, ctx: &mut SimulationContext) -> SimResult<()> {
        self.record(ctx, TraceOp::StartStep);
        if self.end_step_handle.is_scheduled() {
            trace!(device = %self.id, "start_step: already stepping");
            return Ok(());
        }

        if !self.is_available() || self.is_ready_for_downtime() {
            debug!(
                device = %self.id,
                available = self.is_available(),
                forced = self.forced_downtime_pending,
                immediate = self.immediate_downtime_pending,
                "start_step: admission refused"
            );
            self.forced_downtime_pending = false;
            self.immediate_downtime_pending = false;
            return self.stop_processing(ctx);
        }

        self.busy = true;
        self.last_update_time = ctx.now_secs();

        let new_step = self.behavior.is_new_step_reqd(self.step_completed);
        if new_step {
            let started = self
                .behavior
                .start_processing(ctx)
                .map_err(behavior_err(self.id, "start_processing"))?;
            if !started {
                return self.stop_processing(ctx);
            }
            self.duration = self
                .behavior
                .step_duration(ctx)
                .map_err(behavior_err(self.id, "step_duration"))?;
        }

        let delay = self.duration_ticks(ctx, "start_step")?;
        if delay > 0 {
            self.set_present_state(ctx);
        }

        self.step_completed = false;
        self.end_tick = ctx.now().plus(delay).ok_or(SimError::TickOverflow {
            now: ctx.now(),
            delay,
        })?;
        ctx.schedule_ticks(
            delay,
            STEP_COMPLETION_PRIORITY,
            true,
            ProcessTarget::EndStep { device: self.id },
            Some(&self.end_step_handle),
        )?;
        debug!(
            device = %self.id,
            new_step,
            duration = self.duration,
            end = %self.end_tick,
            "step scheduled"
        );

        if new_step {
            self.behavior
                .process_changed(ctx)
                .map_err(behavior_err(self.id, "process_changed"))?;
        }
        Ok(())
    }

    /// Completion of the scheduled step (or of a forced re-evaluation).
    pub fn end_step(&mut self, ctx: &mut SimulationContext) -> SimResult<()> {
        self.record(ctx, TraceOp::EndStep);
        self.update_progress(ctx)?;

        if ctx.now() == self.end_tick || self.thresholds.is_immediate_release_closure() {
            self.step_completed = true;
            let proceed = self
                .behavior
                .process_step(ctx)
                .map_err(behavior_err(self.id, "process_step"))?;
            debug!(device = %self.id, proceed, "step completed");
            if !proceed {
                return Ok(());
            }
        }
        self.start_step(ctx)
    }

    /// Charge the time elapsed since the last update to the step in
    /// flight, then re-baseline.
    pub fn update_progress(&mut self, ctx: &mut SimulationContext) -> SimResult<()> {
        self.record(ctx, TraceOp::UpdateProgress);
        let now = ctx.now_secs();
        if self.busy {
            let dt = now - self.last_update_time;
            self.duration -= dt;
            trace!(device = %self.id, dt, remaining = self.duration, "progress");
            self.behavior
                .update_progress(dt)
                .map_err(behavior_err(self.id, "update_progress"))?;
        }
        self.last_update_time = now;
        Ok(())
    }

    fn stop_processing(&mut self, ctx: &mut SimulationContext) -> SimResult<()> {
        self.record(ctx, TraceOp::StopProcessing);
        self.busy = false;
        self.set_present_state(ctx);
        debug!(device = %self.id, state = %self.present_state(), "processing stopped");
        self.behavior
            .process_changed(ctx)
            .map_err(behavior_err(self.id, "process_changed"))?;
        self.behavior
            .set_process_stopped(ctx)
            .map_err(behavior_err(self.id, "set_process_stopped"))
    }

    /// Re-evaluate now: pull the pending completion forward to the current
    /// tick, or try to resume if stopped.
    pub fn unscheduled_update(&mut self, ctx: &mut SimulationContext) -> SimResult<()> {
        self.record(ctx, TraceOp::UnscheduledUpdate);
        if self.end_step_handle.is_scheduled() {
            self.reschedule_end_step_now(ctx)
        } else {
            self.start_step(ctx)
        }
    }

    /// Request an `unscheduled_update` at the current tick, unless one is
    /// already pending.
    pub fn perform_unscheduled_update(&mut self, ctx: &mut SimulationContext) -> SimResult<()> {
        self.record(ctx, TraceOp::PerformUnscheduledUpdate);
        if self.unscheduled_update_handle.is_scheduled() {
            trace!(device = %self.id, "unscheduled update already pending");
            return Ok(());
        }
        ctx.schedule_ticks(
            0,
            UNSCHEDULED_UPDATE_PRIORITY,
            true,
            ProcessTarget::UnscheduledUpdate { device: self.id },
            Some(&self.unscheduled_update_handle),
        )?;
        Ok(())
    }

    /// Abandon the current step as completed and recompute from scratch.
    pub fn reset_process(&mut self, ctx: &mut SimulationContext) -> SimResult<()> {
        self.record(ctx, TraceOp::ResetProcess);
        self.step_completed = true;
        if self.end_step_handle.is_scheduled() {
            self.reschedule_end_step_now(ctx)?;
        }
        Ok(())
    }

    fn reschedule_end_step_now(&mut self, ctx: &mut SimulationContext) -> SimResult<()> {
        ctx.kill_event(&self.end_step_handle);
        ctx.schedule_ticks(
            0,
            STEP_COMPLETION_PRIORITY,
            true,
            ProcessTarget::EndStep { device: self.id },
            Some(&self.end_step_handle),
        )?;
        Ok(())
    }

    // ── Thresholds ────────────────────────────────────────────────────

    /// React to a change in one of the observed thresholds.
    pub fn threshold_changed(&mut self, ctx: &mut SimulationContext) -> SimResult<()> {
        self.record(ctx, TraceOp::ThresholdChanged);
        if self.thresholds.is_immediate_release_closure() {
            if self.end_step_handle.is_scheduled() {
                self.reschedule_end_step_now(ctx)?;
            }
            return Ok(());
        }
        if self.thresholds.is_immediate_closure() {
            return self.perform_unscheduled_update(ctx);
        }
        self.start_step(ctx)
    }

    /// Open or close a threshold and run the closure protocol if its state
    /// changed.
    pub fn set_threshold(&mut self, ctx: &mut SimulationContext, name: &str, open: bool) -> SimResult<()> {
        let Some(changed) = self.thresholds.set_open(name, open) else {
            warn!(device = %self.id, threshold = name, "unknown threshold");
            return Err(SimError::UnknownThreshold {
                device: self.id,
                name: name.to_string(),
            });
        };
        if !changed {
            return Ok(());
        }
        debug!(device = %self.id, threshold = name, open, "threshold changed");
        self.threshold_changed(ctx)
    }

    // ── Downtime ──────────────────────────────────────────────────────

    /// Idle and not already in maintenance or breakdown. Closed thresholds
    /// do not block downtime.
    pub fn can_start_downtime(&self, _downtime: &Downtime) -> bool {
        !self.busy && self.downtimes.is_empty()
    }

    /// Latch a downtime request against the step in flight.
    pub fn prepare_for_downtime(&mut self, ctx: &mut SimulationContext, downtime: &Downtime) -> SimResult<()> {
        self.record(ctx, TraceOp::PrepareForDowntime);
        if !self.busy || downtime.is_opportunistic() {
            return Ok(());
        }
        debug!(device = %self.id, downtime = %downtime.id, policy = ?downtime.policy, "preparing for downtime");
        if downtime.is_forced() {
            self.forced_downtime_pending = true;
        } else if downtime.is_immediate() {
            self.immediate_downtime_pending = true;
            self.perform_unscheduled_update(ctx)?;
        }
        Ok(())
    }

    /// Enter a downtime.
    pub fn start_downtime(&mut self, ctx: &mut SimulationContext, downtime: &Downtime) {
        self.record(ctx, TraceOp::StartDowntime);
        self.downtimes.push((downtime.id, downtime.kind));
        self.set_present_state(ctx);
        info!(device = %self.id, downtime = %downtime.id, kind = ?downtime.kind, "downtime started");
    }

    /// Leave a downtime and resume normal operation.
    pub fn end_downtime(&mut self, ctx: &mut SimulationContext, id: DowntimeId) -> SimResult<()> {
        self.record(ctx, TraceOp::EndDowntime);
        let before = self.downtimes.len();
        self.downtimes.retain(|(d, _)| *d != id);
        if self.downtimes.len() == before {
            warn!(device = %self.id, downtime = %id, "end_downtime: downtime not active");
        } else {
            info!(device = %self.id, downtime = %id, "downtime ended");
        }
        self.set_present_state(ctx);
        self.start_step(ctx)
    }

    // ── Queries ───────────────────────────────────────────────────────

    /// All thresholds open and no maintenance or breakdown in progress.
    pub fn is_available(&self) -> bool {
        self.thresholds.is_open() && self.downtimes.is_empty()
    }

    /// A forced or immediate downtime is latched.
    pub fn is_ready_for_downtime(&self) -> bool {
        self.forced_downtime_pending || self.immediate_downtime_pending
    }

    pub fn is_maintenance(&self) -> bool {
        self.downtimes.iter().any(|(_, k)| *k == DowntimeKind::Maintenance)
    }

    pub fn is_breakdown(&self) -> bool {
        self.downtimes.iter().any(|(_, k)| *k == DowntimeKind::Breakdown)
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Simulation time in seconds of the last progress update.
    pub fn last_update_time(&self) -> f64 {
        self.last_update_time
    }

    /// Remaining duration in seconds of the current step.
    pub fn remaining_duration(&self) -> f64 {
        self.duration
    }

    /// Completion tick of the step in flight. Stale when no step is
    /// scheduled.
    pub fn end_tick(&self) -> Tick {
        self.end_tick
    }

    pub fn is_step_completed(&self) -> bool {
        self.step_completed
    }

    pub fn set_step_completed(&mut self, completed: bool) {
        self.step_completed = completed;
    }

    pub fn is_forced_downtime_pending(&self) -> bool {
        self.forced_downtime_pending
    }

    pub fn is_immediate_downtime_pending(&self) -> bool {
        self.immediate_downtime_pending
    }

    /// A step-completion event is pending.
    pub fn is_step_scheduled(&self) -> bool {
        self.end_step_handle.is_scheduled()
    }

    /// A debounced re-evaluation is pending.
    pub fn is_update_pending(&self) -> bool {
        self.unscheduled_update_handle.is_scheduled()
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// Downtimes currently in progress.
    pub fn active_downtimes(&self) -> impl Iterator<Item = DowntimeId> + '_ {
        self.downtimes.iter().map(|(id, _)| *id)
    }

    pub fn present_state(&self) -> DeviceState {
        self.state.current()
    }

    pub fn state_times(&self) -> &StateTimes {
        &self.state
    }

    /// Trace recorded since the last collection, if tracing is on.
    pub fn trace(&self) -> Option<&[TraceEntry]> {
        self.trace.as_deref()
    }

    /// Downcast the behavior for inspection.
    pub fn behavior<T: ProcessBehavior + 'static>(&self) -> Option<&T> {
        self.behavior.as_any().downcast_ref::<T>()
    }

    /// Downcast the behavior mutably.
    pub fn behavior_mut<T: ProcessBehavior + 'static>(&mut self) -> Option<&mut T> {
        self.behavior.as_any_mut().downcast_mut::<T>()
    }

    /// Return to the start-of-run state. Both handles are unscheduled, so a
    /// run abandoned mid-step does not leak into the next one.
    pub fn early_init(&mut self) {
        self.end_step_handle.clear();
        self.unscheduled_update_handle.clear();
        self.last_update_time = 0.0;
        self.duration = 0.0;
        self.end_tick = Tick::ZERO;
        self.forced_downtime_pending = false;
        self.immediate_downtime_pending = false;
        self.step_completed = true;
        self.busy = false;
        self.thresholds.reset();
        self.downtimes.clear();
        self.state.reset();
        if let Some(trace) = self.trace.as_mut() {
            trace.clear();
        }
        self.behavior.early_init();
    }

    // ── Internals ─────────────────────────────────────────────────────

    fn duration_ticks(&self, ctx: &SimulationContext, operation: &'static str) -> SimResult<u64> {
        if self.duration.is_nan() || self.duration == f64::INFINITY {
            return Err(SimError::InvalidDuration {
                device: self.id,
                operation,
                duration: self.duration,
            });
        }
        let ticks = ctx.resolution().secs_to_nearest_tick(self.duration);
        u64::try_from(ticks).map_err(|_| SimError::NegativeDuration {
            device: self.id,
            operation,
            duration: self.duration,
        })
    }

    fn label(&self) -> DeviceState {
        if self.is_breakdown() {
            DeviceState::Breakdown
        } else if self.is_maintenance() {
            DeviceState::Maintenance
        } else if self.busy {
            DeviceState::Working
        } else if !self.thresholds.is_open() {
            DeviceState::Stopped
        } else {
            DeviceState::Idle
        }
    }

    fn set_present_state(&mut self, ctx: &SimulationContext) {
        let label = self.label();
        if self.state.set(label, ctx.now_secs()) {
            debug!(device = %self.id, state = %label, "state changed");
            self.record(ctx, TraceOp::StateChanged(label));
        }
    }

    fn flags(&self) -> TraceFlags {
        TraceFlags {
            busy: self.busy,
            step_scheduled: self.end_step_handle.is_scheduled(),
            available: self.is_available(),
            step_completed: self.step_completed,
            forced_pending: self.forced_downtime_pending,
            immediate_pending: self.immediate_downtime_pending,
            remaining: self.duration,
        }
    }

    fn record(&mut self, ctx: &SimulationContext, op: TraceOp) {
        if self.trace.is_none() {
            return;
        }
        let entry = TraceEntry {
            time: ctx.now(),
            device: self.id,
            op,
            flags: self.flags(),
        };
        if let Some(trace) = self.trace.as_mut() {
            trace.push(entry);
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("busy", &self.busy)
            .field("duration", &self.duration)
            .field("end_tick", &self.end_tick)
            .field("step_completed", &self.step_completed)
            .field("forced_downtime_pending", &self.forced_downtime_pending)
            .field("immediate_downtime_pending", &self.immediate_downtime_pending)
            .field("state", &self.state.current())
            .finish_non_exhaustive()
    }
}
