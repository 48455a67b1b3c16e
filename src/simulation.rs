/// Simulation execution loop.
///
/// Drives the scheduler: pops the next live entry, advances the clock to
/// its due tick, dispatches it to a handler. The loop is synchronous and
/// single-threaded, and it is the only thing that moves the clock.

use tracing::{debug, info};

use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::event::{Event, Priority, ProcessTarget, SeqNo};
use crate::eventlog::EventLog;
use crate::handle::EventHandle;
use crate::scheduler::Scheduler;
use crate::time::{Tick, TickResolution};

/// Priority for events seeded without an explicit priority.
pub const DEFAULT_PRIORITY: Priority = 5;

// ── Handler trait ─────────────────────────────────────────────────────

/// User-defined event handler.
///
/// Receives every dispatched entry together with a context through which
/// it can schedule follow-up entries. An error halts the run.
pub trait EventHandler {
    /// Called for every dispatched entry.
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event) -> SimResult<()>;
}

/// A handler backed by a closure, for tests and one-off scripts.
impl<F> EventHandler for F
where
    F: FnMut(&mut SimulationContext, &Event) -> SimResult<()>,
{
    fn handle(&mut self, ctx: &mut SimulationContext, event: &Event) -> SimResult<()> {
        (self)(ctx, event)
    }
}

// ── Simulation Context ───────────────────────────────────────────────

/// Mutable context passed to the handler on every dispatch.
///
/// Borrows the scheduler mutably, so a handler can only influence dispatch
/// order through the schedule/kill API.
pub struct SimulationContext<'a> {
    pub(crate) scheduler: &'a mut Scheduler,
    pub(crate) now: Tick,
    pub(crate) resolution: TickResolution,
    pub(crate) stop_requested: &'a mut bool,
}

impl<'a> SimulationContext<'a> {
    /// Current clock tick.
    #[inline]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Current simulation time in seconds.
    #[inline]
    pub fn now_secs(&self) -> f64 {
        self.resolution.tick_to_secs(self.now)
    }

    /// The tick/seconds conversion in force.
    #[inline]
    pub fn resolution(&self) -> TickResolution {
        self.resolution
    }

    /// Schedule `target` to run `delay` ticks from now.
    ///
    /// A delay of zero runs the target at the next opportunity at its
    /// priority within the current tick. Fails if `handle` is already
    /// scheduled.
    pub fn schedule_ticks(
        &mut self,
        delay: u64,
        priority: Priority,
        fifo: bool,
        target: ProcessTarget,
        handle: Option<&EventHandle>,
    ) -> SimResult<SeqNo> {
        let due = self
            .now
            .plus(delay)
            .ok_or(SimError::TickOverflow { now: self.now, delay })?;
        self.scheduler.schedule(due, priority, fifo, target, handle)
    }

    /// Schedule `target` at an absolute tick.
    pub fn schedule_at(
        &mut self,
        at: Tick,
        priority: Priority,
        fifo: bool,
        target: ProcessTarget,
        handle: Option<&EventHandle>,
    ) -> SimResult<SeqNo> {
        if at.is_before(self.now) {
            return Err(SimError::NonCausalEvent {
                requested: at,
                current: self.now,
            });
        }
        self.scheduler.schedule(at, priority, fifo, target, handle)
    }

    /// Schedule `target` `delay` ticks from now at the default priority.
    pub fn schedule_after(&mut self, delay: u64, target: ProcessTarget) -> SimResult<SeqNo> {
        self.schedule_ticks(delay, DEFAULT_PRIORITY, true, target, None)
    }

    /// Remove the entry bound to `handle`, if any.
    pub fn kill_event(&mut self, handle: &EventHandle) {
        self.scheduler.kill(handle);
    }

    /// Whether `handle` has a live entry.
    pub fn is_scheduled(&self, handle: &EventHandle) -> bool {
        handle.is_scheduled()
    }

    /// Stop the run loop once the current event finishes.
    pub fn request_stop(&mut self) {
        *self.stop_requested = true;
    }

    /// Number of live entries in the scheduler.
    pub fn pending_count(&self) -> usize {
        self.scheduler.len()
    }
}

// ── Simulation ────────────────────────────────────────────────────────

/// Top-level simulation driver.
///
/// Owns the scheduler and the clock for one run. Call `run` to execute
/// until the queue drains, or `step` to advance by exactly one event.
#[derive(Debug)]
pub struct Simulation {
    scheduler: Scheduler,
    current_time: Tick,
    events_processed: u64,
    config: SimConfig,
    stop_requested: bool,
    event_log: Option<EventLog>,
}

impl Simulation {
    /// Create a simulation with the default configuration.
    pub fn new() -> Self {
        Self::build(SimConfig::default())
    }

    /// Create a simulation from a validated configuration.
    pub fn with_config(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SimConfig) -> Self {
        let event_log = config.record_events.then(EventLog::new);
        Simulation {
            scheduler: Scheduler::new(),
            current_time: Tick::ZERO,
            events_processed: 0,
            config,
            stop_requested: false,
            event_log,
        }
    }

    /// Access the scheduler directly (e.g., for initial event seeding).
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// The configuration of this run.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The tick/seconds conversion of this run.
    pub fn resolution(&self) -> TickResolution {
        self.config.resolution()
    }

    /// Current clock tick.
    pub fn current_time(&self) -> Tick {
        self.current_time
    }

    /// Current simulation time in seconds.
    pub fn now_secs(&self) -> f64 {
        self.resolution().tick_to_secs(self.current_time)
    }

    /// Total events processed so far.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// The fired-event log, if recording is enabled.
    pub fn event_log(&self) -> Option<&EventLog> {
        self.event_log.as_ref()
    }

    /// Schedule an event at an absolute tick at the default priority.
    pub fn schedule(&mut self, at: Tick, target: ProcessTarget) -> SimResult<SeqNo> {
        self.schedule_with(at, DEFAULT_PRIORITY, true, target, None)
    }

    /// Schedule an event at an absolute simulation time in seconds.
    pub fn schedule_at_secs(&mut self, secs: f64, target: ProcessTarget) -> SimResult<SeqNo> {
        if !secs.is_finite() {
            return Err(SimError::InvalidTime(secs));
        }
        let ticks = self.resolution().secs_to_nearest_tick(secs);
        let at = u64::try_from(ticks).map_err(|_| SimError::InvalidTime(secs))?;
        self.schedule(Tick::new(at), target)
    }

    /// Schedule an event with full control over ordering and handle.
    pub fn schedule_with(
        &mut self,
        at: Tick,
        priority: Priority,
        fifo: bool,
        target: ProcessTarget,
        handle: Option<&EventHandle>,
    ) -> SimResult<SeqNo> {
        if at.is_before(self.current_time) {
            return Err(SimError::NonCausalEvent {
                requested: at,
                current: self.current_time,
            });
        }
        self.scheduler.schedule(at, priority, fifo, target, handle)
    }

    /// Execute a single step: pop one event, advance time, dispatch.
    ///
    /// Returns `Ok(Some(event))` if an event was processed, `Ok(None)` if
    /// the queue is empty.
    pub fn step(&mut self, handler: &mut dyn EventHandler) -> SimResult<Option<Event>> {
        let Some(event) = self.scheduler.pop_next() else {
            return Ok(None);
        };

        // The clock never goes backward.
        debug_assert!(
            event.due >= self.current_time,
            "time went backward: current={}, event={}",
            self.current_time,
            event.due
        );
        self.current_time = event.due;
        self.events_processed += 1;

        if let Some(log) = self.event_log.as_mut() {
            log.record(&event);
        }

        let mut ctx = SimulationContext {
            scheduler: &mut self.scheduler,
            now: self.current_time,
            resolution: self.config.resolution(),
            stop_requested: &mut self.stop_requested,
        };
        handler.handle(&mut ctx, &event)?;

        Ok(Some(event))
    }

    /// Run until the queue is empty or a handler requests a stop.
    ///
    /// Returns the number of events processed during this call.
    pub fn run(&mut self, handler: &mut dyn EventHandler) -> SimResult<u64> {
        self.run_while(handler, |_| true)
    }

    /// Run until the queue is empty, a stop is requested, or `max_steps`
    /// events have been dispatched.
    pub fn run_for(&mut self, max_steps: u64, handler: &mut dyn EventHandler) -> SimResult<u64> {
        let start = self.events_processed;
        self.run_while(handler, |sim| sim.events_processed - start < max_steps)
    }

    /// Run every event due at or before `limit`, then move the clock to
    /// `limit`. Later events stay queued.
    pub fn run_until(&mut self, limit: Tick, handler: &mut dyn EventHandler) -> SimResult<u64> {
        let processed = self.run_while(handler, |sim| {
            sim.scheduler.peek_next().is_some_and(|e| e.due <= limit)
        })?;
        if !self.stop_requested && self.current_time < limit {
            self.current_time = limit;
        }
        Ok(processed)
    }

    fn run_while(
        &mut self,
        handler: &mut dyn EventHandler,
        mut keep_going: impl FnMut(&mut Self) -> bool,
    ) -> SimResult<u64> {
        let start = self.events_processed;
        self.stop_requested = false;
        info!(now = %self.current_time, pending = self.scheduler.len(), "run started");

        while !self.stop_requested && keep_going(self) {
            if self.step(handler)?.is_none() {
                break;
            }
        }

        let processed = self.events_processed - start;
        info!(
            now = %self.current_time,
            processed,
            stopped = self.stop_requested,
            "run finished"
        );
        Ok(processed)
    }

    /// Returns `true` if there are no more events to process.
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_empty()
    }

    /// Return to time zero with an empty queue, ready for the next run.
    pub fn reset(&mut self) {
        debug!(now = %self.current_time, "simulation reset");
        self.scheduler.clear();
        self.current_time = Tick::ZERO;
        self.events_processed = 0;
        self.stop_requested = false;
        if let Some(log) = self.event_log.as_mut() {
            log.clear();
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}
